use crate::graph::Path;

/// Decides how one O/D pair's demand is shared among its enumerated paths.
pub trait SplitPolicy: Send + Sync {
    /// One fraction per path, in path order, summing to one. Only called
    /// with a non-empty slice.
    fn split(&self, paths: &[Path]) -> Vec<f64>;
}

/// Equal share for every enumerated path.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSplit;

impl SplitPolicy for UniformSplit {
    fn split(&self, paths: &[Path]) -> Vec<f64> {
        let share = 1.0 / paths.len() as f64;
        vec![share; paths.len()]
    }
}

/// Multinomial logit over path cost: `exp(-theta * cost)`, normalised.
/// `theta` is per unit of cost (metre or second); zero gives a uniform split.
#[derive(Debug, Clone, Copy)]
pub struct LogitSplit {
    pub theta: f64,
}

impl SplitPolicy for LogitSplit {
    fn split(&self, paths: &[Path]) -> Vec<f64> {
        let best = paths
            .iter()
            .map(|path| path.cost)
            .fold(f64::INFINITY, f64::min);
        // Shifting by the best cost keeps the exponent <= 0.
        let weights: Vec<f64> = paths
            .iter()
            .map(|path| (-self.theta * (path.cost - best)).exp())
            .collect();
        let total: f64 = weights.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return UniformSplit.split(paths);
        }
        weights.into_iter().map(|w| w / total).collect()
    }
}
