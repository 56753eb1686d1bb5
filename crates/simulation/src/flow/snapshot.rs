use serde::Serialize;

use crate::graph::EdgeId;

/// Per-edge series and counters handed to the statistics functions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSnapshot {
    pub edge_id: EdgeId,
    pub label: String,
    /// Free-flow traversal time, seconds.
    pub duration: f64,
    /// Capacity over both directions, vehicles per second.
    pub max_flow: f64,
    pub heavy_traffic_count: u32,
    pub moderate_traffic_count: u32,
    /// Cumulative vehicles in, one sample per time period.
    pub upstream: Vec<f64>,
    /// Cumulative vehicles out, one sample per time period.
    pub downstream: Vec<f64>,
}

impl EdgeSnapshot {
    /// Vehicles on the edge at each sample.
    pub fn volumes(&self) -> Vec<f64> {
        self.upstream
            .iter()
            .zip(&self.downstream)
            .map(|(u, d)| u - d)
            .collect()
    }
}
