use crate::config::{MIN_FREE_FLOW_TIME, MIN_LINK_LENGTH};
use crate::graph::{EdgeId, NodeId};
use crate::params::FlowParams;

/// Direction in which a link traverses its edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Forward,
    Backward,
}

/// Triangular fundamental diagram of one link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkGeometry {
    /// Metres.
    pub length: f64,
    /// Free-flow traversal time in seconds.
    pub free_flow_time: f64,
    /// `length / free_flow_time`, m/s.
    pub free_speed: f64,
    /// Vehicles per second.
    pub capacity: f64,
    /// Vehicles per metre over all lanes.
    pub jam_density: f64,
    /// Backward wave speed, m/s.
    pub wave_speed: f64,
}

impl LinkGeometry {
    pub fn new(length: f64, free_flow_time: f64, lanes: f64, params: &FlowParams) -> Self {
        let length = length.max(MIN_LINK_LENGTH);
        let free_flow_time = free_flow_time.max(MIN_FREE_FLOW_TIME);
        let free_speed = length / free_flow_time;
        let jam_density = params.jam_density * lanes;
        let wave_speed = params.wave_speed;
        // The diagram's apex: where the free-flow and congested branches meet.
        let apex = jam_density * free_speed * wave_speed / (free_speed + wave_speed);
        let capacity = (params.lane_capacity * lanes).min(apex);
        Self {
            length,
            free_flow_time,
            free_speed,
            capacity,
            jam_density,
            wave_speed,
        }
    }

    pub fn critical_density(&self) -> f64 {
        self.capacity / self.free_speed
    }

    /// Vehicles the link holds at standstill.
    pub fn storage(&self) -> f64 {
        self.jam_density * self.length
    }

    /// Seconds a backward wave takes to cross the link.
    pub fn backward_time(&self) -> f64 {
        self.length / self.wave_speed
    }

    /// Speed at `density` (veh/m): free speed up to the critical density, then
    /// the congested branch `q(k) / k` with `q(k) = w (k_j - k)` capped at
    /// capacity.
    pub fn velocity_at(&self, density: f64) -> f64 {
        if density <= self.critical_density() {
            return self.free_speed;
        }
        let flow = (self.wave_speed * (self.jam_density - density))
            .max(0.0)
            .min(self.capacity);
        flow / density
    }
}

/// Cumulative vehicle count sampled once per tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CumulativeCurve {
    values: Vec<f64>,
}

impl CumulativeCurve {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> f64 {
        self.values.last().copied().unwrap_or(0.0)
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Value at simulated time `time`, sampling every `step` seconds.
    /// Linear between samples; clamped to the first and latest sample.
    pub fn at_time(&self, time: f64, step: f64) -> f64 {
        let Some(&last) = self.values.last() else {
            return 0.0;
        };
        if time <= 0.0 {
            return self.values[0];
        }
        let position = time / step;
        let index = position.floor() as usize;
        if index + 1 >= self.values.len() {
            return last;
        }
        let fraction = position - index as f64;
        let (a, b) = (self.values[index], self.values[index + 1]);
        a + (b - a) * fraction
    }
}

/// One traversable direction of an edge, with its cumulative curves.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub edge: EdgeId,
    pub direction: Direction,
    pub tail: NodeId,
    pub head: NodeId,
    pub geometry: LinkGeometry,
    /// Vehicles that have entered, per tick.
    pub upstream: CumulativeCurve,
    /// Vehicles that have left, per tick.
    pub downstream: CumulativeCurve,
}

impl Link {
    pub fn new(edge: EdgeId, direction: Direction, tail: NodeId, head: NodeId, geometry: LinkGeometry) -> Self {
        Self {
            edge,
            direction,
            tail,
            head,
            geometry,
            upstream: CumulativeCurve::default(),
            downstream: CumulativeCurve::default(),
        }
    }

    pub fn vehicles(&self) -> f64 {
        self.upstream.last() - self.downstream.last()
    }

    /// Vehicles able to leave during `[now, now + dt)`: those that entered at
    /// least one free-flow time ago, capped by capacity.
    pub fn sending(&self, now: f64, dt: f64) -> f64 {
        let entered = self
            .upstream
            .at_time(now + dt - self.geometry.free_flow_time, dt);
        (entered - self.downstream.last())
            .min(self.geometry.capacity * dt)
            .max(0.0)
    }

    /// Vehicles able to enter during `[now, now + dt)`: the storage freed by
    /// departures one backward-wave time ago, capped by capacity.
    pub fn receiving(&self, now: f64, dt: f64) -> f64 {
        let left = self
            .downstream
            .at_time(now + dt - self.geometry.backward_time(), dt);
        (left + self.geometry.storage() - self.upstream.last())
            .min(self.geometry.capacity * dt)
            .max(0.0)
    }
}
