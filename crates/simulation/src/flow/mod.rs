//! Link transmission model.
//!
//! Every traversable direction of an edge becomes a [`Link`] carrying two
//! cumulative curves: vehicles that have entered (upstream) and vehicles that
//! have left (downstream). Each tick a link offers what can leave (sending)
//! and what it can take in (receiving); the node model moves the minimum of
//! the two along the turns derived from the assigned path volumes.

mod engine;
mod link;
mod routing;
mod snapshot;


pub use engine::{EdgeTraffic, FlowEngine, SimulationCounts, TickReport};
pub use link::{CumulativeCurve, Direction, Link, LinkGeometry};
pub use routing::{Routing, Source};
pub use snapshot::EdgeSnapshot;

use crate::error::SimulationError;
use crate::graph::Graph;

/// Something the simulation clock can advance one tick at a time.
pub trait Propagate {
    fn propagate_flows(&mut self) -> Result<TickReport, SimulationError>;

    /// Drop all simulated state, leaving the model ready to start over.
    fn reset_flows(&mut self);
}

/// A [`FlowEngine`] bound to the graph it writes traffic fields into.
pub struct TrafficModel<'a> {
    pub graph: &'a mut Graph,
    pub engine: &'a mut FlowEngine,
}

impl<'a> TrafficModel<'a> {
    pub fn new(graph: &'a mut Graph, engine: &'a mut FlowEngine) -> Self {
        Self { graph, engine }
    }
}

impl Propagate for TrafficModel<'_> {
    fn propagate_flows(&mut self) -> Result<TickReport, SimulationError> {
        self.engine.propagate(self.graph)
    }

    fn reset_flows(&mut self) {
        self.engine.reset_flows();
        self.graph.clear_traffic();
    }
}
