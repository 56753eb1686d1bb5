use bevy::prelude::*;

pub mod assignment;
pub mod clock;
pub mod config;
pub mod congestion;
pub mod error;
pub mod flow;
pub mod graph;
pub mod ingest;
pub mod params;
pub mod paths;
pub mod simulation_sets;
pub mod statistics;
pub mod tasks;

#[cfg(test)]
mod test_harness;

pub use error::{NetworkError, ParamsError, SimulationError};
pub use flow::{FlowEngine, TrafficModel};
pub use graph::Graph;
pub use params::TrafficParams;
pub use simulation_sets::{SimulationSet, SimulationUpdateSet};

// ---------------------------------------------------------------------------
// SimulationPlugin
// ---------------------------------------------------------------------------

/// Registers the road graph, the flow engine and the clock, plus the systems
/// that compute assignments in the background and tick the simulation.
///
/// Works headless: `MinimalPlugins` is enough.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // TrafficParams first: SimulationClock reads it on init.
        app.init_resource::<TrafficParams>()
            .init_resource::<Graph>()
            .init_resource::<FlowEngine>()
            .configure_sets(
                FixedUpdate,
                (SimulationSet::Simulation, SimulationSet::PostSim).chain(),
            );

        app.add_plugins((tasks::AssignmentTasksPlugin, clock::ClockPlugin));
    }
}
