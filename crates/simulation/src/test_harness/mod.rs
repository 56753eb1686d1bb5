//! # TestNetwork: headless integration test harness
//!
//! Provides a fluent builder that wraps `bevy::app::App` + `SimulationPlugin`
//! for running integration tests without a window or renderer.

mod assertions;
mod queries;
mod setup;

use bevy::app::App;
use bevy::prelude::*;

use crate::params::TrafficParams;
use crate::SimulationPlugin;

/// A headless Bevy App wrapping `SimulationPlugin` for integration testing.
///
/// Use builder methods to load a network and its demand, press clock
/// controls, then call `tick()` to advance the simulation and query/assert
/// on the resulting resources.
pub struct TestNetwork {
    app: App,
}

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// An empty network with default parameters.
    pub fn new() -> Self {
        Self::with_params(TrafficParams::default())
    }

    /// An empty network with `params` installed before the plugin, so the
    /// clock picks up its interval settings on init.
    pub fn with_params(params: TrafficParams) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(params);
        app.add_plugins(SimulationPlugin);

        // Run one update so every resource and event queue exists.
        app.update();

        Self { app }
    }
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}
