//! Simulation clock.
//!
//! States: idle -> running <-> paused; stop returns to idle from anywhere and
//! resets the flow model. `Step` runs exactly one tick from any state and
//! leaves the clock paused. Once the model reports that all demand has been
//! delivered the clock pauses itself and refuses `Start` until stopped.

pub mod plugin;
pub mod scheduler;
pub mod systems;
pub mod types;

#[cfg(test)]
mod tests;

pub use plugin::ClockPlugin;
pub use scheduler::SimulationClock;
pub use types::{
    ClockControlEvent, ClockState, ClockStatistics, Control, PeriodsChanged, SimulationEnded,
    SimulationFailed, SimulationTicked,
};
