//! Clock controls, states and the events the clock emits.

use std::time::Duration;

use bevy::prelude::*;
use serde::Serialize;

use crate::error::SimulationError;
use crate::flow::TickReport;

/// The six controls a user can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Control {
    Start,
    Pause,
    Stop,
    /// Exactly one tick, then paused.
    Step,
    /// Lengthen the tick interval.
    Slow,
    /// Shorten the tick interval, never below the last processing time.
    Quick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ClockState {
    #[default]
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockStatistics {
    /// Sum of the tick intervals consumed since the last stop.
    pub total_simulated_time: Duration,
    /// Wall-clock time spent inside propagation since the last stop.
    pub total_processing_time: Duration,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockControlEvent(pub Control);

/// The tick interval or the simulated time moved.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodsChanged {
    pub interval: Duration,
    pub simulated_time: Duration,
    pub ticks: usize,
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SimulationTicked(pub TickReport);

/// All demand was delivered; the clock paused itself.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SimulationEnded(pub TickReport);

#[derive(Event, Debug, Clone, PartialEq)]
pub struct SimulationFailed(pub SimulationError);
