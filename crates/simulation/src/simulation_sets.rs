//! Deterministic ordering via `SystemSet` phases.
//!
//! # FixedUpdate phases (`SimulationSet`)
//!
//! ```text
//! Simulation  →  PostSim
//! ```
//!
//! * **Simulation** – The tick driver: one `propagate_flows` call per run
//!   while the clock is running. Mutates the flow engine and the per-edge
//!   traffic fields of the graph.
//! * **PostSim** – Reporting over the tick just committed. These systems only
//!   *read* events and resources and never mutate simulation state.
//!
//! # Update phases (`SimulationUpdateSet`)
//!
//! ```text
//! Input
//! ```
//!
//! * **Input** – Per-frame request handling: background assignment tasks
//!   (dispatch, then collect), then clock controls and the fixed timestep
//!   sync. Controls are applied after results are collected so a `Start`
//!   sent in the same frame sees a freshly installed assignment.

use bevy::prelude::*;

// ---------------------------------------------------------------------------
// FixedUpdate phases
// ---------------------------------------------------------------------------

/// Ordered phases for systems running in the `FixedUpdate` schedule.
///
/// Configured as a chain: `Simulation` → `PostSim`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// The tick driver.
    Simulation,
    /// Post-tick reporting; read-only.
    PostSim,
}

// ---------------------------------------------------------------------------
// Update phases
// ---------------------------------------------------------------------------

/// Phases for systems running in the `Update` schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationUpdateSet {
    /// Assignment tasks and clock controls.
    Input,
}
