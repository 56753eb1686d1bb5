//! Plugin registration for the simulation clock.

use bevy::prelude::*;

use crate::simulation_sets::{SimulationSet, SimulationUpdateSet};

use super::scheduler::SimulationClock;
use super::systems::{
    clock_is_running, drive_simulation_clock, handle_clock_controls, report_progress,
    sync_fixed_timestep,
};
use super::types::{
    ClockControlEvent, PeriodsChanged, SimulationEnded, SimulationFailed, SimulationTicked,
};

pub struct ClockPlugin;

impl Plugin for ClockPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimulationClock>()
            .add_event::<ClockControlEvent>()
            .add_event::<PeriodsChanged>()
            .add_event::<SimulationTicked>()
            .add_event::<SimulationEnded>()
            .add_event::<SimulationFailed>()
            .add_systems(
                Update,
                (handle_clock_controls, sync_fixed_timestep)
                    .chain()
                    .after(crate::tasks::collect_assignment_results)
                    .in_set(SimulationUpdateSet::Input),
            )
            .add_systems(
                FixedUpdate,
                (
                    drive_simulation_clock
                        .run_if(clock_is_running)
                        .in_set(SimulationSet::Simulation),
                    report_progress.in_set(SimulationSet::PostSim),
                ),
            );
    }
}
