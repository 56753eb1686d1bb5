//! ECS systems driving the simulation clock.
//!
//! - `handle_clock_controls`: applies control presses, loading the flow
//!   engine on first start and unloading it on stop.
//! - `drive_simulation_clock`: one tick per `FixedUpdate` while running.
//! - `sync_fixed_timestep`: keeps `Time<Fixed>` on the clock interval.
//! - `report_progress`: post-tick logging.

use bevy::prelude::*;

use crate::flow::{FlowEngine, TickReport, TrafficModel};
use crate::graph::Graph;
use crate::params::TrafficParams;

use super::scheduler::SimulationClock;
use super::types::{
    ClockControlEvent, Control, PeriodsChanged, SimulationEnded, SimulationFailed,
    SimulationTicked,
};

/// Run condition for the tick driver.
pub fn clock_is_running(clock: Res<SimulationClock>) -> bool {
    clock.is_running()
}

#[allow(clippy::too_many_arguments)]
pub fn handle_clock_controls(
    mut controls: EventReader<ClockControlEvent>,
    mut clock: ResMut<SimulationClock>,
    mut graph: ResMut<Graph>,
    mut engine: ResMut<FlowEngine>,
    params: Res<TrafficParams>,
    mut periods: EventWriter<PeriodsChanged>,
    mut ticked: EventWriter<SimulationTicked>,
    mut ended: EventWriter<SimulationEnded>,
    mut failed: EventWriter<SimulationFailed>,
) {
    for &ClockControlEvent(control) in controls.read() {
        info!("Clock control: {control:?}");

        if matches!(control, Control::Start | Control::Step) && !engine.is_loaded() {
            match FlowEngine::load(&graph, &params.flow) {
                Ok(loaded) => {
                    *engine = loaded;
                    graph.freeze();
                }
                Err(err) => {
                    error!("Cannot load the simulation: {err}");
                    failed.send(SimulationFailed(err));
                    continue;
                }
            }
        }

        let was_ended = clock.has_ended();
        let result = {
            let mut model = TrafficModel::new(&mut graph, &mut engine);
            clock.press(control, &mut model)
        };

        match result {
            Ok(Some(report)) => {
                publish_tick(report, was_ended, &clock, &mut ticked, &mut ended);
            }
            Ok(None) => {}
            Err(err) => {
                error!("Simulation step failed: {err}");
                failed.send(SimulationFailed(err));
            }
        }

        if control == Control::Stop {
            *engine = FlowEngine::default();
            graph.thaw();
        }

        periods.send(PeriodsChanged {
            interval: clock.interval(),
            simulated_time: clock.statistics().total_simulated_time,
            ticks: clock.ticks(),
        });
    }
}

pub fn drive_simulation_clock(
    mut clock: ResMut<SimulationClock>,
    mut graph: ResMut<Graph>,
    mut engine: ResMut<FlowEngine>,
    mut periods: EventWriter<PeriodsChanged>,
    mut ticked: EventWriter<SimulationTicked>,
    mut ended: EventWriter<SimulationEnded>,
    mut failed: EventWriter<SimulationFailed>,
) {
    let was_ended = clock.has_ended();
    let result = {
        let mut model = TrafficModel::new(&mut graph, &mut engine);
        clock.execute(&mut model)
    };
    match result {
        Ok(report) => {
            publish_tick(report, was_ended, &clock, &mut ticked, &mut ended);
            periods.send(PeriodsChanged {
                interval: clock.interval(),
                simulated_time: clock.statistics().total_simulated_time,
                ticks: clock.ticks(),
            });
        }
        Err(err) => {
            error!("Simulation tick failed: {err}");
            clock.pause();
            failed.send(SimulationFailed(err));
        }
    }
}

fn publish_tick(
    report: TickReport,
    was_ended: bool,
    clock: &SimulationClock,
    ticked: &mut EventWriter<SimulationTicked>,
    ended: &mut EventWriter<SimulationEnded>,
) {
    ticked.send(SimulationTicked(report));
    if clock.has_ended() && !was_ended {
        ended.send(SimulationEnded(report));
    }
}

/// Mirror the clock interval onto the fixed timestep.
pub fn sync_fixed_timestep(clock: Res<SimulationClock>, mut time: ResMut<Time<Fixed>>) {
    if clock.is_changed() && time.timestep() != clock.interval() {
        time.set_timestep(clock.interval());
    }
}

pub fn report_progress(mut ticked: EventReader<SimulationTicked>) {
    for SimulationTicked(report) in ticked.read() {
        debug!(
            "Tick {} (t = {:.0}s): {:.1} en route, {:.1} waiting, {:.1} arrived, {} heavy edges",
            report.tick,
            report.time,
            report.counts.en_route,
            report.counts.waiting,
            report.counts.arrived,
            report.heavy_edges
        );
    }
}
