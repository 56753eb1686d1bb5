//! Clock controls pressed through `ClockControlEvent`.

use std::time::Duration;

use bevy::prelude::*;

use crate::clock::{ClockState, Control, PeriodsChanged, SimulationTicked};
use crate::params::TrafficParams;
use crate::test_harness::TestNetwork;

use super::{bottleneck, od, quick_params};

fn network_with(initial_ms: u64) -> TestNetwork {
    let mut params = quick_params();
    params.clock.initial_interval_ms = initial_ms;
    params.clock.interval_increment_ms = 100;
    params.clock.interval_decrement_ms = 100;
    TestNetwork::with_params(params)
        .with_graph(bottleneck())
        .with_assignment(&[od(1, 3)], &[20.0])
}

#[test]
fn test_pause_halts_ticking() {
    let mut network = network_with(1000);
    network.press(Control::Start);
    network.tick(3);
    network.press(Control::Pause);
    network.assert_clock_state(ClockState::Paused);
    network.tick(5);
    assert_eq!(network.engine().tick_count(), 3);

    network.press(Control::Start);
    network.tick(2);
    assert_eq!(network.engine().tick_count(), 5);
}

#[test]
fn test_step_while_running_pauses_after_one_tick() {
    let mut network = network_with(1000);
    network.press(Control::Start);
    network.tick(4);
    network.drain_events::<SimulationTicked>();

    network.press(Control::Step);
    network.assert_clock_state(ClockState::Paused);
    assert_eq!(network.engine().tick_count(), 5);
    assert_eq!(network.drain_events::<SimulationTicked>().len(), 1);
}

#[test]
fn test_quick_never_reaches_zero() {
    let mut network = network_with(300);
    for _ in 0..5 {
        network.press(Control::Quick);
    }
    assert_eq!(network.clock().interval(), Duration::from_millis(100));
    assert_eq!(network.drain_events::<PeriodsChanged>().len(), 5);
}

#[test]
fn test_quick_stays_above_processing_time() {
    let mut network = network_with(300);
    network.press(Control::Step);
    for _ in 0..5 {
        network.press(Control::Quick);
        let clock = network.clock();
        assert!(clock.interval() > clock.last_processing_time());
    }
}

#[test]
fn test_fixed_timestep_follows_interval() {
    let mut network = network_with(500);
    network.press(Control::Slow);
    network.press(Control::Slow);
    assert_eq!(network.clock().interval(), Duration::from_millis(700));
    assert_eq!(
        network.resource::<Time<Fixed>>().timestep(),
        Duration::from_millis(700)
    );

    network.press(Control::Quick);
    assert_eq!(
        network.resource::<Time<Fixed>>().timestep(),
        Duration::from_millis(600)
    );
}

#[test]
fn test_simulated_time_sums_intervals() {
    let mut network = network_with(200);
    network.press(Control::Step);
    network.press(Control::Slow);
    network.press(Control::Step);
    let stats = network.clock().statistics();
    assert_eq!(stats.total_simulated_time, Duration::from_millis(500));
    assert!(stats.total_processing_time > Duration::ZERO);

    let last = network.drain_events::<PeriodsChanged>().pop().unwrap();
    assert_eq!(last.simulated_time, Duration::from_millis(500));
    assert_eq!(last.ticks, 2);
}

#[test]
fn test_start_refused_after_end_until_stop() {
    let mut network = network_with(100);
    network.press(Control::Start);
    let ticks = network.tick_while_running(1000);
    assert!(ticks < 1000);
    assert!(network.clock().has_ended());

    network.press(Control::Start);
    network.assert_clock_state(ClockState::Paused);

    network.press(Control::Stop);
    network.assert_clock_state(ClockState::Idle);
    network.press(Control::Start);
    network.assert_clock_state(ClockState::Running);
    network.assert_frozen(true);
}

#[test]
fn test_default_interval_comes_from_params() {
    let network = TestNetwork::new();
    assert_eq!(
        network.clock().interval(),
        TrafficParams::default().clock.initial_interval()
    );
}
