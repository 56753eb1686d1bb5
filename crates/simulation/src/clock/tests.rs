use std::time::Duration;

use super::*;
use crate::error::SimulationError;
use crate::flow::{Propagate, SimulationCounts, TickReport};
use crate::params::ClockParams;

/// Counts ticks, optionally sleeping to simulate slow propagation.
#[derive(Default)]
struct FakeModel {
    ticks: usize,
    resets: usize,
    finish_at: Option<usize>,
    fail: bool,
    work: Duration,
}

impl Propagate for FakeModel {
    fn propagate_flows(&mut self) -> Result<TickReport, SimulationError> {
        if !self.work.is_zero() {
            std::thread::sleep(self.work);
        }
        if self.fail {
            return Err(SimulationError::NotLoaded);
        }
        self.ticks += 1;
        Ok(TickReport {
            tick: self.ticks,
            time: self.ticks as f64,
            counts: SimulationCounts::default(),
            average_speed: 0.0,
            heavy_edges: 0,
            moderate_edges: 0,
            finished: self.finish_at == Some(self.ticks),
        })
    }

    fn reset_flows(&mut self) {
        self.ticks = 0;
        self.resets += 1;
    }
}

fn params(initial_ms: u64) -> ClockParams {
    ClockParams {
        initial_interval_ms: initial_ms,
        interval_increment_ms: 100,
        interval_decrement_ms: 100,
    }
}

#[test]
fn test_start_pause_cycle() {
    let mut clock = SimulationClock::new(ClockParams::default());
    assert_eq!(clock.state(), ClockState::Idle);
    clock.pause();
    assert_eq!(clock.state(), ClockState::Idle);
    assert!(clock.start());
    assert!(clock.is_running());
    clock.pause();
    assert_eq!(clock.state(), ClockState::Paused);
    assert!(clock.start());
    assert_eq!(clock.state(), ClockState::Running);
}

#[test]
fn test_step_runs_exactly_one_tick_from_any_state() {
    let mut model = FakeModel::default();
    let mut clock = SimulationClock::new(params(500));

    clock.step(&mut model).unwrap();
    assert_eq!(model.ticks, 1);
    assert_eq!(clock.state(), ClockState::Paused);

    clock.start();
    clock.step(&mut model).unwrap();
    assert_eq!(model.ticks, 2);
    assert_eq!(clock.state(), ClockState::Paused);
    assert_eq!(clock.statistics().total_simulated_time, Duration::from_millis(1000));
}

#[test]
fn test_press_step_returns_report() {
    let mut model = FakeModel::default();
    let mut clock = SimulationClock::new(ClockParams::default());
    let report = clock.press(Control::Step, &mut model).unwrap();
    assert_eq!(report.map(|r| r.tick), Some(1));
    assert_eq!(clock.press(Control::Slow, &mut model).unwrap(), None);
    assert_eq!(model.ticks, 1);
}

#[test]
fn test_stop_resets_model_and_clock() {
    let mut model = FakeModel::default();
    let mut clock = SimulationClock::new(params(500));
    clock.start();
    clock.slow();
    for _ in 0..3 {
        clock.execute(&mut model).unwrap();
    }
    assert_eq!(clock.ticks(), 3);
    assert_eq!(clock.statistics().total_simulated_time, Duration::from_millis(1800));

    clock.stop(&mut model);
    assert_eq!(model.resets, 1);
    assert_eq!(model.ticks, 0);
    assert_eq!(clock.state(), ClockState::Idle);
    assert_eq!(clock.interval(), Duration::from_millis(500));
    assert_eq!(clock.statistics(), ClockStatistics::default());
}

#[test]
fn test_slow_and_quick_adjust_interval() {
    let mut clock = SimulationClock::new(params(300));
    assert_eq!(clock.slow(), Duration::from_millis(400));
    assert!(clock.quick());
    assert!(clock.quick());
    assert_eq!(clock.interval(), Duration::from_millis(200));
    assert!(clock.quick());
    assert_eq!(clock.interval(), Duration::from_millis(100));
    // Never down to zero.
    assert!(!clock.quick());
    assert_eq!(clock.interval(), Duration::from_millis(100));
}

#[test]
fn test_quick_is_bounded_by_processing_time() {
    let mut model = FakeModel {
        work: Duration::from_millis(100),
        ..Default::default()
    };
    let mut clock = SimulationClock::new(params(300));
    clock.step(&mut model).unwrap();
    assert!(clock.last_processing_time() >= Duration::from_millis(100));

    // 300 -> 200 is still above the ~100 ms the tick took.
    assert!(clock.quick());
    // 200 -> 100 would not leave enough time.
    assert!(!clock.quick());
    assert_eq!(clock.interval(), Duration::from_millis(200));
    assert!(clock.interval() > clock.last_processing_time());
}

#[test]
fn test_failed_tick_consumes_no_simulated_time() {
    let mut model = FakeModel {
        fail: true,
        ..Default::default()
    };
    let mut clock = SimulationClock::new(ClockParams::default());
    clock.start();
    assert_eq!(clock.execute(&mut model), Err(SimulationError::NotLoaded));
    assert_eq!(clock.ticks(), 0);
    assert_eq!(clock.statistics().total_simulated_time, Duration::ZERO);
}

#[test]
fn test_end_of_simulation_pauses_and_blocks_start() {
    let mut model = FakeModel {
        finish_at: Some(2),
        ..Default::default()
    };
    let mut clock = SimulationClock::new(ClockParams::default());
    clock.start();
    assert!(!clock.execute(&mut model).unwrap().finished);
    assert!(clock.execute(&mut model).unwrap().finished);
    assert!(clock.has_ended());
    assert_eq!(clock.state(), ClockState::Paused);

    assert!(!clock.start());
    assert_eq!(clock.state(), ClockState::Paused);

    clock.stop(&mut model);
    assert!(!clock.has_ended());
    assert!(clock.start());
}
