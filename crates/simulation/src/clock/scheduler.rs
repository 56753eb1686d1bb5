use std::time::{Duration, Instant};

use bevy::prelude::*;

use crate::error::SimulationError;
use crate::flow::{Propagate, TickReport};
use crate::params::{ClockParams, TrafficParams};

use super::types::{ClockState, ClockStatistics, Control};

/// Discrete tick driver.
///
/// The clock never overlaps two ticks: [`SimulationClock::execute`] only
/// returns once the model has finished propagating, and the measured
/// processing time bounds how far [`SimulationClock::quick`] may shorten the
/// interval.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct SimulationClock {
    params: ClockParams,
    state: ClockState,
    interval: Duration,
    simulated_time: Duration,
    last_processing_time: Duration,
    total_processing_time: Duration,
    ticks: usize,
    ended: bool,
}

impl FromWorld for SimulationClock {
    fn from_world(world: &mut World) -> Self {
        let params = world
            .get_resource::<TrafficParams>()
            .map(|p| p.clock.clone())
            .unwrap_or_default();
        Self::new(params)
    }
}

impl SimulationClock {
    pub fn new(params: ClockParams) -> Self {
        Self {
            interval: params.initial_interval(),
            params,
            state: ClockState::Idle,
            simulated_time: Duration::ZERO,
            last_processing_time: Duration::ZERO,
            total_processing_time: Duration::ZERO,
            ticks: 0,
            ended: false,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn last_processing_time(&self) -> Duration {
        self.last_processing_time
    }

    /// The model reported that all demand was delivered.
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn statistics(&self) -> ClockStatistics {
        ClockStatistics {
            total_simulated_time: self.simulated_time,
            total_processing_time: self.total_processing_time,
        }
    }

    /// Apply `control`. Only `Step` propagates, so only it yields a report.
    pub fn press(
        &mut self,
        control: Control,
        model: &mut dyn Propagate,
    ) -> Result<Option<TickReport>, SimulationError> {
        match control {
            Control::Start => {
                self.start();
            }
            Control::Pause => self.pause(),
            Control::Stop => self.stop(model),
            Control::Step => return self.step(model).map(Some),
            Control::Slow => {
                self.slow();
            }
            Control::Quick => {
                self.quick();
            }
        }
        Ok(None)
    }

    /// Returns false when the run already ended; stop first.
    pub fn start(&mut self) -> bool {
        if self.ended {
            warn!("Simulation has ended; stop the clock before starting again");
            return false;
        }
        self.state = ClockState::Running;
        true
    }

    pub fn pause(&mut self) {
        if self.state == ClockState::Running {
            self.state = ClockState::Paused;
        }
    }

    /// Reset the model and return to idle with the initial interval.
    pub fn stop(&mut self, model: &mut dyn Propagate) {
        model.reset_flows();
        *self = Self::new(self.params.clone());
    }

    /// One tick regardless of state, leaving the clock paused.
    pub fn step(&mut self, model: &mut dyn Propagate) -> Result<TickReport, SimulationError> {
        let result = self.execute(model);
        self.state = ClockState::Paused;
        result
    }

    pub fn slow(&mut self) -> Duration {
        self.interval += self.params.increment();
        self.interval
    }

    /// Shorten the interval unless that would leave no time to compute a tick.
    pub fn quick(&mut self) -> bool {
        let shorter = self
            .interval
            .checked_sub(self.params.decrement())
            .filter(|next| !next.is_zero() && *next > self.last_processing_time);
        match shorter {
            Some(next) => {
                self.interval = next;
                true
            }
            None => {
                warn!(
                    "Tick interval stays at {:?}: propagation takes {:?}",
                    self.interval, self.last_processing_time
                );
                false
            }
        }
    }

    /// Propagate one tick and account for it. A failed tick consumes
    /// processing time but no simulated time.
    pub fn execute(&mut self, model: &mut dyn Propagate) -> Result<TickReport, SimulationError> {
        let started = Instant::now();
        let result = model.propagate_flows();
        self.last_processing_time = started.elapsed();
        self.total_processing_time += self.last_processing_time;

        let report = result?;
        self.simulated_time += self.interval;
        self.ticks += 1;
        if report.finished && !self.ended {
            self.ended = true;
            self.state = ClockState::Paused;
            info!(
                "Simulation ended after {} ticks: {:.1} vehicles arrived",
                report.tick, report.counts.arrived
            );
        }
        Ok(report)
    }
}
