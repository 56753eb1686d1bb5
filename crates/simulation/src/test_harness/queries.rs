//! Query, control and simulation-tick methods for `TestNetwork`.

use bevy::prelude::*;

use crate::clock::{ClockControlEvent, Control, SimulationClock};
use crate::flow::{EdgeSnapshot, FlowEngine, SimulationCounts};
use crate::graph::Graph;

use super::TestNetwork;

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run N fixed-update ticks by directly executing the `FixedUpdate`
    /// schedule. This bypasses Bevy's time system entirely, so the clock
    /// interval does not slow tests down.
    ///
    /// A `yield_now()` is inserted between ticks so that background threads
    /// (e.g. `AsyncComputeTaskPool`) get a chance to make progress.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
            std::thread::yield_now();
        }
    }

    /// Tick until the clock stops running or `max_ticks` have passed.
    /// Returns the number of ticks executed.
    pub fn tick_while_running(&mut self, max_ticks: u32) -> u32 {
        for n in 0..max_ticks {
            if !self.clock().is_running() {
                return n;
            }
            self.tick(1);
        }
        max_ticks
    }

    /// Run the `Update` schedule once (controls, assignment tasks).
    pub fn update(&mut self) {
        self.app.world_mut().run_schedule(Update);
    }

    /// Press a clock control and apply it.
    pub fn press(&mut self, control: Control) {
        self.app.world_mut().send_event(ClockControlEvent(control));
        self.update();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn resource<R: Resource>(&self) -> &R {
        self.app.world().resource::<R>()
    }

    pub fn resource_mut<R: Resource>(&mut self) -> Mut<'_, R> {
        self.app.world_mut().resource_mut::<R>()
    }

    pub fn graph(&self) -> &Graph {
        self.resource::<Graph>()
    }

    pub fn engine(&self) -> &FlowEngine {
        self.resource::<FlowEngine>()
    }

    pub fn clock(&self) -> &SimulationClock {
        self.resource::<SimulationClock>()
    }

    pub fn counts(&self) -> SimulationCounts {
        self.engine().counts()
    }

    pub fn snapshot(&self) -> Vec<EdgeSnapshot> {
        self.engine().snapshot(self.graph())
    }

    /// Take every pending event of type `E`.
    pub fn drain_events<E: Event>(&mut self) -> Vec<E> {
        self.app
            .world_mut()
            .resource_mut::<Events<E>>()
            .drain()
            .collect()
    }
}
