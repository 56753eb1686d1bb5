//! Data-driven traffic parameters.
//!
//! Every tunable of ingestion, path search, the flow model and the clock
//! lives in [`TrafficParams`]. The defaults describe a generic urban network;
//! a JSON document with any subset of the fields overrides them, e.g.
//!
//! ```json
//! { "flow": { "time_step_secs": 2.0 }, "paths": { "k": 5 } }
//! ```

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

// =============================================================================
// Network
// =============================================================================

/// Free-flow speeds in km/h, keyed by the `highway` class of a way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighwaySpeeds {
    pub motorway: f64,
    pub trunk: f64,
    pub primary: f64,
    pub secondary: f64,
    pub tertiary: f64,
    pub unclassified: f64,
    pub residential: f64,
    pub living_street: f64,
    pub service: f64,
    /// Used for any class not listed above, or ways without a `highway` tag.
    pub fallback: f64,
}

impl Default for HighwaySpeeds {
    fn default() -> Self {
        Self {
            motorway: 110.0,
            trunk: 90.0,
            primary: 70.0,
            secondary: 60.0,
            tertiary: 50.0,
            unclassified: 40.0,
            residential: 30.0,
            living_street: 10.0,
            service: 20.0,
            fallback: 30.0,
        }
    }
}

impl HighwaySpeeds {
    fn entries(&self) -> [(&'static str, f64); 10] {
        [
            ("motorway", self.motorway),
            ("trunk", self.trunk),
            ("primary", self.primary),
            ("secondary", self.secondary),
            ("tertiary", self.tertiary),
            ("unclassified", self.unclassified),
            ("residential", self.residential),
            ("living_street", self.living_street),
            ("service", self.service),
            ("fallback", self.fallback),
        ]
    }

    /// Every speed must be a positive, finite km/h value; a zero speed would
    /// give its edges an infinite free-flow duration.
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (class, speed) in self.entries() {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(ParamsError::Invalid {
                    name: format!("network.speeds.{class}"),
                    reason: format!("must be a positive speed, got {speed}"),
                });
            }
        }
        Ok(())
    }

    /// Speed for a `highway` value. `_link` ramps share their parent's speed.
    pub fn for_class(&self, class: &str) -> f64 {
        match class.trim_end_matches("_link") {
            "motorway" => self.motorway,
            "trunk" => self.trunk,
            "primary" => self.primary,
            "secondary" => self.secondary,
            "tertiary" => self.tertiary,
            "unclassified" => self.unclassified,
            "residential" => self.residential,
            "living_street" => self.living_street,
            "service" => self.service,
            _ => self.fallback,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkParams {
    pub speeds: HighwaySpeeds,
}

// =============================================================================
// Paths
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathParams {
    /// Paths enumerated per O/D pair.
    pub k: usize,
    /// Candidate expansions allowed per O/D pair before the search gives up
    /// and returns what it has.
    pub max_expansions: usize,
}

impl Default for PathParams {
    fn default() -> Self {
        Self {
            k: 3,
            max_expansions: 10_000,
        }
    }
}

// =============================================================================
// Flow model
// =============================================================================

/// Link transmission model parameters. Units are SI: seconds, metres,
/// vehicles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowParams {
    /// Simulated seconds per tick.
    pub time_step_secs: f64,
    /// Demand is released uniformly over this many seconds from t = 0.
    pub loading_period_secs: f64,
    /// Maximum discharge per lane, in vehicles per second.
    pub lane_capacity: f64,
    /// Vehicles per metre per lane at standstill.
    pub jam_density: f64,
    /// Backward wave speed in metres per second.
    pub wave_speed: f64,
    /// An edge is congested once its density exceeds this multiple of the
    /// critical density; its travel time then follows the congested branch.
    pub congestion_threshold: f64,
    /// Occupancy (share of jam storage) at which an edge counts as moderately
    /// congested for the tick.
    pub moderate_occupancy: f64,
    /// Occupancy at which an edge counts as heavily congested.
    pub heavy_occupancy: f64,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            time_step_secs: 1.0,
            loading_period_secs: 600.0,
            lane_capacity: 0.5,
            jam_density: 0.15,
            wave_speed: 5.0,
            congestion_threshold: 1.0,
            moderate_occupancy: 0.25,
            heavy_occupancy: 0.5,
        }
    }
}

// =============================================================================
// Clock
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockParams {
    /// Wall-clock milliseconds between ticks when the clock starts.
    pub initial_interval_ms: u64,
    /// Added to the interval by `Slow`.
    pub interval_increment_ms: u64,
    /// Removed from the interval by `Quick`.
    pub interval_decrement_ms: u64,
}

impl Default for ClockParams {
    fn default() -> Self {
        Self {
            initial_interval_ms: 1000,
            interval_increment_ms: 100,
            interval_decrement_ms: 100,
        }
    }
}

impl ClockParams {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn increment(&self) -> Duration {
        Duration::from_millis(self.interval_increment_ms)
    }

    pub fn decrement(&self) -> Duration {
        Duration::from_millis(self.interval_decrement_ms)
    }
}

// =============================================================================
// Top-level resource
// =============================================================================

/// All traffic tunables, grouped by subsystem.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficParams {
    pub network: NetworkParams,
    pub paths: PathParams,
    pub flow: FlowParams,
    pub clock: ClockParams,
}

impl TrafficParams {
    /// Parse parameters from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        self.network.speeds.validate()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
