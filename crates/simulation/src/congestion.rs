//! Per-tick congestion classification of an edge.
//!
//! Occupancy is the share of an edge's jam storage currently filled with
//! vehicles (0 = empty, 1 = standstill). Each tick an edge is graded:
//! - Free: occupancy below `moderate_occupancy`
//! - Moderate: occupancy in `[moderate_occupancy, heavy_occupancy)`
//! - Heavy: occupancy at or above `heavy_occupancy`

use serde::{Deserialize, Serialize};

use crate::params::FlowParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CongestionLevel {
    #[default]
    Free,
    Moderate,
    Heavy,
}

impl CongestionLevel {
    pub fn from_occupancy(occupancy: f64, moderate: f64, heavy: f64) -> Self {
        if occupancy >= heavy {
            CongestionLevel::Heavy
        } else if occupancy >= moderate {
            CongestionLevel::Moderate
        } else {
            CongestionLevel::Free
        }
    }

    pub fn classify(occupancy: f64, params: &FlowParams) -> Self {
        Self::from_occupancy(occupancy, params.moderate_occupancy, params.heavy_occupancy)
    }
}
