//! Fixed constants shared by the network, path search and flow model.

/// Path weights are compared as integers: metres or seconds times this factor.
pub const WEIGHT_SCALE: f64 = 1000.0;

/// Mean Earth radius used by the haversine distance, in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Edge ids handed out by ingestion start here and increase by one per segment.
pub const FIRST_EDGE_ID: u64 = 1;

pub const KMH_TO_MS: f64 = 1.0 / 3.6;
pub const MPH_TO_KMH: f64 = 1.609_344;

/// Volumes below this are treated as zero when scanning series.
pub const VOLUME_EPSILON: f64 = 1e-9;

/// Rounding slack allowed on link occupancy before it counts as negative.
pub const OCCUPANCY_TOLERANCE: f64 = 1e-6;

/// Vehicles remaining below this count as an empty network.
pub const EMPTY_NETWORK_TOLERANCE: f64 = 1e-6;

/// Shortest link the flow model will build, roughly one car length in metres.
pub const MIN_LINK_LENGTH: f64 = 7.5;

/// Shortest free-flow traversal time a link may have, in seconds.
pub const MIN_FREE_FLOW_TIME: f64 = 0.1;

/// Congested speeds are floored here (m/s) so travel times stay finite.
pub const MIN_CONGESTED_SPEED: f64 = 0.1;
