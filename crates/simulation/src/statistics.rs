//! Congestion statistics over edge snapshots.
//!
//! Everything here is a pure function of [`EdgeSnapshot`]s taken from the
//! flow engine between ticks; nothing reads or mutates live simulation state.

use serde::Serialize;

use crate::config::VOLUME_EPSILON;
use crate::flow::EdgeSnapshot;

fn heavy_traffic_edges(edges: &[EdgeSnapshot]) -> impl Iterator<Item = &EdgeSnapshot> {
    edges.iter().filter(|e| e.heavy_traffic_count > 0)
}

fn moderate_traffic_edges(edges: &[EdgeSnapshot]) -> impl Iterator<Item = &EdgeSnapshot> {
    edges.iter().filter(|e| e.moderate_traffic_count > 0)
}

/// Labels of edges that spent at least one tick heavily congested.
pub fn heavy_traffic_labels(edges: &[EdgeSnapshot]) -> Vec<String> {
    heavy_traffic_edges(edges).map(|e| e.label.clone()).collect()
}

pub fn moderate_traffic_labels(edges: &[EdgeSnapshot]) -> Vec<String> {
    moderate_traffic_edges(edges).map(|e| e.label.clone()).collect()
}

/// Time spent heavily congested per edge: tick count × `interval`.
/// Aligned with [`heavy_traffic_labels`].
pub fn heavy_traffic_data(edges: &[EdgeSnapshot], interval: f64) -> Vec<f64> {
    heavy_traffic_edges(edges)
        .map(|e| e.heavy_traffic_count as f64 * interval)
        .collect()
}

pub fn moderate_traffic_data(edges: &[EdgeSnapshot], interval: f64) -> Vec<f64> {
    moderate_traffic_edges(edges)
        .map(|e| e.moderate_traffic_count as f64 * interval)
        .collect()
}

/// Edge with the most congested ticks; the first one wins ties.
pub fn busiest_edge(edges: &[EdgeSnapshot]) -> Option<&EdgeSnapshot> {
    edges.iter().fold(None, |best: Option<&EdgeSnapshot>, edge| match best {
        Some(b) if congested_ticks(b) >= congested_ticks(edge) => Some(b),
        _ => Some(edge),
    })
}

fn congested_ticks(edge: &EdgeSnapshot) -> u64 {
    edge.heavy_traffic_count as u64 + edge.moderate_traffic_count as u64
}

/// Vehicles on `edge` at every sample: upstream minus downstream.
pub fn traffic_volumes(edge: &EdgeSnapshot) -> Vec<f64> {
    edge.volumes()
}

pub fn busiest_edge_label(edges: &[EdgeSnapshot]) -> Option<&str> {
    busiest_edge(edges).map(|e| e.label.as_str())
}

pub fn busiest_edge_data(edges: &[EdgeSnapshot]) -> Option<Vec<f64>> {
    busiest_edge(edges).map(traffic_volumes)
}

/// Vehicles the busiest edge moves in one free-flow traversal, with one
/// vehicle of margin once that exceeds one. Never below 1.
pub fn busiest_edge_capacity(edges: &[EdgeSnapshot]) -> Option<u64> {
    busiest_edge(edges).map(|edge| {
        let vehicles = (edge.max_flow * edge.duration).trunc();
        if vehicles > 1.0 {
            vehicles as u64 + 1
        } else {
            1
        }
    })
}

/// The sample time nearest to when vehicles leaving the busiest edge last
/// would have left without delay.
///
/// Between the first and last samples with traffic on the edge, the delay is
/// that span minus the free-flow duration; the target is the last sample
/// moved back by the delay. `None` when the edge never carried traffic.
pub fn busiest_edge_delay(edges: &[EdgeSnapshot], time_periods: &[f64]) -> Option<f64> {
    let edge = busiest_edge(edges)?;
    let volumes = traffic_volumes(edge);
    let occupied = |&(_, v): &(usize, &f64)| *v > VOLUME_EPSILON;
    let first = volumes.iter().enumerate().find(occupied)?.0;
    let last = volumes.iter().enumerate().rev().find(occupied)?.0;

    let (&start, &end) = (time_periods.get(first)?, time_periods.get(last)?);
    let delay = (end - start) - edge.duration;
    let target = end - delay;

    time_periods.iter().copied().reduce(|best, period| {
        if (period - target).abs() < (best - target).abs() {
            period
        } else {
            best
        }
    })
}

/// Everything a congestion report shows, gathered in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CongestionReport {
    pub heavy_traffic_labels: Vec<String>,
    pub heavy_traffic_data: Vec<f64>,
    pub moderate_traffic_labels: Vec<String>,
    pub moderate_traffic_data: Vec<f64>,
    pub busiest_edge_label: Option<String>,
    pub busiest_edge_data: Option<Vec<f64>>,
    pub busiest_edge_capacity: Option<u64>,
    pub busiest_edge_delay: Option<f64>,
}

impl CongestionReport {
    /// `interval` converts tick counts to seconds.
    pub fn from_snapshot(edges: &[EdgeSnapshot], time_periods: &[f64], interval: f64) -> Self {
        Self {
            heavy_traffic_labels: heavy_traffic_labels(edges),
            heavy_traffic_data: heavy_traffic_data(edges, interval),
            moderate_traffic_labels: moderate_traffic_labels(edges),
            moderate_traffic_data: moderate_traffic_data(edges, interval),
            busiest_edge_label: busiest_edge_label(edges).map(str::to_string),
            busiest_edge_data: busiest_edge_data(edges),
            busiest_edge_capacity: busiest_edge_capacity(edges),
            busiest_edge_delay: busiest_edge_delay(edges, time_periods),
        }
    }
}
