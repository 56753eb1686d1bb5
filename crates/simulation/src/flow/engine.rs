use bevy::prelude::*;
use serde::Serialize;

use crate::config::{
    EMPTY_NETWORK_TOLERANCE, MIN_CONGESTED_SPEED, OCCUPANCY_TOLERANCE,
};
use crate::congestion::CongestionLevel;
use crate::error::{NetworkError, SimulationError};
use crate::graph::{tags, EdgeId, Graph};
use crate::params::FlowParams;

use super::link::{Direction, Link, LinkGeometry};
use super::routing::Routing;
use super::snapshot::EdgeSnapshot;

/// Running vehicle totals. All values are vehicles (fractional).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SimulationCounts {
    /// Released from origins onto their first link.
    pub departed: f64,
    /// Left the network at their destination.
    pub arrived: f64,
    /// Currently on a link.
    pub en_route: f64,
    /// Released by the demand profile but still queued at the origin.
    pub waiting: f64,
}

/// Outcome of one propagated tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: usize,
    /// Simulated seconds at the end of the tick.
    pub time: f64,
    pub counts: SimulationCounts,
    /// Vehicle-weighted mean speed over the network, m/s.
    pub average_speed: f64,
    pub heavy_edges: usize,
    pub moderate_edges: usize,
    pub finished: bool,
}

/// Congestion state of one edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EdgeTraffic {
    pub level: CongestionLevel,
    /// Share of jam storage occupied at the last tick.
    pub occupancy: f64,
    pub heavy_traffic_count: u32,
    pub moderate_traffic_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
struct EdgeLinks {
    id: EdgeId,
    /// Arena position in the graph at load time.
    position: usize,
    duration: f64,
    /// One link per traversable direction.
    links: Vec<usize>,
}

/// Values written to a graph edge at commit time.
struct EdgeUpdate {
    flow: f64,
    link_flow: f64,
    density: f64,
    velocity: f64,
    duration_in_traffic: f64,
    vehicles: f64,
    traffic: EdgeTraffic,
}

/// Link transmission model over the loaded graph.
///
/// The engine owns the cumulative curves of every link; the graph only
/// receives the derived per-edge fields. A tick is computed from the previous
/// samples into scratch buffers, validated, and only then committed, so a
/// failing tick leaves both the engine and the graph untouched.
#[derive(Resource, Debug, Clone, Default)]
pub struct FlowEngine {
    params: FlowParams,
    links: Vec<Link>,
    edges: Vec<EdgeLinks>,
    routing: Routing,
    queues: Vec<f64>,
    time_periods: Vec<f64>,
    traffic: Vec<EdgeTraffic>,
    counts: SimulationCounts,
    average_speed: f64,
    loaded: bool,
}

impl FlowEngine {
    /// Build links for every valid edge and routing from the graph's
    /// assignment matrix.
    pub fn load(graph: &Graph, params: &FlowParams) -> Result<Self, SimulationError> {
        validate(params)?;
        let assignment = graph
            .assignment_matrix()
            .ok_or(NetworkError::MissingArtifact("assignment matrix"))?;

        let mut ordered: Vec<_> = graph.edges().iter().collect();
        ordered.sort_by_key(|edge| edge.id);

        let mut links = Vec::with_capacity(ordered.len() * 2);
        let mut edges = Vec::with_capacity(ordered.len());
        for edge in ordered {
            let Some(length) = edge.distance.filter(|d| d.is_finite()) else {
                warn!("Edge {} has no length and carries no traffic", edge.id);
                continue;
            };
            if edge.origin == edge.destination {
                continue;
            }
            let oneway = edge.is_oneway();
            let total_lanes = tags::lanes(&edge.tags).unwrap_or(if oneway { 1 } else { 2 }) as f64;
            let lanes = if oneway {
                total_lanes
            } else {
                (total_lanes / 2.0).max(1.0)
            };
            let geometry = LinkGeometry::new(length, edge.duration, lanes, params);

            let mut ids = vec![links.len()];
            links.push(Link::new(edge.id, Direction::Forward, edge.origin, edge.destination, geometry));
            if !oneway {
                ids.push(links.len());
                links.push(Link::new(edge.id, Direction::Backward, edge.destination, edge.origin, geometry));
            }
            edges.push(EdgeLinks {
                id: edge.id,
                position: graph.edge_position(edge.id)?,
                duration: edge.duration,
                links: ids,
            });
        }

        let routing = Routing::build(graph, assignment, &links)?;

        let shortest = links
            .iter()
            .map(|l| l.geometry.free_flow_time.min(l.geometry.backward_time()))
            .fold(f64::INFINITY, f64::min);
        if params.time_step_secs > shortest {
            warn!(
                "Time step of {}s exceeds the shortest link traversal ({shortest:.2}s); short links will be under-resolved",
                params.time_step_secs
            );
        }
        info!(
            "Flow engine loaded: {} links on {} edges, {:.1} vehicles from {} origins",
            links.len(),
            edges.len(),
            routing.total_demand(),
            routing.sources.len()
        );

        Ok(Self {
            params: params.clone(),
            queues: vec![0.0; routing.sources.len()],
            traffic: vec![EdgeTraffic::default(); edges.len()],
            links,
            edges,
            routing,
            time_periods: Vec::new(),
            counts: SimulationCounts::default(),
            average_speed: 0.0,
            loaded: true,
        })
    }

    // -------------------------------------------------------------------------
    // Propagation
    // -------------------------------------------------------------------------

    /// Advance every link by one time step and write the derived fields to
    /// `graph`. The first call also records the empty state at t = 0.
    pub fn propagate(&mut self, graph: &mut Graph) -> Result<TickReport, SimulationError> {
        if !self.loaded {
            return Err(SimulationError::NotLoaded);
        }
        for edge in &self.edges {
            if graph.edge_position(edge.id)? != edge.position {
                return Err(NetworkError::Corrupted(format!(
                    "edge {} moved since the flow engine was loaded",
                    edge.id
                ))
                .into());
            }
        }

        let seeded = !self.time_periods.is_empty();
        let dt = self.params.time_step_secs;
        let tick = self.time_periods.len().max(1);
        let now = (tick - 1) as f64 * dt;
        let next = tick as f64 * dt;
        let n = self.links.len();

        // Demand released during [now, next), queued at its origin.
        let released = self.release_fraction(tick, now, next);
        let mut queues: Vec<f64> = self
            .queues
            .iter()
            .zip(&self.routing.sources)
            .map(|(queue, source)| queue + source.total * released)
            .collect();

        let (sending, receiving): (Vec<f64>, Vec<f64>) = if seeded {
            self.links
                .iter()
                .map(|link| (link.sending(now, dt), link.receiving(now, dt)))
                .unzip()
        } else {
            // Nothing has entered yet: links can only receive.
            self.links
                .iter()
                .map(|link| (0.0, link.geometry.storage().min(link.geometry.capacity * dt)))
                .unzip()
        };

        // Node model: every incoming flow is scaled by the tightest receiving
        // ratio among the links it feeds (FIFO).
        let mut demand = vec![0.0; n];
        for (a, turns) in self.routing.turns.iter().enumerate() {
            for &(b, fraction) in turns {
                demand[b] += sending[a] * fraction;
            }
        }
        for (queue, source) in queues.iter().zip(&self.routing.sources) {
            for &(b, fraction) in &source.turns {
                demand[b] += queue * fraction;
            }
        }
        let ratio: Vec<f64> = demand
            .iter()
            .zip(&receiving)
            .map(|(&d, &r)| if d > r { r / d } else { 1.0 })
            .collect();
        let admitted = |turns: &[(usize, f64)]| {
            turns
                .iter()
                .map(|&(b, _)| ratio[b])
                .fold(1.0, f64::min)
        };

        let mut inflow = vec![0.0; n];
        let mut outflow = vec![0.0; n];
        let mut arrived = 0.0;
        for (a, turns) in self.routing.turns.iter().enumerate() {
            let moved = sending[a] * admitted(turns);
            outflow[a] = moved;
            for &(b, fraction) in turns {
                inflow[b] += moved * fraction;
            }
            arrived += moved * self.routing.exits[a];
        }
        let mut departed = 0.0;
        for (queue, source) in queues.iter_mut().zip(&self.routing.sources) {
            let moved = *queue * admitted(&source.turns);
            *queue -= moved;
            departed += moved;
            for &(b, fraction) in &source.turns {
                inflow[b] += moved * fraction;
            }
        }

        // New samples, validated before anything is committed.
        let mut upstream = Vec::with_capacity(n);
        let mut downstream = Vec::with_capacity(n);
        for (a, link) in self.links.iter().enumerate() {
            let u = link.upstream.last() + inflow[a];
            let d = link.downstream.last() + outflow[a];
            if !u.is_finite() || !d.is_finite() {
                return Err(SimulationError::NonFinite {
                    edge: link.edge,
                    tick,
                    quantity: "cumulative count",
                });
            }
            if u - d < -OCCUPANCY_TOLERANCE {
                return Err(SimulationError::NegativeOccupancy {
                    edge: link.edge,
                    tick,
                    vehicles: u - d,
                });
            }
            upstream.push(u);
            downstream.push(d);
        }

        let updates = self.edge_updates(&upstream, &downstream, &inflow, &outflow, tick)?;

        // Commit.
        if !seeded {
            self.time_periods.push(0.0);
            for link in &mut self.links {
                link.upstream.push(0.0);
                link.downstream.push(0.0);
            }
        }
        for (a, link) in self.links.iter_mut().enumerate() {
            link.upstream.push(upstream[a]);
            link.downstream.push(downstream[a]);
        }
        self.time_periods.push(next);
        self.queues = queues;

        let mut on_network = 0.0;
        let mut weighted_speed = 0.0;
        let (mut heavy_edges, mut moderate_edges) = (0, 0);
        for ((edge, update), traffic) in self.edges.iter().zip(updates).zip(&mut self.traffic) {
            on_network += update.vehicles;
            weighted_speed += update.vehicles * update.velocity;
            match update.traffic.level {
                CongestionLevel::Heavy => heavy_edges += 1,
                CongestionLevel::Moderate => moderate_edges += 1,
                CongestionLevel::Free => {}
            }
            *traffic = update.traffic;
            if let Some(target) = graph.edge_at_mut(edge.position) {
                target.flow = update.flow;
                target.link_flow = update.link_flow;
                target.density = update.density;
                target.velocity = update.velocity;
                target.duration_in_traffic = update.duration_in_traffic;
            }
        }

        self.counts = SimulationCounts {
            departed: self.counts.departed + departed,
            arrived: self.counts.arrived + arrived,
            en_route: on_network,
            waiting: self.queues.iter().sum(),
        };
        self.average_speed = if on_network > EMPTY_NETWORK_TOLERANCE {
            weighted_speed / on_network
        } else {
            0.0
        };

        Ok(TickReport {
            tick,
            time: next,
            counts: self.counts,
            average_speed: self.average_speed,
            heavy_edges,
            moderate_edges,
            finished: self.is_finished(),
        })
    }

    /// Share of each origin's demand released during `[now, next)`.
    fn release_fraction(&self, tick: usize, now: f64, next: f64) -> f64 {
        let loading = self.params.loading_period_secs;
        if loading <= 0.0 {
            return if tick == 1 { 1.0 } else { 0.0 };
        }
        ((next.min(loading) - now.max(0.0)) / loading).max(0.0)
    }

    fn edge_updates(
        &self,
        upstream: &[f64],
        downstream: &[f64],
        inflow: &[f64],
        outflow: &[f64],
        tick: usize,
    ) -> Result<Vec<EdgeUpdate>, SimulationError> {
        let dt = self.params.time_step_secs;
        let threshold = self.params.congestion_threshold;
        self.edges
            .iter()
            .zip(&self.traffic)
            .map(|(edge, previous)| {
                let mut vehicles = 0.0;
                let mut storage = 0.0;
                let mut flow = 0.0;
                let mut link_flow = 0.0;
                let mut weighted_speed = 0.0;
                let mut congested = false;
                for &a in &edge.links {
                    let geometry = &self.links[a].geometry;
                    let on_link = (upstream[a] - downstream[a]).max(0.0);
                    let density = on_link / geometry.length;
                    vehicles += on_link;
                    storage += geometry.storage();
                    flow += outflow[a] / dt;
                    link_flow += inflow[a] / dt;
                    weighted_speed += on_link * geometry.velocity_at(density);
                    congested |= density > threshold * geometry.critical_density();
                }
                let geometry = &self.links[edge.links[0]].geometry;
                let velocity = if vehicles > EMPTY_NETWORK_TOLERANCE {
                    weighted_speed / vehicles
                } else {
                    geometry.free_speed
                };
                let duration_in_traffic = if congested {
                    edge.duration * geometry.free_speed / velocity.max(MIN_CONGESTED_SPEED)
                } else {
                    edge.duration
                };
                let occupancy = if storage > 0.0 { vehicles / storage } else { 0.0 };
                let density = vehicles / geometry.length;

                for (quantity, value) in [
                    ("velocity", velocity),
                    ("density", density),
                    ("duration in traffic", duration_in_traffic),
                ] {
                    if !value.is_finite() {
                        return Err(SimulationError::NonFinite {
                            edge: edge.id,
                            tick,
                            quantity,
                        });
                    }
                }

                let level = CongestionLevel::classify(occupancy, &self.params);
                let mut traffic = EdgeTraffic {
                    level,
                    occupancy,
                    ..*previous
                };
                match level {
                    CongestionLevel::Heavy => traffic.heavy_traffic_count += 1,
                    CongestionLevel::Moderate => traffic.moderate_traffic_count += 1,
                    CongestionLevel::Free => {}
                }

                Ok(EdgeUpdate {
                    flow,
                    link_flow,
                    density,
                    velocity,
                    duration_in_traffic,
                    vehicles,
                    traffic,
                })
            })
            .collect()
    }

    /// Empty every series and counter. Links and routing stay loaded.
    pub fn reset_flows(&mut self) {
        for link in &mut self.links {
            link.upstream.clear();
            link.downstream.clear();
        }
        self.time_periods.clear();
        self.queues.iter_mut().for_each(|q| *q = 0.0);
        self.traffic.iter_mut().for_each(|t| *t = EdgeTraffic::default());
        self.counts = SimulationCounts::default();
        self.average_speed = 0.0;
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn params(&self) -> &FlowParams {
        &self.params
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Simulated seconds of every sample, starting at 0.
    pub fn time_periods(&self) -> &[f64] {
        &self.time_periods
    }

    /// Ticks propagated since the last reset.
    pub fn tick_count(&self) -> usize {
        self.time_periods.len().saturating_sub(1)
    }

    pub fn counts(&self) -> SimulationCounts {
        self.counts
    }

    pub fn average_speed(&self) -> f64 {
        self.average_speed
    }

    pub fn total_demand(&self) -> f64 {
        self.routing.total_demand()
    }

    /// All demand released and delivered.
    pub fn is_finished(&self) -> bool {
        let Some(&time) = self.time_periods.last() else {
            return false;
        };
        time >= self.params.loading_period_secs
            && self.counts.en_route + self.counts.waiting <= EMPTY_NETWORK_TOLERANCE
    }

    pub fn traffic(&self, edge: EdgeId) -> Option<&EdgeTraffic> {
        self.edge_slot(edge).map(|i| &self.traffic[i])
    }

    /// Cumulative vehicles that entered `edge` (both directions), per sample.
    pub fn upstream(&self, edge: EdgeId) -> Vec<f64> {
        self.summed(edge, |link| link.upstream.values())
    }

    /// Cumulative vehicles that left `edge` (both directions), per sample.
    pub fn downstream(&self, edge: EdgeId) -> Vec<f64> {
        self.summed(edge, |link| link.downstream.values())
    }

    /// Inflow rate of `edge` over the last tick, vehicles per second.
    pub fn calc_link_flow(&self, edge: EdgeId) -> f64 {
        let upstream = self.upstream(edge);
        match upstream.as_slice() {
            [.., previous, last] => (last - previous) / self.params.time_step_secs,
            _ => 0.0,
        }
    }

    /// Copy of every edge's series and counters, in edge id order.
    pub fn snapshot(&self, graph: &Graph) -> Vec<EdgeSnapshot> {
        self.edges
            .iter()
            .zip(&self.traffic)
            .map(|(edge, traffic)| EdgeSnapshot {
                edge_id: edge.id,
                label: graph
                    .get_edge(edge.id)
                    .map(|e| e.label())
                    .unwrap_or_else(|_| format!("edge {}", edge.id)),
                duration: edge.duration,
                max_flow: edge
                    .links
                    .iter()
                    .map(|&a| self.links[a].geometry.capacity)
                    .sum(),
                heavy_traffic_count: traffic.heavy_traffic_count,
                moderate_traffic_count: traffic.moderate_traffic_count,
                upstream: self.upstream(edge.id),
                downstream: self.downstream(edge.id),
            })
            .collect()
    }

    fn edge_slot(&self, edge: EdgeId) -> Option<usize> {
        self.edges.binary_search_by_key(&edge, |e| e.id).ok()
    }

    fn summed<'a>(&'a self, edge: EdgeId, series: impl Fn(&'a Link) -> &'a [f64]) -> Vec<f64> {
        let Some(slot) = self.edge_slot(edge) else {
            return Vec::new();
        };
        let mut total = vec![0.0; self.time_periods.len()];
        for &a in &self.edges[slot].links {
            for (sum, value) in total.iter_mut().zip(series(&self.links[a])) {
                *sum += value;
            }
        }
        total
    }
}

fn validate(params: &FlowParams) -> Result<(), SimulationError> {
    let positive = [
        ("time_step_secs", params.time_step_secs),
        ("lane_capacity", params.lane_capacity),
        ("jam_density", params.jam_density),
        ("wave_speed", params.wave_speed),
    ];
    for (name, value) in positive {
        if !value.is_finite() || value <= 0.0 {
            return Err(SimulationError::InvalidParams(format!(
                "{name} must be positive, got {value}"
            )));
        }
    }
    if !params.loading_period_secs.is_finite() || params.loading_period_secs < 0.0 {
        return Err(SimulationError::InvalidParams(format!(
            "loading_period_secs must be non-negative, got {}",
            params.loading_period_secs
        )));
    }
    Ok(())
}
