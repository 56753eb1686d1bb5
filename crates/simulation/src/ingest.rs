//! Builds a [`Graph`] from an Overpass-style element list.
//!
//! Elements are processed in three passes (nodes, ways, relations) and the
//! result is cleaned up: segments touching a node without coordinates have no
//! distance and are purged, then any node left without edges is purged.

use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{EARTH_RADIUS_M, FIRST_EDGE_ID, KMH_TO_MS};
use crate::error::NetworkError;
use crate::graph::{tags, Edge, EdgeId, Graph, Member, Node, NodeId, Relation, RelationId, Tag};
use crate::params::NetworkParams;

/// Top-level Overpass API response. Fields other than `elements` are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node {
        id: i64,
        lat: Option<f64>,
        lon: Option<f64>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    /// Areas, counts and anything else the network does not use.
    #[serde(other)]
    Other,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub nodes: usize,
    pub edges: usize,
    pub relations: usize,
    pub invalid_edges_removed: usize,
    pub dead_nodes_removed: usize,
}

pub fn parse_overpass(json: &str) -> Result<OverpassResponse, serde_json::Error> {
    serde_json::from_str(json)
}

/// Build a cleaned graph from raw elements. Zero elements yield an empty graph.
pub fn build_graph(elements: &[Element], params: &NetworkParams) -> Result<Graph, NetworkError> {
    build_graph_with_report(elements, params).map(|(graph, _)| graph)
}

pub fn build_graph_with_report(
    elements: &[Element],
    params: &NetworkParams,
) -> Result<(Graph, IngestReport), NetworkError> {
    let mut graph = Graph::new();

    for element in elements {
        if let Element::Node { id, lat, lon, tags } = element {
            let mut node = Node::new(NodeId(*id));
            node.lat = *lat;
            node.lon = *lon;
            node.tags = to_tags(tags);
            graph.add_or_update_node(node)?;
        }
    }

    let mut next_edge = FIRST_EDGE_ID;
    for element in elements {
        if let Element::Way { id, nodes, tags } = element {
            next_edge = add_way(&mut graph, *id, nodes, &to_tags(tags), next_edge, params)?;
        }
    }

    for element in elements {
        if let Element::Relation { id, members, tags } = element {
            graph.add_relation(Relation {
                id: RelationId(*id),
                members: members.clone(),
                tags: to_tags(tags),
            })?;
        }
    }
    let unresolved = graph
        .relations()
        .iter()
        .flat_map(|relation| &relation.members)
        .filter(|member| graph.resolve_member(member).is_err())
        .count();
    if unresolved > 0 {
        debug!("{unresolved} relation members reference elements outside the network");
    }

    let invalid_edges_removed = graph.remove_invalidated_edges()?;
    let dead_nodes_removed = graph.remove_dead_nodes()?;

    let report = IngestReport {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        relations: graph.relation_count(),
        invalid_edges_removed,
        dead_nodes_removed,
    };
    info!(
        "Ingested network: {} nodes, {} edges, {} relations ({} invalid edges, {} dead nodes removed)",
        report.nodes, report.edges, report.relations, invalid_edges_removed, dead_nodes_removed
    );
    Ok((graph, report))
}

/// Cut a way into one edge per consecutive pair of node refs. Returns the
/// next free edge id.
fn add_way(
    graph: &mut Graph,
    way: i64,
    refs: &[i64],
    way_tags: &[Tag],
    mut next_edge: u64,
    params: &NetworkParams,
) -> Result<u64, NetworkError> {
    let reversed = tags::is_reversed_oneway(way_tags);
    let speed_kmh = tags::maxspeed_kmh(way_tags).unwrap_or_else(|| {
        params
            .speeds
            .for_class(tags::tag_value(way_tags, "highway").unwrap_or_default())
    });

    for pair in refs.windows(2) {
        let (a, b) = (NodeId(pair[0]), NodeId(pair[1]));
        if a == b {
            continue;
        }
        // Refs to nodes missing from the response get a bare placeholder;
        // the segment then has no distance and is purged in cleanup.
        for id in [a, b] {
            if !graph.contains_node(id) {
                graph.add_or_update_node(Node::new(id))?;
            }
        }
        let (origin, destination) = if reversed { (b, a) } else { (a, b) };

        let mut edge = Edge::new(EdgeId(next_edge), origin, destination).with_way(way);
        edge.tags = way_tags.to_vec();
        let from = graph.get_node(origin)?.coords();
        let to = graph.get_node(destination)?.coords();
        if let (Some(from), Some(to)) = (from, to) {
            let distance = haversine_distance(from, to);
            edge = edge.with_length(distance, distance / (speed_kmh * KMH_TO_MS));
        }
        graph.add_edge(edge)?;
        next_edge += 1;
    }
    Ok(next_edge)
}

fn to_tags(map: &BTreeMap<String, String>) -> Vec<Tag> {
    map.iter().map(|(key, value)| Tag::new(key, value)).collect()
}

/// Great-circle distance in metres between two `(lat, lon)` points in degrees.
pub fn haversine_distance(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}
