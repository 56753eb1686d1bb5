//! k-shortest loopless paths for O/D pairs.
//!
//! Edge weights are the edge distance or free-flow duration, converted to
//! fixed point so ties compare exactly; reported costs therefore carry
//! millimetre / millisecond precision.

mod arcs;
mod ksp;

#[cfg(test)]
mod tests;

pub use arcs::{ArcGraph, DirectedArc};

use crate::config::WEIGHT_SCALE;
use crate::error::{EntityRef, NetworkError};
use crate::graph::{Graph, NodeId, OdPair, Path, PathType};
use crate::params::PathParams;

/// Up to `k` paths per pair, in pair order. An unreachable destination gives
/// an empty list; a pair whose origin equals its destination gives one
/// zero-length path.
pub fn compute_shortest_paths(
    graph: &Graph,
    od_pairs: &[OdPair],
    k: usize,
) -> Result<Vec<Vec<Path>>, NetworkError> {
    compute_shortest_paths_with_limit(graph, od_pairs, k, PathParams::default().max_expansions)
}

pub fn compute_shortest_paths_with_limit(
    graph: &Graph,
    od_pairs: &[OdPair],
    k: usize,
    max_expansions: usize,
) -> Result<Vec<Vec<Path>>, NetworkError> {
    for (i, pair) in od_pairs.iter().enumerate() {
        for (role, node) in [("origin", pair.origin), ("destination", pair.destination)] {
            if !graph.contains_node(node) {
                return Err(NetworkError::InvalidReference {
                    context: format!("O/D pair {i} {role}"),
                    target: EntityRef::Node(node),
                });
            }
        }
    }

    let mut by_distance: Option<ArcGraph> = None;
    let mut by_duration: Option<ArcGraph> = None;
    let mut results = Vec::with_capacity(od_pairs.len());
    for pair in od_pairs {
        let arcs = match pair.path_type {
            PathType::Distance => {
                by_distance.get_or_insert_with(|| ArcGraph::from_graph(graph, PathType::Distance))
            }
            PathType::Duration => {
                by_duration.get_or_insert_with(|| ArcGraph::from_graph(graph, PathType::Duration))
            }
        };
        results.push(k_shortest_paths(
            arcs,
            pair.origin,
            pair.destination,
            k,
            max_expansions,
        ));
    }
    Ok(results)
}

/// Up to `k` paths between two nodes of a prepared arc graph. Nodes the arc
/// graph does not know are unreachable.
pub fn k_shortest_paths(
    arcs: &ArcGraph,
    origin: NodeId,
    destination: NodeId,
    k: usize,
    max_expansions: usize,
) -> Vec<Path> {
    let (Some(source), Some(target)) = (
        arcs.find_node_index(origin),
        arcs.find_node_index(destination),
    ) else {
        return Vec::new();
    };
    ksp::k_shortest_paths(arcs, source, target, k, max_expansions)
        .into_iter()
        .map(|ranked| Path {
            nodes: ranked
                .nodes
                .iter()
                .map(|&i| arcs.nodes[i as usize])
                .collect(),
            edges: ranked.key.edges,
            cost: ranked.key.cost as f64 / WEIGHT_SCALE,
        })
        .collect()
}
