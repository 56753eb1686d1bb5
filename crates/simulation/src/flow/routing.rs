use std::collections::{BTreeMap, HashMap};

use crate::assignment::AssignmentMatrix;
use crate::error::NetworkError;
use crate::graph::{EdgeId, Graph, NodeId, Path};

use super::link::{Direction, Link};

/// Demand entering the network at one origin node.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub node: NodeId,
    /// Vehicles over the whole loading period.
    pub total: f64,
    /// `(link, fraction)` of released vehicles entering each first link.
    pub turns: Vec<(usize, f64)>,
}

/// Where each link's outflow goes, derived from the assigned path volumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routing {
    /// Per link: `(downstream link, fraction)` pairs in link order.
    pub turns: Vec<Vec<(usize, f64)>>,
    /// Per link: fraction of outflow that reaches its destination at the head.
    pub exits: Vec<f64>,
    /// One per origin node, in node id order.
    pub sources: Vec<Source>,
}

impl Routing {
    pub fn build(
        graph: &Graph,
        assignment: &AssignmentMatrix,
        links: &[Link],
    ) -> Result<Self, NetworkError> {
        let link_index: HashMap<(EdgeId, Direction), usize> = links
            .iter()
            .enumerate()
            .map(|(i, link)| ((link.edge, link.direction), i))
            .collect();

        let mut through: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); links.len()];
        let mut exits = vec![0.0; links.len()];
        let mut origins: BTreeMap<NodeId, BTreeMap<usize, f64>> = BTreeMap::new();

        for (od, list) in graph.shortest_paths().iter().enumerate() {
            for (rank, path) in list.iter().enumerate() {
                let Some(row) = assignment.row_of(od, rank) else {
                    continue;
                };
                let volume = assignment.path_volume(row);
                if volume <= 0.0 || path.edges.is_empty() {
                    continue;
                }
                let route = path_links(graph, path, &link_index)?;
                for pair in route.windows(2) {
                    *through[pair[0]].entry(pair[1]).or_default() += volume;
                }
                if let (Some(&first), Some(&last)) = (route.first(), route.last()) {
                    exits[last] += volume;
                    *origins
                        .entry(links[first].tail)
                        .or_default()
                        .entry(first)
                        .or_default() += volume;
                }
            }
        }

        let mut turns = Vec::with_capacity(links.len());
        for (next, exit) in through.into_iter().zip(exits.iter_mut()) {
            let total: f64 = next.values().sum::<f64>() + *exit;
            if total > 0.0 {
                turns.push(next.into_iter().map(|(b, v)| (b, v / total)).collect());
                *exit /= total;
            } else {
                // Links no path uses only ever drain.
                turns.push(Vec::new());
                *exit = 1.0;
            }
        }

        let sources = origins
            .into_iter()
            .map(|(node, first_links)| {
                let total: f64 = first_links.values().sum();
                Source {
                    node,
                    total,
                    turns: first_links
                        .into_iter()
                        .map(|(link, v)| (link, v / total))
                        .collect(),
                }
            })
            .collect();

        Ok(Self {
            turns,
            exits,
            sources,
        })
    }

    pub fn total_demand(&self) -> f64 {
        self.sources.iter().map(|s| s.total).sum()
    }
}

/// Link indices a path runs over, matching each step to the edge direction.
fn path_links(
    graph: &Graph,
    path: &Path,
    link_index: &HashMap<(EdgeId, Direction), usize>,
) -> Result<Vec<usize>, NetworkError> {
    path.edges
        .iter()
        .zip(path.nodes.windows(2))
        .map(|(&id, step)| {
            let edge = graph.get_edge(id)?;
            let direction = if edge.origin == step[0] && edge.destination == step[1] {
                Direction::Forward
            } else if edge.origin == step[1] && edge.destination == step[0] {
                Direction::Backward
            } else {
                return Err(NetworkError::Corrupted(format!(
                    "path step {} -> {} does not match edge {id}",
                    step[0], step[1]
                )));
            };
            link_index.get(&(id, direction)).copied().ok_or_else(|| {
                NetworkError::Corrupted(format!(
                    "path travels edge {id} {direction:?} but no such link exists"
                ))
            })
        })
        .collect()
}
