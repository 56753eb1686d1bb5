use std::collections::HashMap;

use crate::config::WEIGHT_SCALE;
use crate::graph::{EdgeId, Graph, NodeId, PathType};

/// One traversable direction of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectedArc {
    pub edge: EdgeId,
    /// Index into [`ArcGraph::nodes`] of the node the arc leaves.
    pub tail: u32,
    /// Index into [`ArcGraph::nodes`] of the node the arc enters.
    pub head: u32,
    /// Fixed-point weight: metres or seconds times [`WEIGHT_SCALE`].
    pub weight: u64,
    /// `false` when the arc runs against the edge's stored direction.
    pub forward: bool,
}

/// Compressed Sparse Row view of the traversable network for one path type.
///
/// Every valid edge contributes a forward arc, plus a reverse arc unless it is
/// one-way. Outgoing arcs of a node are stored contiguously, ordered by edge
/// id (forward before reverse), and a second CSR index lists incoming arcs.
#[derive(Debug, Clone, Default)]
pub struct ArcGraph {
    /// Sorted node ids; positions are the node indices used by arcs.
    pub nodes: Vec<NodeId>,
    /// `node_offsets[i]..node_offsets[i + 1]` is node i's range in `arcs`.
    pub node_offsets: Vec<u32>,
    pub arcs: Vec<DirectedArc>,
    /// Same layout as `node_offsets`, ranging over `incoming`.
    pub incoming_offsets: Vec<u32>,
    /// Indices into `arcs`, grouped by head node.
    pub incoming: Vec<u32>,
}

impl ArcGraph {
    pub fn from_graph(graph: &Graph, path_type: PathType) -> Self {
        let mut nodes: Vec<NodeId> = graph.nodes().iter().map(|n| n.id).collect();
        nodes.sort_unstable();
        let node_index: HashMap<NodeId, u32> = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i as u32))
            .collect();

        let mut arcs = Vec::with_capacity(graph.edge_count() * 2);
        for edge in graph.edges() {
            let Some(distance) = edge.distance.filter(|d| d.is_finite()) else {
                continue;
            };
            if edge.origin == edge.destination {
                continue;
            }
            let (Some(&origin), Some(&destination)) =
                (node_index.get(&edge.origin), node_index.get(&edge.destination))
            else {
                continue;
            };
            let weight = to_fixed(match path_type {
                PathType::Distance => distance,
                PathType::Duration => edge.duration,
            });
            arcs.push(DirectedArc {
                edge: edge.id,
                tail: origin,
                head: destination,
                weight,
                forward: true,
            });
            if !edge.is_oneway() {
                arcs.push(DirectedArc {
                    edge: edge.id,
                    tail: destination,
                    head: origin,
                    weight,
                    forward: false,
                });
            }
        }
        arcs.sort_unstable_by_key(|arc| (arc.tail, arc.edge, !arc.forward));

        let node_offsets = offsets(nodes.len(), arcs.iter().map(|arc| arc.tail));

        let mut incoming: Vec<u32> = (0..arcs.len() as u32).collect();
        incoming.sort_by_key(|&i| (arcs[i as usize].head, i));
        let incoming_offsets = offsets(
            nodes.len(),
            incoming.iter().map(|&i| arcs[i as usize].head),
        );

        Self {
            nodes,
            node_offsets,
            arcs,
            incoming_offsets,
            incoming,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    pub fn find_node_index(&self, id: NodeId) -> Option<u32> {
        self.nodes.binary_search(&id).ok().map(|i| i as u32)
    }

    /// Indices into `arcs` of the arcs leaving `node`.
    pub fn outgoing_range(&self, node: u32) -> std::ops::Range<usize> {
        let start = self.node_offsets[node as usize] as usize;
        let end = self.node_offsets[node as usize + 1] as usize;
        start..end
    }

    pub fn outgoing(&self, node: u32) -> &[DirectedArc] {
        &self.arcs[self.outgoing_range(node)]
    }

    pub fn incoming(&self, node: u32) -> impl Iterator<Item = &DirectedArc> + '_ {
        let start = self.incoming_offsets[node as usize] as usize;
        let end = self.incoming_offsets[node as usize + 1] as usize;
        self.incoming[start..end]
            .iter()
            .map(|&i| &self.arcs[i as usize])
    }
}

pub(crate) fn to_fixed(weight: f64) -> u64 {
    (weight.max(0.0) * WEIGHT_SCALE).round() as u64
}

/// CSR offsets for `count` buckets given the bucket of each item.
fn offsets(count: usize, buckets: impl Iterator<Item = u32>) -> Vec<u32> {
    let mut offsets = vec![0u32; count + 1];
    for bucket in buckets {
        offsets[bucket as usize + 1] += 1;
    }
    for i in 0..count {
        offsets[i + 1] += offsets[i];
    }
    offsets
}
