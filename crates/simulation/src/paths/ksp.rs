//! Loopless k-shortest paths by side-track enumeration.
//!
//! A reverse Dijkstra from the target gives every node its distance to the
//! target and a tree arc toward it. Any s→t walk is then a sequence of
//! "side-tracks" (non-tree arcs) joined by tree segments, and its cost exceeds
//! the shortest cost by the sum of the side-tracks' detours
//! `w(u,v) + d(v) - d(u) >= 0`. Candidates are expanded from a heap by adding
//! one more side-track at or after the last one, which visits each walk once
//! in nondecreasing cost order. Walks that revisit a node are expanded (their
//! descendants may still be loopless up to the repeat) but never reported.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use bevy::prelude::*;
use pathfinding::prelude::dijkstra_all;

use super::arcs::ArcGraph;
use crate::graph::EdgeId;

/// Ranking key: total cost, then fewer edges, then the edge id sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct PathKey {
    pub cost: u64,
    pub hops: usize,
    pub edges: Vec<EdgeId>,
}

#[derive(Debug, Clone)]
pub(crate) struct RankedPath {
    pub key: PathKey,
    /// Node indices into the arc graph.
    pub nodes: Vec<u32>,
}

struct ShortestPathTree {
    target: u32,
    dist: Vec<Option<u64>>,
    next: Vec<Option<u32>>,
}

impl ShortestPathTree {
    fn toward(graph: &ArcGraph, target: u32) -> Self {
        let n = graph.node_count();
        let reached = dijkstra_all(&target, |&node| {
            graph.incoming(node).map(|arc| (arc.tail, arc.weight))
        });

        let mut dist = vec![None; n];
        let mut parent = vec![None; n];
        for (node, (toward, cost)) in reached {
            dist[node as usize] = Some(cost);
            parent[node as usize] = Some(toward);
        }
        dist[target as usize] = Some(0);
        parent[target as usize] = None;

        // Among parallel tight arcs to the parent, the lowest edge id wins.
        let next = (0..n as u32)
            .map(|node| {
                let toward = parent[node as usize]?;
                let du = dist[node as usize]?;
                let dp = dist[toward as usize]?;
                graph
                    .outgoing_range(node)
                    .find(|&i| {
                        let arc = &graph.arcs[i];
                        arc.head == toward && dp + arc.weight == du
                    })
                    .map(|i| i as u32)
            })
            .collect();

        Self { target, dist, next }
    }

    /// Follow tree arcs from the last node of `nodes` to the target.
    /// Returns `false` if the tree is broken along the way.
    fn extend(&self, graph: &ArcGraph, nodes: &mut Vec<u32>, arcs: &mut Vec<u32>) -> bool {
        let Some(mut current) = nodes.last().copied() else {
            return false;
        };
        let mut steps = 0;
        while current != self.target {
            let Some(arc) = self.next[current as usize] else {
                return false;
            };
            steps += 1;
            if steps > graph.node_count() {
                return false;
            }
            arcs.push(arc);
            current = graph.arcs[arc as usize].head;
            nodes.push(current);
        }
        true
    }
}

struct Candidate {
    key: PathKey,
    seq: u64,
    nodes: Vec<u32>,
    arcs: Vec<u32>,
    /// Position in `nodes` of the last side-track's head. From here on the
    /// candidate follows tree arcs.
    deviation: usize,
}

impl Candidate {
    fn new(graph: &ArcGraph, cost: u64, nodes: Vec<u32>, arcs: Vec<u32>, deviation: usize, seq: u64) -> Self {
        let key = PathKey {
            cost,
            hops: arcs.len(),
            edges: arcs.iter().map(|&a| graph.arcs[a as usize].edge).collect(),
        };
        Self {
            key,
            seq,
            nodes,
            arcs,
            deviation,
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq && self.key == other.key
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Up to `k` loopless paths from `source` to `target`, best first.
/// Paths sharing a node sequence (parallel edges) are reported once.
pub(crate) fn k_shortest_paths(
    graph: &ArcGraph,
    source: u32,
    target: u32,
    k: usize,
    max_expansions: usize,
) -> Vec<RankedPath> {
    if k == 0 {
        return Vec::new();
    }
    if source == target {
        return vec![RankedPath {
            key: PathKey {
                cost: 0,
                hops: 0,
                edges: Vec::new(),
            },
            nodes: vec![source],
        }];
    }

    let tree = ShortestPathTree::toward(graph, target);
    let Some(best) = tree.dist[source as usize] else {
        return Vec::new();
    };
    let mut nodes = vec![source];
    let mut arcs = Vec::new();
    if !tree.extend(graph, &mut nodes, &mut arcs) {
        return Vec::new();
    }

    let mut seq = 0u64;
    let mut heap = BinaryHeap::new();
    heap.push(Reverse(Candidate::new(graph, best, nodes, arcs, 0, seq)));

    let mut accepted: Vec<RankedPath> = Vec::with_capacity(k);
    let mut expansions = 0usize;

    while let Some(Reverse(candidate)) = heap.pop() {
        if accepted.len() >= k && candidate.key.cost > accepted[k - 1].key.cost {
            break;
        }
        if expansions >= max_expansions.max(1) {
            warn!(
                "Path search stopped after {expansions} expansions with {} of {k} paths",
                accepted.len()
            );
            break;
        }
        expansions += 1;

        let mut visited: HashSet<u32> = HashSet::with_capacity(candidate.nodes.len());
        let mut loopless = true;
        let last = candidate.nodes.len() - 1;
        for (pos, &node) in candidate.nodes.iter().enumerate() {
            if !visited.insert(node) {
                loopless = false;
                break;
            }
            if pos < candidate.deviation || pos == last {
                continue;
            }
            let Some(du) = tree.dist[node as usize] else {
                continue;
            };
            let taken = candidate.arcs[pos];
            for i in graph.outgoing_range(node) {
                if i as u32 == taken {
                    continue;
                }
                let arc = &graph.arcs[i];
                let Some(dh) = tree.dist[arc.head as usize] else {
                    continue;
                };
                if visited.contains(&arc.head) {
                    continue;
                }
                let mut nodes = candidate.nodes[..=pos].to_vec();
                nodes.push(arc.head);
                let mut arcs = candidate.arcs[..pos].to_vec();
                arcs.push(i as u32);
                if !tree.extend(graph, &mut nodes, &mut arcs) {
                    continue;
                }
                debug_assert!(arc.weight + dh >= du);
                let cost = candidate.key.cost + arc.weight + dh - du;
                seq += 1;
                heap.push(Reverse(Candidate::new(graph, cost, nodes, arcs, pos + 1, seq)));
            }
        }

        if loopless {
            accept(&mut accepted, candidate);
        }
    }

    accepted.truncate(k);
    accepted
}

/// Insert in key order, keeping only the best path per node sequence.
fn accept(accepted: &mut Vec<RankedPath>, candidate: Candidate) {
    if let Some(existing) = accepted.iter().position(|p| p.nodes == candidate.nodes) {
        if candidate.key >= accepted[existing].key {
            return;
        }
        accepted.remove(existing);
    }
    let at = accepted.partition_point(|p| p.key <= candidate.key);
    accepted.insert(
        at,
        RankedPath {
            key: candidate.key,
            nodes: candidate.nodes,
        },
    );
}
