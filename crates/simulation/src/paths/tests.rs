use std::collections::{HashMap, HashSet};

use pathfinding::prelude::yen;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::graph::{Edge, EdgeId, Node};

fn graph_with(nodes: &[i64], edges: &[(u64, i64, i64, f64, &[(&str, &str)])]) -> Graph {
    let mut graph = Graph::new();
    for &id in nodes {
        graph.add_or_update_node(Node::new(NodeId(id))).unwrap();
    }
    for &(id, from, to, distance, tags) in edges {
        let mut edge =
            Edge::new(EdgeId(id), NodeId(from), NodeId(to)).with_length(distance, distance / 10.0);
        for (k, v) in tags {
            edge = edge.with_tag(k, v);
        }
        graph.add_edge(edge).unwrap();
    }
    graph
}

fn pair(origin: i64, destination: i64) -> OdPair {
    OdPair::new(NodeId(origin), NodeId(destination), PathType::Distance)
}

fn node_ids(path: &Path) -> Vec<i64> {
    path.nodes.iter().map(|n| n.0).collect()
}

const ONEWAY: &[(&str, &str)] = &[("oneway", "yes")];

// -------------------------------------------------------------------------
// Contract
// -------------------------------------------------------------------------

#[test]
fn test_two_node_graph_single_path() {
    let graph = graph_with(&[1, 2], &[(1, 1, 2, 100.0, &[])]);
    let paths = compute_shortest_paths(&graph, &[pair(1, 2)], 1).unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].len(), 1);
    assert_eq!(node_ids(&paths[0][0]), vec![1, 2]);
    assert_eq!(paths[0][0].edges, vec![EdgeId(1)]);
    assert!((paths[0][0].cost - 100.0).abs() < 1e-9);
}

#[test]
fn test_origin_equals_destination_is_zero_length() {
    let graph = graph_with(&[1, 2], &[(1, 1, 2, 100.0, &[])]);
    let paths = compute_shortest_paths(&graph, &[pair(1, 1)], 3).unwrap();
    assert_eq!(paths[0].len(), 1);
    assert_eq!(node_ids(&paths[0][0]), vec![1]);
    assert!(paths[0][0].edges.is_empty());
    assert_eq!(paths[0][0].cost, 0.0);
}

#[test]
fn test_unreachable_is_empty_not_error() {
    let graph = graph_with(&[1, 2, 3, 4], &[(1, 1, 2, 10.0, &[]), (2, 3, 4, 10.0, &[])]);
    let paths = compute_shortest_paths(&graph, &[pair(1, 4), pair(1, 2)], 2).unwrap();
    assert!(paths[0].is_empty());
    assert_eq!(paths[1].len(), 1);
}

#[test]
fn test_missing_node_is_invalid_reference() {
    let graph = graph_with(&[1, 2], &[(1, 1, 2, 10.0, &[])]);
    let err = compute_shortest_paths(&graph, &[pair(1, 2), pair(1, 9)], 1).unwrap_err();
    assert!(matches!(
        err,
        NetworkError::InvalidReference { target: EntityRef::Node(NodeId(9)), .. }
    ));
}

#[test]
fn test_results_follow_pair_order() {
    let graph = graph_with(
        &[1, 2, 3],
        &[(1, 1, 2, 10.0, &[]), (2, 2, 3, 10.0, &[])],
    );
    let paths = compute_shortest_paths(&graph, &[pair(3, 1), pair(1, 3), pair(2, 2)], 1).unwrap();
    assert_eq!(node_ids(&paths[0][0]), vec![3, 2, 1]);
    assert_eq!(node_ids(&paths[1][0]), vec![1, 2, 3]);
    assert_eq!(node_ids(&paths[2][0]), vec![2]);
}

#[test]
fn test_k_zero_returns_no_paths() {
    let graph = graph_with(&[1, 2], &[(1, 1, 2, 10.0, &[])]);
    let paths = compute_shortest_paths(&graph, &[pair(1, 2)], 0).unwrap();
    assert_eq!(paths, vec![Vec::<Path>::new()]);
}

// -------------------------------------------------------------------------
// Directionality
// -------------------------------------------------------------------------

#[test]
fn test_oneway_blocks_reverse_travel() {
    let graph = graph_with(&[1, 2], &[(1, 1, 2, 10.0, ONEWAY)]);
    let paths = compute_shortest_paths(&graph, &[pair(2, 1), pair(1, 2)], 1).unwrap();
    assert!(paths[0].is_empty());
    assert_eq!(paths[1].len(), 1);
}

#[test]
fn test_oneway_no_allows_both_directions() {
    let graph = graph_with(&[1, 2], &[(1, 1, 2, 10.0, &[("oneway", "no")])]);
    let paths = compute_shortest_paths(&graph, &[pair(2, 1)], 1).unwrap();
    assert_eq!(node_ids(&paths[0][0]), vec![2, 1]);
}

#[test]
fn test_roundabout_is_traversed_one_way() {
    let ring: &[(&str, &str)] = &[("junction", "roundabout")];
    let graph = graph_with(
        &[1, 2, 3],
        &[(1, 1, 2, 10.0, ring), (2, 2, 3, 10.0, ring), (3, 3, 1, 10.0, ring)],
    );
    // 2 -> 1 must go around: 2 -> 3 -> 1.
    let paths = compute_shortest_paths(&graph, &[pair(2, 1)], 5).unwrap();
    assert_eq!(paths[0].len(), 1);
    assert_eq!(node_ids(&paths[0][0]), vec![2, 3, 1]);
}

#[test]
fn test_duration_weights() {
    // Short slow road vs long fast road.
    let mut graph = graph_with(&[1, 2, 3], &[(1, 1, 2, 100.0, &[]), (2, 2, 3, 100.0, &[])]);
    graph
        .add_edge(Edge::new(EdgeId(3), NodeId(1), NodeId(3)).with_length(150.0, 60.0))
        .unwrap();
    // edges 1 and 2 take 10 s each, edge 3 takes 60 s.
    let by_distance = compute_shortest_paths(&graph, &[pair(1, 3)], 1).unwrap();
    let by_duration = compute_shortest_paths(
        &graph,
        &[OdPair::new(NodeId(1), NodeId(3), PathType::Duration)],
        1,
    )
    .unwrap();
    assert_eq!(by_distance[0][0].edges, vec![EdgeId(3)]);
    assert_eq!(by_duration[0][0].edges, vec![EdgeId(1), EdgeId(2)]);
    assert!((by_duration[0][0].cost - 20.0).abs() < 1e-9);
}

// -------------------------------------------------------------------------
// Ranking
// -------------------------------------------------------------------------

#[test]
fn test_ranking_by_cost() {
    // 1 -> 4 via 2 (cost 20), via 3 (cost 30), direct (cost 50).
    let graph = graph_with(
        &[1, 2, 3, 4],
        &[
            (1, 1, 2, 10.0, ONEWAY),
            (2, 2, 4, 10.0, ONEWAY),
            (3, 1, 3, 15.0, ONEWAY),
            (4, 3, 4, 15.0, ONEWAY),
            (5, 1, 4, 50.0, ONEWAY),
        ],
    );
    let paths = compute_shortest_paths(&graph, &[pair(1, 4)], 5).unwrap();
    let costs: Vec<f64> = paths[0].iter().map(|p| p.cost).collect();
    assert_eq!(costs, vec![20.0, 30.0, 50.0]);
    assert_eq!(node_ids(&paths[0][0]), vec![1, 2, 4]);
    assert_eq!(node_ids(&paths[0][2]), vec![1, 4]);
}

#[test]
fn test_tie_prefers_fewer_edges_then_lower_edge_ids() {
    let graph = graph_with(
        &[1, 2, 3, 4],
        &[
            (7, 1, 3, 10.0, ONEWAY),
            (8, 3, 4, 10.0, ONEWAY),
            (1, 1, 2, 10.0, ONEWAY),
            (2, 2, 4, 10.0, ONEWAY),
            (9, 1, 4, 20.0, ONEWAY),
        ],
    );
    let paths = compute_shortest_paths(&graph, &[pair(1, 4)], 3).unwrap();
    let edges: Vec<Vec<EdgeId>> = paths[0].iter().map(|p| p.edges.clone()).collect();
    assert_eq!(
        edges,
        vec![
            vec![EdgeId(9)],
            vec![EdgeId(1), EdgeId(2)],
            vec![EdgeId(7), EdgeId(8)],
        ]
    );
}

#[test]
fn test_parallel_edges_collapse_to_best() {
    let graph = graph_with(
        &[1, 2],
        &[(5, 1, 2, 10.0, ONEWAY), (3, 1, 2, 10.0, ONEWAY), (4, 1, 2, 12.0, ONEWAY)],
    );
    let paths = compute_shortest_paths(&graph, &[pair(1, 2)], 3).unwrap();
    assert_eq!(paths[0].len(), 1);
    assert_eq!(paths[0][0].edges, vec![EdgeId(3)]);
}

#[test]
fn test_paths_are_loopless_and_distinct() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let nodes: Vec<i64> = (0..12).collect();
    let mut edges = Vec::new();
    for id in 0..30u64 {
        let a = rng.gen_range(0..12);
        let b = rng.gen_range(0..12);
        if a != b {
            edges.push((id, a, b, rng.gen_range(1..50) as f64, &[][..]));
        }
    }
    let graph = graph_with(&nodes, &edges);
    let paths = compute_shortest_paths(&graph, &[pair(0, 11), pair(3, 7)], 8).unwrap();
    for list in &paths {
        let mut seen = HashSet::new();
        for path in list {
            let unique: HashSet<_> = path.nodes.iter().collect();
            assert_eq!(unique.len(), path.nodes.len(), "path repeats a node: {path:?}");
            assert!(seen.insert(path.nodes.clone()), "duplicate path {path:?}");
        }
        assert!(list.windows(2).all(|w| w[0].cost <= w[1].cost));
    }
}

#[test]
fn test_costs_match_yen_on_random_digraphs() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xC0FFEE);
    for round in 0..25 {
        let n = rng.gen_range(4..14i64);
        let mut adjacency: HashMap<i64, Vec<(i64, u64)>> = HashMap::new();
        let mut used = HashSet::new();
        let mut edges = Vec::new();
        for id in 0..rng.gen_range(n as u64..(n * 4) as u64) {
            let a = rng.gen_range(0..n);
            let b = rng.gen_range(0..n);
            if a == b || !used.insert((a, b)) {
                continue;
            }
            let weight = rng.gen_range(1..40u64);
            adjacency.entry(a).or_default().push((b, weight * 1000));
            edges.push((id, a, b, weight as f64, ONEWAY));
        }
        let nodes: Vec<i64> = (0..n).collect();
        let graph = graph_with(&nodes, &edges);
        let k = 6;
        let ours = compute_shortest_paths_with_limit(&graph, &[pair(0, n - 1)], k, 1_000_000).unwrap();
        let ours: Vec<u64> = ours[0]
            .iter()
            .map(|p| (p.cost * WEIGHT_SCALE).round() as u64)
            .collect();

        let expected: Vec<u64> = yen(
            &0i64,
            |node| adjacency.get(node).cloned().unwrap_or_default(),
            |&node| node == n - 1,
            k,
        )
        .into_iter()
        .map(|(_, cost)| cost)
        .collect();

        assert_eq!(ours, expected, "round {round}: cost sequences differ");
    }
}

#[test]
fn test_expansion_cap_still_returns_shortest() {
    let graph = graph_with(
        &[1, 2, 3, 4],
        &[
            (1, 1, 2, 10.0, &[]),
            (2, 2, 4, 10.0, &[]),
            (3, 1, 3, 15.0, &[]),
            (4, 3, 4, 15.0, &[]),
            (5, 2, 3, 1.0, &[]),
        ],
    );
    let paths = compute_shortest_paths_with_limit(&graph, &[pair(1, 4)], 10, 1).unwrap();
    assert_eq!(paths[0].len(), 1);
    assert_eq!(node_ids(&paths[0][0]), vec![1, 2, 4]);
}

#[test]
fn test_arc_graph_layout() {
    let graph = graph_with(
        &[1, 2, 3],
        &[(1, 1, 2, 10.0, &[]), (2, 2, 3, 10.0, ONEWAY)],
    );
    let arcs = ArcGraph::from_graph(&graph, PathType::Distance);
    assert_eq!(arcs.node_count(), 3);
    assert_eq!(arcs.arc_count(), 3);
    let two = arcs.find_node_index(NodeId(2)).unwrap();
    let out: Vec<(u64, bool)> = arcs.outgoing(two).iter().map(|a| (a.edge.0, a.forward)).collect();
    assert_eq!(out, vec![(1, false), (2, true)]);
    assert_eq!(arcs.incoming(two).count(), 1);
}
