//! Criterion benchmarks for one LTM propagation tick.
//!
//! The grid is loaded with corner-to-corner demand and warmed up until the
//! network holds traffic, then each iteration advances one tick on a clone.
//!
//! Run with: cargo bench -p simulation --bench propagation_bench

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use simulation::assignment::UniformSplit;
use simulation::flow::FlowEngine;
use simulation::graph::{Edge, EdgeId, Graph, Node, NodeId, OdPair, PathType};
use simulation::params::{FlowParams, PathParams};

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

fn street_grid(size: i64) -> Graph {
    let mut graph = Graph::new();
    let node = |x: i64, y: i64| NodeId(y * size + x + 1);
    for id in 1..=size * size {
        graph
            .add_or_update_node(Node::new(NodeId(id)))
            .expect("fresh graph");
    }
    let mut next_edge = 1;
    for y in 0..size {
        for x in 0..size {
            let mut neighbours = Vec::new();
            if x + 1 < size {
                neighbours.push(node(x + 1, y));
            }
            if y + 1 < size {
                neighbours.push(node(x, y + 1));
            }
            for to in neighbours {
                graph
                    .add_edge(
                        Edge::new(EdgeId(next_edge), node(x, y), to)
                            .with_length(100.0, 10.0)
                            .with_tag("lanes", "2"),
                    )
                    .expect("nodes exist");
                next_edge += 1;
            }
        }
    }
    graph
}

/// Grid with demand between all four corners, assigned over 3 paths each.
fn loaded_network(size: i64, warmup_ticks: usize) -> (Graph, FlowEngine) {
    let mut graph = street_grid(size);
    let corners = [1, size, size * size - size + 1, size * size];
    let pairs: Vec<OdPair> = corners
        .iter()
        .flat_map(|&o| corners.iter().map(move |&d| (o, d)))
        .filter(|(o, d)| o != d)
        .map(|(o, d)| OdPair::new(NodeId(o), NodeId(d), PathType::Distance))
        .collect();
    let volumes = vec![50.0; pairs.len()];

    let limits = PathParams::default();
    graph
        .calc_shortest_paths(&pairs, 3, limits.max_expansions)
        .expect("corners are connected");
    graph
        .calc_assignment_matrix(&volumes, &UniformSplit)
        .expect("paths computed");

    let mut engine = FlowEngine::load(&graph, &FlowParams::default()).expect("valid network");
    for _ in 0..warmup_ticks {
        engine.propagate(&mut graph).expect("warm-up tick");
    }
    (graph, engine)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_single_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagate_tick");
    for size in [10, 20, 40] {
        let (graph, engine) = loaded_network(size, 120);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter_batched(
                || (graph.clone(), engine.clone()),
                |(mut graph, mut engine)| black_box(engine.propagate(&mut graph)),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let (graph, _) = loaded_network(20, 0);
    c.bench_function("flow_engine_load/grid_20", |b| {
        b.iter(|| black_box(FlowEngine::load(black_box(&graph), &FlowParams::default())))
    });
}

criterion_group!(benches, bench_single_tick, bench_load);
criterion_main!(benches);
