//! Structure graph performance benchmarks
//!
//! Benchmarks for the hot structural operations:
//! - Scoped membership traversal
//! - Full-instance validation per shape
//! - Shortest path search
//! - Balance scoring and the removal probe
//!
//! Run with: cargo bench -p mirrorsim-structure

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::collections::BTreeMap;

use mirrorsim_structure::{NodeId, Shape, StructureGraph, StructureType};

// ============================================================================
// Fixtures
// ============================================================================

/// Complete `fanout`-ary tree with `n` nodes, head 0
fn tree(shape: Shape, n: u32, fanout: u32) -> StructureGraph {
    let mut graph: StructureGraph = StructureGraph::new();
    for id in 0..n {
        graph.insert_node(NodeId(id), shape).unwrap();
    }
    graph.set_head(NodeId(0), shape.structure_type(), true).unwrap();
    for id in 1..n {
        graph.attach_child(NodeId((id - 1) / fanout), NodeId(id)).unwrap();
    }
    graph
}

fn ring(n: u32) -> StructureGraph {
    let mut graph: StructureGraph = StructureGraph::new();
    for id in 0..n {
        graph.insert_node(NodeId(id), Shape::Ring).unwrap();
    }
    graph.set_head(NodeId(0), StructureType::Ring, true).unwrap();
    let heads = BTreeMap::from([(StructureType::Ring, NodeId(0))]);
    for id in 0..n {
        graph
            .add_child(NodeId(id), NodeId((id + 1) % n), &[], &heads)
            .unwrap();
    }
    graph
}

fn complete(n: u32) -> StructureGraph {
    let mut graph: StructureGraph = StructureGraph::new();
    for id in 0..n {
        graph.insert_node(NodeId(id), Shape::FullyConnected).unwrap();
    }
    graph.set_head(NodeId(0), StructureType::FullyConnected, true).unwrap();
    let heads = BTreeMap::from([(StructureType::FullyConnected, NodeId(0))]);
    for a in 0..n {
        for b in a + 1..n {
            graph.add_child(NodeId(a), NodeId(b), &[], &heads).unwrap();
        }
    }
    graph
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");

    for n in [100u32, 1_000, 10_000] {
        let graph = tree(Shape::Tree, n, 4);
        group.bench_with_input(BenchmarkId::new("tree_members", n), &graph, |b, graph| {
            b.iter(|| black_box(graph.all_nodes_in_structure(StructureType::Tree, NodeId(0))))
        });
    }

    let graph = tree(Shape::Tree, 1_000, 4);
    group.bench_function("path_from_head_1000", |b| {
        b.iter(|| {
            black_box(graph.path_from_head(NodeId(999), StructureType::Tree, NodeId(0)))
        })
    });

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");

    let tree_graph = tree(Shape::Tree, 1_000, 4);
    group.bench_function("tree_1000", |b| {
        b.iter(|| black_box(tree_graph.is_valid_instance(StructureType::Tree, NodeId(0))))
    });

    let ring_graph = ring(1_000);
    group.bench_function("ring_1000", |b| {
        b.iter(|| black_box(ring_graph.is_valid_instance(StructureType::Ring, NodeId(0))))
    });

    let complete_graph = complete(64);
    group.bench_function("fully_connected_64", |b| {
        b.iter(|| {
            black_box(complete_graph.is_valid_instance(StructureType::FullyConnected, NodeId(0)))
        })
    });

    group.finish();
}

fn bench_balance(c: &mut Criterion) {
    let mut group = c.benchmark_group("balance");

    let shape = Shape::balanced_tree(3, 1.0).unwrap();
    let mut graph = tree(shape, 364, 3);
    group.bench_function("balance_score_364", |b| {
        b.iter(|| black_box(graph.balance_score(StructureType::BalancedTree, NodeId(0))))
    });

    group.bench_function("removal_impact_364", |b| {
        b.iter(|| {
            black_box(graph.removal_impact(NodeId(1), StructureType::BalancedTree, NodeId(0)))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_traversal, bench_validation, bench_balance);
criterion_main!(benches);
