//! Benchmarks for the layout pass.
//!
//! Run with: cargo bench -p ltrack-layout

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ltrack_graph::{Detection, TrackGraph};
use ltrack_layout::compute;
use std::hint::black_box;

/// Build `tracks` linear tracks of `length` detections each.
fn make_graph(tracks: usize, length: usize) -> TrackGraph {
    let mut graph = TrackGraph::new();
    for t in 0..tracks {
        let mut previous = None;
        for step in 0..length {
            let id = graph.add_detection(Detection::new(
                format!("t{t}s{step}"),
                step as f32,
                3.0,
            ));
            if let Some(prev) = previous {
                graph.add_link(prev, id, 1.0).expect("chain link");
            }
            previous = Some(id);
        }
    }
    graph
}

fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/compute");
    for (tracks, length) in [(10, 20), (50, 50), (200, 100)] {
        let graph = make_graph(tracks, length);
        group.bench_with_input(
            BenchmarkId::new("tracks_x_len", format!("{tracks}x{length}")),
            &graph,
            |b, graph| b.iter(|| black_box(compute(graph, 1.0))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_compute);
criterion_main!(benches);
