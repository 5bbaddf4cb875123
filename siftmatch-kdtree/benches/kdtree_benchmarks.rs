use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use siftmatch_kdtree::{KdTree, MatcherBuilder};

/// Create SIFT-like descriptors: non-negative, sparse-ish, 128-D
fn create_descriptors(count: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut state = seed;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut d = Vec::with_capacity(128);
        for _ in 0..128 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let r = (state >> 33) as u32;
            d.push(if r % 3 == 0 { 0.0 } else { (r % 160) as f64 });
        }
        out.push(d);
    }
    out
}

/// Perturb descriptors so that most queries have a distinct true match
fn perturb(descriptors: &[Vec<f64>]) -> Vec<Vec<f64>> {
    descriptors
        .iter()
        .enumerate()
        .map(|(i, d)| d.iter().enumerate().map(|(j, v)| v + ((i + j) % 5) as f64).collect())
        .collect()
}

/// Benchmark tree construction
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree_build");

    for &count in &[500, 2000, 8000] {
        let descriptors = create_descriptors(count, 1);
        group.bench_with_input(BenchmarkId::from_parameter(count), &descriptors, |b, descriptors| {
            b.iter(|| black_box(KdTree::build(black_box(descriptors)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark single queries under different visit budgets
fn bench_knn_budget(c: &mut Criterion) {
    let descriptors = create_descriptors(4000, 2);
    let queries = perturb(&descriptors[..100]);
    let tree = KdTree::build(&descriptors).unwrap();

    let mut group = c.benchmark_group("bbf_knn");

    for &budget in &[50, 200, 1000] {
        group.bench_with_input(BenchmarkId::new("max_visits", budget), &budget, |b, &budget| {
            b.iter(|| {
                for q in &queries {
                    black_box(tree.knn(black_box(q), 2, budget).unwrap());
                }
            })
        });
    }

    group.finish();
}

/// Benchmark full matching, serial vs parallel
fn bench_match_all(c: &mut Criterion) {
    let reference = create_descriptors(3000, 3);
    let queries = perturb(&reference[..1000]);

    let mut group = c.benchmark_group("match_all");
    group.sample_size(20);

    for &threads in &[1, 4] {
        let matcher = MatcherBuilder::new().threads(threads).build(&reference).unwrap();
        group.bench_with_input(BenchmarkId::new("threads", threads), &queries, |b, queries| {
            b.iter(|| black_box(matcher.match_all(black_box(queries)).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_knn_budget, bench_match_all);
criterion_main!(benches);
