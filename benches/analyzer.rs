use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use driftwatch::baseline::ReferenceBaseline;
use driftwatch::buffer::FeatureRecord;
use driftwatch::drift::DriftAnalyzer;

fn make_window(baseline: &ReferenceBaseline, n: usize) -> Vec<FeatureRecord> {
    (0..n)
        .map(|i| {
            let row = (i * 7) % baseline.len();
            let mut values = BTreeMap::new();
            for (idx, name) in baseline.feature_names().iter().enumerate() {
                values.insert(name.clone(), baseline.data()[[row, idx]]);
            }
            FeatureRecord::new(values)
        })
        .collect()
}

fn bench_analyze(c: &mut Criterion) {
    let baseline = ReferenceBaseline::iris();
    let analyzer = DriftAnalyzer::new();

    let mut group = c.benchmark_group("drift_analyze");
    for window_size in [10, 100, 500] {
        let window = make_window(&baseline, window_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(window_size),
            &window,
            |b, window| {
                b.iter(|| analyzer.analyze(black_box(&baseline), black_box(window)).unwrap())
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
