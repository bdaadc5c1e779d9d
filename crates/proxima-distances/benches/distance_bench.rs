//! Criterion benchmarks for proxima-distances: elastic kernels with and
//! without banding and early abandoning.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use proxima_data::TimeSeriesInstance;
use proxima_distances::{DistanceMeasure, WarpingWindow};

fn make_sine_instance(n: usize, offset: f64) -> TimeSeriesInstance {
    let values: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1).sin() + offset).collect();
    TimeSeriesInstance::univariate(values, 0).unwrap()
}

fn bench_elastic_kernels(c: &mut Criterion) {
    let lengths = [64usize, 256, 512];
    let measures: Vec<(&str, DistanceMeasure)> = vec![
        ("ed", DistanceMeasure::Euclidean),
        (
            "dtw_full",
            DistanceMeasure::Dtw {
                window: WarpingWindow::full(),
            },
        ),
        (
            "dtw_w10",
            DistanceMeasure::Dtw {
                window: WarpingWindow::fraction(0.1),
            },
        ),
        (
            "erp",
            DistanceMeasure::Erp {
                g: 0.0,
                window: WarpingWindow::fraction(0.1),
            },
        ),
        ("msm", DistanceMeasure::Msm { cost: 1.0 }),
        (
            "twe",
            DistanceMeasure::Twe {
                nu: 0.001,
                lambda: 0.5,
            },
        ),
    ];

    let mut group = c.benchmark_group("distance");

    for &len in &lengths {
        let a = make_sine_instance(len, 0.0);
        let b = make_sine_instance(len, 1.0);
        for (label, measure) in &measures {
            let mut measure = measure.clone();
            measure.fit(len);
            let id = BenchmarkId::new(*label, len);
            group.bench_with_input(id, &(&a, &b, measure), |bencher, (a, b, m)| {
                bencher.iter(|| m.distance(a, b, f64::INFINITY));
            });
        }
    }

    group.finish();
}

fn bench_early_abandon(c: &mut Criterion) {
    // Distant pair under a tight cutoff: the kernel should bail on an early row.
    let a = make_sine_instance(512, 0.0);
    let b = make_sine_instance(512, 10.0);
    let mut dtw = DistanceMeasure::Dtw {
        window: WarpingWindow::full(),
    };
    dtw.fit(512);

    let mut group = c.benchmark_group("dtw_early_abandon");
    group.bench_function("no_cutoff", |bencher| {
        bencher.iter(|| dtw.distance(&a, &b, f64::INFINITY));
    });
    group.bench_function("tight_cutoff", |bencher| {
        bencher.iter(|| dtw.distance(&a, &b, 1.0));
    });
    group.finish();
}

criterion_group!(benches, bench_elastic_kernels, bench_early_abandon);
criterion_main!(benches);
