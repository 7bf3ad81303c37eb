use ci_core::Kappa;
use ci_inference::{Bayes, InclusiveJetLikelihood, LikelihoodConfig};
use ci_spectrum::{CiSpectrum, N_QUADRATIC, QcdSpectrum};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const N_BINS: usize = 28;

fn build_model(n_members: usize) -> InclusiveJetLikelihood {
    let mut m =
        InclusiveJetLikelihood::new(vec![0.0; N_BINS], (0.0, 0.5), LikelihoodConfig::default())
            .unwrap();
    for c in 0..n_members {
        let tilt = 1.0 + 0.002 * c as f64;
        let qcd: Vec<f64> =
            (0..N_BINS).map(|b| 1e4 * (-0.25 * b as f64).exp() * tilt.powi(b as i32)).collect();
        let linear = qcd
            .iter()
            .enumerate()
            .map(|(b, q)| [-0.01 * q * (b as f64 + 1.0), 0.0, 0.0, 0.0, 0.0, 0.0])
            .collect();
        let quadratic = qcd
            .iter()
            .enumerate()
            .map(|(b, q)| {
                let mut row = [0.0; N_QUADRATIC];
                row[0] = 0.001 * q * (b as f64 + 1.0).powi(2);
                row
            })
            .collect();
        m.add(QcdSpectrum::new(qcd).unwrap(), CiSpectrum::new(linear, quadratic).unwrap()).unwrap();
    }
    m.set_kappa(Kappa::LL);
    m.set_asimov(true, false, 1.0, 0.0, false).unwrap();
    m
}

fn bench_initialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("likelihood_initialize");
    for n in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("members", n), &n, |b, &n| {
            let mut m = build_model(n);
            b.iter(|| m.initialize(black_box(-1)).unwrap())
        });
    }
    group.finish();
}

fn bench_exact_evaluation(c: &mut Criterion) {
    let m = build_model(100);
    c.bench_function("likelihood_exact_100_members", |b| {
        b.iter(|| black_box(m.evaluate_at(black_box(0.05)).unwrap()))
    });
}

fn bench_upper_limit(c: &mut Criterion) {
    c.bench_function("bayes_percentile_cached", |b| {
        b.iter_batched(
            || {
                let mut m = build_model(10);
                m.initialize(-1).unwrap();
                Bayes::new(m, (0.0, 0.5), 0.95).unwrap()
            },
            |mut bayes| black_box(bayes.percentile(0.95).unwrap()),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_initialize, bench_exact_evaluation, bench_upper_limit);
criterion_main!(benches);
