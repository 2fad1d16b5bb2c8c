//! Criterion benchmarks for the reference oracles.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use cqkp_anneal::{AnnealParams, AnnealingOracle, CompiledModel, EnergyModel, ExhaustiveOracle};
use cqkp_core::formulation::{formulate, FormulationParams, Variant};
use cqkp_core::generator::generate_instance;
use cqkp_core::oracle::{OracleConfig, SolveRequest, SolverOracle};

fn bench_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("energy_delta");
    for n in [50, 200] {
        let inst = generate_instance(n, 0.25, 4).expect("valid density");
        let params = FormulationParams::new(10.0, 10.0);
        let f = formulate(&inst, Variant::BinarySlack, &params).expect("formulation");
        let model = CompiledModel::compile(&f.hamiltonian, &[], 0.0);
        let x: Vec<f64> = (0..model.num_variables()).map(|i| (i % 2) as f64).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &x, |b, x| {
            b.iter(|| {
                let mut acc = 0.0;
                for i in 0..x.len() {
                    acc += model.delta(black_box(x), i, 1.0 - x[i]);
                }
                acc
            });
        });
    }
    group.finish();
}

fn bench_anneal(c: &mut Criterion) {
    let mut group = c.benchmark_group("anneal_100_sweeps");
    for n in [25, 50, 100] {
        let inst = generate_instance(n, 0.25, 5).expect("valid density");
        let params = FormulationParams::new(10.0, 10.0);
        let f = formulate(&inst, Variant::BinarySlack, &params).expect("formulation");
        let req = SolveRequest::new(&f.hamiltonian, Duration::from_secs(60));
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            let mut oracle = AnnealingOracle::new(
                &OracleConfig::seeded(1),
                AnnealParams {
                    sweeps: 100,
                    ..AnnealParams::default()
                },
            );
            b.iter(|| oracle.submit(black_box(&req)).expect("samples"));
        });
    }
    group.finish();
}

fn bench_exhaustive(c: &mut Criterion) {
    let inst = generate_instance(8, 0.5, 6).expect("valid density");
    let f = formulate(&inst, Variant::Naive, &FormulationParams::default()).expect("formulation");
    let req = SolveRequest::new(&f.hamiltonian, Duration::from_secs(60))
        .with_constraints(&f.constraints);
    c.bench_function("exhaustive_naive_8", |b| {
        b.iter(|| ExhaustiveOracle::new().submit(black_box(&req)).expect("samples"));
    });
}

criterion_group!(benches, bench_delta, bench_anneal, bench_exhaustive);
criterion_main!(benches);
