use artillery_ballistics::{
    AdjustmentFactors, AerodynamicCoefficients, CoefficientTable, Environment, PhysicsModel,
    ProjectileSpec, ReverseRequest, ReverseSettings, ReverseSolver, Shot, TrajectoryIntegrator,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn table(pairs: &[(f64, f64)]) -> CoefficientTable {
    CoefficientTable::from_pairs(pairs).unwrap()
}

fn coefficients() -> AerodynamicCoefficients {
    AerodynamicCoefficients {
        drag: table(&[(0.0, 0.128), (0.8, 0.130), (0.95, 0.185), (1.0, 0.29), (1.2, 0.335), (2.5, 0.24)]),
        linear_drag: None,
        drag_squared: Some(table(&[(0.0, 2.9), (2.5, 3.4)])),
        lift: Some(table(&[(0.0, 1.75), (2.5, 2.6)])),
        magnus_force: Some(table(&[(0.0, -0.02), (2.5, -0.025)])),
        overturning_moment: Some(table(&[(0.0, 2.9), (1.1, 3.6), (2.5, 3.0)])),
        spin_damping: Some(table(&[(0.0, -0.028), (2.5, -0.022)])),
    }
}

fn integrator(model: PhysicsModel) -> TrajectoryIntegrator {
    TrajectoryIntegrator::new(
        model,
        &ProjectileSpec::new("155mm HE", 0.155, 43.0, 0.144),
        &coefficients(),
        AdjustmentFactors::default(),
        Environment::default(),
    )
    .unwrap()
}

fn bench_direct(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct");
    let shot = Shot::new(400.0, 450.0, 0.01);
    for (name, model) in [
        ("point_mass", PhysicsModel::PointMass),
        ("modified_point_mass", PhysicsModel::ModifiedPointMass),
        ("modified_point_mass_1990", PhysicsModel::ModifiedPointMass1990),
    ] {
        let mut solver = integrator(model);
        group.bench_function(name, |b| b.iter(|| black_box(solver.solve_direct_last(black_box(&shot)))));
    }
    group.finish();
}

fn bench_reverse(c: &mut Criterion) {
    let request = ReverseRequest {
        step: 0.05,
        initial_angle_mils: 300.0,
        ..ReverseRequest::new(8000.0, 450.0)
    };
    let mut solver = ReverseSolver::new(
        integrator(PhysicsModel::PointMass),
        ReverseSettings {
            check_limit: false,
            seed: Some(1),
        },
    );
    c.bench_function("reverse/point_mass", |b| {
        b.iter(|| black_box(solver.solve_reverse(black_box(&request))))
    });
}

criterion_group!(benches, bench_direct, bench_reverse);
criterion_main!(benches);
