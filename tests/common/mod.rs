#![allow(dead_code)]

use artillery_ballistics::{
    AdjustmentFactors, AerodynamicCoefficients, Atmosphere, CoefficientTable, Environment,
    EnvironmentSettings, PhysicsModel, ProjectileSpec, ReverseSettings, ReverseSolver,
    TrajectoryIntegrator, Wind,
};

/// Generic 155 mm high-explosive shell
pub fn projectile() -> ProjectileSpec {
    ProjectileSpec::new("155mm HE", 0.155, 43.0, 0.144)
}

fn table(pairs: &[(f64, f64)]) -> CoefficientTable {
    CoefficientTable::from_pairs(pairs).unwrap()
}

pub fn drag_table() -> CoefficientTable {
    table(&[
        (0.0, 0.128),
        (0.6, 0.128),
        (0.8, 0.130),
        (0.9, 0.145),
        (0.95, 0.185),
        (1.0, 0.290),
        (1.05, 0.330),
        (1.1, 0.340),
        (1.2, 0.335),
        (1.5, 0.310),
        (2.0, 0.270),
        (2.5, 0.240),
    ])
}

pub fn coefficients() -> AerodynamicCoefficients {
    AerodynamicCoefficients {
        drag: drag_table(),
        linear_drag: None,
        drag_squared: Some(table(&[(0.0, 2.9), (0.9, 3.1), (1.1, 4.2), (2.5, 3.4)])),
        lift: Some(table(&[(0.0, 1.75), (0.9, 1.85), (1.1, 2.1), (2.5, 2.6)])),
        magnus_force: Some(table(&[(0.0, -0.02), (1.0, -0.03), (2.5, -0.025)])),
        overturning_moment: Some(table(&[(0.0, 2.9), (0.9, 3.2), (1.1, 3.6), (2.5, 3.0)])),
        spin_damping: Some(table(&[(0.0, -0.028), (1.0, -0.030), (2.5, -0.022)])),
    }
}

/// Overturning moment so weak that the yaw of repose blows up on the first step
pub fn unstable_coefficients() -> AerodynamicCoefficients {
    AerodynamicCoefficients {
        overturning_moment: Some(CoefficientTable::constant(0.0005)),
        ..coefficients()
    }
}

pub fn environment(wind: Wind, settings: EnvironmentSettings) -> Environment {
    Environment::new(Atmosphere::default(), wind, settings)
}

pub fn flat_environment() -> Environment {
    environment(
        Wind::Calm,
        EnvironmentSettings {
            earth_curvature: false,
            ..Default::default()
        },
    )
}

pub fn integrator_in(model: PhysicsModel, env: Environment) -> TrajectoryIntegrator {
    TrajectoryIntegrator::new(
        model,
        &projectile(),
        &coefficients(),
        AdjustmentFactors::default(),
        env,
    )
    .unwrap()
}

pub fn integrator(model: PhysicsModel) -> TrajectoryIntegrator {
    integrator_in(model, Environment::default())
}

pub fn solver(model: PhysicsModel, seed: u64) -> ReverseSolver {
    ReverseSolver::new(
        integrator(model),
        ReverseSettings {
            check_limit: true,
            seed: Some(seed),
        },
    )
}
