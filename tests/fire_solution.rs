mod common;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use artillery_ballistics::constants::APEX_ANGLE_MILS;
use artillery_ballistics::{
    AdjustmentFactors, Branch, Environment, FireError, PhysicsModel, ReverseRequest, ReverseSettings,
    ReverseSolver, Shot, TrajectoryIntegrator, TrajectoryKind,
};

use common::{integrator, projectile, solver, unstable_coefficients};

fn request(range: f64, velocity: f64) -> ReverseRequest {
    ReverseRequest {
        step: 0.05,
        precision: 1.0,
        initial_angle_mils: 300.0,
        ..ReverseRequest::new(range, velocity)
    }
}

#[test]
fn point_mass_solution_lands_on_target() {
    let mut solver = solver(PhysicsModel::PointMass, 11);
    let req = request(5000.0, 300.0);
    let solution = solver.solve_reverse(&req).unwrap();
    assert!(solution.success);
    assert!(solution.elevation_mils > 0.0 && solution.elevation_mils < APEX_ANGLE_MILS);
    assert_eq!(solution.derivation_mils, 0.0);

    let last = solver
        .integrator_mut()
        .solve_direct_last(&Shot::new(solution.elevation_mils, 300.0, 0.05));
    assert!((last.range() - 5000.0).abs() <= 1.0, "range {}", last.range());
}

#[test]
fn modified_point_mass_solution_reports_derivation() {
    let mut solver = solver(PhysicsModel::ModifiedPointMass, 5);
    let req = request(5000.0, 300.0);
    let solution = solver.solve_reverse(&req).unwrap();

    let last = solver
        .integrator_mut()
        .solve_direct_last(&Shot::new(solution.elevation_mils, 300.0, 0.05));
    assert!((last.range() - 5000.0).abs() <= 1.0);
    assert!(solution.derivation_mils != 0.0);
    assert_eq!(
        solution.derivation_mils.signum(),
        last.drift().signum()
    );
}

#[test]
fn seeded_solves_are_reproducible() {
    let req = request(4500.0, 300.0);
    let a = solver(PhysicsModel::PointMass, 3).solve_reverse(&req);
    let b = solver(PhysicsModel::PointMass, 3).solve_reverse(&req);
    assert_eq!(a, b);
}

#[test]
fn target_beyond_maximum_range_is_rejected() {
    let mut solver = solver(PhysicsModel::PointMass, 1);
    let err = solver.solve_reverse(&request(20_000.0, 300.0)).unwrap_err();
    match &err {
        FireError::OutOfRange {
            solution,
            max_range,
            target_range,
        } => {
            assert!(!solution.success);
            assert_eq!(solution.elevation_mils, 300.0);
            assert!(*max_range < 20_000.0);
            assert_eq!(*max_range % 10.0, 0.0);
            assert_eq!(*target_range, 20_000.0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn low_angle_solution_for_high_angle_request_is_flagged() {
    let mut solver = solver(PhysicsModel::PointMass, 9);
    let req = ReverseRequest {
        kind: TrajectoryKind::HighAngle,
        ..request(5000.0, 300.0)
    };
    match solver.solve_reverse(&req) {
        Err(FireError::TrajectoryKindMismatch(solution)) => {
            assert!(solution.success);
            assert!(solution.elevation_mils < APEX_ANGLE_MILS);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn progress_observer_sees_iterations() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut solver = solver(PhysicsModel::PointMass, 2);
    solver.set_progress(move |state| sink.lock().unwrap().push(state.angle_mils));
    solver.solve_reverse(&request(5000.0, 300.0)).unwrap();
    let angles = seen.lock().unwrap();
    assert!(!angles.is_empty());
    assert_eq!(angles[0], 300.0);
}

#[test]
fn cancelled_solve_returns_last_angle() {
    let flag = Arc::new(AtomicBool::new(true));
    let mut solver = solver(PhysicsModel::PointMass, 4).with_cancel_flag(flag);
    match solver.solve_reverse(&request(5000.0, 300.0)) {
        Err(FireError::Cancelled(solution)) => {
            assert!(!solution.success);
            assert_eq!(solution.elevation_mils, 300.0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn branch_outcomes_are_repeatable() {
    for branch in [Branch::Ascending, Branch::Descending] {
        let req = ReverseRequest {
            height_difference: 300.0,
            branch,
            initial_angle_mils: if branch == Branch::Ascending { 1100.0 } else { 300.0 },
            ..request(3000.0, 300.0)
        };
        let first = solver(PhysicsModel::PointMass, 17).solve_reverse(&req);
        let second = solver(PhysicsModel::PointMass, 17).solve_reverse(&req);
        assert_eq!(first, second, "{branch:?}");
    }
}

#[test]
fn raised_target_solution_lands_on_range_and_height() {
    let mut solver = solver(PhysicsModel::PointMass, 11);
    let req = ReverseRequest {
        height_difference: 200.0,
        ..request(5000.0, 300.0)
    };
    let solution = solver.solve_reverse(&req).unwrap();
    assert!(solution.success);

    let shot = Shot::new(solution.elevation_mils, 300.0, req.step).with_height_difference(200.0);
    let last = solver.integrator_mut().solve_direct_last(&shot);
    assert!((last.range() - 5000.0).abs() <= req.precision, "range {}", last.range());
    assert!((last.height() - 200.0).abs() <= req.precision, "height {}", last.height());
}

#[test]
fn ascending_target_is_reached_on_the_way_up() {
    let req = ReverseRequest {
        height_difference: 500.0,
        branch: Branch::Ascending,
        ..request(1500.0, 300.0)
    };
    let mut solver = solver(PhysicsModel::PointMass, 17);
    let solution = solver.solve_reverse(&req).unwrap();
    assert!(solution.elevation_mils > 300.0 && solution.elevation_mils < 600.0);

    let shot = Shot::new(solution.elevation_mils, 300.0, req.step)
        .with_height_difference(500.0)
        .with_branch(Branch::Ascending);
    let last = solver.integrator_mut().solve_direct_last(&shot);
    assert!((last.range() - 1500.0).abs() <= req.precision, "range {}", last.range());
    assert!((last.height() - 500.0).abs() <= req.precision, "height {}", last.height());
    assert!(last.velocity.y > 0.0);

    let high = ReverseRequest {
        kind: TrajectoryKind::HighAngle,
        ..req
    };
    assert!(matches!(
        common::solver(PhysicsModel::PointMass, 17).solve_reverse(&high),
        Err(FireError::TrajectoryKindMismatch(_))
    ));
}

#[test]
fn unreachable_ascending_target_fails_to_converge() {
    // On the way up the shell is far above 300 m by the time it covers 3 km
    let req = ReverseRequest {
        height_difference: 300.0,
        branch: Branch::Ascending,
        initial_angle_mils: 1100.0,
        ..request(3000.0, 300.0)
    };
    match solver(PhysicsModel::PointMass, 17).solve_reverse(&req) {
        Err(FireError::ConvergenceFailure(solution)) => assert!(!solution.success),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn zero_precision_settles_for_quasi_convergence() {
    let mut solver = ReverseSolver::new(
        integrator(PhysicsModel::PointMass),
        ReverseSettings {
            check_limit: false,
            seed: Some(23),
        },
    );
    // One halving of this step already falls below the step floor
    let req = ReverseRequest {
        height_difference: 20.0,
        step: 0.0016,
        precision: 0.0,
        initial_angle_mils: 120.0,
        ..ReverseRequest::new(2000.0, 300.0)
    };
    match solver.solve_reverse(&req) {
        Err(FireError::QuasiConvergence(solution)) => {
            assert!(!solution.success);
            assert!(solution.elevation_mils > 0.0 && solution.elevation_mils < APEX_ANGLE_MILS);
        }
        other => panic!("unexpected {other:?}"),
    }
}

fn unstable_solver(check_limit: bool) -> ReverseSolver {
    let integrator = TrajectoryIntegrator::new(
        PhysicsModel::ModifiedPointMass,
        &projectile(),
        &unstable_coefficients(),
        AdjustmentFactors::default(),
        Environment::default(),
    )
    .unwrap();
    ReverseSolver::new(
        integrator,
        ReverseSettings {
            check_limit,
            seed: Some(6),
        },
    )
}

#[test]
fn excessive_yaw_of_repose_is_reported() {
    match unstable_solver(false).solve_reverse(&request(5000.0, 300.0)) {
        Err(FireError::YawInstability(solution)) => {
            assert!(!solution.success);
            assert_eq!(solution.elevation_mils, 300.0);
        }
        other => panic!("unexpected {other:?}"),
    }
    // Cut-short flights also cap the probed maximum range
    assert!(matches!(
        unstable_solver(true).solve_reverse(&request(5000.0, 300.0)),
        Err(FireError::OutOfRange { .. })
    ));
}

#[test]
fn slow_shell_maximum_range_search_terminates() {
    let mut direct = integrator(PhysicsModel::PointMass);
    let best = direct.max_range(30.0, 0.05);
    assert!(best.angle_mils <= 1600.0);
    assert!(best.range() < 100.0);

    let outcome = solver(PhysicsModel::PointMass, 3).solve_reverse(&ReverseRequest::new(50.0, 30.0));
    assert!(
        matches!(outcome, Ok(_) | Err(FireError::OutOfRange { .. })),
        "unexpected {outcome:?}"
    );
}
