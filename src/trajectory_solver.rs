//! Direct problem: integrate one shot until it crosses the target height.
//!
//! Every drag model shares the same driver: a classic fourth-order
//! Runge-Kutta step on velocity and position, a stop condition that shrinks
//! the last step so the run lands on the target height, and a fixed-rate
//! sampler. The vacuum model is solved in closed form instead.

use log::{trace, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::adjustment::AdjustmentFactors;
use crate::coefficients::{AerodynamicCoefficients, YawCoefficients};
use crate::constants::{
    mils_to_rad, APEX_VERTICAL_SPEED_MPS, LIMIT_PROBE_COARSE_STEP_MILS, LIMIT_PROBE_FINE_STEP_MILS,
    LIMIT_PROBE_RANGE_SLACK_M, LIMIT_PROBE_START_MILS, MAX_YAW_OF_REPOSE, TERMINAL_HEIGHT_TOLERANCE_M,
    VERTICAL_FIRE_MILS,
};
use crate::derivatives::{
    AccelerationLaw, Body, LinearDrag, ModifiedPointMass, PointMass, Stage, YawFormula,
};
use crate::environment::Environment;
use crate::error::BallisticsError;
use crate::flight::{Branch, FlightState, Shot};
use crate::projectile::ProjectileSpec;
use crate::trajectory_sampling::sample_interval;

/// Drag model used by the integrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicsModel {
    /// Gravity only, closed form
    Vacuum,
    /// Drag linear in the air-relative velocity
    LinearDrag,
    /// 3-DOF point mass
    #[default]
    PointMass,
    /// 4-DOF modified point mass
    ModifiedPointMass,
    /// 4-DOF modified point mass with the 1990 gravity-based yaw of repose
    ModifiedPointMass1990,
}

impl PhysicsModel {
    /// Whether the model can report yaw instability
    pub fn models_yaw(self) -> bool {
        matches!(
            self,
            PhysicsModel::ModifiedPointMass | PhysicsModel::ModifiedPointMass1990
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Law {
    Vacuum,
    Linear(LinearDrag),
    PointMass(PointMass),
    Modified(ModifiedPointMass),
}

/// Scratch state of one run
#[derive(Debug, Clone)]
struct RunState {
    angle_mils: f64,
    position: Vector3<f64>,
    velocity: Vector3<f64>,
    corrected_height: f64,
    time: f64,
    yaw: f64,
    spin_rate: f64,
    max_height: f64,
    max_yaw: f64,
    descending: bool,
    last_step: bool,
    terminated: bool,
    step: f64,
}

impl RunState {
    fn launch(shot: &Shot) -> Self {
        let angle = mils_to_rad(shot.angle_mils);
        Self {
            angle_mils: shot.angle_mils,
            position: Vector3::zeros(),
            velocity: Vector3::new(
                shot.muzzle_velocity * angle.cos(),
                shot.muzzle_velocity * angle.sin(),
                0.0,
            ),
            corrected_height: 0.0,
            time: 0.0,
            yaw: 0.0,
            spin_rate: 0.0,
            max_height: 0.0,
            max_yaw: 0.0,
            descending: false,
            last_step: false,
            terminated: false,
            step: shot.step,
        }
    }

    fn sample(&self) -> FlightState {
        FlightState {
            angle_mils: self.angle_mils,
            position: Vector3::new(self.position.x, self.corrected_height, self.position.z),
            velocity: self.velocity,
            time: self.time,
            yaw: self.yaw,
            max_height: self.max_height,
            max_yaw: self.max_yaw,
        }
    }

    fn stage(&self, velocity: Vector3<f64>) -> Stage {
        Stage {
            yaw_magnitude: self.yaw,
            spin_rate: self.spin_rate,
            ..Stage::new(self.position, velocity)
        }
    }

    /// Decide whether the next step is the last one, shrinking it to land on the target height
    fn check_stop(&mut self, shot: &Shot, recorded_this_step: bool, samples: &mut Samples<'_>) {
        let vy = self.velocity.y;
        if self.last_step || !shot.branch.is_stopping(vy) {
            return;
        }
        let remaining = match shot.branch {
            Branch::Descending => self.corrected_height - shot.height_difference,
            Branch::Ascending => shot.height_difference - self.corrected_height,
        };
        if remaining <= TERMINAL_HEIGHT_TOLERANCE_M
            || (shot.branch == Branch::Ascending && vy <= APEX_VERTICAL_SPEED_MPS)
        {
            self.terminated = true;
            self.last_step = true;
            if !recorded_this_step {
                samples.push(self.sample());
            }
        } else if self.step * vy.abs() > remaining {
            self.step = remaining / vy.abs();
            self.last_step = true;
        }
    }
}

/// Recorded samples plus the caller's observer
struct Samples<'a> {
    states: Vec<FlightState>,
    observer: &'a mut dyn FnMut(&FlightState),
}

impl Samples<'_> {
    fn push(&mut self, state: FlightState) {
        (self.observer)(&state);
        self.states.push(state);
    }
}

/// Direct-problem solver for one projectile in one environment.
///
/// Solving takes `&mut self` because the adjustment factors are re-evaluated
/// at the start of every modified point-mass run; use one clone per thread.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryIntegrator {
    model: PhysicsModel,
    law: Law,
    environment: Environment,
}

impl TrajectoryIntegrator {
    /// Build an integrator, checking the projectile and the tables the model needs
    pub fn new(
        model: PhysicsModel,
        projectile: &ProjectileSpec,
        coefficients: &AerodynamicCoefficients,
        factors: AdjustmentFactors,
        environment: Environment,
    ) -> Result<Self, BallisticsError> {
        let law = match model {
            PhysicsModel::Vacuum => Law::Vacuum,
            PhysicsModel::LinearDrag => {
                projectile.validate()?;
                Law::Linear(LinearDrag {
                    body: Body::from_projectile(projectile),
                    drag_coefficient: coefficients.linear_drag_coefficient(),
                })
            }
            PhysicsModel::PointMass => {
                projectile.validate()?;
                Law::PointMass(PointMass {
                    body: Body::from_projectile(projectile),
                    drag: coefficients.drag.clone(),
                })
            }
            PhysicsModel::ModifiedPointMass | PhysicsModel::ModifiedPointMass1990 => {
                projectile.validate()?;
                let yaw_formula = if model == PhysicsModel::ModifiedPointMass1990 {
                    YawFormula::Gravity
                } else {
                    YawFormula::Acceleration
                };
                Law::Modified(ModifiedPointMass {
                    body: Body::from_projectile(projectile),
                    twist_calibers: projectile.twist_calibers,
                    force_model: projectile.force_model,
                    coefficients: YawCoefficients::from_set(coefficients)?,
                    factors,
                    yaw_formula,
                })
            }
        };
        Ok(Self {
            model,
            law,
            environment,
        })
    }

    /// Integrator of the vacuum model, which needs no projectile data
    pub fn vacuum(environment: Environment) -> Self {
        Self {
            model: PhysicsModel::Vacuum,
            law: Law::Vacuum,
            environment,
        }
    }

    pub fn model(&self) -> PhysicsModel {
        self.model
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Integrate a shot. The launch state and the final state are always
    /// included; intermediate states only when `record` is set.
    pub fn solve_direct(&mut self, shot: &Shot, record: bool) -> Vec<FlightState> {
        self.solve_direct_with(shot, record, |_| {})
    }

    /// Like `solve_direct`, handing every recorded state to `on_sample` as it is produced
    pub fn solve_direct_with<F>(&mut self, shot: &Shot, record: bool, mut on_sample: F) -> Vec<FlightState>
    where
        F: FnMut(&FlightState),
    {
        let mut samples = Samples {
            states: Vec::new(),
            observer: &mut on_sample,
        };
        let environment = &self.environment;
        match &mut self.law {
            Law::Vacuum => solve_vacuum(environment, shot, record, &mut samples),
            Law::Linear(law) => integrate(law, environment, shot, record, &mut samples),
            Law::PointMass(law) => integrate(law, environment, shot, record, &mut samples),
            Law::Modified(law) => integrate(law, environment, shot, record, &mut samples),
        }
        samples.states
    }

    /// Final state of a shot
    pub fn solve_direct_last(&mut self, shot: &Shot) -> FlightState {
        let states = self.solve_direct(shot, false);
        // The launch state is always present
        states.last().copied().unwrap_or_default()
    }

    /// Probe the maximum range at `muzzle_velocity` on level ground.
    ///
    /// Starting at 790 mils the angle rises in 10-mil steps while the range
    /// keeps growing (within 2.5 m), then in 1-mil steps from the last coarse
    /// angle below the peak. Both sweeps stop at vertical fire (1600 mils), which
    /// slow shells reach before their range differences exceed the slack.
    /// Returns the final state at the angle just before the range stopped growing.
    pub fn max_range(&mut self, muzzle_velocity: f64, step: f64) -> FlightState {
        let base = Shot::new(LIMIT_PROBE_START_MILS, muzzle_velocity, step);
        let mut angle = LIMIT_PROBE_START_MILS;
        let mut range = self.solve_direct_last(&base).range();
        loop {
            angle += LIMIT_PROBE_COARSE_STEP_MILS;
            let previous = range;
            range = self.solve_direct_last(&base.at_angle(angle)).range();
            trace!("limit probe: {angle:.0} mils -> {range:.1} m");
            if !(range + LIMIT_PROBE_RANGE_SLACK_M > previous) || angle >= VERTICAL_FIRE_MILS {
                break;
            }
        }

        angle -= LIMIT_PROBE_COARSE_STEP_MILS;
        loop {
            angle += LIMIT_PROBE_FINE_STEP_MILS;
            let previous = range;
            range = self.solve_direct_last(&base.at_angle(angle)).range();
            trace!("limit probe: {angle:.0} mils -> {range:.1} m");
            if !(range > previous) || angle >= VERTICAL_FIRE_MILS {
                break;
            }
        }

        self.solve_direct_last(&base.at_angle(angle - LIMIT_PROBE_FINE_STEP_MILS))
    }
}

/// Runge-Kutta driver shared by every drag model
fn integrate<L: AccelerationLaw>(
    law: &mut L,
    env: &Environment,
    shot: &Shot,
    record: bool,
    samples: &mut Samples<'_>,
) {
    let mut run = RunState::launch(shot);
    samples.push(run.sample());
    if !(shot.step.is_finite() && shot.step > 0.0) {
        warn!("integration step {} is not positive; returning the launch state", shot.step);
        return;
    }

    law.prepare(shot);
    let models_yaw = law.models_yaw();
    let interval = sample_interval(shot.step);
    let mut counter: usize = 0;

    run.spin_rate = law.muzzle_spin_rate(shot.muzzle_velocity);
    // Acceleration estimate fed to the first stage's yaw of repose
    let mut previous_acceleration = if models_yaw {
        law.acceleration(env, &run.stage(run.velocity))
    } else {
        Vector3::zeros()
    };

    while !run.terminated {
        let h = run.step;
        let v = run.velocity;

        let mut stage = run.stage(v);
        stage.yaw = law.stage_yaw(env, &stage, &previous_acceleration);
        let k1 = law.acceleration(env, &stage);

        let v2 = v + k1 * (h / 2.0);
        let mut stage = run.stage(v2);
        stage.yaw = law.stage_yaw(env, &stage, &k1);
        let k2 = law.acceleration(env, &stage);

        let v3 = v + k2 * (h / 2.0);
        let mut stage = run.stage(v3);
        stage.yaw = law.stage_yaw(env, &stage, &k2);
        let k3 = law.acceleration(env, &stage);

        let v4 = v + k3 * h;
        let mut stage = run.stage(v4);
        stage.yaw = law.stage_yaw(env, &stage, &k3);
        let k4 = law.acceleration(env, &stage);

        let delta_v = (k1 + 2.0 * k2 + 2.0 * k3 + k4) * (h / 6.0);

        if models_yaw {
            previous_acceleration = delta_v;
            run.yaw = law.step_yaw(env, &run.stage(v), &k1);

            let altitude = run.position.y;
            let p = run.spin_rate;
            let spin_sum = law.spin_derivative(env, altitude, &v, p)
                + 2.0 * law.spin_derivative(env, altitude, &v2, p)
                + 2.0 * law.spin_derivative(env, altitude, &v3, p)
                + law.spin_derivative(env, altitude, &v4, p);
            run.spin_rate += spin_sum * (h / 6.0);
        }

        run.position += (v + 2.0 * v2 + 2.0 * v3 + v4) * (h / 6.0);
        run.velocity += delta_v;
        run.corrected_height = env.corrected_height(&run.position);
        run.time += h;

        if run.velocity.y < 0.0 && !run.descending {
            run.descending = true;
            // Past the apex the ascending crossing can no longer happen
            if shot.branch == Branch::Ascending {
                run.last_step = true;
            }
        }

        if models_yaw && run.yaw > MAX_YAW_OF_REPOSE {
            warn!(
                "yaw of repose {:.3} exceeds unity at x = {:.1} m, y = {:.1} m ({:.2} mils)",
                run.yaw, run.position.x, run.corrected_height, shot.angle_mils
            );
            run.max_yaw = run.yaw;
            run.max_height = run.max_height.max(run.corrected_height);
            samples.push(run.sample());
            return;
        }

        if !run.velocity.iter().chain(run.position.iter()).all(|c| c.is_finite()) {
            warn!("non-finite state at t = {:.3} s ({:.2} mils)", run.time, shot.angle_mils);
            samples.push(run.sample());
            return;
        }

        run.max_yaw = run.max_yaw.max(run.yaw);
        run.max_height = run.max_height.max(run.corrected_height);

        let mut recorded = false;
        if record || run.last_step {
            if counter % interval == 0 || run.last_step {
                samples.push(run.sample());
                recorded = true;
                if run.last_step {
                    run.terminated = true;
                }
            }
            counter += 1;
        }

        run.check_stop(shot, recorded, samples);
    }
}

/// Closed-form vacuum trajectory on a flat Earth with constant local gravity.
///
/// The final state is placed exactly at the crossing of the target height on
/// the requested branch, or at the apex when the height is never reached.
fn solve_vacuum(env: &Environment, shot: &Shot, record: bool, samples: &mut Samples<'_>) {
    let g = env.local_gravity();
    let run = RunState::launch(shot);
    let (vx, vy0) = (run.velocity.x, run.velocity.y);
    let apex_time = (vy0 / g).max(0.0);

    let state_at = |t: f64| {
        let y = vy0 * t - 0.5 * g * t * t;
        let highest = t.min(apex_time);
        FlightState {
            angle_mils: shot.angle_mils,
            position: Vector3::new(vx * t, y, 0.0),
            velocity: Vector3::new(vx, vy0 - g * t, 0.0),
            time: t,
            yaw: 0.0,
            max_height: vy0 * highest - 0.5 * g * highest * highest,
            max_yaw: 0.0,
        }
    };

    samples.push(state_at(0.0));

    let discriminant = vy0 * vy0 - 2.0 * g * shot.height_difference;
    let end_time = if discriminant < 0.0 {
        apex_time
    } else {
        match shot.branch {
            Branch::Descending => (vy0 + discriminant.sqrt()) / g,
            Branch::Ascending => ((vy0 - discriminant.sqrt()) / g).max(0.0),
        }
    };

    if record && shot.step.is_finite() && shot.step > 0.0 {
        let interval = sample_interval(shot.step);
        let mut n: usize = 1;
        loop {
            let t = n as f64 * shot.step;
            if t >= end_time {
                break;
            }
            if (n - 1) % interval == 0 {
                samples.push(state_at(t));
            }
            n += 1;
        }
    }

    samples.push(state_at(end_time));
}
