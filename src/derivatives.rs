//! Acceleration laws of the drag models.
//!
//! Each law gives the acceleration of the shell for one Runge-Kutta stage.
//! The modified point-mass laws also estimate the yaw of repose: the
//! quasi-steady angle of attack of a spinning shell, obtained algebraically
//! from the stage velocity and either the acceleration estimate or gravity.
//! That yaw couples back into drag, lift and the Magnus force.
//!
//! Every stage of a step is evaluated at the step's starting position; only
//! the velocity changes between stages.

use nalgebra::Vector3;

use crate::adjustment::AdjustmentFactors;
use crate::coefficients::{CoefficientTable, YawCoefficients};
use crate::environment::Environment;
use crate::flight::Shot;
use crate::projectile::{spin_rate, ForceModel, ProjectileSpec};

/// Mass and geometry constants of the shell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Inverse of the total mass (1/kg)
    pub inverse_mass: f64,
    pub area: f64,
    pub diameter: f64,
    pub axial_inertia: f64,
}

impl Body {
    pub fn from_projectile(projectile: &ProjectileSpec) -> Self {
        Self {
            inverse_mass: 1.0 / projectile.total_mass(),
            area: projectile.area(),
            diameter: projectile.diameter_m,
            axial_inertia: projectile.axial_inertia,
        }
    }

    /// ρ·A/(2m), the factor common to every aerodynamic force
    fn dynamic_factor(&self, density: f64) -> f64 {
        density * 0.5 * self.inverse_mass * self.area
    }
}

/// State seen by one Runge-Kutta stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    /// Yaw-of-repose vector of this stage
    pub yaw: Vector3<f64>,
    /// Yaw magnitude of the previous step, used by the force totals
    pub yaw_magnitude: f64,
    pub spin_rate: f64,
}

impl Stage {
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self {
            position,
            velocity,
            yaw: Vector3::zeros(),
            yaw_magnitude: 0.0,
            spin_rate: 0.0,
        }
    }

    fn altitude(&self) -> f64 {
        self.position.y
    }
}

/// One drag model's contribution to the equations of motion
pub trait AccelerationLaw {
    /// Acceleration of the shell at a stage
    fn acceleration(&self, env: &Environment, stage: &Stage) -> Vector3<f64>;

    /// Whether the law carries a yaw of repose and a spin rate
    fn models_yaw(&self) -> bool {
        false
    }

    /// Yaw-of-repose vector of a stage, given the stage's acceleration estimate
    fn stage_yaw(&self, _env: &Environment, _stage: &Stage, _acceleration: &Vector3<f64>) -> Vector3<f64> {
        Vector3::zeros()
    }

    /// Yaw magnitude reported for a whole step, from the first stage's acceleration
    fn step_yaw(&self, _env: &Environment, _stage: &Stage, _k1: &Vector3<f64>) -> f64 {
        0.0
    }

    /// Spin-rate derivative for a stage velocity. `spin_rate` is the rate at the start of the step.
    fn spin_derivative(&self, _env: &Environment, _altitude: f64, _velocity: &Vector3<f64>, _spin_rate: f64) -> f64 {
        0.0
    }

    /// Spin rate at the muzzle
    fn muzzle_spin_rate(&self, _muzzle_velocity: f64) -> f64 {
        0.0
    }

    /// Per-run setup before the first step
    fn prepare(&mut self, _shot: &Shot) {}
}

/// Drag proportional to the air-relative velocity, with a constant coefficient
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDrag {
    pub body: Body,
    pub drag_coefficient: f64,
}

impl AccelerationLaw for LinearDrag {
    fn acceleration(&self, env: &Environment, stage: &Stage) -> Vector3<f64> {
        let altitude = stage.altitude();
        let v_air = env.air_velocity(&stage.velocity, altitude);
        let q = self.body.dynamic_factor(env.density(altitude));
        -q * self.drag_coefficient * v_air
            + env.gravity(&stage.position)
            + env.coriolis(&stage.velocity)
    }
}

/// Classic 3-DOF point mass: quadratic drag with a Mach-dependent coefficient
#[derive(Debug, Clone, PartialEq)]
pub struct PointMass {
    pub body: Body,
    pub drag: CoefficientTable,
}

impl AccelerationLaw for PointMass {
    fn acceleration(&self, env: &Environment, stage: &Stage) -> Vector3<f64> {
        let altitude = stage.altitude();
        let v_air = env.air_velocity(&stage.velocity, altitude);
        // Mach from the ground speed
        let mach = env.mach(stage.velocity.norm(), altitude);
        let q = self.body.dynamic_factor(env.density(altitude));
        -q * self.drag.value(mach) * v_air * v_air.norm()
            + env.gravity(&stage.position)
            + env.coriolis(&stage.velocity)
    }
}

/// Source of the stage yaw-of-repose estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YawFormula {
    /// From the stage acceleration estimate
    Acceleration,
    /// From gravity alone (1990 formulation)
    Gravity,
}

/// 4-DOF modified point mass
#[derive(Debug, Clone, PartialEq)]
pub struct ModifiedPointMass {
    pub body: Body,
    pub twist_calibers: f64,
    pub force_model: ForceModel,
    pub(crate) coefficients: YawCoefficients,
    pub factors: AdjustmentFactors,
    pub yaw_formula: YawFormula,
}

impl ModifiedPointMass {
    /// Base drag (or axial) coefficient including the yaw-drag term
    fn base_drag(&self, mach: f64, yaw: f64) -> f64 {
        (self.coefficients.drag.value(mach)
            + self.coefficients.drag_squared.value(mach) * yaw * yaw * self.factors.yaw_drag())
            * self.factors.shape()
    }

    fn drag_total(&self, mach: f64, yaw: f64) -> f64 {
        let drag = self.base_drag(mach, yaw);
        match self.force_model {
            ForceModel::DragLift => drag,
            ForceModel::NormalAxial => {
                let normal = self.coefficients.lift.value(mach) * self.factors.lift();
                drag * (1.0 - yaw * yaw).max(0.0).sqrt() - normal * yaw * yaw
            }
        }
    }

    fn lift_total(&self, mach: f64, yaw: f64) -> f64 {
        let lift = self.coefficients.lift.value(mach) * self.factors.lift();
        match self.force_model {
            ForceModel::DragLift => lift,
            ForceModel::NormalAxial => {
                self.base_drag(mach, yaw) + lift * (1.0 - yaw * yaw).max(0.0).sqrt()
            }
        }
    }

    /// 2·Ix·p/(ρ·A·d·|v_air|⁴·Cmα)
    fn repose_factor(&self, env: &Environment, stage: &Stage, v_air: &Vector3<f64>) -> f64 {
        let altitude = stage.altitude();
        let mach = env.mach(stage.velocity.norm(), altitude);
        let overturning = self.coefficients.overturning_moment.value(mach);
        2.0 * self.body.axial_inertia * stage.spin_rate
            / (env.density(altitude)
                * self.body.area
                * self.body.diameter
                * v_air.norm().powi(4)
                * overturning)
    }

    fn yaw_from_acceleration(&self, env: &Environment, stage: &Stage, acceleration: &Vector3<f64>) -> Vector3<f64> {
        let v_air = env.air_velocity(&stage.velocity, stage.altitude());
        acceleration.cross(&v_air) * self.repose_factor(env, stage, &v_air)
    }
}

impl AccelerationLaw for ModifiedPointMass {
    fn acceleration(&self, env: &Environment, stage: &Stage) -> Vector3<f64> {
        let altitude = stage.altitude();
        let v_air = env.air_velocity(&stage.velocity, altitude);
        let speed_air = v_air.norm();
        let mach = env.mach(stage.velocity.norm(), altitude);
        let q = self.body.dynamic_factor(env.density(altitude));
        let yaw = stage.yaw_magnitude;

        let drag = -q * self.drag_total(mach, yaw) * v_air * speed_air;
        let lift = q * self.lift_total(mach, yaw) * speed_air * speed_air * stage.yaw;
        let magnus = q
            * self.body.diameter
            * self.coefficients.magnus_force.value(mach)
            * stage.spin_rate
            * stage.yaw.cross(&stage.velocity);

        drag + lift + magnus + env.gravity(&stage.position) + env.coriolis(&stage.velocity)
    }

    fn models_yaw(&self) -> bool {
        true
    }

    fn stage_yaw(&self, env: &Environment, stage: &Stage, acceleration: &Vector3<f64>) -> Vector3<f64> {
        match self.yaw_formula {
            YawFormula::Acceleration => self.yaw_from_acceleration(env, stage, acceleration),
            YawFormula::Gravity => {
                let v_air = env.air_velocity(&stage.velocity, stage.altitude());
                env.gravity(&stage.position).cross(&v_air) * self.repose_factor(env, stage, &v_air)
            }
        }
    }

    fn step_yaw(&self, env: &Environment, stage: &Stage, k1: &Vector3<f64>) -> f64 {
        // Both formulations report the acceleration-based magnitude
        self.yaw_from_acceleration(env, stage, k1).norm()
    }

    fn spin_derivative(&self, env: &Environment, altitude: f64, velocity: &Vector3<f64>, spin_rate: f64) -> f64 {
        let speed = velocity.norm();
        let mach = env.mach(speed, altitude);
        let d = self.body.diameter;
        env.density(altitude) * self.body.area * d * d * spin_rate / (2.0 * self.body.axial_inertia)
            * speed
            * self.coefficients.spin_damping.value(mach)
    }

    fn muzzle_spin_rate(&self, muzzle_velocity: f64) -> f64 {
        spin_rate(muzzle_velocity, self.twist_calibers, self.body.diameter)
    }

    fn prepare(&mut self, shot: &Shot) {
        self.factors.prepare(shot.angle_mils, shot.muzzle_velocity);
    }
}
