//! Inputs and outputs of the direct and reverse problems.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::rad_to_mils;

/// First elevation tried by a reverse solve unless the caller supplies one
const DEFAULT_INITIAL_ANGLE_MILS: f64 = 1.0;

/// One recorded instant of a trajectory.
///
/// `position.y` is the sphericity-corrected height. `max_height` and `max_yaw`
/// are the running maxima up to and including this sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlightState {
    /// Launch angle of the run (mils)
    pub angle_mils: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub time: f64,
    /// Yaw-of-repose magnitude (sine of the angle of attack)
    pub yaw: f64,
    pub max_height: f64,
    pub max_yaw: f64,
}

impl FlightState {
    pub fn range(&self) -> f64 {
        self.position.x
    }

    pub fn height(&self) -> f64 {
        self.position.y
    }

    pub fn drift(&self) -> f64 {
        self.position.z
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// Angle of the velocity below the horizontal (mils, positive when descending)
    pub fn descent_angle_mils(&self) -> f64 {
        let horizontal = (self.velocity.x.powi(2) + self.velocity.z.powi(2)).sqrt();
        rad_to_mils((-self.velocity.y).atan2(horizontal))
    }
}

/// Result of a reverse solve
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FireSolution {
    pub elevation_mils: f64,
    /// Lateral correction for drift (mils)
    pub derivation_mils: f64,
    pub success: bool,
}

impl FireSolution {
    pub fn new(elevation_mils: f64, derivation_mils: f64, success: bool) -> Self {
        Self {
            elevation_mils,
            derivation_mils,
            success,
        }
    }

    pub(crate) fn failed(elevation_mils: f64, derivation_mils: f64) -> Self {
        Self::new(elevation_mils, derivation_mils, false)
    }
}

/// Crossing of the target height on which a run stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Stop while climbing
    Ascending,
    /// Stop while falling
    #[default]
    Descending,
}

impl Branch {
    /// Whether the vertical velocity is on this branch's stopping side
    pub fn is_stopping(self, vy: f64) -> bool {
        match self {
            Branch::Descending => vy <= 0.0,
            Branch::Ascending => vy >= 0.0,
        }
    }
}

/// Family of the requested solution relative to the 800-mil apex angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryKind {
    /// Low-angle fire, elevation below 800 mils
    #[default]
    Plunging,
    /// High-angle fire, elevation above 800 mils
    HighAngle,
}

/// Launch parameters of one direct solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub angle_mils: f64,
    pub muzzle_velocity: f64,
    /// Target height relative to the gun (m)
    #[serde(default)]
    pub height_difference: f64,
    /// Integration step (s)
    pub step: f64,
    #[serde(default)]
    pub branch: Branch,
}

impl Shot {
    pub fn new(angle_mils: f64, muzzle_velocity: f64, step: f64) -> Self {
        Self {
            angle_mils,
            muzzle_velocity,
            height_difference: 0.0,
            step,
            branch: Branch::Descending,
        }
    }

    pub fn with_height_difference(mut self, height_difference: f64) -> Self {
        self.height_difference = height_difference;
        self
    }

    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branch = branch;
        self
    }

    /// Same shot at another angle
    pub fn at_angle(&self, angle_mils: f64) -> Self {
        Self {
            angle_mils,
            ..*self
        }
    }
}

/// Parameters of one reverse solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseRequest {
    pub target_range: f64,
    pub muzzle_velocity: f64,
    pub height_difference: f64,
    pub kind: TrajectoryKind,
    /// Integration step (s)
    pub step: f64,
    /// Accepted range error (m), also the height tolerance
    pub precision: f64,
    pub initial_angle_mils: f64,
    pub branch: Branch,
}

impl Default for ReverseRequest {
    fn default() -> Self {
        Self {
            target_range: 0.0,
            muzzle_velocity: 0.0,
            height_difference: 0.0,
            kind: TrajectoryKind::Plunging,
            step: 0.1,
            precision: 1.0,
            initial_angle_mils: DEFAULT_INITIAL_ANGLE_MILS,
            branch: Branch::Descending,
        }
    }
}

impl ReverseRequest {
    pub fn new(target_range: f64, muzzle_velocity: f64) -> Self {
        Self {
            target_range,
            muzzle_velocity,
            ..Default::default()
        }
    }

    pub(crate) fn shot(&self, angle_mils: f64, step: f64) -> Shot {
        Shot {
            angle_mils,
            muzzle_velocity: self.muzzle_velocity,
            height_difference: self.height_difference,
            step,
            branch: self.branch,
        }
    }
}
