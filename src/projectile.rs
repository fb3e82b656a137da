use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::constants::DEFAULT_TWIST_CALIBERS;
use crate::error::BallisticsError;

/// How the aerodynamic tables decompose the force on the projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceModel {
    /// Drag along the air velocity, lift perpendicular to it
    #[default]
    DragLift,
    /// Axial and normal force in the body frame
    NormalAxial,
}

/// Spin imparted by a twist of `twist_calibers` calibers per turn (rad/s)
pub fn spin_rate(velocity: f64, twist_calibers: f64, diameter_m: f64) -> f64 {
    2.0 * PI * velocity / (twist_calibers * diameter_m)
}

fn default_twist() -> f64 {
    DEFAULT_TWIST_CALIBERS
}

/// Static projectile parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    #[serde(default)]
    pub name: String,
    /// Reference diameter (m)
    pub diameter_m: f64,
    /// Mass with the standard number of squares (kg)
    pub mass_kg: f64,
    /// Axial moment of inertia (kg·m²)
    pub axial_inertia: f64,
    /// Rifling twist, calibers per turn
    #[serde(default = "default_twist")]
    pub twist_calibers: f64,
    /// Mass rings fitted on this round
    #[serde(default)]
    pub squares: f64,
    /// Mass rings the tabulated mass already includes
    #[serde(default)]
    pub standard_squares: f64,
    /// Mass of one ring (kg)
    #[serde(default)]
    pub square_mass_kg: f64,
    #[serde(default)]
    pub force_model: ForceModel,
}

impl ProjectileSpec {
    pub fn new(name: impl Into<String>, diameter_m: f64, mass_kg: f64, axial_inertia: f64) -> Self {
        Self {
            name: name.into(),
            diameter_m,
            mass_kg,
            axial_inertia,
            twist_calibers: DEFAULT_TWIST_CALIBERS,
            squares: 0.0,
            standard_squares: 0.0,
            square_mass_kg: 0.0,
            force_model: ForceModel::DragLift,
        }
    }

    /// Fit `squares` rings of `square_mass_kg` each, `standard` of them already counted in the mass
    pub fn with_squares(mut self, squares: f64, standard: f64, square_mass_kg: f64) -> Self {
        self.squares = squares;
        self.standard_squares = standard;
        self.square_mass_kg = square_mass_kg;
        self
    }

    pub fn with_force_model(mut self, force_model: ForceModel) -> Self {
        self.force_model = force_model;
        self
    }

    /// Mass including the rings fitted beyond (or removed below) the standard count
    pub fn total_mass(&self) -> f64 {
        self.mass_kg + (self.squares - self.standard_squares) * self.square_mass_kg
    }

    /// Reference cross-section area (m²)
    pub fn area(&self) -> f64 {
        PI * (self.diameter_m / 2.0).powi(2)
    }

    /// Spin rate at the muzzle (rad/s)
    pub fn muzzle_spin_rate(&self, muzzle_velocity: f64) -> f64 {
        spin_rate(muzzle_velocity, self.twist_calibers, self.diameter_m)
    }

    pub fn validate(&self) -> Result<(), BallisticsError> {
        let positive = [
            ("diameter", self.diameter_m),
            ("total mass", self.total_mass()),
            ("axial inertia", self.axial_inertia),
            ("twist", self.twist_calibers),
        ];
        for (what, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(BallisticsError::InvalidProjectile(format!(
                    "{what} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}
