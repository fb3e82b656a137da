//! JSON description of a complete solver setup.

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::adjustment::AdjustmentFactors;
use crate::angle_calculations::{ReverseSettings, ReverseSolver};
use crate::atmosphere::Atmosphere;
use crate::coefficients::AerodynamicCoefficients;
use crate::environment::{Environment, EnvironmentSettings};
use crate::error::BallisticsError;
use crate::projectile::ProjectileSpec;
use crate::trajectory_solver::{PhysicsModel, TrajectoryIntegrator};
use crate::wind::Wind;

/// Everything needed to build an integrator or a reverse solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallisticsConfig {
    #[serde(default)]
    pub model: PhysicsModel,
    pub projectile: ProjectileSpec,
    pub coefficients: AerodynamicCoefficients,
    #[serde(default)]
    pub factors: AdjustmentFactors,
    #[serde(default)]
    pub atmosphere: Atmosphere,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub environment: EnvironmentSettings,
    #[serde(default)]
    pub reverse: ReverseSettings,
}

impl BallisticsConfig {
    pub fn from_json_str(json: &str) -> Result<Self, BallisticsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BallisticsError> {
        let path = path.as_ref();
        debug!("loading configuration from {}", path.display());
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn to_json_string(&self) -> Result<String, BallisticsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn environment(&self) -> Environment {
        Environment::new(self.atmosphere.clone(), self.wind.clone(), self.environment)
    }

    pub fn integrator(&self) -> Result<TrajectoryIntegrator, BallisticsError> {
        TrajectoryIntegrator::new(
            self.model,
            &self.projectile,
            &self.coefficients,
            self.factors.clone(),
            self.environment(),
        )
    }

    pub fn reverse_solver(&self) -> Result<ReverseSolver, BallisticsError> {
        Ok(ReverseSolver::new(self.integrator()?, self.reverse))
    }
}
