//! The medium the shell flies through: gravity, Earth rotation, air and wind.
//!
//! Coordinates are launch-centred: x along the line of fire, y up, z to the
//! right. Gravity and the sphericity correction follow a spherical Earth of
//! radius `EARTH_RADIUS_M` unless curvature is switched off.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::atmosphere::Atmosphere;
use crate::constants::{
    mils_to_rad, DEG_TO_RAD, EARTH_RADIUS_M, EARTH_ROTATION_RAD_S, G_ACCEL_MPS2,
    LATITUDE_GRAVITY_FACTOR,
};
use crate::wind::Wind;

/// Site and Earth-model switches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    /// Battery latitude (degrees, north positive)
    pub latitude_deg: f64,
    /// Azimuth of the line of fire (mils, clockwise from north)
    pub azimuth_mils: f64,
    /// Apply the Coriolis acceleration
    pub coriolis: bool,
    /// Scale gravity with latitude
    pub latitude_correction: bool,
    /// Spherical Earth: gravity gradient and the sphericity height correction
    pub earth_curvature: bool,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            latitude_deg: 0.0,
            azimuth_mils: 0.0,
            coriolis: false,
            latitude_correction: false,
            earth_curvature: true,
        }
    }
}

impl EnvironmentSettings {
    /// Gravity magnitude at the battery
    pub fn local_gravity(&self) -> f64 {
        if self.latitude_correction {
            G_ACCEL_MPS2 * (1.0 - LATITUDE_GRAVITY_FACTOR * (2.0 * self.latitude_deg * DEG_TO_RAD).cos())
        } else {
            G_ACCEL_MPS2
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub atmosphere: Atmosphere,
    pub wind: Wind,
    settings: EnvironmentSettings,
    local_gravity: f64,
    // (sin φ, cos φ, sin A, cos A)
    rotation: (f64, f64, f64, f64),
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Atmosphere::default(), Wind::Calm, EnvironmentSettings::default())
    }
}

impl Environment {
    pub fn new(atmosphere: Atmosphere, wind: Wind, settings: EnvironmentSettings) -> Self {
        let latitude = settings.latitude_deg * DEG_TO_RAD;
        let azimuth = mils_to_rad(settings.azimuth_mils);
        Self {
            atmosphere,
            wind,
            settings,
            local_gravity: settings.local_gravity(),
            rotation: (latitude.sin(), latitude.cos(), azimuth.sin(), azimuth.cos()),
        }
    }

    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }

    pub fn local_gravity(&self) -> f64 {
        self.local_gravity
    }

    /// Gravity acceleration at a position (altitude taken from the uncorrected height)
    pub fn gravity(&self, position: &Vector3<f64>) -> Vector3<f64> {
        let g = self.local_gravity;
        if !self.settings.earth_curvature {
            return Vector3::new(0.0, -g, 0.0);
        }
        let radial = 1.0 - position.y / EARTH_RADIUS_M;
        Vector3::new(
            -position.x * g / EARTH_RADIUS_M,
            -g * radial * radial,
            -position.z * g / EARTH_RADIUS_M,
        )
    }

    /// Coriolis acceleration for a ground velocity
    pub fn coriolis(&self, velocity: &Vector3<f64>) -> Vector3<f64> {
        if !self.settings.coriolis {
            return Vector3::zeros();
        }
        let (sin_lat, cos_lat, sin_az, cos_az) = self.rotation;
        let w2 = 2.0 * EARTH_ROTATION_RAD_S;
        Vector3::new(
            w2 * (-velocity.y * cos_lat * sin_az - velocity.z * sin_lat),
            w2 * (velocity.x * cos_lat * sin_az + velocity.z * cos_lat * cos_az),
            w2 * (velocity.x * sin_lat - velocity.y * cos_lat * cos_az),
        )
    }

    pub fn wind_at(&self, altitude_m: f64) -> Vector3<f64> {
        self.wind.vector_at(altitude_m)
    }

    /// Velocity relative to the air mass
    pub fn air_velocity(&self, velocity: &Vector3<f64>, altitude_m: f64) -> Vector3<f64> {
        velocity - self.wind_at(altitude_m)
    }

    pub fn density(&self, altitude_m: f64) -> f64 {
        self.atmosphere.density(altitude_m)
    }

    pub fn mach(&self, speed_mps: f64, altitude_m: f64) -> f64 {
        self.atmosphere.mach(speed_mps, altitude_m)
    }

    /// Height of a position above the tangent plane, corrected for Earth sphericity
    pub fn corrected_height(&self, position: &Vector3<f64>) -> f64 {
        if !self.settings.earth_curvature {
            return position.y;
        }
        position.y + (position.x * position.x + position.z * position.z) / (2.0 * EARTH_RADIUS_M)
    }
}
