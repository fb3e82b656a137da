//! Standard atmosphere models for artillery trajectory calculations.
//!
//! Every model is a closed-form law of altitude. Density and temperature can be
//! scaled by optional weighting functions, which is how empirical corrections
//! (meteorological messages, calibration runs) are applied without touching the
//! base model. The laws are defined for every real altitude and never fail.

use serde::{Deserialize, Serialize};

use crate::constants::{R_AIR, SEA_LEVEL_DENSITY, SEA_LEVEL_PRESSURE_PA, SEA_LEVEL_TEMPERATURE_K};

/// Speed of sound factor of the constant atmosphere: c = k·√T0
const CONSTANT_SOUND_FACTOR: f64 = 20.0468;

/// Speed of sound factor of the ICAO law: c = k·√T
const ICAO_SOUND_FACTOR: f64 = 20.046796;

/// ICAO temperature exponent coefficients: T = T0·exp(−(a + b·h)·h)
const ICAO_TEMPERATURE_A: f64 = 0.00002255921;
const ICAO_TEMPERATURE_B: f64 = 0.0000000002988062;

/// ICAO density exponent coefficients: ρ = ρ0·exp(−(a + b·h)·h)
const ICAO_DENSITY_A: f64 = 0.000095663;
const ICAO_DENSITY_B: f64 = 0.00000000107639;

/// ISA tropospheric lapse rate (K per km)
const ISA_LAPSE_RATE_K_PER_KM: f64 = 6.5;

/// ISA pressure exponent
const ISA_PRESSURE_EXPONENT: f64 = 5.2561;

/// Heat capacity ratio used by the ISA speed of sound
const ISA_GAMMA: f64 = 1.404;

/// US Standard (army) decay rates
const US_TEMPERATURE_DECAY: f64 = 0.0000197862;
const US_DENSITY_DECAY: f64 = 0.0001036;

/// US Standard speed of sound: c = k·√(T·9/5) ft/s, converted to m/s
const US_SOUND_FACTOR_FPS: f64 = 49.19;
const FEET_TO_METRES: f64 = 0.3048;
const KELVIN_TO_RANKINE: f64 = 1.8;

/// Standard atmosphere law
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtmosphereModel {
    /// Sea-level conditions at every altitude
    Constant,
    /// ICAO exponential fit
    #[default]
    Icao,
    /// International Standard Atmosphere, tropospheric lapse rate
    Isa,
    /// US Standard (army) exponential fit
    UsStandard,
}

/// One point of an altitude-dependent weighting profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightPoint {
    pub altitude_m: f64,
    pub weight: f64,
}

/// Multiplicative correction applied to density or temperature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Same weight at every altitude
    Constant(f64),
    /// Piecewise-linear in altitude, held flat outside the profile
    Profile(Vec<WeightPoint>),
}

impl Weighting {
    /// Build a profile weighting; points are sorted by altitude.
    pub fn profile(mut points: Vec<WeightPoint>) -> Self {
        points.sort_by(|a, b| a.altitude_m.total_cmp(&b.altitude_m));
        Weighting::Profile(points)
    }

    /// Weight at the given altitude
    pub fn weight(&self, altitude_m: f64) -> f64 {
        match self {
            Weighting::Constant(w) => *w,
            Weighting::Profile(points) => interpolate_profile(points, altitude_m),
        }
    }
}

fn interpolate_profile(points: &[WeightPoint], altitude_m: f64) -> f64 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 1.0,
    };
    if altitude_m <= first.altitude_m {
        return first.weight;
    }
    if altitude_m >= last.altitude_m {
        return last.weight;
    }
    for pair in points.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if altitude_m <= hi.altitude_m {
            let span = hi.altitude_m - lo.altitude_m;
            if span <= 0.0 {
                return hi.weight;
            }
            let t = (altitude_m - lo.altitude_m) / span;
            return lo.weight + t * (hi.weight - lo.weight);
        }
    }
    last.weight
}

/// Atmosphere seen by the projectile: a standard law plus optional weightings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Atmosphere {
    pub model: AtmosphereModel,
    pub density_weight: Option<Weighting>,
    pub temperature_weight: Option<Weighting>,
}

impl Atmosphere {
    pub fn new(model: AtmosphereModel) -> Self {
        Self {
            model,
            density_weight: None,
            temperature_weight: None,
        }
    }

    pub fn with_density_weight(mut self, weighting: Weighting) -> Self {
        self.density_weight = Some(weighting);
        self
    }

    pub fn with_temperature_weight(mut self, weighting: Weighting) -> Self {
        self.temperature_weight = Some(weighting);
        self
    }

    fn density_factor(&self, altitude_m: f64) -> f64 {
        self.density_weight
            .as_ref()
            .map_or(1.0, |w| w.weight(altitude_m))
    }

    fn temperature_factor(&self, altitude_m: f64) -> f64 {
        self.temperature_weight
            .as_ref()
            .map_or(1.0, |w| w.weight(altitude_m))
    }

    /// Air temperature in kelvin.
    ///
    /// The constant atmosphere ignores the temperature weighting here; it only
    /// scales that model's speed of sound.
    pub fn temperature(&self, altitude_m: f64) -> f64 {
        let h = altitude_m;
        match self.model {
            AtmosphereModel::Constant => SEA_LEVEL_TEMPERATURE_K,
            AtmosphereModel::Icao => {
                self.temperature_factor(h)
                    * SEA_LEVEL_TEMPERATURE_K
                    * (-(ICAO_TEMPERATURE_A + ICAO_TEMPERATURE_B * h) * h).exp()
            }
            AtmosphereModel::Isa => {
                self.temperature_factor(h) * SEA_LEVEL_TEMPERATURE_K
                    - ISA_LAPSE_RATE_K_PER_KM * h / 1000.0
            }
            AtmosphereModel::UsStandard => {
                self.temperature_factor(h)
                    * SEA_LEVEL_TEMPERATURE_K
                    * (-US_TEMPERATURE_DECAY * h).exp()
            }
        }
    }

    /// Speed of sound in m/s
    pub fn speed_of_sound(&self, altitude_m: f64) -> f64 {
        match self.model {
            AtmosphereModel::Constant => {
                self.temperature_factor(altitude_m)
                    * CONSTANT_SOUND_FACTOR
                    * SEA_LEVEL_TEMPERATURE_K.sqrt()
            }
            AtmosphereModel::Icao => ICAO_SOUND_FACTOR * self.temperature(altitude_m).sqrt(),
            AtmosphereModel::Isa => (ISA_GAMMA * R_AIR * self.temperature(altitude_m)).sqrt(),
            AtmosphereModel::UsStandard => {
                FEET_TO_METRES
                    * US_SOUND_FACTOR_FPS
                    * (self.temperature(altitude_m) * KELVIN_TO_RANKINE).sqrt()
            }
        }
    }

    /// Air density in kg/m³
    pub fn density(&self, altitude_m: f64) -> f64 {
        let h = altitude_m;
        let base = match self.model {
            AtmosphereModel::Constant => SEA_LEVEL_DENSITY,
            AtmosphereModel::Icao => {
                SEA_LEVEL_DENSITY * (-(ICAO_DENSITY_A + ICAO_DENSITY_B * h) * h).exp()
            }
            AtmosphereModel::Isa => {
                let t = self.temperature(h);
                let p = SEA_LEVEL_PRESSURE_PA * (t / SEA_LEVEL_TEMPERATURE_K).powf(ISA_PRESSURE_EXPONENT);
                p / (R_AIR * t)
            }
            AtmosphereModel::UsStandard => SEA_LEVEL_DENSITY * (-US_DENSITY_DECAY * h).exp(),
        };
        self.density_factor(h) * base
    }

    /// Mach number of a speed at the given altitude
    pub fn mach(&self, speed_mps: f64, altitude_m: f64) -> f64 {
        speed_mps / self.speed_of_sound(altitude_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icao_sea_level() {
        let atmo = Atmosphere::new(AtmosphereModel::Icao);
        assert!((atmo.temperature(0.0) - 288.15).abs() < 1e-12);
        assert!((atmo.density(0.0) - 1.225).abs() < 1e-12);
        assert!((atmo.speed_of_sound(0.0) - 340.29).abs() < 0.01);
    }

    #[test]
    fn test_isa_sea_level_matches_reference_density() {
        let atmo = Atmosphere::new(AtmosphereModel::Isa);
        assert!((atmo.density(0.0) - 1.225).abs() < 1e-3);
        // 11 km: 216.65 K
        assert!((atmo.temperature(11_000.0) - 216.65).abs() < 1e-9);
    }

    #[test]
    fn test_us_standard_speed_of_sound() {
        let atmo = Atmosphere::new(AtmosphereModel::UsStandard);
        assert!((atmo.speed_of_sound(0.0) - 341.46).abs() < 0.05);
        assert!(atmo.density(5000.0) < atmo.density(0.0));
    }

    #[test]
    fn test_constant_atmosphere_is_flat() {
        let atmo = Atmosphere::new(AtmosphereModel::Constant);
        assert_eq!(atmo.density(0.0), atmo.density(12_000.0));
        assert_eq!(atmo.speed_of_sound(-100.0), atmo.speed_of_sound(9_000.0));
    }

    #[test]
    fn test_density_decreases_with_altitude() {
        for model in [AtmosphereModel::Icao, AtmosphereModel::Isa, AtmosphereModel::UsStandard] {
            let atmo = Atmosphere::new(model);
            let mut previous = atmo.density(0.0);
            for h in (1..=10).map(|i| i as f64 * 1000.0) {
                let rho = atmo.density(h);
                assert!(rho < previous, "{model:?} density not decreasing at {h} m");
                previous = rho;
            }
        }
    }

    #[test]
    fn test_weightings() {
        let atmo = Atmosphere::new(AtmosphereModel::Icao)
            .with_density_weight(Weighting::Constant(1.1))
            .with_temperature_weight(Weighting::Constant(0.9));
        assert!((atmo.density(0.0) - 1.1 * 1.225).abs() < 1e-12);
        assert!((atmo.temperature(0.0) - 0.9 * 288.15).abs() < 1e-9);
    }

    #[test]
    fn test_profile_weighting_interpolates_and_clamps() {
        let w = Weighting::profile(vec![
            WeightPoint { altitude_m: 1000.0, weight: 1.2 },
            WeightPoint { altitude_m: 0.0, weight: 1.0 },
        ]);
        assert!((w.weight(500.0) - 1.1).abs() < 1e-12);
        assert_eq!(w.weight(-50.0), 1.0);
        assert_eq!(w.weight(5000.0), 1.2);
    }

    #[test]
    fn test_extreme_altitudes_do_not_panic() {
        for model in [
            AtmosphereModel::Constant,
            AtmosphereModel::Icao,
            AtmosphereModel::Isa,
            AtmosphereModel::UsStandard,
        ] {
            let atmo = Atmosphere::new(model);
            let _ = atmo.density(1.0e6);
            let _ = atmo.speed_of_sound(-5.0e4);
        }
    }
}
