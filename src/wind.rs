use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::mils_to_rad;

/// Wind below a given ceiling (m/s).
///
/// Longitudinal wind is positive along the line of fire (a tailwind),
/// transverse wind positive towards +z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindLayer {
    pub ceiling_m: f64,
    pub longitudinal: f64,
    pub transverse: f64,
}

/// Wind model consumed by the integrator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wind {
    #[default]
    Calm,
    /// Same wind at every altitude
    Constant { longitudinal: f64, transverse: f64 },
    /// Piecewise-constant layers sorted by ceiling; calm above the top layer
    Layered(Vec<WindLayer>),
}

impl Wind {
    pub fn constant(longitudinal: f64, transverse: f64) -> Self {
        Wind::Constant {
            longitudinal,
            transverse,
        }
    }

    /// Constant wind of `speed_mps` blowing from `from_mils`, measured from the line of fire
    pub fn from_direction(speed_mps: f64, from_mils: f64) -> Self {
        let angle = mils_to_rad(from_mils);
        // Wind blows towards the opposite direction
        Wind::constant(-speed_mps * angle.cos(), -speed_mps * angle.sin())
    }

    pub fn layered(mut layers: Vec<WindLayer>) -> Self {
        layers.sort_by(|a, b| a.ceiling_m.total_cmp(&b.ceiling_m));
        Wind::Layered(layers)
    }

    /// Wind vector at the given altitude; the vertical component is always zero
    pub fn vector_at(&self, altitude_m: f64) -> Vector3<f64> {
        match self {
            Wind::Calm => Vector3::zeros(),
            Wind::Constant {
                longitudinal,
                transverse,
            } => Vector3::new(*longitudinal, 0.0, *transverse),
            Wind::Layered(layers) => {
                if altitude_m.is_nan() {
                    return Vector3::zeros();
                }
                layers
                    .iter()
                    .find(|layer| altitude_m < layer.ceiling_m)
                    .map_or_else(Vector3::zeros, |layer| {
                        Vector3::new(layer.longitudinal, 0.0, layer.transverse)
                    })
            }
        }
    }

    pub fn is_calm(&self) -> bool {
        match self {
            Wind::Calm => true,
            Wind::Constant {
                longitudinal,
                transverse,
            } => *longitudinal == 0.0 && *transverse == 0.0,
            Wind::Layered(layers) => layers
                .iter()
                .all(|l| l.longitudinal == 0.0 && l.transverse == 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calm() {
        assert_eq!(Wind::Calm.vector_at(500.0), Vector3::zeros());
        assert!(Wind::constant(0.0, 0.0).is_calm());
    }

    #[test]
    fn test_constant_wind_ignores_altitude() {
        let wind = Wind::constant(5.0, -2.0);
        assert_eq!(wind.vector_at(0.0), Vector3::new(5.0, 0.0, -2.0));
        assert_eq!(wind.vector_at(8000.0), Vector3::new(5.0, 0.0, -2.0));
    }

    #[test]
    fn test_headwind_from_direction() {
        // Wind from the target blows against the shell
        let w = Wind::from_direction(10.0, 0.0).vector_at(0.0);
        assert!((w.x + 10.0).abs() < 1e-12);
        assert!(w.z.abs() < 1e-12);

        // From 1600 mils (right of the line of fire) towards -z
        let w = Wind::from_direction(10.0, 1600.0).vector_at(0.0);
        assert!(w.x.abs() < 1e-9);
        assert!((w.z + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_layers() {
        let wind = Wind::layered(vec![
            WindLayer { ceiling_m: 2000.0, longitudinal: 8.0, transverse: 1.0 },
            WindLayer { ceiling_m: 500.0, longitudinal: 3.0, transverse: 0.0 },
        ]);
        assert_eq!(wind.vector_at(100.0).x, 3.0);
        assert_eq!(wind.vector_at(500.0).x, 8.0);
        assert_eq!(wind.vector_at(1999.0).z, 1.0);
        assert_eq!(wind.vector_at(2500.0), Vector3::zeros());
        assert_eq!(wind.vector_at(f64::NAN), Vector3::zeros());
    }
}
