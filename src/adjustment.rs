//! Empirical adjustment factors.
//!
//! A factor is calibrated at a handful of muzzle velocities. At each of them
//! a cubic polynomial in launch angle gives the factor; between velocities
//! the value is blended from an implicit anchor of 1.0 at zero velocity:
//!
//! - one sample: straight line from (0, 1)
//! - two samples: quadratic through (0, 1) and both samples
//! - three or more: natural cubic spline through (0, 1) and every sample
//!
//! Above the last calibrated velocity the factor falls back to 1.0.

use serde::{Deserialize, Serialize};

use crate::constants::{mils_to_rad, YAW_DRAG_FACTOR};
use crate::error::BallisticsError;

/// Slack used when comparing a velocity against the last calibrated one
const VELOCITY_EPSILON: f64 = 1e-6;

/// Calibration at one muzzle velocity: `c0 + c1·θ + c2·θ² + c3·θ³`, θ in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentSample {
    pub velocity: f64,
    pub coefficients: [f64; 4],
}

impl AdjustmentSample {
    pub fn new(velocity: f64, coefficients: [f64; 4]) -> Self {
        Self {
            velocity,
            coefficients,
        }
    }

    /// Polynomial value at the given angle
    pub fn polynomial(&self, angle_rad: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * angle_rad + c)
    }
}

/// One cubic piece `a + b·x + c·x² + d·x³`, x measured from the piece's left knot
#[derive(Debug, Clone, Copy, PartialEq)]
struct SplinePiece {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl SplinePiece {
    fn eval(&self, x: f64) -> f64 {
        ((self.d * x + self.c) * x + self.b) * x + self.a
    }
}

/// Natural cubic spline through `(xs[i], ys[i])` (Burden & Faires, algorithm 3.4).
///
/// Knots must be strictly increasing and at least two.
fn natural_cubic_spline(xs: &[f64], ys: &[f64]) -> Vec<SplinePiece> {
    let n = xs.len() - 1;
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    let mut alpha = vec![0.0; n];
    for i in 1..n {
        alpha[i] = 3.0 * (ys[i + 1] - ys[i]) / h[i] - 3.0 * (ys[i] - ys[i - 1]) / h[i - 1];
    }

    let mut l = vec![1.0; n + 1];
    let mut mu = vec![0.0; n + 1];
    let mut z = vec![0.0; n + 1];
    for i in 1..n {
        l[i] = 2.0 * (xs[i + 1] - xs[i - 1]) - h[i - 1] * mu[i - 1];
        mu[i] = h[i] / l[i];
        z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
    }

    let mut c = vec![0.0; n + 1];
    let mut pieces = vec![
        SplinePiece {
            a: 0.0,
            b: 0.0,
            c: 0.0,
            d: 0.0
        };
        n
    ];
    for j in (0..n).rev() {
        c[j] = z[j] - mu[j] * c[j + 1];
        pieces[j] = SplinePiece {
            a: ys[j],
            b: (ys[j + 1] - ys[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0,
            c: c[j],
            d: (c[j + 1] - c[j]) / (3.0 * h[j]),
        };
    }
    pieces
}

/// Adjustment factor calibrated over muzzle velocity.
///
/// `evaluate` stores its result; the integrator reads it back with `value`
/// for the rest of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AdjustmentSample>", into = "Vec<AdjustmentSample>")]
pub struct AdjustmentFactor {
    samples: Vec<AdjustmentSample>,
    value: f64,
}

impl Default for AdjustmentFactor {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            value: 1.0,
        }
    }
}

impl AdjustmentFactor {
    /// Build a factor from calibration samples ordered by increasing velocity
    pub fn new(samples: Vec<AdjustmentSample>) -> Result<Self, BallisticsError> {
        if let Some(s) = samples
            .iter()
            .find(|s| !(s.velocity > 0.0) || s.coefficients.iter().any(|c| !c.is_finite()))
        {
            return Err(BallisticsError::InvalidAdjustment(format!(
                "sample at {} m/s is not usable",
                s.velocity
            )));
        }
        if samples.windows(2).any(|w| w[1].velocity <= w[0].velocity) {
            return Err(BallisticsError::InvalidAdjustment(
                "velocities must be strictly increasing".into(),
            ));
        }
        Ok(Self {
            samples,
            value: 1.0,
        })
    }

    /// Factor holding a fixed value with no calibration
    pub fn fixed(value: f64) -> Self {
        Self {
            samples: Vec::new(),
            value,
        }
    }

    pub fn samples(&self) -> &[AdjustmentSample] {
        &self.samples
    }

    pub fn is_calibrated(&self) -> bool {
        !self.samples.is_empty()
    }

    /// Last evaluated (or assigned) value
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Evaluate the factor and cache the result.
    ///
    /// Without samples the cache is left untouched and 1.0 is returned.
    pub fn evaluate(&mut self, angle_rad: f64, velocity: f64) -> f64 {
        let last = match self.samples.last() {
            Some(last) => *last,
            None => return 1.0,
        };
        let result = if velocity >= last.velocity + VELOCITY_EPSILON {
            1.0
        } else {
            self.interpolate(angle_rad, velocity, &last)
        };
        self.value = result;
        result
    }

    fn interpolate(&self, angle_rad: f64, v: f64, last: &AdjustmentSample) -> f64 {
        match self.samples.as_slice() {
            [s1] => {
                let y1 = s1.polynomial(angle_rad);
                (y1 - 1.0) / s1.velocity * v + 1.0
            }
            [s1, s2] => {
                // Lagrange through (0, 1), (x1, y1), (x2, y2)
                let (x1, x2) = (s1.velocity, s2.velocity);
                let (y1, y2) = (s1.polynomial(angle_rad), s2.polynomial(angle_rad));
                (v - x1) * (v - x2) / (x1 * x2)
                    + y1 * (v * (v - x2)) / (x1 * (x1 - x2))
                    + y2 * (v * (v - x1)) / (x2 * (x2 - x1))
            }
            samples => {
                if v + VELOCITY_EPSILON > last.velocity {
                    return last.polynomial(angle_rad);
                }
                let mut xs = Vec::with_capacity(samples.len() + 1);
                let mut ys = Vec::with_capacity(samples.len() + 1);
                xs.push(0.0);
                ys.push(1.0);
                for s in samples {
                    xs.push(s.velocity);
                    ys.push(s.polynomial(angle_rad));
                }
                let pieces = natural_cubic_spline(&xs, &ys);
                let i = samples
                    .iter()
                    .position(|s| v <= s.velocity)
                    .unwrap_or(samples.len() - 1);
                let x = if i == 0 { v } else { v - samples[i - 1].velocity };
                pieces[i].eval(x)
            }
        }
    }
}

impl TryFrom<Vec<AdjustmentSample>> for AdjustmentFactor {
    type Error = BallisticsError;

    fn try_from(samples: Vec<AdjustmentSample>) -> Result<Self, Self::Error> {
        Self::new(samples)
    }
}

impl From<AdjustmentFactor> for Vec<AdjustmentSample> {
    fn from(factor: AdjustmentFactor) -> Self {
        factor.samples
    }
}

/// How the adjustment factors take part in a modified point-mass run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorUsage {
    /// Every factor is 1
    #[default]
    Disabled,
    /// Shape and lift keep their current values; yaw drag is applied
    Fixed,
    /// Shape and lift are evaluated for the launch angle and velocity
    Calibrated,
}

/// Shape, lift and yaw-drag factors of one projectile
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentFactors {
    pub shape: AdjustmentFactor,
    pub lift: AdjustmentFactor,
    pub yaw_drag: AdjustmentFactor,
    pub usage: FactorUsage,
}

impl AdjustmentFactors {
    /// Set the factor values for a run launched at `angle_mils` with `muzzle_velocity`
    pub fn prepare(&mut self, angle_mils: f64, muzzle_velocity: f64) {
        match self.usage {
            FactorUsage::Disabled => {
                self.shape.set_value(1.0);
                self.lift.set_value(1.0);
                self.yaw_drag.set_value(1.0);
            }
            FactorUsage::Fixed => {
                self.yaw_drag.set_value(YAW_DRAG_FACTOR);
            }
            FactorUsage::Calibrated => {
                if self.shape.is_calibrated() {
                    let angle = mils_to_rad(angle_mils);
                    self.lift.evaluate(angle, muzzle_velocity);
                    self.shape.evaluate(angle, muzzle_velocity);
                } else {
                    self.shape.set_value(1.0);
                    self.lift.set_value(1.0);
                }
                self.yaw_drag.set_value(YAW_DRAG_FACTOR);
            }
        }
    }

    pub fn shape(&self) -> f64 {
        self.shape.value()
    }

    pub fn lift(&self) -> f64 {
        self.lift.value()
    }

    pub fn yaw_drag(&self) -> f64 {
        self.yaw_drag.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(velocity: f64, value: f64) -> AdjustmentSample {
        AdjustmentSample::new(velocity, [value, 0.0, 0.0, 0.0])
    }

    #[test]
    fn test_polynomial_in_angle() {
        let s = AdjustmentSample::new(300.0, [1.0, 0.5, 0.25, 0.125]);
        assert!((s.polynomial(2.0) - (1.0 + 1.0 + 1.0 + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_uncalibrated_factor_is_unity() {
        let mut f = AdjustmentFactor::default();
        assert_eq!(f.evaluate(0.5, 300.0), 1.0);
        assert_eq!(f.value(), 1.0);
    }

    #[test]
    fn test_above_last_velocity_is_unity() {
        let mut f = AdjustmentFactor::new(vec![flat(200.0, 1.1), flat(400.0, 1.3)]).unwrap();
        assert_eq!(f.evaluate(0.5, 401.0), 1.0);
        assert_eq!(f.value(), 1.0);
    }

    #[test]
    fn test_single_sample_is_linear_from_unity() {
        let mut f = AdjustmentFactor::new(vec![flat(400.0, 1.2)]).unwrap();
        assert!((f.evaluate(0.3, 200.0) - 1.1).abs() < 1e-12);
        assert!((f.evaluate(0.3, 400.0) - 1.2).abs() < 1e-12);
        assert!((f.value() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_two_samples_pass_through_knots() {
        let mut f = AdjustmentFactor::new(vec![flat(200.0, 1.1), flat(400.0, 0.9)]).unwrap();
        assert!((f.evaluate(0.0, 0.0) - 1.0).abs() < 1e-12);
        assert!((f.evaluate(0.0, 200.0) - 1.1).abs() < 1e-12);
        assert!((f.evaluate(0.0, 400.0) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_spline_passes_through_knots() {
        let mut f = AdjustmentFactor::new(vec![
            flat(200.0, 1.05),
            flat(400.0, 1.15),
            flat(600.0, 0.95),
            flat(800.0, 1.0),
        ])
        .unwrap();
        assert!((f.evaluate(0.2, 200.0) - 1.05).abs() < 1e-9);
        assert!((f.evaluate(0.2, 400.0) - 1.15).abs() < 1e-9);
        assert!((f.evaluate(0.2, 600.0) - 0.95).abs() < 1e-9);
        // at the last knot the polynomial is returned directly
        assert_eq!(f.evaluate(0.2, 800.0), 1.0);
        let mid = f.evaluate(0.2, 300.0);
        assert!(mid > 1.0 && mid < 1.3, "mid = {mid}");
    }

    #[test]
    fn test_spline_reproduces_straight_line() {
        // Knots on a line through (0, 1): the natural spline is that line
        let mut f = AdjustmentFactor::new(vec![
            flat(100.0, 1.1),
            flat(200.0, 1.2),
            flat(300.0, 1.3),
        ])
        .unwrap();
        assert!((f.evaluate(0.0, 50.0) - 1.05).abs() < 1e-9);
        assert!((f.evaluate(0.0, 250.0) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_unordered_samples() {
        assert!(AdjustmentFactor::new(vec![flat(300.0, 1.0), flat(200.0, 1.0)]).is_err());
        assert!(AdjustmentFactor::new(vec![flat(0.0, 1.0)]).is_err());
    }

    #[test]
    fn test_usage_modes() {
        let mut factors = AdjustmentFactors {
            shape: AdjustmentFactor::new(vec![flat(500.0, 1.4)]).unwrap(),
            lift: AdjustmentFactor::new(vec![flat(500.0, 0.8)]).unwrap(),
            yaw_drag: AdjustmentFactor::default(),
            usage: FactorUsage::Calibrated,
        };
        factors.prepare(400.0, 250.0);
        assert!((factors.shape() - 1.2).abs() < 1e-12);
        assert!((factors.lift() - 0.9).abs() < 1e-12);
        assert_eq!(factors.yaw_drag(), YAW_DRAG_FACTOR);

        factors.usage = FactorUsage::Fixed;
        factors.prepare(400.0, 900.0);
        assert!((factors.shape() - 1.2).abs() < 1e-12);

        factors.usage = FactorUsage::Disabled;
        factors.prepare(400.0, 250.0);
        assert_eq!(factors.shape(), 1.0);
        assert_eq!(factors.lift(), 1.0);
        assert_eq!(factors.yaw_drag(), 1.0);
    }
}
