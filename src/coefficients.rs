//! Aerodynamic coefficient tables indexed by Mach number.

use serde::{Deserialize, Serialize};

use crate::constants::LINEAR_DRAG_REFERENCE_MACH;
use crate::error::BallisticsError;

/// Raw (Mach, coefficient) samples as they arrive from a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSamples {
    pub mach: Vec<f64>,
    pub values: Vec<f64>,
}

/// Piecewise-linear coefficient table over Mach number.
///
/// Samples are strictly increasing in Mach and the table holds at least one.
/// Below the first sample the first value is returned unchanged; above the
/// last sample the slope of the last pair is extended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoefficientSamples", into = "CoefficientSamples")]
pub struct CoefficientTable {
    mach: Vec<f64>,
    values: Vec<f64>,
}

impl CoefficientTable {
    /// Create a table, validating sample count and ordering
    pub fn new(mach: Vec<f64>, values: Vec<f64>) -> Result<Self, BallisticsError> {
        if mach.is_empty() {
            return Err(BallisticsError::InvalidTable("table has no samples".into()));
        }
        if mach.len() != values.len() {
            return Err(BallisticsError::InvalidTable(format!(
                "{} Mach samples but {} values",
                mach.len(),
                values.len()
            )));
        }
        if let Some(pair) = mach.windows(2).find(|pair| pair[1] <= pair[0]) {
            return Err(BallisticsError::InvalidTable(format!(
                "Mach samples not strictly increasing at {} -> {}",
                pair[0], pair[1]
            )));
        }
        if mach.iter().chain(values.iter()).any(|v| !v.is_finite()) {
            return Err(BallisticsError::InvalidTable("non-finite sample".into()));
        }
        Ok(Self { mach, values })
    }

    /// Build a table from (Mach, value) pairs
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, BallisticsError> {
        let (mach, values) = pairs.iter().copied().unzip();
        Self::new(mach, values)
    }

    /// Table holding one value at every Mach number
    pub fn constant(value: f64) -> Self {
        Self {
            mach: vec![0.0],
            values: vec![value],
        }
    }

    /// Coefficient at the given Mach number
    pub fn value(&self, mach: f64) -> f64 {
        let n = self.mach.len();
        // First sample at or above the query
        let i = self.mach.iter().position(|&m| mach <= m).unwrap_or(n);

        if i == 0 {
            return self.values[0];
        }
        if i == n {
            if n == 1 {
                return self.values[0];
            }
            return self.segment(n - 2, mach);
        }
        self.segment(i - 1, mach)
    }

    /// Line through samples `lo` and `lo + 1`, evaluated at `mach`
    fn segment(&self, lo: usize, mach: f64) -> f64 {
        let (x0, x1) = (self.mach[lo], self.mach[lo + 1]);
        let (y0, y1) = (self.values[lo], self.values[lo + 1]);
        (y1 - y0) / (x1 - x0) * (mach - x0) + y0
    }
}

impl TryFrom<CoefficientSamples> for CoefficientTable {
    type Error = BallisticsError;

    fn try_from(samples: CoefficientSamples) -> Result<Self, Self::Error> {
        Self::new(samples.mach, samples.values)
    }
}

impl From<CoefficientTable> for CoefficientSamples {
    fn from(table: CoefficientTable) -> Self {
        CoefficientSamples {
            mach: table.mach,
            values: table.values,
        }
    }
}

/// Every coefficient table a projectile may carry.
///
/// Only `drag` is needed by every drag model. The modified point-mass models
/// also need `drag_squared`, `lift`, `magnus_force`, `overturning_moment` and
/// `spin_damping`. With the normal/axial force model `drag` holds the axial
/// force coefficient and `lift` the normal force coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AerodynamicCoefficients {
    pub drag: CoefficientTable,
    #[serde(default)]
    pub linear_drag: Option<CoefficientTable>,
    #[serde(default)]
    pub drag_squared: Option<CoefficientTable>,
    #[serde(default)]
    pub lift: Option<CoefficientTable>,
    #[serde(default)]
    pub magnus_force: Option<CoefficientTable>,
    #[serde(default)]
    pub overturning_moment: Option<CoefficientTable>,
    #[serde(default)]
    pub spin_damping: Option<CoefficientTable>,
}

impl AerodynamicCoefficients {
    /// Coefficient set with only a drag table
    pub fn drag_only(drag: CoefficientTable) -> Self {
        Self {
            drag,
            linear_drag: None,
            drag_squared: None,
            lift: None,
            magnus_force: None,
            overturning_moment: None,
            spin_damping: None,
        }
    }

    /// Constant drag coefficient of the linear-drag model
    pub fn linear_drag_coefficient(&self) -> f64 {
        self.linear_drag
            .as_ref()
            .unwrap_or(&self.drag)
            .value(LINEAR_DRAG_REFERENCE_MACH)
    }
}

/// Tables required by the modified point-mass models, all present
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct YawCoefficients {
    pub drag: CoefficientTable,
    pub drag_squared: CoefficientTable,
    pub lift: CoefficientTable,
    pub magnus_force: CoefficientTable,
    pub overturning_moment: CoefficientTable,
    pub spin_damping: CoefficientTable,
}

impl YawCoefficients {
    pub(crate) fn from_set(set: &AerodynamicCoefficients) -> Result<Self, BallisticsError> {
        fn required(
            table: &Option<CoefficientTable>,
            name: &'static str,
        ) -> Result<CoefficientTable, BallisticsError> {
            table.clone().ok_or(BallisticsError::MissingCoefficient(name))
        }
        Ok(Self {
            drag: set.drag.clone(),
            drag_squared: required(&set.drag_squared, "drag_squared")?,
            lift: required(&set.lift, "lift")?,
            magnus_force: required(&set.magnus_force, "magnus_force")?,
            overturning_moment: required(&set.overturning_moment, "overturning_moment")?,
            spin_damping: required(&set.spin_damping, "spin_damping")?,
        })
    }
}
