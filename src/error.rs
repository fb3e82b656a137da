use thiserror::Error;

use crate::flight::FireSolution;

/// Errors raised while assembling solver inputs
#[derive(Debug, Error)]
pub enum BallisticsError {
    #[error("invalid coefficient table: {0}")]
    InvalidTable(String),

    #[error("invalid adjustment factor: {0}")]
    InvalidAdjustment(String),

    #[error("invalid projectile: {0}")]
    InvalidProjectile(String),

    #[error("coefficient table `{0}` is required by the selected physics model")]
    MissingCoefficient(&'static str),

    #[error("invalid solver input: {0}")]
    InvalidInput(String),

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal outcomes of a reverse solve that did not produce a valid solution.
///
/// Every variant carries the last solution tried (success flag cleared), so
/// callers can inspect or reuse the angle when retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FireError {
    #[error("target range {target_range:.1} m exceeds the maximum range {max_range:.1} m")]
    OutOfRange {
        solution: FireSolution,
        max_range: f64,
        target_range: f64,
    },

    #[error("yaw of repose reached unity near {:.2} mils", .0.elevation_mils)]
    YawInstability(FireSolution),

    #[error("no convergence, last elevation {:.2} mils", .0.elevation_mils)]
    ConvergenceFailure(FireSolution),

    #[error("quasi-convergence at {:.2} mils (range and height within 1%)", .0.elevation_mils)]
    QuasiConvergence(FireSolution),

    #[error("solution at {:.2} mils lies on the other side of the apex", .0.elevation_mils)]
    TrajectoryKindMismatch(FireSolution),

    #[error("reverse solve cancelled at {:.2} mils", .0.elevation_mils)]
    Cancelled(FireSolution),
}

impl FireError {
    /// Solution payload attached to the failure
    pub fn solution(&self) -> &FireSolution {
        match self {
            FireError::OutOfRange { solution, .. } => solution,
            FireError::YawInstability(s)
            | FireError::ConvergenceFailure(s)
            | FireError::QuasiConvergence(s)
            | FireError::TrajectoryKindMismatch(s)
            | FireError::Cancelled(s) => s,
        }
    }
}
