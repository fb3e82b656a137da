//! # Artillery Ballistics
//!
//! Trajectory integration for spin-stabilised artillery shells and the
//! reverse fire-solution solver built on it.

// Re-export the main types and functions
pub use adjustment::{AdjustmentFactor, AdjustmentFactors, AdjustmentSample, FactorUsage};
pub use angle_calculations::{angular_step_ladder, ProgressFn, ReverseSettings, ReverseSolver};
pub use atmosphere::{Atmosphere, AtmosphereModel, WeightPoint, Weighting};
pub use coefficients::{AerodynamicCoefficients, CoefficientSamples, CoefficientTable};
pub use config::BallisticsConfig;
pub use environment::{Environment, EnvironmentSettings};
pub use error::{BallisticsError, FireError};
pub use fire_table::{FireTableEntry, FireTableRequest, FireTableRow};
pub use flight::{Branch, FireSolution, FlightState, ReverseRequest, Shot, TrajectoryKind};
pub use projectile::{ForceModel, ProjectileSpec};
pub use trajectory_sampling::{
    impact_summary, resample_at_ranges, sample_interval, ImpactSummary, RangeSample, TrajectoryFlag,
};
pub use trajectory_solver::{PhysicsModel, TrajectoryIntegrator};
pub use wind::{Wind, WindLayer};

// Module declarations
mod adjustment;
mod angle_calculations;
mod atmosphere;
mod coefficients;
mod config;
pub mod constants;
mod derivatives;
mod environment;
mod error;
pub mod fire_table;
mod flight;
mod projectile;
mod trajectory_sampling;
mod trajectory_solver;
mod wind;
