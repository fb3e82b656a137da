/// Physical constants and solver thresholds used in artillery calculations

use std::f64::consts::PI;

/// Standard gravitational acceleration in m/s²
pub const G_ACCEL_MPS2: f64 = 9.80665;

/// Mean Earth radius used for the sphericity and gravity-gradient corrections (m)
pub const EARTH_RADIUS_M: f64 = 6_356_766.0;

/// Angular velocity of the Earth (rad/s)
pub const EARTH_ROTATION_RAD_S: f64 = 0.00007292;

/// Latitude gravity correction amplitude: g·(1 − k·cos 2φ)
pub const LATITUDE_GRAVITY_FACTOR: f64 = 0.0026;

/// Conversion factor: artillery mils to radians (6400 mils per turn)
pub const MIL_TO_RAD: f64 = PI / 3200.0;

/// Conversion factor: radians to artillery mils
pub const RAD_TO_MIL: f64 = 3200.0 / PI;

/// Conversion factor: degrees to radians
pub const DEG_TO_RAD: f64 = PI / 180.0;

// Atmosphere reference values
/// Specific gas constant of dry air (J/(kg·K))
pub const R_AIR: f64 = 287.04;

/// Standard air density at sea level (kg/m³)
pub const SEA_LEVEL_DENSITY: f64 = 1.225;

/// Standard temperature at sea level (K)
pub const SEA_LEVEL_TEMPERATURE_K: f64 = 288.15;

/// Standard pressure at sea level (Pa)
pub const SEA_LEVEL_PRESSURE_PA: f64 = 101_325.0;

// Integrator
/// Remaining height (m) below which a run ends immediately on its stopping branch
pub const TERMINAL_HEIGHT_TOLERANCE_M: f64 = 0.05;

/// Vertical speed (m/s) under which an ascending-branch run is considered at its apex
pub const APEX_VERTICAL_SPEED_MPS: f64 = 0.1;

/// Simulated time covered by one recorded sample when the step is small (s)
pub const SAMPLE_PERIOD_S: f64 = 0.1;

/// Yaw-of-repose magnitude above which the algebraic approximation is invalid
pub const MAX_YAW_OF_REPOSE: f64 = 1.0;

/// Default rifling twist in calibers per turn
pub const DEFAULT_TWIST_CALIBERS: f64 = 18.0;

/// Yaw-drag factor applied whenever adjustment factors are in use
pub const YAW_DRAG_FACTOR: f64 = 1.2;

/// Mach number at which the linear-drag coefficient is read
pub const LINEAR_DRAG_REFERENCE_MACH: f64 = 1.0;

// Reverse solver heuristics
/// Iterations allowed before the integration step is halved
pub const MAX_ITERATIONS: usize = 20;

/// Smallest integration step (s) before the search gives up refining
pub const MIN_INTEGRATION_STEP_S: f64 = 0.001;

/// Angular offset used to estimate the range sensitivity (mils)
pub const SENSITIVITY_VARIATION_MILS: f64 = 1.0;

/// Correction magnitude above which a randomized jump replaces Newton's step (mils)
pub const RANDOM_JUMP_TRIGGER_MILS: f64 = 100.0;

/// Inclusive bounds of the randomized jump (mils)
pub const RANDOM_JUMP_MIN_MILS: u32 = 51;
pub const RANDOM_JUMP_MAX_MILS: u32 = 100;

/// Ratio between consecutive corrections above which an opposite-sign pair counts as oscillation
pub const OSCILLATION_RATIO: f64 = 0.9;

/// Angle wraps allowed during the ascending-branch height correction
pub const MAX_INVERSIONS: usize = 3;

/// Angle a negative elevation is reset to in the main search (mils)
pub const NEGATIVE_ANGLE_RESET_MILS: f64 = 50.0;

/// Angle separating plunging from high-angle fire (mils)
pub const APEX_ANGLE_MILS: f64 = 800.0;

/// Starting angle of the maximum-range probe (mils)
pub const LIMIT_PROBE_START_MILS: f64 = 790.0;

/// Coarse and fine angle increments of the maximum-range probe (mils)
pub const LIMIT_PROBE_COARSE_STEP_MILS: f64 = 10.0;
pub const LIMIT_PROBE_FINE_STEP_MILS: f64 = 1.0;

/// Range loss tolerated between coarse probe angles before the peak is assumed passed (m)
pub const LIMIT_PROBE_RANGE_SLACK_M: f64 = 2.5;

/// Apex detection of the range-correction loop: height error (m), vertical speed (m/s)
/// and the minimum height difference for which it applies (m)
pub const APEX_HEIGHT_WINDOW_M: f64 = 20.0;
pub const APEX_VERTICAL_SPEED_WINDOW_MPS: f64 = 5.0;
pub const APEX_MIN_HEIGHT_DIFFERENCE_M: f64 = 50.0;

/// Vertical speed under which a descending solution is treated as ending at its vertex (m/s)
pub const VERTEX_VERTICAL_SPEED_MPS: f64 = 1.0;

/// Angles the height-correction loop restarts from after leaving [0, 1600] mils
pub const LOW_INVERSION_RESET_MILS: f64 = 100.0;
pub const HIGH_INVERSION_RESET_MILS: f64 = 1000.0;

/// Vertical fire, upper bound of the height correction and of the range probe (mils)
pub const VERTICAL_FIRE_MILS: f64 = 1600.0;

/// Relative band of the residuals accepted as quasi-convergence
pub const QUASI_CONVERGENCE_BAND: f64 = 0.01;

/// Convert an angle in mils to radians
#[inline]
pub fn mils_to_rad(mils: f64) -> f64 {
    mils * MIL_TO_RAD
}

/// Convert an angle in radians to mils
#[inline]
pub fn rad_to_mils(rad: f64) -> f64 {
    rad * RAD_TO_MIL
}
