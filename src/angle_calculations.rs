//! Reverse problem: find the elevation that puts the shell at a given range and height.
//!
//! The search is a secant iteration on range with a one-mil sensitivity probe.
//! Oversized corrections are replaced by a random jump, corrections near the
//! apex go through a magnitude ladder, and alternating corrections of similar
//! size are halved. When the range converges but the height does not, the
//! ascending branch gets a nested height/range correction.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::{
    rad_to_mils, APEX_ANGLE_MILS, APEX_HEIGHT_WINDOW_M, APEX_MIN_HEIGHT_DIFFERENCE_M,
    APEX_VERTICAL_SPEED_WINDOW_MPS, HIGH_INVERSION_RESET_MILS, LOW_INVERSION_RESET_MILS,
    MAX_INVERSIONS, MAX_ITERATIONS, MAX_YAW_OF_REPOSE, MIN_INTEGRATION_STEP_S,
    NEGATIVE_ANGLE_RESET_MILS, OSCILLATION_RATIO, QUASI_CONVERGENCE_BAND,
    RANDOM_JUMP_MAX_MILS, RANDOM_JUMP_MIN_MILS, RANDOM_JUMP_TRIGGER_MILS,
    SENSITIVITY_VARIATION_MILS, VERTEX_VERTICAL_SPEED_MPS, VERTICAL_FIRE_MILS,
};
use crate::error::FireError;
use crate::flight::{Branch, FireSolution, FlightState, ReverseRequest, TrajectoryKind};
use crate::trajectory_solver::{PhysicsModel, TrajectoryIntegrator};

/// Progress observer fed with the impact state of every main iteration
pub type ProgressFn = Box<dyn FnMut(&FlightState) + Send>;

/// Reverse-solver switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseSettings {
    /// Probe the maximum range before searching
    pub check_limit: bool,
    /// Seed of the random-jump generator, entropy when absent
    pub seed: Option<u64>,
}

impl Default for ReverseSettings {
    fn default() -> Self {
        Self {
            check_limit: true,
            seed: None,
        }
    }
}

/// Clamp an angular correction to the next rung of the 10/1/0.1/0.01 mil ladder.
///
/// Corrections of 0.01 mil or less pass through unchanged.
pub fn angular_step_ladder(delta: f64) -> f64 {
    for rung in [10.0, 1.0, 0.1, 0.01] {
        if delta.abs() > rung {
            return rung.copysign(delta);
        }
    }
    delta
}

/// Ratio of the smaller to the larger of two consecutive corrections
fn correction_ratio(delta: f64, previous: f64) -> f64 {
    if delta.abs() > previous.abs() {
        (previous / delta).abs()
    } else {
        (delta / previous).abs()
    }
}

fn is_near_apex(state: &FlightState, height_difference: f64) -> bool {
    (state.height() - height_difference).abs() < APEX_HEIGHT_WINDOW_M
        && state.velocity.y.abs() < APEX_VERTICAL_SPEED_WINDOW_MPS
        && height_difference > APEX_MIN_HEIGHT_DIFFERENCE_M
}

/// Keep the angle inside (0, 1600] mils, counting each wrap
fn wrap_angle(angle: &mut f64, inversions: &mut usize) {
    if *angle < 0.0 {
        *angle = LOW_INVERSION_RESET_MILS;
        *inversions += 1;
    }
    if *angle > VERTICAL_FIRE_MILS {
        *angle = HIGH_INVERSION_RESET_MILS;
        *inversions += 1;
    }
}

/// Range and height both within 1% of the target
fn is_quasi_converged(state: &FlightState, request: &ReverseRequest) -> bool {
    let range_error = (request.target_range - state.range()) / request.target_range;
    let height_ratio = (state.height() / request.height_difference).abs();
    range_error.abs() < QUASI_CONVERGENCE_BAND
        && height_ratio > 1.0 - QUASI_CONVERGENCE_BAND
        && height_ratio < 1.0 + QUASI_CONVERGENCE_BAND
}

fn convergence_error(solution: FireSolution, state: &FlightState, request: &ReverseRequest) -> FireError {
    if is_quasi_converged(state, request) {
        FireError::QuasiConvergence(solution)
    } else {
        FireError::ConvergenceFailure(solution)
    }
}

/// Secant-based fire-solution solver around one direct integrator
pub struct ReverseSolver {
    integrator: TrajectoryIntegrator,
    settings: ReverseSettings,
    rng: StdRng,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for ReverseSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverseSolver")
            .field("integrator", &self.integrator)
            .field("settings", &self.settings)
            .field("cancellable", &self.cancel.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Clone for ReverseSolver {
    /// Clones share the cancellation flag but not the progress observer
    fn clone(&self) -> Self {
        Self {
            integrator: self.integrator.clone(),
            settings: self.settings,
            rng: self.rng.clone(),
            cancel: self.cancel.clone(),
            progress: None,
        }
    }
}

impl ReverseSolver {
    pub fn new(integrator: TrajectoryIntegrator, settings: ReverseSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            integrator,
            settings,
            rng,
            cancel: None,
            progress: None,
        }
    }

    /// Abort the search between iterations once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn set_progress(&mut self, progress: impl FnMut(&FlightState) + Send + 'static) {
        self.progress = Some(Box::new(progress));
    }

    /// Reseed the random-jump generator
    pub fn reseed(&mut self, seed: u64) {
        self.settings.seed = Some(seed);
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn set_check_limit(&mut self, check_limit: bool) {
        self.settings.check_limit = check_limit;
    }

    pub fn settings(&self) -> &ReverseSettings {
        &self.settings
    }

    pub fn integrator(&self) -> &TrajectoryIntegrator {
        &self.integrator
    }

    pub fn integrator_mut(&mut self) -> &mut TrajectoryIntegrator {
        &mut self.integrator
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn last(&mut self, request: &ReverseRequest, angle: f64, step: f64) -> FlightState {
        self.integrator.solve_direct_last(&request.shot(angle, step))
    }

    /// Find the elevation hitting `request.target_range` at `request.height_difference`.
    pub fn solve_reverse(&mut self, request: &ReverseRequest) -> Result<FireSolution, FireError> {
        if self.integrator.model() == PhysicsModel::Vacuum {
            return self.solve_vacuum(request);
        }

        let range = request.target_range;
        let height = request.height_difference;
        let precision = request.precision;
        let mut step = request.step;
        let mut angle = request.initial_angle_mils;

        if self.settings.check_limit {
            let limit = self.integrator.max_range(request.muzzle_velocity, step);
            let max_range = (limit.range() / 10.0).round() * 10.0;
            if max_range < range {
                warn!("target {range:.1} m beyond maximum range {max_range:.1} m");
                return Err(FireError::OutOfRange {
                    solution: FireSolution::failed(angle, 0.0),
                    max_range,
                    target_range: range,
                });
            }
        }

        let mut delta = 0.0;
        let mut counter = 0;
        let mut e1 = FlightState::default();
        let mut cancelled = false;

        while (e1.range() - range).abs() > precision {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }

            angle += delta;
            if angle < 0.0 {
                angle = NEGATIVE_ANGLE_RESET_MILS;
            }

            e1 = self.last(request, angle, step);
            let e2 = self.last(request, angle + SENSITIVITY_VARIATION_MILS, step);
            if e2.max_yaw > MAX_YAW_OF_REPOSE {
                warn!("yaw of repose above unity at {angle:.2} mils");
                return Err(FireError::YawInstability(FireSolution::failed(angle, 0.0)));
            }

            let mut variation = SENSITIVITY_VARIATION_MILS;
            let metres_per_mil = (e2.range() - e1.range()).abs() / variation;
            let error = range - e1.range();
            let previous = delta;
            // Range grows with angle below the apex and shrinks above it
            delta = (error / metres_per_mil).abs().copysign(error);
            if e2.range() <= e1.range() {
                delta = -delta;
            }

            if !delta.is_finite() || delta.abs() > RANDOM_JUMP_TRIGGER_MILS {
                let jump = self.rng.gen_range(RANDOM_JUMP_MIN_MILS..=RANDOM_JUMP_MAX_MILS) as f64;
                let sign = if delta.is_nan() { 1.0 } else { delta.signum() };
                debug!("correction {delta:.2} mils replaced by a {jump:.0} mil jump");
                delta = jump * sign;
            } else {
                if is_near_apex(&e1, height) {
                    variation = SENSITIVITY_VARIATION_MILS / 10.0;
                    delta = angular_step_ladder(delta);
                }
                if correction_ratio(delta, previous) > OSCILLATION_RATIO && delta / previous < 0.0 {
                    delta /= 2.0;
                }
            }

            debug!(
                "reverse iteration {counter}: {angle:.3} mils -> x = {:.2} m, y = {:.2} m, next correction {delta:.4} mils",
                e1.range(),
                e1.height()
            );

            // Descending run that ends right at the vertex: nudge the angle on height and stop
            if request.branch == Branch::Descending
                && e1.max_height < height
                && (e1.height() - height).abs() > precision
                && (e1.range() - range).abs() <= precision
                && e1.velocity.y.abs() < VERTEX_VERTICAL_SPEED_MPS
            {
                let e2 = self.last(request, angle + variation, step);
                let metres_per_mil = (e2.height() - e1.height()).abs() / variation;
                angle += (height - e1.height()) / metres_per_mil;
                break;
            }

            if let Some(progress) = self.progress.as_mut() {
                progress(&e1);
            }

            counter += 1;
            if counter > MAX_ITERATIONS {
                step /= 2.0;
                warn!("no convergence after {MAX_ITERATIONS} iterations, halving the step to {step} s");
                if step < MIN_INTEGRATION_STEP_S * 0.99 {
                    angle += delta;
                    break;
                }
                counter = 0;
            }
        }

        let derivation = if e1.range() != 0.0 {
            rad_to_mils((e1.drift() / e1.range()).atan())
        } else {
            0.0
        };
        if cancelled {
            return Err(FireError::Cancelled(FireSolution::failed(angle, derivation)));
        }

        if (height - e1.height()).abs() > precision {
            let corrected = request.branch == Branch::Ascending
                && self.correct_ascending(request, &mut angle, &mut e1, step);
            if !corrected {
                warn!(
                    "height not reached: y = {:.2} m for {height:.2} m at {angle:.2} mils",
                    e1.height()
                );
                return Err(convergence_error(
                    FireSolution::failed(angle, derivation),
                    &e1,
                    request,
                ));
            }
        }

        if e1.max_yaw >= MAX_YAW_OF_REPOSE {
            warn!("yaw of repose reached unity at {angle:.2} mils");
            return Err(FireError::YawInstability(FireSolution::failed(angle, derivation)));
        }
        if counter > MAX_ITERATIONS {
            warn!("reverse solve exhausted its step budget at {angle:.2} mils");
            return Err(convergence_error(
                FireSolution::failed(angle, derivation),
                &e1,
                request,
            ));
        }

        let solution = FireSolution::new(angle, derivation, true);
        let mismatch = match request.kind {
            TrajectoryKind::Plunging => angle > APEX_ANGLE_MILS,
            TrajectoryKind::HighAngle => angle < APEX_ANGLE_MILS,
        };
        if mismatch {
            return Err(FireError::TrajectoryKindMismatch(solution));
        }
        Ok(solution)
    }

    /// Alternate height and range corrections for an ascending-branch target.
    /// Returns whether both ended within precision.
    fn correct_ascending(
        &mut self,
        request: &ReverseRequest,
        angle: &mut f64,
        e1: &mut FlightState,
        step: f64,
    ) -> bool {
        let range = request.target_range;
        let height = request.height_difference;
        let precision = request.precision;
        let mut variation = SENSITIVITY_VARIATION_MILS;
        let mut inversions = 0;
        let mut vertical_counter = 0;

        'height: while (height - e1.height()).abs() > precision {
            let probe = if e1.height() <= height {
                *angle + variation
            } else {
                *angle - variation
            };
            let e2 = self.last(request, probe, step);
            let metres_per_mil = (e2.height() - e1.height()).abs() / variation;
            let mut delta = (height - e1.height()) / metres_per_mil;
            if !delta.is_finite() {
                warn!("flat height sensitivity at {:.2} mils", angle);
                break;
            }

            *e1 = self.last(request, *angle + delta, step);
            *angle += delta;
            wrap_angle(angle, &mut inversions);
            if inversions > MAX_INVERSIONS {
                break;
            }
            vertical_counter += 1;
            if vertical_counter > MAX_ITERATIONS {
                break;
            }

            let mut horizontal_counter = 0;
            while (range - e1.range()).abs() > precision {
                let probe = if e1.range() <= range {
                    *angle - variation
                } else {
                    *angle + variation
                };
                let e2 = self.last(request, probe, step);
                let metres_per_mil = (e2.range() - e1.range()).abs() / variation;
                let previous = delta;
                delta = (e1.range() - range) / metres_per_mil;
                if !delta.is_finite() {
                    warn!("flat range sensitivity at {:.2} mils", angle);
                    break 'height;
                }

                if is_near_apex(e1, height) {
                    variation = SENSITIVITY_VARIATION_MILS / 10.0;
                    delta = angular_step_ladder(delta);
                } else {
                    variation = SENSITIVITY_VARIATION_MILS;
                }
                if correction_ratio(delta, previous) > OSCILLATION_RATIO && delta / previous < 0.0 {
                    delta /= 2.0;
                }

                *angle += delta;
                wrap_angle(angle, &mut inversions);
                *e1 = self.last(request, *angle, step);
                debug!(
                    "ascending correction: {:.3} mils -> x = {:.2} m, y = {:.2} m",
                    angle,
                    e1.range(),
                    e1.height()
                );

                if inversions > MAX_INVERSIONS {
                    break 'height;
                }
                horizontal_counter += 1;
                if horizontal_counter > MAX_ITERATIONS {
                    break;
                }
            }
        }

        (e1.height() - height).abs() <= precision && (e1.range() - range).abs() < precision
    }

    /// Closed-form elevation in vacuum
    fn solve_vacuum(&self, request: &ReverseRequest) -> Result<FireSolution, FireError> {
        let g = self.integrator.environment().local_gravity();
        let v2 = request.muzzle_velocity * request.muzzle_velocity;
        let range = request.target_range;
        let height = request.height_difference;

        let discriminant = v2 * v2 - g * (g * range * range + 2.0 * height * v2);
        if discriminant < 0.0 || !(range > 0.0) {
            let max_range = (v2 - 2.0 * g * height).max(0.0).sqrt() * request.muzzle_velocity / g;
            return Err(FireError::OutOfRange {
                solution: FireSolution::failed(request.initial_angle_mils, 0.0),
                max_range,
                target_range: range,
            });
        }

        let root = discriminant.sqrt();
        let tangent = match request.kind {
            TrajectoryKind::Plunging => (v2 - root) / (g * range),
            TrajectoryKind::HighAngle => (v2 + root) / (g * range),
        };
        Ok(FireSolution::new(rad_to_mils(tangent.atan()), 0.0, true))
    }
}
