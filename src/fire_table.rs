//! Firing tables: independent reverse solves over a range ladder, run in parallel.

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::angle_calculations::ReverseSolver;
use crate::error::{BallisticsError, FireError};
use crate::flight::{Branch, FireSolution, ReverseRequest, TrajectoryKind};
use crate::trajectory_solver::PhysicsModel;

/// Range ladder and shot parameters of a table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireTableRequest {
    pub muzzle_velocity: f64,
    pub kind: TrajectoryKind,
    pub start_range: f64,
    pub end_range: f64,
    pub range_step: f64,
    pub height_difference: f64,
    /// Integration step (s)
    pub step: f64,
    pub precision: f64,
    pub initial_angle_mils: f64,
    pub branch: Branch,
    /// Worker threads, rayon's default pool when absent
    pub threads: Option<usize>,
}

impl Default for FireTableRequest {
    fn default() -> Self {
        let reverse = ReverseRequest::default();
        Self {
            muzzle_velocity: 0.0,
            kind: reverse.kind,
            start_range: 0.0,
            end_range: 0.0,
            range_step: 100.0,
            height_difference: 0.0,
            step: reverse.step,
            precision: reverse.precision,
            initial_angle_mils: reverse.initial_angle_mils,
            branch: reverse.branch,
            threads: None,
        }
    }
}

impl FireTableRequest {
    /// Target ranges from `start_range` to `end_range` inclusive
    pub fn ranges(&self) -> Result<Vec<f64>, BallisticsError> {
        if !(self.range_step > 0.0) || !(self.start_range > 0.0) || self.end_range < self.start_range {
            return Err(BallisticsError::InvalidInput(format!(
                "bad range ladder {}..={} by {}",
                self.start_range, self.end_range, self.range_step
            )));
        }
        let count = ((self.end_range - self.start_range) / self.range_step + 1e-9).floor() as usize + 1;
        Ok((0..count)
            .map(|i| self.start_range + i as f64 * self.range_step)
            .collect())
    }

    fn reverse_request(&self, target_range: f64) -> ReverseRequest {
        ReverseRequest {
            target_range,
            muzzle_velocity: self.muzzle_velocity,
            height_difference: self.height_difference,
            kind: self.kind,
            step: self.step,
            precision: self.precision,
            initial_angle_mils: self.initial_angle_mils,
            branch: self.branch,
        }
    }
}

/// Firing data for one range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireTableEntry {
    pub range: f64,
    pub elevation_mils: f64,
    pub derivation_mils: f64,
    pub time_of_flight: f64,
    pub max_height: f64,
    pub impact_speed: f64,
    pub descent_angle_mils: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FireTableRow {
    pub range: f64,
    pub result: Result<FireTableEntry, FireError>,
}

/// Solve every range of `request` in parallel.
///
/// Each row gets its own clone of `solver`, reseeded with the base seed plus
/// the row index so the table is reproducible for a seeded solver. The
/// maximum range is probed once for the whole table.
pub fn generate(solver: &ReverseSolver, request: &FireTableRequest) -> Result<Vec<FireTableRow>, BallisticsError> {
    let ranges = request.ranges()?;
    let base_seed = solver.settings().seed;

    // Vacuum rows detect out-of-range targets in closed form
    let max_range = if solver.settings().check_limit && solver.integrator().model() != PhysicsModel::Vacuum {
        let mut probe = solver.clone();
        let limit = probe
            .integrator_mut()
            .max_range(request.muzzle_velocity, request.step);
        Some((limit.range() / 10.0).round() * 10.0)
    } else {
        None
    };

    let workers: Vec<(f64, ReverseSolver)> = ranges
        .iter()
        .enumerate()
        .map(|(i, &range)| {
            let mut worker = solver.clone();
            worker.set_check_limit(false);
            if let Some(seed) = base_seed {
                worker.reseed(seed.wrapping_add(i as u64));
            }
            (range, worker)
        })
        .collect();

    let solve_all = move || -> Vec<FireTableRow> {
        workers
            .into_par_iter()
            .map(|(range, mut worker)| {
                let reverse = request.reverse_request(range);
                let result = match max_range {
                    Some(max_range) if max_range < range => Err(FireError::OutOfRange {
                        solution: FireSolution::failed(request.initial_angle_mils, 0.0),
                        max_range,
                        target_range: range,
                    }),
                    _ => solve_row(&mut worker, &reverse),
                };
                FireTableRow { range, result }
            })
            .collect()
    };

    let rows = match request.threads {
        Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
            Ok(pool) => pool.install(solve_all),
            Err(e) => {
                warn!("failed to build a {n}-thread pool, using the default: {e}");
                solve_all()
            }
        },
        None => solve_all(),
    };

    let solved = rows.iter().filter(|row| row.result.is_ok()).count();
    info!("fire table: {solved} of {} ranges solved", rows.len());
    Ok(rows)
}

fn solve_row(solver: &mut ReverseSolver, request: &ReverseRequest) -> Result<FireTableEntry, FireError> {
    let solution = solver.solve_reverse(request)?;
    let impact = solver
        .integrator_mut()
        .solve_direct_last(&request.shot(solution.elevation_mils, request.step));
    Ok(FireTableEntry {
        range: request.target_range,
        elevation_mils: solution.elevation_mils,
        derivation_mils: solution.derivation_mils,
        time_of_flight: impact.time,
        max_height: impact.max_height,
        impact_speed: impact.speed(),
        descent_angle_mils: impact.descent_angle_mils(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_ladder() {
        let request = FireTableRequest {
            start_range: 1000.0,
            end_range: 2000.0,
            range_step: 250.0,
            ..Default::default()
        };
        assert_eq!(
            request.ranges().unwrap(),
            vec![1000.0, 1250.0, 1500.0, 1750.0, 2000.0]
        );
    }

    #[test]
    fn test_bad_ladder_is_rejected() {
        let request = FireTableRequest {
            start_range: 2000.0,
            end_range: 1000.0,
            ..Default::default()
        };
        assert!(request.ranges().is_err());
        let request = FireTableRequest {
            start_range: 1000.0,
            end_range: 2000.0,
            range_step: 0.0,
            ..Default::default()
        };
        assert!(request.ranges().is_err());
    }
}
