use serde::{Deserialize, Serialize};

use crate::constants::SAMPLE_PERIOD_S;
use crate::flight::FlightState;

/// Number of integration steps between recorded samples, so that recording
/// happens roughly every `SAMPLE_PERIOD_S` seconds
pub fn sample_interval(step: f64) -> usize {
    if step > SAMPLE_PERIOD_S {
        1
    } else {
        ((SAMPLE_PERIOD_S / step) as usize).max(1)
    }
}

/// Notable points of a resampled trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryFlag {
    Apex,
    Impact,
}

/// Trajectory state interpolated at a given range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSample {
    pub range_m: f64,
    pub height_m: f64,
    pub drift_m: f64,
    pub speed_mps: f64,
    pub time_s: f64,
    pub yaw: f64,
    pub flags: Vec<TrajectoryFlag>,
}

/// Terminal ballistics of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub range_m: f64,
    pub drift_m: f64,
    pub height_m: f64,
    pub time_of_flight_s: f64,
    pub impact_speed_mps: f64,
    pub descent_angle_mils: f64,
    pub max_height_m: f64,
    pub max_yaw: f64,
}

/// Summarise the final state of a recorded run
pub fn impact_summary(states: &[FlightState]) -> Option<ImpactSummary> {
    let last = states.last()?;
    Some(ImpactSummary {
        range_m: last.range(),
        drift_m: last.drift(),
        height_m: last.height(),
        time_of_flight_s: last.time,
        impact_speed_mps: last.speed(),
        descent_angle_mils: last.descent_angle_mils(),
        max_height_m: last.max_height,
        max_yaw: last.max_yaw,
    })
}

/// Resample a recorded trajectory every `spacing_m` metres of range, plus the impact point.
///
/// Ranges must increase along the run, which holds for every elevation below
/// vertical fire.
pub fn resample_at_ranges(states: &[FlightState], spacing_m: f64) -> Vec<RangeSample> {
    if states.len() < 2 || !(spacing_m > 0.0) {
        return Vec::new();
    }

    let ranges: Vec<f64> = states.iter().map(|s| s.range()).collect();
    let heights: Vec<f64> = states.iter().map(|s| s.height()).collect();
    let drifts: Vec<f64> = states.iter().map(|s| s.drift()).collect();
    let speeds: Vec<f64> = states.iter().map(|s| s.speed()).collect();
    let times: Vec<f64> = states.iter().map(|s| s.time).collect();
    let yaws: Vec<f64> = states.iter().map(|s| s.yaw).collect();

    let max_range = ranges[ranges.len() - 1];
    if max_range < 1e-9 {
        return Vec::new();
    }

    let mut distances: Vec<f64> = (0..)
        .map(|i| i as f64 * spacing_m)
        .take_while(|&d| d < max_range)
        .collect();
    distances.push(max_range);

    let mut samples: Vec<RangeSample> = distances
        .iter()
        .map(|&d| RangeSample {
            range_m: d,
            height_m: interpolate(&ranges, &heights, d),
            drift_m: interpolate(&ranges, &drifts, d),
            speed_mps: interpolate(&ranges, &speeds, d),
            time_s: interpolate(&ranges, &times, d),
            yaw: interpolate(&ranges, &yaws, d),
            flags: Vec::new(),
        })
        .collect();

    // Apex at the recorded state with the greatest height
    let apex_range = states
        .iter()
        .max_by(|a, b| a.height().total_cmp(&b.height()))
        .map(|s| s.range())
        .unwrap_or(0.0);
    if let Some(idx) = find_closest_sample_index(&samples, apex_range) {
        samples[idx].flags.push(TrajectoryFlag::Apex);
    }
    if let Some(last) = samples.last_mut() {
        last.flags.push(TrajectoryFlag::Impact);
    }

    samples
}

/// Linear interpolation over increasing abscissae, clamped at both ends
fn interpolate(x_vals: &[f64], y_vals: &[f64], x: f64) -> f64 {
    if x_vals.is_empty() || x_vals.len() != y_vals.len() {
        return 0.0;
    }

    if x <= x_vals[0] {
        return y_vals[0];
    }

    if x >= x_vals[x_vals.len() - 1] {
        return y_vals[y_vals.len() - 1];
    }

    // Binary search for the correct interval
    let right = x_vals.partition_point(|&v| v <= x);
    let left = right - 1;

    let (x1, x2) = (x_vals[left], x_vals[right]);
    let (y1, y2) = (y_vals[left], y_vals[right]);

    if (x2 - x1).abs() < f64::EPSILON {
        return y1;
    }

    y1 + (y2 - y1) * (x - x1) / (x2 - x1)
}

fn find_closest_sample_index(samples: &[RangeSample], target: f64) -> Option<usize> {
    samples
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (a.range_m - target).abs().total_cmp(&(b.range_m - target).abs()))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn state(x: f64, y: f64, t: f64) -> FlightState {
        FlightState {
            position: Vector3::new(x, y, 0.1 * x),
            velocity: Vector3::new(100.0, 0.0, 0.0),
            time: t,
            max_height: y,
            ..Default::default()
        }
    }

    #[test]
    fn test_sample_interval() {
        assert_eq!(sample_interval(0.5), 1);
        assert_eq!(sample_interval(0.1), 1);
        assert_eq!(sample_interval(0.05), 2);
        assert_eq!(sample_interval(0.01), 10);
    }

    #[test]
    fn test_interpolate() {
        let x_vals = vec![0.0, 1.0, 2.0, 3.0];
        let y_vals = vec![0.0, 10.0, 20.0, 30.0];

        assert_eq!(interpolate(&x_vals, &y_vals, 0.5), 5.0);
        assert_eq!(interpolate(&x_vals, &y_vals, 1.0), 10.0);
        assert_eq!(interpolate(&x_vals, &y_vals, 2.5), 25.0);

        assert_eq!(interpolate(&x_vals, &y_vals, -1.0), 0.0);
        assert_eq!(interpolate(&x_vals, &y_vals, 4.0), 30.0);
    }

    #[test]
    fn test_resample_flags_apex_and_impact() {
        let states = vec![
            state(0.0, 0.0, 0.0),
            state(100.0, 40.0, 1.0),
            state(200.0, 50.0, 2.0),
            state(300.0, 30.0, 3.0),
            state(380.0, 0.0, 4.0),
        ];
        let samples = resample_at_ranges(&states, 100.0);
        let ranges: Vec<f64> = samples.iter().map(|s| s.range_m).collect();
        assert_eq!(ranges, vec![0.0, 100.0, 200.0, 300.0, 380.0]);
        assert!(samples[2].flags.contains(&TrajectoryFlag::Apex));
        assert!(samples[4].flags.contains(&TrajectoryFlag::Impact));
        assert!((samples[1].drift_m - 10.0).abs() < 1e-12);
        assert!((samples[3].time_s - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_resample_rejects_degenerate_input() {
        assert!(resample_at_ranges(&[state(0.0, 0.0, 0.0)], 10.0).is_empty());
        let states = vec![state(0.0, 0.0, 0.0), state(10.0, 0.0, 1.0)];
        assert!(resample_at_ranges(&states, 0.0).is_empty());
    }

    #[test]
    fn test_impact_summary() {
        assert!(impact_summary(&[]).is_none());
        let mut last = state(5000.0, 0.0, 30.0);
        last.velocity = Vector3::new(150.0, -150.0, 0.0);
        last.max_height = 900.0;
        let summary = impact_summary(&[state(0.0, 0.0, 0.0), last]).unwrap();
        assert_eq!(summary.range_m, 5000.0);
        assert_eq!(summary.max_height_m, 900.0);
        assert!((summary.descent_angle_mils - 800.0).abs() < 1e-9);
    }
}
