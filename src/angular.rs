//! Angular Velocity Estimator: turning rate from GPS heading and speed.
//!
//! Heading is numerically unstable near zero speed, so samples below the
//! cutoff are discarded before differencing. Heading deltas are resolved
//! against the 0/360 wraparound by trying the raw difference and both
//! 360-degree shifts and keeping the smallest magnitude: 359 -> 1 must
//! read as +2 degrees, not -358.

use serde::{Deserialize, Serialize};

use crate::types::GpsSeries;

/// Turning-rate series, one element shorter than the speed-filtered input
/// (the first retained sample has no predecessor). `centripetal` is
/// omega * speed, proportional to centripetal acceleration (v^2/r = v*omega).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AngularSeries {
    pub timestamps: Vec<i64>,
    pub omega_rad_s: Vec<f64>,
    pub centripetal: Vec<f64>,
}

impl AngularSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

fn wrapped_delta_deg(prev: f64, cur: f64) -> f64 {
    let raw = cur - prev;
    [raw, raw - 360.0, raw + 360.0]
        .into_iter()
        .min_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(raw)
}

/// Estimate angular velocity (rad/s) over samples at or above `speed_cutoff`.
pub fn angular_velocity(series: &GpsSeries, speed_cutoff: f64) -> AngularSeries {
    let retained: Vec<(i64, f64, f64)> = series
        .points
        .iter()
        .filter(|p| p.speed_m_s >= speed_cutoff)
        .map(|p| (p.timestamp_ms, p.heading_deg, p.speed_m_s))
        .collect();

    let mut out = AngularSeries::default();
    for pair in retained.windows(2) {
        let (prev_ts, prev_heading, _) = pair[0];
        let (ts, heading, speed) = pair[1];
        let dt_s = (ts - prev_ts) as f64 / 1000.0;
        if dt_s <= 0.0 {
            continue;
        }
        let omega = wrapped_delta_deg(prev_heading, heading).to_radians() / dt_s;
        out.timestamps.push(ts);
        out.omega_rad_s.push(omega);
        out.centripetal.push(omega * speed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GpsPoint;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Utc};

    fn series(samples: &[(i64, f64, f64)]) -> GpsSeries {
        GpsSeries {
            points: samples
                .iter()
                .map(|&(ts, heading, speed)| GpsPoint {
                    timestamp_ms: ts,
                    latitude_deg: 0.0,
                    longitude_deg: 0.0,
                    speed_m_s: speed,
                    heading_deg: heading,
                    utc: DateTime::<Utc>::MIN_UTC,
                })
                .collect(),
        }
    }

    #[test]
    fn test_wraparound_resolution() {
        // 350 -> 355 -> 2 degrees at one-second spacing: +5 then +7 deg/s,
        // the 2 - 355 step resolved through the +360 branch.
        let gps = series(&[(0, 350.0, 1.0), (1_000, 355.0, 1.0), (2_000, 2.0, 1.0)]);
        let out = angular_velocity(&gps, 0.0);
        assert_eq!(out.len(), 2);
        assert_relative_eq!(out.omega_rad_s[0], 5.0_f64.to_radians(), epsilon = 1e-12);
        assert_relative_eq!(out.omega_rad_s[1], 7.0_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_negative_turn() {
        let gps = series(&[(0, 10.0, 1.0), (1_000, 350.0, 1.0)]);
        let out = angular_velocity(&gps, 0.0);
        assert_relative_eq!(out.omega_rad_s[0], (-20.0_f64).to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_speed_cutoff_filters_before_differencing() {
        // The slow middle sample is dropped, so the delta spans 2 seconds.
        let gps = series(&[(0, 0.0, 3.0), (1_000, 90.0, 0.5), (2_000, 10.0, 3.0)]);
        let out = angular_velocity(&gps, 2.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out.timestamps, vec![2_000]);
        assert_relative_eq!(out.omega_rad_s[0], 5.0_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_centripetal_is_omega_times_speed() {
        let gps = series(&[(0, 0.0, 4.0), (1_000, 45.0, 4.0)]);
        let out = angular_velocity(&gps, 0.0);
        assert_relative_eq!(
            out.centripetal[0],
            out.omega_rad_s[0] * 4.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_too_few_retained_samples() {
        let gps = series(&[(0, 0.0, 1.0)]);
        assert!(angular_velocity(&gps, 0.0).is_empty());
        let gps = series(&[(0, 0.0, 0.1), (1_000, 5.0, 0.1)]);
        assert!(angular_velocity(&gps, 2.0).is_empty());
    }
}
