//! Freeroll Performance Analyzer: the per-run statistic bundle.
//!
//! Composes checkpoint events, GPS kinematics and terrain elevation into
//! speed/energy metrics and the pickup-point search. Every output field is
//! optional and independently gated: a missing or ambiguous prerequisite
//! leaves that field unset without touching its siblings.

use log::warn;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::events::single_timestamp;
use crate::types::{Event, EventKind, GpsSeries};

/// Standard gravity, m/s^2.
pub const GRAVITY_M_S2: f64 = 9.81;

/// Terrain elevation collaborator. `snap_to_course` projects the fix onto
/// the reference course line before sampling the raster.
pub trait ElevationLookup {
    fn elevation_m(
        &self,
        latitude_deg: f64,
        longitude_deg: f64,
        snap_to_course: bool,
    ) -> Result<f64, AnalysisError>;
}

impl<F> ElevationLookup for F
where
    F: Fn(f64, f64, bool) -> Result<f64, AnalysisError>,
{
    fn elevation_m(
        &self,
        latitude_deg: f64,
        longitude_deg: f64,
        snap_to_course: bool,
    ) -> Result<f64, AnalysisError> {
        self(latitude_deg, longitude_deg, snap_to_course)
    }
}

/// Tunables for the freeroll analysis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FreerollConfig {
    /// Upper-bound slack past hill 3 start for the pickup search window.
    pub pickup_window_ms: i64,
    /// Course start-line elevation subtracted from every lookup, so
    /// energies are relative to the start line.
    pub start_line_elevation_m: f64,
}

impl Default for FreerollConfig {
    fn default() -> Self {
        FreerollConfig {
            pickup_window_ms: 10_000,
            start_line_elevation_m: 288.4,
        }
    }
}

/// Per-run result bundle. Unset fields were not computable from the given
/// inputs; they are never defaulted to zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FreerollStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeroll_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_roll_start_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_roll_end_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeroll_energy_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollup_height: Option<f64>,
}

fn max_of(values: &Array1<f64>) -> Option<f64> {
    values
        .iter()
        .copied()
        .fold(None, |acc: Option<f64>, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
}

/// Index of the minimum value among `indices`, first occurrence on ties.
fn argmin_within(values: &Array1<f64>, indices: impl Iterator<Item = usize>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for i in indices {
        let v = values[i];
        match best {
            Some((_, bv)) if bv <= v => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Snapped elevations relative to the start line, co-indexed with the GPS
/// series. A failed lookup drops the whole elevation column (and every
/// field derived from it) for this run.
fn relative_elevations(
    gps: &GpsSeries,
    elevation: &impl ElevationLookup,
    config: &FreerollConfig,
) -> Option<Array1<f64>> {
    let mut out = Vec::with_capacity(gps.len());
    for point in &gps.points {
        match elevation.elevation_m(point.latitude_deg, point.longitude_deg, true) {
            Ok(elev) => out.push(elev - config.start_line_elevation_m),
            Err(err) => {
                warn!("elevation lookup failed, skipping energy metrics: {err}");
                return None;
            }
        }
    }
    Some(Array1::from_vec(out))
}

/// Analyze one run. `camera_starts` are video-start artifact timestamps
/// from the recording device; the video offsets are reported only when
/// exactly one exists.
pub fn analyze_freeroll(
    events: &[Event],
    gps: Option<&GpsSeries>,
    elevation: &impl ElevationLookup,
    camera_starts: &[i64],
    config: &FreerollConfig,
) -> FreerollStats {
    let mut stats = FreerollStats::default();

    let roll_start = single_timestamp(events, EventKind::RollStart, None);
    let freeroll_start = single_timestamp(events, EventKind::FreerollStart, None);
    let hill3_start = single_timestamp(events, EventKind::HillStart, Some("3"));
    let roll_end = single_timestamp(events, EventKind::RollEnd, None);

    if let (Some(freeroll), Some(hill3)) = (freeroll_start, hill3_start) {
        stats.freeroll_time_ms = Some(hill3 - freeroll);
    }

    if let [camera_start] = camera_starts {
        stats.video_roll_start_ms = roll_start.map(|ts| ts - camera_start);
        stats.video_roll_end_ms = roll_end.map(|ts| ts - camera_start);
    }

    let Some(gps) = gps else {
        return stats;
    };
    stats.max_speed = gps.max_speed();

    let Some(elevations) = relative_elevations(gps, elevation, config) else {
        return stats;
    };
    let speeds = Array1::from_iter(gps.points.iter().map(|p| p.speed_m_s));
    let energy = speeds.mapv(|v| v * v / 2.0) + elevations.mapv(|e| e * GRAVITY_M_S2);

    let max_energy = max_of(&energy);
    stats.max_energy = max_energy;

    let hill3_index = hill3_start.and_then(|ts| gps.index_at(ts));
    if let (Some(max_e), Some(i)) = (max_energy, hill3_index) {
        stats.freeroll_energy_loss = Some(max_e - energy[i]);
    }

    if let (Some(freeroll), Some(hill3)) = (freeroll_start, hill3_start) {
        // Window is inclusive at both ends; a minimum sitting exactly on
        // hill3 + pickup_window_ms must be picked up.
        let upper = hill3 + config.pickup_window_ms;
        let in_window = (0..gps.len()).filter(|&i| {
            let ts = gps.points[i].timestamp_ms;
            ts >= freeroll && ts <= upper
        });
        if let Some(pickup) = argmin_within(&energy, in_window) {
            stats.pickup_energy = Some(energy[pickup]);
            stats.pickup_speed = Some(gps.points[pickup].speed_m_s);
            if let Some(i) = hill3_index {
                stats.rollup_height = Some(elevations[i] - elevations[pickup]);
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GpsPoint;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Utc};

    // Flat synthetic course: elevation keyed off latitude so each sample
    // gets a deterministic, distinct value.
    fn fake_elevation(lat: f64, _long: f64, _snap: bool) -> Result<f64, AnalysisError> {
        Ok(300.0 + lat)
    }

    fn failing_elevation(_lat: f64, _long: f64, _snap: bool) -> Result<f64, AnalysisError> {
        Err(AnalysisError::DecodeFailure("raster unavailable".into()))
    }

    fn gps_from(samples: &[(i64, f64, f64)]) -> GpsSeries {
        // (timestamp_ms, speed, latitude-as-elevation-offset)
        GpsSeries {
            points: samples
                .iter()
                .map(|&(ts, speed, lat)| GpsPoint {
                    timestamp_ms: ts,
                    latitude_deg: lat,
                    longitude_deg: 0.0,
                    speed_m_s: speed,
                    heading_deg: 0.0,
                    utc: DateTime::<Utc>::MIN_UTC,
                })
                .collect(),
        }
    }

    fn events_with_freeroll() -> Vec<Event> {
        vec![
            Event::new(EventKind::RollStart, None, 500),
            Event::new(EventKind::FreerollStart, None, 9_000),
            Event::new(EventKind::HillStart, Some("3"), 9_500),
            Event::new(EventKind::RollEnd, None, 20_000),
        ]
    }

    fn energy_at(speed: f64, lat: f64, config: &FreerollConfig) -> f64 {
        speed * speed / 2.0 + (300.0 + lat - config.start_line_elevation_m) * GRAVITY_M_S2
    }

    #[test]
    fn test_event_only_run() {
        let stats = analyze_freeroll(
            &events_with_freeroll(),
            None,
            &fake_elevation,
            &[],
            &FreerollConfig::default(),
        );
        assert_eq!(stats.freeroll_time_ms, Some(500));
        assert_eq!(stats.max_speed, None);
        assert_eq!(stats.max_energy, None);
        assert_eq!(stats.freeroll_energy_loss, None);
        assert_eq!(stats.pickup_energy, None);
        assert_eq!(stats.pickup_speed, None);
        assert_eq!(stats.rollup_height, None);
        assert_eq!(stats.video_roll_start_ms, None);
    }

    #[test]
    fn test_video_offsets_require_exactly_one_camera_start() {
        let config = FreerollConfig::default();
        let events = events_with_freeroll();

        let stats = analyze_freeroll(&events, None, &fake_elevation, &[100], &config);
        assert_eq!(stats.video_roll_start_ms, Some(400));
        assert_eq!(stats.video_roll_end_ms, Some(19_900));

        let stats = analyze_freeroll(&events, None, &fake_elevation, &[100, 200], &config);
        assert_eq!(stats.video_roll_start_ms, None);
        assert_eq!(stats.video_roll_end_ms, None);
    }

    #[test]
    fn test_full_energy_pipeline() {
        let config = FreerollConfig::default();
        // Fast at the top, slowest (lowest energy) mid-freeroll, sample
        // exactly at hill3 start for the loss/rollup anchors.
        let gps = gps_from(&[
            (8_000, 12.0, 5.0),
            (9_200, 4.0, 1.0),
            (9_500, 6.0, 2.0),
            (10_000, 9.0, 3.0),
        ]);
        let stats = analyze_freeroll(
            &events_with_freeroll(),
            Some(&gps),
            &fake_elevation,
            &[],
            &config,
        );

        assert_eq!(stats.max_speed, Some(12.0));
        let max_e = energy_at(12.0, 5.0, &config);
        assert_relative_eq!(stats.max_energy.unwrap(), max_e, epsilon = 1e-9);
        assert_relative_eq!(
            stats.freeroll_energy_loss.unwrap(),
            max_e - energy_at(6.0, 2.0, &config),
            epsilon = 1e-9
        );
        // Pickup is the 9_200 sample (inside [9_000, 19_500], lowest energy).
        assert_relative_eq!(
            stats.pickup_energy.unwrap(),
            energy_at(4.0, 1.0, &config),
            epsilon = 1e-9
        );
        assert_eq!(stats.pickup_speed, Some(4.0));
        assert_relative_eq!(stats.rollup_height.unwrap(), 2.0 - 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pickup_window_upper_bound_is_inclusive() {
        let config = FreerollConfig::default();
        // Global minimum sits exactly at hill3 + 10_000 = 19_500.
        let gps = gps_from(&[
            (9_000, 10.0, 5.0),
            (9_500, 8.0, 4.0),
            (19_500, 1.0, 0.0),
            (19_501, 0.5, 0.0),
        ]);
        let stats = analyze_freeroll(
            &events_with_freeroll(),
            Some(&gps),
            &fake_elevation,
            &[],
            &config,
        );
        // The 19_501 sample is lower still but falls outside the window.
        assert_relative_eq!(
            stats.pickup_energy.unwrap(),
            energy_at(1.0, 0.0, &config),
            epsilon = 1e-9
        );
        assert_eq!(stats.pickup_speed, Some(1.0));
    }

    #[test]
    fn test_pickup_window_override() {
        let config = FreerollConfig {
            pickup_window_ms: 0,
            ..Default::default()
        };
        let gps = gps_from(&[(9_000, 10.0, 5.0), (9_500, 8.0, 4.0), (9_600, 1.0, 0.0)]);
        let stats = analyze_freeroll(
            &events_with_freeroll(),
            Some(&gps),
            &fake_elevation,
            &[],
            &config,
        );
        assert_eq!(stats.pickup_speed, Some(8.0));
    }

    #[test]
    fn test_no_exact_hill3_sample_drops_dependent_fields_only() {
        let config = FreerollConfig::default();
        // No sample exactly at 9_500.
        let gps = gps_from(&[(9_000, 10.0, 5.0), (9_499, 4.0, 1.0), (10_000, 9.0, 3.0)]);
        let stats = analyze_freeroll(
            &events_with_freeroll(),
            Some(&gps),
            &fake_elevation,
            &[],
            &config,
        );
        assert!(stats.max_speed.is_some());
        assert!(stats.max_energy.is_some());
        assert_eq!(stats.freeroll_energy_loss, None);
        assert_eq!(stats.rollup_height, None);
        // Pickup needs only the window, not an exact hill3 sample.
        assert_eq!(stats.pickup_speed, Some(4.0));
    }

    #[test]
    fn test_elevation_failure_keeps_max_speed() {
        let _ = env_logger::builder().is_test(true).try_init();
        let gps = gps_from(&[(9_000, 10.0, 5.0), (9_500, 4.0, 1.0)]);
        let stats = analyze_freeroll(
            &events_with_freeroll(),
            Some(&gps),
            &failing_elevation,
            &[],
            &FreerollConfig::default(),
        );
        assert_eq!(stats.freeroll_time_ms, Some(500));
        assert_eq!(stats.max_speed, Some(10.0));
        assert_eq!(stats.max_energy, None);
        assert_eq!(stats.pickup_energy, None);
    }

    #[test]
    fn test_duplicate_freeroll_event_gates_time_and_pickup() {
        let mut events = events_with_freeroll();
        events.push(Event::new(EventKind::FreerollStart, None, 9_100));
        let gps = gps_from(&[(9_000, 10.0, 5.0), (9_500, 4.0, 1.0)]);
        let stats = analyze_freeroll(
            &events,
            Some(&gps),
            &fake_elevation,
            &[],
            &FreerollConfig::default(),
        );
        assert_eq!(stats.freeroll_time_ms, None);
        assert_eq!(stats.pickup_energy, None);
        // Energy loss only needs hill3, which is still unambiguous.
        assert!(stats.freeroll_energy_loss.is_some());
        assert!(stats.max_energy.is_some());
    }

    #[test]
    fn test_sparse_serialization() {
        let stats = FreerollStats {
            freeroll_time_ms: Some(500),
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
    }
}
