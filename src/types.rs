use chrono::{DateTime, Utc};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Checkpoint event kinds recorded along the course.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RollStart,
    HillStart,
    FreerollStart,
    RollEnd,
}

/// One timestamped checkpoint event. `tag` carries the hill number
/// ("1".."5") for `HillStart` events and is `None` otherwise.
///
/// A run's events form a set: ordering is irrelevant, the resolver
/// re-derives it from timestamps.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub tag: Option<String>,
    pub timestamp_ms: i64,
}

impl Event {
    pub fn new(kind: EventKind, tag: Option<&str>, timestamp_ms: i64) -> Self {
        Event {
            kind,
            tag: tag.map(str::to_owned),
            timestamp_ms,
        }
    }
}

/// Per-sensor affine + orientation correction coefficients.
///
/// Supplied once per sensor by the decoder; applied as a pure function,
/// never mutated by the pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Calibration {
    pub orientation_matrix: Matrix3<f64>,
    pub level_shift: Vector3<f64>,
    pub offset_cal: Vector3<f64>,
    pub calibration_factor: f64,
    pub calibration_divisor: f64,
}

impl Calibration {
    /// Identity calibration: output equals input.
    pub fn identity() -> Self {
        Calibration {
            orientation_matrix: Matrix3::identity(),
            level_shift: Vector3::zeros(),
            offset_cal: Vector3::zeros(),
            calibration_factor: 1.0,
            calibration_divisor: 1.0,
        }
    }

    /// Apply the correction to one raw 3-axis sample.
    pub fn apply(&self, raw: Vector3<f64>) -> Vector3<f64> {
        let scale = self.calibration_factor / self.calibration_divisor;
        self.orientation_matrix * ((raw - self.level_shift - self.offset_cal) * scale)
    }
}

/// One burst/packet of inertial readings. The axis arrays and
/// `sample_time_offset` must all have the same length; absolute sample
/// timestamps are `base_timestamp_ms() + sample_time_offset[i]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SensorBurst {
    pub timestamp_s: u32,
    pub timestamp_ms: u16,
    pub sample_time_offset: Vec<i64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl SensorBurst {
    pub fn base_timestamp_ms(&self) -> i64 {
        self.timestamp_s as i64 * 1000 + self.timestamp_ms as i64
    }
}

/// A 3-axis time series indexed by millisecond timestamp. Timestamps are
/// non-decreasing; the axis vectors share the index length.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SensorSeries {
    pub timestamps: Vec<i64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl SensorSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Raw positioning record as decoded from the telemetry file.
///
/// Latitude/longitude are semicircles (2^31 per 180 degrees);
/// `utc_timestamp_s` counts seconds from the FIT epoch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GpsRecord {
    pub timestamp_s: u32,
    pub timestamp_ms: u16,
    pub position_lat: i32,
    pub position_long: i32,
    pub velocity: [f64; 3],
    pub heading_deg: f64,
    pub utc_timestamp_s: u32,
}

/// One decoded GPS fix with derived scalar speed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GpsPoint {
    pub timestamp_ms: i64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub speed_m_s: f64,
    pub heading_deg: f64,
    pub utc: DateTime<Utc>,
}

/// Timestamp-ordered GPS kinematics series for one run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GpsSeries {
    pub points: Vec<GpsPoint>,
}

impl GpsSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Largest scalar speed in the series, `None` when empty.
    pub fn max_speed(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|p| p.speed_m_s)
            .fold(None, |acc, v| match acc {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
    }

    /// Index of the point with exactly this timestamp, if any.
    pub fn index_at(&self, timestamp_ms: i64) -> Option<usize> {
        self.points
            .binary_search_by_key(&timestamp_ms, |p| p.timestamp_ms)
            .ok()
    }
}
