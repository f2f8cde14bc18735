//! Tagged records produced by the telemetry-file decoder.
//!
//! The decoder itself is an external collaborator; this module only fixes
//! the shape of what it hands over, so missing or extra fields are caught
//! at the boundary instead of through ad hoc key lookups downstream.

use serde::{Deserialize, Serialize};

use crate::types::{Calibration, GpsRecord, SensorBurst};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraEventKind {
    VideoStart,
    VideoEnd,
    Other,
}

/// One camera event from the recording device.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraEvent {
    pub timestamp_s: u32,
    pub timestamp_ms: u16,
    pub kind: CameraEventKind,
}

impl CameraEvent {
    pub fn timestamp_ms_abs(&self) -> i64 {
        self.timestamp_s as i64 * 1000 + self.timestamp_ms as i64
    }
}

/// Which physical sensor a calibration or burst stream belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Compass,
}

/// Calibration coefficients tagged with the sensor they apply to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SensorCalibration {
    pub sensor_type: SensorKind,
    pub calibration: Calibration,
}

/// Everything the pipeline consumes from one decoded telemetry file.
///
/// `gps_records` is `None` when the file carried no positioning stream at
/// all; an empty `Vec` means the stream existed but held no fixes. The two
/// are distinct downstream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecordedMessages {
    pub camera_events: Vec<CameraEvent>,
    pub gps_records: Option<Vec<GpsRecord>>,
    pub calibrations: Vec<SensorCalibration>,
    pub accelerometer_bursts: Vec<SensorBurst>,
    pub gyroscope_bursts: Vec<SensorBurst>,
    pub magnetometer_bursts: Vec<SensorBurst>,
}

impl RecordedMessages {
    /// Timestamps (ms) of all video_start events, empty if none.
    pub fn camera_start_timestamps(&self) -> Vec<i64> {
        self.camera_events
            .iter()
            .filter(|e| e.kind == CameraEventKind::VideoStart)
            .map(CameraEvent::timestamp_ms_abs)
            .collect()
    }

    /// Timestamps (ms) of all video_end events, empty if none.
    pub fn camera_end_timestamps(&self) -> Vec<i64> {
        self.camera_events
            .iter()
            .filter(|e| e.kind == CameraEventKind::VideoEnd)
            .map(CameraEvent::timestamp_ms_abs)
            .collect()
    }

    // TODO: handle multiple calibration messages per sensor (gyro re-cals)
    pub fn calibration_for(&self, sensor: SensorKind) -> Option<&Calibration> {
        self.calibrations
            .iter()
            .find(|c| c.sensor_type == sensor)
            .map(|c| &c.calibration)
    }

    pub fn bursts_for(&self, sensor: SensorKind) -> &[SensorBurst] {
        match sensor {
            SensorKind::Accelerometer => &self.accelerometer_bursts,
            SensorKind::Gyroscope => &self.gyroscope_bursts,
            SensorKind::Compass => &self.magnetometer_bursts,
        }
    }
}

/// Collaborator that turns an opaque storage reference into decoded
/// messages. Implementations own path resolution, file I/O and the binary
/// format; the pipeline only sees the result.
pub trait MessageSource: Sync {
    fn load(&self, storage_ref: &str) -> Result<RecordedMessages, crate::error::AnalysisError>;
}

impl<F> MessageSource for F
where
    F: Fn(&str) -> Result<RecordedMessages, crate::error::AnalysisError> + Sync,
{
    fn load(&self, storage_ref: &str) -> Result<RecordedMessages, crate::error::AnalysisError> {
        self(storage_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(kind: CameraEventKind, s: u32, ms: u16) -> CameraEvent {
        CameraEvent {
            timestamp_s: s,
            timestamp_ms: ms,
            kind,
        }
    }

    #[test]
    fn test_camera_start_timestamps() {
        let messages = RecordedMessages {
            camera_events: vec![
                camera(CameraEventKind::VideoStart, 10, 500),
                camera(CameraEventKind::VideoEnd, 95, 0),
                camera(CameraEventKind::Other, 12, 0),
            ],
            ..Default::default()
        };
        assert_eq!(messages.camera_start_timestamps(), vec![10_500]);
        assert_eq!(messages.camera_end_timestamps(), vec![95_000]);
    }

    #[test]
    fn test_calibration_lookup_by_sensor() {
        let messages = RecordedMessages {
            calibrations: vec![SensorCalibration {
                sensor_type: SensorKind::Gyroscope,
                calibration: crate::types::Calibration::identity(),
            }],
            ..Default::default()
        };
        assert!(messages.calibration_for(SensorKind::Gyroscope).is_some());
        assert!(messages.calibration_for(SensorKind::Accelerometer).is_none());
    }
}
