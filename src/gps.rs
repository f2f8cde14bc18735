//! GPS Kinematics Extractor: raw positioning records to a speed series.

use chrono::{DateTime, TimeZone, Utc};

use crate::types::{GpsPoint, GpsRecord, GpsSeries};

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31 00:00 UTC).
pub const FIT_EPOCH_S: i64 = 631_065_600;

/// Semicircle scale: 2^31 raw units per 180 degrees.
const SEMICIRCLE_DEG: f64 = 180.0 / 2_147_483_648.0;

fn utc_from_fit(utc_timestamp_s: u32) -> DateTime<Utc> {
    Utc.timestamp_opt(utc_timestamp_s as i64 + FIT_EPOCH_S, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn decode_record(record: &GpsRecord) -> GpsPoint {
    let [vx, vy, vz] = record.velocity;
    GpsPoint {
        timestamp_ms: record.timestamp_s as i64 * 1000 + record.timestamp_ms as i64,
        latitude_deg: record.position_lat as f64 * SEMICIRCLE_DEG,
        longitude_deg: record.position_long as f64 * SEMICIRCLE_DEG,
        speed_m_s: (vx * vx + vy * vy + vz * vz).sqrt(),
        heading_deg: record.heading_deg,
        utc: utc_from_fit(record.utc_timestamp_s),
    }
}

/// Decode a positioning stream into a timestamp-ordered kinematics series.
///
/// `None` input means the run carried no positioning source at all and
/// maps to `None`; an empty slice is a valid (empty) series.
pub fn gps_series(records: Option<&[GpsRecord]>) -> Option<GpsSeries> {
    let records = records?;
    let mut points: Vec<GpsPoint> = records.iter().map(decode_record).collect();
    points.sort_by_key(|p| p.timestamp_ms);
    Some(GpsSeries { points })
}
