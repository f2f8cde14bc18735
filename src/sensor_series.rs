//! Calibrated Sensor Series Builder: raw bursts in, calibrated series out.
//!
//! Bursts are flattened to absolute timestamps and sorted (overlapping
//! packets may interleave), the native sampling rate is estimated from the
//! median inter-sample gap, and each sample gets the per-sensor affine +
//! orientation correction. Optional decimation resamples onto a uniform
//! grid first, since the burst clock is not uniform.

use nalgebra::Vector3;

use crate::error::AnalysisError;
use crate::signal;
use crate::types::{Calibration, SensorBurst, SensorSeries};

fn flatten_bursts(bursts: &[SensorBurst]) -> SensorSeries {
    let total: usize = bursts.iter().map(|b| b.sample_time_offset.len()).sum();
    let mut samples: Vec<(i64, f64, f64, f64)> = Vec::with_capacity(total);

    for burst in bursts {
        let base = burst.base_timestamp_ms();
        for (i, &offset) in burst.sample_time_offset.iter().enumerate() {
            samples.push((base + offset, burst.x[i], burst.y[i], burst.z[i]));
        }
    }
    samples.sort_by_key(|s| s.0);

    let mut series = SensorSeries::default();
    for (ts, x, y, z) in samples {
        series.timestamps.push(ts);
        series.x.push(x);
        series.y.push(y);
        series.z.push(z);
    }
    series
}

fn calibrate_series(calibration: &Calibration, raw: &SensorSeries) -> SensorSeries {
    let mut out = SensorSeries {
        timestamps: raw.timestamps.clone(),
        x: Vec::with_capacity(raw.len()),
        y: Vec::with_capacity(raw.len()),
        z: Vec::with_capacity(raw.len()),
    };
    for i in 0..raw.len() {
        let v = calibration.apply(Vector3::new(raw.x[i], raw.y[i], raw.z[i]));
        out.x.push(v.x);
        out.y.push(v.y);
        out.z.push(v.z);
    }
    out
}

fn resample_uniform(series: &SensorSeries, step_ms: i64) -> SensorSeries {
    let start = series.timestamps[0];
    let end = series.timestamps[series.len() - 1];
    let grid = signal::uniform_grid(start, end, step_ms);
    SensorSeries {
        x: signal::interp_linear(&series.timestamps, &series.x, &grid),
        y: signal::interp_linear(&series.timestamps, &series.y, &grid),
        z: signal::interp_linear(&series.timestamps, &series.z, &grid),
        timestamps: grid,
    }
}

/// Build the (raw, calibrated, fs) triple for one sensor stream.
///
/// `fs` is the effective sampling rate in Hz, `None` when fewer than two
/// samples exist (no gap to measure). Requesting `decimation > 1` on such
/// a series is an `InsufficientData` error; factor 1 means no resampling
/// and no filtering.
pub fn build_sensor_series(
    calibration: &Calibration,
    bursts: &[SensorBurst],
    decimation: usize,
) -> Result<(SensorSeries, SensorSeries, Option<f64>), AnalysisError> {
    let raw = flatten_bursts(bursts);
    let mut data = calibrate_series(calibration, &raw);

    let mut fs = match signal::median_gap_ms(&raw.timestamps) {
        Some(gap) if gap > 0.0 => Some(1000.0 / gap),
        _ => None,
    };

    if decimation > 1 {
        let native_fs = fs.ok_or_else(|| {
            // fs is undefined both below two samples and when duplicate
            // timestamps drive the median gap to zero; report distinct
            // timestamps so the error names what was missing.
            let mut distinct = raw.timestamps.clone();
            distinct.dedup();
            AnalysisError::InsufficientData {
                got: distinct.len(),
                need: 2,
            }
        })?;

        let step_ms = (1000.0 / native_fs).round().max(1.0) as i64;
        let uniform = resample_uniform(&data, step_ms);
        data = SensorSeries {
            timestamps: uniform
                .timestamps
                .iter()
                .step_by(decimation)
                .copied()
                .collect(),
            x: signal::decimate(&uniform.x, decimation)?,
            y: signal::decimate(&uniform.y, decimation)?,
            z: signal::decimate(&uniform.z, decimation)?,
        };
        fs = Some(native_fs / decimation as f64);
    }

    Ok((raw, data, fs))
}
