//! Series filtering and resampling primitives.
//!
//! Raw inertial samples arrive in irregular wireless bursts, so rate
//! reduction is a three-step process: linear resampling onto a uniform
//! grid, zero-phase low-pass filtering (forward-backward, so no phase
//! distortion), then subsampling. The low-pass is a 5th-order digital
//! Butterworth realized in second-order sections for numeric stability.

use std::f64::consts::PI;

use nalgebra::Complex;

use crate::error::AnalysisError;

/// Order of the anti-alias filter used for decimation.
pub const DECIMATION_FILTER_ORDER: usize = 5;

/// One second-order filter section, `a0` normalized to 1.
#[derive(Clone, Copy, Debug)]
pub struct Sos {
    pub b: [f64; 3],
    pub a1: f64,
    pub a2: f64,
}

impl Sos {
    fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (1.0 + self.a1 + self.a2)
    }

    /// Steady-state filter state for a constant input `x0` (transposed
    /// direct form II). Seeding the state this way keeps the filter from
    /// ringing at the start of each pass.
    fn steady_state(&self, x0: f64) -> (f64, f64) {
        let k = self.dc_gain();
        let z1 = (k - self.b[0]) * x0;
        let z2 = (self.b[2] - self.a2 * k) * x0;
        (z1, z2)
    }
}

/// Digital Butterworth low-pass in second-order sections.
///
/// `cutoff` is normalized to the Nyquist frequency (1.0 = Nyquist) and
/// must lie strictly inside (0, 1). Poles of the analog prototype are
/// pre-warped and mapped through the bilinear transform; each section
/// carries its share of zeros at z = -1.
pub fn butter_lowpass(order: usize, cutoff: f64) -> Vec<Sos> {
    assert!(order >= 1, "filter order must be at least 1");
    assert!(
        cutoff > 0.0 && cutoff < 1.0,
        "normalized cutoff must be in (0, 1)"
    );

    let wc = (PI * cutoff / 2.0).tan();

    // Left-half-plane prototype poles on the unit circle, scaled to wc.
    let poles: Vec<Complex<f64>> = (0..order)
        .map(|k| {
            let alpha = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            Complex::new(-alpha.sin(), alpha.cos()) * wc
        })
        .collect();

    let mut sections = Vec::with_capacity(order.div_ceil(2));

    // Conjugate pairs (k, order-1-k) form biquads; a middle real pole
    // for odd orders becomes a degenerate first-order section.
    for k in 0..order / 2 {
        let p = poles[k];
        let one_minus_p = Complex::new(1.0, 0.0) - p;
        let z_pole = (Complex::new(1.0, 0.0) + p) / one_minus_p;
        let gain = wc * wc / one_minus_p.norm_sqr();
        sections.push(Sos {
            b: [gain, 2.0 * gain, gain],
            a1: -2.0 * z_pole.re,
            a2: z_pole.norm_sqr(),
        });
    }
    if order % 2 == 1 {
        let z_pole = (1.0 - wc) / (1.0 + wc);
        let gain = wc / (1.0 + wc);
        sections.push(Sos {
            b: [gain, gain, 0.0],
            a1: -z_pole,
            a2: 0.0,
        });
    }

    sections
}

/// Run the section cascade once over `x`, each section seeded with its
/// steady-state response to the first sample.
fn sosfilt_steady(sos: &[Sos], x: &[f64]) -> Vec<f64> {
    let mut data = x.to_vec();
    let mut level = match data.first() {
        Some(&v) => v,
        None => return data,
    };

    for section in sos {
        let (mut z1, mut z2) = section.steady_state(level);
        for value in data.iter_mut() {
            let x_n = *value;
            let y = section.b[0] * x_n + z1;
            z1 = section.b[1] * x_n - section.a1 * y + z2;
            z2 = section.b[2] * x_n - section.a2 * y;
            *value = y;
        }
        level *= section.dc_gain();
    }

    data
}

/// Zero-phase filtering: forward pass, backward pass, odd-symmetric edge
/// padding so the passes settle before touching real samples.
pub fn filtfilt(sos: &[Sos], x: &[f64]) -> Result<Vec<f64>, AnalysisError> {
    let pad = 3 * (2 * sos.len() + 1);
    if x.len() <= pad {
        return Err(AnalysisError::InsufficientData {
            got: x.len(),
            need: pad + 1,
        });
    }

    let n = x.len();
    let mut ext = Vec::with_capacity(n + 2 * pad);
    for i in (1..=pad).rev() {
        ext.push(2.0 * x[0] - x[i]);
    }
    ext.extend_from_slice(x);
    for i in 1..=pad {
        ext.push(2.0 * x[n - 1] - x[n - 1 - i]);
    }

    let forward = sosfilt_steady(sos, &ext);
    let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
    reversed = sosfilt_steady(sos, &reversed);
    reversed.reverse();

    Ok(reversed[pad..pad + n].to_vec())
}

/// Low-pass at `1/factor` of Nyquist (the post-decimation Nyquist), then
/// keep every `factor`-th sample. Input must already be uniformly spaced.
pub fn decimate(x: &[f64], factor: usize) -> Result<Vec<f64>, AnalysisError> {
    if factor <= 1 {
        return Ok(x.to_vec());
    }
    let sos = butter_lowpass(DECIMATION_FILTER_ORDER, 1.0 / factor as f64);
    let filtered = filtfilt(&sos, x)?;
    Ok(filtered.into_iter().step_by(factor).collect())
}

/// Median of consecutive-timestamp gaps; `None` below two samples.
/// Median rather than mean: robust to the occasional dropped or delayed
/// packet in wireless capture.
pub fn median_gap_ms(timestamps: &[i64]) -> Option<f64> {
    if timestamps.len() < 2 {
        return None;
    }
    let mut gaps: Vec<i64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    gaps.sort_unstable();
    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 1 {
        gaps[mid] as f64
    } else {
        (gaps[mid - 1] + gaps[mid]) as f64 / 2.0
    };
    Some(median)
}

/// Millisecond grid from `start` to at most `end`, inclusive, stepped at
/// `step_ms`.
pub fn uniform_grid(start: i64, end: i64, step_ms: i64) -> Vec<i64> {
    assert!(step_ms > 0, "grid step must be positive");
    let mut grid = Vec::new();
    let mut t = start;
    while t <= end {
        grid.push(t);
        t += step_ms;
    }
    grid
}

/// Linear interpolation of `(timestamps, values)` onto `grid`. Timestamps
/// must be non-decreasing and bracket every grid point.
pub fn interp_linear(timestamps: &[i64], values: &[f64], grid: &[i64]) -> Vec<f64> {
    debug_assert_eq!(timestamps.len(), values.len());

    let mut out = Vec::with_capacity(grid.len());
    let mut right = 0usize;
    for &t in grid {
        while right < timestamps.len() && timestamps[right] < t {
            right += 1;
        }
        if right == 0 {
            out.push(values[0]);
            continue;
        }
        if right == timestamps.len() {
            out.push(values[timestamps.len() - 1]);
            continue;
        }
        let (t0, t1) = (timestamps[right - 1], timestamps[right]);
        let (v0, v1) = (values[right - 1], values[right]);
        if t1 == t0 {
            out.push(v0);
        } else {
            let frac = (t - t0) as f64 / (t1 - t0) as f64;
            out.push(v0 + (v1 - v0) * frac);
        }
    }
    out
}
