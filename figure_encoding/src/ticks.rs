// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tick placement for continuous axes.

use crate::scale::AxisTransform;

/// No axis gets more ticks than this, whatever its range.
const MAX_TICKS: f64 = 64.0;

/// Roughly `target` evenly spaced round values covering `[low, high]`.
///
/// Values are in transformed space. For [`AxisTransform::Log10`] the ticks sit
/// on integer powers of ten when the range spans at least one decade.
pub(crate) fn ticks(low: f64, high: f64, target: usize, transform: AxisTransform) -> Vec<f64> {
    if !(low.is_finite() && high.is_finite()) || high <= low {
        return Vec::new();
    }
    if transform == AxisTransform::Log10 && high - low >= 1.0 {
        return multiples(low, high, 1.0);
    }
    multiples(low, high, nice_step((high - low) / target.max(1) as f64))
}

/// The multiples of `step` in `[low, high]`.
///
/// Empty when `step` underflowed or overflowed, or when there would be more
/// than [`MAX_TICKS`] of them.
fn multiples(low: f64, high: f64, step: f64) -> Vec<f64> {
    if !(step.is_finite() && step > 0.0) {
        return Vec::new();
    }
    let first = (low / step).ceil();
    let last = (high / step).floor();
    if !(first.is_finite() && last.is_finite()) || last - first > MAX_TICKS {
        return Vec::new();
    }
    (first as i64..=last as i64).map(|i| i as f64 * step).collect()
}

/// Rounds `raw` up to 1, 2 or 5 times a power of ten.
fn nice_step(raw: f64) -> f64 {
    let magnitude = 10_f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}
