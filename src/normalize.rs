//! Whole-array rescaling.
//!
//! Statistics are taken over the flattened array, never per axis. Degenerate
//! input (zero spread) yields NaN or infinity rather than an error.

use ndarray::{Array, ArrayBase, Data, Dimension};

/// Z-score copy of `arr`, using the population standard deviation.
pub fn normalize<S, D>(arr: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let mut temp = arr.to_owned();
    let mean = temp.mean().unwrap_or(f64::NAN);
    temp -= mean;
    let std_dev = temp.std(0.0);
    temp /= std_dev;
    temp
}

/// Copy of `arr` linearly mapped so its minimum is 0 and its maximum is 1.
///
/// A constant array has zero range and maps to NaN.
pub fn zero_one<S, D>(arr: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let mut temp = arr.to_owned();
    let min = temp.iter().copied().fold(f64::INFINITY, propagating_min);
    temp -= min;
    let max = temp.iter().copied().fold(f64::NEG_INFINITY, propagating_max);
    temp /= max;
    temp
}

/// Map 8-bit stimulus intensities from `[0, 255]` onto `[-1, 1]`.
pub fn rescale<S, D>(arr: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    arr.mapv(|val| (val / 255.0 - 0.5) * 2.0)
}

// NaN anywhere makes the extremum NaN.
fn propagating_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

fn propagating_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}
