//! Sliding-window baseline and variance estimators.
//!
//! The window around sample `i` covers `[i - w/2, i + w/2)` clipped to the
//! signal, so it shrinks near the edges. The baseline mean skips missing
//! samples; the variance does not.

use crate::error::Result;
use crate::masked::nan_mean;
use crate::shape::map_traces;
use ndarray::{Array, Array1, ArrayBase, ArrayView1, Data, Dimension, Ix1, Zip, s};

fn window(arr: ArrayView1<'_, f64>, i: usize, half_width: usize) -> ArrayView1<'_, f64> {
    let end = (i + half_width).min(arr.len());
    arr.slice_move(s![i.saturating_sub(half_width)..end])
}

/// Sliding missing-aware mean (baseline fluorescence F) of `arr` with window width `w`.
///
/// Windows with no valid sample give NaN, as does every sample when `w < 2`.
pub fn get_f<S>(arr: &ArrayBase<S, Ix1>, w: usize) -> Array1<f64>
where
    S: Data<Elem = f64>,
{
    let arr = arr.view();
    Array1::from_shape_fn(arr.len(), |i| nan_mean(window(arr, i, w / 2)))
}

/// Sliding population variance of `arr` with window width `w`.
///
/// Missing samples are not skipped: a window containing NaN gives NaN.
pub fn get_var<S>(arr: &ArrayBase<S, Ix1>, w: usize) -> Array1<f64>
where
    S: Data<Elem = f64>,
{
    let arr = arr.view();
    Array1::from_shape_fn(arr.len(), |i| window(arr, i, w / 2).var(0.0))
}

/// Relative change from the sliding baseline, `(x - F) / (|F| + 1)`, per trace.
///
/// Works on every trace (lane along the last axis) of an array of rank >= 1.
pub fn df_over_f<S, D>(arr: &ArrayBase<S, D>, w: usize) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    map_traces(arr, |trace| {
        let baseline = get_f(&trace, w);
        Ok(Zip::from(&trace)
            .and(&baseline)
            .map_collect(|&val, &f| (val - f) / (f.abs() + 1.0)))
    })
}

/// Divide every trace by its sliding standard deviation.
///
/// Samples whose window has zero variance become infinite or NaN.
pub fn var_normalize<S, D>(arr: &ArrayBase<S, D>, w: usize) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    map_traces(arr, |trace| {
        let var = get_var(&trace, w);
        Ok(Zip::from(&trace)
            .and(&var)
            .map_collect(|&val, &var| val / var.sqrt()))
    })
}
