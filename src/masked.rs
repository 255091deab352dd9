//! Missing-aware reductions.
//!
//! NaN marks a missing sample. Reductions skip missing samples and return NaN
//! only when nothing valid is left.

use ndarray::{Array, ArrayBase, ArrayView1, Axis, Data, Dimension, RemoveAxis};

/// Mean of the non-NaN values, or NaN if there are none.
pub fn nan_mean<'a, I>(vals: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let (sum, n_vals) = vals
        .into_iter()
        .filter(|val| !val.is_nan())
        .fold((0.0, 0usize), |(sum, n_vals), &val| (sum + val, n_vals + 1));
    if n_vals == 0 {
        return f64::NAN;
    }
    sum / n_vals as f64
}

/// [`nan_mean`] of every lane along `axis`.
///
/// The caller checks that `axis` is in bounds.
pub fn nan_mean_axis<S, D>(arr: &ArrayBase<S, D>, axis: Axis) -> Array<f64, D::Smaller>
where
    S: Data<Elem = f64>,
    D: Dimension + RemoveAxis,
{
    arr.map_axis(axis, |lane| nan_mean(lane.iter()))
}

/// Samples of `a` and `b` at the positions where neither is NaN.
pub fn joint_valid(a: ArrayView1<f64>, b: ArrayView1<f64>) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b.iter())
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .unzip()
}
