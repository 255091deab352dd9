//! Pearson correlation across trials.
//!
//! Tables have one row per series pair (`pair` mode) or one row per series
//! (`mean` mode). Column 0 holds the coefficient, column 1 the two-sided
//! p-value.

use crate::error::{Error, Result};
use crate::masked::{joint_valid, nan_mean_axis};
use crate::shape::select_trials;
use ndarray::{Array2, Array3, ArrayBase, ArrayD, ArrayView1, ArrayView2, Axis, Data, Dimension};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::{fmt, str::FromStr};

/// Coefficient and two-sided p-value of a Pearson correlation test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pearson {
    pub r: f64,
    pub p_value: f64,
}

/// Pearson correlation of two equal-length series.
///
/// Constant input has no defined coefficient: both fields are NaN. So are
/// the fields of input holding infinite samples.
///
/// # Errors
/// Fails if the lengths differ or fewer than 2 samples are given.
pub fn pearsonr(a: &[f64], b: &[f64]) -> Result<Pearson> {
    let n_vals = a.len();
    if n_vals != b.len() {
        return Err(Error::LengthMismatch(n_vals, b.len()));
    }
    if n_vals < 2 {
        return Err(Error::InsufficientData {
            valid: n_vals,
            required: 2,
        });
    }

    if is_constant(a) || is_constant(b) {
        log::warn!("constant input, correlation coefficient is not defined");
        return Ok(Pearson {
            r: f64::NAN,
            p_value: f64::NAN,
        });
    }

    if n_vals == 2 {
        let r = (a[1] - a[0]).signum() * (b[1] - b[0]).signum();
        return Ok(Pearson { r, p_value: 1.0 });
    }

    let (unit_a, unit_b) = (centred_unit(a), centred_unit(b));
    let r = unit_a
        .iter()
        .zip(&unit_b)
        .map(|(&x, &y)| x * y)
        .sum::<f64>()
        .clamp(-1.0, 1.0);

    Ok(Pearson {
        r,
        p_value: two_sided_p_value(r, n_vals)?,
    })
}

fn is_constant(vals: &[f64]) -> bool {
    vals.iter().all(|&val| val == vals[0])
}

/// Centre `vals` and scale them to unit Euclidean norm.
///
/// Values are first divided by their largest magnitude so the sum of squares
/// stays representable for very small or very large data.
fn centred_unit(vals: &[f64]) -> Vec<f64> {
    let scale = vals.iter().fold(0.0_f64, |acc, &val| acc.max(val.abs()));
    let mean = vals.iter().map(|&val| val / scale).sum::<f64>() / vals.len() as f64;
    let centred: Vec<f64> = vals.iter().map(|&val| val / scale - mean).collect();
    let norm = centred.iter().map(|&val| val * val).sum::<f64>().sqrt();
    centred.into_iter().map(|val| val / norm).collect()
}

/// Student's t test of `r` with `n_vals - 2` degrees of freedom.
fn two_sided_p_value(r: f64, n_vals: usize) -> Result<f64> {
    if !r.is_finite() {
        return Ok(f64::NAN);
    }
    if r.abs() == 1.0 {
        return Ok(0.0);
    }
    let dof = (n_vals - 2) as f64;
    let t = r * (dof / (1.0 - r * r)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, dof).map_err(|err| Error::InvalidParameter {
        name: "degrees of freedom",
        reason: err.to_string(),
    })?;
    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Pearson correlation over the samples where neither series is missing.
///
/// # Errors
/// Fails if the lengths differ or fewer than 2 jointly valid samples remain.
pub fn pearsonr_mask(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Result<Pearson> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch(a.len(), b.len()));
    }
    let (a_valid, b_valid) = joint_valid(a, b);
    pearsonr(&a_valid, &b_valid)
}

/// Correlation table of every unordered pair of rows of `arr` (series x time).
///
/// Rows follow the order (0, 1), (0, 2), ..., (0, N-1), (1, 2), ..., (N-2, N-1).
pub fn corr_pair(arr: ArrayView2<f64>) -> Result<Array2<f64>> {
    let n_series = arr.nrows();
    let mut table = Array2::zeros((n_pairs(n_series), 2));
    let mut i_row = 0;
    for i_a in 0..n_series {
        for i_b in (i_a + 1)..n_series {
            let res = pearsonr_mask(arr.row(i_a), arr.row(i_b))?;
            table[[i_row, 0]] = res.r;
            table[[i_row, 1]] = res.p_value;
            i_row += 1;
        }
    }
    Ok(table)
}

/// Correlation table of every row of `arr` (series x time) against the
/// missing-aware mean of all rows.
pub fn corr_mean(arr: ArrayView2<f64>) -> Result<Array2<f64>> {
    let arr_mean = nan_mean_axis(&arr, Axis(0));
    let mut table = Array2::zeros((arr.nrows(), 2));
    for (series, mut row) in arr.outer_iter().zip(table.outer_iter_mut()) {
        let res = pearsonr_mask(series, arr_mean.view())?;
        row[0] = res.r;
        row[1] = res.p_value;
    }
    Ok(table)
}

fn n_pairs(n_series: usize) -> usize {
    n_series * n_series.saturating_sub(1) / 2
}

/// Which correlation table [`corr`] builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrMode {
    /// Every unordered pair of trials, see [`corr_pair`].
    Pair,
    /// Every trial against the trial mean, see [`corr_mean`].
    Mean,
}

impl CorrMode {
    /// Number of table rows produced for `n_series` series.
    pub fn n_rows(self, n_series: usize) -> usize {
        match self {
            CorrMode::Pair => n_pairs(n_series),
            CorrMode::Mean => n_series,
        }
    }

    fn table(self, arr: ArrayView2<f64>) -> Result<Array2<f64>> {
        match self {
            CorrMode::Pair => corr_pair(arr),
            CorrMode::Mean => corr_mean(arr),
        }
    }
}

impl FromStr for CorrMode {
    type Err = Error;

    fn from_str(mode: &str) -> Result<Self> {
        match mode {
            "pair" => Ok(CorrMode::Pair),
            "mean" => Ok(CorrMode::Mean),
            _ => Err(Error::InvalidMode(mode.to_string())),
        }
    }
}

impl fmt::Display for CorrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrMode::Pair => f.write_str("pair"),
            CorrMode::Mean => f.write_str("mean"),
        }
    }
}

/// Correlation tables of a trial-structured array of rank 2, 3 or 4.
///
/// The trailing (trial x time) block of every leading group is processed
/// independently. The result keeps the leading group axes and appends the
/// table axes, e.g. `(D1, D2, N, T)` in `pair` mode gives `(D1, D2, C, 2)`
/// with `C = N (N - 1) / 2`.
///
/// # Errors
/// Fails on unsupported ranks and on any group whose correlation fails.
pub fn corr<S, D>(
    arr: &ArrayBase<S, D>,
    mode: CorrMode,
    use_half_trial: bool,
) -> Result<ArrayD<f64>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let (arr, shape) = select_trials(arr.view().into_dyn(), use_half_trial)?;
    let n_rows = mode.n_rows(shape.n_trials());

    let blocks = arr.to_shape((shape.n_groups(), shape.n_trials(), shape.n_times()))?;
    let mut result = Array3::zeros((shape.n_groups(), n_rows, 2));
    for (block, mut table) in blocks.outer_iter().zip(result.outer_iter_mut()) {
        table.assign(&mode.table(block)?);
    }

    Ok(result.into_shape_with_order(shape.table_shape(n_rows, 2))?)
}
