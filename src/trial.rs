use crate::error::{Error, Result};
use crate::masked::nan_mean_axis;
use crate::shape::select_trials;
use ndarray::{ArrayBase, ArrayD, Axis, Data, Dimension};

/// Missing-aware mean of a trial-structured array along `axis`.
///
/// With `use_half_trial` only the first half of the trials (rounded down) is
/// used. Lanes with no valid sample give NaN.
pub fn mean<S, D>(
    arr: &ArrayBase<S, D>,
    axis: usize,
    use_half_trial: bool,
) -> Result<ArrayD<f64>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let (arr, shape) = select_trials(arr.view().into_dyn(), use_half_trial)?;
    if axis >= shape.rank() {
        return Err(Error::InvalidAxis {
            axis,
            rank: shape.rank(),
        });
    }
    Ok(nan_mean_axis(&arr, Axis(axis)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, Array3, arr2};

    #[test]
    fn averages_over_requested_axis() {
        let arr = arr2(&[[1.0, 2.0, 3.0], [3.0, 4.0, 5.0]]);
        let over_trials = mean(&arr, 0, false).unwrap();
        assert_eq!(over_trials.shape(), &[3]);
        assert_abs_diff_eq!(over_trials[[0]], 2.0);
        assert_abs_diff_eq!(over_trials[[2]], 4.0);

        let over_time = mean(&arr, 1, false).unwrap();
        assert_abs_diff_eq!(over_time[[1]], 4.0);
    }

    #[test]
    fn half_trial_uses_first_trials_only() {
        // group x trial x time, trial k holds the value k
        let arr = Array3::from_shape_fn((4, 6, 10), |(_, k, _)| k as f64);
        let over_groups = mean(&arr, 0, true).unwrap();
        assert_eq!(over_groups.shape(), &[3, 10]);
        for k in 0..3 {
            assert_abs_diff_eq!(over_groups[[k, 0]], k as f64);
        }

        let over_trials = mean(&arr, 1, true).unwrap();
        assert_eq!(over_trials.shape(), &[4, 10]);
        assert_abs_diff_eq!(over_trials[[0, 0]], 1.0);
    }

    #[test]
    fn missing_values_are_excluded() {
        let arr = arr2(&[[1.0, f64::NAN], [f64::NAN, f64::NAN], [5.0, f64::NAN]]);
        let result = mean(&arr, 0, false).unwrap();
        assert_abs_diff_eq!(result[[0]], 3.0);
        assert!(result[[1]].is_nan());
    }

    #[test]
    fn rejects_bad_axis_and_rank() {
        let arr = Array2::<f64>::zeros((3, 4));
        assert!(matches!(
            mean(&arr, 2, false),
            Err(Error::InvalidAxis { axis: 2, rank: 2 })
        ));

        let flat = ndarray::Array1::<f64>::zeros(4);
        assert!(matches!(
            mean(&flat, 0, false),
            Err(Error::UnsupportedRank { rank: 1, .. })
        ));
    }
}
