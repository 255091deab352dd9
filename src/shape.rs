use crate::error::{Error, Result};
use ndarray::{Array, Array1, ArrayBase, ArrayView1, ArrayViewD, Axis, Data, Dimension, Slice};

/// Layout of a trial-structured recording.
///
/// The last axis is time and the one before it is trial. Any axes in front
/// of those are independent grouping categories (cell, condition, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalShape {
    groups: Vec<usize>,
    n_trials: usize,
    n_times: usize,
}

impl SignalShape {
    /// Highest supported rank: two grouping axes plus trial and time.
    pub const MAX_RANK: usize = 4;

    /// Describe an array shape, rejecting ranks outside `2..=4`.
    pub fn of(shape: &[usize]) -> Result<Self> {
        let rank = shape.len();
        if !(2..=Self::MAX_RANK).contains(&rank) {
            return Err(Error::UnsupportedRank {
                rank,
                expected: "2..=4",
            });
        }
        Ok(Self {
            groups: shape[..rank - 2].to_vec(),
            n_trials: shape[rank - 2],
            n_times: shape[rank - 1],
        })
    }

    pub fn rank(&self) -> usize {
        self.groups.len() + 2
    }

    pub fn groups(&self) -> &[usize] {
        &self.groups
    }

    /// Number of independent (trial x time) blocks.
    pub fn n_groups(&self) -> usize {
        self.groups.iter().product()
    }

    pub fn n_trials(&self) -> usize {
        self.n_trials
    }

    pub fn n_times(&self) -> usize {
        self.n_times
    }

    pub fn trial_axis(&self) -> Axis {
        Axis(self.groups.len())
    }

    /// Shape of a per-group result table with `n_rows` rows and `n_cols` columns.
    pub fn table_shape(&self, n_rows: usize, n_cols: usize) -> Vec<usize> {
        let mut shape = self.groups.clone();
        shape.extend([n_rows, n_cols]);
        shape
    }
}

/// Restrict the trial axis to its first half (rounded down) when `use_half_trial` is set.
pub fn select_trials(
    arr: ArrayViewD<'_, f64>,
    use_half_trial: bool,
) -> Result<(ArrayViewD<'_, f64>, SignalShape)> {
    let mut shape = SignalShape::of(arr.shape())?;
    if !use_half_trial {
        return Ok((arr, shape));
    }

    shape.n_trials /= 2;
    let arr = arr.slice_axis_move(shape.trial_axis(), Slice::from(..shape.n_trials));
    Ok((arr, shape))
}

/// Apply `f` to every trace of `arr`, i.e. every lane along the trailing time axis.
pub(crate) fn map_traces<S, D, F>(arr: &ArrayBase<S, D>, mut f: F) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
    F: FnMut(ArrayView1<f64>) -> Result<Array1<f64>>,
{
    let rank = arr.ndim();
    if rank == 0 {
        return Err(Error::UnsupportedRank {
            rank,
            expected: "1..",
        });
    }

    let time_axis = Axis(rank - 1);
    let mut out = Array::zeros(arr.raw_dim());
    let traces = arr.lanes(time_axis).into_iter();
    for (trace, mut out_trace) in traces.zip(out.lanes_mut(time_axis)) {
        out_trace.assign(&f(trace)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, arr0, arr2};

    #[test]
    fn describes_rank_four() {
        let shape = SignalShape::of(&[2, 3, 6, 10]).unwrap();
        assert_eq!(shape.groups(), &[2, 3]);
        assert_eq!(shape.n_groups(), 6);
        assert_eq!(shape.n_trials(), 6);
        assert_eq!(shape.n_times(), 10);
        assert_eq!(shape.trial_axis(), Axis(2));
        assert_eq!(shape.table_shape(15, 2), vec![2, 3, 15, 2]);
    }

    #[test]
    fn rank_two_has_single_group() {
        let shape = SignalShape::of(&[5, 8]).unwrap();
        assert_eq!(shape.n_groups(), 1);
        assert_eq!(shape.table_shape(10, 2), vec![10, 2]);
    }

    #[test]
    fn rejects_unsupported_ranks() {
        for dims in [vec![7], vec![1, 2, 3, 4, 5]] {
            let err = SignalShape::of(&dims).unwrap_err();
            assert!(matches!(err, Error::UnsupportedRank { rank, .. } if rank == dims.len()));
        }
    }

    #[test]
    fn half_trial_rounds_down() {
        let arr = ArrayD::<f64>::zeros(vec![2, 7, 4]);
        let (view, shape) = select_trials(arr.view(), true).unwrap();
        assert_eq!(view.shape(), &[2, 3, 4]);
        assert_eq!(shape.n_trials(), 3);

        let (view, _) = select_trials(arr.view(), false).unwrap();
        assert_eq!(view.shape(), &[2, 7, 4]);
    }

    #[test]
    fn maps_every_trace() {
        let arr = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let out = map_traces(&arr, |trace| Ok(trace.mapv(|val| val - trace[0]))).unwrap();
        assert_eq!(out, arr2(&[[0.0, 1.0, 2.0], [0.0, 1.0, 2.0]]));

        assert!(matches!(
            map_traces(&arr0(1.0), |trace| Ok(trace.to_owned())),
            Err(Error::UnsupportedRank { rank: 0, .. })
        ));
    }
}
