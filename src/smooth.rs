use crate::error::{Error, Result};
use crate::shape::map_traces;
use ndarray::{Array, Array1, ArrayBase, ArrayView1, Data, Dimension};

/// Kernel half-width in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Gaussian smoothing of every trace of `arr` with standard deviation `sigma` (in samples).
///
/// The signal is extended by mirror reflection past its edges
/// (`d c b a | a b c d | d c b a`).
///
/// # Errors
/// Fails if `sigma` is not a positive finite number or `arr` is zero-dimensional.
pub fn smooth<S, D>(arr: &ArrayBase<S, D>, sigma: f64) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let kernel = gaussian_kernel(sigma)?;
    map_traces(arr, |trace| Ok(convolve_reflect(trace, &kernel)))
}

fn gaussian_kernel(sigma: f64) -> Result<Array1<f64>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "sigma",
            reason: format!("must be positive and finite, but is {sigma}"),
        });
    }

    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let mut kernel = Array1::from_iter(
        (-radius..=radius).map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp()),
    );
    let sum = kernel.sum();
    kernel /= sum;
    Ok(kernel)
}

fn reflect_index(idx: i64, len: i64) -> usize {
    let period = 2 * len;
    let idx = idx.rem_euclid(period);
    (if idx < len { idx } else { period - 1 - idx }) as usize
}

fn convolve_reflect(trace: ArrayView1<f64>, kernel: &Array1<f64>) -> Array1<f64> {
    let len = trace.len() as i64;
    let radius = (kernel.len() / 2) as i64;
    Array1::from_shape_fn(trace.len(), |i| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, &weight)| {
                let idx = i as i64 + k as i64 - radius;
                weight * trace[reflect_index(idx, len)]
            })
            .sum()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, arr1};

    #[test]
    fn kernel_is_normalized_and_truncated() {
        let kernel = gaussian_kernel(1.0).unwrap();
        assert_eq!(kernel.len(), 9);
        assert_abs_diff_eq!(kernel.sum(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(kernel[4], 0.39894346935609776, epsilon = 1e-12);
    }

    #[test]
    fn reflects_past_both_edges() {
        let idxs: Vec<_> = (-5..9).map(|idx| reflect_index(idx, 4)).collect();
        assert_eq!(idxs, vec![3, 3, 2, 1, 0, 0, 1, 2, 3, 3, 2, 1, 0, 0]);
    }

    #[test]
    fn preserves_constant_and_total_mass() {
        let arr = Array1::from_elem(20, 3.0);
        for val in smooth(&arr, 2.5).unwrap() {
            assert_abs_diff_eq!(val, 3.0, epsilon = 1e-12);
        }

        let mut impulse = Array1::<f64>::zeros(41);
        impulse[20] = 1.0;
        let out = smooth(&impulse, 1.5).unwrap();
        assert_abs_diff_eq!(out.sum(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[18], out[22], epsilon = 1e-15);
        assert!(out[20] > out[19]);
    }

    #[test]
    fn impulse_folds_back_at_edges() {
        let out = smooth(&arr1(&[0.0, 0.0, 1.0, 0.0, 0.0]), 1.0).unwrap();
        let exp = [
            0.05842298904073567,
            0.24210527628121548,
            0.39894346935609776,
            0.24210527628121548,
            0.05842298904073567,
        ];
        for (val, exp) in out.iter().zip(exp) {
            assert_abs_diff_eq!(*val, exp, epsilon = 1e-12);
        }
    }

    #[test]
    fn smooths_along_last_axis() {
        let arr = Array2::from_shape_fn((2, 30), |(i, t)| if t % 3 == i { 1.0 } else { 0.0 });
        let out = smooth(&arr, 0.8).unwrap();
        for (i, trace) in arr.outer_iter().enumerate() {
            assert_eq!(out.row(i), smooth(&trace, 0.8).unwrap());
        }
    }

    #[test]
    fn rejects_bad_sigma() {
        let arr = arr1(&[1.0, 2.0]);
        for sigma in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                smooth(&arr, sigma),
                Err(Error::InvalidParameter { name: "sigma", .. })
            ));
        }
    }
}
