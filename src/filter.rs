//! Butterworth filters applied forward and backward (zero phase).

use crate::error::{Error, Result};
use crate::shape::map_traces;
use ndarray::{Array, Array1, ArrayBase, ArrayView1, Data, Dimension, s};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Pass band of a [`Butterworth`] filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Lowpass,
    Highpass,
}

/// Order, critical frequency and sampling rate of a filter.
///
/// `cutoff` and `fs` share the same unit (usually Hz).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub order: usize,
    pub cutoff: f64,
    pub fs: f64,
}

impl FilterParams {
    /// 6 Hz lowpass for 30 Hz imaging, order 3.
    pub fn lowpass_default() -> Self {
        Self {
            order: 3,
            cutoff: 6.0,
            fs: 30.0,
        }
    }

    /// 0.04 Hz highpass (slow drift removal) for 30 Hz imaging, order 3.
    pub fn highpass_default() -> Self {
        Self {
            order: 3,
            cutoff: 0.04,
            fs: 30.0,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.order == 0 {
            return Err(Error::InvalidParameter {
                name: "filter order",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "sampling rate",
                reason: format!("must be positive and finite, but is {}", self.fs),
            });
        }
        let nyquist = self.fs / 2.0;
        if !(self.cutoff > 0.0 && self.cutoff < nyquist) {
            return Err(Error::InvalidParameter {
                name: "cutoff frequency",
                reason: format!("must be in (0, {nyquist}), but is {}", self.cutoff),
            });
        }
        Ok(())
    }
}

/// Digital Butterworth filter in transfer-function form, normalized so `a[0] == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Butterworth {
    b: Array1<f64>,
    a: Array1<f64>,
}

impl Butterworth {
    /// Design the filter with the bilinear transform and frequency pre-warping.
    ///
    /// # Errors
    /// Fails if the order is 0 or the cutoff is not strictly between 0 and `fs / 2`.
    pub fn design(kind: FilterKind, params: FilterParams) -> Result<Self> {
        params.validate()?;
        let order = params.order;

        // Analog prototype with unit cutoff, poles on the left half of the unit circle.
        let proto_poles: Vec<Complex64> = (0..order)
            .map(|k| {
                let m = 2.0 * k as f64 - (order as f64 - 1.0);
                -Complex64::from_polar(1.0, PI * m / (2.0 * order as f64))
            })
            .collect();

        // Designed at a normalized sampling rate of 2, where Nyquist is 1.
        const FS_NORM: f64 = 2.0;
        let wn = params.cutoff / (params.fs / 2.0);
        let warped = 2.0 * FS_NORM * (PI * wn / FS_NORM).tan();

        let (zeros, poles, gain) = match kind {
            FilterKind::Lowpass => {
                let poles = proto_poles.iter().map(|&p| p * warped).collect::<Vec<_>>();
                (Vec::new(), poles, warped.powi(order as i32))
            }
            FilterKind::Highpass => {
                let poles = proto_poles.iter().map(|&p| warped / p).collect::<Vec<_>>();
                let gain = (1.0 / proto_poles.iter().map(|&p| -p).product::<Complex64>()).re;
                (vec![Complex64::new(0.0, 0.0); order], poles, gain)
            }
        };

        let (zeros, poles, gain) = bilinear(&zeros, &poles, gain, FS_NORM);
        let b = Array1::from_iter(poly(&zeros).into_iter().map(|c| gain * c.re));
        let a = Array1::from_iter(poly(&poles).into_iter().map(|c| c.re));
        log::debug!("designed {kind:?} filter {params:?}: b = {b}, a = {a}");

        Ok(Self { b, a })
    }

    /// Numerator coefficients.
    pub fn b(&self) -> ArrayView1<'_, f64> {
        self.b.view()
    }

    /// Denominator coefficients.
    pub fn a(&self) -> ArrayView1<'_, f64> {
        self.a.view()
    }

    /// Number of samples added on each side of a trace before filtering.
    pub fn pad_len(&self) -> usize {
        3 * self.b.len().max(self.a.len())
    }

    /// Zero-phase filtering of every trace (lane along the last axis) of `arr`.
    ///
    /// Traces are extended by odd reflection of [`Self::pad_len`] samples on
    /// each side and the filter state starts at its steady-state response to
    /// the first sample.
    ///
    /// # Errors
    /// Fails if a trace is not longer than [`Self::pad_len`].
    pub fn filtfilt<S, D>(&self, arr: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        map_traces(arr, |trace| self.filtfilt_trace(trace))
    }

    fn filtfilt_trace(&self, trace: ArrayView1<f64>) -> Result<Array1<f64>> {
        let n_times = trace.len();
        let pad_len = self.pad_len();
        if n_times <= pad_len {
            return Err(Error::InsufficientData {
                valid: n_times,
                required: pad_len + 1,
            });
        }

        let ext = odd_extend(trace, pad_len);
        let zi = self.steady_state();

        let mut y = self.lfilter(ext.iter().copied(), &zi, ext[0]);
        y.reverse();
        let y_first = y[0];
        let mut y = self.lfilter(y.into_iter(), &zi, y_first);
        y.reverse();

        Ok(Array1::from_iter(y.into_iter().skip(pad_len).take(n_times)))
    }

    /// Direct form II transposed, starting from state `zi * x0`.
    fn lfilter<I>(&self, x: I, zi: &[f64], x0: f64) -> Vec<f64>
    where
        I: ExactSizeIterator<Item = f64>,
    {
        let (b, a) = (&self.b, &self.a);
        let n_state = zi.len();
        let mut z: Vec<f64> = zi.iter().map(|&val| val * x0).collect();
        let mut y = Vec::with_capacity(x.len());
        for xi in x {
            let yi = b[0] * xi + z[0];
            for j in 0..n_state - 1 {
                z[j] = b[j + 1] * xi - a[j + 1] * yi + z[j + 1];
            }
            z[n_state - 1] = b[n_state] * xi - a[n_state] * yi;
            y.push(yi);
        }
        y
    }

    /// Filter state after an infinitely long unit step.
    fn steady_state(&self) -> Vec<f64> {
        let (b, a) = (&self.b, &self.a);
        let n_state = a.len() - 1;
        let b_diff_sum: f64 = (1..=n_state).map(|k| b[k] - a[k] * b[0]).sum();

        let mut zi = vec![0.0; n_state];
        zi[0] = b_diff_sum / a.sum();
        let (mut a_sum, mut c_sum) = (1.0, 0.0);
        for k in 1..n_state {
            a_sum += a[k];
            c_sum += b[k] - a[k] * b[0];
            zi[k] = a_sum * zi[0] - c_sum;
        }
        zi
    }
}

/// Map analog zeros and poles onto the z-plane, sending zeros at infinity to -1.
fn bilinear(
    zeros: &[Complex64],
    poles: &[Complex64],
    gain: f64,
    fs: f64,
) -> (Vec<Complex64>, Vec<Complex64>, f64) {
    let fs2 = 2.0 * fs;
    let mut zeros_d: Vec<_> = zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
    let poles_d = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    zeros_d.resize(poles.len(), Complex64::new(-1.0, 0.0));

    let num: Complex64 = zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex64 = poles.iter().map(|&p| fs2 - p).product();
    (zeros_d, poles_d, gain * (num / den).re)
}

/// Coefficients of the monic polynomial with the given roots, highest power first.
fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coefs = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        coefs.push(Complex64::new(0.0, 0.0));
        for i in (1..coefs.len()).rev() {
            let prev = coefs[i - 1];
            coefs[i] -= root * prev;
        }
    }
    coefs
}

fn odd_extend(trace: ArrayView1<f64>, pad_len: usize) -> Array1<f64> {
    let n_times = trace.len();
    let (first, last) = (trace[0], trace[n_times - 1]);
    let left = trace.slice(s![1..=pad_len; -1]).mapv(|val| 2.0 * first - val);
    let right = trace
        .slice(s![n_times - 1 - pad_len..n_times - 1; -1])
        .mapv(|val| 2.0 * last - val);
    left.iter()
        .chain(trace.iter())
        .chain(right.iter())
        .copied()
        .collect()
}

/// Zero-phase Butterworth lowpass along the last axis of `arr`.
pub fn butter_lf<S, D>(arr: &ArrayBase<S, D>, params: FilterParams) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    Butterworth::design(FilterKind::Lowpass, params)?.filtfilt(arr)
}

/// Zero-phase Butterworth highpass along the last axis of `arr`.
pub fn butter_hf<S, D>(arr: &ArrayBase<S, D>, params: FilterParams) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    Butterworth::design(FilterKind::Highpass, params)?.filtfilt(arr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, arr1};

    fn assert_coefs(coefs: ArrayView1<f64>, exp: &[f64]) {
        assert_eq!(coefs.len(), exp.len());
        for (&val, &exp) in coefs.iter().zip(exp) {
            assert_abs_diff_eq!(val, exp, epsilon = 1e-8);
        }
    }

    fn sine(n_times: usize, freq: f64, fs: f64) -> Array1<f64> {
        Array1::from_shape_fn(n_times, |t| (2.0 * PI * freq * t as f64 / fs).sin())
    }

    #[test]
    fn lowpass_coefficients() {
        let filter = Butterworth::design(FilterKind::Lowpass, FilterParams::lowpass_default())
            .unwrap();
        assert_coefs(filter.b(), &[0.09853116, 0.29559348, 0.29559348, 0.09853116]);
        assert_coefs(filter.a(), &[1.0, -0.57724052, 0.42178705, -0.05629724]);

        let params = FilterParams {
            order: 2,
            cutoff: 3.75,
            fs: 30.0,
        };
        let filter = Butterworth::design(FilterKind::Lowpass, params).unwrap();
        assert_coefs(filter.b(), &[0.09763107, 0.19526215, 0.09763107]);
        assert_coefs(filter.a(), &[1.0, -0.94280904, 0.33333333]);
    }

    #[test]
    fn highpass_coefficients() {
        let filter = Butterworth::design(FilterKind::Highpass, FilterParams::highpass_default())
            .unwrap();
        assert_coefs(filter.b(), &[0.99165739, -2.97497217, 2.97497217, -0.99165739]);
        assert_coefs(filter.a(), &[1.0, -2.98324489, 2.96662985, -0.98338438]);
    }

    #[test]
    fn highpass_blocks_dc_and_passes_nyquist() {
        let filter = Butterworth::design(FilterKind::Highpass, FilterParams::highpass_default())
            .unwrap();
        assert_abs_diff_eq!(filter.b().sum(), 0.0, epsilon = 1e-12);

        let alternating = |c: ArrayView1<f64>| -> f64 {
            c.iter()
                .enumerate()
                .map(|(i, &v)| if i % 2 == 0 { v } else { -v })
                .sum()
        };
        let gain = alternating(filter.b()) / alternating(filter.a());
        assert_abs_diff_eq!(gain, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn lowpass_keeps_dc() {
        let filter = Butterworth::design(FilterKind::Lowpass, FilterParams::lowpass_default())
            .unwrap();
        assert_abs_diff_eq!(filter.b().sum() / filter.a().sum(), 1.0, epsilon = 1e-12);

        let constant = Array1::from_elem(100, 2.5);
        for val in filter.filtfilt(&constant).unwrap() {
            assert_abs_diff_eq!(val, 2.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn lowpass_removes_fast_component_without_shift() {
        let fs = 30.0;
        let slow = sine(600, 0.5, fs);
        let noisy = &slow + &(sine(600, 12.0, fs) * 0.5);
        let out = butter_lf(&noisy, FilterParams::lowpass_default()).unwrap();
        assert_eq!(out.len(), 600);
        for t in 50..550 {
            assert_abs_diff_eq!(out[t], slow[t], epsilon = 0.02);
        }
    }

    #[test]
    fn highpass_removes_offset() {
        let fs = 30.0;
        let params = FilterParams {
            order: 3,
            cutoff: 0.5,
            fs,
        };
        let signal = sine(900, 3.0, fs) + 10.0;
        let out = butter_hf(&signal, params).unwrap();
        let mean = out.slice(s![100..800]).mean().unwrap();
        assert_abs_diff_eq!(mean, 0.0, epsilon = 0.05);
    }

    #[test]
    fn filters_every_trace() {
        let arr = Array2::from_shape_fn((3, 80), |(i, t)| ((t + 7 * i) as f64 * 0.4).sin());
        let out = butter_lf(&arr, FilterParams::lowpass_default()).unwrap();
        for (i, trace) in arr.outer_iter().enumerate() {
            assert_eq!(out.row(i), butter_lf(&trace, FilterParams::lowpass_default()).unwrap());
        }
    }

    #[test]
    fn odd_extension_mirrors_about_end_points() {
        let ext = odd_extend(arr1(&[1.0, 2.0, 4.0, 7.0]).view(), 2);
        assert_eq!(ext, arr1(&[-2.0, 0.0, 1.0, 2.0, 4.0, 7.0, 10.0, 12.0]));
    }

    #[test]
    fn short_traces_fail() {
        let arr = Array1::<f64>::zeros(12);
        assert!(matches!(
            butter_lf(&arr, FilterParams::lowpass_default()),
            Err(Error::InsufficientData { valid: 12, required: 13 })
        ));
    }

    #[test]
    fn rejects_bad_parameters() {
        for (order, cutoff, fs) in [(0, 6.0, 30.0), (3, 15.0, 30.0), (3, 0.0, 30.0), (3, 1.0, -1.0)]
        {
            let params = FilterParams { order, cutoff, fs };
            assert!(matches!(
                Butterworth::design(FilterKind::Lowpass, params),
                Err(Error::InvalidParameter { .. })
            ));
        }
    }
}
