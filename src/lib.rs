//! Statistics and signal-processing helpers for retinal physiology recordings.
//!
//! Recordings are `ndarray` arrays of `f64` whose last axis is time. In
//! trial-structured arrays the axis before it is trial and any axes in front
//! of those are grouping categories. NaN marks a missing sample.

pub mod correlation;
pub mod error;
pub mod filter;
pub mod masked;
pub mod normalize;
pub mod shape;
pub mod smooth;
pub mod trial;
pub mod window;

pub use correlation::{CorrMode, Pearson, corr, corr_mean, corr_pair, pearsonr, pearsonr_mask};
pub use error::{Error, Result};
pub use filter::{Butterworth, FilterKind, FilterParams, butter_hf, butter_lf};
pub use normalize::{normalize, rescale, zero_one};
pub use shape::SignalShape;
pub use smooth::smooth;
pub use trial::mean;
pub use window::{df_over_f, get_f, get_var, var_normalize};
