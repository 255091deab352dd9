use anyhow::{Context, Result, bail};
use retinal::{CorrMode, FilterParams};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Batch analysis configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Per-trace preprocessing steps.
    pub preprocess: PreprocessConfig,

    /// Butterworth filter settings.
    pub filter: FilterConfig,

    /// Trial statistics settings.
    pub analysis: AnalysisConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Remove slow drift with the highpass filter.
    pub highpass: bool,
    /// Remove fast noise with the lowpass filter.
    pub lowpass: bool,
    /// Convert to relative change from the sliding baseline.
    pub df_over_f: bool,
    /// Sliding baseline window width (samples).
    pub window: usize,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Sampling rate (Hz).
    pub fs: f64,
    /// Filter order.
    pub order: usize,
    /// Lowpass cutoff frequency (Hz).
    pub low_cutoff: f64,
    /// Highpass cutoff frequency (Hz).
    pub high_cutoff: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Correlation table to build.
    pub mode: CorrMode,
    /// Only use the first half of the trials.
    pub use_half_trial: bool,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        check_num(self.preprocess.window, 2..1_000_000).context("invalid window width")?;

        let fs = self.filter.fs;
        check_num(fs, f64::MIN_POSITIVE..1e6).context("invalid sampling rate")?;
        check_num(self.filter.order, 1..=10).context("invalid filter order")?;
        let nyquist = fs / 2.0;
        check_num(self.filter.low_cutoff, f64::MIN_POSITIVE..nyquist)
            .context("invalid lowpass cutoff")?;
        check_num(self.filter.high_cutoff, f64::MIN_POSITIVE..nyquist)
            .context("invalid highpass cutoff")?;

        Ok(())
    }
}

impl FilterConfig {
    pub fn lowpass(&self) -> FilterParams {
        FilterParams {
            order: self.order,
            cutoff: self.low_cutoff,
            fs: self.fs,
        }
    }

    pub fn highpass(&self) -> FilterParams {
        FilterParams {
            order: self.order,
            cutoff: self.high_cutoff,
            fs: self.fs,
        }
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
