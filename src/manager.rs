use crate::config::Config;
use anyhow::{Context, Result};
use glob::glob;
use ndarray::ArrayD;
use retinal::{CorrMode, SignalShape};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Statistics of one recording.
#[derive(Debug, Serialize, Deserialize)]
pub struct Results {
    /// Correlation table kind stored in `corr`.
    pub mode: CorrMode,
    /// Missing-aware mean over the trial axis.
    pub trial_mean: ArrayD<f64>,
    /// Correlation tables, one per group.
    pub corr: ArrayD<f64>,
}

pub struct Manager {
    data_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(data_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { data_dir, cfg })
    }

    pub fn preprocess_recordings(&self) -> Result<()> {
        let n_recs = self.count_recordings().context("failed to count recordings")?;
        for rec_idx in 0..n_recs {
            let rec_file = self.recording_file(rec_idx);
            let rec = load_array(&rec_file)
                .with_context(|| format!("failed to load {rec_file:?}"))?;

            let rec = self
                .preprocess(rec)
                .with_context(|| format!("failed to preprocess {rec_file:?}"))?;

            let out_file = self.preprocessed_file(rec_idx);
            save_array(&out_file, &rec)?;
            log::info!("preprocessed {rec_file:?} into {out_file:?}");
        }

        Ok(())
    }

    pub fn analyze_recordings(&self) -> Result<()> {
        let n_recs = self.count_recordings().context("failed to count recordings")?;
        for rec_idx in 0..n_recs {
            let mut rec_file = self.preprocessed_file(rec_idx);
            if !rec_file.is_file() {
                rec_file = self.recording_file(rec_idx);
            }
            let rec = load_array(&rec_file)
                .with_context(|| format!("failed to load {rec_file:?}"))?;

            let results = self
                .analyze(&rec)
                .with_context(|| format!("failed to analyze {rec_file:?}"))?;

            let out_file = self.results_file(rec_idx);
            let file =
                File::create(&out_file).with_context(|| format!("failed to create {out_file:?}"))?;
            let mut writer = BufWriter::new(file);
            encode::write(&mut writer, &results).context("failed to serialize results")?;
            writer.flush().context("failed to flush writer stream")?;
            log::info!("analyzed {rec_file:?} into {out_file:?}");
        }

        Ok(())
    }

    pub fn clean_outputs(&self) -> Result<()> {
        for pattern in ["preprocessed-*.msgpack", "results-*.msgpack"] {
            for file in self.glob_files(pattern)? {
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }

        Ok(())
    }

    fn preprocess(&self, mut rec: ArrayD<f64>) -> Result<ArrayD<f64>> {
        let prep = &self.cfg.preprocess;
        if prep.highpass {
            rec = retinal::butter_hf(&rec, self.cfg.filter.highpass())
                .context("failed to apply highpass filter")?;
        }
        if prep.lowpass {
            rec = retinal::butter_lf(&rec, self.cfg.filter.lowpass())
                .context("failed to apply lowpass filter")?;
        }
        if prep.df_over_f {
            rec = retinal::df_over_f(&rec, prep.window).context("failed to compute dF/F")?;
        }
        Ok(rec)
    }

    fn analyze(&self, rec: &ArrayD<f64>) -> Result<Results> {
        let ana = &self.cfg.analysis;
        let shape = SignalShape::of(rec.shape()).context("invalid recording shape")?;

        let trial_mean = retinal::mean(rec, shape.trial_axis().index(), ana.use_half_trial)
            .context("failed to compute trial mean")?;
        let corr = retinal::corr(rec, ana.mode, ana.use_half_trial)
            .context("failed to compute correlations")?;

        Ok(Results {
            mode: ana.mode,
            trial_mean,
            corr,
        })
    }

    fn glob_files(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = self.data_dir.join(pattern);
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let files = glob(pattern)
            .context("failed to glob files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        Ok(files)
    }

    fn count_recordings(&self) -> Result<usize> {
        Ok(self.glob_files("recording-*.msgpack")?.len())
    }

    fn recording_file(&self, rec_idx: usize) -> PathBuf {
        self.data_dir.join(format!("recording-{rec_idx:04}.msgpack"))
    }

    fn preprocessed_file(&self, rec_idx: usize) -> PathBuf {
        self.data_dir
            .join(format!("preprocessed-{rec_idx:04}.msgpack"))
    }

    fn results_file(&self, rec_idx: usize) -> PathBuf {
        self.data_dir.join(format!("results-{rec_idx:04}.msgpack"))
    }
}

fn load_array<P: AsRef<Path>>(file: P) -> Result<ArrayD<f64>> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let arr = decode::from_read(&mut reader).context("failed to deserialize array")?;
    Ok(arr)
}

fn save_array<P: AsRef<Path>>(file: P, arr: &ArrayD<f64>) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, arr).context("failed to serialize array")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}
