//! Settings for a sweep.
//!
//! Uses `figment` for layered configuration: built-in defaults -> `seqsweep.toml`
//! in the working directory -> environment variables prefixed `SEQSWEEP_`
//! (nested keys separated by `__`, e.g. `SEQSWEEP_AXES__NUM_PHASES=[2,4]`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "seqsweep.toml";

/// Top-level sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Candidate values for every sweep axis.
    #[serde(default)]
    pub axes: SweepAxes,
    /// Directory the generator writes input files into.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory for the summary and per-run traces.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Directory holding the structural configuration files.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    /// Expand the template per category count instead of loading the list.
    #[serde(default = "default_true")]
    pub use_config_template: bool,
    /// 0 = quiet, 1 = progress per run, 2 = per-step events.
    #[serde(default)]
    pub verbosity: u8,
    /// Points per category sequence in generated data.
    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,
    /// Seed for the data generator and stage initialisation.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Trace series whose final value is the headline accuracy.
    #[serde(default = "default_metric_series")]
    pub metric_series: String,
    /// Stop the sweep at the first failed run instead of carrying on.
    #[serde(default)]
    pub abort_on_run_error: bool,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            axes: SweepAxes::default(),
            data_dir: default_data_dir(),
            results_dir: default_results_dir(),
            config_dir: default_config_dir(),
            use_config_template: true,
            verbosity: 0,
            sequence_length: default_sequence_length(),
            seed: default_seed(),
            metric_series: default_metric_series(),
            abort_on_run_error: false,
        }
    }
}

/// Candidate values of each sweep axis. The structural configuration axis is
/// loaded from files and is not listed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepAxes {
    #[serde(default = "default_signal_types")]
    pub signal_types: Vec<String>,
    #[serde(default = "default_noise_amplitudes")]
    pub white_noise_amplitudes: Vec<f64>,
    #[serde(default = "default_signal_means")]
    pub signal_means: Vec<f64>,
    #[serde(default = "default_signal_amplitudes")]
    pub signal_amplitudes: Vec<f64>,
    #[serde(default = "default_num_categories")]
    pub num_categories: Vec<usize>,
    #[serde(default = "default_num_reps")]
    pub num_reps: Vec<usize>,
    #[serde(default = "default_num_phases")]
    pub num_phases: Vec<usize>,
    #[serde(default = "default_noise_lengths")]
    pub noise_lengths: Vec<Vec<usize>>,
}

impl Default for SweepAxes {
    fn default() -> Self {
        Self {
            signal_types: default_signal_types(),
            white_noise_amplitudes: default_noise_amplitudes(),
            signal_means: default_signal_means(),
            signal_amplitudes: default_signal_amplitudes(),
            num_categories: default_num_categories(),
            num_reps: default_num_reps(),
            num_phases: default_num_phases(),
            noise_lengths: default_noise_lengths(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("config")
}

fn default_sequence_length() -> usize {
    20
}

fn default_seed() -> u64 {
    42
}

fn default_metric_series() -> String {
    "test_classification_accuracy".to_string()
}

fn default_signal_types() -> Vec<String> {
    vec!["binary".to_string(), "sine".to_string()]
}

fn default_noise_amplitudes() -> Vec<f64> {
    vec![0.0, 1.0]
}

fn default_signal_means() -> Vec<f64> {
    vec![0.0]
}

fn default_signal_amplitudes() -> Vec<f64> {
    vec![1.0]
}

fn default_num_categories() -> Vec<usize> {
    vec![3]
}

fn default_num_reps() -> Vec<usize> {
    vec![10]
}

fn default_num_phases() -> Vec<usize> {
    vec![4]
}

fn default_noise_lengths() -> Vec<Vec<usize>> {
    vec![vec![0]]
}

/// Load settings from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `SEQSWEEP_`)
/// 2. `seqsweep.toml` in `workspace`, if present
/// 3. Built-in defaults
pub fn load_settings(workspace: Option<&Path>) -> Result<SweepSettings, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(SweepSettings::default()));

    if let Some(ws) = workspace {
        let file = ws.join(SETTINGS_FILE);
        if file.exists() {
            figment = figment.merge(Toml::file(&file));
        }
    }

    figment = figment.merge(Env::prefixed("SEQSWEEP_").split("__"));

    let settings: SweepSettings = figment.extract().map_err(Box::new)?;
    settings.validate()?;
    Ok(settings)
}

impl SweepSettings {
    /// Resolve relative directories against `workspace`.
    pub fn resolve_paths(mut self, workspace: &Path) -> Self {
        for dir in [&mut self.data_dir, &mut self.results_dir, &mut self.config_dir] {
            if dir.is_relative() {
                *dir = workspace.join(&*dir);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sequence_length == 0 {
            return Err(ConfigError::InvalidValue {
                section: SETTINGS_FILE.into(),
                key: "sequence_length".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.metric_series.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                section: SETTINGS_FILE.into(),
                key: "metric_series".into(),
                message: "must name a trace series".into(),
            });
        }
        Ok(())
    }
}
