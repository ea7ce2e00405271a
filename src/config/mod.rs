//! Pipeline configuration
//!
//! Defaults reproduce the dimer/trimer analysis. A `key = value` config file
//! and command-line flags are layered on top by the binary.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::io::score_paths;
use crate::pnear::PnearParams;

/// Errors that can occur while building a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown preset: {0} (expected dimer-trimer or dimer-pentamer)")]
    UnknownPreset(String),

    #[error("No conditions configured")]
    NoConditions,

    #[error("Run label is empty")]
    EmptyLabel,
}

/// Named sets of oligomeric conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    DimerTrimer,
    DimerPentamer,
}

impl Preset {
    pub fn oligomers(&self) -> &'static [u32] {
        match self {
            Preset::DimerTrimer => &[2, 3],
            Preset::DimerPentamer => &[2, 5],
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dimer-trimer" | "d2" => Ok(Preset::DimerTrimer),
            "dimer-pentamer" | "d4" => Ok(Preset::DimerPentamer),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::DimerTrimer => write!(f, "dimer-trimer"),
            Preset::DimerPentamer => write!(f, "dimer-pentamer"),
        }
    }
}

/// Display name of an oligomeric state
pub fn oligomer_name(n: u32) -> String {
    match n {
        1 => "Monomer".to_string(),
        2 => "Dimer".to_string(),
        3 => "Trimer".to_string(),
        4 => "Tetramer".to_string(),
        5 => "Pentamer".to_string(),
        6 => "Hexamer".to_string(),
        7 => "Heptamer".to_string(),
        8 => "Octamer".to_string(),
        _ => format!("{}-mer", n),
    }
}

/// One oligomeric condition and its pair of score files
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    /// Oligomer size, also the directory name
    pub label: u32,
    pub name: String,
    pub global_path: PathBuf,
    pub local_path: PathBuf,
}

impl Condition {
    /// Condition for oligomer size `n` using the `{n}/score.sc` and
    /// `{n}/LOCAL/score.sc` layout under `run_dir`
    pub fn for_oligomer(run_dir: &Path, n: u32) -> Self {
        let (global_path, local_path) = score_paths(run_dir, n);
        Self {
            label: n,
            name: oligomer_name(n),
            global_path,
            local_path,
        }
    }
}

/// Everything the pipeline needs to run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Embedded in output file names and the plot title
    pub run_label: String,

    pub run_dir: PathBuf,
    pub out_dir: PathBuf,
    pub oligomers: Vec<u32>,

    /// Energy-like column used by Pnear and the funnel y axis
    pub score_column: String,

    /// Distance-like column used by Pnear and the funnel x axis
    pub distance_column: String,

    /// Column used to color global models in the funnel plot
    pub color_column: String,

    /// Models at or beyond this distance are left out of the plots
    pub rmsd_cutoff: f64,

    pub params: PnearParams,
    pub plot: bool,
}

impl PipelineConfig {
    /// Default configuration for a run directory
    pub fn new<P: AsRef<Path>>(run_label: &str, run_dir: P) -> Self {
        let run_dir = run_dir.as_ref().to_path_buf();
        Self {
            run_label: run_label.to_string(),
            out_dir: run_dir.clone(),
            run_dir,
            oligomers: Preset::DimerTrimer.oligomers().to_vec(),
            score_column: "I_sc".to_string(),
            distance_column: "symmetric_rms".to_string(),
            color_column: "Fnat".to_string(),
            rmsd_cutoff: 20.0,
            params: PnearParams::default(),
            plot: true,
        }
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.oligomers = preset.oligomers().to_vec();
        self
    }

    /// Conditions in configuration order
    pub fn conditions(&self) -> Vec<Condition> {
        self.oligomers
            .iter()
            .map(|&n| Condition::for_oligomer(&self.run_dir, n))
            .collect()
    }

    /// Columns every score file must provide
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = crate::table::REPORTED_MINIMA.to_vec();
        columns.push(crate::table::DESCRIPTION);
        for name in [self.score_column.as_str(), self.distance_column.as_str()] {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
        columns
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oligomers.is_empty() {
            return Err(ConfigError::NoConditions);
        }
        if self.run_label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel);
        }

        // Estimator scales and the plot cutoff must be positive and finite
        for (key, value) in [
            ("lambda", self.params.lambda),
            ("kbt", self.params.kbt),
            ("rmsd_cutoff", self.rmsd_cutoff),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Apply settings from a `key = value` config file
    ///
    /// Blank lines and `#` comments are ignored, as are unknown keys.
    pub fn apply_config_str(&mut self, config_str: &str) -> Result<(), ConfigError> {
        for line in config_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.splitn(2, '=').collect();
            if parts.len() != 2 {
                continue;
            }

            let key = parts[0].trim();
            let value = parts[1].trim();

            match key {
                "oligomers" => self.oligomers = parse_oligomers(value)?,
                "preset" => self.oligomers = value.parse::<Preset>()?.oligomers().to_vec(),
                "score_column" => self.score_column = value.to_string(),
                "distance_column" => self.distance_column = value.to_string(),
                "color_column" => self.color_column = value.to_string(),
                "rmsd_cutoff" => self.rmsd_cutoff = parse_f64(key, value)?,
                "lambda" => self.params.lambda = parse_f64(key, value)?,
                "kbt" => self.params.kbt = parse_f64(key, value)?,
                "label" => self.run_label = value.to_string(),
                _ => {} // Ignore other keys
            }
        }

        Ok(())
    }
}

/// Parse a comma separated list of oligomer sizes, e.g. `2,3`
pub fn parse_oligomers(value: &str) -> Result<Vec<u32>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                key: "oligomers".to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
