//! Per-condition funnel analysis
//!
//! Each condition loads its global and local score tables, evaluates Pnear
//! over the pooled models and collects the reported minima. Conditions are
//! independent and are evaluated in parallel.

use log::info;
use rayon::prelude::*;
use thiserror::Error;

use crate::config::{Condition, PipelineConfig};
use crate::io::{read_score_file, IoError};
use crate::pnear::{pnear, PnearError, PnearResult};
use crate::table::{ColumnMinimum, ScoreTable, TableError};

/// Errors that abort the analysis of one condition
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{condition}: {source}")]
    Io {
        condition: String,
        #[source]
        source: IoError,
    },

    #[error("{condition}: {source}")]
    Pnear {
        condition: String,
        #[source]
        source: PnearError,
    },

    #[error("{condition}: {source}")]
    Table {
        condition: String,
        #[source]
        source: TableError,
    },
}

/// Everything the presentation layer needs for one condition
#[derive(Debug, Clone)]
pub struct ConditionReport {
    pub condition: Condition,

    /// Broad exploratory sample
    pub global: ScoreTable,

    /// Locally refined sample
    pub local: ScoreTable,

    pub pnear: PnearResult,

    /// Minima of `total_score`, `rms` and `I_sc` over the global table
    pub minima: Vec<ColumnMinimum>,
}

impl ConditionReport {
    /// Reported minimum for one column
    pub fn minimum(&self, column: &str) -> Option<&ColumnMinimum> {
        self.minima.iter().find(|m| m.column == column)
    }
}

/// Run the full analysis for one condition
pub fn analyze_condition(
    condition: &Condition,
    config: &PipelineConfig,
) -> Result<ConditionReport, PipelineError> {
    let name = condition.name.clone();
    let required = config.required_columns();

    info!("Analyzing {} (oligomer size {})", name, condition.label);

    let global = read_score_file(&condition.global_path, &required).map_err(|source| {
        PipelineError::Io {
            condition: name.clone(),
            source,
        }
    })?;
    let local = read_score_file(&condition.local_path, &required).map_err(|source| {
        PipelineError::Io {
            condition: name.clone(),
            source,
        }
    })?;

    let pnear = pnear(
        &global,
        &local,
        &config.score_column,
        &config.distance_column,
        &config.params,
    )
    .map_err(|source| PipelineError::Pnear {
        condition: name.clone(),
        source,
    })?;

    let minima = global.minima().map_err(|source| PipelineError::Table {
        condition: name.clone(),
        source,
    })?;

    info!(
        "{}: Pnear {:.4} over {} models",
        name, pnear.pnear, pnear.population
    );

    Ok(ConditionReport {
        condition: condition.clone(),
        global,
        local,
        pnear,
        minima,
    })
}

/// Analyze every configured condition
///
/// One result per condition, in configuration order. A failed condition does
/// not affect the others; reporting failures is left to the caller.
pub fn run(config: &PipelineConfig) -> Vec<Result<ConditionReport, PipelineError>> {
    config
        .conditions()
        .par_iter()
        .map(|condition| analyze_condition(condition, config))
        .collect()
}
