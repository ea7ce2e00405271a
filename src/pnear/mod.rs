//! Pnear: Boltzmann-weighted probability of sampling near the native state
//!
//! For a pooled population of models with energies `E_i` and distances
//! `d_i` from the reference structure,
//!
//! ```text
//! Pnear = sum(exp(-d_i^2 / lambda^2) * exp(-(E_i - E_min) / kBT))
//!       / sum(exp(-(E_i - E_min) / kBT))
//! ```
//!
//! Both sums are evaluated in log space.

use log::{debug, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{logsumexp, min_element};
use crate::table::{ScoreTable, TableError};

/// Errors that can occur while estimating Pnear
#[derive(Error, Debug)]
pub enum PnearError {
    #[error("Empty population: {0} has no rows for the requested columns")]
    EmptyPopulation(String),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Pnear evaluated to a non-finite value (log Pnear = {0})")]
    NonFinite(f64),
}

/// Constants of the Pnear estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PnearParams {
    /// Distance tolerance in Angstroms
    pub lambda: f64,

    /// Thermal energy in score units
    pub kbt: f64,
}

impl Default for PnearParams {
    fn default() -> Self {
        Self {
            lambda: 2.5,
            kbt: 0.62,
        }
    }
}

/// Result of a Pnear evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PnearResult {
    pub pnear: f64,
    pub log_pnear: f64,

    /// Number of pooled models
    pub population: usize,
}

impl PnearResult {
    /// Is the value a proper probability in (0, 1]?
    pub fn is_probability(&self) -> bool {
        self.pnear > 0.0 && self.pnear <= 1.0
    }
}

/// Project a table onto its `(score, distance)` columns
fn project(
    table: &ScoreTable,
    name: &str,
    score_column: &str,
    distance_column: &str,
) -> Result<(DVector<f64>, DVector<f64>), PnearError> {
    let scores = table.column(score_column)?;
    let distances = table.column(distance_column)?;
    if scores.is_empty() {
        return Err(PnearError::EmptyPopulation(name.to_string()));
    }
    Ok((scores, distances))
}

/// Pnear over the pooled rows of a global and a local table
pub fn pnear(
    global: &ScoreTable,
    local: &ScoreTable,
    score_column: &str,
    distance_column: &str,
    params: &PnearParams,
) -> Result<PnearResult, PnearError> {
    let (global_scores, global_distances) =
        project(global, "global table", score_column, distance_column)?;
    let (local_scores, local_distances) =
        project(local, "local table", score_column, distance_column)?;

    let scores = concat(&global_scores, &local_scores);
    let distances = concat(&global_distances, &local_distances);

    pnear_from_vectors(&scores, &distances, params)
}

/// Pnear over an already pooled slice of `(score, distance)` pairs
pub fn pnear_from_pairs(
    pairs: &[(f64, f64)],
    params: &PnearParams,
) -> Result<PnearResult, PnearError> {
    let scores = DVector::from_iterator(pairs.len(), pairs.iter().map(|p| p.0));
    let distances = DVector::from_iterator(pairs.len(), pairs.iter().map(|p| p.1));
    pnear_from_vectors(&scores, &distances, params)
}

fn pnear_from_vectors(
    scores: &DVector<f64>,
    distances: &DVector<f64>,
    params: &PnearParams,
) -> Result<PnearResult, PnearError> {
    let min_score = min_element(scores)
        .ok_or_else(|| PnearError::EmptyPopulation("pooled population".to_string()))?;

    // Boltzmann weight exponents, most favorable model at 0
    let boltzmann = scores.map(|s| -(s - min_score) / params.kbt);

    let lambda_sq = params.lambda * params.lambda;
    let closeness = distances.map(|d| -(d * d) / lambda_sq);

    let numerator = logsumexp(&(&closeness + &boltzmann));
    let denominator = logsumexp(&boltzmann);

    let log_pnear = numerator - denominator;
    if log_pnear.is_nan() {
        return Err(PnearError::NonFinite(log_pnear));
    }

    let result = PnearResult {
        pnear: log_pnear.exp(),
        log_pnear,
        population: scores.len(),
    };

    debug!(
        "Pnear {:.6} over {} models (log Pnear {:.4})",
        result.pnear, result.population, result.log_pnear
    );
    if !result.is_probability() {
        warn!(
            "Pnear {} is outside (0, 1] (log Pnear {})",
            result.pnear, result.log_pnear
        );
    }

    Ok(result)
}

fn concat(a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(a.len() + b.len(), a.iter().chain(b.iter()).copied())
}
