//! symdock-funnel: docking funnel analysis for symmetric docking runs
//!
//! This library extracts score tables from docking logs, estimates the Pnear
//! convergence metric over pooled global and local samples, and renders text
//! summaries and funnel plots for each oligomeric condition.

pub mod config;
pub mod io;
pub mod math;
pub mod pipeline;
pub mod plot;
pub mod pnear;
pub mod report;
pub mod table;

// Re-export commonly used types and functions
pub use config::{Condition, PipelineConfig, Preset};
pub use pipeline::ConditionReport;
pub use pnear::{pnear, PnearParams, PnearResult};
pub use table::{ColumnMinimum, ScoreRecord, ScoreTable};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
