//! Text and JSON run summaries

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::pipeline::ConditionReport;
use crate::pnear::PnearResult;
use crate::table::ColumnMinimum;

/// Errors that can occur while writing summaries
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Label used for each reported minimum in the text summary
fn minimum_label(column: &str) -> &str {
    match column {
        "total_score" => "Energy",
        "rms" => "RMS",
        other => other,
    }
}

/// Render the text summary
///
/// First line lists Pnear for every condition, followed by the energy, RMS
/// and interface score minima of each condition with their model tags.
pub fn summary_text(reports: &[ConditionReport]) -> String {
    let pnears: Vec<String> = reports
        .iter()
        .map(|r| format!("{} Pnear: {}", r.condition.name, r.pnear.pnear))
        .collect();

    let mut text = pnears.join(", ");
    text.push('\n');

    for report in reports {
        for minimum in &report.minima {
            text.push_str(&format!(
                "{} {} Min: {}, TAG: {}\n",
                report.condition.name,
                minimum_label(&minimum.column),
                minimum.value,
                minimum.description
            ));
        }
    }

    text
}

#[derive(Serialize)]
struct ConditionSummary<'a> {
    oligomer: u32,
    name: &'a str,
    global_models: usize,
    local_models: usize,
    pnear: &'a PnearResult,
    minima: &'a [ColumnMinimum],
}

#[derive(Serialize)]
struct RunSummary<'a> {
    run_label: &'a str,
    conditions: Vec<ConditionSummary<'a>>,
}

/// Render the JSON summary
pub fn summary_json(run_label: &str, reports: &[ConditionReport]) -> Result<String, ReportError> {
    let summary = RunSummary {
        run_label,
        conditions: reports
            .iter()
            .map(|r| ConditionSummary {
                oligomer: r.condition.label,
                name: &r.condition.name,
                global_models: r.global.len(),
                local_models: r.local.len(),
                pnear: &r.pnear,
                minima: &r.minima,
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}

/// Write `{label}_summary.txt` and `{label}_summary.json` into `out_dir`
///
/// Returns the paths written.
pub fn write_summaries(
    out_dir: &Path,
    run_label: &str,
    reports: &[ConditionReport],
) -> Result<Vec<PathBuf>, ReportError> {
    let text_path = out_dir.join(format!("{}_summary.txt", run_label));
    let mut file = BufWriter::new(File::create(&text_path)?);
    file.write_all(summary_text(reports).as_bytes())?;
    file.flush()?;

    let json_path = out_dir.join(format!("{}_summary.json", run_label));
    let mut file = BufWriter::new(File::create(&json_path)?);
    writeln!(file, "{}", summary_json(run_label, reports)?)?;
    file.flush()?;

    Ok(vec![text_path, json_path])
}
