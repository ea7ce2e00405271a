//! Score table extraction from docking logs
//!
//! A score log interleaves free-form simulation output with a whitespace
//! delimited table. Every table line carries the `SCORE` sentinel: the first
//! such line is the header, the rest are data rows.

use log::debug;
use nalgebra::DVector;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Marker present on the header and on every data row of a score table
pub const SENTINEL: &str = "SCORE";

/// Name of the categorical model tag column
pub const DESCRIPTION: &str = "description";

/// Columns whose minima are reported for every table
pub const REPORTED_MINIMA: [&str; 3] = ["total_score", "rms", "I_sc"];

/// Errors that can occur when querying score tables
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Column '{0}' not found in score table header")]
    MissingColumn(String),

    #[error("No data rows available for column '{0}'")]
    NoData(String),
}

/// One decoy from a docking run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    /// Model tag
    pub description: String,

    /// Numeric metrics, positional against the owning table's columns
    pub values: Vec<f64>,
}

/// Minimum of one column and the record that attains it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMinimum {
    pub column: String,
    pub value: f64,
    pub description: String,
    /// Index of the attaining record in table order
    pub row: usize,
}

/// An immutable table of score records parsed from one log
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    /// Numeric column names in header order
    columns: Vec<String>,

    /// Column name to position in `ScoreRecord::values`
    index: HashMap<String, usize>,

    /// Whether the header carried a `description` column
    has_description: bool,

    records: Vec<ScoreRecord>,

    /// Data rows dropped for a field count mismatch
    skipped: usize,
}

/// Position of one header field in the materialized record
#[derive(Debug, Clone, Copy)]
enum Slot {
    Numeric(usize),
    Description,
}

impl ScoreTable {
    /// Extract the score table from the full text of a log
    ///
    /// Never fails: lines without the sentinel are ignored, rows with the
    /// wrong number of fields are skipped and unparsable numbers become 0.
    /// A log without any sentinel line yields an empty table with no columns.
    pub fn parse(text: &str) -> Self {
        let mut lines = text.lines().filter(|line| line.contains(SENTINEL));

        let header: Vec<&str> = match lines.next() {
            Some(line) => line.split_whitespace().skip(1).collect(),
            None => return Self::default(),
        };

        let mut columns = Vec::new();
        let mut slots = Vec::with_capacity(header.len());
        let mut has_description = false;
        for name in &header {
            if *name == DESCRIPTION && !has_description {
                has_description = true;
                slots.push(Slot::Description);
            } else {
                slots.push(Slot::Numeric(columns.len()));
                columns.push(name.to_string());
            }
        }

        let index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut records = Vec::new();
        let mut skipped = 0;

        for (line_number, line) in lines.enumerate() {
            let fields: Vec<&str> = line.split_whitespace().skip(1).collect();

            if fields.len() != header.len() {
                debug!(
                    "Skipping score row {}: expected {} fields, found {}",
                    line_number + 1,
                    header.len(),
                    fields.len()
                );
                skipped += 1;
                continue;
            }

            // Appended runs repeat the header inside the same file
            if fields == header {
                debug!("Skipping repeated header at score row {}", line_number + 1);
                skipped += 1;
                continue;
            }

            let mut values = vec![0.0; columns.len()];
            let mut description = String::new();
            for (slot, field) in slots.iter().zip(&fields) {
                match slot {
                    Slot::Numeric(i) => values[*i] = parse_cell(field),
                    Slot::Description => description = field.to_string(),
                }
            }

            records.push(ScoreRecord {
                description,
                values,
            });
        }

        Self {
            columns,
            index,
            has_description,
            records,
            skipped,
        }
    }

    /// Extract a table and fail fast if any `required` column is absent
    pub fn parse_with_schema(text: &str, required: &[&str]) -> Result<Self, TableError> {
        let table = Self::parse(text);
        table.require_columns(required)?;
        Ok(table)
    }

    /// Check that every named column exists in this table's header
    pub fn require_columns(&self, required: &[&str]) -> Result<(), TableError> {
        for name in required {
            if !self.has_column(name) {
                return Err(TableError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// Does the header define this column (numeric or `description`)?
    pub fn has_column(&self, name: &str) -> bool {
        (name == DESCRIPTION && self.has_description) || self.index.contains_key(name)
    }

    /// Numeric column names in header order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of data rows dropped while parsing
    pub fn skipped_rows(&self) -> usize {
        self.skipped
    }

    /// Position of a numeric column in `ScoreRecord::values`
    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Value of a numeric column for one record
    pub fn value(&self, record: &ScoreRecord, name: &str) -> Result<f64, TableError> {
        record
            .values
            .get(self.column_index(name)?)
            .copied()
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Copy one numeric column out as a vector
    pub fn column(&self, name: &str) -> Result<DVector<f64>, TableError> {
        let idx = self.column_index(name)?;
        Ok(DVector::from_iterator(
            self.records.len(),
            self.records.iter().map(|r| r.values[idx]),
        ))
    }

    /// Minimum of a numeric column
    ///
    /// Ties resolve to the first record in table order.
    pub fn minimum(&self, name: &str) -> Result<ColumnMinimum, TableError> {
        let idx = self.column_index(name)?;

        let mut best: Option<(usize, f64)> = None;
        for (row, record) in self.records.iter().enumerate() {
            let value = record.values[idx];
            match best {
                Some((_, current)) if value >= current => {}
                _ => best = Some((row, value)),
            }
        }

        let (row, value) = best.ok_or_else(|| TableError::NoData(name.to_string()))?;
        Ok(ColumnMinimum {
            column: name.to_string(),
            value,
            description: self.records[row].description.clone(),
            row,
        })
    }

    /// Minima of `total_score`, `rms` and `I_sc`, in that order
    pub fn minima(&self) -> Result<Vec<ColumnMinimum>, TableError> {
        REPORTED_MINIMA.iter().map(|name| self.minimum(name)).collect()
    }

    /// Records whose value in `name` is strictly below `cutoff`
    pub fn rows_below(&self, name: &str, cutoff: f64) -> Result<Vec<&ScoreRecord>, TableError> {
        let idx = self.column_index(name)?;
        Ok(self
            .records
            .iter()
            .filter(|r| r.values[idx] < cutoff)
            .collect())
    }
}

/// Parse a numeric cell, coercing anything unusable to 0
fn parse_cell(field: &str) -> f64 {
    match field.parse::<f64>() {
        Ok(v) if !v.is_nan() => v,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const LOG: &str = "\
core.init: Rosetta version 2024.12
SEQUENCE: MKVLAAGIV
SCORE: total_score rms I_sc symmetric_rms Fnat description
SCORE: -310.5 4.2 -12.0 3.9 0.61 model_0001
protocols.symdock: docking round 2
SCORE: -305.1 1.1 -15.5 1.0 0.88 model_0002
SCORE: -315.0 8.7 -9.25 8.1 0.12 model_0003
";

    #[test]
    fn test_parse_extracts_sentinel_lines() {
        let text = "junk\n\
                    SCORE: total_score rms\n\
                    SCORE: 1.0 2.0\n\
                    not a score line\n\
                    SCORE: 3.0 4.0\n";
        let table = ScoreTable::parse(text);

        assert_eq!(table.columns(), &["total_score".to_string(), "rms".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].values, vec![1.0, 2.0]);
        assert_eq!(table.records()[1].values, vec![3.0, 4.0]);
        assert_eq!(table.skipped_rows(), 0);
    }

    #[test]
    fn test_description_is_categorical() {
        let table = ScoreTable::parse(LOG);

        assert!(table.has_column(DESCRIPTION));
        assert!(!table.columns().iter().any(|c| c == DESCRIPTION));
        assert_eq!(table.records()[1].description, "model_0002");
        assert_approx_eq!(
            table.value(&table.records()[1], "Fnat").unwrap(),
            0.88,
            1e-12
        );
    }

    #[test]
    fn test_mismatched_rows_are_skipped() {
        let text = "\
SCORE: total_score rms description
SCORE: -1.0 2.0 a
SCORE: -3.0 b
SCORE: -4.0 1.0 c extra
SCORE: -2.0 0.5 d
";
        let table = ScoreTable::parse(text);

        // 5 sentinel lines - header - 2 mismatched rows
        assert_eq!(table.len(), 2);
        assert_eq!(table.skipped_rows(), 2);
        assert_eq!(table.records()[1].description, "d");
    }

    #[test]
    fn test_repeated_header_is_skipped() {
        let text = "\
SCORE: total_score rms description
SCORE: -1.0 2.0 a
SCORE: total_score rms description
SCORE: -2.0 0.5 b
";
        let table = ScoreTable::parse(text);
        assert_eq!(table.len(), 2);
        assert_approx_eq!(table.minimum("rms").unwrap().value, 0.5, 1e-12);
    }

    #[test]
    fn test_unparsable_cells_become_zero() {
        let text = "SCORE: total_score rms\nSCORE: nan 2.0\nSCORE: -1.0 bogus\n";
        let table = ScoreTable::parse(text);

        assert_eq!(table.records()[0].values, vec![0.0, 2.0]);
        assert_eq!(table.records()[1].values, vec![-1.0, 0.0]);
    }

    #[test]
    fn test_minimum_and_tag() {
        let table = ScoreTable::parse(LOG);

        let energy = table.minimum("total_score").unwrap();
        assert_approx_eq!(energy.value, -315.0, 1e-12);
        assert_eq!(energy.description, "model_0003");
        assert_eq!(energy.row, 2);

        let minima = table.minima().unwrap();
        assert_eq!(minima.len(), 3);
        assert_eq!(minima[1].column, "rms");
        assert_eq!(minima[1].description, "model_0002");
        assert_eq!(minima[2].description, "model_0002");
    }

    #[test]
    fn test_minimum_tie_uses_first_record() {
        let text = "SCORE: rms description\nSCORE: 2.0 a\nSCORE: 1.0 b\nSCORE: 1.0 c\n";
        let table = ScoreTable::parse(text);

        let min = table.minimum("rms").unwrap();
        assert_eq!(min.description, "b");
        assert_eq!(min.row, 1);
    }

    #[test]
    fn test_minimum_on_empty_table_is_error() {
        let table = ScoreTable::parse("SCORE: total_score rms description\n");
        assert!(table.is_empty());
        assert!(matches!(
            table.minimum("rms"),
            Err(TableError::NoData(ref c)) if c == "rms"
        ));
    }

    #[test]
    fn test_missing_column() {
        let table = ScoreTable::parse(LOG);
        assert!(matches!(
            table.column("dG_separated"),
            Err(TableError::MissingColumn(_))
        ));

        let err = ScoreTable::parse_with_schema(LOG, &["total_score", "hbond_sc"]).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(ref c) if c == "hbond_sc"));

        assert!(ScoreTable::parse_with_schema(LOG, &["I_sc", DESCRIPTION]).is_ok());
    }

    #[test]
    fn test_log_without_table() {
        let table = ScoreTable::parse("nothing to see here\n");
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert!(table.require_columns(&["rms"]).is_err());
    }

    #[test]
    fn test_rows_below_cutoff() {
        let table = ScoreTable::parse(LOG);
        let zoom = table.rows_below("symmetric_rms", 4.0).unwrap();

        assert_eq!(zoom.len(), 2);
        assert_eq!(zoom[0].description, "model_0001");
        assert_eq!(zoom[1].description, "model_0002");
    }

    #[test]
    fn test_value_of_foreign_record() {
        let wide = ScoreTable::parse(LOG);
        let narrow = ScoreTable::parse("SCORE: rms description\nSCORE: 2.0 a\n");

        // `Fnat` is the fifth numeric column of `wide`; the record has one value
        let record = &narrow.records()[0];
        assert!(matches!(
            wide.value(record, "Fnat"),
            Err(TableError::MissingColumn(ref c)) if c == "Fnat"
        ));
        assert_approx_eq!(narrow.value(record, "rms").unwrap(), 2.0, 1e-12);
    }

    #[test]
    fn test_column_vector() {
        let table = ScoreTable::parse(LOG);
        let col = table.column("I_sc").unwrap();
        assert_eq!(col.len(), 3);
        assert_approx_eq!(col[2], -9.25, 1e-12);
    }
}
