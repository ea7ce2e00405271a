//! Loading score logs from disk

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::table::{ScoreTable, TableError};

/// Errors that can occur while loading score files
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Score file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema mismatch in {}: {source}", .path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: TableError,
    },
}

/// Read a score log and extract its table
///
/// The whole file is loaded at once. `required` columns are checked against
/// the header before the table is handed out.
pub fn read_score_file<P: AsRef<Path>>(path: P, required: &[&str]) -> Result<ScoreTable, IoError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(IoError::MissingFile(path.to_path_buf()));
    }

    let text = fs::read_to_string(path)?;
    let table = ScoreTable::parse_with_schema(&text, required).map_err(|source| IoError::Schema {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Loaded {} models from {}", table.len(), path.display());
    if table.skipped_rows() > 0 {
        debug!(
            "Skipped {} malformed rows in {}",
            table.skipped_rows(),
            path.display()
        );
    }

    Ok(table)
}

/// Global and local score file locations for oligomer size `n` under `run_dir`
pub fn score_paths(run_dir: &Path, n: u32) -> (PathBuf, PathBuf) {
    let dir = run_dir.join(n.to_string());
    (dir.join("score.sc"), dir.join("LOCAL").join("score.sc"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_score_file(dir.path().join("score.sc"), &[]).unwrap_err();
        assert!(matches!(err, IoError::MissingFile(_)));
    }

    #[test]
    fn test_read_and_schema_check() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("score.sc");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "SEQUENCE: AAAA").unwrap();
        writeln!(file, "SCORE: total_score rms description").unwrap();
        writeln!(file, "SCORE: -10.0 1.5 m1").unwrap();
        drop(file);

        let table = read_score_file(&path, &["total_score", "rms"]).unwrap();
        assert_eq!(table.len(), 1);

        let err = read_score_file(&path, &["I_sc"]).unwrap_err();
        assert!(matches!(
            err,
            IoError::Schema {
                source: TableError::MissingColumn(_),
                ..
            }
        ));
    }

    #[test]
    fn test_score_paths() {
        let (global, local) = score_paths(Path::new("/runs/abc"), 3);
        assert_eq!(global, PathBuf::from("/runs/abc/3/score.sc"));
        assert_eq!(local, PathBuf::from("/runs/abc/3/LOCAL/score.sc"));
    }
}
