//! Append-only CSV attendance log.
//!
//! The file layout is consumed by spreadsheet tools downstream, so the
//! header literal, column order and date formats are contractual:
//! `Studenti,Klasa,Data,Ora` then one `name,class,YYYY-MM-DD,HH:MM:SS`
//! row per logged sighting.

use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const HEADER: &str = "Studenti,Klasa,Data,Ora";

#[derive(Error, Debug)]
pub enum AttendanceLogError {
    #[error("attendance log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Appends attendance rows to a CSV file, writing the header exactly once
/// when the file is first created.
pub struct AttendanceLog {
    path: PathBuf,
}

impl AttendanceLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one attendance row with the local date and time of `at`.
    pub fn append(
        &self,
        name: &str,
        class_label: &str,
        at: DateTime<Local>,
    ) -> Result<(), AttendanceLogError> {
        let io_err = |source| AttendanceLogError::Io {
            path: self.path.clone(),
            source,
        };

        let existed = self.path.is_file();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;

        let mut row = String::new();
        if !existed {
            row.push_str(HEADER);
            row.push('\n');
        }
        row.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(name),
            csv_field(class_label),
            at.format("%Y-%m-%d"),
            at.format("%H:%M:%S"),
        ));

        file.write_all(row.as_bytes()).map_err(io_err)?;
        Ok(())
    }
}

/// Quote a field if it contains a separator, quote or newline; internal
/// quotes are doubled.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
