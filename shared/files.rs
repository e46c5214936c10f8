//! # Delimited-Text Codec
//!
//! The engine and this crate talk exclusively through small comma-delimited
//! files inside the per-call workspace. Everything written here carries no
//! header; everything read back carries exactly one header row, which is
//! skipped.
//!
//! - Missing values are written as the token `NA`. On the way back `NA`, `NaN`
//!   and `nan` all parse to `f64::NAN` so callers can decide whether a missing
//!   value is acceptable.
//! - Floats are written with `ryu`'s shortest round-trip formatting, so values
//!   survive the trip to the engine without loss.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use log::debug;
use ndarray::{Array2, ArrayView2};
use thiserror::Error;

/// Token the engine reads as a missing value.
pub const MISSING_TOKEN: &str = "NA";

#[derive(Error, Debug)]
pub enum FileError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed delimited file '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Could not parse '{value}' as a number in '{path}' (line {line}, field {field})")]
    Parse {
        path: PathBuf,
        line: u64,
        field: usize,
        value: String,
    },
    #[error("Result file '{path}' contains no data rows")]
    Empty { path: PathBuf },
    #[error("Manifest '{path}' lists '{entry}', which is not a plain file name")]
    InvalidManifestEntry { path: PathBuf, entry: String },
    #[error("Result file '{path}' has shape {found:?}, expected {expected:?}")]
    UnexpectedShape {
        path: PathBuf,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("Manifest '{path}' lists {found} result files, expected {expected}")]
    UnexpectedCount {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("Result file '{path}' still contains {count} missing values")]
    MissingValues { path: PathBuf, count: usize },
}

impl FileError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        // Surface plain I/O failures (e.g. a result file the engine never wrote) as such.
        if let csv::ErrorKind::Io(err) = source.kind() {
            return Self::io(path, io::Error::new(err.kind(), err.to_string()));
        }
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// R's spelling of a boolean.
pub fn r_logical(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        MISSING_TOKEN.to_string()
    } else {
        ryu::Buffer::new().format(value).to_string()
    }
}

fn headerless_writer(path: &Path) -> Result<csv::Writer<File>, FileError> {
    WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| FileError::csv(path, e))
}

/// Writes a numeric matrix, one row per line, with missing values as `NA`.
pub fn write_matrix(path: &Path, matrix: ArrayView2<'_, f64>) -> Result<(), FileError> {
    let mut writer = headerless_writer(path)?;
    for row in matrix.rows() {
        writer
            .write_record(row.iter().map(|&v| format_value(v)))
            .map_err(|e| FileError::csv(path, e))?;
    }
    writer.flush().map_err(|e| FileError::io(path, e))?;
    debug!(
        "Wrote {}x{} matrix to {}",
        matrix.nrows(),
        matrix.ncols(),
        path.display()
    );
    Ok(())
}

/// Writes a small integer matrix (e.g. ternary prior knowledge).
pub fn write_int_matrix(path: &Path, matrix: ArrayView2<'_, i8>) -> Result<(), FileError> {
    let mut writer = headerless_writer(path)?;
    for row in matrix.rows() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(|e| FileError::csv(path, e))?;
    }
    writer.flush().map_err(|e| FileError::io(path, e))
}

/// Writes one value per line.
pub fn write_column<T: Display>(path: &Path, values: &[T]) -> Result<(), FileError> {
    let file = File::create(path).map_err(|e| FileError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for value in values {
        writeln!(writer, "{value}").map_err(|e| FileError::io(path, e))?;
    }
    writer.flush().map_err(|e| FileError::io(path, e))
}

/// Writes all values on a single comma-delimited line.
pub fn write_row<T: Display>(path: &Path, values: &[T]) -> Result<(), FileError> {
    let mut writer = headerless_writer(path)?;
    writer
        .write_record(values.iter().map(|v| v.to_string()))
        .map_err(|e| FileError::csv(path, e))?;
    writer.flush().map_err(|e| FileError::io(path, e))
}

pub fn write_scalar<T: Display>(path: &Path, value: T) -> Result<(), FileError> {
    std::fs::write(path, format!("{value}\n")).map_err(|e| FileError::io(path, e))
}

fn parse_value(raw: &str) -> Option<f64> {
    match raw.trim() {
        "NA" | "NaN" | "nan" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    }
}

/// Reads a numeric matrix, skipping the header row.
pub fn read_matrix(path: &Path) -> Result<Array2<f64>, FileError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| FileError::csv(path, e))?;

    let mut values = Vec::new();
    let mut n_rows = 0usize;
    let mut n_cols = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| FileError::csv(path, e))?;
        let line = record.position().map_or(0, |p| p.line());
        if n_rows == 0 {
            n_cols = record.len();
        }
        for (field, raw) in record.iter().enumerate() {
            let value = parse_value(raw).ok_or_else(|| FileError::Parse {
                path: path.to_path_buf(),
                line,
                field: field + 1,
                value: raw.to_string(),
            })?;
            values.push(value);
        }
        n_rows += 1;
    }

    if n_rows == 0 || n_cols == 0 {
        return Err(FileError::Empty {
            path: path.to_path_buf(),
        });
    }

    // The reader rejects ragged records, so the buffer is always rectangular.
    let found = (n_rows, values.len() / n_rows);
    Array2::from_shape_vec((n_rows, n_cols), values).map_err(|_| FileError::UnexpectedShape {
        path: path.to_path_buf(),
        expected: (n_rows, n_cols),
        found,
    })
}

/// Reads a matrix and checks both its shape and that it is complete.
pub fn read_complete_matrix(
    path: &Path,
    expected: (usize, usize),
) -> Result<Array2<f64>, FileError> {
    let matrix = read_matrix(path)?;
    if matrix.dim() != expected {
        return Err(FileError::UnexpectedShape {
            path: path.to_path_buf(),
            expected,
            found: matrix.dim(),
        });
    }
    let missing = matrix.iter().filter(|v| v.is_nan()).count();
    if missing > 0 {
        return Err(FileError::MissingValues {
            path: path.to_path_buf(),
            count: missing,
        });
    }
    Ok(matrix)
}

/// Reads the file names listed in the first column of a manifest, skipping the header row.
pub fn read_manifest(path: &Path) -> Result<Vec<String>, FileError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| FileError::csv(path, e))?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FileError::csv(path, e))?;
        let Some(entry) = record.get(0).map(str::trim) else {
            continue;
        };
        if entry.is_empty() {
            continue;
        }
        if !is_plain_file_name(entry) {
            return Err(FileError::InvalidManifestEntry {
                path: path.to_path_buf(),
                entry: entry.to_string(),
            });
        }
        entries.push(entry.to_string());
    }
    Ok(entries)
}

fn is_plain_file_name(entry: &str) -> bool {
    entry != "."
        && entry != ".."
        && !entry.contains('/')
        && !entry.contains('\\')
        && Path::new(entry).file_name().is_some_and(|n| n == entry)
}
