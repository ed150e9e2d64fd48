// 🏗️ Report Parser
// Reads raw fund holdings reports into RawHoldingRow values.
//
// Only the fixed report columns are read. Each row is tagged with the file
// stem so the filename parser can recover fund + date later.

use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ReconError, Result};
use crate::schema::{RawHoldingRow, REQUIRED_COLUMNS};

// ============================================================================
// PARSER TRAIT
// ============================================================================

/// ReportParser - turns one report file into raw rows
///
/// New report formats implement this trait; the ingestor does not care which
/// parser produced the rows.
pub trait ReportParser: Send + Sync {
    /// Parse a file and return raw rows tagged with the file's identifier
    fn parse(&self, file_path: &Path) -> Result<Vec<RawHoldingRow>>;

    /// Can this parser handle the file? (extension check, cheap)
    fn can_parse(&self, file_path: &Path) -> bool;

    fn name(&self) -> &str;
}

/// Identifier of a report file: its name without the extension.
pub fn source_identifier(file_path: &Path) -> String {
    file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}

/// Check that every required column is present (case-sensitive).
pub fn missing_columns(headers: &csv::StringRecord) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == **required))
        .map(|c| c.to_string())
        .collect()
}

// ============================================================================
// CSV REPORT PARSER
// ============================================================================

pub struct CsvReportParser;

impl CsvReportParser {
    pub fn new() -> Self {
        CsvReportParser
    }
}

impl Default for CsvReportParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportParser for CsvReportParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawHoldingRow>> {
        let file = File::open(file_path).map_err(|source| ReconError::Io {
            path: file_path.to_path_buf(),
            source,
        })?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(file);

        let csv_err = |source| ReconError::Csv {
            file: file_path.to_path_buf(),
            source,
        };

        let headers = reader.headers().map_err(csv_err)?.clone();
        let missing = missing_columns(&headers);
        if !missing.is_empty() {
            return Err(ReconError::MissingColumns {
                file: file_path.to_path_buf(),
                columns: missing,
            });
        }

        let identifier = source_identifier(file_path);
        let mut rows = Vec::new();

        for result in reader.deserialize::<RawHoldingRow>() {
            let mut row = result.map_err(csv_err)?;
            row.source_identifier = identifier.clone();
            rows.push(row);
        }

        debug!(file = %file_path.display(), rows = rows.len(), "parsed report");
        Ok(rows)
    }

    fn can_parse(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

// ============================================================================
// DIRECTORY LISTING
// ============================================================================

/// List the `.csv` report files in a directory, sorted by path.
pub fn get_csv_files_from_directory(dir_path: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source| ReconError::Io {
        path: dir_path.to_path_buf(),
        source,
    };

    let parser = CsvReportParser::new();
    let mut paths = Vec::new();

    for entry in std::fs::read_dir(dir_path).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && parser.can_parse(&path) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

// ============================================================================
// TESTS
// ============================================================================
