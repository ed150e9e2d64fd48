// 📂 Report Ingestor
// Report files → one normalized holdings table.
//
// Files are parsed on a bounded worker pool; results are collected in input
// order, so the output never depends on which worker finished first.

use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{ReconError, Result};
use crate::filename;
use crate::normalizer;
use crate::parser::{source_identifier, CsvReportParser, ReportParser};
use crate::schema::{NormalizedHolding, ParsedIdentity, RawHoldingRow};

pub const DEFAULT_WORKERS: usize = 4;

pub struct ReportIngestor {
    parser: Box<dyn ReportParser>,
    workers: usize,
}

impl ReportIngestor {
    pub fn new() -> Self {
        ReportIngestor {
            parser: Box::new(CsvReportParser::new()),
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_workers(workers: usize) -> Self {
        ReportIngestor {
            workers: workers.max(1),
            ..Self::new()
        }
    }

    /// Read every file's raw rows, in input order.
    pub fn load_raw(&self, paths: &[PathBuf]) -> Result<Vec<RawHoldingRow>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers.min(paths.len()))
            .build()
            .map_err(|e| ReconError::WorkerPool(e.to_string()))?;

        let per_file: Vec<Vec<RawHoldingRow>> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| self.parser.parse(path))
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(per_file.into_iter().flatten().collect())
    }

    /// Ingest report files into normalized holdings.
    ///
    /// An empty path list is a valid, empty result.
    pub fn ingest(
        &self,
        paths: &[PathBuf],
        fund_name_map: &HashMap<String, String>,
    ) -> Result<Vec<NormalizedHolding>> {
        if paths.is_empty() {
            info!("no report files to ingest");
            return Ok(Vec::new());
        }

        // Every file name must parse, even for reports with no rows
        let identities = parse_identities(paths)?;
        let rows = self.load_raw(paths)?;
        let holdings = normalizer::normalize(&rows, &identities, fund_name_map)?;

        info!(
            files = paths.len(),
            raw_rows = rows.len(),
            holdings = holdings.len(),
            parser = self.parser.name(),
            "ingested fund reports"
        );
        Ok(holdings)
    }
}

impl Default for ReportIngestor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the identifier of every report path, once per distinct identifier.
///
/// Any unparsable identifier fails the whole ingestion.
pub fn parse_identities(paths: &[PathBuf]) -> Result<HashMap<String, ParsedIdentity>> {
    let mut identities = HashMap::new();

    for path in paths {
        let identifier = source_identifier(path);
        if identities.contains_key(&identifier) {
            continue;
        }
        let identity = filename::parse(&identifier)?;
        debug!(
            identifier = %identifier,
            fund = %identity.fund_name,
            date = %identity.report_date,
            "parsed report identity"
        );
        identities.insert(identifier, identity);
    }

    Ok(identities)
}

/// Convenience wrapper with the default CSV parser and worker count.
pub fn ingest(paths: &[PathBuf], fund_name_map: &HashMap<String, String>) -> Result<Vec<NormalizedHolding>> {
    ReportIngestor::new().ingest(paths, fund_name_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const HEADER: &str = "FINANCIAL TYPE,SYMBOL,SECURITY NAME,PRICE,QUANTITY,REALISED P/L,MARKET VALUE";

    fn write_report(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut body = String::from(HEADER);
        for line in lines {
            body.push('\n');
            body.push_str(line);
        }
        body.push('\n');
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_ingest_empty_paths_is_empty_result() {
        let holdings = ingest(&[], &HashMap::new()).unwrap();
        assert!(holdings.is_empty());
    }

    #[test]
    fn test_ingest_multiple_files() {
        let dir = tempdir().unwrap();
        let paths = vec![
            write_report(
                dir.path(),
                "Applebead.28-02-2023 breakdown.csv",
                &["Equities,AAPL,Apple Inc,150,10,0,1500", "Cash,USD,Dollar,,,,100"],
            ),
            write_report(
                dir.path(),
                "TT_monthly_Trustmind.20220831.csv",
                &["Equities,MSFT,Microsoft,300,2,5,600"],
            ),
            write_report(
                dir.path(),
                "Virtous.05-31-2023 - securities.csv",
                &["Equities,TSLA,Tesla,200,1,0,200"],
            ),
        ];

        let mut mapping = HashMap::new();
        mapping.insert("TT_monthly_Trustmind".to_string(), "Trustmind".to_string());

        let holdings = ReportIngestor::with_workers(2).ingest(&paths, &mapping).unwrap();

        assert_eq!(holdings.len(), 3);
        assert_eq!(holdings[0].fund_name, "Applebead");
        assert_eq!(holdings[0].report_date, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
        assert_eq!(holdings[1].fund_name, "Trustmind");
        assert_eq!(holdings[1].report_date, NaiveDate::from_ymd_opt(2022, 8, 31).unwrap());
        assert_eq!(holdings[2].fund_name, "Virtous");
        assert_eq!(holdings[2].report_date, NaiveDate::from_ymd_opt(2023, 5, 31).unwrap());
    }

    #[test]
    fn test_ingest_preserves_input_order_with_many_workers() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (1..=9)
            .map(|day| {
                write_report(
                    dir.path(),
                    &format!("Fund{day}.2023-01-0{day}.csv"),
                    &[format!("Equities,SYM{day},Name,1,1,0,1").as_str()],
                )
            })
            .collect();

        let holdings = ReportIngestor::with_workers(8).ingest(&paths, &HashMap::new()).unwrap();
        let funds: Vec<String> = holdings.iter().map(|h| h.fund_name.clone()).collect();
        let expected: Vec<String> = (1..=9).map(|d| format!("Fund{d}")).collect();
        assert_eq!(funds, expected);
    }

    #[test]
    fn test_ingest_unparsable_filename_aborts() {
        let dir = tempdir().unwrap();
        let paths = vec![
            write_report(dir.path(), "Leeder.01_31_2023.csv", &["Equities,AAPL,Apple,1,1,0,1"]),
            write_report(dir.path(), "no date here.csv", &["Equities,AAPL,Apple,1,1,0,1"]),
        ];

        let err = ingest(&paths, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ReconError::UnparsableIdentifier { .. }));
    }

    #[test]
    fn test_ingest_missing_columns_aborts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Leeder.01_31_2023.csv");
        fs::write(&path, "SYMBOL,PRICE\nAAPL,1\n").unwrap();

        let err = ingest(&[path], &HashMap::new()).unwrap_err();
        assert!(matches!(err, ReconError::MissingColumns { .. }));
    }

    #[test]
    fn test_ingest_header_only_report_with_bad_name_aborts() {
        let dir = tempdir().unwrap();
        let paths = vec![
            write_report(dir.path(), "Leeder.01_31_2023.csv", &["Equities,AAPL,Apple,1,1,0,1"]),
            write_report(dir.path(), "no date here.csv", &[]),
        ];

        let err = ingest(&paths, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ReconError::UnparsableIdentifier { .. }));
    }

    #[test]
    fn test_parse_identities_once_per_identifier() {
        let paths = vec![
            PathBuf::from("a/Belaware.30_09_2022.csv"),
            PathBuf::from("b/Belaware.30_09_2022.csv"),
            PathBuf::from("Leeder.01_31_2023.csv"),
        ];

        let identities = parse_identities(&paths).unwrap();
        assert_eq!(identities.len(), 2);
        assert_eq!(identities["Belaware.30_09_2022"].fund_name, "Belaware");
        assert_eq!(
            identities["Leeder.01_31_2023"].report_date,
            NaiveDate::from_ymd_opt(2023, 1, 31).unwrap()
        );
    }
}
