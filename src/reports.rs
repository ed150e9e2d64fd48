// 📊 Report Generators
// Normalized holdings in, report rows out; plus the CSV writers for both reports.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::db::ReferencePriceSource;
use crate::error::{ReconError, Result};
use crate::ranking::{RankingReport, TopFundRanker};
use crate::reconciliation::{compare_discrepancies, ReconciliationEngine, ReconciliationReport};
use crate::schema::{validate_all, MonthlyTopFund, NormalizedHolding, ReconDiscrepancy};

/// Turns fund report data `T` into a report `U`.
pub trait ReportGenerator<T: ?Sized, U> {
    fn generate(&self, fund_report_data: &T) -> Result<U>;
}

// ============================================================================
// EQUITY PRICE RECON
// ============================================================================

pub struct EquityPriceReconReportGenerator<S: ReferencePriceSource> {
    source: S,
    engine: ReconciliationEngine,
}

impl<S: ReferencePriceSource> EquityPriceReconReportGenerator<S> {
    pub fn new(source: S) -> Self {
        EquityPriceReconReportGenerator {
            source,
            engine: ReconciliationEngine::new(),
        }
    }
}

impl<S: ReferencePriceSource> ReportGenerator<[NormalizedHolding], ReconciliationReport>
    for EquityPriceReconReportGenerator<S>
{
    fn generate(&self, fund_report_data: &[NormalizedHolding]) -> Result<ReconciliationReport> {
        let ref_prices = self.source.load_reference_prices()?;
        let mut report = self.engine.reconcile(fund_report_data, &ref_prices);

        report.discrepancies.sort_by(compare_discrepancies);
        validate_all(&report.discrepancies, ReconDiscrepancy::validate)
            .map_err(|(idx, v)| ReconError::schema(format!("recon row {}", idx + 1), v))?;

        Ok(report)
    }
}

// ============================================================================
// TOP FUND BY MONTH
// ============================================================================

pub struct TopFundByMonthReportGenerator {
    ranker: TopFundRanker,
}

impl TopFundByMonthReportGenerator {
    pub fn new() -> Self {
        TopFundByMonthReportGenerator {
            ranker: TopFundRanker::new(),
        }
    }
}

impl Default for TopFundByMonthReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator<[NormalizedHolding], RankingReport> for TopFundByMonthReportGenerator {
    fn generate(&self, fund_report_data: &[NormalizedHolding]) -> Result<RankingReport> {
        let report = self.ranker.rank(fund_report_data);

        validate_all(&report.top_funds, MonthlyTopFund::validate)
            .map_err(|(idx, v)| ReconError::schema(format!("top fund row {}", idx + 1), v))?;

        Ok(report)
    }
}

// ============================================================================
// CSV OUTPUT
// ============================================================================

/// A report written to a sibling temp file, not yet at its final path.
///
/// Dropping it without `persist` removes the temp file.
pub struct StagedReport {
    temp: NamedTempFile,
    path: PathBuf,
    rows: usize,
}

impl StagedReport {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically move the staged file onto its final path.
    pub fn persist(self) -> Result<usize> {
        let StagedReport { temp, path, rows } = self;
        temp.persist(&path).map_err(|e| ReconError::Io {
            path: path.clone(),
            source: e.error,
        })?;

        info!(path = %path.display(), rows, "wrote report");
        Ok(rows)
    }
}

/// Write serializable rows as CSV with a header row into a temp file next to
/// `path` (header is written even when there are no rows).
pub fn stage_csv<R: Serialize>(path: &Path, headers: &[&str], rows: &[R]) -> Result<StagedReport> {
    let io_err = |source| ReconError::Io {
        path: path.to_path_buf(),
        source,
    };
    let csv_err = |source| ReconError::Csv {
        file: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp.as_file_mut());

        writer.write_record(headers).map_err(csv_err)?;
        for row in rows {
            writer.serialize(row).map_err(csv_err)?;
        }
        writer.flush().map_err(io_err)?;
    }

    Ok(StagedReport {
        temp,
        path: path.to_path_buf(),
        rows: rows.len(),
    })
}

pub fn write_csv<R: Serialize>(path: &Path, headers: &[&str], rows: &[R]) -> Result<usize> {
    stage_csv(path, headers, rows)?.persist()
}

pub const RECON_REPORT_HEADERS: [&str; 5] = ["FundName", "Symbol", "ReportDate", "ReportPrice", "RefPrice"];
pub const TOP_FUND_REPORT_HEADERS: [&str; 3] = ["Date", "TopFundName", "RateOfReturn"];

pub fn stage_recon_report(path: &Path, discrepancies: &[ReconDiscrepancy]) -> Result<StagedReport> {
    stage_csv(path, &RECON_REPORT_HEADERS, discrepancies)
}

pub fn stage_top_fund_report(path: &Path, top_funds: &[MonthlyTopFund]) -> Result<StagedReport> {
    stage_csv(path, &TOP_FUND_REPORT_HEADERS, top_funds)
}

pub fn write_recon_report(path: &Path, discrepancies: &[ReconDiscrepancy]) -> Result<usize> {
    stage_recon_report(path, discrepancies)?.persist()
}

pub fn write_top_fund_report(path: &Path, top_funds: &[MonthlyTopFund]) -> Result<usize> {
    stage_top_fund_report(path, top_funds)?.persist()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ReferencePrice;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn holding(fund: &str, symbol: &str, report_date: NaiveDate, price: f64, mv: f64) -> NormalizedHolding {
        NormalizedHolding {
            symbol: symbol.to_string(),
            security_name: symbol.to_string(),
            price,
            quantity: 1.0,
            realized_pnl: 0.0,
            market_value: mv,
            fund_name: fund.to_string(),
            report_date,
        }
    }

    #[test]
    fn test_recon_generator_uses_source_and_sorts() {
        let refs = vec![
            ReferencePrice { symbol: "MSFT".to_string(), as_of_date: date(2023, 1, 31), price: 247.81 },
            ReferencePrice { symbol: "AAPL".to_string(), as_of_date: date(2023, 1, 31), price: 144.29 },
        ];
        let holdings = vec![
            holding("Leeder", "MSFT", date(2023, 1, 31), 250.0, 250.0),
            holding("Leeder", "AAPL", date(2023, 1, 31), 144.0, 144.0),
        ];

        let generator = EquityPriceReconReportGenerator::new(refs);
        let report = generator.generate(holdings.as_slice()).unwrap();

        let symbols: Vec<&str> = report.discrepancies.iter().map(|d| d.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(report.matched_count, 2);
    }

    #[test]
    fn test_top_fund_generator() {
        let holdings = vec![
            holding("Applebead", "AAPL", date(2023, 1, 31), 1.0, 100.0),
            holding("Applebead", "AAPL", date(2023, 2, 28), 1.0, 150.0),
        ];

        let report = TopFundByMonthReportGenerator::new().generate(holdings.as_slice()).unwrap();
        assert_eq!(report.top_funds.len(), 1);
        assert_eq!(report.top_funds[0].rate_of_return, 0.5);
    }

    #[test]
    fn test_write_recon_report_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recon.csv");
        let rows = vec![ReconDiscrepancy {
            fund_name: "Applebead".to_string(),
            symbol: "AAPL".to_string(),
            report_date: date(2023, 2, 28),
            reported_price: 150.0,
            reference_price: 147.41,
        }];

        assert_eq!(write_recon_report(&path, &rows).unwrap(), 1);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "FundName,Symbol,ReportDate,ReportPrice,RefPrice\nApplebead,AAPL,2023-02-28,150.0,147.41\n"
        );
    }

    #[test]
    fn test_write_top_fund_report_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("top.csv");
        let rows = vec![MonthlyTopFund {
            month: "2023-02".to_string(),
            fund_name: "Applebead".to_string(),
            rate_of_return: 0.5,
        }];

        write_top_fund_report(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Date,TopFundName,RateOfReturn\n2023-02,Applebead,0.5\n");
    }

    #[test]
    fn test_empty_report_still_has_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        write_top_fund_report(&path, &[]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Date,TopFundName,RateOfReturn\n");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.csv");

        let err = write_recon_report(&path, &[]).unwrap_err();
        assert!(matches!(err, ReconError::Io { .. }));
    }

    #[test]
    fn test_staged_report_is_invisible_until_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("top.csv");

        let staged = stage_top_fund_report(&path, &[]).unwrap();
        assert_eq!(staged.path(), path.as_path());
        assert!(!path.exists());

        assert_eq!(staged.persist().unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Date,TopFundName,RateOfReturn\n");
    }

    #[test]
    fn test_dropped_staged_report_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recon.csv");

        drop(stage_recon_report(&path, &[]).unwrap());

        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_persist_replaces_existing_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("top.csv");
        fs::write(&path, "stale").unwrap();

        write_top_fund_report(&path, &[]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Date,TopFundName,RateOfReturn\n");
    }
}
