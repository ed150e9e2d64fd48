// 🔁 Pipeline
// ingest → { recon, top funds } → write
//
// Both reports are computed and staged in temp files before either is
// moved into place, so a failure in either one leaves no partial output.

use anyhow::{Context, Result};
use std::str::FromStr;
use tracing::info;

use crate::config::AppConfig;
use crate::db::SqliteEquityPriceSource;
use crate::ingest::ReportIngestor;
use crate::parser::get_csv_files_from_directory;
use crate::ranking::RankingReport;
use crate::reconciliation::ReconciliationReport;
use crate::reports::{
    stage_recon_report, stage_top_fund_report, EquityPriceReconReportGenerator, ReportGenerator,
    TopFundByMonthReportGenerator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Recon,
    TopFunds,
    All,
}

impl RunMode {
    pub fn includes_recon(&self) -> bool {
        matches!(self, RunMode::Recon | RunMode::All)
    }

    pub fn includes_top_funds(&self) -> bool {
        matches!(self, RunMode::TopFunds | RunMode::All)
    }
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "recon" => Ok(RunMode::Recon),
            "top-funds" => Ok(RunMode::TopFunds),
            "all" => Ok(RunMode::All),
            other => Err(anyhow::anyhow!(
                "Unknown command: {} (expected recon, top-funds or all)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub files: usize,
    pub holdings: usize,
    pub recon: Option<ReconciliationReport>,
    pub ranking: Option<RankingReport>,
}

pub fn run(config: &AppConfig, mode: RunMode) -> Result<RunSummary> {
    let paths = get_csv_files_from_directory(&config.fund_reports_dir_path).with_context(|| {
        format!(
            "Failed to list fund reports in {}",
            config.fund_reports_dir_path.display()
        )
    })?;
    info!(files = paths.len(), dir = %config.fund_reports_dir_path.display(), "found fund reports");

    let holdings = ReportIngestor::with_workers(config.ingest_workers)
        .ingest(&paths, &config.fund_name_mappings)
        .context("Failed to ingest fund reports")?;

    let recon = if mode.includes_recon() {
        let generator = EquityPriceReconReportGenerator::new(SqliteEquityPriceSource::new(
            config.ref_db_connection_string.clone(),
        ));
        Some(
            generator
                .generate(holdings.as_slice())
                .context("Failed to generate recon report")?,
        )
    } else {
        None
    };

    let ranking = if mode.includes_top_funds() {
        Some(
            TopFundByMonthReportGenerator::new()
                .generate(holdings.as_slice())
                .context("Failed to generate top fund report")?,
        )
    } else {
        None
    };

    let mut staged = Vec::new();
    if let Some(report) = &recon {
        staged.push(
            stage_recon_report(&config.recon_report_output_path, &report.discrepancies)
                .context("Failed to write recon report")?,
        );
    }
    if let Some(report) = &ranking {
        staged.push(
            stage_top_fund_report(&config.top_fund_report_output_path, &report.top_funds)
                .context("Failed to write top fund report")?,
        );
    }

    for report in staged {
        let path = report.path().to_path_buf();
        report
            .persist()
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }

    if let Some(report) = &recon {
        if report.is_clean() {
            info!(matched = report.matched_count, "no price discrepancies");
        } else {
            info!("{}", report.summary());
        }
    }

    Ok(RunSummary {
        files: paths.len(),
        holdings: holdings.len(),
        recon,
        ranking,
    })
}

// ============================================================================
// TESTS
// ============================================================================
