// Fund Report Reconciliation - Core Library
// Ingests fund holdings reports, reconciles prices against a reference store,
// and ranks funds by monthly rate of return.

pub mod error;
pub mod schema;
pub mod filename;
pub mod parser;
pub mod normalizer;
pub mod ingest;
pub mod db;
pub mod reconciliation;
pub mod ranking;
pub mod reports;
pub mod config;
pub mod pipeline;

// Re-export commonly used types
pub use error::{ReconError, Result};
pub use schema::{
    MonthlyTopFund, NormalizedHolding, ParsedIdentity, RawHoldingRow, ReconDiscrepancy,
    ReferencePrice, ValidationError, ValidationResult,
};
pub use parser::{get_csv_files_from_directory, CsvReportParser, ReportParser};
pub use ingest::ReportIngestor;
pub use db::{ReferencePriceSource, SqliteEquityPriceSource};
pub use reconciliation::{ReconciliationEngine, ReconciliationReport};
pub use ranking::{RankingReport, TopFundRanker};
pub use reports::{EquityPriceReconReportGenerator, ReportGenerator, TopFundByMonthReportGenerator};
pub use config::{load_app_config, AppConfig};
pub use pipeline::{run, RunMode, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
