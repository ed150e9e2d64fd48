// ⚙️ Application Config
// configs/config.json (or $FUND_RECON_CONFIG), PascalCase keys.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ReconError, Result};
use crate::ingest::DEFAULT_WORKERS;

pub const CONFIG_ENV_VAR: &str = "FUND_RECON_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppConfig {
    /// Inconsistent fund spellings → canonical name
    #[serde(default)]
    pub fund_name_mappings: HashMap<String, String>,

    pub fund_reports_dir_path: PathBuf,

    pub ref_db_connection_string: String,

    pub recon_report_output_path: PathBuf,

    pub top_fund_report_output_path: PathBuf,

    #[serde(default = "default_workers")]
    pub ingest_workers: usize,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AppConfig =
            serde_json::from_str(json).map_err(|e| ReconError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ReconError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.fund_reports_dir_path.as_os_str().is_empty() {
            problems.push("FundReportsDirPath is empty");
        }
        if self.ref_db_connection_string.trim().is_empty() {
            problems.push("RefDbConnectionString is empty");
        }
        if self.recon_report_output_path.as_os_str().is_empty() {
            problems.push("ReconReportOutputPath is empty");
        }
        if self.top_fund_report_output_path.as_os_str().is_empty() {
            problems.push("TopFundReportOutputPath is empty");
        }
        if self.ingest_workers == 0 {
            problems.push("IngestWorkers must be at least 1");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ReconError::Config(problems.join("; ")))
        }
    }
}

/// Where the config lives: $FUND_RECON_CONFIG, else ./configs/config.json
pub fn config_path() -> PathBuf {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from("configs").join("config.json"),
    }
}

/// Load `.env` (if any), then the config file.
pub fn load_app_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    AppConfig::from_path(&config_path())
}
