use anyhow::{Context, Result};
use std::env;
use tracing::info;

use fund_recon::config::{config_path, load_app_config};
use fund_recon::pipeline::{run, RunMode};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json_logging = env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn main() -> Result<()> {
    init_tracing();

    // fund-recon [recon|top-funds|all]
    let args: Vec<String> = env::args().collect();
    let mode = match args.get(1) {
        Some(cmd) => cmd.parse::<RunMode>()?,
        None => RunMode::All,
    };

    let config = load_app_config()
        .with_context(|| format!("Failed to load config from {}", config_path().display()))?;

    info!(?mode, version = fund_recon::VERSION, "starting fund report run");
    let summary = run(&config, mode)?;

    if let Some(recon) = &summary.recon {
        info!(
            discrepancies = recon.discrepancies.len(),
            path = %config.recon_report_output_path.display(),
            "recon report written"
        );
    }
    if let Some(ranking) = &summary.ranking {
        info!(
            months = ranking.top_funds.len(),
            path = %config.top_fund_report_output_path.display(),
            "top fund report written"
        );
    }

    Ok(())
}
