// 🏷️ Filename Parser
// Recovers fund name + report date from a report's file stem.
//
//   "Applebead.28-02-2023 breakdown"  → ("Applebead", 2023-02-28)
//   "TT_monthly_Trustmind.20220831"   → ("TT_monthly_Trustmind", 2022-08-31)

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{ReconError, Result};
use crate::schema::ParsedIdentity;

/// Date layouts tried in order; the first strict parse wins.
///
/// Month-first comes before day-first, so an ambiguous token such as
/// "01-02-2023" is January 2nd.
pub const DATE_FORMATS: [&str; 7] = [
    "%m-%d-%Y",
    "%m_%d_%Y",
    "%d-%m-%Y",
    "%d_%m_%Y",
    "%Y%m%d",
    "%Y-%m-%d",
    "%Y_%m_%d",
];

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?xi)
            (?P<fund>.+?)
            \.
            (?P<date>
                \d{8}                      # YYYYMMDD
                |
                \d{2}[-_]\d{2}[-_]\d{4}    # MM DD YYYY or DD MM YYYY
                |
                \d{4}[-_]\d{2}[-_]\d{2}    # YYYY MM DD
            )",
        )
        .expect("identifier pattern is a valid regex")
    })
}

/// Split an identifier into its fund name and raw date token.
pub fn split_identifier(identifier: &str) -> Result<(&str, &str)> {
    let caps = identifier_pattern()
        .captures(identifier)
        .ok_or_else(|| ReconError::UnparsableIdentifier {
            identifier: identifier.to_string(),
        })?;

    match (caps.name("fund"), caps.name("date")) {
        (Some(fund), Some(date)) => Ok((fund.as_str(), date.as_str())),
        _ => Err(ReconError::UnparsableIdentifier {
            identifier: identifier.to_string(),
        }),
    }
}

/// Parse a date token using the fixed format priority.
pub fn parse_date_token(token: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

/// Parse a report identifier (file stem, extension already stripped).
pub fn parse(identifier: &str) -> Result<ParsedIdentity> {
    let (fund, token) = split_identifier(identifier)?;

    let report_date = parse_date_token(token).ok_or_else(|| ReconError::UnparsableDate {
        identifier: identifier.to_string(),
        token: token.to_string(),
    })?;

    Ok(ParsedIdentity {
        fund_name: fund.to_string(),
        report_date,
    })
}
