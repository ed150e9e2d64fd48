// 🧹 Record Normalizer
// Raw rows → canonical equities holdings.
//
// Order matters:
//   1. attach the parsed identity (fund + date) by source identifier
//   2. keep only FinancialType == "Equities" (exact, case-sensitive)
//   3. remap fund names through the operator-supplied table
//   4. drop FinancialType / SourceIdentifier (NormalizedHolding has neither)

use std::collections::HashMap;
use tracing::debug;

use crate::error::{ReconError, Result};
use crate::schema::{NormalizedHolding, ParsedIdentity, RawHoldingRow, ValidationError};

pub const EQUITIES: &str = "Equities";

/// Fund-name lookup; names with no entry pass through unchanged.
pub fn map_fund_name<'a>(name: &'a str, fund_name_map: &'a HashMap<String, String>) -> &'a str {
    fund_name_map.get(name).map(String::as_str).unwrap_or(name)
}

pub fn is_equity(row: &RawHoldingRow) -> bool {
    row.financial_type == EQUITIES
}

/// Normalize raw rows into holdings.
///
/// `identities` must hold an entry for every source identifier in `rows`;
/// the filename parser has already failed the run for anything unparsable.
pub fn normalize(
    rows: &[RawHoldingRow],
    identities: &HashMap<String, ParsedIdentity>,
    fund_name_map: &HashMap<String, String>,
) -> Result<Vec<NormalizedHolding>> {
    let mut holdings = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;

    for (idx, row) in rows.iter().enumerate() {
        let record = || format!("{} row {}", row.source_identifier, idx + 1);

        row.validate().map_err(|v| ReconError::schema(record(), v))?;

        let identity = identities.get(&row.source_identifier).ok_or_else(|| {
            ReconError::schema(
                record(),
                vec![ValidationError::new(
                    "RawHoldingRow",
                    "source_identifier",
                    "No parsed identity for this identifier",
                )],
            )
        })?;

        if !is_equity(row) {
            dropped += 1;
            continue;
        }

        let mapped = ParsedIdentity {
            fund_name: map_fund_name(&identity.fund_name, fund_name_map).to_string(),
            report_date: identity.report_date,
        };

        let holding =
            NormalizedHolding::from_raw(row, &mapped).map_err(|v| ReconError::schema(record(), v))?;
        holdings.push(holding);
    }

    debug!(
        kept = holdings.len(),
        dropped_non_equity = dropped,
        "normalized holdings"
    );
    Ok(holdings)
}
