// 📐 Shape Layer - Record Schemas
// Canonical records passed between pipeline stages, plus the invariant checks
// each stage runs on its output before handing it on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    pub fn new(context: &str, field: &str, message: &str) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.to_string(),
            context: context.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// ============================================================================
// RAW HOLDING ROW (one CSV line, before filtering)
// ============================================================================

/// Only the fixed report columns are read; anything else in the file is ignored.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "FINANCIAL TYPE",
    "SYMBOL",
    "SECURITY NAME",
    "PRICE",
    "QUANTITY",
    "REALISED P/L",
    "MARKET VALUE",
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawHoldingRow {
    #[serde(rename = "FINANCIAL TYPE")]
    pub financial_type: String,

    #[serde(rename = "SYMBOL")]
    pub symbol: String,

    #[serde(rename = "SECURITY NAME")]
    pub security_name: String,

    #[serde(rename = "PRICE")]
    pub price: Option<f64>,

    #[serde(rename = "QUANTITY")]
    pub quantity: Option<f64>,

    #[serde(rename = "REALISED P/L")]
    pub realized_pnl: Option<f64>,

    #[serde(rename = "MARKET VALUE")]
    pub market_value: Option<f64>,

    /// Originating file stem, attached by the loader (not a CSV column)
    #[serde(skip)]
    pub source_identifier: String,
}

impl RawHoldingRow {
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.source_identifier.is_empty() {
            errors.push(ValidationError::new(
                "RawHoldingRow",
                "source_identifier",
                "Required field is empty",
            ));
        }

        finish(errors)
    }
}

// ============================================================================
// PARSED IDENTITY (derived from the filename)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIdentity {
    pub fund_name: String,
    pub report_date: NaiveDate,
}

// ============================================================================
// NORMALIZED HOLDING (equities only, all numerics present)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedHolding {
    pub symbol: String,
    pub security_name: String,
    pub price: f64,
    pub quantity: f64,
    pub realized_pnl: f64,
    pub market_value: f64,
    pub fund_name: String,
    pub report_date: NaiveDate,
}

impl NormalizedHolding {
    /// Build a holding from an equities row and its identity.
    ///
    /// Every numeric column must be present; nulls are reported, never coerced.
    pub fn from_raw(row: &RawHoldingRow, identity: &ParsedIdentity) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut require = |field: &str, value: Option<f64>| -> f64 {
            match value {
                Some(v) => v,
                None => {
                    errors.push(ValidationError::new(
                        "NormalizedHolding",
                        field,
                        "Required field is null",
                    ));
                    f64::NAN
                }
            }
        };

        let price = require("price", row.price);
        let quantity = require("quantity", row.quantity);
        let realized_pnl = require("realized_pnl", row.realized_pnl);
        let market_value = require("market_value", row.market_value);

        if !errors.is_empty() {
            return Err(errors);
        }

        let holding = NormalizedHolding {
            symbol: row.symbol.clone(),
            security_name: row.security_name.clone(),
            price,
            quantity,
            realized_pnl,
            market_value,
            fund_name: identity.fund_name.clone(),
            report_date: identity.report_date,
        };
        holding.validate()?;
        Ok(holding)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.fund_name.is_empty() {
            errors.push(ValidationError::new(
                "NormalizedHolding",
                "fund_name",
                "Required field is empty",
            ));
        }

        finish(errors)
    }
}

// ============================================================================
// REFERENCE PRICE (read-only, external store)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePrice {
    pub symbol: String,
    pub as_of_date: NaiveDate,
    pub price: f64,
}

// ============================================================================
// OUTPUT RECORDS
// ============================================================================

/// One reported price that differs from its as-of reference price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconDiscrepancy {
    #[serde(rename = "FundName")]
    pub fund_name: String,

    #[serde(rename = "Symbol")]
    pub symbol: String,

    #[serde(rename = "ReportDate")]
    pub report_date: NaiveDate,

    #[serde(rename = "ReportPrice")]
    pub reported_price: f64,

    #[serde(rename = "RefPrice")]
    pub reference_price: f64,
}

impl ReconDiscrepancy {
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        // Exact comparison: any representable deviation counts
        if self.reported_price == self.reference_price {
            errors.push(ValidationError::new(
                "ReconDiscrepancy",
                "reported_price",
                "Equal to reference price, not a discrepancy",
            ));
        }

        finish(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTopFund {
    /// Calendar month formatted as YYYY-MM
    #[serde(rename = "Date")]
    pub month: String,

    #[serde(rename = "TopFundName")]
    pub fund_name: String,

    #[serde(rename = "RateOfReturn")]
    pub rate_of_return: f64,
}

impl MonthlyTopFund {
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if !self.rate_of_return.is_finite() {
            errors.push(ValidationError::new(
                "MonthlyTopFund",
                "rate_of_return",
                "Rate of return must be finite",
            ));
        }

        if NaiveDate::parse_from_str(&format!("{}-01", self.month), "%Y-%m-%d").is_err() {
            errors.push(ValidationError::new(
                "MonthlyTopFund",
                "month",
                "Expected YYYY-MM",
            ));
        }

        finish(errors)
    }
}

/// Run `validate` over a batch, tagging the first failure with its position.
pub fn validate_all<T>(
    records: &[T],
    validate: impl Fn(&T) -> ValidationResult,
) -> Result<(), (usize, Vec<ValidationError>)> {
    for (idx, record) in records.iter().enumerate() {
        validate(record).map_err(|errors| (idx, errors))?;
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
