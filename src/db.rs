// 🗄️ Reference Price Store
// Read-only adapter over the `equity_prices` table (DATETIME, SYMBOL, PRICE).

use chrono::NaiveDate;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::info;

use crate::error::{ReconError, Result};
use crate::schema::ReferencePrice;

/// DATETIME column layout in the reference store
pub const REFERENCE_DATE_FORMAT: &str = "%m/%d/%Y";

/// Anything that can hand over the full set of reference prices.
pub trait ReferencePriceSource {
    fn load_reference_prices(&self) -> Result<Vec<ReferencePrice>>;
}

/// In-memory prices (already loaded elsewhere)
impl ReferencePriceSource for Vec<ReferencePrice> {
    fn load_reference_prices(&self) -> Result<Vec<ReferencePrice>> {
        Ok(self.clone())
    }
}

// ============================================================================
// SQLITE SOURCE
// ============================================================================

pub struct SqliteEquityPriceSource {
    connection_string: String,
}

impl SqliteEquityPriceSource {
    pub fn new(connection_string: impl Into<String>) -> Self {
        SqliteEquityPriceSource {
            connection_string: connection_string.into(),
        }
    }
}

impl ReferencePriceSource for SqliteEquityPriceSource {
    fn load_reference_prices(&self) -> Result<Vec<ReferencePrice>> {
        // Connection is dropped (closed) on every exit path
        let conn = open_read_only(Path::new(&self.connection_string))?;
        let prices = load_equity_prices(&conn)?;
        info!(
            store = %self.connection_string,
            prices = prices.len(),
            "loaded reference prices"
        );
        Ok(prices)
    }
}

pub fn open_read_only(db_path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
    )
    .map_err(|source| ReconError::OpenStore {
        path: db_path.to_path_buf(),
        source,
    })
}

pub fn parse_reference_date(symbol: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), REFERENCE_DATE_FORMAT).map_err(|_| {
        ReconError::InvalidReferenceDate {
            symbol: symbol.to_string(),
            value: value.to_string(),
        }
    })
}

/// Load every row of `equity_prices`.
pub fn load_equity_prices(conn: &Connection) -> Result<Vec<ReferencePrice>> {
    let mut stmt = conn.prepare("SELECT DATETIME, SYMBOL, PRICE FROM equity_prices")?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
        ))
    })?;

    let mut prices = Vec::new();
    for row in rows {
        let (datetime, symbol, price) = row?;
        let as_of_date = parse_reference_date(&symbol, &datetime)?;
        prices.push(ReferencePrice {
            symbol,
            as_of_date,
            price,
        });
    }

    Ok(prices)
}

// ============================================================================
// TEST FIXTURES
// ============================================================================


// ============================================================================
// TESTS
// ============================================================================
