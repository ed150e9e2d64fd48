// ⚖️ Reconciliation Engine - Reported prices vs reference prices
//
// Backward as-of join: each holding is paired with the reference price for
// the same symbol whose AsOfDate is the latest one <= ReportDate.
//
//   reference:  AAPL 01/31 → 144.29     AAPL 02/28 → 147.41
//   holding:    AAPL reported 02/15 @ 144.29   → matched 01/31, no discrepancy
//   holding:    AAPL reported 03/31 @ 150.00   → matched 02/28, discrepancy
//   holding:    AAPL reported 01/15 @ 140.00   → no match, excluded
//
// Prices are compared with exact f64 equality; any deviation is reported.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::schema::{NormalizedHolding, ReconDiscrepancy, ReferencePrice};

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// One entry per holding whose reported price differs from its as-of price
    pub discrepancies: Vec<ReconDiscrepancy>,

    /// Holdings paired with a reference price (matching or not)
    pub matched_count: usize,

    /// Holdings dated before every reference price for their symbol
    pub unmatched_count: usize,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciliation: {} holdings matched, {} without reference price, {} discrepancies",
            self.matched_count,
            self.unmatched_count,
            self.discrepancies.len()
        )
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Reconcile holdings against reference prices.
    ///
    /// Runs in O((H + R) log(H + R)): both sides are sorted by (symbol, date)
    /// and walked once, merge-style.
    pub fn reconcile(
        &self,
        holdings: &[NormalizedHolding],
        ref_prices: &[ReferencePrice],
    ) -> ReconciliationReport {
        let mut left: Vec<&NormalizedHolding> = holdings.iter().collect();
        left.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then_with(|| a.report_date.cmp(&b.report_date))
        });

        let mut right: Vec<&ReferencePrice> = ref_prices.iter().collect();
        right.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then_with(|| a.as_of_date.cmp(&b.as_of_date))
        });

        let mut report = ReconciliationReport::default();
        let mut r = 0usize;
        // Latest reference seen for the current symbol
        let mut current: Option<&ReferencePrice> = None;

        for holding in left {
            if current.map_or(false, |c| c.symbol != holding.symbol) {
                current = None;
            }

            // Skip reference rows for symbols before this holding's symbol
            while r < right.len() && right[r].symbol < holding.symbol {
                r += 1;
            }

            // Advance through this symbol's prices up to the report date
            while r < right.len()
                && right[r].symbol == holding.symbol
                && right[r].as_of_date <= holding.report_date
            {
                // Equal dates: the later row in stable order wins
                current = Some(right[r]);
                r += 1;
            }

            let Some(reference) = current else {
                report.unmatched_count += 1;
                debug!(
                    fund = %holding.fund_name,
                    symbol = %holding.symbol,
                    date = %holding.report_date,
                    "no reference price on or before report date"
                );
                continue;
            };

            report.matched_count += 1;
            if holding.price != reference.price {
                report.discrepancies.push(ReconDiscrepancy {
                    fund_name: holding.fund_name.clone(),
                    symbol: holding.symbol.clone(),
                    report_date: holding.report_date,
                    reported_price: holding.price,
                    reference_price: reference.price,
                });
            }
        }

        info!(
            matched = report.matched_count,
            unmatched = report.unmatched_count,
            discrepancies = report.discrepancies.len(),
            "reconciled holdings against reference prices"
        );
        report
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Discrepancies only (exclusion counts are in `ReconciliationEngine::reconcile`).
pub fn reconcile(holdings: &[NormalizedHolding], ref_prices: &[ReferencePrice]) -> Vec<ReconDiscrepancy> {
    ReconciliationEngine::new()
        .reconcile(holdings, ref_prices)
        .discrepancies
}

/// Order discrepancies the way the recon report lists them.
pub fn compare_discrepancies(a: &ReconDiscrepancy, b: &ReconDiscrepancy) -> Ordering {
    a.symbol
        .cmp(&b.symbol)
        .then_with(|| a.report_date.cmp(&b.report_date))
        .then_with(|| a.fund_name.cmp(&b.fund_name))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn holding(fund: &str, symbol: &str, report_date: &str, price: f64) -> NormalizedHolding {
        NormalizedHolding {
            symbol: symbol.to_string(),
            security_name: format!("{symbol} Corp"),
            price,
            quantity: 1.0,
            realized_pnl: 0.0,
            market_value: price,
            fund_name: fund.to_string(),
            report_date: date(report_date),
        }
    }

    fn reference(symbol: &str, as_of: &str, price: f64) -> ReferencePrice {
        ReferencePrice {
            symbol: symbol.to_string(),
            as_of_date: date(as_of),
            price,
        }
    }

    #[test]
    fn test_exact_match_emits_nothing() {
        let holdings = vec![holding("Applebead", "AAPL", "2023-02-28", 147.41)];
        let refs = vec![reference("AAPL", "2023-02-28", 147.41)];

        let report = ReconciliationEngine::new().reconcile(&holdings, &refs);

        assert!(report.is_clean());
        assert_eq!(report.matched_count, 1);
        assert_eq!(report.unmatched_count, 0);
    }

    #[test]
    fn test_price_delta_emits_one_discrepancy() {
        let holdings = vec![holding("Applebead", "AAPL", "2023-02-28", 150.0)];
        let refs = vec![reference("AAPL", "2023-02-28", 147.41)];

        let discrepancies = reconcile(&holdings, &refs);

        assert_eq!(discrepancies.len(), 1);
        let d = &discrepancies[0];
        assert_eq!(d.fund_name, "Applebead");
        assert_eq!(d.symbol, "AAPL");
        assert_eq!(d.report_date, date("2023-02-28"));
        assert_eq!(d.reported_price, 150.0);
        assert_eq!(d.reference_price, 147.41);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_tiny_delta_is_still_a_discrepancy() {
        // No tolerance: 0.1 + 0.2 != 0.3 in f64
        let holdings = vec![holding("Leeder", "MSFT", "2023-01-31", 0.1 + 0.2)];
        let refs = vec![reference("MSFT", "2023-01-31", 0.3)];

        assert_eq!(reconcile(&holdings, &refs).len(), 1);
    }

    #[test]
    fn test_holding_before_all_references_is_excluded() {
        let holdings = vec![holding("Leeder", "AAPL", "2023-01-15", 140.0)];
        let refs = vec![reference("AAPL", "2023-01-31", 144.29)];

        let report = ReconciliationEngine::new().reconcile(&holdings, &refs);

        assert!(report.discrepancies.is_empty());
        assert_eq!(report.matched_count, 0);
        assert_eq!(report.unmatched_count, 1);
    }

    #[test]
    fn test_backward_match_uses_latest_prior_price() {
        let holdings = vec![
            holding("Leeder", "AAPL", "2023-02-15", 144.29),
            holding("Leeder", "AAPL", "2023-03-31", 150.0),
        ];
        let refs = vec![
            reference("AAPL", "2023-02-28", 147.41),
            reference("AAPL", "2023-01-31", 144.29),
            reference("AAPL", "2023-04-28", 169.68), // after every holding
        ];

        let discrepancies = reconcile(&holdings, &refs);

        assert_eq!(discrepancies.len(), 1);
        assert_eq!(discrepancies[0].report_date, date("2023-03-31"));
        assert_eq!(discrepancies[0].reference_price, 147.41);
    }

    #[test]
    fn test_symbols_never_cross_match() {
        let holdings = vec![
            holding("Belaware", "MSFT", "2023-02-28", 250.0),
            holding("Belaware", "AAPL", "2023-02-28", 147.41),
            holding("Belaware", "ZZZZ", "2023-02-28", 1.0),
        ];
        let refs = vec![
            reference("AAPL", "2023-02-28", 147.41),
            reference("BBBB", "2023-01-01", 250.0),
            reference("MSFT", "2023-03-01", 249.42), // after report date
        ];

        let report = ReconciliationEngine::new().reconcile(&holdings, &refs);

        assert!(report.is_clean());
        assert_eq!(report.matched_count, 1);
        assert_eq!(report.unmatched_count, 2);
    }

    #[test]
    fn test_same_date_duplicates_pick_last_in_input_order() {
        let holdings = vec![holding("Virtous", "TSLA", "2023-05-31", 203.93)];
        let refs = vec![
            reference("TSLA", "2023-05-31", 200.0),
            reference("TSLA", "2023-05-31", 203.93),
        ];

        assert!(reconcile(&holdings, &refs).is_empty());
    }

    #[test]
    fn test_multiple_funds_same_symbol_and_date() {
        let holdings = vec![
            holding("Virtous", "AAPL", "2023-02-28", 147.0),
            holding("Applebead", "AAPL", "2023-02-28", 147.41),
            holding("Gohen", "AAPL", "2023-02-28", 148.0),
        ];
        let refs = vec![reference("AAPL", "2023-01-31", 147.41)];

        let mut discrepancies = reconcile(&holdings, &refs);
        discrepancies.sort_by(compare_discrepancies);

        let funds: Vec<&str> = discrepancies.iter().map(|d| d.fund_name.as_str()).collect();
        assert_eq!(funds, vec!["Gohen", "Virtous"]);
    }

    #[test]
    fn test_result_independent_of_input_order() {
        let mut holdings = vec![
            holding("A", "AAPL", "2023-01-31", 1.0),
            holding("A", "AAPL", "2023-02-28", 2.0),
            holding("B", "MSFT", "2023-02-28", 3.0),
        ];
        let mut refs = vec![
            reference("AAPL", "2023-01-31", 1.5),
            reference("AAPL", "2023-02-28", 2.5),
            reference("MSFT", "2023-02-01", 3.5),
        ];

        let forward = reconcile(&holdings, &refs);
        holdings.reverse();
        refs.reverse();
        let backward = reconcile(&holdings, &refs);

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 3);
    }

    #[test]
    fn test_empty_inputs() {
        let report = ReconciliationEngine::new().reconcile(&[], &[]);
        assert_eq!(report, ReconciliationReport::default());

        let holdings = vec![holding("A", "AAPL", "2023-01-31", 1.0)];
        let report = ReconciliationEngine::new().reconcile(&holdings, &[]);
        assert_eq!(report.unmatched_count, 1);

        println!("✅ {}", report.summary());
    }
}
