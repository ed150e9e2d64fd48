// 🏆 Top Fund Ranking - Best month-over-month performer per calendar month
//
// Per fund, per report date:
//   MarketValueSum = Σ market_value      RealizedPnlSum = Σ realized_pnl
//
// Rate of return against the fund's previous report date (gaps allowed):
//   RoR_t = (MV_t - MV_{t-1} + PnL_t) / MV_{t-1}
//
// A fund's first report date has no prior period and yields no rate. A zero
// prior market value yields a non-finite rate, which is dropped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::schema::{MonthlyTopFund, NormalizedHolding};

// ============================================================================
// INTERMEDIATE RECORDS
// ============================================================================

/// Holdings of one fund on one report date, summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundDateAggregate {
    pub fund_name: String,
    pub report_date: NaiveDate,
    pub market_value_sum: f64,
    pub realized_pnl_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundReturn {
    pub fund_name: String,
    pub report_date: NaiveDate,
    pub rate_of_return: f64,
}

impl FundReturn {
    pub fn month(&self) -> String {
        self.report_date.format("%Y-%m").to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    /// One row per month with at least one defined rate, oldest first
    pub top_funds: Vec<MonthlyTopFund>,

    /// Per-fund first observations (no prior period)
    pub first_observations: usize,

    /// Rates dropped because the prior market value sum was zero
    pub undefined_returns: usize,
}

// ============================================================================
// RANKER
// ============================================================================

pub struct TopFundRanker;

impl TopFundRanker {
    pub fn new() -> Self {
        TopFundRanker
    }

    pub fn rank(&self, holdings: &[NormalizedHolding]) -> RankingReport {
        let aggregates = aggregate_by_fund_and_date(holdings);
        let (returns, first_observations, undefined_returns) = compute_returns(&aggregates);
        let top_funds = select_monthly_leaders(&returns);

        info!(
            funds_dates = aggregates.len(),
            returns = returns.len(),
            first_observations,
            undefined_returns,
            months = top_funds.len(),
            "ranked funds by monthly rate of return"
        );

        RankingReport {
            top_funds,
            first_observations,
            undefined_returns,
        }
    }
}

impl Default for TopFundRanker {
    fn default() -> Self {
        Self::new()
    }
}

/// Monthly leaders only (exclusion counts are in `TopFundRanker::rank`).
pub fn rank(holdings: &[NormalizedHolding]) -> Vec<MonthlyTopFund> {
    TopFundRanker::new().rank(holdings).top_funds
}

// ============================================================================
// STEPS
// ============================================================================

/// Step 1: collapse security-level rows into one row per (fund, date).
///
/// Output is ordered by fund name, then date.
pub fn aggregate_by_fund_and_date(holdings: &[NormalizedHolding]) -> Vec<FundDateAggregate> {
    let mut sums: BTreeMap<(&str, NaiveDate), (f64, f64)> = BTreeMap::new();

    for h in holdings {
        let entry = sums
            .entry((h.fund_name.as_str(), h.report_date))
            .or_insert((0.0, 0.0));
        entry.0 += h.market_value;
        entry.1 += h.realized_pnl;
    }

    sums.into_iter()
        .map(|((fund, date), (mv, pnl))| FundDateAggregate {
            fund_name: fund.to_string(),
            report_date: date,
            market_value_sum: mv,
            realized_pnl_sum: pnl,
        })
        .collect()
}

/// Step 2: rate of return against each fund's previous report date.
///
/// Expects the (fund, date) ordering produced by `aggregate_by_fund_and_date`.
/// Returns (rates, first observations skipped, undefined rates dropped).
pub fn compute_returns(aggregates: &[FundDateAggregate]) -> (Vec<FundReturn>, usize, usize) {
    let mut returns = Vec::new();
    let mut first_observations = 0;
    let mut undefined = 0;
    let mut prev: Option<&FundDateAggregate> = None;

    for agg in aggregates {
        let previous = prev.filter(|p| p.fund_name == agg.fund_name);
        prev = Some(agg);

        let Some(previous) = previous else {
            first_observations += 1;
            continue;
        };

        let rate = (agg.market_value_sum - previous.market_value_sum + agg.realized_pnl_sum)
            / previous.market_value_sum;

        if !rate.is_finite() {
            undefined += 1;
            debug!(
                fund = %agg.fund_name,
                date = %agg.report_date,
                "undefined rate of return (zero prior market value)"
            );
            continue;
        }

        returns.push(FundReturn {
            fund_name: agg.fund_name.clone(),
            report_date: agg.report_date,
            rate_of_return: rate,
        });
    }

    (returns, first_observations, undefined)
}

/// Step 3: highest rate per calendar month.
///
/// Exact ties go to the lexicographically lowest fund name.
pub fn select_monthly_leaders(returns: &[FundReturn]) -> Vec<MonthlyTopFund> {
    let mut leaders: BTreeMap<String, &FundReturn> = BTreeMap::new();

    for r in returns {
        leaders
            .entry(r.month())
            .and_modify(|best| {
                let better = r.rate_of_return > best.rate_of_return
                    || (r.rate_of_return == best.rate_of_return && r.fund_name < best.fund_name);
                if better {
                    *best = r;
                }
            })
            .or_insert(r);
    }

    leaders
        .into_iter()
        .map(|(month, best)| MonthlyTopFund {
            month,
            fund_name: best.fund_name.clone(),
            rate_of_return: best.rate_of_return,
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
