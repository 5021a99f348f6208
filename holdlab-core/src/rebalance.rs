//! Proportional rebalancing toward target percentages.
//!
//! Rebalancing is split in two phases. [`Portfolio::plan_rebalance`] values
//! the ledger and computes every trade from that single pre-trade valuation;
//! [`Portfolio::commit_rebalance`] re-checks the plan against the ledger and
//! only then issues the buys and sells. Nothing is mutated until the commit.

use crate::domain::{LedgerKey, Portfolio, PortfolioError, QUANTITY_EPSILON};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Targets must sum to 1.0 within this tolerance.
pub const TARGET_TOLERANCE: f64 = 0.001;

/// Sells may exceed the held quantity by this many shares and are clamped.
///
/// Current values are rounded to cents before the share delta is derived, so
/// a full liquidation can overshoot the position by a fraction of a share.
const SELL_CLAMP_TOLERANCE: f64 = 0.01;

/// One instrument's pre-trade valuation.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub ticker: String,
    pub current_value: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTrade {
    pub ticker: String,
    pub current_value: f64,
    pub target_value: f64,
    pub close: f64,
    /// Signed share delta: positive buys, negative sells, zero holds.
    pub shares: f64,
}

impl PlannedTrade {
    pub fn side(&self) -> Option<TradeSide> {
        if self.shares > 0.0 {
            Some(TradeSide::Buy)
        } else if self.shares < 0.0 {
            Some(TradeSide::Sell)
        } else {
            None
        }
    }
}

/// Check a target set against the instruments it must cover.
///
/// Every instrument needs a target, no target may name anything else, each
/// target must be a non-negative fraction and together they must sum to 1.
pub fn validate_targets<'a>(
    instruments: impl IntoIterator<Item = &'a str>,
    targets: &BTreeMap<String, f64>,
) -> Result<(), PortfolioError> {
    let instruments: Vec<&str> = instruments.into_iter().collect();
    if let Some(missing) = instruments.iter().find(|t| !targets.contains_key(**t)) {
        return Err(PortfolioError::MissingTarget {
            ticker: missing.to_string(),
        });
    }
    if let Some(extra) = targets
        .keys()
        .find(|t| !instruments.contains(&t.as_str()))
    {
        return Err(PortfolioError::UnknownInstrument {
            ticker: extra.clone(),
        });
    }
    if let Some((ticker, &pct)) = targets
        .iter()
        .find(|(_, p)| !p.is_finite() || **p < 0.0)
    {
        return Err(PortfolioError::InvalidTarget {
            ticker: ticker.clone(),
            pct,
        });
    }
    let total: f64 = targets.values().sum();
    if (total - 1.0).abs() > TARGET_TOLERANCE {
        return Err(PortfolioError::PercentageMismatch { total });
    }
    Ok(())
}

/// Compute trades from a valuation snapshot.
///
/// `targets` is expected to be validated; an instrument without a target is
/// treated as a 0% target. Every trade is derived from the same `total`.
pub fn plan_trades(
    valuations: &[Valuation],
    total: f64,
    targets: &BTreeMap<String, f64>,
) -> Vec<PlannedTrade> {
    valuations
        .iter()
        .map(|v| {
            let pct = targets.get(&v.ticker).copied().unwrap_or(0.0);
            let target_value = total * pct;
            let shares = if v.current_value < target_value {
                (target_value - v.current_value) / v.close
            } else if v.current_value > target_value {
                -(v.current_value - target_value) / v.close
            } else {
                0.0
            };
            PlannedTrade {
                ticker: v.ticker.clone(),
                current_value: v.current_value,
                target_value,
                close: v.close,
                shares,
            }
        })
        .collect()
}

/// A rebalance computed for one ledger on one date, not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancePlan {
    pub ledger: LedgerKey,
    pub date: NaiveDate,
    pub total_value: f64,
    pub trades: Vec<PlannedTrade>,
}

impl RebalancePlan {
    /// Trades that actually move shares.
    pub fn active_trades(&self) -> impl Iterator<Item = &PlannedTrade> {
        self.trades
            .iter()
            .filter(|t| t.shares.abs() >= QUANTITY_EPSILON)
    }
}

impl fmt::Display for RebalancePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Rebalance of portfolio '{}' on {} (total ${:.2})",
            self.ledger.name, self.date, self.total_value
        )?;
        writeln!(f, "The new distribution will be:")?;
        for (i, trade) in self.trades.iter().enumerate() {
            write!(
                f,
                "{}: current ${:.2}, target ${:.2}",
                trade.ticker, trade.current_value, trade.target_value
            )?;
            match trade.side() {
                Some(TradeSide::Buy) => write!(
                    f,
                    " (buy {:.4} shares @ ${:.2})",
                    trade.shares, trade.close
                )?,
                Some(TradeSide::Sell) => write!(
                    f,
                    " (sell {:.4} shares @ ${:.2})",
                    -trade.shares,
                    trade.close
                )?,
                None => {}
            }
            if i + 1 < self.trades.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RebalanceOutcome {
    Applied(RebalancePlan),
    Cancelled,
}

impl Portfolio {
    /// Value every instrument on `date` and plan the trades toward `targets`.
    ///
    /// Targets are fractions (0.25 = 25%). Every instrument in the ledger must
    /// have a delta recorded exactly on `date`.
    pub fn plan_rebalance(
        &self,
        targets: &BTreeMap<String, f64>,
        date: NaiveDate,
    ) -> Result<RebalancePlan, PortfolioError> {
        if self.holdings.is_empty() {
            return Err(PortfolioError::NoHoldings { ticker: None });
        }
        if let Some(ticker) = self
            .holdings
            .keys()
            .find(|t| !self.has_entry_on(t, date))
        {
            return Err(PortfolioError::MissingDateEntry {
                ticker: ticker.clone(),
                date,
            });
        }
        validate_targets(self.holdings.keys().map(String::as_str), targets)?;

        let mut valuations = Vec::with_capacity(self.holdings.len());
        for (ticker, holding) in &self.holdings {
            valuations.push(Valuation {
                ticker: ticker.clone(),
                current_value: self.stock_value(ticker, date)?,
                close: holding.series.closing_price(date)?,
            });
        }
        let total_value = valuations.iter().map(|v| v.current_value).sum();
        let trades = plan_trades(&valuations, total_value, targets);

        Ok(RebalancePlan {
            ledger: self.key().clone(),
            date,
            total_value,
            trades,
        })
    }

    /// Apply a plan produced by [`Portfolio::plan_rebalance`].
    ///
    /// The whole plan is checked before the first mutation: it must belong to
    /// this ledger and every sell must be covered by the current position.
    /// Returns the number of trades applied.
    pub fn commit_rebalance(&mut self, plan: &RebalancePlan) -> Result<usize, PortfolioError> {
        if &plan.ledger != self.key() {
            return Err(PortfolioError::ForeignPlan {
                plan: plan.ledger.to_string(),
                ledger: self.key().to_string(),
            });
        }

        let mut sells = Vec::new();
        let mut buys = Vec::new();
        for trade in plan.active_trades() {
            let holding = self.holdings.get(&trade.ticker).ok_or_else(|| {
                PortfolioError::UnknownInstrument {
                    ticker: trade.ticker.clone(),
                }
            })?;
            let series = Arc::clone(&holding.series);
            if trade.shares > 0.0 {
                buys.push((series, trade.shares));
                continue;
            }

            let requested = -trade.shares;
            if holding.total() < QUANTITY_EPSILON {
                return Err(PortfolioError::NoHoldings {
                    ticker: Some(trade.ticker.clone()),
                });
            }
            let held = holding.available_from(plan.date);
            if requested > held + SELL_CLAMP_TOLERANCE {
                return Err(PortfolioError::InsufficientHoldings {
                    ticker: trade.ticker.clone(),
                    held,
                    requested,
                });
            }
            sells.push((series, requested.min(held)));
        }

        let applied = sells.len() + buys.len();
        for (series, quantity) in sells {
            self.remove_stock(&series, quantity, plan.date)?;
        }
        for (series, quantity) in buys {
            self.add_stock(&series, quantity, plan.date)?;
        }

        tracing::debug!(portfolio = %self.key(), date = %plan.date, applied, "rebalanced");
        Ok(applied)
    }

    /// Plan, ask `confirm`, and commit only when it answers `true`.
    pub fn rebalance<F>(
        &mut self,
        targets: &BTreeMap<String, f64>,
        date: NaiveDate,
        confirm: F,
    ) -> Result<RebalanceOutcome, PortfolioError>
    where
        F: FnOnce(&RebalancePlan) -> bool,
    {
        let plan = self.plan_rebalance(targets, date)?;
        if !confirm(&plan) {
            return Ok(RebalanceOutcome::Cancelled);
        }
        self.commit_rebalance(&plan)?;
        Ok(RebalanceOutcome::Applied(plan))
    }
}
