//! Ledger and price-series error taxonomy.
//!
//! Every variant is a caller-recoverable validation failure raised before any
//! state is touched. Messages are written to be shown verbatim in the CLI.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortfolioError {
    #[error("quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: f64 },

    #[error("{ticker} is not held in this portfolio")]
    UnknownInstrument { ticker: String },

    #[error("no holdings{}", .ticker.as_deref().map(|t| format!(" of {t}")).unwrap_or_default())]
    NoHoldings { ticker: Option<String> },

    #[error("cannot remove {requested} {ticker}: only {held} held")]
    InsufficientHoldings {
        ticker: String,
        held: f64,
        requested: f64,
    },

    #[error("invalid ticker symbol '{ticker}'")]
    InvalidTicker { ticker: String },

    #[error("invalid close price {price} for {ticker} on {date}")]
    InvalidPrice {
        ticker: String,
        date: NaiveDate,
        price: f64,
    },

    #[error("{ticker}: closing price for {date} must be after {latest} and not already recorded")]
    StaleOrDuplicateDate {
        ticker: String,
        date: NaiveDate,
        latest: NaiveDate,
    },

    #[error("no price data for {ticker} near {date}")]
    NoPriceData { ticker: String, date: NaiveDate },

    #[error("invalid date range: {start} to {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("time span too short: {days} day(s), need more than 5")]
    InsufficientSpan { days: i64 },

    #[error("{ticker} has no ledger entry on {date}")]
    MissingDateEntry { ticker: String, date: NaiveDate },

    #[error("target percentages add up to {:.2}%, expected 100%", .total * 100.0)]
    PercentageMismatch { total: f64 },

    #[error("target for {ticker} must be a non-negative percentage, got {:.2}%", .pct * 100.0)]
    InvalidTarget { ticker: String, pct: f64 },

    #[error("no target percentage given for {ticker}")]
    MissingTarget { ticker: String },

    #[error("rebalance plan belongs to portfolio '{plan}', not '{ledger}'")]
    ForeignPlan { plan: String, ledger: String },

    #[error("portfolio '{name}' already exists")]
    DuplicatePortfolio { name: String },

    #[error("invalid portfolio name '{name}'")]
    InvalidName { name: String },

    #[error("portfolio '{name}' not found")]
    UnknownPortfolio { name: String },
}
