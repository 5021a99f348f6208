//! HoldLab Core — time-indexed holdings ledger and valuation engine.
//!
//! This crate contains:
//! - Domain types (price series, ledgers, owners) and their errors
//! - As-of quantities and values derived from a date-bucketed delta ledger
//! - Trend analytics and the multi-granularity performance chart
//! - Two-phase proportional rebalancing
//! - Snapshot persistence of ledgers
//! - Market-data sources (Yahoo Finance, local CSV store) behind `PriceSource`

pub mod analytics;
pub mod config;
pub mod data;
pub mod domain;
pub mod rebalance;
pub mod snapshot;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: all core domain types are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::PriceSeries>();
        require_sync::<domain::PriceSeries>();
        require_send::<domain::Portfolio>();
        require_sync::<domain::Portfolio>();
        require_send::<domain::LedgerKey>();
        require_sync::<domain::LedgerKey>();
        require_send::<domain::Client>();
        require_sync::<domain::Client>();
        require_send::<domain::PortfolioError>();
        require_sync::<domain::PortfolioError>();

        // Analytics and rebalancing
        require_send::<analytics::PerformanceChart>();
        require_sync::<analytics::PerformanceChart>();
        require_send::<rebalance::RebalancePlan>();
        require_sync::<rebalance::RebalancePlan>();

        // Data layer
        require_send::<data::PriceBook>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
        require_send::<data::CsvHistoryStore>();
        require_sync::<data::CsvHistoryStore>();
        require_send::<data::TickerUniverse>();
        require_sync::<data::TickerUniverse>();
        require_send::<snapshot::SnapshotError>();
        require_sync::<snapshot::SnapshotError>();
        require_send::<config::AppConfig>();
        require_sync::<config::AppConfig>();
    }

    /// Architecture contract: a ledger never mutates the series it holds.
    ///
    /// Read paths take `&PriceSeries` through the shared `Arc`; the only
    /// mutation, `add_closing`, needs `&mut PriceSeries`, which an `Arc`
    /// cannot hand out without `make_mut` in `PriceBook`.
    #[test]
    fn ledger_reads_series_through_shared_handles() {
        fn _check(portfolio: &domain::Portfolio) -> Vec<&std::sync::Arc<domain::PriceSeries>> {
            portfolio.instruments().collect()
        }
    }
}
