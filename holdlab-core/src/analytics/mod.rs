//! Read-only analytics over price series and ledgers.

pub mod performance;
pub mod trend;

pub use performance::{ChartOutcome, ChartPoint, Granularity, PerformanceChart};
