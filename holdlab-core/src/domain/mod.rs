//! Domain types for HoldLab

pub mod client;
pub mod error;
pub mod portfolio;
pub mod price_series;

pub use client::Client;
pub use error::PortfolioError;
pub use portfolio::{LedgerKey, Portfolio};
pub use price_series::{PriceSeries, RESOLUTION_OFFSETS};

/// Quantities closer to zero than this count as flat.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Round half away from zero to 2 decimal places (cents / hundredths of a share).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_cases() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.236), 1.24);
        assert_eq!(round2(-1.236), -1.24);
        assert_eq!(round2(6500.0), 6500.0);
    }
}
