//! Yahoo Finance price source.
//!
//! Fetches the full daily close history from Yahoo's v8 chart API. Handles
//! rate limiting, retries with exponential backoff and response parsing.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The CSV store is the fallback when Yahoo is unavailable.

use super::provider::{CloseHistory, DataError, PriceSource};
use super::universe::TickerUniverse;
use serde::Deserialize;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

/// Yahoo Finance price source. Tickers are validated against a universe.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    universe: TickerUniverse,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(universe: TickerUniverse) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            universe,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Chart API URL for the full daily history of a symbol.
    fn chart_url(symbol: &str) -> String {
        format!("https://query2.finance.yahoo.com/v8/finance/chart/{symbol}?range=max&interval=1d")
    }

    /// Parse the chart API response into a close history.
    ///
    /// Days with a missing or non-positive close are dropped; the gap is left
    /// to nearest-date resolution.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<CloseHistory, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::ResponseFormatChanged("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut history = CloseHistory::new();
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            match quote.close.get(i).copied().flatten() {
                Some(close) if close.is_finite() && close > 0.0 => {
                    history.insert(date, close);
                }
                _ => continue,
            }
        }

        if history.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(history)
    }

    /// Execute the HTTP request with retry logic.
    fn fetch_with_retry(&self, symbol: &str) -> Result<CloseHistory, DataError> {
        let url = Self::chart_url(symbol);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                tracing::warn!(symbol, attempt, ?delay, "retrying Yahoo request");
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        return Err(DataError::AuthenticationRequired(format!(
                            "Yahoo Finance refused the request (HTTP {status})"
                        )));
                    }

                    if !status.is_success() {
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    return Self::parse_response(symbol, chart);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl PriceSource for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn validate(&self, ticker: &str) -> bool {
        self.universe.contains(ticker)
    }

    fn fetch_history(&self, ticker: &str) -> Result<CloseHistory, DataError> {
        if !self.validate(ticker) {
            return Err(DataError::UnknownTicker {
                symbol: ticker.to_string(),
            });
        }
        self.fetch_with_retry(ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parse(json: &str) -> Result<CloseHistory, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("AAPL", resp)
    }

    #[test]
    fn parses_closes_and_skips_gaps() {
        // 2024-01-02 14:30 UTC, 2024-01-03 14:30 UTC, 2024-01-04 14:30 UTC
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"close":[185.64,null,181.91]}]}
        }],"error":null}}"#;
        let history = parse(json).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(
            history.get(&NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            Some(&185.64)
        );
        assert!(!history.contains_key(&NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()));
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        assert!(matches!(parse(json), Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn all_null_closes_is_symbol_not_found() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800],
            "indicators":{"quote":[{"close":[null]}]}
        }],"error":null}}"#;
        assert!(matches!(parse(json), Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn unknown_ticker_is_rejected_before_any_request() {
        let provider = YahooProvider::new(TickerUniverse::default_us()).unwrap();
        assert!(!provider.validate("NOTREAL"));
        assert!(matches!(
            provider.fetch_history("NOTREAL"),
            Err(DataError::UnknownTicker { .. })
        ));
    }
}
