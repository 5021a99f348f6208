//! HoldLab CLI — portfolio ledgers, valuations and price analytics.
//!
//! Commands:
//! - `fetch` — download close histories from Yahoo Finance into the CSV store
//! - `create`, `buy`, `sell` — manage ledgers (saved as snapshot files)
//! - `value`, `holdings`, `distribution`, `performance` — as-of queries
//! - `rebalance` — preview and apply a proportional rebalance
//! - `moving-average`, `gain-loss`, `crossover` — single-ticker analytics
//! - `list` — list ledgers

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use holdlab_core::analytics::ChartOutcome;
use holdlab_core::config::{AppConfig, ProviderKind};
use holdlab_core::data::{
    download_histories, CsvHistoryStore, PriceBook, PriceSource, StdoutProgress,
    StoreFirstSource, TickerUniverse, YahooProvider,
};
use holdlab_core::domain::Client;
use holdlab_core::rebalance::RebalanceOutcome;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "holdlab",
    about = "HoldLab CLI — time-indexed portfolio ledger and valuation"
)]
struct Cli {
    /// Path to a TOML config file. Missing file means defaults.
    #[arg(long, global = true, default_value = "holdlab.toml")]
    config: PathBuf,

    /// Offline mode: use the local CSV store only.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download close histories into the local CSV store.
    Fetch {
        /// Tickers to download (e.g., AAPL MSFT).
        #[arg(required = true, value_parser = parse_ticker)]
        tickers: Vec<String>,

        /// Re-download tickers that are already stored.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Create an empty portfolio.
    Create { portfolio: String },
    /// Record a purchase.
    Buy {
        portfolio: String,
        #[arg(value_parser = parse_ticker)]
        ticker: String,
        quantity: f64,
        /// Trade date (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
    /// Record a sale.
    Sell {
        portfolio: String,
        #[arg(value_parser = parse_ticker)]
        ticker: String,
        quantity: f64,
        /// Trade date (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
    /// Total portfolio value on a date.
    Value {
        portfolio: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
    /// Holdings as of a date.
    Holdings {
        portfolio: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
    /// Per-instrument value breakdown on a date.
    Distribution {
        portfolio: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
    /// Asterisk chart of portfolio value over a range.
    Performance {
        portfolio: String,
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
    },
    /// Rebalance toward target percentages on a date.
    Rebalance {
        portfolio: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,

        /// Target as TICKER=PERCENT, once per held ticker (e.g., AAPL=40).
        #[arg(long = "target", required = true, value_parser = parse_target)]
        targets: Vec<(String, f64)>,

        /// Apply without asking for confirmation.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Trailing moving average of a ticker's close.
    MovingAverage {
        #[arg(value_parser = parse_ticker)]
        ticker: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        /// Window length in days.
        #[arg(long)]
        days: u32,
    },
    /// Close-to-close change between two dates.
    GainLoss {
        #[arg(value_parser = parse_ticker)]
        ticker: String,
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
    },
    /// Dates whose close is above the trailing moving average.
    Crossover {
        #[arg(value_parser = parse_ticker)]
        ticker: String,
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
        #[arg(long)]
        days: u32,
    },
    /// List portfolios.
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)?;
    let mut app = App::new(config, cli.offline)?;

    match cli.command {
        Commands::Fetch { tickers, force } => app.fetch(&tickers, force),
        Commands::Create { portfolio } => {
            app.client.create_portfolio(&portfolio)?;
            app.save()?;
            println!("Created portfolio '{portfolio}'");
            Ok(())
        }
        Commands::Buy {
            portfolio,
            ticker,
            quantity,
            date,
        } => {
            let series = app.book.series(&ticker)?;
            app.client
                .require_mut(&portfolio)?
                .add_stock(&series, quantity, date)?;
            app.save()?;
            println!("Bought {quantity} {ticker} in '{portfolio}' on {date}");
            Ok(())
        }
        Commands::Sell {
            portfolio,
            ticker,
            quantity,
            date,
        } => {
            let series = app.book.series(&ticker)?;
            app.client
                .require_mut(&portfolio)?
                .remove_stock(&series, quantity, date)?;
            app.save()?;
            println!("Sold {quantity} {ticker} from '{portfolio}' on {date}");
            Ok(())
        }
        Commands::Value { portfolio, date } => {
            let value = app.client.require(&portfolio)?.portfolio_value(date)?;
            println!("Value of '{portfolio}' on {date}: ${value:.2}");
            Ok(())
        }
        Commands::Holdings { portfolio, date } => {
            println!("{}", app.client.require(&portfolio)?.print_stocks(date));
            Ok(())
        }
        Commands::Distribution { portfolio, date } => {
            let text = app.client.require(&portfolio)?.distribution_of_value(date)?;
            println!("{text}");
            Ok(())
        }
        Commands::Performance {
            portfolio,
            start,
            end,
        } => {
            let outcome = app.client.require(&portfolio)?.performance_over_time(start, end)?;
            if let ChartOutcome::Chart(chart) = &outcome {
                tracing::debug!(points = chart.points.len(), scale = chart.scale, "chart built");
            }
            println!("{outcome}");
            Ok(())
        }
        Commands::Rebalance {
            portfolio,
            date,
            targets,
            yes,
        } => app.rebalance(&portfolio, date, targets, yes),
        Commands::MovingAverage { ticker, date, days } => {
            let average = app.book.series(&ticker)?.moving_average(date, days)?;
            println!("{days}-day moving average of {ticker} on {date}: {average:.2}");
            Ok(())
        }
        Commands::GainLoss { ticker, start, end } => {
            let change = app.book.series(&ticker)?.gain_loss(start, end)?;
            let verb = if change >= 0.0 { "gained" } else { "lost" };
            println!("{ticker} {verb} ${:.2} from {start} to {end}", change.abs());
            Ok(())
        }
        Commands::Crossover {
            ticker,
            start,
            end,
            days,
        } => {
            let dates = app.book.series(&ticker)?.crossovers(start, end, days)?;
            if dates.is_empty() {
                println!("{ticker} never closed above its {days}-day average from {start} to {end}");
            } else {
                println!("{ticker} closed above its {days}-day average on:");
                for date in dates {
                    println!("  {date}");
                }
            }
            Ok(())
        }
        Commands::List => {
            let names = app.client.portfolio_names();
            if names.is_empty() {
                println!("No portfolios in {}", app.config.portfolio_dir.display());
            }
            for name in names {
                println!("{name}");
            }
            Ok(())
        }
    }
}

/// Loaded configuration, price book and ledgers for one invocation.
struct App {
    config: AppConfig,
    universe: TickerUniverse,
    offline: bool,
    book: PriceBook,
    client: Client,
}

impl App {
    fn new(config: AppConfig, offline: bool) -> Result<Self> {
        let universe = match &config.universe_file {
            Some(path) => TickerUniverse::from_file(path)?,
            None => TickerUniverse::default_us(),
        };

        let store = CsvHistoryStore::new(&config.data_dir, universe.clone());
        let source = if offline || config.provider == ProviderKind::Csv {
            StoreFirstSource::offline(store)
        } else {
            StoreFirstSource::new(store, Box::new(YahooProvider::new(universe.clone())?))
        };
        let mut book = PriceBook::new(Box::new(source));

        let mut client = Client::new(config.owner.clone());
        if config.portfolio_dir.is_dir() {
            let summary = client.load_portfolios(&config.portfolio_dir, &mut book)?;
            for (path, err) in &summary.failed {
                eprintln!("Warning: skipped {}: {err}", path.display());
            }
        }

        Ok(Self {
            config,
            universe,
            offline,
            book,
            client,
        })
    }

    fn save(&self) -> Result<()> {
        self.client
            .save_portfolios(&self.config.portfolio_dir)
            .with_context(|| {
                format!(
                    "saving portfolios to {}",
                    self.config.portfolio_dir.display()
                )
            })?;
        Ok(())
    }

    fn fetch(&self, tickers: &[String], force: bool) -> Result<()> {
        if self.offline {
            bail!("fetch needs network access; drop --offline");
        }
        let provider = YahooProvider::new(self.universe.clone())?;
        let store = CsvHistoryStore::new(&self.config.data_dir, self.universe.clone());
        let refs: Vec<&str> = tickers.iter().map(String::as_str).collect();

        let summary = download_histories(&provider, &store, &refs, force, &StdoutProgress);
        if !summary.all_succeeded() {
            for (ticker, err) in &summary.errors {
                eprintln!("Error for {ticker}: {err}");
            }
            std::process::exit(1);
        }
        tracing::info!(source = provider.name(), count = summary.succeeded, "fetch complete");
        Ok(())
    }

    fn rebalance(
        &mut self,
        portfolio: &str,
        date: NaiveDate,
        targets: Vec<(String, f64)>,
        yes: bool,
    ) -> Result<()> {
        let mut fractions = BTreeMap::new();
        for (ticker, percent) in targets {
            if fractions.insert(ticker.clone(), percent / 100.0).is_some() {
                bail!("target for {ticker} given more than once");
            }
        }

        let ledger = self.client.require_mut(portfolio)?;
        let outcome = ledger.rebalance(&fractions, date, |plan| {
            println!("{plan}");
            yes || confirm_on_stdin()
        })?;

        match outcome {
            RebalanceOutcome::Applied(_) => {
                self.save()?;
                println!("Portfolio rebalanced successfully.");
            }
            RebalanceOutcome::Cancelled => println!("Rebalancing cancelled."),
        }
        Ok(())
    }
}

/// Ask for `yes` on stdin; anything else declines.
fn confirm_on_stdin() -> bool {
    print!("Do you want to proceed with rebalancing? (enter yes to proceed, anything else to cancel) ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("yes"),
        Err(_) => false,
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}"))
}

fn parse_ticker(s: &str) -> Result<String, String> {
    let ticker = s.trim().to_uppercase();
    if ticker.is_empty() {
        return Err("ticker must not be empty".into());
    }
    Ok(ticker)
}

fn parse_target(s: &str) -> Result<(String, f64), String> {
    let (ticker, percent) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TICKER=PERCENT, got '{s}'"))?;
    let percent: f64 = percent
        .trim()
        .parse()
        .map_err(|e| format!("invalid percentage in '{s}': {e}"))?;
    Ok((parse_ticker(ticker)?, percent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn target_parsing() {
        assert_eq!(parse_target("aapl=40").unwrap(), ("AAPL".to_string(), 40.0));
        assert_eq!(parse_target("MSFT = 12.5").unwrap(), ("MSFT".to_string(), 12.5));
        assert!(parse_target("AAPL").is_err());
        assert!(parse_target("AAPL=forty").is_err());
    }

    #[test]
    fn ticker_arguments_are_uppercased() {
        let cli = Cli::try_parse_from([
            "holdlab", "buy", "Tech", "aapl", "1", "--date", "2024-01-02",
        ])
        .unwrap();
        let Commands::Buy { ticker, .. } = cli.command else {
            panic!("expected buy");
        };
        assert_eq!(ticker, "AAPL");

        let cli = Cli::try_parse_from(["holdlab", "fetch", "msft", "googl"]).unwrap();
        let Commands::Fetch { tickers, .. } = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(tickers, vec!["MSFT", "GOOGL"]);
        assert!(parse_target("=50").is_err());
    }

    #[test]
    fn rebalance_arguments_parse() {
        let cli = Cli::try_parse_from([
            "holdlab",
            "rebalance",
            "Tech",
            "--date",
            "2024-01-01",
            "--target",
            "AAPL=50",
            "--target",
            "GOOGL=50",
            "--yes",
        ])
        .unwrap();
        let Commands::Rebalance { targets, yes, date, .. } = cli.command else {
            panic!("expected rebalance");
        };
        assert!(yes);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn offline_flag_is_global() {
        let cli = Cli::try_parse_from(["holdlab", "list", "--offline"]).unwrap();
        assert!(cli.offline);
        assert_eq!(cli.config, PathBuf::from("holdlab.toml"));
    }
}
