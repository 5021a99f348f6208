//! End-to-end ledger scenarios: nearest-date lookups, valuation, charts and rebalancing.

use chrono::{Duration, NaiveDate};
use holdlab_core::analytics::{ChartOutcome, Granularity};
use holdlab_core::domain::{Client, Portfolio, PortfolioError, PriceSeries};
use holdlab_core::rebalance::RebalanceOutcome;
use std::collections::BTreeMap;
use std::sync::Arc;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn series(ticker: &str, points: &[(NaiveDate, f64)]) -> Arc<PriceSeries> {
    let history: BTreeMap<_, _> = points.iter().copied().collect();
    Arc::new(PriceSeries::new(ticker, history, |_| true).unwrap())
}

/// Closes every day of 2024 with a slow upward drift.
fn daily_2024(ticker: &str, base: f64) -> Arc<PriceSeries> {
    let start = d(2024, 1, 1);
    let points: Vec<_> = (0..366)
        .map(|i| (start + Duration::days(i), base + i as f64 * 0.5))
        .collect();
    series(ticker, &points)
}

fn tech_ledger(client: &mut Client) -> &mut Portfolio {
    let aapl = series("AAPL", &[(d(2024, 1, 1), 150.0)]);
    let googl = series("GOOGL", &[(d(2024, 1, 1), 2500.0)]);
    let p = client.create_portfolio("Tech").unwrap();
    p.add_stock(&aapl, 10.0, d(2024, 1, 1)).unwrap();
    p.add_stock(&googl, 2.0, d(2024, 1, 1)).unwrap();
    p
}

#[test]
fn two_instrument_ledger_is_worth_6500() {
    let mut client = Client::new("alice");
    let p = tech_ledger(&mut client);
    assert_eq!(p.portfolio_value(d(2024, 1, 1)).unwrap(), 6500.0);
    assert_eq!(
        p.distribution_of_value(d(2024, 1, 1)).unwrap(),
        "Distribution of value on 2024-01-01:\n\
         AAPL: $1500.00\n\
         GOOGL: $5000.00\n\
         Total Portfolio Value: $6500.00"
    );
    assert_eq!(p.print_stocks(d(2024, 1, 1)), "'Tech'\n{AAPL, 10; GOOGL, 2; }");
}

#[test]
fn nearest_date_search_order() {
    let only_plus_two = series("X", &[(d(2024, 1, 3), 10.0)]);
    assert_eq!(only_plus_two.resolve_date(d(2024, 1, 1)), Some(d(2024, 1, 3)));

    let only_plus_three = series("X", &[(d(2024, 1, 4), 10.0)]);
    assert_eq!(only_plus_three.resolve_date(d(2024, 1, 1)), None);
    assert!(matches!(
        only_plus_three.closing_price(d(2024, 1, 1)),
        Err(PortfolioError::NoPriceData { .. })
    ));

    // +1 wins over -1 when both exist
    let both = series("X", &[(d(2024, 1, 1), 1.0), (d(2024, 1, 3), 3.0)]);
    assert_eq!(both.closing_price(d(2024, 1, 2)).unwrap(), 3.0);
}

#[test]
fn moving_average_example() {
    let s = series("AAPL", &[(d(2024, 1, 1), 150.0), (d(2024, 2, 1), 160.0)]);
    assert_eq!(s.moving_average(d(2024, 2, 1), 31).unwrap(), 155.0);
}

#[test]
fn selling_a_never_held_instrument_fails() {
    let mut client = Client::new("alice");
    let p = tech_ledger(&mut client);
    let msft = series("MSFT", &[(d(2024, 1, 1), 370.0)]);
    assert_eq!(
        p.remove_stock(&msft, 1.0, d(2024, 1, 1)),
        Err(PortfolioError::UnknownInstrument {
            ticker: "MSFT".into()
        })
    );
}

#[test]
fn past_values_ignore_later_events() {
    let aapl = daily_2024("AAPL", 100.0);
    let mut client = Client::new("alice");
    let p = client.create_portfolio("Growth").unwrap();
    p.add_stock(&aapl, 10.0, d(2024, 1, 1)).unwrap();
    p.add_stock(&aapl, 10.0, d(2024, 6, 1)).unwrap();
    p.remove_stock(&aapl, 5.0, d(2024, 9, 1)).unwrap();

    assert_eq!(p.stocks(d(2024, 3, 1)).get("AAPL"), Some(&10.0));
    assert_eq!(p.stocks(d(2024, 7, 1)).get("AAPL"), Some(&20.0));
    assert_eq!(p.stocks(d(2024, 12, 1)).get("AAPL"), Some(&15.0));
    assert!(p.stocks(d(2023, 12, 31)).is_empty());
    assert_eq!(
        p.distribution_of_value(d(2023, 12, 1)).unwrap(),
        "The portfolio has no value on 2023-12-01"
    );
}

#[test]
fn performance_span_rules() {
    let aapl = daily_2024("AAPL", 100.0);
    let mut client = Client::new("alice");
    let p = client.create_portfolio("Growth").unwrap();
    p.add_stock(&aapl, 1.0, d(2024, 1, 1)).unwrap();

    let start = d(2024, 3, 1);
    assert_eq!(
        p.performance_over_time(start, start + Duration::days(2)),
        Err(PortfolioError::InsufficientSpan { days: 2 })
    );

    let ChartOutcome::Chart(daily) = p.performance_over_time(start, d(2024, 3, 20)).unwrap() else {
        panic!("expected a daily chart");
    };
    assert_eq!(daily.granularity, Granularity::Daily);
    assert_eq!(daily.points.len(), 20);

    let ChartOutcome::Chart(monthly) = p.performance_over_time(d(2024, 1, 1), d(2024, 12, 1)).unwrap()
    else {
        panic!("expected a monthly chart");
    };
    assert_eq!(monthly.granularity, Granularity::Monthly);
    assert_eq!(monthly.points.len(), 12);
    let rendered = monthly.to_string();
    assert!(rendered.contains("\nJan 2024: "));
    assert!(rendered.contains("\nDec 2024: "));
    // the last point is the largest and gets the longest bar
    let bars: Vec<usize> = rendered
        .lines()
        .skip(1)
        .take(12)
        .map(|line| line.matches('*').count())
        .collect();
    assert_eq!(bars[11], *bars.iter().max().unwrap());
    assert!(bars[11] >= 49);
}

#[test]
fn rebalance_then_revalue() {
    let mut client = Client::new("alice");
    let p = tech_ledger(&mut client);
    let targets: BTreeMap<String, f64> =
        [("AAPL".to_string(), 0.25), ("GOOGL".to_string(), 0.75)].into();

    let outcome = p.rebalance(&targets, d(2024, 1, 1), |plan| {
        plan.total_value == 6500.0
    });
    let Ok(RebalanceOutcome::Applied(plan)) = outcome else {
        panic!("expected the rebalance to apply");
    };
    assert_eq!(plan.trades.len(), 2);

    // 1625 AAPL, 4875 GOOGL
    assert_eq!(p.stock_value("AAPL", d(2024, 1, 1)).unwrap(), 1625.0);
    assert_eq!(p.stock_value("GOOGL", d(2024, 1, 1)).unwrap(), 4875.0);
}

#[test]
fn rebalance_percentages_must_sum_to_one() {
    let mut client = Client::new("alice");
    let p = tech_ledger(&mut client);
    let targets: BTreeMap<String, f64> =
        [("AAPL".to_string(), 0.3), ("GOOGL".to_string(), 0.6)].into();

    assert!(matches!(
        p.rebalance(&targets, d(2024, 1, 1), |_| true),
        Err(PortfolioError::PercentageMismatch { .. })
    ));
    assert_eq!(p.portfolio_value(d(2024, 1, 1)).unwrap(), 6500.0);
}
