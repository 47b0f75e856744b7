//! Behavior-driven tests for the warehouse sink: loads, verification
//! queries, and the append-only rerun guarantee.

use minbar_warehouse::{MinuteBarRow, Warehouse, WarehouseConfig, WarehouseError};
use tempfile::tempdir;

fn bar(date: &str, minute: u8, ticker: &str, close: f64) -> MinuteBarRow {
    MinuteBarRow {
        event_timestamp: format!("{date} 13:{minute:02}:00"),
        trading_date: date.to_owned(),
        ticker: ticker.to_owned(),
        open: close - 0.25,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 10_000,
        minute_return: 0.1,
        trade_hour: 13,
        trade_minute: minute,
    }
}

#[test]
fn when_a_session_is_loaded_its_rows_become_countable() {
    // Given: A fresh warehouse
    let temp = tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig {
        minbar_home: temp.path().to_path_buf(),
        db_path: temp.path().join("warehouse.duckdb"),
        max_pool_size: 2,
    })
    .expect("warehouse open");

    // When: One session's rows are loaded
    let rows = vec![
        bar("2025-06-02", 30, "AAPL", 178.50),
        bar("2025-06-02", 31, "AAPL", 178.90),
        bar("2025-06-02", 30, "MSFT", 415.20),
    ];
    warehouse
        .insert_minute_bars("run-abc", "yahoo-chart", "2025-06-02", &rows, 1_000)
        .expect("load should succeed");

    // Then: The verification count sees exactly those rows
    assert_eq!(warehouse.count_for_date("2025-06-02").expect("count"), 3);
    assert_eq!(warehouse.count_for_date("2025-06-03").expect("count"), 0);
    assert_eq!(
        warehouse.tickers_for_date("2025-06-02").expect("tickers"),
        vec!["AAPL".to_owned(), "MSFT".to_owned()]
    );
}

#[test]
fn when_two_sessions_are_loaded_counts_stay_per_session() {
    let temp = tempdir().expect("tempdir");
    let warehouse =
        Warehouse::open(WarehouseConfig::under_home(temp.path())).expect("warehouse open");

    warehouse
        .insert_minute_bars(
            "run-1",
            "yahoo-chart",
            "2025-06-02",
            &[bar("2025-06-02", 30, "AAPL", 178.50)],
            1_000,
        )
        .expect("first session");
    warehouse
        .insert_minute_bars(
            "run-2",
            "yahoo-chart",
            "2025-06-03",
            &[
                bar("2025-06-03", 30, "AAPL", 180.00),
                bar("2025-06-03", 31, "AAPL", 180.25),
            ],
            1_000,
        )
        .expect("second session");

    assert_eq!(warehouse.count_for_date("2025-06-02").expect("count"), 1);
    assert_eq!(warehouse.count_for_date("2025-06-03").expect("count"), 2);
}

#[test]
fn when_a_session_is_reloaded_the_original_rows_survive() {
    let temp = tempdir().expect("tempdir");
    let warehouse =
        Warehouse::open(WarehouseConfig::under_home(temp.path())).expect("warehouse open");
    let rows = vec![bar("2025-06-02", 30, "AAPL", 178.50)];

    warehouse
        .insert_minute_bars("run-1", "yahoo-chart", "2025-06-02", &rows, 1_000)
        .expect("first load");

    // A rerun with different prices still collides on (timestamp, ticker).
    let conflicting = vec![bar("2025-06-02", 30, "AAPL", 999.99)];
    let rerun =
        warehouse.insert_minute_bars("run-2", "yahoo-chart", "2025-06-02", &conflicting, 1_000);

    assert!(matches!(rerun, Err(WarehouseError::DuckDb(_))));
    assert_eq!(warehouse.count_for_date("2025-06-02").expect("count"), 1);
}

#[test]
fn reopening_the_warehouse_preserves_loaded_data() {
    let temp = tempdir().expect("tempdir");
    let config = WarehouseConfig::under_home(temp.path());

    {
        let warehouse = Warehouse::open(config.clone()).expect("warehouse open");
        warehouse
            .insert_minute_bars(
                "run-1",
                "yahoo-chart",
                "2025-06-02",
                &[bar("2025-06-02", 30, "AAPL", 178.50)],
                1_000,
            )
            .expect("load");
    }

    let reopened = Warehouse::open(config).expect("reopen");
    assert_eq!(reopened.count_for_date("2025-06-02").expect("count"), 1);
}
