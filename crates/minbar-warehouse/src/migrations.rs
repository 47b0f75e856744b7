use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_minute_bars",
        sql: r#"
CREATE TABLE IF NOT EXISTS sp500_minute_bars (
    event_timestamp TIMESTAMP NOT NULL,
    trading_date DATE NOT NULL,
    ticker VARCHAR(10) NOT NULL,
    open DOUBLE NOT NULL,
    high DOUBLE NOT NULL,
    low DOUBLE NOT NULL,
    close DOUBLE NOT NULL,
    volume BIGINT NOT NULL,
    minute_return DOUBLE NOT NULL,
    trade_hour INTEGER NOT NULL,
    trade_minute INTEGER NOT NULL,
    loaded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY(event_timestamp, ticker)
);

CREATE TABLE IF NOT EXISTS load_log (
    run_id TEXT NOT NULL,
    trading_date DATE NOT NULL,
    source TEXT NOT NULL,
    row_count BIGINT NOT NULL,
    loaded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_minute_bars_trading_date ON sp500_minute_bars(trading_date);
CREATE INDEX IF NOT EXISTS idx_minute_bars_ticker_ts ON sp500_minute_bars(ticker, event_timestamp);
CREATE INDEX IF NOT EXISTS idx_load_log_trading_date ON load_log(trading_date, loaded_at);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let query = format!(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = '{}'",
            crate::escape_sql_string(migration.version)
        );
        let applied_count: i64 = connection.query_row(query.as_str(), [], |row| row.get(0))?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            let insert = format!(
                "INSERT INTO schema_migrations (version) VALUES ('{}')",
                crate::escape_sql_string(migration.version)
            );
            connection.execute_batch(insert.as_str())?;
        }
    }

    Ok(())
}
