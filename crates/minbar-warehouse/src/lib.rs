//! DuckDB-backed warehouse for the daily minute-bar load.
//!
//! The load path is append-only: rows go in with plain INSERTs so a rerun
//! against an already-loaded session trips the primary key instead of
//! silently rewriting history.

pub mod migrations;
pub mod pool;

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

pub use pool::{AccessMode, DuckDbPool, PooledConnection};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub minbar_home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl WarehouseConfig {
    pub fn under_home(minbar_home: impl Into<PathBuf>) -> Self {
        let minbar_home = minbar_home.into();
        let db_path = minbar_home.join("warehouse.duckdb");
        Self {
            minbar_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// One warehouse row, with timestamps already rendered as SQL literals
/// (`YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`).
#[derive(Debug, Clone)]
pub struct MinuteBarRow {
    pub event_timestamp: String,
    pub trading_date: String,
    pub ticker: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub minute_return: f64,
    pub trade_hour: u8,
    pub trade_minute: u8,
}

/// What a completed load looked like, for the run report.
#[derive(Debug, Clone, Copy)]
pub struct LoadReport {
    pub inserted: usize,
    pub batches: usize,
}

#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    pool: DuckDbPool,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        let home = std::env::var_os("MINBAR_HOME")
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".minbar")))
            .unwrap_or_else(|| PathBuf::from(".minbar"));
        Self::open(WarehouseConfig::under_home(home))
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = DuckDbPool::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { config, pool };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.pool.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Insert rows in chunks of `batch_size`, one transaction per chunk, and
    /// record the load in `load_log`.
    ///
    /// # Errors
    /// Fails on the first chunk that violates a constraint; earlier chunks
    /// stay committed.
    pub fn insert_minute_bars(
        &self,
        run_id: &str,
        source: &str,
        trading_date: &str,
        rows: &[MinuteBarRow],
        batch_size: usize,
    ) -> Result<LoadReport, WarehouseError> {
        if batch_size == 0 {
            return Err(WarehouseError::ZeroBatchSize);
        }

        let connection = self.pool.acquire(AccessMode::ReadWrite)?;
        let mut inserted = 0;
        let mut batches = 0;

        for chunk in rows.chunks(batch_size) {
            let statement = build_insert_statement(chunk);
            connection.execute_batch("BEGIN TRANSACTION;")?;
            if let Err(error) = connection.execute_batch(statement.as_str()) {
                let _ = connection.execute_batch("ROLLBACK;");
                return Err(error.into());
            }
            connection.execute_batch("COMMIT;")?;

            inserted += chunk.len();
            batches += 1;
            info!(batch = batches, rows = chunk.len(), "committed warehouse batch");
        }

        let log_entry = format!(
            "INSERT INTO load_log (run_id, trading_date, source, row_count) \
             VALUES ('{}', DATE '{}', '{}', {})",
            escape_sql_string(run_id),
            escape_sql_string(trading_date),
            escape_sql_string(source),
            inserted,
        );
        connection.execute_batch(log_entry.as_str())?;

        info!(run_id, rows = inserted, batches, "warehouse load complete");
        Ok(LoadReport { inserted, batches })
    }

    /// Row count for one session, used to verify a load landed.
    pub fn count_for_date(&self, trading_date: &str) -> Result<i64, WarehouseError> {
        let connection = self.pool.acquire(AccessMode::ReadOnly)?;
        let query = format!(
            "SELECT COUNT(*) FROM sp500_minute_bars WHERE trading_date = DATE '{}'",
            escape_sql_string(trading_date)
        );
        let count: i64 = connection.query_row(query.as_str(), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Distinct tickers loaded for one session.
    pub fn tickers_for_date(&self, trading_date: &str) -> Result<Vec<String>, WarehouseError> {
        let connection = self.pool.acquire(AccessMode::ReadOnly)?;
        let query = format!(
            "SELECT DISTINCT ticker FROM sp500_minute_bars WHERE trading_date = DATE '{}' ORDER BY ticker",
            escape_sql_string(trading_date)
        );
        let mut statement = connection.prepare(query.as_str())?;
        let tickers = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tickers)
    }
}

fn build_insert_statement(rows: &[MinuteBarRow]) -> String {
    let mut sql = String::with_capacity(128 * rows.len());
    sql.push_str(
        "INSERT INTO sp500_minute_bars \
         (event_timestamp, trading_date, ticker, open, high, low, close, volume, \
          minute_return, trade_hour, trade_minute) VALUES ",
    );

    for (index, row) in rows.iter().enumerate() {
        if index > 0 {
            sql.push_str(", ");
        }
        let _ = write!(
            sql,
            "(TIMESTAMP '{}', DATE '{}', '{}', {}, {}, {}, {}, {}, {}, {}, {})",
            escape_sql_string(&row.event_timestamp),
            escape_sql_string(&row.trading_date),
            escape_sql_string(&row.ticker),
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
            row.minute_return,
            row.trade_hour,
            row.trade_minute,
        );
    }

    sql.push(';');
    sql
}

pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp_warehouse() -> (tempfile::TempDir, Warehouse) {
        let dir = tempfile::tempdir().expect("temp dir");
        let warehouse =
            Warehouse::open(WarehouseConfig::under_home(dir.path())).expect("open warehouse");
        (dir, warehouse)
    }

    fn row(minute: u8, ticker: &str) -> MinuteBarRow {
        MinuteBarRow {
            event_timestamp: format!("2025-06-02 13:{minute:02}:00"),
            trading_date: "2025-06-02".to_owned(),
            ticker: ticker.to_owned(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: 1_000,
            minute_return: 0.25,
            trade_hour: 13,
            trade_minute: minute,
        }
    }

    #[test]
    fn load_inserts_rows_and_logs_the_run() {
        let (_dir, warehouse) = open_temp_warehouse();
        let rows: Vec<MinuteBarRow> = (30..35).map(|m| row(m, "AAPL")).collect();

        let report = warehouse
            .insert_minute_bars("run-1", "yahoo-chart", "2025-06-02", &rows, 1_000)
            .expect("load");

        assert_eq!(report.inserted, 5);
        assert_eq!(report.batches, 1);
        assert_eq!(warehouse.count_for_date("2025-06-02").expect("count"), 5);

        let connection = warehouse
            .pool
            .acquire(AccessMode::ReadOnly)
            .expect("connection");
        let logged: i64 = connection
            .query_row(
                "SELECT row_count FROM load_log WHERE run_id = 'run-1'",
                [],
                |row| row.get(0),
            )
            .expect("load_log row");
        assert_eq!(logged, 5);
    }

    #[test]
    fn rows_are_committed_in_batch_sized_chunks() {
        let (_dir, warehouse) = open_temp_warehouse();
        let rows: Vec<MinuteBarRow> = (0..7).map(|m| row(m, "MSFT")).collect();

        let report = warehouse
            .insert_minute_bars("run-2", "yahoo-chart", "2025-06-02", &rows, 3)
            .expect("load");

        assert_eq!(report.inserted, 7);
        assert_eq!(report.batches, 3);
        assert_eq!(warehouse.count_for_date("2025-06-02").expect("count"), 7);
    }

    #[test]
    fn duplicate_load_violates_the_primary_key() {
        let (_dir, warehouse) = open_temp_warehouse();
        let rows = vec![row(30, "AAPL")];

        warehouse
            .insert_minute_bars("run-3", "yahoo-chart", "2025-06-02", &rows, 1_000)
            .expect("first load");
        let rerun = warehouse.insert_minute_bars("run-4", "yahoo-chart", "2025-06-02", &rows, 1_000);

        assert!(matches!(rerun, Err(WarehouseError::DuckDb(_))));
        assert_eq!(warehouse.count_for_date("2025-06-02").expect("count"), 1);
    }

    #[test]
    fn same_timestamp_different_ticker_is_allowed() {
        let (_dir, warehouse) = open_temp_warehouse();
        let rows = vec![row(30, "AAPL"), row(30, "MSFT")];

        warehouse
            .insert_minute_bars("run-5", "yahoo-chart", "2025-06-02", &rows, 1_000)
            .expect("load");

        assert_eq!(
            warehouse.tickers_for_date("2025-06-02").expect("tickers"),
            vec!["AAPL".to_owned(), "MSFT".to_owned()]
        );
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let (_dir, warehouse) = open_temp_warehouse();
        let result =
            warehouse.insert_minute_bars("run-6", "yahoo-chart", "2025-06-02", &[row(30, "AAPL")], 0);
        assert!(matches!(result, Err(WarehouseError::ZeroBatchSize)));
    }

    #[test]
    fn migrations_are_recorded_once() {
        let (_dir, warehouse) = open_temp_warehouse();
        // Re-running initialization must not reapply migrations.
        warehouse.initialize().expect("re-initialize");

        let connection = warehouse
            .pool
            .acquire(AccessMode::ReadOnly)
            .expect("connection");
        let versions: i64 = connection
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("migration count");
        assert_eq!(versions, 2);
    }
}
