//! End-to-end daily run: resolve the session, extract, transform, and load
//! both sinks.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use minbar_warehouse::{MinuteBarRow, Warehouse, WarehouseError};

use crate::archive::{write_archive, ArchiveStore};
use crate::bar_source::BarSource;
use crate::clock::Sleeper;
use crate::config::PipelineConfig;
use crate::domain::{NormalizedRecord, Symbol, TradingDate, UtcMinute};
use crate::extract::{ExtractError, Extractor};
use crate::pacing::RequestPacer;
use crate::transform::{transform, TransformedDataset};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("archive write failed: {0}")]
    Archive(#[from] io::Error),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("warehouse verification found {found} rows for {trading_date}, expected {expected}")]
    VerificationMismatch {
        trading_date: TradingDate,
        expected: usize,
        found: i64,
    },
}

/// How a run ended when it did not error.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Loaded(RunReport),
    /// Extraction succeeded for some tickers but transformation produced no
    /// records, so neither sink was touched.
    NothingToLoad { trading_date: TradingDate },
}

/// Summary of a completed load, one per pipeline invocation.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trading_date: TradingDate,
    pub record_count: usize,
    pub ticker_count: usize,
    pub batches: usize,
    /// Earliest and latest bar timestamps that were loaded.
    pub first_timestamp: Option<UtcMinute>,
    pub last_timestamp: Option<UtcMinute>,
    pub total_volume: u64,
    pub average_close: f64,
    pub failed_tickers: Vec<String>,
}

pub struct Pipeline {
    config: PipelineConfig,
    source: Arc<dyn BarSource>,
    archive: Arc<dyn ArchiveStore>,
    warehouse: Warehouse,
    sleeper: Arc<dyn Sleeper>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn BarSource>,
        archive: Arc<dyn ArchiveStore>,
        warehouse: Warehouse,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            source,
            archive,
            warehouse,
            sleeper,
        }
    }

    /// Which session this run targets: the latest completed session before
    /// the configured reference date, or before today.
    pub fn target_session(&self) -> TradingDate {
        let reference = self
            .config
            .reference_date
            .unwrap_or_else(|| OffsetDateTime::now_utc().date());
        self.config.calendar.latest_session(reference)
    }

    pub fn run(&self) -> Result<RunOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        let trading_date = self.target_session();
        info!(%run_id, %trading_date, "starting daily pipeline run");

        let extractor = Extractor::new(
            Arc::clone(&self.source),
            self.config.retry,
            RequestPacer::new(self.config.pacing),
            Arc::clone(&self.sleeper),
        );
        let extraction = extractor.extract(&self.config.universe, trading_date)?;
        let dataset = transform(&extraction, trading_date);

        if dataset.is_empty() {
            warn!(%trading_date, "no records to load, skipping both sinks");
            return Ok(RunOutcome::NothingToLoad { trading_date });
        }

        write_archive(self.archive.as_ref(), &dataset, trading_date)?;

        let rows: Vec<MinuteBarRow> = dataset.unioned().map(to_warehouse_row).collect();
        let load = self.warehouse.insert_minute_bars(
            &run_id.to_string(),
            self.source.id(),
            &trading_date.to_string(),
            &rows,
            self.config.batch_size,
        )?;

        let found = self.warehouse.count_for_date(&trading_date.to_string())?;
        if found < load.inserted as i64 {
            return Err(PipelineError::VerificationMismatch {
                trading_date,
                expected: load.inserted,
                found,
            });
        }
        info!(rows = found, %trading_date, "warehouse verification passed");

        let report = build_report(run_id, trading_date, &dataset, load.batches, &extraction.failed);
        info!(
            run_id = %report.run_id,
            records = report.record_count,
            tickers = report.ticker_count,
            total_volume = report.total_volume,
            average_close = report.average_close,
            "pipeline run complete"
        );
        Ok(RunOutcome::Loaded(report))
    }
}

fn to_warehouse_row(record: &NormalizedRecord) -> MinuteBarRow {
    MinuteBarRow {
        event_timestamp: record.event_timestamp.format_sql(),
        trading_date: record.trading_date.to_string(),
        ticker: record.ticker.as_str().to_owned(),
        open: record.open,
        high: record.high,
        low: record.low,
        close: record.close,
        volume: record.volume,
        minute_return: record.minute_return,
        trade_hour: record.trade_hour,
        trade_minute: record.trade_minute,
    }
}

fn build_report(
    run_id: Uuid,
    trading_date: TradingDate,
    dataset: &TransformedDataset,
    batches: usize,
    failed: &[Symbol],
) -> RunReport {
    let record_count = dataset.total_records();
    let total_volume: u64 = dataset.unioned().map(|r| r.volume).sum();
    let close_sum: f64 = dataset.unioned().map(|r| r.close).sum();
    let average_close = if record_count > 0 {
        close_sum / record_count as f64
    } else {
        0.0
    };

    RunReport {
        run_id,
        trading_date,
        record_count,
        ticker_count: dataset.ticker_count(),
        batches,
        first_timestamp: dataset.unioned().map(|r| r.event_timestamp).min(),
        last_timestamp: dataset.unioned().map(|r| r.event_timestamp).max(),
        total_volume,
        average_close,
        failed_tickers: failed.iter().map(|s| s.as_str().to_owned()).collect(),
    }
}
