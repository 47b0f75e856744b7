//! Core pipeline for the daily S&P 500 minute-bar load.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The trading-calendar resolver
//! - The bar-source trait and the Yahoo chart adapter
//! - Extract, transform, and load stages plus the orchestrator

pub mod adapters;
pub mod archive;
pub mod bar_source;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod pacing;
pub mod pipeline;
pub mod retry;
pub mod transform;

pub use adapters::YahooChartAdapter;
pub use archive::{
    to_csv, write_archive, ArchiveStore, FsArchiveStore, MemoryArchiveStore, ARCHIVE_NAMESPACE,
    CSV_HEADER,
};
pub use bar_source::{
    BarColumn, BarRow, BarSource, BarTable, BarsRequest, SourceError, SourceErrorKind,
};
pub use calendar::TradingCalendar;
pub use clock::{RecordingSleeper, Sleeper, ThreadSleeper};
pub use config::{parse_universe, resolve_minbar_home, sp500_sample, PipelineConfig};
pub use domain::{NormalizedRecord, RawBar, Symbol, TradingDate, UtcMinute};
pub use error::ValidationError;
pub use extract::{ExtractError, ExtractionResult, Extractor, RejectReason};
pub use minbar_warehouse::{
    LoadReport, MinuteBarRow, Warehouse, WarehouseConfig, WarehouseError,
};
pub use pacing::RequestPacer;
pub use pipeline::{Pipeline, PipelineError, RunOutcome, RunReport};
pub use retry::{Backoff, RetryPolicy};
pub use transform::{transform, TransformedDataset};
