//! Per-ticker extraction with bounded retries, validation, and pacing.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::bar_source::{BarColumn, BarRow, BarSource, BarTable, BarsRequest};
use crate::clock::Sleeper;
use crate::domain::{RawBar, Symbol, TradingDate};
use crate::pacing::RequestPacer;
use crate::retry::RetryPolicy;

/// Fatal extraction outcome: nothing downstream can run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction failed for all {attempted} tickers")]
    AllTickersFailed { attempted: usize },
}

/// Why a delivered response was rejected. Rejections are retry-worthy, not
/// fatal: the attempt loop falls through to the next try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    EmptyTable,
    MissingColumns(Vec<BarColumn>),
    AllPricesNull,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTable => f.write_str("response contained no rows"),
            Self::MissingColumns(columns) => {
                let names: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
                write!(f, "required columns missing: {}", names.join(", "))
            }
            Self::AllPricesNull => f.write_str("open and close are null in every row"),
        }
    }
}

/// Validated bars per ticker plus the tickers that never produced any.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// Chronological bar sequences; a key is present only if its response
    /// passed validation.
    pub bars: BTreeMap<Symbol, Vec<RawBar>>,
    pub failed: Vec<Symbol>,
}

impl ExtractionResult {
    pub fn success_count(&self) -> usize {
        self.bars.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total_bars(&self) -> usize {
        self.bars.values().map(Vec::len).sum()
    }
}

/// Sequential extractor: one ticker at a time, blocking sleeps between
/// attempts and between tickers.
pub struct Extractor {
    source: Arc<dyn BarSource>,
    retry: RetryPolicy,
    pacer: RequestPacer,
    sleeper: Arc<dyn Sleeper>,
}

impl Extractor {
    pub fn new(
        source: Arc<dyn BarSource>,
        retry: RetryPolicy,
        pacer: RequestPacer,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            source,
            retry,
            pacer,
            sleeper,
        }
    }

    pub fn extract(
        &self,
        universe: &[Symbol],
        trading_date: TradingDate,
    ) -> Result<ExtractionResult, ExtractError> {
        info!(
            tickers = universe.len(),
            %trading_date,
            source = self.source.id(),
            "starting intraday extraction"
        );

        let mut result = ExtractionResult::default();

        for (index, symbol) in universe.iter().enumerate() {
            info!(
                "[{}/{}] processing {symbol}",
                index + 1,
                universe.len()
            );
            self.pacer.throttle(self.sleeper.as_ref());

            match self.extract_one(symbol, trading_date) {
                Some(bars) => {
                    info!(bars = bars.len(), "downloaded {symbol}");
                    result.bars.insert(symbol.clone(), bars);
                }
                None => {
                    error!(
                        attempts = self.retry.max_attempts,
                        "giving up on {symbol}"
                    );
                    result.failed.push(symbol.clone());
                }
            }
        }

        info!(
            succeeded = result.success_count(),
            failed = result.failure_count(),
            total_bars = result.total_bars(),
            "extraction summary"
        );
        if !result.failed.is_empty() {
            let names: Vec<&str> = result.failed.iter().map(Symbol::as_str).collect();
            warn!("failed tickers: {}", names.join(", "));
        }

        if result.bars.is_empty() {
            return Err(ExtractError::AllTickersFailed {
                attempted: universe.len(),
            });
        }

        Ok(result)
    }

    /// One ticker's attempt loop. Retryable fetch errors back off before
    /// the next attempt; non-retryable ones end the loop at once.
    /// Invalid-but-delivered responses fall through without a sleep (no
    /// transport error was consumed).
    fn extract_one(&self, symbol: &Symbol, trading_date: TradingDate) -> Option<Vec<RawBar>> {
        let request = BarsRequest::for_session(symbol.clone(), trading_date);

        for attempt in 0..self.retry.max_attempts {
            match self.source.minute_bars(&request) {
                Ok(table) => match validate_table(&table) {
                    Ok(()) => return Some(coerce_bars(&table.rows)),
                    Err(reason) => {
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = self.retry.max_attempts,
                            "invalid data for {symbol}: {reason}"
                        );
                    }
                },
                Err(source_error) => {
                    error!(
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        "download failed for {symbol}: {source_error}"
                    );
                    if !source_error.retryable() {
                        break;
                    }
                    if self.retry.has_next_attempt(attempt) {
                        self.sleeper.sleep(self.retry.delay_for_attempt(attempt));
                    }
                }
            }
        }

        None
    }
}

/// Reject empty tables, schema gaps, and responses whose open and close are
/// both null in every row.
pub fn validate_table(table: &BarTable) -> Result<(), RejectReason> {
    if table.is_empty() {
        return Err(RejectReason::EmptyTable);
    }

    let missing = table.missing_columns();
    if !missing.is_empty() {
        return Err(RejectReason::MissingColumns(missing));
    }

    let open_all_null = table.rows.iter().all(|row| row.open.is_none());
    let close_all_null = table.rows.iter().all(|row| row.close.is_none());
    if open_all_null && close_all_null {
        return Err(RejectReason::AllPricesNull);
    }

    Ok(())
}

/// Null cells become `0.0` / `0`; row order is preserved.
fn coerce_bars(rows: &[BarRow]) -> Vec<RawBar> {
    rows.iter()
        .map(|row| RawBar {
            ts: row.ts,
            open: row.open.unwrap_or(0.0),
            high: row.high.unwrap_or(0.0),
            low: row.low.unwrap_or(0.0),
            close: row.close.unwrap_or(0.0),
            volume: row.volume.unwrap_or(0),
        })
        .collect()
}
