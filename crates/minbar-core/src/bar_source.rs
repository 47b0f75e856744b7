//! Market-data source contract and the tabular payload it returns.
//!
//! Providers hand back a column-labelled table with nullable cells rather
//! than finished bars, so the extractor can tell a column missing from the
//! schema apart from a null value in a row. Both happen in the wild and
//! they are validated differently.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::domain::{Symbol, TradingDate, UtcMinute};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Decode,
    Internal,
}

/// Structured provider error with a retryability hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Decode,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Decode => "source.decode",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request for one ticker's minute bars over a half-open day range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsRequest {
    pub symbol: Symbol,
    /// Inclusive start of the session day.
    pub start: TradingDate,
    /// Exclusive end: the next calendar day.
    pub end: TradingDate,
    /// Pre/post-market buckets are excluded when set.
    pub regular_hours_only: bool,
}

impl BarsRequest {
    pub fn for_session(symbol: Symbol, trading_date: TradingDate) -> Self {
        Self {
            symbol,
            start: trading_date,
            end: trading_date.succ(),
            regular_hours_only: true,
        }
    }
}

/// Columns a minute-bar response must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarColumn {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl BarColumn {
    pub const REQUIRED: [Self; 5] = [
        Self::Open,
        Self::High,
        Self::Low,
        Self::Close,
        Self::Volume,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Volume => "volume",
        }
    }
}

impl Display for BarColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider row; every cell may be null on source gaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarRow {
    pub ts: UtcMinute,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl BarRow {
    pub fn cell(&self, column: BarColumn) -> Option<f64> {
        match column {
            BarColumn::Open => self.open,
            BarColumn::High => self.high,
            BarColumn::Low => self.low,
            BarColumn::Close => self.close,
            BarColumn::Volume => self.volume.map(|v| v as f64),
        }
    }
}

/// Raw tabular provider response, pre-validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BarTable {
    /// Columns actually present in the response schema.
    pub columns: Vec<BarColumn>,
    pub rows: Vec<BarRow>,
}

impl BarTable {
    pub fn has_column(&self, column: BarColumn) -> bool {
        self.columns.contains(&column)
    }

    pub fn missing_columns(&self) -> Vec<BarColumn> {
        BarColumn::REQUIRED
            .into_iter()
            .filter(|column| !self.has_column(*column))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Provider adapter contract. Implementations are synchronous; the pipeline
/// is a single sequential batch and callers own the pacing.
pub trait BarSource: Send + Sync {
    /// Short provider name for logs and the warehouse load log.
    fn id(&self) -> &'static str;

    fn minute_bars(&self, request: &BarsRequest) -> Result<BarTable, SourceError>;
}
