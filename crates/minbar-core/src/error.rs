use thiserror::Error;

/// Validation errors exposed by `minbar-core` domain types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker symbol cannot be empty")]
    EmptySymbol,
    #[error("ticker symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("ticker symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("ticker symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("timestamp {seconds} is outside the representable range")]
    TimestampOutOfRange { seconds: i64 },

    #[error("date must be ISO-8601 YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
}
