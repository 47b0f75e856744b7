//! Immutable pipeline configuration.
//!
//! Universe and holiday calendar are constructor inputs, not globals, so
//! tests can run with synthetic universes.

use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use time::Date;

use crate::calendar::TradingCalendar;
use crate::domain::Symbol;
use crate::retry::RetryPolicy;
use crate::ValidationError;

/// Top-50 S&P 500 sample, as symbol strings. The raw list carries a couple
/// of repeats; `sp500_sample` deduplicates while keeping first-seen order.
const SP500_SAMPLE: [&str; 50] = [
    "NVDA", "MSFT", "AAPL", "AMZN", "META", "AVGO", "GOOGL", "GOOG", "BRK.B", "TSLA",
    "JPM", "V", "LLY", "NFLX", "MA", "COST", "XOM", "WMT", "PG", "JNJ",
    "UNH", "HD", "BAC", "DIS", "KO", "PFE", "MRK", "CSCO", "ADBE", "CRM",
    "ORCL", "ABT", "TXN", "CMCSA", "NEE", "NFLX", "T", "INTC", "NKE", "WBA",
    "MCD", "AMD", "PYPL", "BA", "PEP", "LLY", "ZM", "QCOM", "LMT", "CVX",
];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Ordered ticker universe; extraction visits it front to back.
    pub universe: Vec<Symbol>,
    pub calendar: TradingCalendar,
    pub retry: RetryPolicy,
    /// Minimum spacing between provider requests.
    pub pacing: Duration,
    /// Warehouse insert chunk size.
    pub batch_size: usize,
    /// Resolve the session relative to this date instead of today.
    pub reference_date: Option<Date>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            universe: sp500_sample(),
            calendar: TradingCalendar::us_2025(),
            retry: RetryPolicy::default(),
            pacing: Duration::from_secs(1),
            batch_size: 1_000,
            reference_date: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_universe(mut self, universe: Vec<Symbol>) -> Self {
        self.universe = universe;
        self
    }

    pub fn with_reference_date(mut self, reference_date: Date) -> Self {
        self.reference_date = Some(reference_date);
        self
    }
}

/// Default universe, deduplicated in first-seen order.
pub fn sp500_sample() -> Vec<Symbol> {
    let mut seen = BTreeSet::new();
    SP500_SAMPLE
        .iter()
        .map(|raw| Symbol::parse(raw).expect("sample universe symbols are valid"))
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

/// Parse a comma-separated ticker list, e.g. from a CLI override.
pub fn parse_universe(input: &str) -> Result<Vec<Symbol>, ValidationError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Symbol::parse)
        .collect()
}

/// `MINBAR_HOME` override, then `~/.minbar`.
pub fn resolve_minbar_home() -> PathBuf {
    if let Some(path) = env::var_os("MINBAR_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".minbar");
    }

    PathBuf::from(".minbar")
}
