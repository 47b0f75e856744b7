//! Normalization of raw bar sequences into the output schema.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::domain::{NormalizedRecord, RawBar, Symbol, TradingDate};
use crate::extract::ExtractionResult;

/// Per-ticker normalized record sequences. Keys are a subset of the
/// extraction keys; tickers that produced no records are dropped.
#[derive(Debug, Clone, Default)]
pub struct TransformedDataset {
    pub records: BTreeMap<Symbol, Vec<NormalizedRecord>>,
}

impl TransformedDataset {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ticker_count(&self) -> usize {
        self.records.len()
    }

    pub fn total_records(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// All tickers' records concatenated in map order. This is the order
    /// both sinks receive; it is not globally time-sorted.
    pub fn unioned(&self) -> impl Iterator<Item = &NormalizedRecord> {
        self.records.values().flatten()
    }
}

/// Sort each ticker's bars, derive minute returns and time-of-day columns,
/// and drop empty tickers.
pub fn transform(extraction: &ExtractionResult, trading_date: TradingDate) -> TransformedDataset {
    info!(tickers = extraction.bars.len(), "transforming extracted data");

    let mut dataset = TransformedDataset::default();

    for (symbol, bars) in &extraction.bars {
        let records = normalize_ticker(symbol, bars, trading_date);
        if records.is_empty() {
            warn!("no records for {symbol}, skipping");
            continue;
        }
        info!(records = records.len(), "transformed {symbol}");
        dataset.records.insert(symbol.clone(), records);
    }

    info!(
        tickers = dataset.ticker_count(),
        records = dataset.total_records(),
        "transformation summary"
    );
    dataset
}

fn normalize_ticker(
    symbol: &Symbol,
    bars: &[RawBar],
    trading_date: TradingDate,
) -> Vec<NormalizedRecord> {
    // Provider ordering is not guaranteed; sort defensively.
    let mut sorted: Vec<RawBar> = bars.to_vec();
    sorted.sort_by_key(|bar| bar.ts);

    let mut records = Vec::with_capacity(sorted.len());
    let mut previous_close: Option<f64> = None;

    for bar in sorted {
        records.push(NormalizedRecord {
            event_timestamp: bar.ts,
            trading_date,
            ticker: symbol.clone(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            minute_return: minute_return(previous_close, bar.close),
            trade_hour: bar.ts.hour(),
            trade_minute: bar.ts.minute(),
        });
        previous_close = Some(bar.close);
    }

    records
}

/// Percent change vs the prior close. The first bar, and any ratio that is
/// undefined (zero or non-finite prior), resolve to 0 rather than an error.
fn minute_return(previous_close: Option<f64>, close: f64) -> f64 {
    match previous_close {
        Some(prev) if prev != 0.0 && prev.is_finite() => (close - prev) / prev * 100.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UtcMinute;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).expect("symbol")
    }

    fn session() -> TradingDate {
        TradingDate::parse("2025-06-02").expect("date")
    }

    fn bar(seconds: i64, close: f64) -> RawBar {
        RawBar {
            ts: UtcMinute::from_unix_seconds(seconds).expect("ts"),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 500,
        }
    }

    fn extraction(bars: Vec<(&str, Vec<RawBar>)>) -> ExtractionResult {
        let mut result = ExtractionResult::default();
        for (name, sequence) in bars {
            result.bars.insert(symbol(name), sequence);
        }
        result
    }

    #[test]
    fn minute_returns_are_percent_changes_with_zero_first() {
        let input = extraction(vec![(
            "AAPL",
            vec![
                bar(1_748_871_000, 100.0),
                bar(1_748_871_060, 110.0),
                bar(1_748_871_120, 99.0),
            ],
        )]);
        let dataset = transform(&input, session());
        let returns: Vec<f64> = dataset.records[&symbol("AAPL")]
            .iter()
            .map(|r| r.minute_return)
            .collect();

        assert_eq!(returns[0], 0.0);
        assert!((returns[1] - 10.0).abs() < 1e-9);
        assert!((returns[2] + 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_prior_close_resolves_to_zero_not_infinity() {
        let input = extraction(vec![(
            "AAPL",
            vec![bar(1_748_871_000, 0.0), bar(1_748_871_060, 50.0)],
        )]);
        let dataset = transform(&input, session());
        assert_eq!(dataset.records[&symbol("AAPL")][1].minute_return, 0.0);
    }

    #[test]
    fn bars_are_sorted_before_returns_are_computed() {
        let input = extraction(vec![(
            "AAPL",
            vec![
                bar(1_748_871_120, 99.0),
                bar(1_748_871_000, 100.0),
                bar(1_748_871_060, 110.0),
            ],
        )]);
        let dataset = transform(&input, session());
        let records = &dataset.records[&symbol("AAPL")];

        assert!(records.windows(2).all(|w| w[0].event_timestamp <= w[1].event_timestamp));
        assert!((records[1].minute_return - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_ticker_is_dropped_from_output() {
        let input = extraction(vec![
            ("AAPL", vec![bar(1_748_871_000, 100.0)]),
            ("MSFT", Vec::new()),
        ]);
        let dataset = transform(&input, session());
        assert!(dataset.records.contains_key(&symbol("AAPL")));
        assert!(!dataset.records.contains_key(&symbol("MSFT")));
    }

    #[test]
    fn derived_time_columns_match_the_timestamp() {
        let input = extraction(vec![("AAPL", vec![bar(1_748_871_000, 100.0)])]);
        let dataset = transform(&input, session());
        let record = &dataset.records[&symbol("AAPL")][0];

        assert_eq!(record.trade_hour, 13);
        assert_eq!(record.trade_minute, 30);
        assert_eq!(record.trading_date.to_string(), "2025-06-02");
    }

    #[test]
    fn all_empty_tickers_yield_an_empty_dataset() {
        let input = extraction(vec![("AAPL", Vec::new())]);
        let dataset = transform(&input, session());
        assert!(dataset.is_empty());
    }
}
