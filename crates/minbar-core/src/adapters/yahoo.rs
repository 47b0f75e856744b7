//! Yahoo Finance v8 chart-API adapter for one-minute bars.

use std::time::Duration;

use serde::Deserialize;

use crate::bar_source::{BarColumn, BarRow, BarSource, BarTable, BarsRequest, SourceError};
use crate::domain::UtcMinute;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = concat!("minbar/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP adapter. One request per ticker-session; the caller owns
/// pacing and retries.
pub struct YahooChartAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooChartAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Used by tests to point the adapter at a local stub.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| SourceError::internal(format!("http client build: {error}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl BarSource for YahooChartAdapter {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    fn minute_bars(&self, request: &BarsRequest) -> Result<BarTable, SourceError> {
        let url = format!(
            "{base}/v8/finance/chart/{symbol}?interval=1m&period1={start}&period2={end}&includePrePost={prepost}",
            base = self.base_url,
            symbol = request.symbol,
            start = request.start.unix_midnight(),
            end = request.end.unix_midnight(),
            prepost = !request.regular_hours_only,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|error| SourceError::unavailable(format!("chart request: {error}")))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SourceError::rate_limited(format!(
                "chart request for {} throttled",
                request.symbol
            )));
        }
        if !status.is_success() {
            return Err(SourceError::unavailable(format!(
                "chart request for {} returned {status}",
                request.symbol
            )));
        }

        let payload: ChartResponse = response
            .json()
            .map_err(|error| SourceError::decode(format!("chart payload: {error}")))?;

        table_from_payload(payload)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

/// Per-series arrays; a missing array means the column is absent from the
/// schema, a `null` element means a gap inside a present column.
#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

fn table_from_payload(payload: ChartResponse) -> Result<BarTable, SourceError> {
    if let Some(error) = payload.chart.error {
        return Err(SourceError::unavailable(format!(
            "{}: {}",
            error.code, error.description
        )));
    }

    let result = payload
        .chart
        .result
        .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)));
    let Some(result) = result else {
        return Ok(BarTable::default());
    };

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut columns = Vec::new();
    for (column, present) in [
        (BarColumn::Open, quote.open.is_some()),
        (BarColumn::High, quote.high.is_some()),
        (BarColumn::Low, quote.low.is_some()),
        (BarColumn::Close, quote.close.is_some()),
        (BarColumn::Volume, quote.volume.is_some()),
    ] {
        if present {
            columns.push(column);
        }
    }

    let mut rows = Vec::with_capacity(timestamps.len());
    for (index, seconds) in timestamps.iter().enumerate() {
        let ts = UtcMinute::from_unix_seconds(*seconds)
            .map_err(|error| SourceError::decode(error.to_string()))?;
        rows.push(BarRow {
            ts,
            open: series_cell(&quote.open, index),
            high: series_cell(&quote.high, index),
            low: series_cell(&quote.low, index),
            close: series_cell(&quote.close, index),
            volume: series_cell(&quote.volume, index),
        });
    }

    Ok(BarTable { columns, rows })
}

fn series_cell<T: Copy>(series: &Option<Vec<Option<T>>>, index: usize) -> Option<T> {
    series
        .as_ref()
        .and_then(|values| values.get(index).copied().flatten())
}
