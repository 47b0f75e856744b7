//! Archive sink: CSV serialization and key-addressed blob storage.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::info;

use crate::domain::{NormalizedRecord, TradingDate};
use crate::transform::TransformedDataset;

/// Key prefix both archive objects live under.
pub const ARCHIVE_NAMESPACE: &str = "sp500_intraday";

/// Header row, in `NormalizedRecord` field order.
pub const CSV_HEADER: &str = "event_timestamp,trading_date,ticker,open,high,low,close,volume,minute_return,trade_hour,trade_minute";

/// Key-addressed blob store with unconditional overwrite semantics.
pub trait ArchiveStore: Send + Sync {
    fn put(&self, key: &str, contents: &str) -> io::Result<()>;
}

/// Filesystem-backed store: keys become paths under a root directory.
pub struct FsArchiveStore {
    root: PathBuf,
}

impl FsArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl ArchiveStore for FsArchiveStore {
    fn put(&self, key: &str, contents: &str) -> io::Result<()> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryArchiveStore {
    objects: Mutex<BTreeMap<String, String>>,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .expect("archive store mutex should not be poisoned")
            .get(key)
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("archive store mutex should not be poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl ArchiveStore for MemoryArchiveStore {
    fn put(&self, key: &str, contents: &str) -> io::Result<()> {
        self.objects
            .lock()
            .expect("archive store mutex should not be poisoned")
            .insert(key.to_owned(), contents.to_owned());
        Ok(())
    }
}

/// Serialize the unioned dataset and write the dated object plus the
/// `latest` alias, both overwriting whatever is there.
pub fn write_archive(
    store: &dyn ArchiveStore,
    dataset: &TransformedDataset,
    trading_date: TradingDate,
) -> io::Result<()> {
    let csv = to_csv(dataset);
    let daily_key = format!("{ARCHIVE_NAMESPACE}/{trading_date}.csv");
    let latest_key = format!("{ARCHIVE_NAMESPACE}/latest.csv");

    info!(
        key = %daily_key,
        bytes = csv.len(),
        records = dataset.total_records(),
        "writing daily archive object"
    );
    store.put(&daily_key, &csv)?;

    info!(key = %latest_key, "updating latest archive object");
    store.put(&latest_key, &csv)?;

    Ok(())
}

/// Header plus one line per record, concatenated in dataset order.
pub fn to_csv(dataset: &TransformedDataset) -> String {
    let mut out = String::with_capacity(64 * (dataset.total_records() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');

    for record in dataset.unioned() {
        write_record(&mut out, record);
    }

    out
}

fn write_record(out: &mut String, record: &NormalizedRecord) {
    let _ = writeln!(
        out,
        "{},{},{},{},{},{},{},{},{},{},{}",
        csv_field(&record.event_timestamp.format_rfc3339()),
        csv_field(&record.trading_date.to_string()),
        csv_field(record.ticker.as_str()),
        record.open,
        record.high,
        record.low,
        record.close,
        record.volume,
        record.minute_return,
        record.trade_hour,
        record.trade_minute,
    );
}

/// Quote only when the value needs it.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
