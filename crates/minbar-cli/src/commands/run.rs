use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use minbar_core::{
    parse_universe, resolve_minbar_home, FsArchiveStore, Pipeline, PipelineConfig, RunOutcome,
    ThreadSleeper, TradingDate, Warehouse, WarehouseConfig, YahooChartAdapter,
};

use crate::cli::RunArgs;
use crate::error::CliError;

pub fn run(args: &RunArgs) -> Result<(), CliError> {
    let mut config = PipelineConfig::default();
    config.pacing = Duration::from_millis(args.pacing_ms);
    config.batch_size = args.batch_size;

    if let Some(date) = &args.date {
        config = config.with_reference_date(TradingDate::parse(date)?.as_date());
    }
    if let Some(tickers) = &args.tickers {
        config = config.with_universe(parse_universe(tickers)?);
    }

    let home = args.home.clone().unwrap_or_else(resolve_minbar_home);
    let archive_root = args
        .archive_root
        .clone()
        .unwrap_or_else(|| home.join("archive"));

    let source = Arc::new(YahooChartAdapter::new()?);
    let archive = Arc::new(FsArchiveStore::new(archive_root));
    let warehouse = Warehouse::open(WarehouseConfig::under_home(home))?;

    let pipeline = Pipeline::new(config, source, archive, warehouse, Arc::new(ThreadSleeper));
    match pipeline.run()? {
        RunOutcome::Loaded(report) => {
            info!(
                run_id = %report.run_id,
                trading_date = %report.trading_date,
                records = report.record_count,
                tickers = report.ticker_count,
                "run finished"
            );
            println!(
                "loaded {} records for {} tickers on {}",
                report.record_count, report.ticker_count, report.trading_date
            );
            if !report.failed_tickers.is_empty() {
                println!("failed tickers: {}", report.failed_tickers.join(", "));
            }
        }
        RunOutcome::NothingToLoad { trading_date } => {
            println!("no records to load for {trading_date}");
        }
    }

    Ok(())
}
