use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "minbar", version, about = "Daily S&P 500 minute-bar pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daily extract-transform-load pipeline.
    Run(RunArgs),
    /// Count warehouse rows for one session.
    Count(CountArgs),
    /// Print recent trading sessions.
    Sessions(SessionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Resolve the session relative to this date instead of today
    /// (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<String>,

    /// Comma-separated ticker override for the default universe.
    #[arg(long)]
    pub tickers: Option<String>,

    /// Data home holding the warehouse and archive; defaults to
    /// `$MINBAR_HOME` or `~/.minbar`.
    #[arg(long)]
    pub home: Option<PathBuf>,

    /// Archive root directory; defaults to `<home>/archive`.
    #[arg(long)]
    pub archive_root: Option<PathBuf>,

    /// Warehouse insert chunk size.
    #[arg(long, default_value_t = 1_000)]
    pub batch_size: usize,

    /// Milliseconds to pause between tickers.
    #[arg(long, default_value_t = 1_000)]
    pub pacing_ms: u64,
}

#[derive(Debug, Args)]
pub struct CountArgs {
    /// Session date to count (YYYY-MM-DD).
    #[arg(long)]
    pub date: String,

    /// Data home holding the warehouse; defaults to `$MINBAR_HOME` or
    /// `~/.minbar`.
    #[arg(long)]
    pub home: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SessionsArgs {
    /// How many sessions to print, most recent last.
    #[arg(long, default_value_t = 5)]
    pub count: usize,

    /// Resolve sessions before this date instead of today (YYYY-MM-DD).
    #[arg(long)]
    pub before: Option<String>,
}
