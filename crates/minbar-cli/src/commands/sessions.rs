use time::OffsetDateTime;

use minbar_core::{TradingCalendar, TradingDate};

use crate::cli::SessionsArgs;
use crate::error::CliError;

pub fn run(args: &SessionsArgs) -> Result<(), CliError> {
    let reference = match &args.before {
        Some(date) => TradingDate::parse(date)?.as_date(),
        None => OffsetDateTime::now_utc().date(),
    };

    let calendar = TradingCalendar::us_2025();
    for session in calendar.last_n_sessions(reference, args.count) {
        println!("{session}");
    }
    Ok(())
}
