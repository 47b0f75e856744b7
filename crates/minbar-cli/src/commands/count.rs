use minbar_core::{resolve_minbar_home, TradingDate, Warehouse, WarehouseConfig};

use crate::cli::CountArgs;
use crate::error::CliError;

pub fn run(args: &CountArgs) -> Result<(), CliError> {
    let trading_date = TradingDate::parse(&args.date)?;
    let home = args.home.clone().unwrap_or_else(resolve_minbar_home);
    let warehouse = Warehouse::open(WarehouseConfig::under_home(home))?;
    let count = warehouse.count_for_date(&trading_date.to_string())?;
    println!("{count}");
    Ok(())
}
