mod date;
mod record;
mod symbol;
mod timestamp;

pub use date::TradingDate;
pub use record::{NormalizedRecord, RawBar};
pub use symbol::Symbol;
pub use timestamp::UtcMinute;
