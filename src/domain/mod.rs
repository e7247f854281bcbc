mod creator;
mod token;

pub use creator::{CreatorSummary, DailyStats, Totals};
pub use token::{parse_market_cap, TokenExtract, TokenRecord, EXTRACT_ERROR_MAX_LEN};
