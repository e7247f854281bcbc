use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Per-creator rollup, derived from stored tokens and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CreatorSummary {
    pub address: String,
    /// First-observed display name for the group.
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub token_count: usize,
    /// Sum over tokens with a known market cap.
    pub total_market_cap: f64,
    pub total_replies: i64,
    pub first_seen: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,
}

/// Global aggregate totals over the stored token set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub total_creators: usize,
    pub total_tokens: usize,
    pub total_market_cap: f64,
    /// Tokens created within the 24 hours before the reference time.
    pub new_today: usize,
}

/// One row of the cumulative daily history.
///
/// Creator and token counts are cumulative up to and including the date;
/// `market_cap` is that day's total only, replacing the previous figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_creators: usize,
    pub total_tokens: usize,
    pub market_cap: f64,
    pub new_tokens: usize,
}
