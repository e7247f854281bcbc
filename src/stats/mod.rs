//! Read-only aggregation over the stored token set.
//!
//! Everything here is a pure reduction over `&[TokenRecord]`; nothing is
//! persisted and no accumulator outlives a call.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDateTime};

use crate::domain::{CreatorSummary, DailyStats, TokenRecord, Totals};

/// Creator list sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorSort {
    TokenCount,
    TotalMarketCap,
    FirstSeen,
    LastSeen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl CreatorSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "token_count" => Some(Self::TokenCount),
            "total_market_cap" => Some(Self::TotalMarketCap),
            "first_token_date" => Some(Self::FirstSeen),
            "latest_token_date" => Some(Self::LastSeen),
            _ => None,
        }
    }
}

/// Group tokens by creator address and compute the rollups, sorted by
/// token count descending. Tokens without a creator address are excluded.
pub fn creator_summaries(tokens: &[TokenRecord]) -> Vec<CreatorSummary> {
    let mut by_creator: BTreeMap<&str, CreatorSummary> = BTreeMap::new();

    for token in tokens {
        let Some(ref address) = token.creator_address else {
            continue;
        };

        let entry = by_creator
            .entry(address.as_str())
            .or_insert_with(|| CreatorSummary {
                address: address.clone(),
                name: None,
                avatar_url: None,
                token_count: 0,
                total_market_cap: 0.0,
                total_replies: 0,
                first_seen: None,
                last_seen: None,
            });

        entry.token_count += 1;
        entry.total_replies += token.replies;
        if let Some(cap) = token.market_cap {
            entry.total_market_cap += cap;
        }
        // First-observed display identity wins for the group.
        if entry.name.is_none() {
            entry.name = token.creator_name.clone();
        }
        if entry.avatar_url.is_none() {
            entry.avatar_url = token.creator_avatar_url.clone();
        }
        if let Some(created) = token.created_at {
            entry.first_seen = Some(entry.first_seen.map_or(created, |f| f.min(created)));
            entry.last_seen = Some(entry.last_seen.map_or(created, |l| l.max(created)));
        }
    }

    let mut summaries: Vec<CreatorSummary> = by_creator.into_values().collect();
    sort_creators(&mut summaries, CreatorSort::TokenCount, SortOrder::Desc);
    summaries
}

/// Re-sort a creator list in place.
pub fn sort_creators(summaries: &mut [CreatorSummary], sort: CreatorSort, order: SortOrder) {
    summaries.sort_by(|a, b| {
        let cmp = match sort {
            CreatorSort::TokenCount => a.token_count.cmp(&b.token_count),
            CreatorSort::TotalMarketCap => a
                .total_market_cap
                .partial_cmp(&b.total_market_cap)
                .unwrap_or(Ordering::Equal),
            CreatorSort::FirstSeen => a.first_seen.cmp(&b.first_seen),
            CreatorSort::LastSeen => a.last_seen.cmp(&b.last_seen),
        };
        let cmp = cmp.then_with(|| a.address.cmp(&b.address));
        match order {
            SortOrder::Asc => cmp,
            SortOrder::Desc => cmp.reverse(),
        }
    });
}

/// Global totals; `now` is the reference point for the 24-hour window,
/// in the same (site-local) clock as `created_at`.
pub fn totals(tokens: &[TokenRecord], now: NaiveDateTime) -> Totals {
    let creators: HashSet<&str> = tokens
        .iter()
        .filter_map(|t| t.creator_address.as_deref())
        .collect();

    let cutoff = now - Duration::hours(24);
    let new_today = tokens
        .iter()
        .filter(|t| t.created_at.is_some_and(|c| c >= cutoff))
        .count();

    Totals {
        total_creators: creators.len(),
        total_tokens: tokens.len(),
        total_market_cap: tokens.iter().filter_map(|t| t.market_cap).sum(),
        new_today,
    }
}

/// Cumulative daily history in ascending date order.
///
/// Creator and token counts accumulate across days; the market-cap figure
/// is each day's own total, replacing the previous day's (long-standing
/// behavior of the dashboard feed).
pub fn daily_history(tokens: &[TokenRecord]) -> Vec<DailyStats> {
    struct DayBucket<'a> {
        creators: HashSet<&'a str>,
        tokens: usize,
        market_cap: f64,
    }

    let mut days: BTreeMap<chrono::NaiveDate, DayBucket<'_>> = BTreeMap::new();
    for token in tokens {
        let Some(created) = token.created_at else {
            continue;
        };
        let bucket = days.entry(created.date()).or_insert_with(|| DayBucket {
            creators: HashSet::new(),
            tokens: 0,
            market_cap: 0.0,
        });
        if let Some(address) = token.creator_address.as_deref() {
            bucket.creators.insert(address);
        }
        bucket.tokens += 1;
        if let Some(cap) = token.market_cap {
            bucket.market_cap += cap;
        }
    }

    let mut seen_creators: HashSet<&str> = HashSet::new();
    let mut cumulative_tokens = 0;
    let mut history = Vec::with_capacity(days.len());

    for (date, bucket) in days {
        seen_creators.extend(bucket.creators.iter());
        cumulative_tokens += bucket.tokens;
        history.push(DailyStats {
            date,
            total_creators: seen_creators.len(),
            total_tokens: cumulative_tokens,
            market_cap: bucket.market_cap,
            new_tokens: bucket.tokens,
        });
    }

    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn token(url: &str, creator: Option<&str>, cap: Option<f64>, created: &str) -> TokenRecord {
        TokenRecord {
            url: url.into(),
            name: "Token".into(),
            ticker: None,
            logo_url: None,
            creator_address: creator.map(String::from),
            creator_name: creator.map(|c| format!("name-of-{}", c)),
            creator_avatar_url: None,
            created_at: NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M:%S").ok(),
            created_at_raw: None,
            age: None,
            market_cap: cap,
            supply: None,
            replies: 2,
            description: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_creator_rollup_excludes_absent_caps() {
        let tokens = vec![
            token("u1", Some("X"), Some(100.0), "2024-03-09 10:00:00"),
            token("u2", Some("X"), Some(2000.0), "2024-03-10 10:00:00"),
            token("u3", Some("X"), None, "2024-03-11 10:00:00"),
        ];

        let summaries = creator_summaries(&tokens);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].token_count, 3);
        assert_eq!(summaries[0].total_market_cap, 2100.0);
        assert_eq!(summaries[0].total_replies, 6);
    }

    #[test]
    fn test_creator_rollup_first_and_last_seen() {
        let tokens = vec![
            token("u1", Some("X"), None, "2024-03-10 10:00:00"),
            token("u2", Some("X"), None, "2024-03-09 08:00:00"),
            token("u3", Some("X"), None, "2024-03-11 23:00:00"),
        ];

        let summaries = creator_summaries(&tokens);
        let first = summaries[0].first_seen.unwrap();
        let last = summaries[0].last_seen.unwrap();
        assert_eq!(first.date(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(last.date(), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }

    #[test]
    fn test_creator_rollup_first_observed_name() {
        let mut t1 = token("u1", Some("X"), None, "2024-03-09 10:00:00");
        t1.creator_name = Some("First Name".into());
        let mut t2 = token("u2", Some("X"), None, "2024-03-10 10:00:00");
        t2.creator_name = Some("Renamed".into());

        let summaries = creator_summaries(&[t1, t2]);
        assert_eq!(summaries[0].name.as_deref(), Some("First Name"));
    }

    #[test]
    fn test_creators_without_address_excluded() {
        let tokens = vec![
            token("u1", Some("X"), None, "2024-03-09 10:00:00"),
            token("u2", None, None, "2024-03-09 11:00:00"),
        ];
        let summaries = creator_summaries(&tokens);
        assert_eq!(summaries.len(), 1);
    }

    #[test]
    fn test_default_sort_count_desc() {
        let tokens = vec![
            token("u1", Some("A"), None, "2024-03-09 10:00:00"),
            token("u2", Some("B"), None, "2024-03-09 10:00:00"),
            token("u3", Some("B"), None, "2024-03-09 10:00:00"),
        ];
        let summaries = creator_summaries(&tokens);
        assert_eq!(summaries[0].address, "B");
        assert_eq!(summaries[1].address, "A");
    }

    #[test]
    fn test_sort_by_market_cap_asc() {
        let tokens = vec![
            token("u1", Some("A"), Some(500.0), "2024-03-09 10:00:00"),
            token("u2", Some("B"), Some(100.0), "2024-03-09 10:00:00"),
        ];
        let mut summaries = creator_summaries(&tokens);
        sort_creators(&mut summaries, CreatorSort::TotalMarketCap, SortOrder::Asc);
        assert_eq!(summaries[0].address, "B");
    }

    #[test]
    fn test_totals() {
        let now = NaiveDateTime::parse_from_str("2024-03-11 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let tokens = vec![
            token("u1", Some("A"), Some(100.0), "2024-03-09 10:00:00"),
            token("u2", Some("B"), Some(200.0), "2024-03-11 10:00:00"),
            token("u3", Some("B"), None, "2024-03-10 13:00:00"),
        ];

        let totals = totals(&tokens, now);
        assert_eq!(totals.total_creators, 2);
        assert_eq!(totals.total_tokens, 3);
        assert_eq!(totals.total_market_cap, 300.0);
        // u2 and u3 fall inside the 24h window before `now`.
        assert_eq!(totals.new_today, 2);
    }

    #[test]
    fn test_daily_history_cumulative_counts_daily_caps() {
        let tokens = vec![
            token("u1", Some("A"), Some(100.0), "2024-03-09 10:00:00"),
            token("u2", Some("B"), Some(200.0), "2024-03-09 11:00:00"),
            token("u3", Some("A"), Some(50.0), "2024-03-10 09:00:00"),
        ];

        let history = daily_history(&tokens);
        assert_eq!(history.len(), 2);

        assert_eq!(history[0].date, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(history[0].total_creators, 2);
        assert_eq!(history[0].total_tokens, 2);
        assert_eq!(history[0].market_cap, 300.0);
        assert_eq!(history[0].new_tokens, 2);

        assert_eq!(history[1].total_creators, 2);
        assert_eq!(history[1].total_tokens, 3);
        // Day total replaces the running figure; it does not accumulate.
        assert_eq!(history[1].market_cap, 50.0);
        assert_eq!(history[1].new_tokens, 1);
    }

    #[test]
    fn test_daily_history_skips_undated_tokens() {
        let tokens = vec![
            token("u1", Some("A"), None, "2024-03-09 10:00:00"),
            token("u2", Some("A"), None, "not a date"),
        ];
        let history = daily_history(&tokens);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total_tokens, 1);
    }

    #[test]
    fn test_parse_sort_keys() {
        assert_eq!(CreatorSort::parse("token_count"), Some(CreatorSort::TokenCount));
        assert_eq!(
            CreatorSort::parse("total_market_cap"),
            Some(CreatorSort::TotalMarketCap)
        );
        assert_eq!(
            CreatorSort::parse("first_token_date"),
            Some(CreatorSort::FirstSeen)
        );
        assert_eq!(
            CreatorSort::parse("latest_token_date"),
            Some(CreatorSort::LastSeen)
        );
        assert_eq!(CreatorSort::parse("bogus"), None);
    }
}
