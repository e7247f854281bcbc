use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{FomoError, Result};

/// Extraction error messages are truncated to this many characters before
/// they are attached to an extract.
pub const EXTRACT_ERROR_MAX_LEN: usize = 200;

/// A fully synchronized token, keyed by its canonical detail-page URL.
///
/// Absent page fields are `None`; presentation layers decide how to render
/// absence. Records are inserted exactly once and never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub url: String,
    pub name: String,
    pub ticker: Option<String>,
    pub logo_url: Option<String>,
    pub creator_address: Option<String>,
    pub creator_name: Option<String>,
    pub creator_avatar_url: Option<String>,
    /// Creation time as shown by the site, normalized from its
    /// `DD/MM/YYYY, HH:MM:SS` form.
    pub created_at: Option<NaiveDateTime>,
    /// The raw title attribute the timestamp was parsed from.
    pub created_at_raw: Option<String>,
    /// Relative-age label ("2h ago"), display-only.
    pub age: Option<String>,
    pub market_cap: Option<f64>,
    pub supply: Option<String>,
    pub replies: i64,
    pub description: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Build a record from a successful extract, applying strict numeric
    /// parsing. A present-but-malformed market cap or reply count fails the
    /// conversion; an absent one maps to `None` / 0.
    pub fn from_extract(extract: TokenExtract) -> Result<Self> {
        let name = extract
            .name
            .ok_or_else(|| FomoError::Parse(format!("token name missing for {}", extract.url)))?;

        let market_cap = match extract.market_cap_raw {
            Some(ref raw) => Some(parse_market_cap(raw).map_err(|e| {
                FomoError::Parse(format!("market cap {:?} for {}: {}", raw, extract.url, e))
            })?),
            None => None,
        };

        let replies = match extract.replies_raw {
            Some(ref raw) => raw.trim().parse::<i64>().map_err(|_| {
                FomoError::Parse(format!("reply count {:?} for {}", raw, extract.url))
            })?,
            None => 0,
        };

        Ok(Self {
            url: extract.url,
            name,
            ticker: extract.ticker,
            logo_url: extract.logo_url,
            creator_address: extract.creator_address,
            creator_name: extract.creator_name,
            creator_avatar_url: extract.creator_avatar_url,
            created_at: extract.created_at,
            created_at_raw: extract.created_at_raw,
            age: extract.age,
            market_cap,
            supply: extract.supply,
            replies,
            description: extract.description,
            fetched_at: Utc::now(),
        })
    }

    pub fn display_ticker(&self) -> &str {
        self.ticker.as_deref().unwrap_or("Unknown")
    }

    /// Canonical `YYYY-MM-DD HH:MM:SS` form, or "Unknown" when absent.
    pub fn display_created_at(&self) -> String {
        self.created_at
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Unknown".into())
    }
}

/// Raw output of a single extraction pass over one rendered token page.
///
/// Every field is optional: attribute lookups degrade to `None` rather than
/// failing the extract. Only a missing top-level container fails the whole
/// pass, leaving a extract with just the URL and a truncated error.
#[derive(Debug, Clone, Default)]
pub struct TokenExtract {
    pub url: String,
    pub name: Option<String>,
    pub ticker: Option<String>,
    pub logo_url: Option<String>,
    pub creator_address: Option<String>,
    pub creator_name: Option<String>,
    pub creator_avatar_url: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub created_at_raw: Option<String>,
    pub age: Option<String>,
    pub market_cap_raw: Option<String>,
    pub supply: Option<String>,
    pub replies_raw: Option<String>,
    pub description: Option<String>,
    pub error: Option<String>,
}

impl TokenExtract {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// An extract that carries only the URL and a truncated error message.
    pub fn failed(url: &str, error: impl AsRef<str>) -> Self {
        let mut extract = Self::new(url);
        extract.error = Some(truncate(error.as_ref(), EXTRACT_ERROR_MAX_LEN));
        extract
    }

    /// Success means no extraction error and a resolved name.
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.name.is_some()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Parse a market-cap string like `$1.5K`, `$2M` or `$300` into a number.
///
/// A leading `$` and thousands separators are stripped; `K` and `M`
/// suffixes multiply by 1e3 and 1e6.
pub fn parse_market_cap(raw: &str) -> std::result::Result<f64, String> {
    let cleaned = raw.trim().trim_start_matches('$').replace(',', "");
    if cleaned.is_empty() {
        return Err("empty value".into());
    }

    let (digits, multiplier) = match cleaned.chars().last() {
        Some('K') | Some('k') => (&cleaned[..cleaned.len() - 1], 1_000.0),
        Some('M') | Some('m') => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };

    digits
        .parse::<f64>()
        .map(|v| v * multiplier)
        .map_err(|_| format!("not a number: {:?}", raw))
}
