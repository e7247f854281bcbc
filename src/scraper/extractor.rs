use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

use crate::app::Result;
use crate::domain::TokenExtract;
use crate::scraper::{Browser, ScraperConfig};

/// The site renders creation times as `title` attributes in this form.
const CREATED_AT_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// Extracts one token's structured data from its rendered detail page.
///
/// A single best-effort pass per invocation: every attribute lookup
/// degrades to an absent field, except the top-level container marker —
/// if that never appears within the bounded wait, the whole pass fails
/// and the extract carries only the URL and a truncated error. Retry
/// policy belongs to the sync engine, not here.
pub struct TokenExtractor {
    config: ScraperConfig,
}

impl TokenExtractor {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    /// Run an extraction pass against the browser's current page.
    ///
    /// The caller has already navigated to `url`. Only session-level
    /// errors propagate; anything scoped to this page becomes a failed
    /// extract.
    pub async fn extract<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        url: &str,
    ) -> Result<TokenExtract> {
        match self.try_extract(browser, url).await {
            Ok(extract) => Ok(extract),
            Err(e) if e.is_session() => Err(e),
            Err(e) => Ok(TokenExtract::failed(url, e.to_string())),
        }
    }

    async fn try_extract<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        url: &str,
    ) -> Result<TokenExtract> {
        let container = &self.config.selectors.container;
        let found = browser
            .wait_for(container, self.config.container_timeout())
            .await?;

        if !found {
            return Ok(TokenExtract::failed(
                url,
                format!(
                    "token container {} not found within {}s",
                    container, self.config.container_timeout_secs
                ),
            ));
        }

        let value = browser.evaluate(&self.collection_script()).await?;
        let raw: RawTokenPage = serde_json::from_value(value).unwrap_or_default();
        debug!(url, "collected raw token page");

        Ok(assemble(url, raw))
    }

    /// In-page script that collects every raw field in one round trip.
    pub fn collection_script(&self) -> String {
        let s = &self.config.selectors;
        let q = |sel: &str| serde_json::to_string(sel).unwrap_or_else(|_| "\"\"".into());

        format!(
            r#"
            (() => {{
                const text = (sel) => {{
                    const el = document.querySelector(sel);
                    return el ? el.innerText.trim() : null;
                }};
                const attr = (sel, name) => {{
                    const el = document.querySelector(sel);
                    return el ? el.getAttribute(name) : null;
                }};

                const times = Array.from(document.querySelectorAll({meta}))
                    .map(el => ({{ title: el.getAttribute('title'), text: el.innerText.trim() }}));

                const stats = Array.from(document.querySelectorAll({stat_item}))
                    .map(el => {{
                        const label = el.querySelector({stat_label});
                        const value = el.querySelector({stat_value});
                        return (label && value)
                            ? {{ label: label.innerText.trim(), value: value.innerText.trim() }}
                            : null;
                    }})
                    .filter(s => s !== null);

                const creator = document.querySelector({creator});

                return {{
                    name_label: text({name}),
                    ticker: text({ticker}),
                    logo_url: attr({media}, 'src'),
                    creator_link: creator ? creator.href : null,
                    creator_name: creator ? creator.innerText.trim() : null,
                    creator_avatar_url: attr({avatar}, 'src'),
                    times: times,
                    stats: stats,
                    description: text({description}),
                }};
            }})()
            "#,
            meta = q(&s.meta_info),
            stat_item = q(&s.stat_item),
            stat_label = q(&s.stat_label),
            stat_value = q(&s.stat_value),
            creator = q(&s.creator_link),
            name = q(&s.token_name),
            ticker = q(&s.ticker),
            media = q(&s.token_media),
            avatar = q(&s.creator_avatar),
            description = q(&s.description),
        )
    }
}

/// Raw field collection as returned by the in-page script.
#[derive(Debug, Default, Deserialize)]
struct RawTokenPage {
    name_label: Option<String>,
    ticker: Option<String>,
    logo_url: Option<String>,
    creator_link: Option<String>,
    creator_name: Option<String>,
    creator_avatar_url: Option<String>,
    #[serde(default)]
    times: Vec<TimedLabel>,
    #[serde(default)]
    stats: Vec<StatPair>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimedLabel {
    title: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatPair {
    label: String,
    value: String,
}

/// Apply the pure parsing rules to a raw page collection.
fn assemble(url: &str, raw: RawTokenPage) -> TokenExtract {
    let mut extract = TokenExtract::new(url);

    // Primary label is "Name (TICKER)"; without the parenthetical form the
    // whole label is the name and the ticker comes from its own element.
    match raw.name_label {
        Some(ref label) => match split_name_ticker(label) {
            Some((name, ticker)) => {
                extract.name = Some(name);
                extract.ticker = Some(ticker);
            }
            None => {
                extract.name = Some(label.clone());
                extract.ticker = raw.ticker;
            }
        },
        None => extract.ticker = raw.ticker,
    }

    extract.logo_url = raw.logo_url;
    extract.creator_name = raw.creator_name;
    extract.creator_avatar_url = raw.creator_avatar_url;
    extract.creator_address = raw.creator_link.as_deref().and_then(link_suffix);

    // First timed element whose title matches the expected pattern wins;
    // parse failures are skipped, not raised.
    for timed in &raw.times {
        let Some(ref title) = timed.title else {
            continue;
        };
        if let Ok(parsed) = NaiveDateTime::parse_from_str(title.trim(), CREATED_AT_FORMAT) {
            extract.created_at = Some(parsed);
            extract.created_at_raw = Some(title.clone());
            extract.age = timed.text.clone();
            break;
        }
    }

    for stat in &raw.stats {
        match stat.label.trim().to_lowercase().as_str() {
            "mc" => extract.market_cap_raw = Some(stat.value.clone()),
            "supply" => extract.supply = Some(stat.value.clone()),
            "replies" => extract.replies_raw = Some(stat.value.clone()),
            _ => {}
        }
    }

    extract.description = raw.description;
    extract
}

/// Split a "Name (TICKER)" label into its parts, if it has that form.
fn split_name_ticker(label: &str) -> Option<(String, String)> {
    if !label.contains('(') || !label.contains(')') {
        return None;
    }
    let (name, rest) = label.split_once('(')?;
    Some((name.trim().to_string(), rest.replace(')', "").trim().to_string()))
}

/// Last non-empty path segment of a profile link.
fn link_suffix(link: &str) -> Option<String> {
    link.rsplit('/')
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_split_name_ticker() {
        assert_eq!(
            split_name_ticker("Doge Coin (DOGE)"),
            Some(("Doge Coin".into(), "DOGE".into()))
        );
        assert_eq!(split_name_ticker("NoParenName"), None);
        assert_eq!(split_name_ticker("Half (open"), None);
    }

    #[test]
    fn test_assemble_name_with_parens() {
        let raw = RawTokenPage {
            name_label: Some("Doge Coin (DOGE)".into()),
            ticker: Some("IGNORED".into()),
            ..Default::default()
        };
        let extract = assemble("https://fomo.biz/token/abc", raw);
        assert_eq!(extract.name.as_deref(), Some("Doge Coin"));
        assert_eq!(extract.ticker.as_deref(), Some("DOGE"));
    }

    #[test]
    fn test_assemble_name_without_parens_uses_secondary_ticker() {
        let raw = RawTokenPage {
            name_label: Some("NoParenName".into()),
            ticker: Some("NPN".into()),
            ..Default::default()
        };
        let extract = assemble("https://fomo.biz/token/abc", raw);
        assert_eq!(extract.name.as_deref(), Some("NoParenName"));
        assert_eq!(extract.ticker.as_deref(), Some("NPN"));
    }

    #[test]
    fn test_assemble_no_secondary_ticker_leaves_absent() {
        let raw = RawTokenPage {
            name_label: Some("NoParenName".into()),
            ..Default::default()
        };
        let extract = assemble("https://fomo.biz/token/abc", raw);
        assert_eq!(extract.name.as_deref(), Some("NoParenName"));
        assert_eq!(extract.ticker, None);
    }

    #[test]
    fn test_assemble_timestamp_first_match_wins() {
        let raw = RawTokenPage {
            times: vec![
                TimedLabel {
                    title: Some("not a date".into()),
                    text: Some("whenever".into()),
                },
                TimedLabel {
                    title: Some("09/03/2024, 14:05:00".into()),
                    text: Some("2h ago".into()),
                },
                TimedLabel {
                    title: Some("10/03/2024, 00:00:00".into()),
                    text: Some("later".into()),
                },
            ],
            ..Default::default()
        };
        let extract = assemble("https://fomo.biz/token/abc", raw);
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(extract.created_at, Some(expected));
        assert_eq!(extract.created_at_raw.as_deref(), Some("09/03/2024, 14:05:00"));
        assert_eq!(extract.age.as_deref(), Some("2h ago"));
    }

    #[test]
    fn test_assemble_no_matching_timestamp() {
        let raw = RawTokenPage {
            times: vec![TimedLabel {
                title: Some("2024-03-09".into()),
                text: None,
            }],
            ..Default::default()
        };
        let extract = assemble("https://fomo.biz/token/abc", raw);
        assert_eq!(extract.created_at, None);
        assert_eq!(extract.created_at_raw, None);
    }

    #[test]
    fn test_assemble_stat_routing() {
        let raw = RawTokenPage {
            stats: vec![
                StatPair {
                    label: " MC ".into(),
                    value: "$1.5K".into(),
                },
                StatPair {
                    label: "Supply".into(),
                    value: "1B".into(),
                },
                StatPair {
                    label: "replies".into(),
                    value: "42".into(),
                },
                StatPair {
                    label: "holders".into(),
                    value: "7".into(),
                },
            ],
            ..Default::default()
        };
        let extract = assemble("https://fomo.biz/token/abc", raw);
        assert_eq!(extract.market_cap_raw.as_deref(), Some("$1.5K"));
        assert_eq!(extract.supply.as_deref(), Some("1B"));
        assert_eq!(extract.replies_raw.as_deref(), Some("42"));
    }

    #[test]
    fn test_assemble_creator_address_from_link() {
        let raw = RawTokenPage {
            creator_link: Some("https://fomo.biz/profile/0xabc123".into()),
            creator_name: Some("maker".into()),
            ..Default::default()
        };
        let extract = assemble("https://fomo.biz/token/abc", raw);
        assert_eq!(extract.creator_address.as_deref(), Some("0xabc123"));
        assert_eq!(extract.creator_name.as_deref(), Some("maker"));
    }

    #[test]
    fn test_link_suffix_trailing_slash() {
        assert_eq!(
            link_suffix("https://fomo.biz/profile/0xabc/"),
            Some("0xabc".into())
        );
    }

    #[test]
    fn test_collection_script_quotes_selectors() {
        let extractor = TokenExtractor::new(ScraperConfig::default());
        let script = extractor.collection_script();
        assert!(script.contains("\"._tokenName_z5b78_38\""));
        assert!(script.contains("name_label"));
        assert!(script.contains("stats"));
    }
}
