//! CSV and HTML report writers.
//!
//! Writers take any `io::Write` so reports can go to a file, stdout or a
//! test buffer.

use std::collections::HashMap;
use std::io::Write;

use crate::app::Result;
use crate::domain::{CreatorSummary, TokenRecord};

/// `$1.23K` / `$4.56M` style figure used in creator reports.
pub fn format_market_cap(cap: f64) -> String {
    if cap >= 1_000_000.0 {
        format!("${:.2}M", cap / 1_000_000.0)
    } else if cap >= 1_000.0 {
        format!("${:.2}K", cap / 1_000.0)
    } else {
        format!("${:.2}", cap)
    }
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row<W: Write>(writer: &mut W, fields: &[&str]) -> Result<()> {
    let row = fields
        .iter()
        .map(|f| csv_escape(f))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{}", row)?;
    Ok(())
}

/// One row per stored token, raw values as stored.
pub fn write_tokens_csv<W: Write>(writer: &mut W, tokens: &[TokenRecord]) -> Result<()> {
    csv_row(
        writer,
        &[
            "url",
            "name",
            "ticker",
            "creator_address",
            "creator_name",
            "created_at",
            "age",
            "market_cap",
            "supply",
            "replies",
            "description",
        ],
    )?;

    for token in tokens {
        let market_cap = token.market_cap.map(|c| c.to_string()).unwrap_or_default();
        let replies = token.replies.to_string();
        csv_row(
            writer,
            &[
                &token.url,
                &token.name,
                token.ticker.as_deref().unwrap_or(""),
                token.creator_address.as_deref().unwrap_or(""),
                token.creator_name.as_deref().unwrap_or(""),
                &token.display_created_at(),
                token.age.as_deref().unwrap_or(""),
                &market_cap,
                token.supply.as_deref().unwrap_or(""),
                &replies,
                token.description.as_deref().unwrap_or(""),
            ],
        )?;
    }

    Ok(())
}

/// `TICKER (url)` labels for each creator's tokens, in stored order.
fn tokens_by_creator(tokens: &[TokenRecord]) -> HashMap<&str, Vec<String>> {
    let mut by_creator: HashMap<&str, Vec<String>> = HashMap::new();
    for token in tokens {
        if let Some(address) = token.creator_address.as_deref() {
            by_creator
                .entry(address)
                .or_default()
                .push(format!("{} ({})", token.display_ticker(), token.url));
        }
    }
    by_creator
}

fn format_date(dt: Option<chrono::NaiveDateTime>) -> String {
    dt.map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// One row per creator with rollups and the token list joined by `; `.
pub fn write_creators_csv<W: Write>(
    writer: &mut W,
    summaries: &[CreatorSummary],
    tokens: &[TokenRecord],
) -> Result<()> {
    let by_creator = tokens_by_creator(tokens);

    csv_row(
        writer,
        &[
            "creator_address",
            "creator_name",
            "token_count",
            "total_market_cap",
            "total_replies",
            "first_token_date",
            "latest_token_date",
            "tokens",
        ],
    )?;

    for summary in summaries {
        let token_list = by_creator
            .get(summary.address.as_str())
            .map(|labels| labels.join("; "))
            .unwrap_or_default();
        let count = summary.token_count.to_string();
        let replies = summary.total_replies.to_string();
        csv_row(
            writer,
            &[
                &summary.address,
                summary.name.as_deref().unwrap_or(""),
                &count,
                &format_market_cap(summary.total_market_cap),
                &replies,
                &format_date(summary.first_seen),
                &format_date(summary.last_seen),
                &token_list,
            ],
        )?;
    }

    Ok(())
}

/// Standalone HTML creator report. All site-derived text is escaped.
pub fn write_creators_html<W: Write>(
    writer: &mut W,
    summaries: &[CreatorSummary],
    tokens: &[TokenRecord],
) -> Result<()> {
    let by_creator = tokens_by_creator(tokens);

    writeln!(
        writer,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Creator Report</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; margin: 2em; }}\n\
         table {{ border-collapse: collapse; width: 100%; }}\n\
         th, td {{ border: 1px solid #ccc; padding: 6px 10px; text-align: left; }}\n\
         th {{ background: #f0f0f0; }}\n\
         </style>\n</head>\n<body>\n<h1>Creator Report</h1>\n<table>"
    )?;
    writeln!(
        writer,
        "<tr><th>Creator</th><th>Address</th><th>Tokens</th><th>Total Market Cap</th>\
         <th>Total Replies</th><th>First Token</th><th>Latest Token</th><th>Token List</th></tr>"
    )?;

    for summary in summaries {
        let name = summary.name.as_deref().unwrap_or("(unknown)");
        let token_list = by_creator
            .get(summary.address.as_str())
            .map(|labels| labels.join(", "))
            .unwrap_or_default();
        writeln!(
            writer,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            html_escape::encode_text(name),
            html_escape::encode_text(&summary.address),
            summary.token_count,
            html_escape::encode_text(&format_market_cap(summary.total_market_cap)),
            summary.total_replies,
            format_date(summary.first_seen),
            format_date(summary.last_seen),
            html_escape::encode_text(&token_list),
        )?;
    }

    writeln!(writer, "</table>\n</body>\n</html>")?;
    Ok(())
}
