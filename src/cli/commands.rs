use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;

use crate::api::{self, ApiState};
use crate::app::{AppContext, FomoError, Result};
use crate::cli::{ExportFormat, ExportTarget, Order, SortKey};
use crate::export;
use crate::scraper::ChromeBrowser;
use crate::stats;
use crate::store::Store;
use crate::sync::SyncEngine;

/// Run one sync round and print the report.
pub async fn sync(ctx: &AppContext) -> Result<()> {
    let browser = ChromeBrowser::new(ctx.config.scraper.clone()).await?;
    let mut engine = SyncEngine::new(
        browser,
        ctx.store.clone(),
        ctx.config.scraper.clone(),
        ctx.config.sync.clone(),
    );

    let report = engine.run_once().await?;
    println!(
        "Sync complete: {} new URLs, {} added, {} failed",
        report.processed, report.added, report.failed
    );
    Ok(())
}

/// Serve the HTTP API, with the sync loop in a background task unless
/// disabled.
pub async fn serve(ctx: Arc<AppContext>, addr: Option<String>, no_sync: bool) -> Result<()> {
    if !no_sync {
        let browser = ChromeBrowser::new(ctx.config.scraper.clone()).await?;
        let mut engine = SyncEngine::new(
            browser,
            ctx.store.clone(),
            ctx.config.scraper.clone(),
            ctx.config.sync.clone(),
        );
        tokio::spawn(async move {
            engine.run_forever().await;
        });
    }

    let state = ApiState {
        store: ctx.store.clone(),
    };
    let addr = addr.unwrap_or_else(|| ctx.config.api.addr.clone());
    api::serve(state, &addr).await
}

pub fn stats(ctx: &AppContext) -> Result<()> {
    let tokens = ctx.store.all_tokens()?;
    let totals = stats::totals(&tokens, Local::now().naive_local());

    println!("Creators:         {}", totals.total_creators);
    println!("Tokens:           {}", totals.total_tokens);
    println!(
        "Total market cap: {}",
        export::format_market_cap(totals.total_market_cap)
    );
    println!("New in last 24h:  {}", totals.new_today);
    Ok(())
}

pub fn creators(ctx: &AppContext, sort_by: SortKey, order: Order) -> Result<()> {
    let tokens = ctx.store.all_tokens()?;
    let mut summaries = stats::creator_summaries(&tokens);
    stats::sort_creators(&mut summaries, sort_by.into(), order.into());

    if summaries.is_empty() {
        println!("No creators");
        return Ok(());
    }

    for summary in summaries {
        println!(
            "{} ({} tokens, {}, {} replies)\n  {}",
            summary.name.as_deref().unwrap_or("(unknown)"),
            summary.token_count,
            export::format_market_cap(summary.total_market_cap),
            summary.total_replies,
            summary.address
        );
    }
    Ok(())
}

pub fn tokens(ctx: &AppContext) -> Result<()> {
    let tokens = ctx.store.all_tokens()?;

    if tokens.is_empty() {
        println!("No tokens");
        return Ok(());
    }

    for token in tokens {
        let cap = token
            .market_cap
            .map(export::format_market_cap)
            .unwrap_or_else(|| "-".into());
        println!(
            "{} ({}) {} {}\n  {}",
            token.name,
            token.display_ticker(),
            cap,
            token.display_created_at(),
            token.url
        );
    }
    Ok(())
}

pub fn export_report(
    ctx: &AppContext,
    target: ExportTarget,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let tokens = ctx.store.all_tokens()?;
    let mut buffer: Vec<u8> = Vec::new();

    match (target, format) {
        (ExportTarget::Tokens, ExportFormat::Csv) => {
            export::write_tokens_csv(&mut buffer, &tokens)?;
        }
        (ExportTarget::Tokens, ExportFormat::Html) => {
            return Err(FomoError::Config(
                "HTML export is only available for creators".into(),
            ));
        }
        (ExportTarget::Creators, ExportFormat::Csv) => {
            let summaries = stats::creator_summaries(&tokens);
            export::write_creators_csv(&mut buffer, &summaries, &tokens)?;
        }
        (ExportTarget::Creators, ExportFormat::Html) => {
            let summaries = stats::creator_summaries(&tokens);
            export::write_creators_html(&mut buffer, &summaries, &tokens)?;
        }
    }

    match output {
        Some(path) => {
            fs::write(path, &buffer)?;
            println!("Wrote {}", path.display());
        }
        None => std::io::stdout().write_all(&buffer)?,
    }
    Ok(())
}
