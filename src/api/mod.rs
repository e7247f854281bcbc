//! HTTP API exposing the stored token set and its aggregates.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::app::{FomoError, Result};
use crate::domain::{CreatorSummary, DailyStats, TokenRecord, Totals};
use crate::stats::{self, CreatorSort, SortOrder};
use crate::store::{SqliteStore, Store};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address for the HTTP server.
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<SqliteStore>,
}

#[derive(Deserialize)]
pub struct CreatorsQuery {
    sort_by: Option<String>,
    order: Option<String>,
}

/// Creator rollup in its public wire shape.
#[derive(Serialize, Debug)]
struct ApiCreator {
    creator_address: String,
    creator_name: Option<String>,
    creator_avatar_url: Option<String>,
    token_count: usize,
    total_market_cap: f64,
    total_replies: i64,
    first_token_date: Option<String>,
    latest_token_date: Option<String>,
}

const API_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl From<CreatorSummary> for ApiCreator {
    fn from(summary: CreatorSummary) -> Self {
        let fmt = |dt: NaiveDateTime| dt.format(API_DATE_FORMAT).to_string();
        Self {
            creator_address: summary.address,
            creator_name: summary.name,
            creator_avatar_url: summary.avatar_url,
            token_count: summary.token_count,
            total_market_cap: summary.total_market_cap,
            total_replies: summary.total_replies,
            first_token_date: summary.first_seen.map(fmt),
            latest_token_date: summary.last_seen.map(fmt),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/creators", get(get_creators))
        .route("/api/v1/tokens", get(get_tokens))
        .route("/api/v1/stats/history", get(get_history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
pub async fn serve(state: ApiState, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr, "API listening");
    axum::serve(listener, router(state))
        .await
        .map_err(|e| FomoError::Other(format!("API server error: {}", e)))?;
    Ok(())
}

fn internal(e: FomoError) -> StatusCode {
    warn!(error = %e, "API query failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn get_stats(State(state): State<ApiState>) -> std::result::Result<Json<Totals>, StatusCode> {
    let tokens = state.store.all_tokens().map_err(internal)?;
    Ok(Json(stats::totals(&tokens, Local::now().naive_local())))
}

async fn get_creators(
    State(state): State<ApiState>,
    Query(query): Query<CreatorsQuery>,
) -> std::result::Result<Json<Vec<ApiCreator>>, (StatusCode, String)> {
    let sort = match query.sort_by.as_deref() {
        None => CreatorSort::TokenCount,
        Some(key) => CreatorSort::parse(key)
            .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("unknown sort key: {}", key)))?,
    };
    let order = match query.order.as_deref() {
        None | Some("desc") => SortOrder::Desc,
        Some("asc") => SortOrder::Asc,
        Some(other) => {
            return Err((StatusCode::BAD_REQUEST, format!("unknown order: {}", other)));
        }
    };

    let tokens = state
        .store
        .all_tokens()
        .map_err(|e| (internal(e), String::new()))?;
    let mut summaries = stats::creator_summaries(&tokens);
    stats::sort_creators(&mut summaries, sort, order);

    Ok(Json(summaries.into_iter().map(ApiCreator::from).collect()))
}

async fn get_tokens(
    State(state): State<ApiState>,
) -> std::result::Result<Json<Vec<TokenRecord>>, StatusCode> {
    let tokens = state.store.all_tokens().map_err(internal)?;
    Ok(Json(tokens))
}

async fn get_history(
    State(state): State<ApiState>,
) -> std::result::Result<Json<Vec<DailyStats>>, StatusCode> {
    let tokens = state.store.all_tokens().map_err(internal)?;
    Ok(Json(stats::daily_history(&tokens)))
}
