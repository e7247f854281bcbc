//! # fomoscan
//!
//! An incremental scraper, store and API for the fomo.biz token listing.
//!
//! ## Architecture
//!
//! ```text
//! Discover → Diff → Extract → Store → Stats / API / Export
//! ```
//!
//! - [`scraper`]: headless-Chrome discovery and extraction
//! - [`sync`]: the round loop tying discovery, extraction and the store together
//! - [`store`]: SQLite persistence with the sync ledger
//! - [`stats`]: pure aggregation over stored tokens
//! - [`api`]: HTTP endpoints over the aggregates
//!
//! ## Quick Start
//!
//! ```bash
//! # Run one sync round
//! fomoscan sync
//!
//! # Serve the API with background syncing
//! fomoscan serve
//!
//! # Aggregates
//! fomoscan stats
//! fomoscan creators --sort-by total-market-cap
//!
//! # Reports
//! fomoscan export creators --format html --output report.html
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together configuration
/// and the store.
pub mod app;

/// HTTP API over the stored token set.
///
/// - `GET /api/v1/stats` - aggregate totals
/// - `GET /api/v1/creators` - per-creator rollups
/// - `GET /api/v1/tokens` - all stored tokens
/// - `GET /api/v1/stats/history` - cumulative daily history
pub mod api;

/// Command-line interface using clap.
///
/// - `sync` - run one sync round
/// - `serve` - API plus background sync loop
/// - `stats` / `creators` / `tokens` - read the store
/// - `export` - CSV/HTML reports
/// - `daemon start|stop|status` - background synchronization
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/fomoscan/config.toml`; a commented default file
/// is created on first run.
pub mod config;

/// Background daemon for continuous synchronization.
pub mod daemon;

/// Core domain models.
///
/// - [`TokenRecord`](domain::TokenRecord): a synchronized token
/// - [`TokenExtract`](domain::TokenExtract): raw per-page extraction output
/// - [`CreatorSummary`](domain::CreatorSummary): per-creator rollup
pub mod domain;

/// CSV and HTML report writers.
pub mod export;

/// Browser automation: listing discovery and token-page extraction.
///
/// - [`Browser`](scraper::Browser): narrow async session contract
/// - [`ChromeBrowser`](scraper::ChromeBrowser): chromiumoxide implementation
/// - [`LinkDiscoverer`](scraper::LinkDiscoverer): infinite-scroll URL discovery
/// - [`TokenExtractor`](scraper::TokenExtractor): detail-page extraction
pub mod scraper;

/// Pure aggregation over stored tokens.
pub mod stats;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// The incremental synchronization pipeline.
pub mod sync;
