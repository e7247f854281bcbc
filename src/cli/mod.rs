pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "fomoscan")]
#[command(about = "Incremental scraper and API for the fomo.biz token listing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one sync round: discover, diff, extract, commit
    Sync,
    /// Serve the HTTP API with the sync loop running in the background
    Serve {
        /// Bind address (overrides the config file)
        #[arg(short, long)]
        addr: Option<String>,

        /// Serve the stored data only, without scraping
        #[arg(long)]
        no_sync: bool,
    },
    /// Print aggregate totals
    Stats,
    /// List creators with per-creator rollups
    Creators {
        /// Sort key
        #[arg(long, value_enum, default_value_t = SortKey::TokenCount)]
        sort_by: SortKey,

        /// Sort order
        #[arg(long, value_enum, default_value_t = Order::Desc)]
        order: Order,
    },
    /// List stored tokens
    Tokens,
    /// Write a report to a file or stdout
    Export {
        /// What to export
        #[arg(value_enum)]
        target: ExportTarget,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Background daemon for continuous synchronization
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Start the background daemon
    Start {
        /// Sync interval (e.g., "30s", "5m", "1h")
        #[arg(short, long, default_value = "30s")]
        interval: String,

        /// Skip the initial sync round on start
        #[arg(long)]
        no_initial_sync: bool,

        /// Log file path (default: stdout)
        #[arg(short, long)]
        log: Option<PathBuf>,
    },
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    TokenCount,
    TotalMarketCap,
    FirstTokenDate,
    LatestTokenDate,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportTarget {
    Tokens,
    Creators,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Html,
}

impl From<SortKey> for crate::stats::CreatorSort {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::TokenCount => Self::TokenCount,
            SortKey::TotalMarketCap => Self::TotalMarketCap,
            SortKey::FirstTokenDate => Self::FirstSeen,
            SortKey::LatestTokenDate => Self::LastSeen,
        }
    }
}

impl From<Order> for crate::stats::SortOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => Self::Asc,
            Order::Desc => Self::Desc,
        }
    }
}
