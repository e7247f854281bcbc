use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fomoscan::app::AppContext;
use fomoscan::cli::{commands, Cli, Commands, DaemonAction};
use fomoscan::config::Config;
use fomoscan::daemon::{self, Daemon, DaemonConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Sync => {
            commands::sync(&ctx).await?;
        }
        Commands::Serve { addr, no_sync } => {
            commands::serve(Arc::new(ctx), addr, no_sync).await?;
        }
        Commands::Stats => {
            commands::stats(&ctx)?;
        }
        Commands::Creators { sort_by, order } => {
            commands::creators(&ctx, sort_by, order)?;
        }
        Commands::Tokens => {
            commands::tokens(&ctx)?;
        }
        Commands::Export {
            target,
            format,
            output,
        } => {
            commands::export_report(&ctx, target, format, output.as_deref())?;
        }
        Commands::Daemon { action } => match action {
            DaemonAction::Start {
                interval,
                no_initial_sync,
                log,
            } => {
                let secs = DaemonConfig::parse_interval(&interval)
                    .map_err(|e| anyhow::anyhow!("{}", e))?;
                let daemon_config = DaemonConfig {
                    sync_interval_secs: secs,
                    sync_on_start: !no_initial_sync,
                    log_file: log,
                };
                Daemon::new(Arc::new(ctx), daemon_config).run().await?;
            }
            DaemonAction::Stop => match daemon::stop_daemon() {
                Ok(()) => println!("Daemon stopped"),
                Err(e) => eprintln!("{}", e),
            },
            DaemonAction::Status => {
                println!("{}", daemon::daemon_status());
            }
        },
    }

    Ok(())
}
