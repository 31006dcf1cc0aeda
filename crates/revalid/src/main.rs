//! revalid - Entry Point
//!
//! Operational helper around the library:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `revalid providers` | List registered cache and event providers |
//! | `revalid config` | Print the effective configuration as TOML |
//! | `revalid check` | Build a client from configuration and run a round trip |

// Force-link revalid-providers to ensure linkme registrations are included
extern crate revalid_providers;

use anyhow::Context;
use clap::{Parser, Subcommand};
use revalid::application::registry::{list_cache_providers, list_event_providers};
use revalid::infrastructure::ConfigLoader;
use revalid::{QueryKey, init_from_config};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Command line interface for revalid
#[derive(Parser, Debug)]
#[command(name = "revalid")]
#[command(about = "revalid - Stale-while-revalidate query cache")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered providers
    Providers,
    /// Print the effective configuration
    Config,
    /// Build a client and verify a cache round trip
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Providers => {
            println!("Cache providers:");
            for (name, description) in list_cache_providers() {
                println!("  {name:<8} {description}");
            }
            println!("Event providers:");
            for (name, description) in list_event_providers() {
                println!("  {name:<8} {description}");
            }
        }
        Command::Config => {
            let mut loader = ConfigLoader::new();
            if let Some(path) = &cli.config {
                loader = loader.with_config_path(path);
            }
            let config = loader.load().context("loading configuration")?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Command::Check => {
            let (config, client) = init_from_config(cli.config.as_deref()).await?;
            let ct = CancellationToken::new();
            let key = QueryKey::from(["revalid", "check"]);
            let options = config.query.to_query_options();
            client
                .set_query_data(&key, &client.instance_id().to_string(), None, &ct)
                .await?;
            let echoed = client
                .get_query_data::<String>(&key, &ct)
                .await?
                .and_then(|result| result.into_data());
            client
                .refetch_queries(revalid::QueryTarget::exact(key.clone()), &ct)
                .await?;
            client.shutdown().await;
            anyhow::ensure!(
                echoed.as_deref() == Some(client.instance_id()),
                "cache round trip returned {echoed:?}"
            );
            println!(
                "ok: instance {} (cache: {}, events: {}, stale after {:?})",
                client.instance_id(),
                config.cache.provider,
                if config.events.enabled { config.events.provider.as_str() } else { "none" },
                options.stale_time
            );
        }
    }
    Ok(())
}
