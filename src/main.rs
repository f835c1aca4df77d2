//! # Jubilee
//!
//! Consent-gated Discord birthday bot: records birthdates only after an
//! explicit reaction consent, announces same-day and next-day birthdays
//! after local midnight, and rotates the bot's presence.
//!
//! Usage:
//!   jubilee run                         # start the bot
//!   jubilee check                       # validate config and store, then exit
//!   jubilee run -c /path/config.toml    # explicit config file

mod bot;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use jubilee_core::Config;
use jubilee_gateway::{DiscordConfig, DiscordPlatform};
use jubilee_store::{BirthdayStore, SharedStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "jubilee",
    version,
    about = "🎂 Jubilee — consent-gated Discord birthday bot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and run the bot
    Run,
    /// Validate configuration and the birthday store, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "jubilee=debug,jubilee_core=debug,jubilee_consent=debug,jubilee_scheduler=debug,jubilee_gateway=debug"
    } else {
        "jubilee=info,jubilee_gateway=info,jubilee_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    // Startup fails fast: no config or unreadable store means no bot.
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let store = BirthdayStore::load(config.data_path()).context("opening birthday store")?;

    match cli.command {
        Commands::Check => {
            println!("config ok: {}", config_path.display());
            println!("store ok: {} ({} records)", store.path().display(), store.len());
            Ok(())
        }
        Commands::Run => run(config, store).await,
    }
}

async fn run(config: Config, store: BirthdayStore) -> Result<()> {
    let store: SharedStore = Arc::new(tokio::sync::Mutex::new(store));

    let platform = DiscordPlatform::new(DiscordConfig::new(
        config.bot_token.clone(),
        config.command_prefix.clone(),
    ))
    .context("building Discord client")?;

    // Verify the token before anything else; a bad token should exit, not
    // spin in the reconnect loop.
    let me = platform.identify_self().await.context("Discord login")?;
    tracing::info!("logged in as {} ({})", me.username, me.id);

    let mut events = platform.start_gateway();
    let bot = bot::Bot::new(Arc::new(platform), store, config);

    while let Some(event) = events.next().await {
        bot.handle_event(event).await;
    }

    tracing::info!("event stream ended, shutting down");
    Ok(())
}
