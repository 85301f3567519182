//! Console front end for the crypto price service
//!
//! Stands in for the chat layer: reads commands from stdin and prints the
//! replies a chat handler would send.

use crypto_price_sdk::{BotConfig, PriceAggregator, RefreshScheduler};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const HELP: &str = "Commands: /prices, /refresh, /status, /help, /quit";

enum Command {
    Prices,
    Refresh,
    Status,
    Help,
    Quit,
    Unknown,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let cmd = match line.trim() {
            "" => return None,
            "/prices" | "/start" | "prices" => Command::Prices,
            "/refresh" | "refresh" => Command::Refresh,
            "/status" | "status" => Command::Status,
            "/help" | "help" => Command::Help,
            "/quit" | "quit" | "exit" => Command::Quit,
            _ => Command::Unknown,
        };
        Some(cmd)
    }
}

async fn reply(aggregator: &PriceAggregator, command: Command) -> Option<String> {
    let text = match command {
        Command::Prices => aggregator.formatted_report().await,
        Command::Refresh => aggregator.refreshed_report().await,
        Command::Status => {
            let health = aggregator.health_check().await;
            serde_json::to_string_pretty(&health).unwrap_or_else(|e| e.to_string())
        }
        Command::Help | Command::Unknown => HELP.to_string(),
        Command::Quit => return None,
    };
    Some(text)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    let price_config = config.price_config();

    let aggregator = Arc::new(PriceAggregator::from_config(price_config).await?);
    let scheduler = RefreshScheduler::spawn(aggregator.clone(), price_config.refresh_interval);

    tracing::info!(assets = aggregator.assets().len(), "Bot started");
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(command) = Command::parse(&line) else { continue };
                match reply(&aggregator, command).await {
                    Some(text) => println!("{}\n", text),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    scheduler.shutdown().await;
    tracing::info!("Bot stopped");
    Ok(())
}
