//! Command-line interface for ledsync.
//!
//! Reads, writes and watches the shared LED state of a running daemon via
//! the HTTP API. `watch` behaves like a polling device: it fetches the state
//! at a fixed interval and prints it whenever the revision changes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

use ledsync::api_client::Client;
use ledsync::store::StateRecord;
use ledsync::tracing::{self, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "ledsync-cli", version, about = "Control a ledsync server")]
struct Cli {
    /// Base URL of the server
    #[arg(long, env = "LEDSYNC_URL", default_value = "http://127.0.0.1:5000")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the current state
    Get,
    /// Set the color (#RRGGBB) and number of lit LEDs
    Set { color: String, count: u8 },
    /// Poll the state and print every new revision
    Watch {
        /// Polling interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Check that the server is up
    Health,
}

fn print_state(state: &StateRecord) {
    println!(
        "rev {}: color {} count {} (updated {})",
        state.rev, state.color, state.count, state.updated_at
    );
}

async fn watch(client: &Client, interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_rev = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }

        match client.state().await {
            Ok(state) if last_rev != Some(state.rev) => {
                last_rev = Some(state.rev);
                print_state(&state);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Poll failed."),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing::init_journald_or_stdout(LevelFilter::WARN);

    let cli = Cli::parse();
    let client = Client::new(cli.url);

    match cli.command {
        Command::Get => print_state(&client.state().await?),
        Command::Set { color, count } => print_state(&client.set_state(&color, count).await?),
        Command::Watch { interval_ms } => {
            watch(&client, Duration::from_millis(interval_ms.max(1))).await?
        }
        Command::Health => {
            let health = client.health().await?;
            println!("{} at {}", health.status, health.time);
        }
    }

    Ok(())
}
