// Copyright 2026 Leasehawk Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leasehawk::config::Config;
use leasehawk::counters::CounterStore;
use leasehawk::feed::feed_for;
use leasehawk::renderer::chromium::ChromiumDriver;
use leasehawk::renderer::{DriverFactory, UiDriver};
use leasehawk::supervisor::{run_saturation, Monitor};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "leasehawk",
    about = "Leasehawk — unattended used-aircraft lease acquisition",
    version
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Continuously serve every configured airframe type round-robin on one
    /// session, refreshing the session and the rules feed on their intervals
    Monitor,
    /// Race one quota-bounded worker per airframe type, each with its own
    /// session, until every quota is met
    Saturation,
}

/// Launches one headless Chromium per session.
struct ChromiumFactory {
    wait_timeout: Duration,
}

#[async_trait::async_trait]
impl DriverFactory for ChromiumFactory {
    async fn connect(&self) -> Result<Box<dyn UiDriver>> {
        let driver = ChromiumDriver::launch(self.wait_timeout).await?;
        Ok(Box::new(driver))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "leasehawk=debug" } else { "leasehawk=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse().context("invalid log directive")?),
        )
        .init();

    let cfg = Config::from_env()?;
    info!("starting leasehawk v{}", env!("CARGO_PKG_VERSION"));

    let feed = feed_for(&cfg.feed);
    match cli.command {
        Commands::Monitor => {
            let counters = CounterStore::load(&cfg.counter_path)?;
            let factory = Box::new(ChromiumFactory {
                wait_timeout: cfg.wait_timeout,
            });
            Monitor::new(cfg, factory, feed, counters).run().await
        }
        Commands::Saturation => {
            let factory = Arc::new(ChromiumFactory {
                wait_timeout: cfg.wait_timeout,
            });
            run_saturation(cfg, factory, feed).await
        }
    }
}
