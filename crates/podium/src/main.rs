// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use podium_config::PodiumConfig;
use podium_core::{PaymentProcessor, PodiumError};
use podium_ledger::TokenEngine;
use podium_payments::HttpPaymentProcessor;
use tracing::{error, info};

use crate::commands::Commands;

/// Podium: token ledger and content entitlements for a sports social platform.
#[derive(Parser, Debug)]
#[command(name = "podium", version, about)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => podium_config::load_and_validate_path(path),
        None => podium_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            podium_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.app.log_level);

    let engine = match open_engine(&config).await {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "failed to open token engine");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    match commands::run(&engine, cli.command).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("error: failed to render output: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("{}", commands::error_json(&e));
            std::process::exit(commands::exit_code(&e));
        }
    }
}

/// The HTTP processor is only wired when an API key is configured;
/// checkout commands fail with a configuration error otherwise.
async fn open_engine(config: &PodiumConfig) -> Result<TokenEngine, PodiumError> {
    let processor: Option<Arc<dyn PaymentProcessor>> = match config.payments.api_key {
        Some(_) => {
            let processor = HttpPaymentProcessor::new(&config.payments)?;
            Some(Arc::new(processor) as Arc<dyn PaymentProcessor>)
        }
        None => {
            info!("no payments.api_key configured, checkout disabled");
            None
        }
    };
    TokenEngine::open(config, processor).await
}

/// Initialize the tracing subscriber with an env-filter.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("podium={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
