#![doc = include_str!("../README.md")]

mod cli;

use clap::Parser;
use cli::config::{CliArgs, SortConfig};
use cli::display::report;
use cli::items::generate_items;
use cli::signal::interrupt_on_signal;
use cli::telemetry::{init_tracing, spawn_progress};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

// Thousands of sleeper tasks allocate and free small buffers concurrently.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = SortConfig::try_from(args)?;

    init_tracing();
    log_startup_info(&config);

    println!("{}", config.banner());

    let items = generate_items(config.items, config.max_value, config.seed);
    let sorter = config.sorter();

    let interrupt = CancellationToken::new();
    let signals = tokio::spawn(interrupt_on_signal(interrupt.clone()));
    let done = CancellationToken::new();
    let progress = spawn_progress(done.clone());

    let results = sorter.stream_sort(&items, interrupt);
    let mut stdout = std::io::stdout().lock();
    let outcome = report(&mut stdout, &items, results).await;

    done.cancel();
    signals.abort();
    let _ = progress.await;

    let failure = outcome?;
    #[cfg(feature = "tracing")]
    match failure {
        Some(failure) => tracing::warn!("Sort did not finish: {}", failure),
        None => tracing::info!("Sort of {} items finished", items.len()),
    }

    if config.fails_process(failure) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn log_startup_info(_config: &SortConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting sleep sort with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting sleep sort of {} items with {:?}",
            _config.items,
            _config.command
        );
    }
}
