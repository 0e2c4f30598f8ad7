use tokio_util::sync::CancellationToken;

/// Initializes structured logging on stderr using `tracing-subscriber`.
///
/// Stdout is reserved for the sort report. Defaults to `warn` unless
/// `RUST_LOG` says otherwise. This is a no-op if the `tracing` feature is
/// disabled.
pub fn init_tracing() {
    #[cfg(feature = "tracing")]
    {
        use tracing_subscriber::fmt::format::FmtSpan;
        use tracing_subscriber::{EnvFilter, fmt};

        fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE)
            .with_target(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(fmt::time::ChronoLocal::rfc_3339())
            .pretty()
            .init();
    }
}

/// Logs the number of live sleepers once per second until `done` fires.
#[cfg(feature = "tracing")]
pub fn spawn_progress(done: CancellationToken) -> tokio::task::JoinHandle<()> {
    use core::time::Duration;
    use tokio::time::{MissedTickBehavior, interval};

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = done.cancelled() => break,
                _ = ticker.tick() => {
                    tracing::debug!(sleepers = sleepsort::sleepers_in_flight(), "Sleepers in flight");
                }
            }
        }
    })
}

#[cfg(not(feature = "tracing"))]
pub fn spawn_progress(done: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { done.cancelled().await })
}
