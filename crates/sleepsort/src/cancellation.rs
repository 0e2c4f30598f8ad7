//! Interrupt handling layered over an orchestrator's result stream.
//!
//! The core never registers process-wide signal handlers. Callers inject a
//! [`CancellationToken`] instead, and the CLI cancels it from its Ctrl+C and
//! SIGTERM handlers. Tests cancel it directly.

use crate::{Error, SortStream, StreamedResult, stream::RESULT_BUFFER};
use tokio::{sync::mpsc, time::Instant};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Forwards `sorted` unchanged until `interrupt` fires.
///
/// On interrupt the bridge stops listening, requests the orchestrator's
/// global stop, drains the orchestrator until it has retired every round, and
/// then emits one final result tagged [`Error::Cancelled`] before closing.
/// That final result repeats the latest round seen (forwarded or drained), or
/// is an empty round 1 if nothing had arrived yet.
///
/// If the returned stream is dropped, the orchestrator is stopped and drained
/// in the background.
///
/// Must be called from within a Tokio runtime.
pub fn bridge(sorted: SortStream, interrupt: CancellationToken) -> ReceiverStream<StreamedResult> {
    let (tx, rx) = mpsc::channel(RESULT_BUFFER);
    tokio::spawn(forward(sorted, interrupt, tx));
    ReceiverStream::new(rx)
}

async fn forward(
    mut sorted: SortStream,
    interrupt: CancellationToken,
    tx: mpsc::Sender<StreamedResult>,
) {
    let started = Instant::now();
    let mut last: Option<StreamedResult> = None;

    loop {
        let next = tokio::select! {
            biased;
            () = interrupt.cancelled() => break,
            next = sorted.next_result() => next,
        };

        let Some(result) = next else {
            return;
        };
        last = Some(result.clone());

        let sent = tokio::select! {
            biased;
            () = interrupt.cancelled() => break,
            sent = tx.send(result) => sent,
        };

        if sent.is_err() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Result consumer went away, stopping sort");
            sorted.stop();
            sorted.drain().await;
            return;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Interrupt received, stopping all rounds");

    sorted.stop();
    if let Some(drained) = sorted.drain().await {
        last = Some(drained);
    }

    let end = Instant::now();
    let cancelled = match last {
        Some(result) => result.with_failure(Error::Cancelled, end),
        None => StreamedResult::new(1, started, end, &[], &[], Some(Error::Cancelled)),
    };

    if tx.send(cancelled).await.is_err() {
        #[cfg(feature = "tracing")]
        tracing::debug!("Result consumer went away before cancellation was reported");
    }
}
