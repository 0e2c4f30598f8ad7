use crate::{Item, StreamedResult, bridge};
use core::{
    pin::Pin,
    task::{Context, Poll},
};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Capacity of every streamed-result channel. Producers run at most one
/// result ahead of their consumer.
pub(crate) const RESULT_BUFFER: usize = 1;

/// Lazy, non-restartable sequence of [`StreamedResult`]s produced by an
/// orchestrator, paired with the orchestrator's global stop signal.
///
/// The sequence ends once the orchestrator has retired every round it
/// launched. Stopping is idempotent; after a stop the sequence still has to be
/// read to its end to observe the shutdown completing. Dropping the stream
/// requests a stop.
#[derive(Debug)]
#[must_use = "an unread sort stream stalls its orchestrator"]
pub struct SortStream {
    results: mpsc::Receiver<StreamedResult>,
    stop: CancellationToken,
}

impl SortStream {
    pub(crate) const fn new(
        results: mpsc::Receiver<StreamedResult>,
        stop: CancellationToken,
    ) -> Self {
        Self { results, stop }
    }

    /// Receives the next result, or `None` once the orchestrator is done.
    pub async fn next_result(&mut self) -> Option<StreamedResult> {
        self.results.recv().await
    }

    /// Requests a global stop of every round still in flight.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Reads the sequence to its end and returns the last result seen.
    pub async fn drain(&mut self) -> Option<StreamedResult> {
        let mut last = None;
        while let Some(result) = self.results.recv().await {
            last = Some(result);
        }
        last
    }
}

impl Stream for SortStream {
    type Item = StreamedResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().results.poll_recv(cx)
    }
}

impl Drop for SortStream {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Shared contract of every sleep-sort variant.
pub trait StreamSorter {
    /// Starts sorting a private copy of `list` and returns the raw result
    /// stream. Must be called from within a Tokio runtime.
    fn launch(&self, list: &[Item]) -> SortStream;

    /// Starts sorting `list` behind a [`bridge`]: cancelling `interrupt`
    /// shuts every round down and ends the stream with a result tagged
    /// [`crate::Error::Cancelled`].
    fn stream_sort(
        &self,
        list: &[Item],
        interrupt: CancellationToken,
    ) -> ReceiverStream<StreamedResult> {
        bridge(self.launch(list), interrupt)
    }
}
