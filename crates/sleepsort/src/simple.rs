use crate::{
    DEFAULT_UNIT, Item, SleepSort, SortStream, StreamSorter, StreamedResult,
    stream::RESULT_BUFFER,
};
use core::time::Duration;
use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;

/// A single multiplier-1 pass with no stop support.
///
/// Once started, every sleeper runs to completion. As a [`StreamSorter`] it
/// emits exactly one round-1 result whose previous sequence is empty, and it
/// ignores stop requests: a bridge interrupt still waits for the pass to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleSleepSort {
    unit: Duration,
}

impl Default for SimpleSleepSort {
    fn default() -> Self {
        Self { unit: DEFAULT_UNIT }
    }
}

impl SimpleSleepSort {
    #[must_use]
    pub const fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Sleep sorts `list` and returns the items in arrival order.
    pub async fn sort(&self, list: &[Item]) -> Vec<Item> {
        let pass = SleepSort::new(1).with_unit(self.unit);
        let (tx, mut rx) = mpsc::channel(list.len().max(1));
        let start = Instant::now();

        for &item in list {
            let tx = tx.clone();
            let deadline = start + pass.delay_for(item);
            tokio::spawn(async move {
                sleep_until(deadline).await;
                let _ = tx.send(item).await;
            });
        }
        drop(tx);

        let mut sorted = Vec::with_capacity(list.len());
        while let Some(item) = rx.recv().await {
            sorted.push(item);
        }
        sorted
    }
}

impl StreamSorter for SimpleSleepSort {
    fn launch(&self, list: &[Item]) -> SortStream {
        let (results_tx, results_rx) = mpsc::channel(RESULT_BUFFER);
        let simple = *self;
        let list = list.to_vec();

        tokio::spawn(async move {
            let begin = Instant::now();
            let sorted = simple.sort(&list).await;
            let snapshot = StreamedResult::new(1, begin, Instant::now(), &[], &sorted, None);
            let _ = results_tx.send(snapshot).await;
        });

        // Nothing observes this token.
        SortStream::new(results_rx, CancellationToken::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test(start_paused = true)]
    async fn sorts_in_a_single_pass() {
        let sorted = SimpleSleepSort::default().sort(&[3, 1, 2]).await;
        assert_eq!(sorted, vec![1, 2, 3]);
        assert!(SimpleSleepSort::default().sort(&[]).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn streams_exactly_one_round() {
        let results: Vec<_> = SimpleSleepSort::default()
            .launch(&[20, 10])
            .collect()
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].round(), 1);
        assert!(results[0].previous().is_empty());
        assert_eq!(results[0].current(), &[10, 20]);
        assert_eq!(results[0].failure(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_does_not_shorten_the_pass() {
        let mut sorted = SimpleSleepSort::default().launch(&[30, 10, 20]);
        sorted.stop();

        let last = sorted.drain().await.unwrap();
        assert_eq!(last.current(), &[10, 20, 30]);
        assert_eq!(last.failure(), None);
    }
}
