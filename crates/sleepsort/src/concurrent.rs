use crate::{
    DEFAULT_UNIT, Error, Item, Round, SleepSort, SortStream, StreamSorter, StreamedResult,
    stream::RESULT_BUFFER,
};
use core::time::Duration;
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;

/// Number of extra doubling rounds launched by [`ConcurrentSleepSort::default`].
pub const DEFAULT_MAX_ROUNDS: u32 = 7;

/// Races every round of a sort at once and stops the stragglers as soon as two
/// consecutive arrivals agree.
///
/// `max_rounds + 1` rounds are launched together, with the multipliers from
/// [`multipliers`]. Rounds are compared in the order they *finish*, not the
/// order they were launched. Each arrival is streamed as a
/// [`StreamedResult`]; the first arrival equal to the one before it ends the
/// stream and aborts every round still sleeping. If the rounds run out first,
/// the last result carries [`Error::SortFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrentSleepSort {
    max_rounds: u32,
    unit: Duration,
}

impl Default for ConcurrentSleepSort {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROUNDS)
    }
}

impl ConcurrentSleepSort {
    pub const fn new(max_rounds: u32) -> Self {
        Self {
            max_rounds,
            unit: DEFAULT_UNIT,
        }
    }

    #[must_use]
    pub const fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub const fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub const fn unit(&self) -> Duration {
        self.unit
    }
}

/// Delay multipliers of every round launched for `max_rounds`, in launch
/// order.
///
/// Round 0 runs at 1 and rounds `1..=max_rounds` run at 1, 2, 4, ..., so the
/// multiplier 1 appears twice. Multipliers saturate at `u64::MAX`.
pub fn multipliers(max_rounds: u32) -> Vec<u64> {
    let mut multipliers = Vec::with_capacity(max_rounds as usize + 1);
    multipliers.push(1);

    let mut multiplier: u64 = 1;
    for _ in 0..max_rounds {
        multipliers.push(multiplier);
        multiplier = multiplier.saturating_mul(2);
    }

    multipliers
}

impl StreamSorter for ConcurrentSleepSort {
    fn launch(&self, list: &[Item]) -> SortStream {
        let stop = CancellationToken::new();

        // Full fan-out: every round starts sleeping right away.
        let rounds: Vec<Round> = multipliers(self.max_rounds)
            .into_iter()
            .map(|multiplier| SleepSort::new(multiplier).with_unit(self.unit).sort(list))
            .collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Launched {} concurrent rounds over {} items",
            rounds.len(),
            list.len()
        );

        let (merged_tx, merged_rx) = mpsc::channel(1);
        let (results_tx, results_rx) = mpsc::channel(RESULT_BUFFER);

        tokio::spawn(merge_rounds(rounds, merged_tx, stop.clone()));
        tokio::spawn(stream_results(merged_rx, results_tx, stop.clone()));

        SortStream::new(results_rx, stop)
    }
}

/// Visits every round in launch order and either forwards its result or, once
/// a global stop has been requested, retires it without forwarding. Closes
/// `merged` after the last round is retired.
async fn merge_rounds(
    rounds: Vec<Round>,
    merged: mpsc::Sender<Vec<Item>>,
    stop: CancellationToken,
) {
    for (_index, mut round) in rounds.into_iter().enumerate() {
        let gathered = tokio::select! {
            biased;
            () = stop.cancelled() => None,
            gathered = &mut round => Some(gathered),
        };

        let Some(gathered) = gathered else {
            #[cfg(feature = "tracing")]
            tracing::debug!("Aborting round {_index} (x{})", round.multiplier());
            round.retire().await;
            continue;
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Forwarding round {_index} (x{})", round.multiplier());

        let forwarded = tokio::select! {
            biased;
            () = stop.cancelled() => false,
            sent = merged.send(gathered) => sent.is_ok(),
        };

        if !forwarded {
            // Either stopped mid-send or nobody is listening anymore; both
            // mean the remaining rounds must be retired.
            stop.cancel();
        }
    }
}

/// Compares each arrival with the one before it and streams one result per
/// arrival until two agree, the merge runs dry, or the sort is stopped.
async fn stream_results(
    mut merged: mpsc::Receiver<Vec<Item>>,
    results: mpsc::Sender<StreamedResult>,
    stop: CancellationToken,
) {
    let mut round: u32 = 1;
    let mut begin = Instant::now();

    let Some(mut previous) = merged.recv().await else {
        let snapshot = StreamedResult::new(
            round,
            begin,
            Instant::now(),
            &[],
            &[],
            Some(terminal_failure(&stop)),
        );
        let _ = results.send(snapshot).await;
        return;
    };

    loop {
        let Some(current) = merged.recv().await else {
            let snapshot = StreamedResult::new(
                round,
                begin,
                Instant::now(),
                &previous,
                &[],
                Some(terminal_failure(&stop)),
            );
            let _ = results.send(snapshot).await;
            return;
        };
        let end = Instant::now();

        if stop.is_cancelled() {
            let snapshot = StreamedResult::new(
                round,
                begin,
                end,
                &previous,
                &current,
                Some(Error::Cancelled),
            );
            let _ = results.send(snapshot).await;
            drain(&mut merged).await;
            return;
        }

        let snapshot = StreamedResult::new(round, begin, end, &previous, &current, None);

        if previous == current {
            #[cfg(feature = "tracing")]
            tracing::debug!("Converged on round {round}, stopping remaining rounds");

            stop.cancel();
            let _ = results.send(snapshot).await;
            drain(&mut merged).await;
            return;
        }

        if results.send(snapshot).await.is_err() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Result consumer went away on round {round}");

            stop.cancel();
            drain(&mut merged).await;
            return;
        }

        previous = current;
        round += 1;
        begin = Instant::now();
    }
}

fn terminal_failure(stop: &CancellationToken) -> Error {
    if stop.is_cancelled() {
        Error::Cancelled
    } else {
        Error::SortFailed
    }
}

/// Waits for the merge to retire every round and close.
async fn drain(merged: &mut mpsc::Receiver<Vec<Item>>) {
    while merged.recv().await.is_some() {}
}
