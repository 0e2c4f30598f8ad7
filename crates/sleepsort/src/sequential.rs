use crate::{
    DEFAULT_UNIT, Error, Item, Result, Round, SleepSort, SortStream, StreamSorter,
    StreamedResult, stream::RESULT_BUFFER,
};
use core::time::Duration;
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;

/// Runs one round at a time, doubling the multiplier each round, until a round
/// reproduces the one before it.
///
/// The first round races two passes at multiplier 1 against each other: the
/// first to finish becomes the previous result and the other the current one,
/// so a single noisy pass cannot end the sort on its own. Every later round
/// sorts the best order known so far.
///
/// The only failure this variant reports is [`Error::Cancelled`]; without a
/// stop it keeps going until it converges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialSleepSort {
    unit: Duration,
}

impl Default for SequentialSleepSort {
    fn default() -> Self {
        Self { unit: DEFAULT_UNIT }
    }
}

impl SequentialSleepSort {
    #[must_use]
    pub const fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub const fn unit(&self) -> Duration {
        self.unit
    }
}

impl StreamSorter for SequentialSleepSort {
    fn launch(&self, list: &[Item]) -> SortStream {
        let stop = CancellationToken::new();
        let (results_tx, results_rx) = mpsc::channel(RESULT_BUFFER);

        tokio::spawn(run_rounds(self.unit, list.to_vec(), results_tx, stop.clone()));

        SortStream::new(results_rx, stop)
    }
}

async fn run_rounds(
    unit: Duration,
    list: Vec<Item>,
    results: mpsc::Sender<StreamedResult>,
    stop: CancellationToken,
) {
    let mut round: u32 = 1;
    let mut begin = Instant::now();

    let (mut previous, mut current) = match initial_round(&list, unit, &stop).await {
        Ok(pair) => pair,
        Err(failure) => {
            let snapshot =
                StreamedResult::new(round, begin, Instant::now(), &[], &[], Some(failure));
            let _ = results.send(snapshot).await;
            return;
        }
    };

    let snapshot = StreamedResult::new(round, begin, Instant::now(), &previous, &current, None);
    if results.send(snapshot).await.is_err() {
        return;
    }

    let mut multiplier: u64 = 1;
    while previous != current {
        previous = current;
        round += 1;
        multiplier = multiplier.saturating_mul(2);
        begin = Instant::now();

        #[cfg(feature = "tracing")]
        tracing::trace!("Starting sequential round {round} (x{multiplier})");

        let next = SleepSort::new(multiplier).with_unit(unit).sort(&previous);
        current = match await_round(next, &stop).await {
            Ok(gathered) => gathered,
            Err(failure) => {
                let snapshot = StreamedResult::new(
                    round,
                    begin,
                    Instant::now(),
                    &previous,
                    &[],
                    Some(failure),
                );
                let _ = results.send(snapshot).await;
                return;
            }
        };

        let snapshot =
            StreamedResult::new(round, begin, Instant::now(), &previous, &current, None);
        if results.send(snapshot).await.is_err() {
            return;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Converged on sequential round {round}");
}

/// Races two multiplier-1 passes and returns `(first_finished, second_finished)`.
async fn initial_round(
    list: &[Item],
    unit: Duration,
    stop: &CancellationToken,
) -> Result<(Vec<Item>, Vec<Item>)> {
    let sort = SleepSort::new(1).with_unit(unit);
    let mut left = sort.sort(list);
    let mut right = sort.sort(list);

    let (first, pending) = tokio::select! {
        biased;
        () = stop.cancelled() => {
            tokio::join!(left.retire(), right.retire());
            return Err(Error::Cancelled);
        }
        gathered = &mut left => (gathered, right),
        gathered = &mut right => (gathered, left),
    };

    let second = await_round(pending, stop).await?;
    Ok((first, second))
}

/// Waits for `round`, or retires it if `stop` fires first.
async fn await_round(mut round: Round, stop: &CancellationToken) -> Result<Vec<Item>> {
    tokio::select! {
        biased;
        () = stop.cancelled() => {}
        gathered = &mut round => return Ok(gathered),
    }

    round.retire().await;
    Err(Error::Cancelled)
}
