use crate::Item;
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use portable_atomic::{AtomicUsize, Ordering};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinSet,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;

/// Time slept per unit of `value * multiplier`.
pub const DEFAULT_UNIT: Duration = Duration::from_millis(1);

static SLEEPERS: AtomicUsize = AtomicUsize::new(0);

/// Returns the number of sleeper tasks currently alive across every round in
/// the process.
///
/// A sleeper is counted from the moment its round spawns it until its task
/// finishes, whether it emitted its value or observed a stop.
pub fn sleepers_in_flight() -> usize {
    SLEEPERS.load(Ordering::Relaxed)
}

struct SleeperGuard;

impl SleeperGuard {
    fn enter() -> Self {
        SLEEPERS.fetch_add(1, Ordering::Relaxed);
        Self
    }
}

impl Drop for SleeperGuard {
    fn drop(&mut self) {
        SLEEPERS.fetch_sub(1, Ordering::Relaxed);
    }
}

/// One sleep-sort pass at a fixed delay multiplier.
///
/// Every item gets its own task that sleeps `item * multiplier` units and then
/// emits the item. The order in which the items arrive is the round's result.
/// Nothing is ever compared, so the output is only as sorted as the timers are
/// precise: near-simultaneous expiries arrive in no particular order.
///
/// A multiplier of zero is accepted and collapses every delay to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepSort {
    multiplier: u64,
    unit: Duration,
}

impl SleepSort {
    /// Creates a pass using [`DEFAULT_UNIT`] per tick.
    pub const fn new(multiplier: u64) -> Self {
        Self {
            multiplier,
            unit: DEFAULT_UNIT,
        }
    }

    /// Overrides the time slept per tick.
    #[must_use]
    pub const fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub const fn multiplier(&self) -> u64 {
        self.multiplier
    }

    pub const fn unit(&self) -> Duration {
        self.unit
    }

    /// Returns how long `item` sleeps in this pass, saturating at
    /// `u64::MAX` nanoseconds.
    pub fn delay_for(&self, item: Item) -> Duration {
        let unit_nanos = u64::try_from(self.unit.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(unit_nanos.saturating_mul(item.saturating_mul(self.multiplier)))
    }

    /// Starts sorting a private copy of `list` in the background.
    ///
    /// Returns immediately. The returned [`Round`] resolves to the gathered
    /// items once every sleeper has finished, and doubles as the stop handle
    /// for the pass.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn sort(&self, list: &[Item]) -> Round {
        let stop = CancellationToken::new();
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(run_round(*self, list.to_vec(), stop.clone(), done_tx));

        Round {
            multiplier: self.multiplier,
            stop,
            done: Some(done_rx),
        }
    }
}

/// Handle to a running [`SleepSort`] pass.
///
/// Awaiting the round yields its result: every item whose sleeper expired
/// before a stop was observed, in arrival order. The round only resolves
/// after all of its sleepers have exited, so a resolved round never leaves
/// work behind.
///
/// Stopping is idempotent. Dropping a round requests a stop as well, but only
/// awaiting (or [`Round::retire`]) observes the sleepers finishing.
#[derive(Debug)]
#[must_use = "a round keeps sleeping until it is awaited or retired"]
pub struct Round {
    multiplier: u64,
    stop: CancellationToken,
    done: Option<oneshot::Receiver<Vec<Item>>>,
}

impl Round {
    pub const fn multiplier(&self) -> u64 {
        self.multiplier
    }

    /// Returns a clone of this round's stop signal.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Requests an early stop without waiting for it.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Requests a stop and drains the round, returning whatever was gathered
    /// before the stop was observed.
    pub async fn retire(mut self) -> Vec<Item> {
        self.stop.cancel();
        (&mut self).await
    }
}

impl Future for Round {
    type Output = Vec<Item>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(done) = this.done.as_mut() else {
            return Poll::Ready(Vec::new());
        };

        match Pin::new(done).poll(cx) {
            Poll::Ready(gathered) => {
                this.done = None;
                // The gather task only drops its sender without sending if it
                // was torn down with the runtime.
                Poll::Ready(gathered.unwrap_or_default())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Round {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Scatters one sleeper per item, gathers their emissions, and reports the
/// gathered list once every sleeper has exited.
async fn run_round(
    sort: SleepSort,
    items: Vec<Item>,
    stop: CancellationToken,
    done: oneshot::Sender<Vec<Item>>,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!(
        "Round x{} launching {} sleepers",
        sort.multiplier,
        items.len()
    );

    // Sized so a sleeper never waits on a full queue.
    let (tx, mut rx) = mpsc::channel(items.len().max(1));
    let mut sleepers = JoinSet::new();
    let start = Instant::now();

    for &item in &items {
        let guard = SleeperGuard::enter();
        let deadline = start + sort.delay_for(item);
        sleepers.spawn(sleeper(item, deadline, tx.clone(), stop.clone(), guard));
    }
    drop(tx);

    let mut gathered = Vec::with_capacity(items.len());
    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            entry = rx.recv() => match entry {
                Some(item) => gathered.push(item),
                None => break,
            },
        }
    }

    // Anything still queued arrived after the stop and is discarded.
    drop(rx);
    while sleepers.join_next().await.is_some() {}

    #[cfg(feature = "tracing")]
    tracing::trace!(
        "Round x{} retired with {}/{} items (stopped: {})",
        sort.multiplier,
        gathered.len(),
        items.len(),
        stop.is_cancelled()
    );

    if done.send(gathered).is_err() {
        #[cfg(feature = "tracing")]
        tracing::trace!("Round x{} result dropped by its owner", sort.multiplier);
    }
}

async fn sleeper(
    item: Item,
    deadline: Instant,
    tx: mpsc::Sender<Item>,
    stop: CancellationToken,
    _guard: SleeperGuard,
) {
    tokio::select! {
        biased;
        () = stop.cancelled() => return,
        () = sleep_until(deadline) => {}
    }

    // The timer and the stop can fire together.
    if stop.is_cancelled() {
        return;
    }

    let _ = tx.send(item).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn empty_list_completes_immediately() {
        let start = Instant::now();
        let gathered = SleepSort::new(1).sort(&[]).await;
        assert!(gathered.is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn arrival_order_follows_delay() {
        let gathered = SleepSort::new(1).sort(&[3, 1, 2]).await;
        assert_eq!(gathered, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn multiplier_scales_every_delay() {
        let start = Instant::now();
        let gathered = SleepSort::new(3).sort(&[2, 1]).await;
        assert_eq!(gathered, vec![1, 2]);
        assert!(start.elapsed() >= Duration::from_millis(6));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_unit_is_honored() {
        let start = Instant::now();
        // 10ms and 4ms: far enough apart to land on different timer ticks.
        let sort = SleepSort::new(2).with_unit(Duration::from_micros(500));
        let gathered = sort.sort(&[10, 4]).await;
        assert_eq!(gathered, vec![4, 10]);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(10));
        assert!(elapsed < Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_items_emit_without_delay() {
        let start = Instant::now();
        let gathered = SleepSort::new(8).sort(&[0, 0, 0]).await;
        assert_eq!(gathered, vec![0, 0, 0]);
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_truncates_the_result() {
        let start = Instant::now();
        let round = SleepSort::new(1).sort(&[1, 1_000]);
        sleep(Duration::from_millis(10)).await;

        let gathered = round.retire().await;
        assert_eq!(gathered, vec![1]);
        assert!(start.elapsed() < Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_any_expiry_yields_nothing() {
        let start = Instant::now();
        let round = SleepSort::new(4).sort(&[500, 700, 900]);
        round.stop();
        assert!(round.is_stopped());

        let gathered = round.await;
        assert!(gathered.is_empty());
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_twice_is_harmless() {
        let round = SleepSort::new(1).sort(&[50]);
        let token = round.stop_token();
        token.cancel();
        round.stop();
        assert!(round.retire().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_round_requests_stop() {
        let round = SleepSort::new(1).sort(&[10_000]);
        let token = round.stop_token();
        drop(round);
        assert!(token.is_cancelled());
    }

    #[test]
    fn delay_saturates_instead_of_overflowing() {
        let sort = SleepSort::new(u64::MAX);
        assert_eq!(sort.delay_for(u64::MAX), Duration::from_nanos(u64::MAX));
        assert_eq!(SleepSort::new(2).delay_for(3), Duration::from_millis(6));
        assert_eq!(SleepSort::new(0).delay_for(3), Duration::ZERO);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn real_clock_round_is_a_permutation() {
        let input = [40, 10, 30, 20, 0];
        let mut gathered = SleepSort::new(1).sort(&input).await;
        assert_eq!(gathered.len(), input.len());

        gathered.sort_unstable();
        assert_eq!(gathered, vec![0, 10, 20, 30, 40]);
    }
}
