use crate::{Error, Item};
use core::time::Duration;
use tokio::time::Instant;

/// Immutable snapshot of one streamed round.
///
/// Both sequences are copied on construction, so a snapshot never changes
/// after it has been handed to a consumer, whatever the producer does with its
/// own buffers afterwards.
///
/// `failure` is `None` on every result except, possibly, the last one of a
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedResult {
    round: u32,
    begin: Instant,
    end: Instant,
    previous: Vec<Item>,
    current: Vec<Item>,
    failure: Option<Error>,
}

impl StreamedResult {
    pub fn new(
        round: u32,
        begin: Instant,
        end: Instant,
        previous: &[Item],
        current: &[Item],
        failure: Option<Error>,
    ) -> Self {
        Self {
            round,
            begin,
            end,
            previous: previous.to_vec(),
            current: current.to_vec(),
            failure,
        }
    }

    /// Round number, starting at 1.
    pub const fn round(&self) -> u32 {
        self.round
    }

    pub const fn begin(&self) -> Instant {
        self.begin
    }

    pub const fn end(&self) -> Instant {
        self.end
    }

    /// Time spent waiting for this round.
    pub fn elapsed(&self) -> Duration {
        self.end.saturating_duration_since(self.begin)
    }

    /// The result this round was compared against.
    pub fn previous(&self) -> &[Item] {
        &self.previous
    }

    /// The result this round produced.
    pub fn current(&self) -> &[Item] {
        &self.current
    }

    pub const fn failure(&self) -> Option<Error> {
        self.failure
    }

    /// Whether this round agreed with the one before it.
    pub fn is_converged(&self) -> bool {
        self.failure.is_none() && self.previous == self.current
    }

    /// Returns a copy of this snapshot re-tagged with `failure` and ending at
    /// `end`.
    #[must_use]
    pub fn with_failure(&self, failure: Error, end: Instant) -> Self {
        Self {
            end,
            failure: Some(failure),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_a_deep_copy() {
        let now = Instant::now();
        let mut previous = vec![2, 1];
        let mut current = vec![1, 2];
        let snapshot = StreamedResult::new(3, now, now, &previous, &current, None);

        previous.push(9);
        current[0] = 7;

        assert_eq!(snapshot.round(), 3);
        assert_eq!(snapshot.previous(), &[2, 1]);
        assert_eq!(snapshot.current(), &[1, 2]);
        assert!(!snapshot.is_converged());
    }

    #[test]
    fn equal_sequences_converge_unless_failed() {
        let now = Instant::now();
        let converged = StreamedResult::new(1, now, now, &[1, 2], &[1, 2], None);
        assert!(converged.is_converged());

        let cancelled = converged.with_failure(Error::Cancelled, now);
        assert_eq!(cancelled.failure(), Some(Error::Cancelled));
        assert_eq!(cancelled.current(), converged.current());
        assert!(!cancelled.is_converged());
    }

    #[test]
    fn empty_sequences_are_equal() {
        let now = Instant::now();
        assert!(StreamedResult::new(1, now, now, &[], &[], None).is_converged());
    }

    #[test]
    fn elapsed_never_underflows() {
        let end = Instant::now();
        let begin = end + Duration::from_secs(1);
        let snapshot = StreamedResult::new(1, begin, end, &[], &[], None);
        assert_eq!(snapshot.elapsed(), Duration::ZERO);
        assert_eq!(snapshot.begin(), begin);
        assert_eq!(snapshot.end(), end);
    }
}
