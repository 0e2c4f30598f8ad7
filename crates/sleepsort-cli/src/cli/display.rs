//! Console reporting of a streamed sort.
//!
//! Output goes to any [`Write`] so it can be asserted on in tests; the binary
//! passes a locked stdout.

use core::time::Duration;
use futures::{Stream, StreamExt};
use sleepsort::{Error, Item, StreamedResult, sleepers_in_flight};
use std::io::Write;
use tokio::time::Instant;

/// Width of one column of the mismatch table.
const COLUMN_WIDTH: usize = 15;
/// Number of mismatches printed per line.
const COLUMNS: usize = 4;

/// Positions where `previous` and `current` disagree.
pub fn mismatches(previous: &[Item], current: &[Item]) -> Vec<usize> {
    previous
        .iter()
        .zip(current)
        .enumerate()
        .filter(|(_, (left, right))| left != right)
        .map(|(i, _)| i)
        .collect()
}

/// Writes the mismatch table between two rounds, or nothing if they agree.
pub fn write_mismatches(
    out: &mut impl Write,
    previous: &[Item],
    current: &[Item],
) -> std::io::Result<()> {
    let positions = mismatches(previous, current);
    if positions.is_empty() {
        return Ok(());
    }

    writeln!(out, "Unsorted items ({}):", positions.len())?;
    for row in positions.chunks(COLUMNS) {
        let line = row
            .iter()
            .map(|&i| format!("{:<COLUMN_WIDTH$}", format!("{} != {}", previous[i], current[i])))
            .collect::<String>();
        writeln!(out, "{}", line.trim_end())?;
    }

    Ok(())
}

/// Formats a duration with millisecond precision, e.g. `2.048s`.
pub fn format_duration(duration: Duration) -> String {
    format!("{}.{:03}s", duration.as_secs(), duration.subsec_millis())
}

/// Prints every streamed round and a final summary, returning the failure of
/// the last round, if any.
pub async fn report<S>(
    out: &mut impl Write,
    items: &[Item],
    results: S,
) -> anyhow::Result<Option<Error>>
where
    S: Stream<Item = StreamedResult>,
{
    writeln!(out, "Unsorted items: {items:?}")?;
    out.flush()?;

    let started = Instant::now();
    let mut results = core::pin::pin!(results);
    let mut sorted: Vec<Item> = Vec::new();
    let mut failure = None;

    while let Some(result) = results.next().await {
        failure = result.failure();
        if let Some(failure) = failure {
            writeln!(out, "Sort stopped with: {failure}")?;
            break;
        }

        writeln!(
            out,
            "Round {} sorted in {}",
            result.round(),
            format_duration(result.elapsed())
        )?;
        write_mismatches(out, result.previous(), result.current())?;
        out.flush()?;

        sorted = result.current().to_vec();
    }

    writeln!(out, "Sorted items: {sorted:?}")?;
    writeln!(out, "Sort complete in {}", format_duration(started.elapsed()))?;
    writeln!(out, "Sleepers still in flight: {}", sleepers_in_flight())?;
    out.flush()?;

    Ok(failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(round: u32, previous: &[Item], current: &[Item]) -> StreamedResult {
        let now = Instant::now();
        StreamedResult::new(round, now, now, previous, current, None)
    }

    #[test]
    fn finds_mismatching_positions() {
        assert_eq!(mismatches(&[1, 2, 3], &[1, 3, 2]), vec![1, 2]);
        assert!(mismatches(&[1, 2], &[1, 2]).is_empty());
        assert!(mismatches(&[], &[4, 5]).is_empty());
    }

    #[test]
    fn mismatch_table_wraps_every_four_entries() {
        let mut out = Vec::new();
        write_mismatches(&mut out, &[1, 2, 3, 4, 5], &[5, 4, 2, 3, 1]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Unsorted items (5):");
        assert!(lines[1].starts_with("1 != 5"));
        assert!(lines[1].ends_with("4 != 3"));
        assert_eq!(lines[2], "5 != 1");
    }

    #[test]
    fn agreeing_rounds_print_nothing() {
        let mut out = Vec::new();
        write_mismatches(&mut out, &[1, 2], &[1, 2]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn durations_keep_milliseconds() {
        assert_eq!(format_duration(Duration::from_millis(2_048)), "2.048s");
        assert_eq!(format_duration(Duration::ZERO), "0.000s");
    }

    #[tokio::test]
    async fn report_stops_at_the_first_failure() {
        let rounds = vec![
            snapshot(1, &[2, 1], &[1, 2]),
            snapshot(2, &[1, 2], &[1, 2]).with_failure(Error::Cancelled, Instant::now()),
        ];

        let mut out = Vec::new();
        let failure = report(&mut out, &[2, 1], futures::stream::iter(rounds))
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(failure, Some(Error::Cancelled));
        assert!(text.contains("Unsorted items: [2, 1]"));
        assert!(text.contains("Round 1 sorted in"));
        assert!(text.contains("2 != 1"));
        assert!(text.contains("Sort stopped with: cancelled"));
        assert!(text.contains("Sorted items: [1, 2]"));
    }

    #[tokio::test]
    async fn report_without_failure_returns_none() {
        let rounds = vec![snapshot(1, &[3], &[3])];
        let mut out = Vec::new();
        let failure = report(&mut out, &[3], futures::stream::iter(rounds))
            .await
            .unwrap();
        assert_eq!(failure, None);
    }
}
