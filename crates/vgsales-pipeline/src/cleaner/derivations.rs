//! Columns derived from cleaned values.

use chrono::{Datelike, NaiveDate};

/// Critic-score bin edges.
pub const SCORE_BIN_EDGES: [f64; 7] = [0.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];

/// Labels of the bins between consecutive [`SCORE_BIN_EDGES`].
pub const SCORE_BIN_LABELS: [&str; 6] = ["0-5", "5-6", "6-7", "7-8", "8-9", "9-10"];

/// Bucket a critic score.
///
/// Bins are closed on the left and open on the right, except the last one
/// which also includes 10. Scores outside `[0, 10]` have no bucket.
pub fn score_range(score: f64) -> Option<&'static str> {
    let last = SCORE_BIN_EDGES[SCORE_BIN_EDGES.len() - 1];
    if !(SCORE_BIN_EDGES[0]..=last).contains(&score) {
        return None;
    }
    if score == last {
        return SCORE_BIN_LABELS.last().copied();
    }

    SCORE_BIN_EDGES
        .windows(2)
        .position(|edges| score >= edges[0] && score < edges[1])
        .map(|idx| SCORE_BIN_LABELS[idx])
}

/// Calendar year and month (1-12) of a date.
pub fn year_month(date: NaiveDate) -> (i32, i32) {
    (date.year(), date.month() as i32)
}
