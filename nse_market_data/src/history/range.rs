use chrono::{DateTime, Duration};
use chrono_tz::Tz;

/// Splits `[start, end]` into consecutive sub-ranges no longer than
/// `max_span` each.
///
/// Adjacent sub-ranges share their edge instant: the provider treats both
/// bounds as inclusive, so the shared edge shows up in two responses and is
/// deduplicated during reassembly. Returned in chronological order.
pub fn partition(
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    max_span: Duration,
) -> Vec<(DateTime<Tz>, DateTime<Tz>)> {
    let mut ranges = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let chunk_end = (cursor + max_span).min(end);
        ranges.push((cursor, chunk_end));
        cursor = chunk_end;
    }
    ranges
}
