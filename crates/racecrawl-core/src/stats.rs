//! Finish-time statistics: percentile distribution and minute buckets.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use thiserror::Error;

/// Percentiles reported by default.
pub const DEFAULT_PERCENTILES: [u32; 9] = [50, 66, 75, 80, 90, 95, 98, 99, 100];

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("malformed result row: bad time {0:?}")]
    MalformedRecord(String),
    #[error("malformed result row: only {0} column(s)")]
    ShortRow(usize),
    #[error("result file unreadable")]
    Csv(#[from] csv::Error),
}

/// Minimal projection of a result row needed for statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedResult {
    /// Wall-clock finish time of day.
    pub time: NaiveTime,
    pub name: String,
}

/// Percentage distribution of a sorted result set: at what time had 50%,
/// 75%, 90% ... of finishers completed?
///
/// For each requested percentile the scan resumes from the last match and
/// records the first result whose index over the total, as a percentage,
/// strictly exceeds it. Steep distributions can leave a percentile with no
/// qualifying index before the next one takes over; such percentiles are
/// skipped. When the final requested percentile is 100 the last result is
/// appended unconditionally, so the 100th percentile always reflects the
/// true maximum.
pub fn generate_percentiles(
    results: &[TimedResult],
    percentiles: &[u32],
) -> Vec<(u32, NaiveTime)> {
    let mut data = Vec::new();
    if results.is_empty() {
        return data;
    }

    let total = results.len();
    let mut cur_index = 0usize;

    for &percentile in percentiles {
        for (index, result) in results.iter().enumerate().skip(cur_index) {
            if (index as f64 / total as f64) * 100.0 > f64::from(percentile) {
                data.push((percentile, result.time));
                cur_index = index;
                break;
            }
        }
    }

    if percentiles.last() == Some(&100) {
        data.push((100, results[total - 1].time));
    }

    data
}

/// Group a sorted result set into buckets keyed by hour-and-minute
/// (`HH-MM`), preserving input order within each bucket.
pub fn create_buckets(results: &[TimedResult]) -> BTreeMap<String, Vec<TimedResult>> {
    let mut buckets: BTreeMap<String, Vec<TimedResult>> = BTreeMap::new();
    for result in results {
        let key = result.time.format("%H-%M").to_string();
        buckets.entry(key).or_default().push(result.clone());
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M:%S").unwrap()
    }

    fn results() -> Vec<TimedResult> {
        ["01:10:15", "01:10:20", "01:20:00", "01:30:10", "01:30:15", "01:30:20"]
            .iter()
            .enumerate()
            .map(|(i, s)| TimedResult {
                time: t(s),
                name: format!("runner {}", i + 1),
            })
            .collect()
    }

    #[test]
    fn default_percentiles_first_and_last() {
        let data = generate_percentiles(&results(), &DEFAULT_PERCENTILES);
        assert_eq!(data.first().unwrap(), &(50, t("01:30:15")));
        assert_eq!(data.last().unwrap(), &(100, t("01:30:20")));
    }

    #[test]
    fn steep_tail_skips_unreachable_percentiles() {
        // With six results the largest scan ratio below the forced final
        // entry is 5/6 = 83.3%, so 90/95/98/99 produce nothing.
        let data = generate_percentiles(&results(), &DEFAULT_PERCENTILES);
        let reported: Vec<u32> = data.iter().map(|(p, _)| *p).collect();
        assert_eq!(reported, [50, 66, 75, 80, 100]);
    }

    #[test]
    fn final_percentile_is_forced_to_the_maximum() {
        let data = generate_percentiles(&results(), &[100]);
        assert_eq!(data, [(100, t("01:30:20"))]);
    }

    #[test]
    fn without_trailing_100_nothing_is_forced() {
        let data = generate_percentiles(&results(), &[50, 80]);
        assert_eq!(data, [(50, t("01:30:15")), (80, t("01:30:20"))]);
    }

    #[test]
    fn empty_results_yield_empty_output() {
        assert!(generate_percentiles(&[], &DEFAULT_PERCENTILES).is_empty());
    }

    #[test]
    fn buckets_group_by_hour_and_minute() {
        let buckets = create_buckets(&results());
        assert_eq!(buckets["01-10"].len(), 2);
        assert_eq!(buckets["01-20"].len(), 1);
        assert_eq!(buckets["01-30"].len(), 3);
    }

    #[test]
    fn buckets_preserve_input_order() {
        let buckets = create_buckets(&results());
        let names: Vec<&str> = buckets["01-30"].iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["runner 4", "runner 5", "runner 6"]);
    }
}
