//! Latency statistics over a completed run

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary statistics for a single run
///
/// Only produced for runs that drained every admitted query without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryStats {
    /// Total number of queries processed
    pub processed: u64,
    /// Sum of every query's execution time
    pub total_elapsed: Duration,
    /// Fastest query
    pub min: Duration,
    /// Slowest query
    pub max: Duration,
    /// Mean query time, truncated to whole nanoseconds
    pub avg: Duration,
    /// Median query time
    pub median: Duration,
}

impl QueryStats {
    /// Calculate summary statistics from per-query durations
    ///
    /// Sorts `durations` in place. An empty slice yields zero-valued stats.
    pub fn from_durations(durations: &mut [Duration]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }

        durations.sort_unstable();

        let n = durations.len();
        let total_elapsed: Duration = durations.iter().sum();
        let avg = nanos_to_duration(total_elapsed.as_nanos() / n as u128);

        let median = if n % 2 == 0 {
            // average the middle pair
            let lower = durations[n / 2 - 1].as_nanos();
            let upper = durations[n / 2].as_nanos();
            nanos_to_duration((lower + upper) / 2)
        } else {
            durations[n / 2]
        };

        Self {
            processed: n as u64,
            total_elapsed,
            min: durations[0],
            max: durations[n - 1],
            avg,
            median,
        }
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    Duration::new(
        (nanos / 1_000_000_000) as u64,
        (nanos % 1_000_000_000) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_stats_even() {
        let mut durations = vec![ms(3000), ms(1200), ms(900), ms(1350)];

        let expected = QueryStats {
            processed: 4,
            total_elapsed: ms(6450),
            min: ms(900),
            max: ms(3000),
            avg: ms(6450) / 4,
            median: ms(1275),
        };

        assert_eq!(QueryStats::from_durations(&mut durations), expected);
    }

    #[test]
    fn test_stats_odd() {
        let mut durations = vec![ms(3000), ms(1200), ms(1275), ms(900), ms(1350)];

        let expected = QueryStats {
            processed: 5,
            total_elapsed: ms(7725),
            min: ms(900),
            max: ms(3000),
            avg: ms(1545),
            median: ms(1275),
        };

        assert_eq!(QueryStats::from_durations(&mut durations), expected);
    }

    #[test]
    fn test_stats_avg_truncates_nanoseconds() {
        let mut durations = vec![Duration::from_nanos(1), Duration::from_nanos(2)];
        let stats = QueryStats::from_durations(&mut durations);
        assert_eq!(stats.avg, Duration::from_nanos(1));
        assert_eq!(stats.median, Duration::from_nanos(1));
    }

    #[test]
    fn test_stats_empty_is_zeroed() {
        let stats = QueryStats::from_durations(&mut []);
        assert_eq!(stats, QueryStats::default());
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.avg, Duration::ZERO);
    }

    #[test]
    fn test_stats_single() {
        let stats = QueryStats::from_durations(&mut [ms(42)]);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.min, ms(42));
        assert_eq!(stats.max, ms(42));
        assert_eq!(stats.avg, ms(42));
        assert_eq!(stats.median, ms(42));
    }

    #[test]
    fn test_stats_sorts_input() {
        let mut durations = vec![ms(3), ms(1), ms(2)];
        QueryStats::from_durations(&mut durations);
        assert_eq!(durations, vec![ms(1), ms(2), ms(3)]);
    }

    #[test]
    fn test_stats_serialization() {
        let stats = QueryStats::from_durations(&mut [ms(10), ms(20)]);
        let json = serde_json::to_string(&stats).unwrap();
        let deserialized: QueryStats = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, stats);
    }
}
