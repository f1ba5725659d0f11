//! Statistics collector for tracking pool metrics.

use super::PoolStatistics;

/// Collects statistics about a pool's `malloc`/`free` traffic.
pub struct StatisticsCollector {
    stats: PoolStatistics,
}

impl StatisticsCollector {
    /// Creates a new statistics collector for a pool with `slot_capacity` slots.
    pub fn new(slot_capacity: usize) -> Self {
        Self {
            stats: PoolStatistics::new(slot_capacity),
        }
    }

    /// Records a successful `malloc`/`zmalloc`.
    #[inline]
    pub fn record_malloc(&mut self) {
        self.stats.total_mallocs += 1;
        self.stats.live_slots += 1;

        if self.stats.live_slots > self.stats.peak_live_slots {
            self.stats.peak_live_slots = self.stats.live_slots;
        }
    }

    /// Records a `free`.
    #[inline]
    pub fn record_free(&mut self) {
        self.stats.total_frees += 1;
        self.stats.live_slots = self.stats.live_slots.saturating_sub(1);
    }

    /// Records a `malloc`/`zmalloc` that failed with `ENOMEM`.
    #[inline]
    pub fn record_failure(&mut self) {
        self.stats.allocation_failures += 1;
    }

    /// Returns a snapshot of the current statistics.
    #[inline]
    pub fn snapshot(&self) -> PoolStatistics {
        self.stats
    }

    /// Resets all counters, keeping `slot_capacity`.
    pub fn reset(&mut self) {
        let slot_capacity = self.stats.slot_capacity;
        self.stats = PoolStatistics::new(slot_capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_tracks_mallocs() {
        let mut collector = StatisticsCollector::new(100);

        collector.record_malloc();
        collector.record_malloc();
        collector.record_malloc();

        let stats = collector.snapshot();
        assert_eq!(stats.total_mallocs, 3);
        assert_eq!(stats.live_slots, 3);
        assert_eq!(stats.peak_live_slots, 3);
    }

    #[test]
    fn collector_tracks_frees() {
        let mut collector = StatisticsCollector::new(100);

        collector.record_malloc();
        collector.record_malloc();
        collector.record_free();

        let stats = collector.snapshot();
        assert_eq!(stats.total_mallocs, 2);
        assert_eq!(stats.total_frees, 1);
        assert_eq!(stats.live_slots, 1);
        assert_eq!(stats.peak_live_slots, 2);
    }

    #[test]
    fn collector_tracks_failures() {
        let mut collector = StatisticsCollector::new(100);

        collector.record_failure();
        collector.record_failure();

        let stats = collector.snapshot();
        assert_eq!(stats.allocation_failures, 2);
    }

    #[test]
    fn collector_reset() {
        let mut collector = StatisticsCollector::new(100);

        collector.record_malloc();
        collector.record_malloc();
        collector.record_failure();

        collector.reset();

        let stats = collector.snapshot();
        assert_eq!(stats.total_mallocs, 0);
        assert_eq!(stats.allocation_failures, 0);
        assert_eq!(stats.slot_capacity, 100);
    }
}
