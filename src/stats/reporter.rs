//! Statistics reporting utilities.

use super::PoolStatistics;

/// Formats and reports pool statistics in various forms.
pub struct StatisticsReporter {
    stats: PoolStatistics,
}

impl StatisticsReporter {
    /// Creates a new reporter for the given statistics.
    pub fn new(stats: PoolStatistics) -> Self {
        Self { stats }
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!("{}", self.stats)
    }

    /// Returns a compact one-line summary.
    pub fn compact_summary(&self) -> String {
        format!(
            "Pool: {}/{} ({:.1}%) | Mallocs: {} | Frees: {} | Failures: {}",
            self.stats.live_slots,
            self.stats.slot_capacity,
            self.stats.utilization_rate(),
            self.stats.total_mallocs,
            self.stats.total_frees,
            self.stats.allocation_failures
        )
    }

    /// Returns statistics as key-value pairs.
    pub fn as_key_value_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("slot_capacity", self.stats.slot_capacity.to_string()),
            ("live_slots", self.stats.live_slots.to_string()),
            ("peak_live_slots", self.stats.peak_live_slots.to_string()),
            ("utilization_rate", format!("{:.2}%", self.stats.utilization_rate())),
            ("total_mallocs", self.stats.total_mallocs.to_string()),
            ("total_frees", self.stats.total_frees.to_string()),
            ("allocation_failures", self.stats.allocation_failures.to_string()),
            ("hit_rate", format!("{:.4}", self.stats.hit_rate())),
        ]
    }

    /// Returns statistics in JSON format.
    #[cfg(feature = "serde")]
    #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
    pub fn as_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.stats)
    }

    /// Logs statistics using the `tracing` framework.
    #[cfg(feature = "tracing")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tracing")))]
    pub fn log(&self) {
        tracing::info!(
            slot_capacity = self.stats.slot_capacity,
            live_slots = self.stats.live_slots,
            peak_live_slots = self.stats.peak_live_slots,
            total_mallocs = self.stats.total_mallocs,
            total_frees = self.stats.total_frees,
            allocation_failures = self.stats.allocation_failures,
            utilization_rate = %format!("{:.2}%", self.stats.utilization_rate()),
            "pool statistics"
        );
    }
}
