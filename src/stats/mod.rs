//! Statistics collection and reporting for memory pools.

mod collector;
mod reporter;

pub use collector::StatisticsCollector;
pub use reporter::StatisticsReporter;

use std::fmt;

/// Statistics about one pool's slot usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolStatistics {
    /// Total number of successful `malloc`/`zmalloc` calls.
    pub total_mallocs: usize,

    /// Total number of `free` calls.
    pub total_frees: usize,

    /// Currently live slots (mallocs minus frees).
    pub live_slots: usize,

    /// Peak number of simultaneously live slots.
    pub peak_live_slots: usize,

    /// Total slots the pool's stride can hold (`stride / item_size`).
    pub slot_capacity: usize,

    /// Number of `malloc`/`zmalloc` calls that returned `ENOMEM`.
    pub allocation_failures: usize,
}

impl PoolStatistics {
    /// Creates a new statistics instance with all counters at zero.
    pub fn new(slot_capacity: usize) -> Self {
        Self {
            total_mallocs: 0,
            total_frees: 0,
            live_slots: 0,
            peak_live_slots: 0,
            slot_capacity,
            allocation_failures: 0,
        }
    }

    /// Returns the utilization rate as a percentage (0.0 to 100.0).
    #[inline]
    pub fn utilization_rate(&self) -> f64 {
        if self.slot_capacity == 0 {
            0.0
        } else {
            (self.live_slots as f64 / self.slot_capacity as f64) * 100.0
        }
    }

    /// Returns the peak utilization rate as a percentage (0.0 to 100.0).
    #[inline]
    pub fn peak_utilization_rate(&self) -> f64 {
        if self.slot_capacity == 0 {
            0.0
        } else {
            (self.peak_live_slots as f64 / self.slot_capacity as f64) * 100.0
        }
    }

    /// Returns the hit rate (successful mallocs / total attempts).
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total_attempts = self.total_mallocs + self.allocation_failures;
        if total_attempts == 0 {
            1.0
        } else {
            self.total_mallocs as f64 / total_attempts as f64
        }
    }

    /// Returns the number of currently free slots.
    #[inline]
    pub fn available(&self) -> usize {
        self.slot_capacity.saturating_sub(self.live_slots)
    }
}

impl fmt::Display for PoolStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pool Statistics:")?;
        writeln!(f, "  Slot capacity:       {}", self.slot_capacity)?;
        writeln!(
            f,
            "  Live slots:          {} ({:.1}%)",
            self.live_slots,
            self.utilization_rate()
        )?;
        writeln!(
            f,
            "  Peak live slots:     {} ({:.1}%)",
            self.peak_live_slots,
            self.peak_utilization_rate()
        )?;
        writeln!(f, "  Total mallocs:       {}", self.total_mallocs)?;
        writeln!(f, "  Total frees:         {}", self.total_frees)?;
        writeln!(f, "  Allocation failures: {}", self.allocation_failures)?;
        writeln!(f, "  Hit rate:            {:.2}%", self.hit_rate() * 100.0)?;
        Ok(())
    }
}
