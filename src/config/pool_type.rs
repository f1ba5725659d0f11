//! Pool type: global (non-replicated) versus per-CPU.

/// Whether a pool replicates its slots per CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolType {
    /// `max_cpus = 1`: conventional, non-replicated allocation.
    Global,
    /// Replicated across up to `max_cpus` CPU slots.
    PerCpu {
        /// Number of CPU replicas the pool's virtual range is sized for.
        max_cpus: usize,
    },
}

impl PoolType {
    /// The number of CPU replicas this pool type implies.
    #[inline]
    pub fn max_cpus(self) -> usize {
        match self {
            PoolType::Global => 1,
            PoolType::PerCpu { max_cpus } => max_cpus,
        }
    }

    /// `true` for `PoolType::Global`.
    #[inline]
    pub fn is_global(self) -> bool {
        matches!(self, PoolType::Global)
    }
}

impl Default for PoolType {
    fn default() -> Self {
        PoolType::Global
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_has_one_cpu() {
        assert_eq!(PoolType::Global.max_cpus(), 1);
        assert!(PoolType::Global.is_global());
    }

    #[test]
    fn per_cpu_reports_its_count() {
        let t = PoolType::PerCpu { max_cpus: 8 };
        assert_eq!(t.max_cpus(), 8);
        assert!(!t.is_global());
    }
}
