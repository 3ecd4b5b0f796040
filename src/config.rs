//! Runtime-configurable tuning parameters for cohort.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `COHORT_`) or by constructing a custom `CohortConfig`.

/// Tuning parameters consumed by the collective entry points.
#[derive(Debug, Clone)]
pub struct CohortConfig {
    /// Radix of the dissemination barrier. 2 selects the binary
    /// algorithm; higher values trade message count for round count.
    pub barrier_radix: u32,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self { barrier_radix: 2 }
    }
}

impl CohortConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `COHORT_BARRIER_RADIX` (>= 2)
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("COHORT_BARRIER_RADIX") {
            if let Ok(k) = v.parse::<u32>() {
                if k >= 2 {
                    cfg.barrier_radix = k;
                }
            }
        }

        cfg
    }
}
