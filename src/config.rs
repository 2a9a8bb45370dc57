//! Calibration constants for the probe loop
//!
//! Defaults reproduce the classic same-socket calibration: a reload under
//! 100 cycles is a cache hit, a report needs more than 1000 idle loops before
//! it, and timestamps are converted at an assumed 2.6 GHz.

/// Reload latency (cycles) below which a measurement counts as a cache hit
pub const DEFAULT_THRESHOLD_CYCLES: u64 = 100;

/// Consecutive misses that must precede a hit for it to be reported
pub const DEFAULT_DEBOUNCE_LOOPS: u64 = 1000;

/// Cycles per microsecond used for the elapsed-time column (2.6 GHz)
pub const DEFAULT_CYCLES_PER_US: u64 = 2600;

/// Upper bound on how much of the target file gets mapped (64 MiB)
pub const MAP_WINDOW_BYTES: usize = 64 * 1024 * 1024;

/// Probe loop configuration with builder pattern
///
/// # Example
/// ```
/// use evict_reload::config::ProbeConfig;
///
/// let config = ProbeConfig::new()
///     .with_threshold_cycles(180)
///     .with_debounce_loops(500)
///     .with_iterations(Some(10_000));
/// assert_eq!(config.threshold_cycles, 180);
/// assert_eq!(config.cycles_per_us, 2600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Hit/miss boundary in cycles (strictly-less-than is a hit)
    pub threshold_cycles: u64,

    /// Idle loops that must be exceeded before a hit is reported
    pub debounce_loops: u64,

    /// Divisor turning cycle deltas into microseconds
    pub cycles_per_us: u64,

    /// Stop after this many iterations (None = run until killed)
    pub iterations: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            threshold_cycles: DEFAULT_THRESHOLD_CYCLES,
            debounce_loops: DEFAULT_DEBOUNCE_LOOPS,
            cycles_per_us: DEFAULT_CYCLES_PER_US,
            iterations: None,
        }
    }
}

impl ProbeConfig {
    /// Create a configuration with the default calibration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hit/miss latency boundary
    pub fn with_threshold_cycles(mut self, cycles: u64) -> Self {
        self.threshold_cycles = cycles;
        self
    }

    /// Set the debounce gate
    pub fn with_debounce_loops(mut self, loops: u64) -> Self {
        self.debounce_loops = loops;
        self
    }

    /// Set the clock-rate divisor (clamped to at least 1)
    ///
    /// # Example
    /// ```
    /// use evict_reload::config::ProbeConfig;
    /// let config = ProbeConfig::new().with_cycles_per_us(0);
    /// assert_eq!(config.cycles_per_us, 1);
    /// ```
    pub fn with_cycles_per_us(mut self, cycles_per_us: u64) -> Self {
        self.cycles_per_us = cycles_per_us.max(1);
        self
    }

    /// Bound the number of loop iterations
    pub fn with_iterations(mut self, iterations: Option<u64>) -> Self {
        self.iterations = iterations;
        self
    }
}
