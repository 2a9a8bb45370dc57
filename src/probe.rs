//! Evict+Reload probe loop
//!
//! Each iteration times a reload of the monitored byte, flushes its line,
//! classifies the latency against the hit threshold and runs the debounce gate:
//! a hit is only reported when more than `debounce_loops` misses came
//! right before it. Every reported hit flips the two-valued key state.

use crate::config::ProbeConfig;
use crate::primitives::CachePrimitives;
use crate::report::{HitReport, ReportWriter};
use crate::target::MonitoredTarget;
use std::io::{self, Write};
use std::marker::PhantomData;
use tracing::{debug, info};

/// Result of comparing one reload latency with the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Line was resident: the victim touched it since the last eviction
    Hit,
    /// Line had to come from memory
    Miss,
}

/// Classify a reload latency (strictly below the threshold is a hit)
///
/// # Example
/// ```
/// use evict_reload::probe::{classify, Classification};
/// assert_eq!(classify(99, 100), Classification::Hit);
/// assert_eq!(classify(100, 100), Classification::Miss);
/// ```
#[inline]
pub fn classify(latency: u64, threshold: u64) -> Classification {
    if latency < threshold {
        Classification::Hit
    } else {
        Classification::Miss
    }
}

/// Timestamps around one reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub t0: u64,
    pub t1: u64,
}

impl Measurement {
    /// Reload latency in cycles
    #[inline]
    pub fn latency(&self) -> u64 {
        self.t1.wrapping_sub(self.t0)
    }
}

/// What one iteration amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Miss,
    /// Hit not preceded by more than `debounce_loops` consecutive misses
    Suppressed,
    Reported(HitReport),
}

/// Mutable state of a probe run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    start: u64,
    keystate: u8,
    kpause: u64,
}

impl RunState {
    /// Fresh state anchored at cycle count `start`
    pub fn new(start: u64) -> Self {
        Self {
            start,
            keystate: 0,
            kpause: 0,
        }
    }

    /// Current key state label (0 or 1)
    pub fn keystate(&self) -> u8 {
        self.keystate
    }

    /// Consecutive misses since the last hit
    pub fn kpause(&self) -> u64 {
        self.kpause
    }

    /// Fold one measurement into the state
    pub fn observe(&mut self, m: &Measurement, config: &ProbeConfig) -> Observation {
        let latency = m.latency();
        match classify(latency, config.threshold_cycles) {
            Classification::Miss => {
                self.kpause = self.kpause.saturating_add(1);
                Observation::Miss
            }
            Classification::Hit => {
                let observation = if self.kpause > config.debounce_loops {
                    let report = HitReport {
                        latency,
                        idle: self.kpause,
                        elapsed_us: m.t0.wrapping_sub(self.start) / config.cycles_per_us.max(1),
                        keystate: self.keystate,
                    };
                    self.keystate ^= 1;
                    Observation::Reported(report)
                } else {
                    Observation::Suppressed
                };
                self.kpause = 0;
                observation
            }
        }
    }
}

/// Counters for a bounded run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeStats {
    pub iterations: u64,
    pub misses: u64,
    pub suppressed_hits: u64,
    pub reported_hits: u64,
}

impl ProbeStats {
    fn record(&mut self, observation: &Observation) {
        self.iterations += 1;
        match observation {
            Observation::Miss => self.misses += 1,
            Observation::Suppressed => self.suppressed_hits += 1,
            Observation::Reported(_) => self.reported_hits += 1,
        }
    }

    /// Hits whether or not they passed the debounce gate
    pub fn candidate_hits(&self) -> u64 {
        self.suppressed_hits + self.reported_hits
    }
}

/// Drives evict+reload measurements against one byte
pub struct ProbeLoop<'a, P: CachePrimitives> {
    primitives: P,
    addr: *const u8,
    config: ProbeConfig,
    state: RunState,
    stats: ProbeStats,
    _line: PhantomData<&'a u8>,
}

impl<'a, P: CachePrimitives> ProbeLoop<'a, P> {
    /// Probe the byte a bootstrapped target points at
    pub fn new(target: &'a MonitoredTarget, primitives: P, config: ProbeConfig) -> Self {
        Self::from_parts(target.as_ptr(), primitives, config)
    }

    /// Probe an arbitrary byte in this process
    pub fn for_byte(line: &'a u8, primitives: P, config: ProbeConfig) -> Self {
        Self::from_parts(line as *const u8, primitives, config)
    }

    fn from_parts(addr: *const u8, mut primitives: P, config: ProbeConfig) -> Self {
        let start = primitives.rdtsc();
        debug!(?addr, start, ?config, "probe loop ready");
        Self {
            primitives,
            addr,
            config,
            state: RunState::new(start),
            stats: ProbeStats::default(),
            _line: PhantomData,
        }
    }

    /// One reload, eviction, classification and yield
    pub fn step(&mut self) -> Observation {
        let t0 = self.primitives.rdtsc_begin();
        // SAFETY: addr comes from a live borrow held for 'a
        unsafe { self.primitives.maccess(self.addr) };
        let t1 = self.primitives.rdtsc_end();
        // SAFETY: same borrow as above
        unsafe { self.primitives.evict(self.addr) };

        let observation = self.state.observe(&Measurement { t0, t1 }, &self.config);
        self.stats.record(&observation);
        self.primitives.yield_cpu();
        observation
    }

    /// Probe until the iteration bound (forever without one), writing each report
    pub fn run<W: Write>(&mut self, reports: &mut ReportWriter<W>) -> io::Result<ProbeStats> {
        let bound = self.config.iterations;
        while bound.map_or(true, |n| self.stats.iterations < n) {
            if let Observation::Reported(report) = self.step() {
                reports.write(&report)?;
            }
        }

        info!(
            iterations = self.stats.iterations,
            misses = self.stats.misses,
            suppressed = self.stats.suppressed_hits,
            reported = self.stats.reported_hits,
            "probe run finished"
        );
        Ok(self.stats)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn stats(&self) -> &ProbeStats {
        &self.stats
    }

    pub fn primitives(&self) -> &P {
        &self.primitives
    }
}
