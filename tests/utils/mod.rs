// Fake cache primitives for driving the probe loop deterministically
//
// ScriptedLatencies replays a fixed list of reload latencies.
// SimulatedCache models one cache line shared with a victim that touches it
// on chosen iterations, with no synchronization between the two.
#![allow(dead_code)]

use evict_reload::primitives::CachePrimitives;
use std::collections::BTreeSet;

/// Cycles that pass between the end of one reload and the start of the next
pub const GAP_CYCLES: u64 = 1000;

/// Replays scripted reload latencies; runs out into slow reads
#[derive(Debug, Default)]
pub struct ScriptedLatencies {
    latencies: Vec<u64>,
    next: usize,
    clock: u64,
    pub accesses: u64,
    pub evictions: u64,
    pub yields: u64,
}

impl ScriptedLatencies {
    pub fn new(latencies: Vec<u64>) -> Self {
        Self {
            latencies,
            ..Self::default()
        }
    }

    /// `misses` slow reads followed by `hits` fast ones
    pub fn misses_then_hits(misses: usize, hits: usize) -> Self {
        let mut latencies = vec![300; misses];
        latencies.extend(std::iter::repeat(5).take(hits));
        Self::new(latencies)
    }

    pub fn len(&self) -> u64 {
        self.latencies.len() as u64
    }
}

impl CachePrimitives for ScriptedLatencies {
    fn rdtsc(&mut self) -> u64 {
        self.clock
    }

    fn rdtsc_begin(&mut self) -> u64 {
        self.clock += GAP_CYCLES;
        self.clock
    }

    fn rdtsc_end(&mut self) -> u64 {
        let latency = self.latencies.get(self.next).copied().unwrap_or(300);
        self.next += 1;
        self.clock += latency;
        self.clock
    }

    unsafe fn maccess(&mut self, _addr: *const u8) {
        self.accesses += 1;
    }

    unsafe fn evict(&mut self, _addr: *const u8) {
        self.evictions += 1;
    }

    fn yield_cpu(&mut self) {
        self.yields += 1;
    }
}

pub const WARM_CYCLES: u64 = 40;
pub const COLD_CYCLES: u64 = 250;

/// One cache line plus a victim that runs while the probe yields
#[derive(Debug)]
pub struct SimulatedCache {
    resident: bool,
    clock: u64,
    pending_latency: u64,
    iteration: u64,
    victim_runs_after: BTreeSet<u64>,
    /// Whether each reload found the line resident, in order
    pub warm_reloads: Vec<bool>,
}

impl SimulatedCache {
    /// `victim_runs_after` lists iterations whose yield lets the victim touch the line
    pub fn new(initially_resident: bool, victim_runs_after: impl IntoIterator<Item = u64>) -> Self {
        Self {
            resident: initially_resident,
            clock: 0,
            pending_latency: 0,
            iteration: 0,
            victim_runs_after: victim_runs_after.into_iter().collect(),
            warm_reloads: Vec::new(),
        }
    }

    pub fn is_resident(&self) -> bool {
        self.resident
    }
}

impl CachePrimitives for SimulatedCache {
    fn rdtsc(&mut self) -> u64 {
        self.clock
    }

    fn rdtsc_begin(&mut self) -> u64 {
        self.clock += GAP_CYCLES;
        self.clock
    }

    fn rdtsc_end(&mut self) -> u64 {
        self.clock += self.pending_latency;
        self.clock
    }

    unsafe fn maccess(&mut self, _addr: *const u8) {
        self.warm_reloads.push(self.resident);
        self.pending_latency = if self.resident { WARM_CYCLES } else { COLD_CYCLES };
        self.resident = true;
    }

    unsafe fn evict(&mut self, _addr: *const u8) {
        self.resident = false;
    }

    fn yield_cpu(&mut self) {
        if self.victim_runs_after.contains(&self.iteration) {
            self.resident = true;
        }
        self.iteration += 1;
    }
}
