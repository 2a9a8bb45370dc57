//! evict-reload - single-address Evict+Reload cache-timing probe
//!
//! Maps a file shared and read-only, then repeatedly times reloads of one byte
//! in it, flushing the line after every measurement. Fast reloads mean another
//! process touched the line in between; debounced hits are reported with a
//! toggling key-state label.

pub mod affinity;
pub mod cli;
pub mod config;
pub mod error;
pub mod primitives;
pub mod probe;
pub mod report;
pub mod target;
