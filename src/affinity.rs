//! Pin the probing thread to one logical CPU
//!
//! Running the probe on a fixed core (ideally a hyper-thread sibling of the
//! victim) keeps the timing baseline stable across iterations.

use nix::sched::{sched_getaffinity, sched_setaffinity, CpuSet};
use nix::unistd::Pid;
use tracing::debug;

/// Restrict the calling thread to `cpu`
pub fn pin_current_thread(cpu: usize) -> nix::Result<()> {
    let mut set = CpuSet::new();
    set.set(cpu)?;
    sched_setaffinity(Pid::from_raw(0), &set)?;
    debug!(cpu, "pinned probe thread");
    Ok(())
}

/// CPUs the calling thread may currently run on
pub fn allowed_cpus() -> nix::Result<Vec<usize>> {
    let set = sched_getaffinity(Pid::from_raw(0))?;
    Ok((0..CpuSet::count())
        .filter(|&cpu| set.is_set(cpu).unwrap_or(false))
        .collect())
}
