//! Cycle counter, load and eviction primitives
//!
//! The probe loop only talks to the cache through [`CachePrimitives`], so the
//! classification and debounce logic can be driven by scripted fakes in tests
//! while [`HardwareProbe`] issues the real instructions.
//!
//! | arch    | timestamp              | eviction            |
//! |---------|------------------------|---------------------|
//! | x86_64  | `rdtsc` / `rdtscp`     | `clflush` + `mfence`|
//! | aarch64 | `cntvct_el0` + `isb`   | `dc civac` + `dsb`  |
//!
//! The aarch64 virtual counter ticks far slower than the core clock, so the
//! default 100 cycle threshold needs recalibrating there.

/// Micro-architectural toolkit used by the probe loop
pub trait CachePrimitives {
    /// Plain timestamp, used for the run baseline
    fn rdtsc(&mut self) -> u64;

    /// Timestamp serialized against earlier instructions (taken before the load)
    fn rdtsc_begin(&mut self) -> u64;

    /// Timestamp serialized against the preceding load (taken after it)
    fn rdtsc_end(&mut self) -> u64;

    /// Load one byte from `addr`
    ///
    /// # Safety
    ///
    /// `addr` must be valid for reads.
    unsafe fn maccess(&mut self, addr: *const u8);

    /// Flush the cache line holding `addr` from every cache level
    ///
    /// # Safety
    ///
    /// `addr` must point into mapped memory.
    unsafe fn evict(&mut self, addr: *const u8);

    /// Give up the CPU before the next iteration
    fn yield_cpu(&mut self);
}

/// The real instructions for the host architecture
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct HardwareProbe;

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
impl HardwareProbe {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_arch = "x86_64")]
impl CachePrimitives for HardwareProbe {
    #[inline(always)]
    fn rdtsc(&mut self) -> u64 {
        use core::arch::x86_64::{_mm_lfence, _rdtsc};
        unsafe {
            _mm_lfence();
            let t = _rdtsc();
            _mm_lfence();
            t
        }
    }

    #[inline(always)]
    fn rdtsc_begin(&mut self) -> u64 {
        use core::arch::x86_64::{_mm_lfence, _mm_mfence, _rdtsc};
        unsafe {
            _mm_mfence();
            _mm_lfence();
            let t = _rdtsc();
            _mm_lfence();
            t
        }
    }

    #[inline(always)]
    fn rdtsc_end(&mut self) -> u64 {
        use core::arch::x86_64::{__rdtscp, _mm_lfence};
        let mut aux = 0u32;
        unsafe {
            let t = __rdtscp(&mut aux);
            _mm_lfence();
            t
        }
    }

    #[inline(always)]
    unsafe fn maccess(&mut self, addr: *const u8) {
        // SAFETY: caller guarantees addr is readable
        let _ = unsafe { core::ptr::read_volatile(addr) };
    }

    #[inline(always)]
    unsafe fn evict(&mut self, addr: *const u8) {
        use core::arch::x86_64::{_mm_clflush, _mm_mfence};
        // SAFETY: caller guarantees addr is mapped
        unsafe {
            _mm_clflush(addr);
            _mm_mfence();
        }
    }

    #[inline(always)]
    fn yield_cpu(&mut self) {
        // sched_yield(2) always succeeds on Linux
        let _ = nix::sched::sched_yield();
    }
}

#[cfg(target_arch = "aarch64")]
impl CachePrimitives for HardwareProbe {
    #[inline(always)]
    fn rdtsc(&mut self) -> u64 {
        let t: u64;
        unsafe {
            core::arch::asm!("isb", "mrs {t}, cntvct_el0", "isb", t = out(reg) t, options(nostack));
        }
        t
    }

    #[inline(always)]
    fn rdtsc_begin(&mut self) -> u64 {
        let t: u64;
        unsafe {
            core::arch::asm!(
                "dsb ish",
                "isb",
                "mrs {t}, cntvct_el0",
                "isb",
                t = out(reg) t,
                options(nostack)
            );
        }
        t
    }

    #[inline(always)]
    fn rdtsc_end(&mut self) -> u64 {
        let t: u64;
        unsafe {
            core::arch::asm!(
                "dsb ish",
                "isb",
                "mrs {t}, cntvct_el0",
                "isb",
                t = out(reg) t,
                options(nostack)
            );
        }
        t
    }

    #[inline(always)]
    unsafe fn maccess(&mut self, addr: *const u8) {
        // SAFETY: caller guarantees addr is readable
        let _ = unsafe { core::ptr::read_volatile(addr) };
    }

    #[inline(always)]
    unsafe fn evict(&mut self, addr: *const u8) {
        // SAFETY: caller guarantees addr is mapped; DC CIVAC is enabled for EL0 on Linux
        unsafe {
            core::arch::asm!(
                "dc civac, {addr}",
                "dsb ish",
                "isb",
                addr = in(reg) addr,
                options(nostack)
            );
        }
    }

    #[inline(always)]
    fn yield_cpu(&mut self) {
        let _ = nix::sched::sched_yield();
    }
}
