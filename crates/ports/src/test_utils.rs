use std::sync::atomic::{AtomicU64, Ordering};

use crate::secondary::clock_port::ClockPort;

/// Manually driven clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ns: u64) -> Self {
        Self {
            now_ns: AtomicU64::new(now_ns),
        }
    }

    pub fn set_ns(&self, now_ns: u64) {
        self.now_ns.store(now_ns, Ordering::Relaxed);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.now_ns
            .fetch_add(secs * 1_000_000_000, Ordering::Relaxed);
    }
}

impl ClockPort for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::Relaxed)
    }
}
