/// Source of the current time, in nanoseconds since the Unix epoch.
///
/// Every TTL decision in the cache compares against a timestamp supplied by
/// the caller; services read it from this port so tests can drive expiry
/// deterministically.
pub trait ClockPort: Send + Sync {
    fn now_ns(&self) -> u64;
}

/// Wall-clock implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_ns(&self) -> u64 {
        let elapsed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
    }
}
