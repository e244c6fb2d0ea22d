use std::net::IpAddr;

use domain::fqdn::entity::{CacheEntry, DnsCacheStats};

/// Secondary port for DNS answer ingestion and cache inspection.
///
/// Implemented by the application-layer service that wraps the domain cache.
/// Consumed by the DNS observation collaborator, which performs the actual
/// resolution and feeds every answer through [`update`](Self::update).
pub trait DnsCachePort: Send + Sync {
    /// Ingest an answer. Returns `true` when the set of currently valid IPs
    /// for `name` changed.
    fn update(&self, name: &str, ips: &[IpAddr], ttl_secs: u32) -> bool;

    /// Currently valid IPs for a name, first-inserted first.
    fn lookup(&self, name: &str) -> Vec<IpAddr>;

    /// Reverse lookup: names currently resolving to the given IP.
    fn lookup_ip(&self, ip: &IpAddr) -> Vec<String>;

    /// Every cache entry, sorted by name.
    fn dump(&self) -> Vec<CacheEntry>;

    fn stats(&self) -> DnsCacheStats;

    /// Remove all entries and reset statistics.
    fn flush(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dns_cache_port_is_object_safe() {
        fn _check(_port: &dyn DnsCachePort) {}
    }
}
