use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use domain::common::error::DomainError;
use domain::fqdn::cache::DnsCache;
use domain::fqdn::entity::{
    CacheEntry, DnsCacheConfig, DnsCacheStats, FqdnSelector, SelectorMapping,
};
use domain::fqdn::matcher::SelectorMatcher;
use domain::fqdn::resolver::map_selectors_to_ips;
use ports::primary::fqdn_resolution_port::FqdnResolutionPort;
use ports::secondary::clock_port::ClockPort;
use ports::secondary::dns_cache_port::DnsCachePort;
use tokio_util::sync::CancellationToken;

/// Application-level FQDN cache service.
///
/// Owns the shared `DnsCache` and `SelectorMatcher`, stamps every call with
/// the injected clock, and exposes the cache to the DNS observation side
/// (`DnsCachePort`) and to the policy engine (`FqdnResolutionPort`). Both
/// domain types synchronize internally, so the service holds no lock of its
/// own.
pub struct FqdnCacheAppService {
    cache: Arc<DnsCache>,
    matcher: SelectorMatcher,
    clock: Arc<dyn ClockPort>,
    purge_interval: Duration,
}

impl FqdnCacheAppService {
    pub fn new(config: &DnsCacheConfig, clock: Arc<dyn ClockPort>) -> Self {
        Self::with_cache(Arc::new(DnsCache::new(config)), config, clock)
    }

    /// Build the service around an existing cache handle.
    pub fn with_cache(
        cache: Arc<DnsCache>,
        config: &DnsCacheConfig,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            cache,
            matcher: SelectorMatcher::new(),
            clock,
            purge_interval: Duration::from_secs(config.purge_interval_secs.max(1)),
        }
    }

    /// Shared handle to the underlying cache.
    pub fn cache(&self) -> Arc<DnsCache> {
        Arc::clone(&self.cache)
    }

    /// Run the background purge loop until `cancel_token` fires. Call this
    /// from a spawned Tokio task.
    pub async fn purge_loop(self: Arc<Self>, cancel_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.purge_interval);
        loop {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                _ = interval.tick() => {
                    self.purge_expired();
                }
            }
        }
        tracing::debug!("fqdn cache purge loop stopped");
    }

    /// Reclaim expired entries. Returns the number of removed entries.
    pub fn purge_expired(&self) -> usize {
        let purged = self.cache.purge_expired(self.clock.now_ns());
        if purged > 0 {
            tracing::debug!(
                purged,
                remaining_names = self.cache.name_count(),
                "fqdn cache purge complete"
            );
        }
        purged
    }

    /// Drop entries inserted before `inserted_before_ns`, optionally only
    /// for names matched by `selector`. Returns the affected names.
    pub fn force_expire(
        &self,
        inserted_before_ns: u64,
        selector: Option<&FqdnSelector>,
    ) -> Result<Vec<String>, DomainError> {
        let affected = match selector {
            Some(selector) => {
                let compiled = self.matcher.compile(selector)?;
                self.cache.force_expire(inserted_before_ns, |name| compiled.matches(name))
            }
            None => self.cache.force_expire(inserted_before_ns, |_| true),
        };
        if !affected.is_empty() {
            tracing::info!(names = affected.len(), "fqdn cache entries force-expired");
        }
        Ok(affected)
    }

    /// Merge the entries of another cache, e.g. one rebuilt elsewhere.
    pub fn merge_from(&self, other: &DnsCache) {
        self.cache.merge_from(other);
        tracing::debug!(names = self.cache.name_count(), "fqdn cache merged");
    }
}

impl DnsCachePort for FqdnCacheAppService {
    fn update(&self, name: &str, ips: &[IpAddr], ttl_secs: u32) -> bool {
        let changed = self.cache.update(self.clock.now_ns(), name, ips, ttl_secs);
        if changed {
            tracing::debug!(name, ips = ips.len(), ttl_secs, "fqdn cache changed");
        }
        changed
    }

    fn lookup(&self, name: &str) -> Vec<IpAddr> {
        self.cache.lookup(self.clock.now_ns(), name)
    }

    fn lookup_ip(&self, ip: &IpAddr) -> Vec<String> {
        self.cache.lookup_ip(self.clock.now_ns(), ip)
    }

    fn dump(&self) -> Vec<CacheEntry> {
        self.cache.dump()
    }

    fn stats(&self) -> DnsCacheStats {
        self.cache.stats()
    }

    fn flush(&self) {
        self.cache.flush();
        tracing::info!("fqdn cache flushed");
    }
}

impl FqdnResolutionPort for FqdnCacheAppService {
    fn resolve_selectors(
        &self,
        selectors: &[FqdnSelector],
    ) -> Result<SelectorMapping, DomainError> {
        let mapping = map_selectors_to_ips(
            selectors,
            &self.cache,
            &self.matcher,
            self.clock.now_ns(),
        )
        .inspect_err(|e| tracing::warn!(error = %e, "fqdn selector resolution rejected"))?;

        if !mapping.missing.is_empty() {
            tracing::debug!(
                missing = mapping.missing.len(),
                resolved = mapping.resolved.len(),
                "fqdn selectors without current IPs"
            );
        }
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ports::test_utils::ManualClock;

    const START_NS: u64 = 1_000 * 1_000_000_000;

    fn make_service() -> (FqdnCacheAppService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START_NS));
        let svc = FqdnCacheAppService::new(
            &DnsCacheConfig {
                min_ttl_secs: 60,
                max_ips_per_name: 50,
                purge_interval_secs: 30,
                shard_count: 4,
            },
            Arc::clone(&clock) as Arc<dyn ClockPort>,
        );
        (svc, clock)
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn update_and_lookup() {
        let (svc, _) = make_service();
        assert!(svc.update("example.com", &[ip("1.2.3.4")], 300));
        assert!(!svc.update("example.com", &[ip("1.2.3.4")], 300));
        assert_eq!(svc.lookup("example.com"), vec![ip("1.2.3.4")]);
    }

    #[test]
    fn expiry_follows_clock() {
        let (svc, clock) = make_service();
        svc.update("short.com", &[ip("1.1.1.1")], 5);

        clock.advance_secs(59);
        assert_eq!(svc.lookup("short.com"), vec![ip("1.1.1.1")]);

        clock.advance_secs(1);
        assert!(svc.lookup("short.com").is_empty());
        assert_eq!(svc.purge_expired(), 1);
        assert_eq!(svc.stats().total_names, 0);
    }

    #[test]
    fn reverse_lookup() {
        let (svc, _) = make_service();
        svc.update("a.com", &[ip("10.0.0.1")], 300);
        svc.update("b.com", &[ip("10.0.0.1")], 300);
        assert_eq!(
            svc.lookup_ip(&ip("10.0.0.1")),
            vec!["a.com.".to_string(), "b.com.".to_string()]
        );
    }

    #[test]
    fn resolve_selectors_through_port() {
        let (svc, clock) = make_service();
        svc.update("cilium.io", &[ip("1.2.3.4")], 100);
        svc.update("www.cilium.io", &[ip("1.2.3.5")], 100);

        let name = FqdnSelector::name("cilium.io");
        let pattern = FqdnSelector::pattern("*.cilium.io");
        let absent = FqdnSelector::name("absent.io");
        let port: &dyn FqdnResolutionPort = &svc;

        let mapping = port
            .resolve_selectors(&[name.clone(), pattern.clone(), absent.clone()])
            .unwrap();
        assert_eq!(mapping.resolved[&name], vec![ip("1.2.3.4")]);
        assert_eq!(mapping.resolved[&pattern], vec![ip("1.2.3.5")]);
        assert_eq!(mapping.missing, vec![absent]);

        clock.advance_secs(100);
        let mapping = port.resolve_selectors(&[name.clone()]).unwrap();
        assert_eq!(mapping.missing, vec![name]);
    }

    #[test]
    fn invalid_selector_is_a_domain_error() {
        let (svc, _) = make_service();
        let err = svc
            .resolve_selectors(&[FqdnSelector::pattern("bad[pattern")])
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidSelector(_)));
    }

    #[test]
    fn force_expire_with_selector() {
        let (svc, clock) = make_service();
        svc.update("a.cilium.io", &[ip("1.1.1.1")], 3600);
        svc.update("other.com", &[ip("2.2.2.2")], 3600);
        clock.advance_secs(10);

        let affected = svc
            .force_expire(clock.now_ns(), Some(&FqdnSelector::pattern("*.cilium.io")))
            .unwrap();
        assert_eq!(affected, vec!["a.cilium.io.".to_string()]);
        assert!(svc.lookup("a.cilium.io").is_empty());
        assert_eq!(svc.lookup("other.com"), vec![ip("2.2.2.2")]);

        let affected = svc.force_expire(clock.now_ns(), None).unwrap();
        assert_eq!(affected, vec!["other.com.".to_string()]);
    }

    #[test]
    fn force_expire_rejects_invalid_selector() {
        let (svc, _) = make_service();
        assert!(svc
            .force_expire(START_NS, Some(&FqdnSelector::name("")))
            .is_err());
    }

    #[test]
    fn merge_and_dump() {
        let (svc, _) = make_service();
        let other = DnsCache::with_min_ttl(60);
        other.update(START_NS, "restored.com", &[ip("9.9.9.9")], 300);

        svc.merge_from(&other);
        let dump = svc.dump();
        assert_eq!(dump.len(), 1);
        assert_eq!(dump[0].name, "restored.com.");
        assert_eq!(svc.lookup("restored.com"), vec![ip("9.9.9.9")]);
    }

    #[test]
    fn shared_cache_handle() {
        let (svc, _) = make_service();
        let cache = svc.cache();
        svc.update("a.com", &[ip("1.1.1.1")], 300);
        assert_eq!(cache.name_count(), 1);
    }

    #[test]
    fn stats_and_flush() {
        let (svc, _) = make_service();
        svc.update("x.com", &[ip("1.1.1.1")], 300);
        assert_eq!(svc.stats().total_entries, 1);

        svc.flush();
        assert_eq!(svc.stats().total_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_loop_purges_on_every_interval_and_stops_on_cancel() {
        let (svc, clock) = make_service();
        let svc = Arc::new(svc);
        svc.update("a.com", &[ip("1.1.1.1")], 10);
        clock.advance_secs(120);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&svc).purge_loop(cancel.clone()));

        // The first interval tick fires immediately.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(svc.stats().total_names, 0);

        svc.update("b.com", &[ip("2.2.2.2")], 10);
        clock.advance_secs(120);

        // Expired but not yet reclaimed: the next tick is at 30s.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(svc.stats().total_names, 1);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(svc.stats().total_names, 0);
        assert_eq!(svc.stats().purged_count, 2);

        cancel.cancel();
        handle.await.unwrap();
    }
}
