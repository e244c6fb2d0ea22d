use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasher, RandomState};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::entity::{CacheEntry, DnsCacheConfig, DnsCacheStats, NANOS_PER_SEC};
use super::name::prepare_match_name;

type NameMap = HashMap<String, NameEntries>;
type Shard = RwLock<NameMap>;

/// Entries observed for one name: one per distinct IP, in first-insertion
/// order.
#[derive(Debug, Default)]
struct NameEntries {
    entries: Vec<CacheEntry>,
}

impl NameEntries {
    fn valid_ips(&self, now_ns: u64) -> Vec<IpAddr> {
        self.entries
            .iter()
            .filter(|e| e.is_valid_at(now_ns))
            .map(|e| e.ip)
            .collect()
    }

    fn valid_set(&self, now_ns: u64) -> HashSet<IpAddr> {
        self.entries
            .iter()
            .filter(|e| e.is_valid_at(now_ns))
            .map(|e| e.ip)
            .collect()
    }

    fn has_valid(&self, ip: &IpAddr, now_ns: u64) -> bool {
        self.entries
            .iter()
            .any(|e| e.ip == *ip && e.is_valid_at(now_ns))
    }

    /// Insert a new IP or refresh an existing one. The expiry of an existing
    /// IP never moves backward.
    fn upsert(&mut self, entry: CacheEntry) {
        match self.entries.iter_mut().find(|e| e.ip == entry.ip) {
            Some(existing) => {
                if entry.expires_at_ns > existing.expires_at_ns {
                    *existing = entry;
                }
            }
            None => self.entries.push(entry),
        }
    }

    fn remove_expired(&mut self, now_ns: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.is_valid_at(now_ns));
        before - self.entries.len()
    }

    /// Evict the entries closest to expiry until at most `limit` remain.
    /// A limit of zero means unlimited.
    fn enforce_limit(&mut self, limit: usize) -> usize {
        if limit == 0 {
            return 0;
        }
        let mut evicted = 0;
        while self.entries.len() > limit {
            let Some(idx) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.expires_at_ns)
                .map(|(idx, _)| idx)
            else {
                break;
            };
            self.entries.remove(idx);
            evicted += 1;
        }
        evicted
    }
}

/// TTL-governed cache of observed DNS answers, keyed by normalized name.
///
/// Validity is decided by comparing expiry timestamps with the caller's
/// `now` at read time; [`purge_expired`](Self::purge_expired) only reclaims
/// memory and never changes what a lookup returns.
///
/// Thread safety: names are spread over independently locked shards. Reads
/// of one name take a shard read lock, updates a shard write lock; full
/// scans visit one shard at a time.
pub struct DnsCache {
    shards: Box<[Shard]>,
    hasher: RandomState,
    min_ttl_secs: u64,
    max_ips_per_name: usize,
    purged_count: AtomicU64,
    evicted_count: AtomicU64,
    forced_expiry_count: AtomicU64,
}

impl DnsCache {
    pub fn new(config: &DnsCacheConfig) -> Self {
        let shard_count = config.shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| RwLock::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
            min_ttl_secs: config.min_ttl_secs,
            max_ips_per_name: config.max_ips_per_name,
            purged_count: AtomicU64::new(0),
            evicted_count: AtomicU64::new(0),
            forced_expiry_count: AtomicU64::new(0),
        }
    }

    /// Cache with default settings and the given TTL floor.
    pub fn with_min_ttl(min_ttl_secs: u64) -> Self {
        Self::new(&DnsCacheConfig {
            min_ttl_secs,
            ..DnsCacheConfig::default()
        })
    }

    pub fn min_ttl_secs(&self) -> u64 {
        self.min_ttl_secs
    }

    /// Ingest a DNS answer for `name`.
    ///
    /// Every IP gets `expires_at = now + max(ttl_secs, min_ttl)`. Returns
    /// `true` when the set of currently valid IPs for `name` differs from
    /// the set before the call; extending an expiry alone is not a change.
    /// Other names are left untouched.
    pub fn update(&self, now_ns: u64, name: &str, ips: &[IpAddr], ttl_secs: u32) -> bool {
        if ips.is_empty() {
            return false;
        }

        let name = prepare_match_name(name);
        let expires_at_ns = self.expires_at(now_ns, ttl_secs);

        let mut shard = write(self.shard(&name));
        let entries = shard.entry(name.clone()).or_default();
        let before = entries.valid_set(now_ns);
        for ip in ips {
            entries.upsert(CacheEntry {
                name: name.clone(),
                ip: *ip,
                ttl_secs,
                inserted_at_ns: now_ns,
                expires_at_ns,
            });
        }
        let evicted = entries.enforce_limit(self.max_ips_per_name);
        let after = entries.valid_set(now_ns);
        drop(shard);

        if evicted > 0 {
            self.evicted_count.fetch_add(evicted as u64, Ordering::Relaxed);
        }
        before != after
    }

    /// Currently valid IPs for `name`, first-inserted first.
    pub fn lookup(&self, now_ns: u64, name: &str) -> Vec<IpAddr> {
        self.lookup_prepared(now_ns, &prepare_match_name(name))
    }

    /// Same as [`lookup`](Self::lookup) for a name that is already
    /// normalized.
    pub(crate) fn lookup_prepared(&self, now_ns: u64, name: &str) -> Vec<IpAddr> {
        read(self.shard(name))
            .get(name)
            .map(|entries| entries.valid_ips(now_ns))
            .unwrap_or_default()
    }

    /// Reverse lookup: names currently resolving to `ip`, sorted.
    pub fn lookup_ip(&self, now_ns: u64, ip: &IpAddr) -> Vec<String> {
        let mut names = Vec::new();
        for shard in self.shards.iter() {
            let shard = read(shard);
            names.extend(
                shard
                    .iter()
                    .filter(|(_, entries)| entries.has_valid(ip, now_ns))
                    .map(|(name, _)| name.clone()),
            );
        }
        names.sort();
        names
    }

    /// Every name held by the cache, sorted. Names whose entries have all
    /// expired but were not purged yet are included.
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for shard in self.shards.iter() {
            names.extend(read(shard).keys().cloned());
        }
        names.sort();
        names
    }

    pub fn name_count(&self) -> usize {
        self.shards.iter().map(|shard| read(shard).len()).sum()
    }

    /// Remove entries that expired at or before `now_ns` and drop names left
    /// without entries. Returns the number of removed entries.
    pub fn purge_expired(&self, now_ns: u64) -> usize {
        let mut purged = 0;
        for shard in self.shards.iter() {
            write(shard).retain(|_, entries| {
                purged += entries.remove_expired(now_ns);
                !entries.entries.is_empty()
            });
        }
        self.purged_count.fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    /// Drop entries inserted before `inserted_before_ns` for every name
    /// accepted by `name_matches`, regardless of their expiry.
    ///
    /// Returns the names that lost at least one entry, sorted.
    pub fn force_expire<F>(&self, inserted_before_ns: u64, name_matches: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut affected = Vec::new();
        let mut removed = 0;
        for shard in self.shards.iter() {
            write(shard).retain(|name, entries| {
                if !name_matches(name) {
                    return true;
                }
                let before = entries.entries.len();
                entries
                    .entries
                    .retain(|e| e.inserted_at_ns >= inserted_before_ns);
                let dropped = before - entries.entries.len();
                if dropped > 0 {
                    affected.push(name.clone());
                    removed += dropped;
                }
                !entries.entries.is_empty()
            });
        }
        self.forced_expiry_count.fetch_add(removed as u64, Ordering::Relaxed);
        affected.sort();
        affected
    }

    /// Copy every entry of `other` into this cache, keeping the later
    /// expiry when both hold the same name and IP.
    pub fn merge_from(&self, other: &DnsCache) {
        let mut evicted = 0;
        for entry in other.dump() {
            let mut shard = write(self.shard(&entry.name));
            let entries = shard.entry(entry.name.clone()).or_default();
            entries.upsert(entry);
            evicted += entries.enforce_limit(self.max_ips_per_name);
        }
        if evicted > 0 {
            self.evicted_count.fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    /// All entries, sorted by name and then by insertion order.
    pub fn dump(&self) -> Vec<CacheEntry> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            for entries in read(shard).values() {
                out.extend(entries.entries.iter().cloned());
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn stats(&self) -> DnsCacheStats {
        let mut total_names = 0;
        let mut total_entries = 0;
        for shard in self.shards.iter() {
            let shard = read(shard);
            total_names += shard.len();
            total_entries += shard.values().map(|e| e.entries.len()).sum::<usize>();
        }
        DnsCacheStats {
            total_names,
            total_entries,
            purged_count: self.purged_count.load(Ordering::Relaxed),
            evicted_count: self.evicted_count.load(Ordering::Relaxed),
            forced_expiry_count: self.forced_expiry_count.load(Ordering::Relaxed),
        }
    }

    /// Remove all entries and reset statistics.
    pub fn flush(&self) {
        for shard in self.shards.iter() {
            write(shard).clear();
        }
        self.purged_count.store(0, Ordering::Relaxed);
        self.evicted_count.store(0, Ordering::Relaxed);
        self.forced_expiry_count.store(0, Ordering::Relaxed);
    }

    fn expires_at(&self, now_ns: u64, ttl_secs: u32) -> u64 {
        let ttl = u64::from(ttl_secs).max(self.min_ttl_secs).max(1);
        now_ns.saturating_add(ttl.saturating_mul(NANOS_PER_SEC))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn shard(&self, name: &str) -> &Shard {
        let idx = self.hasher.hash_one(name) as usize % self.shards.len();
        &self.shards[idx]
    }
}

impl Default for DnsCache {
    fn default() -> Self {
        Self::new(&DnsCacheConfig::default())
    }
}

fn read(shard: &Shard) -> RwLockReadGuard<'_, NameMap> {
    shard.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(shard: &Shard) -> RwLockWriteGuard<'_, NameMap> {
    shard.write().unwrap_or_else(PoisonError::into_inner)
}
