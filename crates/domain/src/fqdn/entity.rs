use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::name::{prepare_match_name, prepare_match_pattern};

pub(crate) const NANOS_PER_SEC: u64 = 1_000_000_000;

// ── Selectors ──────────────────────────────────────────────────────

/// A name-based rule selecting which DNS-observed IPs a policy applies to.
///
/// Two selectors with the same variant and the same canonical text are
/// equal and collapse to one key in a map or set. The constructors and
/// deserialization both canonicalize; a variant built by hand can be
/// brought to canonical form with [`canonical`](Self::canonical).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawSelector")]
pub enum FqdnSelector {
    /// Exact name match, e.g. `cilium.io`.
    MatchName(String),
    /// Wildcard pattern where `*` matches any sequence of characters,
    /// e.g. `*.cilium.io`.
    MatchPattern(String),
}

impl FqdnSelector {
    /// Build an exact-name selector from any spelling of the name.
    pub fn name(name: &str) -> Self {
        Self::MatchName(prepare_match_name(name))
    }

    /// Build a wildcard-pattern selector.
    pub fn pattern(pattern: &str) -> Self {
        Self::MatchPattern(prepare_match_pattern(pattern))
    }

    /// The name or pattern text carried by the selector.
    pub fn as_str(&self) -> &str {
        match self {
            Self::MatchName(s) | Self::MatchPattern(s) => s,
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::MatchPattern(_))
    }

    /// The same selector with its text normalized.
    #[must_use]
    pub fn canonical(&self) -> Self {
        match self {
            Self::MatchName(n) => Self::name(n),
            Self::MatchPattern(p) => Self::pattern(p),
        }
    }
}

/// Wire form of a selector, before normalization.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
enum RawSelector {
    MatchName(String),
    MatchPattern(String),
}

impl From<RawSelector> for FqdnSelector {
    fn from(raw: RawSelector) -> Self {
        match raw {
            RawSelector::MatchName(n) => Self::name(&n),
            RawSelector::MatchPattern(p) => Self::pattern(&p),
        }
    }
}

impl fmt::Display for FqdnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchName(n) => write!(f, "matchName: {n}"),
            Self::MatchPattern(p) => write!(f, "matchPattern: {p}"),
        }
    }
}

/// Result of resolving a selector set against the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorMapping {
    /// Selectors with no currently valid IP, in selector order.
    pub missing: Vec<FqdnSelector>,
    /// Selectors with at least one currently valid IP. IPs are distinct and
    /// ordered by first appearance.
    pub resolved: HashMap<FqdnSelector, Vec<IpAddr>>,
}

// ── Cache entities ─────────────────────────────────────────────────

/// Configuration for the DNS answer cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsCacheConfig {
    /// Floor applied to every answer's TTL.
    pub min_ttl_secs: u64,
    /// Maximum IPs retained per name; `0` disables the limit.
    pub max_ips_per_name: usize,
    pub purge_interval_secs: u64,
    /// Number of independently locked shards.
    pub shard_count: usize,
}

impl Default for DnsCacheConfig {
    fn default() -> Self {
        Self {
            min_ttl_secs: 3600,
            max_ips_per_name: 50,
            purge_interval_secs: 30,
            shard_count: 16,
        }
    }
}

/// One observed DNS answer record for a single IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub name: String,
    pub ip: IpAddr,
    /// TTL as reported by the answer, before the minimum TTL floor.
    pub ttl_secs: u32,
    pub inserted_at_ns: u64,
    pub expires_at_ns: u64,
}

impl CacheEntry {
    /// Whether the entry is still valid at `now_ns`.
    pub fn is_valid_at(&self, now_ns: u64) -> bool {
        self.expires_at_ns > now_ns
    }
}

/// Aggregated statistics for the DNS cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsCacheStats {
    pub total_names: usize,
    /// Entries physically held, expired or not.
    pub total_entries: usize,
    pub purged_count: u64,
    pub evicted_count: u64,
    pub forced_expiry_count: u64,
}
