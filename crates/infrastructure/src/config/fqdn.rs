//! FQDN cache configuration structs and conversion logic.

use serde::{Deserialize, Serialize};

use super::common::{ConfigError, check_range};

/// Upper bound for the TTL floor (one day).
const MAX_MIN_TTL_SECS: u64 = 86_400;
/// Upper bound for the purge interval (one hour).
const MAX_PURGE_INTERVAL_SECS: u64 = 3_600;
const MAX_IPS_PER_NAME: usize = 10_000;
const MAX_SHARD_COUNT: usize = 1_024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FqdnConfig {
    #[serde(default)]
    pub cache: FqdnCacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FqdnCacheConfig {
    /// Floor applied to every DNS answer's TTL.
    #[serde(default = "default_min_ttl")]
    pub min_ttl_secs: u64,

    /// Maximum IPs retained per name (0 = unlimited).
    #[serde(default = "default_max_ips_per_name")]
    pub max_ips_per_name: usize,

    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,

    #[serde(default = "default_shard_count")]
    pub shard_count: usize,
}

impl Default for FqdnCacheConfig {
    fn default() -> Self {
        Self {
            min_ttl_secs: default_min_ttl(),
            max_ips_per_name: default_max_ips_per_name(),
            purge_interval_secs: default_purge_interval(),
            shard_count: default_shard_count(),
        }
    }
}

impl FqdnCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "fqdn.cache.min_ttl_secs",
            self.min_ttl_secs,
            0,
            MAX_MIN_TTL_SECS,
        )?;
        check_range(
            "fqdn.cache.max_ips_per_name",
            self.max_ips_per_name,
            0,
            MAX_IPS_PER_NAME,
        )?;
        check_range(
            "fqdn.cache.purge_interval_secs",
            self.purge_interval_secs,
            1,
            MAX_PURGE_INTERVAL_SECS,
        )?;
        check_range(
            "fqdn.cache.shard_count",
            self.shard_count,
            1,
            MAX_SHARD_COUNT,
        )?;
        Ok(())
    }
}

impl FqdnConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()
    }

    pub fn to_domain_cache_config(&self) -> domain::fqdn::entity::DnsCacheConfig {
        domain::fqdn::entity::DnsCacheConfig {
            min_ttl_secs: self.cache.min_ttl_secs,
            max_ips_per_name: self.cache.max_ips_per_name,
            purge_interval_secs: self.cache.purge_interval_secs,
            shard_count: self.cache.shard_count,
        }
    }
}

fn default_min_ttl() -> u64 {
    3600
}
fn default_max_ips_per_name() -> usize {
    50
}
fn default_purge_interval() -> u64 {
    30
}
fn default_shard_count() -> usize {
    16
}
