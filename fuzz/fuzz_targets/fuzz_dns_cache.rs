#![no_main]

use std::collections::HashSet;
use std::net::IpAddr;

use libfuzzer_sys::fuzz_target;

use domain::fqdn::cache::DnsCache;
use domain::fqdn::entity::DnsCacheConfig;

// Fuzz the DnsCache: updates, lookups, purges with arbitrary timing.
//
// Layout:
//   [0]    = min_ttl_secs (0–255)
//   [1]    = max_ips_per_name (0–7, 0 = unlimited)
//   rest   = consumed in 8-byte chunks as operations
//            [op, name_idx, ip_a, ip_b, ttl, dt_secs, _, _]
fuzz_target!(|data: &[u8]| {
    if data.len() < 10 {
        return;
    }

    let config = DnsCacheConfig {
        min_ttl_secs: u64::from(data[0]),
        max_ips_per_name: usize::from(data[1] % 8),
        purge_interval_secs: 30,
        shard_count: 4,
    };
    let cache = DnsCache::new(&config);
    let names = ["a.com", "b.example.org", "Cilium.IO", "x.y.z"];
    let mut now_ns: u64 = 0;

    for chunk in data[2..].chunks_exact(8) {
        now_ns += u64::from(chunk[5]) * 1_000_000_000;
        let name = names[chunk[1] as usize % names.len()];
        let ips = [
            IpAddr::from([10, 0, 0, chunk[2]]),
            IpAddr::from([10, 0, 0, chunk[3]]),
        ];

        match chunk[0] % 4 {
            0 => {
                let before: HashSet<IpAddr> = cache.lookup(now_ns, name).into_iter().collect();
                let changed = cache.update(now_ns, name, &ips, u32::from(chunk[4]));
                let after: HashSet<IpAddr> = cache.lookup(now_ns, name).into_iter().collect();
                assert_eq!(changed, before != after);
            }
            1 => {
                let before = cache.lookup(now_ns, name);
                cache.purge_expired(now_ns);
                assert_eq!(cache.lookup(now_ns, name), before);
            }
            2 => {
                let ips = cache.lookup(now_ns, name);
                let unique: HashSet<&IpAddr> = ips.iter().collect();
                assert_eq!(unique.len(), ips.len());
                if config.max_ips_per_name > 0 {
                    assert!(ips.len() <= config.max_ips_per_name);
                }
            }
            _ => {
                for ip in cache.lookup(now_ns, name) {
                    assert!(!cache.lookup_ip(now_ns, &ip).is_empty());
                }
            }
        }
    }
});
