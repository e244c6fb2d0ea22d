use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::IpAddr;

use super::cache::DnsCache;
use super::entity::{FqdnSelector, SelectorMapping};
use super::error::FqdnError;
use super::matcher::{CompiledSelector, SelectorMatcher};

/// IPs collected for one selector, distinct and in first-seen order.
#[derive(Default)]
struct IpList {
    ips: Vec<IpAddr>,
    seen: HashSet<IpAddr>,
}

impl IpList {
    fn extend(&mut self, ips: &[IpAddr]) {
        for ip in ips {
            if self.seen.insert(*ip) {
                self.ips.push(*ip);
            }
        }
    }
}

/// Resolve `selectors` into the IPs currently valid in `cache`.
///
/// Selectors are keyed by their canonical form, so spellings of the same
/// rule collapse into one entry. Every selector is compiled before any
/// matching, so an invalid selector fails the whole call without a partial
/// mapping. Cached names are visited in sorted order and each is looked up
/// once, which keeps the per-selector IP order deterministic.
///
/// Selectors with no currently valid IP are listed in `missing` and absent
/// from `resolved`.
pub fn map_selectors_to_ips<'a, I>(
    selectors: I,
    cache: &DnsCache,
    matcher: &SelectorMatcher,
    now_ns: u64,
) -> Result<SelectorMapping, FqdnError>
where
    I: IntoIterator<Item = &'a FqdnSelector>,
{
    let selectors: BTreeSet<FqdnSelector> =
        selectors.into_iter().map(FqdnSelector::canonical).collect();
    let compiled = selectors
        .iter()
        .map(|sel| Ok((sel, matcher.compile(sel)?)))
        .collect::<Result<Vec<(&FqdnSelector, CompiledSelector)>, FqdnError>>()?;

    let mut collected: HashMap<&FqdnSelector, IpList> = HashMap::new();
    for name in cache.names() {
        let ips = cache.lookup_prepared(now_ns, &name);
        if ips.is_empty() {
            continue;
        }
        for (selector, compiled) in &compiled {
            if compiled.matches(&name) {
                collected.entry(*selector).or_default().extend(&ips);
            }
        }
    }

    let resolved: HashMap<FqdnSelector, Vec<IpAddr>> = collected
        .into_iter()
        .map(|(sel, list)| (sel.clone(), list.ips))
        .collect();
    let missing = selectors
        .iter()
        .filter(|sel| !resolved.contains_key(*sel))
        .cloned()
        .collect();

    Ok(SelectorMapping { missing, resolved })
}
