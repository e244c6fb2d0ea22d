use domain::common::error::DomainError;
use domain::fqdn::entity::{FqdnSelector, SelectorMapping};

/// Primary port exposed to the policy engine.
///
/// Turns name-based selectors into the IPs currently behind them. The
/// policy engine programs the dataplane from `resolved` and decides what to
/// do with `missing` (defer enforcement, trigger a lookup, ...).
pub trait FqdnResolutionPort: Send + Sync {
    /// Resolve a selector set against the current cache contents.
    ///
    /// Fails only when a selector is invalid.
    fn resolve_selectors(&self, selectors: &[FqdnSelector]) -> Result<SelectorMapping, DomainError>;
}
