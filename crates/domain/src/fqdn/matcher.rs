use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;

use super::entity::FqdnSelector;
use super::error::FqdnError;
use super::name::{MAX_NAME_LENGTH, prepare_match_name, prepare_match_pattern};

/// Regex NFA size limit (same as DLP/L7 patterns).
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Regex nesting depth limit (same as DLP/L7 patterns).
const REGEX_NEST_LIMIT: u32 = 200;

/// A selector ready to be matched against normalized names.
#[derive(Debug, Clone)]
pub enum CompiledSelector {
    /// Normalized literal name.
    Name(String),
    /// Anchored, case-insensitive regex shared with the matcher's cache.
    Pattern(Arc<Regex>),
}

impl CompiledSelector {
    /// Test a name that has already been through `prepare_match_name`.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Name(expected) => name == expected,
            Self::Pattern(re) => re.is_match(name),
        }
    }
}

/// Matches FQDN selectors against cached names.
///
/// Wildcard patterns are compiled once per distinct pattern text and the
/// compiled regex is shared by every later match. The cache is internally
/// locked so one matcher can serve concurrent resolutions.
pub struct SelectorMatcher {
    patterns: RwLock<HashMap<String, Arc<Regex>>>,
}

impl SelectorMatcher {
    pub fn new() -> Self {
        Self {
            patterns: RwLock::new(HashMap::new()),
        }
    }

    /// Validate a selector and turn it into its compiled form.
    pub fn compile(&self, selector: &FqdnSelector) -> Result<CompiledSelector, FqdnError> {
        match selector {
            FqdnSelector::MatchName(name) => {
                let name = prepare_match_name(name);
                check_length(&name)?;
                check_text(selector, &name).map_err(|reason| FqdnError::InvalidSelector {
                    selector: selector.to_string(),
                    reason,
                })?;
                Ok(CompiledSelector::Name(name))
            }
            FqdnSelector::MatchPattern(pattern) => {
                let pattern = prepare_match_pattern(pattern);
                check_length(&pattern)?;
                check_text(selector, &pattern).map_err(|reason| FqdnError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason,
                })?;
                Ok(CompiledSelector::Pattern(self.compiled_pattern(&pattern)?))
            }
        }
    }

    /// Whether `selector` matches `name`. The name may be in any spelling.
    pub fn matches(&self, selector: &FqdnSelector, name: &str) -> Result<bool, FqdnError> {
        Ok(self.compile(selector)?.matches(&prepare_match_name(name)))
    }

    /// Number of distinct patterns compiled so far.
    pub fn cached_pattern_count(&self) -> usize {
        self.patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn compiled_pattern(&self, pattern: &str) -> Result<Arc<Regex>, FqdnError> {
        let cached = self
            .patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pattern)
            .cloned();
        if let Some(re) = cached {
            return Ok(re);
        }

        // Compile outside the lock; a concurrent compile of the same pattern
        // keeps whichever regex was inserted first.
        let re = Arc::new(compile_pattern(pattern)?);
        let mut patterns = self
            .patterns
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(patterns.entry(pattern.to_string()).or_insert(re)))
    }
}

impl Default for SelectorMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SelectorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorMatcher")
            .field("cached_patterns", &self.cached_pattern_count())
            .finish()
    }
}

fn check_length(normalized: &str) -> Result<(), FqdnError> {
    if normalized.len() > MAX_NAME_LENGTH {
        return Err(FqdnError::NameTooLong {
            length: normalized.len(),
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(())
}

/// Check the normalized text of a selector: non-empty, DNS characters
/// only, `*` reserved to patterns.
fn check_text(selector: &FqdnSelector, normalized: &str) -> Result<(), String> {
    if selector.as_str().trim().trim_end_matches('.').is_empty() {
        return Err("must not be empty".to_string());
    }
    let allow_wildcard = selector.is_pattern();
    if let Some(bad) = normalized.chars().find(|&c| {
        !(c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || c == '-'
            || c == '_'
            || c == '.'
            || (allow_wildcard && c == '*'))
    }) {
        return Err(format!("invalid character '{bad}'"));
    }
    Ok(())
}

/// Translate a wildcard pattern into an anchored regex: `*` matches any
/// sequence of characters, everything else is literal.
fn pattern_to_regex(pattern: &str) -> String {
    let mut re = String::with_capacity(pattern.len() * 2 + 2);
    re.push('^');
    for (idx, literal) in pattern.split('*').enumerate() {
        if idx > 0 {
            re.push_str(".*");
        }
        re.push_str(&regex::escape(literal));
    }
    re.push('$');
    re
}

fn compile_pattern(pattern: &str) -> Result<Regex, FqdnError> {
    regex::RegexBuilder::new(&pattern_to_regex(pattern))
        .case_insensitive(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .nest_limit(REGEX_NEST_LIMIT)
        .build()
        .map_err(|e| FqdnError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: format!("invalid regex: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(selector: &FqdnSelector, name: &str) -> bool {
        SelectorMatcher::new().matches(selector, name).unwrap()
    }

    // ── Exact names ─────────────────────────────────────────────────

    #[test]
    fn exact_matches_same_name() {
        assert!(matches(&FqdnSelector::name("cilium.io"), "cilium.io"));
    }

    #[test]
    fn exact_ignores_case_and_trailing_dot() {
        let sel = FqdnSelector::name("Cilium.IO");
        assert!(matches(&sel, "cilium.io."));
        assert!(matches(&sel, "CILIUM.io"));
    }

    #[test]
    fn exact_does_not_match_subdomain() {
        assert!(!matches(&FqdnSelector::name("cilium.io"), "www.cilium.io"));
    }

    #[test]
    fn raw_variant_is_normalized_too() {
        let sel = FqdnSelector::MatchName("Cilium.io".to_string());
        assert!(matches(&sel, "cilium.io."));
    }

    // ── Patterns ────────────────────────────────────────────────────

    #[test]
    fn prefix_wildcard_matches_subdomains_only() {
        let sel = FqdnSelector::pattern("*.cilium.io");
        assert!(matches(&sel, "www.cilium.io"));
        assert!(matches(&sel, "a.b.cilium.io"));
        assert!(!matches(&sel, "cilium.io"));
        assert!(!matches(&sel, "notcilium.io"));
    }

    #[test]
    fn bare_prefix_wildcard_matches_apex_and_subdomains() {
        let sel = FqdnSelector::pattern("*cilium.io");
        assert!(matches(&sel, "cilium.io"));
        assert!(matches(&sel, "www.cilium.io"));
        assert!(matches(&sel, "sub-cilium.io"));
    }

    #[test]
    fn wildcard_matches_empty_sequence() {
        let sel = FqdnSelector::pattern("api*.cilium.io");
        assert!(matches(&sel, "api.cilium.io"));
        assert!(matches(&sel, "api-eu.cilium.io"));
    }

    #[test]
    fn inner_wildcard() {
        let sel = FqdnSelector::pattern("api.*.example.com");
        assert!(matches(&sel, "api.eu.example.com"));
        assert!(!matches(&sel, "www.eu.example.com"));
    }

    #[test]
    fn lone_wildcard_matches_everything() {
        let sel = FqdnSelector::pattern("*");
        assert!(matches(&sel, "cilium.io"));
        assert!(matches(&sel, "a.b.c.d"));
    }

    #[test]
    fn dot_is_literal() {
        let sel = FqdnSelector::pattern("cilium.io");
        assert!(matches(&sel, "cilium.io"));
        assert!(!matches(&sel, "ciliumxio"));
    }

    #[test]
    fn pattern_is_anchored() {
        let sel = FqdnSelector::pattern("*.cilium.io");
        assert!(!matches(&sel, "www.cilium.io.evil.com"));
    }

    #[test]
    fn pattern_case_insensitive() {
        let sel = FqdnSelector::pattern("*.Cilium.IO");
        assert!(matches(&sel, "WWW.cilium.io"));
    }

    // ── Errors ──────────────────────────────────────────────────────

    #[test]
    fn empty_name_rejected() {
        let err = SelectorMatcher::new()
            .compile(&FqdnSelector::name(""))
            .unwrap_err();
        assert!(matches!(err, FqdnError::InvalidSelector { .. }));
    }

    #[test]
    fn wildcard_in_name_rejected() {
        let err = SelectorMatcher::new()
            .compile(&FqdnSelector::name("*.cilium.io"))
            .unwrap_err();
        assert!(matches!(err, FqdnError::InvalidSelector { .. }));
    }

    #[test]
    fn invalid_pattern_characters_rejected() {
        let matcher = SelectorMatcher::new();
        for bad in ["ci[lium.io", "cilium.io/x", "(a|b).com", "a b.com"] {
            let err = matcher.compile(&FqdnSelector::pattern(bad)).unwrap_err();
            assert!(
                matches!(err, FqdnError::InvalidPattern { .. }),
                "{bad} should be rejected"
            );
        }
        assert_eq!(matcher.cached_pattern_count(), 0);
    }

    #[test]
    fn empty_pattern_rejected() {
        assert!(SelectorMatcher::new()
            .compile(&FqdnSelector::pattern("."))
            .is_err());
    }

    #[test]
    fn overlong_name_rejected() {
        let long = format!("{}.com", "a".repeat(300));
        let err = SelectorMatcher::new()
            .compile(&FqdnSelector::name(&long))
            .unwrap_err();
        assert_eq!(
            err,
            FqdnError::NameTooLong {
                length: 305,
                max: MAX_NAME_LENGTH
            }
        );
    }

    #[test]
    fn length_limit_applies_to_normalized_text() {
        let matcher = SelectorMatcher::new();
        // 254 bytes plus the appended trailing dot.
        let fits = "a".repeat(254);
        let over = "a".repeat(255);

        assert!(matcher.compile(&FqdnSelector::MatchName(fits.clone())).is_ok());
        assert_eq!(
            matcher
                .compile(&FqdnSelector::MatchName(over.clone()))
                .unwrap_err(),
            FqdnError::NameTooLong {
                length: 256,
                max: MAX_NAME_LENGTH
            }
        );

        let pattern_fits = format!("*{}", &fits[1..]);
        let pattern_over = format!("*{}", &over[1..]);
        assert!(matcher.compile(&FqdnSelector::MatchPattern(pattern_fits)).is_ok());
        assert!(matches!(
            matcher.compile(&FqdnSelector::MatchPattern(pattern_over)),
            Err(FqdnError::NameTooLong { length: 256, .. })
        ));
    }

    #[test]
    fn surrounding_whitespace_does_not_count_toward_length() {
        let padded = format!("   {}   ", "a".repeat(254));
        assert!(SelectorMatcher::new()
            .compile(&FqdnSelector::MatchName(padded))
            .is_ok());
    }

    #[test]
    fn matches_reports_invalid_selector() {
        let matcher = SelectorMatcher::new();
        assert!(matcher
            .matches(&FqdnSelector::pattern("bad[pattern"), "cilium.io")
            .is_err());
    }

    // ── Compiled pattern cache ──────────────────────────────────────

    #[test]
    fn patterns_compiled_once() {
        let matcher = SelectorMatcher::new();
        let sel = FqdnSelector::pattern("*.cilium.io");

        let first = matcher.compile(&sel).unwrap();
        let second = matcher.compile(&FqdnSelector::pattern("*.CILIUM.io.")).unwrap();
        assert_eq!(matcher.cached_pattern_count(), 1);

        match (first, second) {
            (CompiledSelector::Pattern(a), CompiledSelector::Pattern(b)) => {
                assert!(Arc::ptr_eq(&a, &b));
            }
            _ => panic!("expected compiled patterns"),
        }
    }

    #[test]
    fn exact_names_are_not_cached() {
        let matcher = SelectorMatcher::new();
        matcher.compile(&FqdnSelector::name("cilium.io")).unwrap();
        assert_eq!(matcher.cached_pattern_count(), 0);
    }

    #[test]
    fn concurrent_matching() {
        let matcher = Arc::new(SelectorMatcher::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let matcher = Arc::clone(&matcher);
                std::thread::spawn(move || {
                    let sel = FqdnSelector::pattern("*.cilium.io");
                    for i in 0..100 {
                        let name = format!("host{i}.cilium.io");
                        assert!(matcher.matches(&sel, &name).unwrap());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(matcher.cached_pattern_count(), 1);
    }

    #[test]
    fn regex_translation() {
        assert_eq!(pattern_to_regex("*.cilium.io."), r"^.*\.cilium\.io\.$");
        assert_eq!(pattern_to_regex("a*b"), "^a.*b$");
    }
}
