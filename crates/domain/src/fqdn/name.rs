//! DNS name canonicalization and name-list helpers.
//!
//! Every name stored in the cache and every name carried by a selector goes
//! through [`prepare_match_name`] so that `Example.COM`, `example.com` and
//! `example.com.` all compare equal.

use std::collections::HashSet;

/// Maximum length of a presentation-format FQDN, trailing dot included.
pub const MAX_NAME_LENGTH: usize = 255;

/// Canonicalize a DNS name: trim surrounding whitespace, ASCII-lowercase,
/// and end with exactly one trailing dot. The empty name becomes the root
/// name `"."`.
///
/// The function is idempotent.
pub fn prepare_match_name(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('.');
    let mut out = String::with_capacity(trimmed.len() + 1);
    out.push_str(trimmed);
    out.make_ascii_lowercase();
    out.push('.');
    out
}

/// Canonicalize a wildcard pattern the same way names are canonicalized,
/// so a pattern like `*.Example.com` is compared against `www.example.com.`.
pub fn prepare_match_pattern(pattern: &str) -> String {
    prepare_match_name(pattern)
}

/// Remove duplicate names, keeping the first occurrence of each.
///
/// Used when building batches of names to resolve. Never fails: an empty
/// list stays empty and the empty string is a valid name value.
pub fn keep_unique_names(mut names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    names.retain(|name| seen.insert(name.clone()));
    names
}
