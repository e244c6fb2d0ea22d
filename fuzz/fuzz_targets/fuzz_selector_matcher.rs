#![no_main]

use libfuzzer_sys::fuzz_target;

use domain::fqdn::entity::FqdnSelector;
use domain::fqdn::matcher::SelectorMatcher;
use domain::fqdn::name::prepare_match_name;

// Fuzz the SelectorMatcher: selector validation, pattern compilation, matching.
//
// Layout:
//   [0]        = selector kind (even = matchName, odd = matchPattern)
//   [1]        = selector_len
//   [2..2+len] = selector bytes
//   rest       = names to match against (null-separated)
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let selector_len = (data[1] as usize).min(data.len() - 2);
    let Ok(text) = std::str::from_utf8(&data[2..2 + selector_len]) else {
        return;
    };
    let selector = if data[0] % 2 == 0 {
        FqdnSelector::name(text)
    } else {
        FqdnSelector::pattern(text)
    };

    let matcher = SelectorMatcher::new();
    let Ok(compiled) = matcher.compile(&selector) else {
        return;
    };

    for name_bytes in data[2 + selector_len..].split(|&b| b == 0) {
        if let Ok(name) = std::str::from_utf8(name_bytes) {
            let normalized = prepare_match_name(name);
            let direct = compiled.matches(&normalized);
            // Matching through the cached path must agree with the compiled form.
            assert_eq!(matcher.matches(&selector, name), Ok(direct));
            // An exact selector always matches its own text.
            if let FqdnSelector::MatchName(n) = &selector {
                assert!(compiled.matches(&prepare_match_name(n)));
            }
        }
    }
});
