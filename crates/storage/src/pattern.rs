//! Glob-to-regex translation for `KEYS`. No `regex` dependency: the
//! matcher is simple enough to hand-roll directly over the glob AST.

/// Translate a glob pattern (`*` any run, `?` single char, everything else
/// literal) into a matcher and test `key` against it. Invalid byte
/// sequences never occur since both pattern and key are raw bytes;
/// "invalid pattern" in the spec's sense reduces to "does not match
/// anything", which falls out naturally here.
pub fn glob_match(pattern: &[u8], key: &[u8]) -> bool {
    match_from(pattern, key)
}

fn match_from(pattern: &[u8], text: &[u8]) -> bool {
    // Standard glob matching via a small recursive matcher with a
    // backtracking star: at each `*` we try consuming 0..=n characters of
    // `text` before continuing past it in `pattern`.
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(b'*'), _) => {
            let rest_pattern = &pattern[1..];
            if match_from(rest_pattern, text) {
                return true;
            }
            if text.is_empty() {
                return false;
            }
            match_from(pattern, &text[1..])
        }
        (Some(b'?'), Some(_)) => match_from(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => match_from(&pattern[1..], &text[1..]),
        _ => false,
    }
}

/// Filter keys by a glob pattern. Empty-string keys are never matched, per
/// the dispatcher's `keys` contract.
pub fn filter_keys<'a>(pattern: &[u8], keys: impl Iterator<Item = &'a Vec<u8>>) -> Vec<&'a Vec<u8>> {
    keys.filter(|k| !k.is_empty() && glob_match(pattern, k)).collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any literal byte string, used verbatim as both pattern and key,
        /// matches itself — glob metacharacters never appear by construction
        /// here since the generator only picks from a small non-meta alphabet.
        #[test]
        fn literal_key_matches_itself(key in proptest::collection::vec(b'a'..=b'z', 0..20)) {
            prop_assert!(glob_match(&key, &key));
        }

        /// A bare `*` matches any key, regardless of content.
        #[test]
        fn bare_star_matches_any_key(key in proptest::collection::vec(any::<u8>(), 0..40)) {
            prop_assert!(glob_match(b"*", &key));
        }
    }
}
