//! Property tests for LIKE pattern escaping.

use notebox_api::db::escape_like;
use proptest::prelude::*;

fn unescape(escaped: &str) -> String {
    let mut out = String::new();
    let mut chars = escaped.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

proptest! {
    #[test]
    fn escaping_is_reversible(input in "[a-z%_\\\\ ]{0,40}") {
        prop_assert_eq!(unescape(&escape_like(&input)), input);
    }

    #[test]
    fn no_bare_wildcards_survive(input in "[a-z%_\\\\]{0,40}") {
        let escaped = escape_like(&input);
        let mut chars = escaped.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                prop_assert!(chars.next().is_some());
            } else {
                prop_assert!(ch != '%' && ch != '_');
            }
        }
    }
}
