//! Keyword policy.
//!
//! Matching is case-insensitive substring containment. A block keyword hit
//! always rejects, even when an allow keyword also matches. An empty allow
//! list lets every non-blocked item through.

use std::collections::BTreeSet;

/// Whether `text` is acceptable under the allow/block lists.
pub fn passes(text: &str, allow: &BTreeSet<String>, block: &BTreeSet<String>) -> bool {
    let lowered = text.to_lowercase();
    if contains_any(&lowered, block) {
        return false;
    }
    allow.is_empty() || contains_any(&lowered, allow)
}

fn contains_any(lowered: &str, keywords: &BTreeSet<String>) -> bool {
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .any(|k| lowered.contains(&k.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_empty_lists_pass_everything() {
        assert!(passes("anything at all", &set(&[]), &set(&[])));
        assert!(passes("", &set(&[]), &set(&[])));
    }

    #[test]
    fn test_allow_requires_a_match() {
        let allow = set(&["нефть", "ФРС"]);
        assert!(passes("Цены на НЕФТЬ растут", &allow, &set(&[])));
        assert!(passes("фрс сохранила ставку", &allow, &set(&[])));
        assert!(!passes("Футбол: итоги тура", &allow, &set(&[])));
    }

    #[test]
    fn test_block_has_precedence_over_allow() {
        let allow = set(&["биткоин"]);
        let block = set(&["Крипто"]);
        assert!(!passes("Биткоин и криптовалюты падают", &allow, &block));
        assert!(passes("Биткоин растёт", &allow, &block));
    }

    #[test]
    fn test_blank_keywords_are_ignored() {
        assert!(passes("text", &set(&[]), &set(&["", " "])));
        // A non-empty allow list still demands a match, blanks never match.
        assert!(!passes("text", &set(&["  "]), &set(&[])));
    }
}
