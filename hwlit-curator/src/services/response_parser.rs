//! Pure mapping from raw completion text to typed annotations
//!
//! Kept separate from the network call so the matching rules can be tested
//! with literal strings.

use hwlit_common::Tag;

/// Most tags a single record carries
pub const MAX_TAGS: usize = 3;

/// Classification verdict: the trimmed, lowercased reply starts with `t`
pub fn parse_classification(response: &str) -> bool {
    response.trim().to_lowercase().starts_with('t')
}

/// Tag list from a comma-separated reply
///
/// Every vocabulary label contained (case-insensitively) in any fragment is
/// kept, in fragment order then vocabulary order, without duplicates, up to
/// [`MAX_TAGS`]. A reply matching nothing yields `[Other]`.
///
/// Matching is substring containment. No vocabulary label currently contains
/// another, but a future label that does would match alongside it.
pub fn parse_tags(response: &str) -> Vec<Tag> {
    let mut found: Vec<Tag> = Vec::new();

    for fragment in response.split(',') {
        let fragment = fragment.trim().to_lowercase();
        for tag in Tag::VOCABULARY {
            if fragment.contains(&tag.label().to_lowercase()) && !found.contains(&tag) {
                found.push(tag);
            }
        }
    }

    if found.is_empty() {
        found.push(Tag::Other);
    }
    found.truncate(MAX_TAGS);
    found
}
