// erasure-core/src/domain/categories.rs

use std::collections::BTreeSet;

/// Parses the comma-separated `Categories` action parameter.
/// Entries are trimmed, deduplicated, and blanks dropped; `""` yields the empty set.
pub fn read_categories(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// An empty allow-list allows everything; otherwise at least one found category must be allowed.
pub fn category_allowed(found: &BTreeSet<String>, allowed: &BTreeSet<String>) -> bool {
    allowed.is_empty() || !found.is_disjoint(allowed)
}
