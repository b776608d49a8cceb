// erasure-core/src/domain/comments.rs

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static TOKENIZED_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"Column (.*) tokenized by Thales").expect("static regex")
});

/// Text posted on a catalog object once a column has been tokenized.
/// Must stay parseable by [`tokenized_columns`].
pub fn tokenized_comment(column: &str, at: chrono::DateTime<chrono::Utc>) -> String {
    format!(
        "Column {} tokenized by Thales on {}",
        column,
        at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Extracts the already-tokenized column names from free-text catalog comments.
pub fn tokenized_columns<'a>(comments: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    comments
        .into_iter()
        .filter_map(|c| TOKENIZED_COLUMN.captures(c))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}
