use std::sync::LazyLock;

use regex::Regex;

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("annotation pattern is a valid regex"));

/// Turns a free-text posting description into a grouping key: lower-cased, without parenthesized
/// annotations such as `(ref #123)`, with whitespace collapsed. Applying it twice is a no-op.
pub fn normalize_payee(description: &str) -> String {
    let lowered = description.to_lowercase();
    let stripped = ANNOTATION.replace_all(&lowered, " ");

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
