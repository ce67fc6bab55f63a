//! Identifier sanitization: path segments and result-column names fold to
//! names that are safe to use as field identifiers in any target language.

use regex::Regex;
use std::sync::LazyLock;

static QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"['"]+"#).unwrap());
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Scrub a name into a safe identifier: trim, strip quote characters,
/// fold each run of non-word characters to a single `_`, and prefix with
/// `_` when the result would start with a digit.
pub fn identifier(key: &str) -> String {
    let trimmed = key.trim();
    let unquoted = QUOTES.replace_all(trimmed, "");
    let folded = NON_WORD.replace_all(&unquoted, "_");
    if folded.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("_{folded}")
    } else {
        folded.into_owned()
    }
}
