//! Local text clean-up for passages and condensed quotes.

/// Upper bound on the length of a condensed quote.
pub const MAX_QUOTE_WORDS: usize = 35;

const QUOTE_MARKS: &[char] = &['"', '\u{201C}', '\u{201D}'];

/// Collapse every run of whitespace (newlines included) into a single space
/// and trim the ends.
pub fn clean_passage(passage: &str) -> String {
    passage.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Post-process a model rewrite into a displayable one-liner.
///
/// Strips surrounding quotation marks, normalises whitespace and keeps at most
/// [`MAX_QUOTE_WORDS`] words. Returns `None` when nothing is left.
pub fn tidy_condensed_quote(raw: &str) -> Option<String> {
    let words: Vec<&str> = trim_quote_marks(raw)
        .split_whitespace()
        .take(MAX_QUOTE_WORDS)
        .collect();

    // Truncation can expose a quote mark on the new last word.
    let quote = trim_quote_marks(&words.join(" ")).to_string();

    if quote.is_empty() {
        None
    } else {
        Some(quote)
    }
}

/// Trim any mix of whitespace and quotation marks from both ends.
fn trim_quote_marks(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || QUOTE_MARKS.contains(&c))
}
