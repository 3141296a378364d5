//! Text normalization helpers shared by catalog joins.

use crate::constants::source::FIELD_SEPARATOR;

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Lower-case `text`, collapse whitespace runs, and trim.
///
/// Idempotent: `normalize_text(normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text<T: AsRef<str>>(text: T) -> String {
    normalize_inline_whitespace(text.as_ref().to_lowercase())
}

/// Join ordered field values with a single space and normalize the result.
///
/// Missing values contribute an empty string, never a placeholder.
pub fn compose_text<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let joined = values
        .into_iter()
        .map(|value| value.unwrap_or(""))
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR);
    normalize_text(joined)
}
