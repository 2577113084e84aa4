//! Text escaping applied to every captured output line
//!
//! Captured lines end up embedded in documents the caller controls (HTML
//! pages, JSON payloads), so each line is passed through an [`Escaper`]
//! before it is accumulated.

use std::borrow::Cow;

/// Transform applied to each captured line before it is buffered
///
/// `escape` must be pure: the same input always yields the same output and
/// the call has no side effects. It need not be a fixed point, so escaping
/// already-escaped text may change it again.
///
/// Implementations must not shorten their input: the stdout cap relies on
/// the raw length of a line being a lower bound on its escaped length.
pub trait Escaper: Send + Sync {
    fn escape(&self, text: &str) -> String;
}

impl<F> Escaper for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn escape(&self, text: &str) -> String {
        self(text)
    }
}

/// Escapes the HTML-significant characters `& < > " '`
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEscaper;

impl Escaper for HtmlEscaper {
    fn escape(&self, text: &str) -> String {
        escape_html(text).into_owned()
    }
}

/// Leaves text untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl Escaper for Verbatim {
    fn escape(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Escape HTML-significant characters, borrowing when nothing needs escaping
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_borrowed() {
        let result = escape_html("hello world");
        assert!(matches!(result, Cow::Borrowed("hello world")));
    }

    #[test]
    fn test_html_characters_are_escaped() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escaping_already_escaped_text_is_deterministic() {
        assert_eq!(escape_html("&amp;"), "&amp;amp;");
        assert_eq!(HtmlEscaper.escape("&amp;"), HtmlEscaper.escape("&amp;"));
    }

    #[test]
    fn test_verbatim_is_identity() {
        assert_eq!(Verbatim.escape("<b>"), "<b>");
    }

    #[test]
    fn test_closure_escaper() {
        let upper = |s: &str| s.to_uppercase();
        assert_eq!(upper.escape("abc"), "ABC");
    }
}
