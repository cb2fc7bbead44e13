//! Paragraph and line-break normalization.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_BLOCK_OPEN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a literal
    Regex::new(r"(?i)<\s*(?:p|div)(?:\s[^>]*)?>").unwrap()
});

static RE_BLOCK_CLOSE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?i)</\s*(?:p|div)\s*>").unwrap()
});

static RE_BR: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?i)<\s*br\s*/?\s*>").unwrap()
});

static RE_EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\n{3,}").unwrap()
});

/// Replace paragraph and line-break markup with plain line breaks.
///
/// `<p>`/`<div>` openings are dropped, their closings become blank
/// lines, `<br>` variants become single line breaks, and runs of three
/// or more line breaks collapse to a blank line.
#[must_use]
pub fn normalize_breaks(input: &str) -> String {
    let text = input.replace("\r\n", "\n");
    let text = RE_BLOCK_OPEN.replace_all(&text, "");
    let text = RE_BLOCK_CLOSE.replace_all(&text, "\n\n");
    let text = RE_BR.replace_all(&text, "\n");
    let text = RE_EXCESS_NEWLINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_to_blank_lines() {
        assert_eq!(normalize_breaks("<p>a</p><p>b</p>"), "a\n\nb");
    }

    #[test]
    fn test_br_variants() {
        assert_eq!(normalize_breaks("a<br>b<br/>c<br />d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_collapses_newline_runs() {
        assert_eq!(normalize_breaks("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_crlf_normalized() {
        assert_eq!(normalize_breaks("a\r\nb"), "a\nb");
    }

    #[test]
    fn test_div_with_attributes() {
        assert_eq!(normalize_breaks("<div class=\"x\">a</div>b"), "a\n\nb");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(normalize_breaks("just text"), "just text");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_breaks("<p>a</p>\n\n\n<p>b</p>");
        assert_eq!(normalize_breaks(&once), once);
    }
}
