//! Content sanitization for agora-rs.
//!
//! Turns raw user-submitted markup into a safe cached rendering:
//!
//! 1. **Clean**: whitelist-based tag filtering (only `br`, `p`, `a`,
//!    `b`, `i`, `strong`, `em` survive), stripping inline styles and
//!    unsafe attributes and forcing `rel="nofollow"` on links.
//! 2. **Normalize**: paragraph and line-break markup becomes plain
//!    line breaks.
//! 3. **Linkify**: bare URLs in text become `nofollow` links.
//!
//! The pipeline is idempotent in effect: running [`clean`] on already
//! cleaned content produces the same output.

mod linkify;
mod normalize;

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

pub use linkify::linkify;
pub use normalize::normalize_breaks;

/// Tags allowed to survive sanitization.
const ALLOWED_TAGS: &[&str] = &["br", "p", "a", "b", "i", "strong", "em"];

static CLEANER: Lazy<ammonia::Builder<'static>> = Lazy::new(|| {
    let mut builder = ammonia::Builder::default();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
        .generic_attributes(HashSet::new())
        .tag_attributes(HashMap::from([("a", HashSet::from(["href"]))]))
        .url_schemes(HashSet::from(["http", "https", "mailto"]))
        .link_rel(Some("nofollow"));
    builder
});

/// Sanitize raw user content into its cached rendering.
#[must_use]
pub fn clean(raw: &str) -> String {
    let cleaned = CLEANER.clean(raw).to_string();
    let normalized = normalize_breaks(&cleaned);
    linkify(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_disallowed_tags() {
        let out = clean("<script>alert('x')</script>hello <b>world</b>");
        assert!(!out.contains("script"));
        assert!(out.contains("<b>world</b>"));
    }

    #[test]
    fn test_strips_inline_styles_and_attributes() {
        let out = clean("<b style=\"color:red\" onclick=\"x()\">bold</b>");
        assert_eq!(out, "<b>bold</b>");
    }

    #[test]
    fn test_forces_nofollow_on_links() {
        let out = clean("<a href=\"https://example.com\">link</a>");
        assert!(out.contains("rel=\"nofollow\""));
        assert!(out.contains("href=\"https://example.com\""));
    }

    #[test]
    fn test_paragraphs_become_line_breaks() {
        let out = clean("<p>first</p><p>second</p>");
        assert_eq!(out, "first\n\nsecond");
    }

    #[test]
    fn test_autolinks_bare_urls() {
        let out = clean("see https://example.com/page for details");
        assert!(out.contains("<a href=\"https://example.com/page\" rel=\"nofollow\">https://example.com/page</a>"));
    }

    #[test]
    fn test_does_not_double_link() {
        let once = clean("visit https://example.com now");
        let twice = clean(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_idempotent_on_clean_content() {
        let raw = "<p>hello <b>world</b></p><script>bad()</script> https://a.example/x";
        let once = clean(raw);
        let twice = clean(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_keeps_emphasis_tags() {
        let out = clean("<em>soft</em> <strong>hard</strong> <i>it</i>");
        assert_eq!(out, "<em>soft</em> <strong>hard</strong> <i>it</i>");
    }

    #[test]
    fn test_javascript_scheme_dropped() {
        let out = clean("<a href=\"javascript:alert(1)\">x</a>");
        assert!(!out.contains("javascript:"));
    }
}
