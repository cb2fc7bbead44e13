//! Auto-linking of bare URLs.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a literal
    Regex::new(r"(?is)<a\b[^>]*>.*?</a>").unwrap()
});

static RE_URL: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"https?://[^\s<]+").unwrap()
});

/// Punctuation that commonly trails a URL in prose but is not part of it.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '\'', '"'];

/// Wrap bare URLs in `rel="nofollow"` links.
///
/// Text already inside an `<a>...</a>` element is left untouched, so
/// re-running over previously linkified output is a no-op.
#[must_use]
pub fn linkify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for anchor in RE_ANCHOR.find_iter(input) {
        out.push_str(&linkify_segment(&input[last..anchor.start()]));
        out.push_str(anchor.as_str());
        last = anchor.end();
    }
    out.push_str(&linkify_segment(&input[last..]));

    out
}

fn linkify_segment(segment: &str) -> String {
    RE_URL
        .replace_all(segment, |caps: &regex::Captures<'_>| {
            let matched = &caps[0];
            let url = matched.trim_end_matches(TRAILING_PUNCTUATION);
            let rest = &matched[url.len()..];
            format!("<a href=\"{url}\" rel=\"nofollow\">{url}</a>{rest}")
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_bare_url() {
        let out = linkify("go to https://example.com now");
        assert_eq!(
            out,
            "go to <a href=\"https://example.com\" rel=\"nofollow\">https://example.com</a> now"
        );
    }

    #[test]
    fn test_trailing_punctuation_excluded() {
        let out = linkify("see https://example.com/page.");
        assert!(out.ends_with("</a>."));
    }

    #[test]
    fn test_existing_anchor_untouched() {
        let input = "<a href=\"https://example.com\" rel=\"nofollow\">https://example.com</a>";
        assert_eq!(linkify(input), input);
    }

    #[test]
    fn test_mixed_anchor_and_bare_url() {
        let input = "<a href=\"https://a.example\">a</a> and https://b.example";
        let out = linkify(input);
        assert!(out.starts_with("<a href=\"https://a.example\">a</a> and "));
        assert!(out.contains("<a href=\"https://b.example\" rel=\"nofollow\">https://b.example</a>"));
    }

    #[test]
    fn test_http_scheme() {
        let out = linkify("http://plain.example/x");
        assert!(out.contains("href=\"http://plain.example/x\""));
    }

    #[test]
    fn test_no_urls() {
        assert_eq!(linkify("nothing here"), "nothing here");
    }

    #[test]
    fn test_idempotent() {
        let once = linkify("https://example.com and https://other.example");
        assert_eq!(linkify(&once), once);
    }
}
