use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::database::models::ExtractedLink;

/// Matches `<a ... href="URL" ...>TEXT</a>` with either quote style and
/// attributes before `href`. The regex crate has no backreferences, so the
/// two quote styles are separate alternations (groups 1 and 2).
fn anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\s+(?:[^>]*?\s+)?href=(?:"([^"]*)"|'([^']*)')[^>]*>(.*?)</a>"#)
            .unwrap()
    })
}

fn tag_strip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn bare_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s"'<>]+"#).unwrap())
}

/// URL schemes that never become links (navigation-less anchors).
fn is_excluded_scheme(url: &str) -> bool {
    let lower = url.trim_start().to_lowercase();
    lower.starts_with("mailto:") || lower.starts_with("javascript:")
}

/// Pulls `(text, url)` pairs out of anchor tags in an HTML fragment.
///
/// Inner markup is stripped from the link text and the result trimmed; an
/// anchor with no remaining text falls back to its URL as display text.
/// Entries are deduplicated by URL, first occurrence wins, encounter order
/// preserved. This anchor-only pass defines the searchable link-text set.
pub fn extract_links(html: &str) -> Vec<ExtractedLink> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for caps in anchor_regex().captures_iter(html) {
        let url = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or("");
        if url.is_empty() || is_excluded_scheme(url) {
            continue;
        }
        if !seen.insert(url.to_string()) {
            continue;
        }

        let raw_text = caps.get(3).map(|m| m.as_str()).unwrap_or("");
        let text = tag_strip_regex().replace_all(raw_text, "").trim().to_string();
        let text = if text.is_empty() {
            url.to_string()
        } else {
            text
        };

        links.push(ExtractedLink {
            text,
            url: url.to_string(),
        });
    }

    links
}

/// Anchor extraction plus a second pass over bare `http(s)://` tokens not
/// already captured as anchor URLs; those become self-describing links
/// (`text == url`). Display-oriented: bare URLs are surfaced here but never
/// enter the searchable link-text set.
pub fn extract_links_with_bare_urls(html: &str) -> Vec<ExtractedLink> {
    let mut links = extract_links(html);
    let mut seen: HashSet<String> = links.iter().map(|l| l.url.clone()).collect();

    for m in bare_url_regex().find_iter(html) {
        let url = m.as_str();
        if !seen.insert(url.to_string()) {
            continue;
        }
        links.push(ExtractedLink {
            text: url.to_string(),
            url: url.to_string(),
        });
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_anchor() {
        let links = extract_links(r#"<a href="https://example.com">Example</a>"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "Example");
        assert_eq!(links[0].url, "https://example.com");
    }

    #[test]
    fn test_single_quotes_and_leading_attributes() {
        let links =
            extract_links(r#"<a class="ext" target='_blank' href='https://x.io/a'>A</a>"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://x.io/a");
    }

    #[test]
    fn test_nested_markup_stripped_and_trimmed() {
        let links =
            extract_links(r#"<a href="https://x.io"> <strong>Bold</strong> name </a>"#);
        assert_eq!(links[0].text, "Bold name");
    }

    #[test]
    fn test_empty_text_falls_back_to_url() {
        let links = extract_links(r#"<a href="https://x.io"><img src="i.png"></a>"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "https://x.io");
    }

    #[test]
    fn test_mailto_and_javascript_excluded() {
        let html = concat!(
            r#"<a href="mailto:a@b.com">mail</a>"#,
            r#"<a href="JavaScript:void(0)">click</a>"#,
            r#"<a href="https://ok.io">ok</a>"#,
        );
        let links = extract_links(html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://ok.io");
    }

    #[test]
    fn test_dedup_by_url_first_wins() {
        let html = concat!(
            r#"<a href="https://x.io">first</a>"#,
            r#"<a href="https://y.io">other</a>"#,
            r#"<a href="https://x.io">second</a>"#,
        );
        let links = extract_links(html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].text, "first");
        assert_eq!(links[1].url, "https://y.io");
    }

    #[test]
    fn test_text_spanning_lines() {
        let links = extract_links("<a href=\"https://x.io\">line\none</a>");
        assert_eq!(links[0].text, "line\none");
    }

    #[test]
    fn test_no_anchors() {
        assert!(extract_links("plain text, no markup").is_empty());
        assert!(extract_links("").is_empty());
    }

    #[test]
    fn test_bare_urls_added_after_anchors() {
        let html = r#"<a href="https://a.io">A</a> see also https://b.io/page"#;
        let links = extract_links_with_bare_urls(html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].text, "https://b.io/page");
        assert_eq!(links[1].url, "https://b.io/page");
    }

    #[test]
    fn test_bare_url_pass_skips_anchor_urls() {
        // the href also appears as a bare token inside the anchor text
        let html = r#"<a href="https://a.io">https://a.io</a>"#;
        let links = extract_links_with_bare_urls(html);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_anchor_only_pass_ignores_bare_urls() {
        let links = extract_links("go to https://b.io now");
        assert!(links.is_empty());
    }

    #[test]
    fn test_unicode_link_text() {
        let links = extract_links(r#"<a href="https://x.io">サイトX</a>"#);
        assert_eq!(links[0].text, "サイトX");
    }
}
