//! Link and text extraction from fetched HTML.

use crate::record::Outlink;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

const SKIPPED_TEXT_PARENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Collect the `<a href>` links of `html`, resolved against `base_url`.
///
/// Fragments are dropped, so `/a#top` and `/a` are one target; when a
/// target appears more than once the first anchor text wins.
pub fn extract_links(base_url: &str, html: &str) -> Vec<Outlink> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let Ok(link_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&link_selector) {
        if let Some(href) = element.value().attr("href")
            && let Some(target) = resolve_url(&base, href)
            && seen.insert(target.clone())
        {
            let anchor = collapse_whitespace(element.text());
            links.push(Outlink::new(target, anchor));
        }
    }

    links
}

/// Visible text of `html`, whitespace collapsed to single spaces.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let visible = document.root_element().descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let parent = node.parent()?;
        match parent.value().as_element() {
            Some(element) if SKIPPED_TEXT_PARENTS.contains(&element.name()) => None,
            _ => Some(&**text),
        }
    });
    collapse_whitespace(visible)
}

fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    // Skip empty, javascript:, mailto:, tel:, and in-page anchors
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);

    Some(url.to_string())
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_relative_link() {
        let links = extract_links(
            "https://www.example.com/",
            r#"<html><h1>Welcome</h1><a href="/about">About Us</a></html>"#,
        );
        assert_eq!(links, vec![Outlink::new("https://www.example.com/about", "About Us")]);
    }

    #[test]
    fn test_extract_absolute_link() {
        let links = extract_links(
            "https://blog.tech.net/123",
            r#"<p>Check out <a href="https://www.example.com">Example Inc</a></p>"#,
        );
        assert_eq!(links, vec![Outlink::new("https://www.example.com/", "Example Inc")]);
    }

    #[test]
    fn test_skips_non_navigational_hrefs() {
        let html = r##"
            <a href="">empty</a>
            <a href="#top">top</a>
            <a href="javascript:void(0)">js</a>
            <a href="mailto:a@b.c">mail</a>
            <a href="tel:123">call</a>
            <a href="ftp://files.example.com/x">ftp</a>
            <a href="/ok">ok</a>
        "##;
        let links = extract_links("https://www.example.com/", html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://www.example.com/ok");
    }

    #[test]
    fn test_fragment_dropped_and_first_anchor_wins() {
        let html = r#"<a href="/a#one">First</a><a href="/a#two">Second</a>"#;
        let links = extract_links("https://www.example.com/", html);
        assert_eq!(links, vec![Outlink::new("https://www.example.com/a", "First")]);
    }

    #[test]
    fn test_anchor_whitespace_collapsed() {
        let html = "<a href=\"/x\">\n  Read\n  <b>more</b>  </a>";
        let links = extract_links("https://www.example.com/", html);
        assert_eq!(links[0].anchor, "Read more");
    }

    #[test]
    fn test_invalid_base_yields_nothing() {
        assert!(extract_links("not-a-url", r#"<a href="/x">x</a>"#).is_empty());
    }

    #[test]
    fn test_extract_text_skips_scripts() {
        let html = "<html><head><style>p{}</style><script>var x;</script></head>\
                    <body><h1>Welcome</h1>\n<p>to our   site.</p></body></html>";
        assert_eq!(extract_text(html), "Welcome to our site.");
    }
}
