//! Column layout of a crawled page.
//!
//! A page's own artifacts go into the `content` and `meta` families of its
//! row. Each hyperlink A → B becomes two cells on two rows:
//! `outlinks:<key(B)>` under A and `inlinks:<key(A)>` under B, both holding
//! the anchor text. Qualifiers are row keys, so writing the same link twice
//! lands on the same cell.

use crate::column::{self, ColumnMap, Family};
use crate::error::{Error, Result};
use crate::key::{RowKey, derive_key};
use crate::links;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A fetched page and what the crawler learned about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub html: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Epoch milliseconds.
    pub fetch_time: i64,
    pub status: u16,
    pub content_type: String,
    /// Outbound links. When absent they are extracted from `html`.
    #[serde(default)]
    pub links: Option<Vec<Outlink>>,
}

impl Page {
    pub fn new(url: impl Into<String>, html: impl Into<String>, fetch_time: i64) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            text: None,
            fetch_time,
            status: 200,
            content_type: "text/html".to_string(),
            links: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_links(mut self, links: Vec<Outlink>) -> Self {
        self.links = Some(links);
        self
    }

    /// The page's outbound links, explicit or parsed from its HTML.
    pub fn outlinks(&self) -> Vec<Outlink> {
        match &self.links {
            Some(links) => links.clone(),
            None => links::extract_links(&self.url, &self.html),
        }
    }
}

/// One outbound link of a page: target URL and anchor text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outlink {
    pub url: String,
    pub anchor: String,
}

impl Outlink {
    pub fn new(url: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anchor: anchor.into(),
        }
    }
}

/// A directed hyperlink between two pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEdge {
    pub source: String,
    pub target: String,
    pub anchor: String,
}

impl LinkEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        anchor: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            anchor: anchor.into(),
        }
    }
}

/// An edge that produced no cell because one of its URLs could not be keyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEdge {
    pub edge: LinkEdge,
    pub error: Error,
}

/// Outlink cells for the source page's row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlinkBatch {
    pub row: RowKey,
    pub columns: ColumnMap,
    pub rejected: Vec<RejectedEdge>,
}

/// Inlink cells grouped by the target row they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlinkBatch {
    pub rows: BTreeMap<RowKey, ColumnMap>,
    pub rejected: Vec<RejectedEdge>,
}

/// Every write one crawled page causes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWrites {
    /// The page's own row.
    pub row: RowKey,
    /// Content, meta and outlink cells for `row`, plus the inlink of a
    /// self-link.
    pub columns: ColumnMap,
    /// Inlink cells for every other row the page links to.
    pub inlinks: BTreeMap<RowKey, ColumnMap>,
    pub rejected: Vec<RejectedEdge>,
}

impl PageWrites {
    pub fn outlink_count(&self) -> usize {
        self.columns.count(Family::Outlinks)
    }

    /// Number of puts needed to apply these writes.
    pub fn put_count(&self) -> usize {
        1 + self.inlinks.len()
    }
}

/// Content and meta cells of a page. Every cell is a fresh version; the
/// store decides how many older ones survive.
pub fn build_own_record(page: &Page) -> ColumnMap {
    let mut columns = ColumnMap::new();
    columns.put(Family::Content, column::HTML, page.html.as_bytes());
    if let Some(text) = &page.text {
        columns.put(Family::Content, column::TEXT, text.as_bytes());
    }
    columns.put(Family::Meta, column::FETCH_TIME, page.fetch_time.to_string());
    columns.put(Family::Meta, column::STATUS, page.status.to_string());
    columns.put(Family::Meta, column::CONTENT_TYPE, page.content_type.as_bytes());
    columns
}

/// Outlink cells for `source_url`'s row.
///
/// Fails only when `source_url` itself cannot be keyed. A target that cannot
/// be keyed is reported in [`OutlinkBatch::rejected`] and the remaining
/// edges are still emitted.
pub fn build_outlink_entries(source_url: &str, edges: &[Outlink]) -> Result<OutlinkBatch> {
    let row = derive_key(source_url)?;
    let mut columns = ColumnMap::new();
    let mut rejected = Vec::new();

    for edge in edges {
        match derive_key(&edge.url) {
            Ok(target) => columns.put(Family::Outlinks, target.into_string(), edge.anchor.as_bytes()),
            Err(error) => rejected.push(RejectedEdge {
                edge: LinkEdge::new(source_url, &edge.url, &edge.anchor),
                error,
            }),
        }
    }

    Ok(OutlinkBatch {
        row,
        columns,
        rejected,
    })
}

/// Inlink cells for each edge's target row. An edge with either endpoint
/// unkeyable is reported in [`InlinkBatch::rejected`].
pub fn build_inlink_entries(edges: &[LinkEdge]) -> InlinkBatch {
    let mut batch = InlinkBatch::default();

    for edge in edges {
        let keys = derive_key(&edge.source).and_then(|source| Ok((source, derive_key(&edge.target)?)));
        match keys {
            Ok((source, target)) => batch.rows.entry(target).or_default().put(
                Family::Inlinks,
                source.into_string(),
                edge.anchor.as_bytes(),
            ),
            Err(error) => batch.rejected.push(RejectedEdge {
                edge: edge.clone(),
                error,
            }),
        }
    }

    batch
}

/// The complete write set of one crawled page.
pub fn build_page(page: &Page) -> Result<PageWrites> {
    let outlinks = page.outlinks();
    let outlink_batch = build_outlink_entries(&page.url, &outlinks)?;

    let edges: Vec<LinkEdge> = outlinks
        .iter()
        .map(|link| LinkEdge::new(&page.url, &link.url, &link.anchor))
        .collect();
    // The source is already known to be keyable, so the inlink side rejects
    // exactly the edges the outlink side did.
    let InlinkBatch { rows: mut inlinks, .. } = build_inlink_entries(&edges);

    let mut columns = build_own_record(page);
    columns.merge(outlink_batch.columns);
    if let Some(self_link) = inlinks.remove(&outlink_batch.row) {
        columns.merge(self_link);
    }

    Ok(PageWrites {
        row: outlink_batch.row,
        columns,
        inlinks,
        rejected: outlink_batch.rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn about_page() -> Page {
        Page::new(
            "https://www.example.com/about",
            "<html><h2>About</h2><p>Our company info</p></html>",
            1717020001000,
        )
        .with_links(vec![])
    }

    #[test]
    fn test_own_record_columns() {
        let page = about_page().with_text("Our company info");
        let columns = build_own_record(&page);

        assert_eq!(columns.len(), 5);
        assert_eq!(
            columns.get_wire("content:html"),
            Some(page.html.as_bytes())
        );
        assert_eq!(columns.get_wire("content:text"), Some(&b"Our company info"[..]));
        assert_eq!(columns.get_wire("meta:fetch_time"), Some(&b"1717020001000"[..]));
        assert_eq!(columns.get_wire("meta:status"), Some(&b"200"[..]));
        assert_eq!(columns.get_wire("meta:content_type"), Some(&b"text/html"[..]));
    }

    #[test]
    fn test_own_record_without_text() {
        let columns = build_own_record(&about_page());
        assert_eq!(columns.len(), 4);
        assert!(columns.get_wire("content:text").is_none());
    }

    #[test]
    fn test_outlink_qualifier_is_target_key() {
        let batch = build_outlink_entries(
            "https://www.example.com/",
            &[Outlink::new("https://www.example.com/about", "About Us")],
        )
        .unwrap();

        assert_eq!(batch.row.as_str(), "e!com.example.www/");
        assert_eq!(
            batch.columns.get_wire("outlinks:9!com.example.www/about"),
            Some(&b"About Us"[..])
        );
        assert!(batch.rejected.is_empty());
    }

    #[test]
    fn test_outlink_malformed_source_fails() {
        let result = build_outlink_entries("example.com/", &[Outlink::new("https://a.com/", "a")]);
        assert!(matches!(result, Err(Error::MalformedUrl { .. })));
    }

    #[test]
    fn test_outlink_duplicate_target_is_one_cell() {
        let batch = build_outlink_entries(
            "https://www.example.com/",
            &[
                Outlink::new("https://www.example.com/about", "About"),
                Outlink::new("https://www.example.com/about", "About Us"),
            ],
        )
        .unwrap();
        assert_eq!(batch.columns.count(Family::Outlinks), 1);
        assert_eq!(
            batch.columns.get_wire("outlinks:9!com.example.www/about"),
            Some(&b"About Us"[..])
        );
    }

    #[test]
    fn test_inlinks_grouped_by_target() {
        let batch = build_inlink_entries(&[
            LinkEdge::new("https://blog.tech.net/123", "https://www.example.com/", "Example Inc"),
            LinkEdge::new("https://www.example.com/about", "https://www.example.com/", "Home"),
            LinkEdge::new("https://www.example.com/", "not a url", "broken"),
        ]);

        assert_eq!(batch.rows.len(), 1);
        let home = batch.rows.get(&derive_key("https://www.example.com/").unwrap()).unwrap();
        assert_eq!(home.get_wire("inlinks:3!net.tech.blog/123"), Some(&b"Example Inc"[..]));
        assert_eq!(home.get_wire("inlinks:9!com.example.www/about"), Some(&b"Home"[..]));
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].edge.target, "not a url");
    }

    #[test]
    fn test_build_page_self_link_stays_on_own_row() {
        let page = Page::new("https://www.example.com/", "<html/>", 1)
            .with_links(vec![Outlink::new("https://www.example.com/", "Home")]);
        let writes = build_page(&page).unwrap();

        assert!(writes.inlinks.is_empty());
        assert_eq!(writes.put_count(), 1);
        assert_eq!(
            writes.columns.get_wire("outlinks:e!com.example.www/"),
            Some(&b"Home"[..])
        );
        assert_eq!(
            writes.columns.get_wire("inlinks:e!com.example.www/"),
            Some(&b"Home"[..])
        );
    }

    #[test]
    fn test_build_page_extracts_links_from_html() {
        let page = Page::new(
            "https://www.example.com/",
            r#"<html><h1>Welcome</h1><a href="/about">About Us</a></html>"#,
            1717020000000,
        );
        let writes = build_page(&page).unwrap();

        assert_eq!(writes.outlink_count(), 1);
        let about = derive_key("https://www.example.com/about").unwrap();
        assert_eq!(
            writes.inlinks[&about].get_wire("inlinks:e!com.example.www/"),
            Some(&b"About Us"[..])
        );
    }
}
