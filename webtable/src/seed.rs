//! Sample data for a fresh table.
//!
//! Three hand-written example.com / blog pages, then a chain of generated
//! pages per popular site where each page links back to its predecessor as
//! "Previous Page" and the predecessor links forward as "Next Page".

use tracing::info;
use webtable_core::{Outlink, Page};
use webtable_store::{IngestReport, Ingestor, Result, TableStore};

pub const SEED_SITES: [&str; 5] = [
    "www.google.com",
    "www.youtube.com",
    "www.facebook.com",
    "www.amazon.com",
    "www.wikipedia.org",
];

/// Totals across several ingestions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub pages: usize,
    pub puts: usize,
    pub rejected: usize,
    pub failed_inlinks: usize,
}

impl SeedSummary {
    fn absorb(&mut self, report: &IngestReport) {
        self.puts += report.puts;
        self.rejected += report.rejected.len();
        self.failed_inlinks += report.failed_inlinks.len();
    }

    pub fn merge(&mut self, other: SeedSummary) {
        self.pages += other.pages;
        self.puts += other.puts;
        self.rejected += other.rejected;
        self.failed_inlinks += other.failed_inlinks;
    }
}

pub fn sample_pages() -> Vec<Page> {
    vec![
        Page::new(
            "https://www.example.com/",
            r#"<html><h1>Welcome</h1><a href="/about">About Us</a></html>"#,
            1717020000000,
        )
        .with_text("Welcome to our site. About Us."),
        Page::new(
            "https://www.example.com/about",
            "<html><h2>About</h2><p>Our company info</p></html>",
            1717020001000,
        )
        .with_links(vec![Outlink::new("https://www.example.com/", "Home")]),
        Page::new(
            "https://blog.tech.net/123",
            r#"<html><p>Check out <a href="https://www.example.com">Example Inc</a></p></html>"#,
            1717020002000,
        ),
    ]
}

/// URLs of a generated site: `/`, then `/page-1` up to `/page-{pages - 1}`.
pub fn site_urls(domain: &str, pages: usize) -> Vec<String> {
    (0..pages)
        .map(|i| match i {
            0 => format!("https://{}/", domain),
            i => format!("https://{}/page-{}", domain, i),
        })
        .collect()
}

pub fn seed_samples<S: TableStore>(ingestor: &Ingestor<S>) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    for page in sample_pages() {
        let report = ingestor.ingest(&page)?;
        summary.pages += 1;
        summary.absorb(&report);
    }
    Ok(summary)
}

pub fn seed_site<S: TableStore>(
    ingestor: &Ingestor<S>,
    domain: &str,
    pages: usize,
    fetch_time: i64,
) -> Result<SeedSummary> {
    let urls = site_urls(domain, pages);
    let mut summary = SeedSummary::default();

    for (idx, url) in urls.iter().enumerate() {
        let path = url
            .strip_prefix(&format!("https://{}", domain))
            .unwrap_or(url.as_str());
        let mut page = Page::new(
            url.as_str(),
            format!("<html><h1>{} {}</h1></html>", domain, path),
            fetch_time,
        )
        .with_text(format!("Welcome to {} {}", domain, path))
        .with_links(vec![]);

        if idx > 0 {
            let prev = &urls[idx - 1];
            page = page.with_links(vec![Outlink::new(prev.as_str(), "Previous Page")]);
            let report = ingestor.link(prev, &[Outlink::new(url.as_str(), "Next Page")])?;
            summary.absorb(&report);
        }

        let report = ingestor.ingest(&page)?;
        summary.pages += 1;
        summary.absorb(&report);
    }

    info!("Seeded {} with {} pages", domain, summary.pages);
    Ok(summary)
}
