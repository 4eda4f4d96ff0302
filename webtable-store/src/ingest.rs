//! Applying a page's writes to a table.
//!
//! The page's own row is written first. Each linked page then gets its own
//! `put` carrying the inlink; these are independent writes, so a failure on
//! one target row leaves the source row and the other targets in place.

use crate::error::Result;
use crate::store::TableStore;
use tracing::{info, warn};
use webtable_core::{
    ColumnMap, Family, LinkEdge, Outlink, Page, RejectedEdge, RowKey, build_inlink_entries,
    build_outlink_entries, build_page,
};

/// What one ingestion wrote.
#[derive(Debug)]
pub struct IngestReport {
    pub row: RowKey,
    pub puts: usize,
    pub outlinks: usize,
    pub inlinks: usize,
    pub rejected: Vec<RejectedEdge>,
    /// Target rows whose inlink put failed, with the error text.
    pub failed_inlinks: Vec<(RowKey, String)>,
}

impl IngestReport {
    fn new(row: RowKey) -> Self {
        Self {
            row,
            puts: 0,
            outlinks: 0,
            inlinks: 0,
            rejected: Vec::new(),
            failed_inlinks: Vec::new(),
        }
    }

    /// Whether every edge made it to both endpoints.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty() && self.failed_inlinks.is_empty()
    }
}

pub struct Ingestor<S> {
    store: S,
}

impl<S: TableStore> Ingestor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write a crawled page and both sides of each of its links.
    ///
    /// Errors only if the page URL cannot be keyed or its own row cannot be
    /// written. Malformed links and failed inlink writes are reported.
    pub fn ingest(&self, page: &Page) -> Result<IngestReport> {
        let writes = build_page(page)?;
        let mut report = IngestReport::new(writes.row.clone());
        report.outlinks = writes.outlink_count();

        for rejected in &writes.rejected {
            warn!(
                "Skipping link {} -> {}: {}",
                rejected.edge.source, rejected.edge.target, rejected.error
            );
        }
        report.rejected = writes.rejected;

        self.store.put(&writes.row, &writes.columns)?;
        report.puts += 1;
        report.inlinks += writes.columns.count(Family::Inlinks);

        self.put_inlinks(writes.inlinks, &mut report);

        info!(
            "Ingested {} as {} ({} outlinks, {} puts)",
            page.url, report.row, report.outlinks, report.puts
        );
        Ok(report)
    }

    /// Add links from an already stored page without rewriting its content.
    pub fn link(&self, source_url: &str, links: &[Outlink]) -> Result<IngestReport> {
        let outlinks = build_outlink_entries(source_url, links)?;
        let mut report = IngestReport::new(outlinks.row.clone());
        report.outlinks = outlinks.columns.len();

        for rejected in &outlinks.rejected {
            warn!(
                "Skipping link {} -> {}: {}",
                rejected.edge.source, rejected.edge.target, rejected.error
            );
        }
        report.rejected = outlinks.rejected;

        if !outlinks.columns.is_empty() {
            self.store.put(&outlinks.row, &outlinks.columns)?;
            report.puts += 1;
        }

        let edges: Vec<LinkEdge> = links
            .iter()
            .map(|link| LinkEdge::new(source_url, &link.url, &link.anchor))
            .collect();
        self.put_inlinks(build_inlink_entries(&edges).rows, &mut report);

        Ok(report)
    }

    fn put_inlinks(
        &self,
        rows: impl IntoIterator<Item = (RowKey, ColumnMap)>,
        report: &mut IngestReport,
    ) {
        for (target, columns) in rows {
            match self.store.put(&target, &columns) {
                Ok(()) => {
                    report.puts += 1;
                    report.inlinks += columns.len();
                }
                Err(e) => {
                    warn!("Inlink write to {} failed: {}", target, e);
                    report.failed_inlinks.push((target, e.to_string()));
                }
            }
        }
    }
}
