use crate::error::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use webtable_core::{Column, ColumnMap, RowKey};

/// The single capability the page table needs from its storage.
///
/// `put` upserts the given cells into `row`, merging per qualifier. Cells of
/// versioned families gain a new version; the others are overwritten.
/// Separate calls carry no ordering guarantee relative to each other.
pub trait TableStore: Send + Sync {
    fn put(&self, row: &RowKey, columns: &ColumnMap) -> Result<()>;
}

impl<T: TableStore + ?Sized> TableStore for &T {
    fn put(&self, row: &RowKey, columns: &ColumnMap) -> Result<()> {
        (**self).put(row, columns)
    }
}

impl<T: TableStore + ?Sized> TableStore for Arc<T> {
    fn put(&self, row: &RowKey, columns: &ColumnMap) -> Result<()> {
        (**self).put(row, columns)
    }
}

impl<T: TableStore + ?Sized> TableStore for Box<T> {
    fn put(&self, row: &RowKey, columns: &ColumnMap) -> Result<()> {
        (**self).put(row, columns)
    }
}

/// One retained value of a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Epoch milliseconds assigned by the table at write time.
    pub timestamp: i64,
    pub value: Vec<u8>,
}

/// Cells of one row, each with its versions most-recent-first.
pub type StoredRow = BTreeMap<Column, Vec<Version>>;

/// Write timestamps: wall-clock milliseconds, forced to move forward so
/// consecutive puts never share a version.
#[derive(Debug, Default)]
pub(crate) struct VersionClock {
    last: i64,
}

impl VersionClock {
    pub(crate) fn starting_after(last: i64) -> Self {
        Self { last }
    }

    /// Make the next tick land after `ts`, a version written elsewhere.
    pub(crate) fn observe(&mut self, ts: i64) {
        self.last = self.last.max(ts);
    }

    pub(crate) fn tick(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        self.last
    }
}
