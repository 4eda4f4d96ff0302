use crate::config::TableConfig;
use crate::error::{Result, StoreError};
use crate::store::{StoredRow, TableStore, Version, VersionClock};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use webtable_core::{Column, ColumnMap, RowKey};

/// Sorted in-memory page table.
pub struct MemoryTable {
    config: TableConfig,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: BTreeMap<RowKey, StoredRow>,
    clock: VersionClock,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::with_config(TableConfig::default())
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Retained versions of one cell, most-recent-first.
    pub fn versions(&self, row: &RowKey, column: &Column) -> Result<Vec<Version>> {
        let inner = self.lock()?;
        Ok(inner
            .rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .cloned()
            .unwrap_or_default())
    }

    /// Most recent value of one cell.
    pub fn latest(&self, row: &RowKey, column: &Column) -> Result<Option<Vec<u8>>> {
        Ok(self.versions(row, column)?.into_iter().next().map(|v| v.value))
    }

    pub fn row(&self, row: &RowKey) -> Result<Option<StoredRow>> {
        Ok(self.lock()?.rows.get(row).cloned())
    }

    /// Row keys in sort order.
    pub fn row_keys(&self) -> Result<Vec<RowKey>> {
        Ok(self.lock()?.rows.keys().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.rows.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStore for MemoryTable {
    fn put(&self, row: &RowKey, columns: &ColumnMap) -> Result<()> {
        if columns.is_empty() {
            return Ok(());
        }

        let mut inner = self.lock()?;
        let timestamp = inner.clock.tick();
        let cells = inner.rows.entry(row.clone()).or_default();

        for (column, value) in columns {
            let versions = cells.entry(column.clone()).or_default();
            versions.insert(
                0,
                Version {
                    timestamp,
                    value: value.clone(),
                },
            );
            versions.truncate(self.config.max_versions(column.family));
        }

        debug!("Put {} cells into row {} at {}", columns.len(), row, timestamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webtable_core::{Family, derive_key};

    fn row() -> RowKey {
        derive_key("https://www.example.com/").unwrap()
    }

    fn single(family: Family, qualifier: &str, value: &str) -> ColumnMap {
        let mut columns = ColumnMap::new();
        columns.put(family, qualifier, value);
        columns
    }

    #[test]
    fn test_put_merges_qualifiers() {
        let table = MemoryTable::new();
        table.put(&row(), &single(Family::Meta, "status", "200")).unwrap();
        table.put(&row(), &single(Family::Inlinks, "3!net.tech.blog/123", "Example Inc")).unwrap();

        let stored = table.row(&row()).unwrap().unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn test_versioned_cells_prepend() {
        let table = MemoryTable::new();
        let status = Column::new(Family::Meta, "status");
        table.put(&row(), &single(Family::Meta, "status", "500")).unwrap();
        table.put(&row(), &single(Family::Meta, "status", "200")).unwrap();

        let versions = table.versions(&row(), &status).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].value, b"200");
        assert_eq!(versions[1].value, b"500");
        assert!(versions[0].timestamp > versions[1].timestamp);
        assert_eq!(table.latest(&row(), &status).unwrap(), Some(b"200".to_vec()));
    }

    #[test]
    fn test_versions_pruned_to_config() {
        let config = TableConfig::default().with_max_versions(Family::Content, 2).unwrap();
        let table = MemoryTable::with_config(config);
        for body in ["v1", "v2", "v3"] {
            table.put(&row(), &single(Family::Content, "html", body)).unwrap();
        }

        let versions = table.versions(&row(), &Column::new(Family::Content, "html")).unwrap();
        let values: Vec<&[u8]> = versions.iter().map(|v| v.value.as_slice()).collect();
        assert_eq!(values, vec![&b"v3"[..], &b"v2"[..]]);
    }

    #[test]
    fn test_link_cells_overwrite() {
        let table = MemoryTable::new();
        let qualifier = "9!com.example.www/about";
        table.put(&row(), &single(Family::Outlinks, qualifier, "About")).unwrap();
        table.put(&row(), &single(Family::Outlinks, qualifier, "About Us")).unwrap();

        let versions = table
            .versions(&row(), &Column::new(Family::Outlinks, qualifier))
            .unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].value, b"About Us");
    }

    #[test]
    fn test_rows_sorted_by_key() {
        let table = MemoryTable::new();
        for url in ["https://www.example.com/about", "https://blog.tech.net/123", "https://www.example.com/"] {
            table
                .put(&derive_key(url).unwrap(), &single(Family::Meta, "status", "200"))
                .unwrap();
        }
        let keys: Vec<String> = table.row_keys().unwrap().into_iter().map(RowKey::into_string).collect();
        assert_eq!(
            keys,
            vec!["3!net.tech.blog/123", "9!com.example.www/about", "e!com.example.www/"]
        );
    }

    #[test]
    fn test_empty_put_creates_no_row() {
        let table = MemoryTable::new();
        table.put(&row(), &ColumnMap::new()).unwrap();
        assert!(table.row(&row()).unwrap().is_none());
        assert_eq!(table.len().unwrap(), 0);
    }

    #[test]
    fn test_missing_row() {
        let table = MemoryTable::new();
        assert!(table.row(&row()).unwrap().is_none());
        assert!(table.is_empty().unwrap());
    }
}
