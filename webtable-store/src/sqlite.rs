use crate::config::TableConfig;
use crate::error::{Result, StoreError};
use crate::store::{StoredRow, TableStore, Version, VersionClock};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};
use webtable_core::{Column, ColumnMap, RowKey};

/// How long a put waits for another handle's write lock on the same file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Page table persisted in a single SQLite file.
///
/// Every version of every cell is one row of `cells`, keyed by
/// `(row_key, family, qualifier, ts)`. Pruning to the configured number of
/// versions happens in the same transaction as the write. Several handles
/// may share one file; each put versions past the newest cell of its row.
pub struct SqliteTable {
    config: TableConfig,
    inner: Mutex<Inner>,
}

struct Inner {
    conn: Connection,
    clock: VersionClock,
}

impl SqliteTable {
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn open(path: &Path, config: TableConfig) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!("Opened page table at {}", path.display());
        Self::from_connection(conn, config)
    }

    pub fn open_in_memory(config: TableConfig) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, config)
    }

    fn from_connection(conn: Connection, config: TableConfig) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            CREATE TABLE IF NOT EXISTS cells (
                row_key TEXT NOT NULL,
                family TEXT NOT NULL CHECK(family IN ('content', 'meta', 'outlinks', 'inlinks')),
                qualifier TEXT NOT NULL,
                ts INTEGER NOT NULL,
                value BLOB NOT NULL,
                PRIMARY KEY (row_key, family, qualifier, ts)
            ) WITHOUT ROWID;
            ",
        )?;

        let last: Option<i64> = conn
            .query_row("SELECT MAX(ts) FROM cells", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(Self {
            config,
            inner: Mutex::new(Inner {
                conn,
                clock: VersionClock::starting_after(last.unwrap_or(0)),
            }),
        })
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
        let mut stmt = inner.conn.prepare(
            "SELECT ts, value FROM cells
             WHERE row_key = ?1 AND family = ?2 AND qualifier = ?3
             ORDER BY ts DESC",
        )?;
        let versions = stmt
            .query_map(
                params![row.as_str(), column.family.as_str(), &column.qualifier],
                |r| {
                    Ok(Version {
                        timestamp: r.get(0)?,
                        value: r.get(1)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(versions)
    }

    pub fn latest(&self, row: &RowKey, column: &Column) -> Result<Option<Vec<u8>>> {
        Ok(self.versions(row, column)?.into_iter().next().map(|v| v.value))
    }

    pub fn row(&self, row: &RowKey) -> Result<Option<StoredRow>> {
        let inner = self.lock()?;
        let mut stmt = inner.conn.prepare(
            "SELECT family, qualifier, ts, value FROM cells
             WHERE row_key = ?1
             ORDER BY family, qualifier, ts DESC",
        )?;
        let mut cursor = stmt.query(params![row.as_str()])?;

        let mut cells = StoredRow::new();
        while let Some(r) = cursor.next()? {
            let family: String = r.get(0)?;
            let qualifier: String = r.get(1)?;
            let column = Column::parse(&format!("{}:{}", family, qualifier))?;
            cells.entry(column).or_default().push(Version {
                timestamp: r.get(2)?,
                value: r.get(3)?,
            });
        }

        Ok((!cells.is_empty()).then_some(cells))
    }

    /// Rows whose key starts with `prefix`, in key order.
    pub fn rows_with_prefix(&self, prefix: &str) -> Result<Vec<(RowKey, StoredRow)>> {
        let inner = self.lock()?;
        let mut stmt = inner.conn.prepare(
            "SELECT row_key, family, qualifier, ts, value FROM cells
             WHERE row_key >= ?1
             ORDER BY row_key, family, qualifier, ts DESC",
        )?;
        let mut cursor = stmt.query(params![prefix])?;

        let mut rows: Vec<(RowKey, StoredRow)> = Vec::new();
        while let Some(r) = cursor.next()? {
            let key: String = r.get(0)?;
            if !key.starts_with(prefix) {
                break;
            }
            let family: String = r.get(1)?;
            let qualifier: String = r.get(2)?;
            let column = Column::parse(&format!("{}:{}", family, qualifier))?;
            let version = Version {
                timestamp: r.get(3)?,
                value: r.get(4)?,
            };

            let same_row = rows.last().is_some_and(|(last, _)| last.as_str() == key);
            if same_row && let Some((_, cells)) = rows.last_mut() {
                cells.entry(column).or_default().push(version);
            } else {
                let mut cells = StoredRow::new();
                cells.insert(column, vec![version]);
                rows.push((RowKey::parse(&key)?, cells));
            }
        }

        Ok(rows)
    }

    pub fn row_count(&self) -> Result<usize> {
        let inner = self.lock()?;
        let count: i64 =
            inner
                .conn
                .query_row("SELECT COUNT(DISTINCT row_key) FROM cells", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

impl TableStore for SqliteTable {
    fn put(&self, row: &RowKey, columns: &ColumnMap) -> Result<()> {
        if columns.is_empty() {
            return Ok(());
        }

        let mut inner = self.lock()?;
        let Inner { conn, clock } = &mut *inner;
        // Other handles on the same file write under their own clocks; the
        // write lock taken here makes the row's newest version visible.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let newest: Option<i64> = tx.query_row(
            "SELECT MAX(ts) FROM cells WHERE row_key = ?1",
            params![row.as_str()],
            |r| r.get(0),
        )?;
        if let Some(newest) = newest {
            clock.observe(newest);
        }
        let timestamp = clock.tick();
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO cells (row_key, family, qualifier, ts, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut prune = tx.prepare_cached(
                "DELETE FROM cells
                 WHERE row_key = ?1 AND family = ?2 AND qualifier = ?3 AND ts NOT IN (
                     SELECT ts FROM cells
                     WHERE row_key = ?1 AND family = ?2 AND qualifier = ?3
                     ORDER BY ts DESC LIMIT ?4
                 )",
            )?;

            for (column, value) in columns {
                let family = column.family.as_str();
                insert.execute(params![row.as_str(), family, &column.qualifier, timestamp, value])?;
                let keep = self.config.max_versions(column.family) as i64;
                prune.execute(params![row.as_str(), family, &column.qualifier, keep])?;
            }
        }
        tx.commit()?;

        debug!("Put {} cells into row {} at {}", columns.len(), row, timestamp);
        Ok(())
    }
}
