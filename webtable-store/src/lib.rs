pub mod config;
pub mod error;
pub mod ingest;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use config::TableConfig;
pub use error::{Result, StoreError};
pub use ingest::{IngestReport, Ingestor};
pub use memory::MemoryTable;
pub use sqlite::SqliteTable;
pub use store::{StoredRow, TableStore, Version};
