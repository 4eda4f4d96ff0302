pub mod column;
pub mod error;
pub mod key;
pub mod links;
pub mod record;

pub use column::{Column, ColumnMap, Family};
pub use error::{Error, Result};
pub use key::{RowKey, derive_key, reverse_domain, site_prefixes};
pub use record::{
    InlinkBatch, LinkEdge, Outlink, OutlinkBatch, Page, PageWrites, RejectedEdge,
    build_inlink_entries, build_outlink_entries, build_own_record, build_page,
};
