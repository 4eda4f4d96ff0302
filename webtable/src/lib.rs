pub mod handlers;
pub mod seed;

pub const DEFAULT_DB_PATH: &str = "~/.config/webtable/webtable.db";

// Re-export commonly used handler functions for convenience
pub use handlers::{expand_db_path, load_page, load_table_config, render_row, scan_rows};
pub use seed::{SEED_SITES, SeedSummary, sample_pages, seed_samples, seed_site, site_urls};
