use crate::DEFAULT_DB_PATH;
use crate::seed::{self, SEED_SITES, SeedSummary};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use webtable_core::links::extract_text;
use webtable_core::{Page, RowKey, derive_key, reverse_domain, site_prefixes};
use webtable_store::{IngestReport, Ingestor, SqliteTable, StoredRow, TableConfig};

const VALUE_PREVIEW_CHARS: usize = 60;

pub fn print_banner() {
    print_divider();
    println!(
        "{} {}",
        "  WEBTABLE".bright_white().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    print_divider();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// Expand `~` in a database path.
pub fn expand_db_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

pub fn load_table_config(path: Option<&PathBuf>) -> Result<TableConfig> {
    match path {
        Some(path) => TableConfig::load(path)
            .with_context(|| format!("Failed to load table config {}", path.display())),
        None => Ok(TableConfig::default()),
    }
}

/// Read a JSON page document.
pub fn load_page(path: &Path) -> Result<Page> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read page file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid page document {}", path.display()))
}

fn open_table(args: &ArgMatches) -> Result<SqliteTable> {
    let config = load_table_config(args.get_one::<PathBuf>("config"))?;
    let raw = args
        .get_one::<String>("db")
        .map(String::as_str)
        .unwrap_or(DEFAULT_DB_PATH);
    let db_path = expand_db_path(raw);
    SqliteTable::open(&db_path, config)
        .with_context(|| format!("Failed to open page table at {}", db_path.display()))
}

/// Rows matching a key prefix, or every row of exactly one host across its
/// salt buckets. With neither, the whole table.
pub fn scan_rows(
    table: &SqliteTable,
    prefix: Option<&str>,
    site: Option<&str>,
) -> Result<Vec<(RowKey, StoredRow)>> {
    let prefixes = match (prefix, site) {
        (_, Some(host)) => site_prefixes(host),
        (Some(prefix), None) => vec![prefix.to_string()],
        (None, None) => vec![String::new()],
    };

    let mut rows = Vec::new();
    for prefix in &prefixes {
        rows.extend(table.rows_with_prefix(prefix)?);
    }
    // A site prefix also matches longer hosts such as `www.example.com.au`.
    if let Some(host) = site {
        let reversed = reverse_domain(host);
        rows.retain(|(key, _)| key.reversed_domain() == reversed);
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(rows)
}

/// One row as printed by `dump`: the key, then one indented line per cell
/// version.
pub fn render_row(key: &RowKey, row: &StoredRow) -> String {
    let mut out = format!("{}\n", key);
    for (column, versions) in row {
        for version in versions {
            let value = String::from_utf8_lossy(&version.value);
            let preview: String = value.chars().take(VALUE_PREVIEW_CHARS).collect();
            let ellipsis = if value.chars().count() > VALUE_PREVIEW_CHARS {
                "…"
            } else {
                ""
            };
            out.push_str(&format!(
                "  {} @{} = {}{}\n",
                column, version.timestamp, preview, ellipsis
            ));
        }
    }
    out
}

pub fn handle_key(args: &ArgMatches) -> Result<()> {
    let urls: Vec<&String> = args.get_many::<String>("URL").into_iter().flatten().collect();
    let mut failures = 0;

    for url in urls {
        match derive_key(url) {
            Ok(key) => println!("{}\t{}", key.to_string().bright_white(), url),
            Err(e) => {
                failures += 1;
                eprintln!("{} {}", "✗".red().bold(), e);
            }
        }
    }

    if failures > 0 {
        bail!("{} URL(s) could not be keyed", failures);
    }
    Ok(())
}

pub fn handle_ingest(args: &ArgMatches) -> Result<()> {
    let quiet = args.get_flag("quiet");
    let page_path = args
        .get_one::<PathBuf>("page")
        .context("--page is required")?;
    let mut page = load_page(page_path)?;
    if page.text.is_none() {
        page.text = Some(extract_text(&page.html));
    }
    let table = open_table(args)?;

    let report = Ingestor::new(&table)
        .ingest(&page)
        .with_context(|| format!("Failed to ingest {}", page.url))?;

    if !quiet {
        print_ingest_report(&page, &report);
    }
    Ok(())
}

fn print_ingest_report(page: &Page, report: &IngestReport) {
    println!("{} Ingested {}", "✓".green().bold(), page.url.bright_white());
    println!("{} Row: {}", "→".blue(), report.row);
    println!(
        "{} {} outlinks, {} inlinks, {} puts",
        "→".blue(),
        report.outlinks,
        report.inlinks,
        report.puts
    );
    for rejected in &report.rejected {
        println!(
            "  {} skipped link to {}: {}",
            "⚠".yellow().bold(),
            rejected.edge.target,
            rejected.error
        );
    }
    for (row, error) in &report.failed_inlinks {
        println!(
            "  {} inlink write to {} failed: {}",
            "⚠".yellow().bold(),
            row,
            error
        );
    }
}

pub fn handle_seed(args: &ArgMatches) -> Result<()> {
    let quiet = args.get_flag("quiet");
    let min_pages = *args.get_one::<usize>("min-pages").unwrap_or(&3);
    let max_pages = *args.get_one::<usize>("max-pages").unwrap_or(&8);
    if min_pages == 0 || min_pages > max_pages {
        bail!(
            "Invalid page range {}..={}: need 1 <= min-pages <= max-pages",
            min_pages,
            max_pages
        );
    }

    let table = open_table(args)?;
    let ingestor = Ingestor::new(&table);

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message("Ingesting sample pages...");
    let mut summary = seed::seed_samples(&ingestor).context("Failed to seed sample pages")?;

    let mut rng = rand::thread_rng();
    for domain in SEED_SITES {
        let pages = rng.gen_range(min_pages..=max_pages);
        spinner.set_message(format!("Generating {} pages for {}", pages, domain));
        let fetch_time = Utc::now().timestamp_millis();
        let site = seed::seed_site(&ingestor, domain, pages, fetch_time)
            .with_context(|| format!("Failed to seed {}", domain))?;
        summary.merge(site);
    }
    spinner.finish_and_clear();

    if !quiet {
        print_seed_summary(&summary, &table)?;
    }
    Ok(())
}

fn print_seed_summary(summary: &SeedSummary, table: &SqliteTable) -> Result<()> {
    println!("{} Seed complete!", "✓".green().bold());
    println!("{} Pages ingested: {}", "→".blue(), summary.pages);
    println!("{} Puts issued: {}", "→".blue(), summary.puts);
    println!("{} Rows in table: {}", "→".blue(), table.row_count()?);
    if summary.rejected > 0 || summary.failed_inlinks > 0 {
        println!(
            "{} {} rejected links, {} failed inlink writes",
            "⚠".yellow().bold(),
            summary.rejected,
            summary.failed_inlinks
        );
    }
    Ok(())
}

pub fn handle_dump(args: &ArgMatches) -> Result<()> {
    let table = open_table(args)?;
    let prefix = args.get_one::<String>("prefix").map(String::as_str);
    let site = args.get_one::<String>("site").map(String::as_str);

    let rows = scan_rows(&table, prefix, site)?;
    for (key, row) in &rows {
        print!("{}", render_row(key, row));
    }

    if !args.get_flag("quiet") {
        println!("{} {} rows", "→".blue(), rows.len());
    }
    Ok(())
}
