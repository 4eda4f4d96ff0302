use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;
use webtable::DEFAULT_DB_PATH;

fn db_arg() -> clap::Arg {
    arg!(-d --"db" <PATH>)
        .required(false)
        .help("Location of the page table database")
        .default_value(DEFAULT_DB_PATH)
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("webtable")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("webtable")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log each ingested page (overridden by RUST_LOG)")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(--"config" <FILE>)
                .required(false)
                .global(true)
                .help("Table configuration JSON (per-family max_versions)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand_required(false)
        .subcommand(
            command!("key")
                .about("Prints the row key derived for each URL")
                .arg(
                    arg!(<URL> ...)
                        .required(true)
                        .help("One or more absolute URLs"),
                ),
        )
        .subcommand(
            command!("ingest")
                .about("Writes one crawled page and both sides of its links into the table")
                .arg(
                    arg!(-p --"page" <FILE>)
                        .required(true)
                        .help("JSON page document (url, html, fetch_time, status, content_type)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(db_arg()),
        )
        .subcommand(
            command!("seed")
                .about(
                    "Loads the sample example.com pages and a generated link chain for a \
                handful of popular sites.",
                )
                .arg(db_arg())
                .arg(
                    arg!(--"min-pages" <N>)
                        .required(false)
                        .help("Fewest pages generated per site")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3"),
                )
                .arg(
                    arg!(--"max-pages" <N>)
                        .required(false)
                        .help("Most pages generated per site")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("8"),
                ),
        )
        .subcommand(
            command!("dump")
                .about("Prints stored rows in key order")
                .arg(db_arg())
                .arg(
                    arg!(--"prefix" <PREFIX>)
                        .required(false)
                        .help("Only rows whose key starts with PREFIX, e.g. '9!com.example'")
                        .conflicts_with("site"),
                )
                .arg(
                    arg!(--"site" <HOST>)
                        .required(false)
                        .help("Only rows of HOST, scanning all 16 salt buckets")
                        .conflicts_with("prefix"),
                ),
        )
}
