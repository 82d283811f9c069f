use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use bibsync::fetch::Fetcher;
use bibsync::reconcile::{self, ReconcileOptions};
use bibsync::{BibStore, DblpClient, FetchConfig, PublicationSource, Reporter};

/// Keep a BibTeX bibliography in sync with DBLP.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the bibliography file
    #[arg(long, default_value = "references.bib", global = true)]
    bib: PathBuf,
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh DBLP-sourced entries and lint local ones
    Sync {
        /// Skip all network refresh (also honored via BIBSYNC_OFFLINE=true)
        #[arg(long)]
        offline: bool,
    },
    /// Fetch new entries for the queries and authors in the config file
    Fetch {
        /// Path to the JSON configuration
        #[arg(long, default_value = "dblp_config.json")]
        config: PathBuf,
    },
    /// Search DBLP and interactively add selected results
    Search {
        query: String,
        /// Maximum number of hits to display
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let start = Instant::now();
    log::info!("=== bibsync started ===");

    match cli.command {
        Command::Sync { offline } => run_sync(&cli.bib, offline)?,
        Command::Fetch { config } => run_fetch(&cli.bib, &config)?,
        Command::Search { query, limit } => run_search(&cli.bib, &query, limit)?,
    }

    log::info!(
        "execution time: {:.2} seconds",
        start.elapsed().as_secs_f64()
    );
    log::info!("=== bibsync finished ===");
    Ok(())
}

fn offline_from_env() -> bool {
    std::env::var("BIBSYNC_OFFLINE")
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn run_sync(bib: &PathBuf, offline_flag: bool) -> anyhow::Result<()> {
    let offline = offline_flag || offline_from_env();
    let mut store =
        BibStore::load(bib).with_context(|| format!("loading {}", bib.display()))?;
    let client = DblpClient::new()?;
    let mut reporter = Reporter::new();

    let options = ReconcileOptions {
        offline,
        ..Default::default()
    };
    reconcile::run(&mut store, &client, &options, &mut reporter)?;

    let wrote = store
        .save(bib)
        .with_context(|| format!("writing {}", bib.display()))?;
    reporter.sync_summary(wrote);
    Ok(())
}

fn run_fetch(bib: &PathBuf, config_path: &PathBuf) -> anyhow::Result<()> {
    let config = FetchConfig::load(config_path)?;
    let mut store =
        BibStore::load(bib).with_context(|| format!("loading {}", bib.display()))?;
    let client = DblpClient::new()?;
    let mut reporter = Reporter::new();

    println!(
        "Running fetch for {} queries and {} authors...",
        config.queries.len(),
        config.authors.len()
    );
    Fetcher::new(&client, &mut store, bib).run(&config, &mut reporter)?;
    reporter.fetch_summary();
    Ok(())
}

fn run_search(bib: &PathBuf, query: &str, limit: usize) -> anyhow::Result<()> {
    let client = DblpClient::new()?;
    let hits = client.search(query, limit)?;

    if hits.is_empty() {
        println!("No results found. Try a different query.");
        return Ok(());
    }

    for (index, hit) in hits.iter().enumerate() {
        println!(
            "[{index}] {}\n     {}\n     {}\n",
            hit.title,
            hit.authors,
            hit.year.as_deref().unwrap_or("N/A")
        );
    }

    print!("Enter the numbers of the entries to add (comma-separated): ");
    io::stdout().flush()?;
    let mut selection = String::new();
    io::stdin().lock().read_line(&mut selection)?;

    let indexes = match parse_selection(&selection) {
        Some(indexes) => indexes,
        None => {
            println!("Invalid input. Please enter numbers separated by commas.");
            return Ok(());
        }
    };
    if indexes.is_empty() {
        return Ok(());
    }

    let mut store =
        BibStore::load(bib).with_context(|| format!("loading {}", bib.display()))?;
    let mut reporter = Reporter::new();
    Fetcher::new(&client, &mut store, bib).add_selection(&hits, &indexes, &mut reporter)?;
    reporter.fetch_summary();
    Ok(())
}

fn parse_selection(input: &str) -> Option<Vec<usize>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(Vec::new());
    }
    trimmed
        .split(',')
        .map(|part| part.trim().parse::<usize>().ok())
        .collect()
}
