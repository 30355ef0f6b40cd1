// src/main.rs

//! cadash CLI: resolve school names, fetch dashboard summary cards, print.

use std::fs::File;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cadash::config::load_config;
use cadash::error::{AppError, Result};
use cadash::models::{Config, School, SummaryCard};
use cadash::services::{build_plan, enrich, load_roster, match_school, DashboardFetcher};
use cadash::utils::log;

#[derive(Parser, Debug)]
#[command(
    name = "cadash",
    version,
    about = "Bulk fetch client for the California School Dashboard"
)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch summary cards for schools and years
    Fetch {
        /// Roster CSV path (overrides config)
        #[arg(long)]
        roster: Option<PathBuf>,

        /// School name to fetch, fuzzy-matched against the roster (repeatable)
        #[arg(long = "school")]
        schools: Vec<String>,

        /// File with one school name per line
        #[arg(long)]
        schools_file: Option<PathBuf>,

        /// Reporting year to fetch (repeatable)
        #[arg(long = "year", required = true)]
        years: Vec<u16>,

        /// Write the decoded cards to this JSON file
        #[arg(long)]
        out: Option<PathBuf>,

        /// Worker pool size (overrides config)
        #[arg(long)]
        pool_size: Option<usize>,

        /// Per-request timeout in milliseconds (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Global request rate cap (overrides config)
        #[arg(long)]
        max_rps: Option<f64>,
    },

    /// Show what a school name resolves to
    Lookup {
        /// Roster CSV path (overrides config)
        #[arg(long)]
        roster: Option<PathBuf>,

        /// School name to resolve
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    log::init(&config.logging.level);

    if cli.quiet {
        config.logging.show_progress = false;
    }

    match cli.command {
        Command::Fetch {
            roster,
            schools,
            schools_file,
            years,
            out,
            pool_size,
            timeout_ms,
            max_rps,
        } => {
            if let Some(pool_size) = pool_size {
                config.fetcher.pool_size = pool_size;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.fetcher.timeout_ms = timeout_ms;
            }
            if let Some(max_rps) = max_rps {
                config.fetcher.max_requests_per_sec = max_rps;
            }
            run_fetch(&config, roster, schools, schools_file, &years, out).await
        }
        Command::Lookup { roster, name } => run_lookup(&config, roster, &name),
    }
}

async fn run_fetch(
    config: &Config,
    roster: Option<PathBuf>,
    schools: Vec<String>,
    schools_file: Option<PathBuf>,
    years: &[u16],
    out: Option<PathBuf>,
) -> Result<()> {
    let roster_path = roster.unwrap_or_else(|| PathBuf::from(&config.paths.roster));
    let roster = load_roster(&roster_path)?;
    log::info(&format!(
        "loaded {} schools from {}",
        roster.len(),
        roster_path.display()
    ));

    let mut names = schools;
    if let Some(path) = schools_file {
        let text = std::fs::read_to_string(&path)?;
        names.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    if names.is_empty() {
        return Err(AppError::validation(
            "no schools requested; pass --school or --schools-file",
        ));
    }

    let mut pairs: Vec<(School, u16)> = Vec::new();
    for name in &names {
        match match_school(&roster, name) {
            Some(school) => {
                log::info(&format!(
                    "\"{name}\" resolved to {} ({})",
                    school.name, school.cds_code
                ));
                for year in years {
                    pairs.push((school.clone(), *year));
                }
            }
            None => log::warn(&format!("no roster match for \"{name}\"")),
        }
    }

    let (urls, meta) = build_plan(&pairs);
    if urls.is_empty() {
        return Err(AppError::validation("nothing to fetch"));
    }
    log::info(&format!("fetching {} summary cards", urls.len()));

    let mut fetcher = DashboardFetcher::new(config.fetcher.clone())
        .with_progress(config.logging.show_progress);
    if !fetcher.load_urls(urls) {
        return Err(AppError::validation("no valid URLs to fetch"));
    }
    if !fetcher.run().await {
        return Err(AppError::fetch("run", "fetch run did not complete"));
    }

    enrich(&mut fetcher.output, &meta);
    print_cards(&fetcher.output);

    if let Some(path) = out {
        serde_json::to_writer_pretty(File::create(&path)?, &fetcher.output)?;
        log::info(&format!(
            "wrote {} cards to {}",
            fetcher.output.len(),
            path.display()
        ));
    }

    Ok(())
}

fn run_lookup(config: &Config, roster: Option<PathBuf>, name: &str) -> Result<()> {
    let roster_path = roster.unwrap_or_else(|| PathBuf::from(&config.paths.roster));
    let roster = load_roster(&roster_path)?;

    match match_school(&roster, name) {
        Some(school) => {
            println!(
                "{} -> {} [{}] ({}, {})",
                name, school.name, school.cds_code, school.district, school.county
            );
            Ok(())
        }
        None => Err(AppError::validation(format!("no roster match for \"{name}\""))),
    }
}

fn print_cards(cards: &[SummaryCard]) {
    for card in cards {
        if card.indicators.is_empty() {
            println!(
                "{} ({}): no data",
                display_name(card),
                display_year(card)
            );
            continue;
        }

        println!("=== {} ({}) ===", display_name(card), display_year(card));
        for indicator in &card.indicators {
            println!(
                "  {:<26} {:<22} status {:>7.1}  change {:>+7.1}  n={}",
                indicator.indicator_category.as_str(),
                indicator.student_group,
                indicator.status,
                indicator.change,
                indicator.count
            );
        }
    }
}

fn display_name(card: &SummaryCard) -> &str {
    if card.school_name.is_empty() {
        "<unknown school>"
    } else {
        &card.school_name
    }
}

fn display_year(card: &SummaryCard) -> &str {
    if card.year.is_empty() {
        "?"
    } else {
        &card.year
    }
}
