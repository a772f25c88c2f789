mod db;
mod error;
mod html;
mod index;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::index::{Diagnostics, ResourceKind};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "webext_docset", about = "Dash docset builder for the WebExtensions docs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify source documents and write the lookup index
    Index {
        #[command(flatten)]
        paths: PathArgs,
        /// Print the indexed entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rewrite links and insert TOC anchors in the rendered pages
    Postprocess {
        /// Docset Documents folder
        #[arg(long)]
        documents_dir: Option<PathBuf>,
    },
    /// Drop a stale index, then postprocess + index
    Build {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Search the lookup index by name
    Lookup {
        query: String,
        /// Only entries of this kind (Method, Property, ...)
        #[arg(short, long)]
        kind: Option<ResourceKind>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Show entry counts per kind
    Stats {
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PathArgs {
    /// Source documents folder (one subfolder per locale)
    #[arg(long)]
    content_dir: Option<PathBuf>,
    /// Docset Documents folder
    #[arg(long)]
    documents_dir: Option<PathBuf>,
    /// Index database file
    #[arg(long)]
    db: Option<PathBuf>,
}

impl PathArgs {
    fn apply(self, settings: &mut Settings) {
        if let Some(dir) = self.content_dir {
            settings.content_dir = dir;
        }
        if let Some(dir) = self.documents_dir {
            settings.documents_dir = dir;
        }
        if let Some(db) = self.db {
            settings.db_path = db;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load().context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Index { paths, json } => {
            paths.apply(&mut settings);
            run_index(&settings, json)
        }
        Commands::Postprocess { documents_dir } => {
            if let Some(dir) = documents_dir {
                settings.documents_dir = dir;
            }
            run_postprocess(&settings)
        }
        Commands::Build { paths } => {
            paths.apply(&mut settings);
            if settings.db_path.exists() {
                std::fs::remove_file(&settings.db_path)
                    .with_context(|| format!("Failed to remove {}", settings.db_path.display()))?;
                info!("Removed stale index {}", settings.db_path.display());
            }
            run_postprocess(&settings).and_then(|_| run_index(&settings, false))
        }
        Commands::Lookup { query, kind, limit, db: db_path } => {
            let path = db_path.unwrap_or(settings.db_path);
            if !path.exists() {
                bail!("No index at {}. Run 'index' first.", path.display());
            }
            let conn = db::connect(&path)?;
            let rows = db::lookup(&conn, &query, kind, limit)?;
            if rows.is_empty() {
                println!("No entries match \"{}\".", query);
                return Ok(());
            }

            println!("{:<10} | {:<32} | {:<24} | {}", "Kind", "Name", "Namespace", "Location");
            println!("{}", "-".repeat(110));
            for e in &rows {
                println!(
                    "{:<10} | {:<32} | {:<24} | {}",
                    e.kind,
                    truncate(&e.name, 32),
                    truncate(&e.description, 24),
                    e.location
                );
            }
            println!("\n{} entries", rows.len());
            Ok(())
        }
        Commands::Stats { db: db_path } => {
            let path = db_path.unwrap_or(settings.db_path);
            if !path.exists() {
                bail!("No index at {}. Run 'index' first.", path.display());
            }
            let conn = db::connect(&path)?;
            let counts = db::kind_counts(&conn)?;
            let total: i64 = counts.iter().map(|(_, n)| n).sum();
            for (kind, n) in &counts {
                println!("{:<10} {:>6}", format!("{}:", kind), n);
            }
            println!("{:<10} {:>6}", "Total:", total);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Sorted matches of a glob pattern. Unreadable entries are logged and
/// skipped.
fn discover(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("Invalid pattern {}", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn run_index(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let pattern = settings.content_glob();
    let paths = discover(&pattern)?;
    info!("Indexing {} documents matching {}", paths.len(), pattern);

    let mut diags = Diagnostics::new();
    let results = index::build_index(&paths, &settings.locale, &mut diags);
    if !diags.is_empty() {
        info!("{} diagnostics while indexing", diags.len());
        diags.emit();
    }
    let entries = index::usable_entries(results)
        .with_context(|| format!("Nothing to index below {}", settings.content_dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    let stats = db::insert_entries(&conn, &entries, &settings.documents_dir)?;
    let summary = format!(
        "Indexed {} entries ({} duplicates, {} missing pages, {} diagnostics) into {}",
        stats.inserted,
        stats.duplicates,
        stats.missing,
        diags.len(),
        settings.db_path.display()
    );
    if json {
        info!("{}", summary);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

fn run_postprocess(settings: &Settings) -> anyhow::Result<()> {
    let pattern = settings.pages_glob();
    let pages = discover(&pattern)?;
    if pages.is_empty() {
        warn!("No rendered pages match {}", pattern);
        return Ok(());
    }
    println!("Post-processing {} pages...", pages.len());
    let s = html::post_process(&pages, &settings.documents_dir, &settings.origin);
    println!(
        "Done: {} pages ({} failed), {} local links, {} external links, {} anchors, {} stylesheets.",
        s.pages, s.failed, s.relative_links, s.external_links, s.anchors, s.stylesheets
    );
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
