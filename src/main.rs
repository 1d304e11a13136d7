//! dokumap - Reconstruct the content graph of a DokuWiki data directory.
//!
//! Usage:
//!   dokumap [PATH]               Print the namespace summary
//!   dokumap summary [PATH]       Same as above
//!   dokumap stats [PATH]         Per-tree counters, sizes and warnings
//!   dokumap export [PATH]        Export the loaded tree to JSON
//!   dokumap --help               Show help

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dokumap_core::RecordCollector;
use dokumap_scan::{LoadReport, NodeKind, Site, SiteConfig, WarningKind};

#[derive(Parser)]
#[command(
    name = "dokumap",
    version,
    about = "Map the pages, media and history of a DokuWiki installation",
    long_about = "dokumap walks the pages, media, attic, media_attic and meta trees \
                  of a DokuWiki data directory and rebuilds one namespace graph \
                  from them.\n\n\
                  Run `dokumap [PATH]` for a summary, or use a subcommand."
)]
struct Cli {
    /// Wiki installation directory (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Data directory, when it is not <PATH>/data
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Suffix of current page files
    #[arg(long, global = true, default_value = ".txt")]
    page_suffix: String,

    /// Compression suffix of page history files
    #[arg(long, global = true, default_value = ".gz")]
    archive_suffix: String,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load the wiki and print the namespace summary
    Summary {
        /// Wiki installation directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Load the wiki and show per-tree statistics
    Stats {
        /// Wiki installation directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// List every warning instead of counts per kind
        #[arg(short, long)]
        warnings: bool,
    },

    /// Export the loaded tree to JSON
    Export {
        /// Wiki installation directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(&cli)?;

    match &cli.command {
        Some(Command::Summary { path }) => run_summary(&cli, path)?,
        Some(Command::Stats { path, warnings }) => run_stats(&cli, path, *warnings)?,
        Some(Command::Export { path, output }) => run_export(&cli, path, output.as_deref())?,
        None => run_summary(&cli, &cli.path)?,
    }

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over the flags.
fn init_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    let file_layer = match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot create log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };
    let stderr_layer = cli
        .log_file
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}

/// Build the site config from the global flags.
fn site_config(cli: &Cli, path: &Path) -> Result<SiteConfig> {
    let root = path.canonicalize().context("Invalid path")?;
    tracing::debug!("Wiki root: {}", root.display());
    SiteConfig::builder()
        .root(root)
        .data_dir(cli.data_dir.clone())
        .page_suffix(cli.page_suffix.as_str())
        .archive_suffix(cli.archive_suffix.as_str())
        .build()
        .context("Invalid configuration")
}

/// Load every tree of the wiki at `path`.
fn load_site(cli: &Cli, path: &Path) -> Result<(Site, LoadReport)> {
    let mut site = Site::new(site_config(cli, path)?);
    let report = site.load().context("Load failed")?;
    Ok((site, report))
}

fn run_summary(cli: &Cli, path: &Path) -> Result<()> {
    let (site, _) = load_site(cli, path)?;
    print!("{}", site.summary());
    Ok(())
}

fn run_stats(cli: &Cli, path: &Path, list_warnings: bool) -> Result<()> {
    let (site, report) = load_site(cli, path)?;

    println!();
    println!("{}", "─".repeat(60));
    println!(" {}", site.config().root.display());
    if let Some(version) = site.version() {
        println!(" DokuWiki {}", version);
    }
    println!(
        " {} namespaces, {} nodes, {} revisions",
        report.namespaces, report.nodes, report.revisions
    );
    println!(" Loaded in {:.2}s", report.duration.as_secs_f64());
    println!("{}", "─".repeat(60));
    println!();

    println!(
        " {:<12} {:>8} {:>8} {:>8} {:>10}",
        "Tree", "Files", "Dirs", "Skipped", "Time"
    );
    for pass in &report.passes {
        if !pass.present {
            println!(" {:<12} {:>8}", pass.kind.to_string(), "absent");
            continue;
        }
        println!(
            " {:<12} {:>8} {:>8} {:>8} {:>9.2}s",
            pass.kind.to_string(),
            pass.files,
            pass.dirs,
            pass.skipped,
            pass.duration.as_secs_f64()
        );
    }
    println!();

    let sizes = SizeTotals::collect(&site);
    println!(
        " Pages:   {:>6} current ({}), {} missing",
        sizes.pages,
        format_size(sizes.page_bytes),
        sizes.missing_pages
    );
    println!(
        " Media:   {:>6} current ({}), {} missing",
        sizes.media,
        format_size(sizes.media_bytes),
        sizes.missing_media
    );
    println!(
        " History: {:>6} archived ({})",
        sizes.archived,
        format_size(sizes.archived_bytes)
    );

    let warnings = site.warnings();
    if !warnings.is_empty() {
        println!();
        println!(" {} warning(s) during load", warnings.len());
        if list_warnings {
            for warning in warnings {
                println!("   [{:?}] {}: {}", warning.kind, warning.path.display(), warning.message);
            }
        } else {
            let mut counts: Vec<(WarningKind, usize)> = Vec::new();
            for warning in warnings {
                match counts.iter_mut().find(|(kind, _)| *kind == warning.kind) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((warning.kind, 1)),
                }
            }
            for (kind, count) in counts {
                println!("   {:<24} {:>6}", format!("{kind:?}"), count);
            }
        }
    }

    Ok(())
}

fn run_export(cli: &Cli, path: &Path, output: Option<&Path>) -> Result<()> {
    let (site, _) = load_site(cli, path)?;

    let mut collector = RecordCollector::new();
    if let Err(never) = site.accept(&mut collector) {
        match never {}
    }
    let json = serde_json::to_string_pretty(collector.records())?;

    match output {
        Some(out_path) => {
            let mut file = File::create(out_path)
                .with_context(|| format!("Cannot create {}", out_path.display()))?;
            writeln!(file, "{json}")?;
            eprintln!(
                "Exported {} records to {}",
                collector.records().len(),
                out_path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Byte and item totals over the loaded tree.
#[derive(Default)]
struct SizeTotals {
    pages: usize,
    page_bytes: u64,
    missing_pages: usize,
    media: usize,
    media_bytes: u64,
    missing_media: usize,
    archived: usize,
    archived_bytes: u64,
}

impl SizeTotals {
    fn collect(site: &Site) -> Self {
        let mut totals = Self::default();
        for namespace in site.tree().namespaces() {
            for node in namespace.pages().values().chain(namespace.media().values()) {
                let (count, bytes, missing) = match node.kind() {
                    NodeKind::Page => (
                        &mut totals.pages,
                        &mut totals.page_bytes,
                        &mut totals.missing_pages,
                    ),
                    NodeKind::Media => (
                        &mut totals.media,
                        &mut totals.media_bytes,
                        &mut totals.missing_media,
                    ),
                };
                if node.is_missing() {
                    *missing += 1;
                } else {
                    *count += 1;
                    *bytes += node.current_size().unsigned_abs();
                }
                for revision in node.revisions().filter(|r| !r.is_missing()) {
                    totals.archived += 1;
                    totals.archived_bytes += revision.size.unsigned_abs();
                }
            }
        }
        totals
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
