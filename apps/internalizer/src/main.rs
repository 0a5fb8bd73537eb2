//! Internalizer CLI.
//!
//! The `internalizer` command reads a Go module and prints the packages
//! that could move under an `internal/` directory, given who imports them.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use internalizer_core::{AnalyzeOptions, analyze, config};
use std::io::Write;
use std::path::PathBuf;

mod report;

use report::Report;

#[derive(Parser)]
#[command(name = "internalizer")]
#[command(about = "Suggest which packages of a Go module can move under internal/")]
#[command(version)]
struct Cli {
    /// Go module folder (the directory holding go.mod)
    module_dir: PathBuf,

    /// Name of the restricted directory segment
    #[arg(long, value_name = "NAME")]
    marker: Option<String>,

    /// Hide moves whose new path falls under PREFIX (repeatable)
    #[arg(long = "accept", value_name = "PREFIX")]
    accept: Vec<String>,

    /// Skip files and directories matching GLOB, relative to the module root (repeatable)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Also walk vendor, testdata and dot/underscore-prefixed entries
    #[arg(long)]
    all_dirs: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// List the importers behind each proposed move
    #[arg(long)]
    explain: bool,

    /// Config file (defaults to internalizer.json in the module folder)
    #[arg(long, value_name = "PATH", env = "INTERNALIZER_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let loaded = config::load(&cli.module_dir, cli.config.as_deref())
        .with_context(|| format!("failed to load config for {}", cli.module_dir.display()))?;
    let mut cfg = loaded.config;

    // Flags win over file and env
    if let Some(marker) = cli.marker {
        cfg.marker = marker;
    }
    cfg.accepted_prefixes.extend(cli.accept);
    cfg.exclude.extend(cli.exclude);
    if cli.all_dirs {
        cfg.include_ignored_dirs = true;
    }
    config::validate(&cfg)?;

    let analysis = analyze(&cli.module_dir, &AnalyzeOptions::from(&cfg))
        .with_context(|| format!("failed to analyze {}", cli.module_dir.display()))?;

    let report = Report::new(&analysis, &cfg.accepted_prefixes);
    if report.elided() > 0 {
        tracing::info!(
            "Hid {} moves under accepted prefixes",
            report.elided()
        );
    }

    let mut out = std::io::stdout().lock();
    match cli.format {
        Format::Text => report.write_text(&mut out, cli.explain)?,
        Format::Json => report.write_json(&mut out)?,
    }
    out.flush()?;
    Ok(())
}
