// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! TLCEVAL - thin-layer chromatography plate evaluation
//!
//! Command-line access to the capture database: register plate images,
//! inspect and export their registration and quantification results.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tlceval::io::{media, serialization};
use tlceval::models::capture::{Capture, CaptureId};
use tlceval::report::CaptureReport;
use tlceval::store::{CaptureStore, Database};
use tlceval::Config;

#[derive(Parser)]
#[command(name = "tlceval")]
#[command(about = "Register and quantify thin-layer chromatography plate captures")]
#[command(version)]
struct Cli {
    /// Capture database (JSON). Overrides the config file.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Configuration file (YAML or JSON).
    #[arg(long, global = true, default_value = "tlceval.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a plate image as a new capture.
    Add {
        /// Path to the plate photograph.
        #[arg(long)]
        image: PathBuf,

        /// Name of the analysed agent.
        #[arg(long)]
        agent: Option<String>,
    },

    /// List all captures.
    List,

    /// Print a capture with its rectangle and spots.
    Show {
        #[arg(long)]
        capture: i64,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Write a capture report to a .json or .yaml file.
    Export {
        #[arg(long)]
        capture: i64,

        #[arg(long)]
        out: PathBuf,
    },

    /// Set the agent name of a capture.
    Rename {
        #[arg(long)]
        capture: i64,

        #[arg(long)]
        name: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let store_path = cli.store.unwrap_or(config.store_path);
    let db = Database::open(&store_path)
        .with_context(|| format!("Failed to open capture database {}", store_path.display()))?;

    match cli.command {
        Commands::Add { image, agent } => run_add(&db, &image, agent),
        Commands::List => run_list(&db),
        Commands::Show { capture, format } => run_show(&db, CaptureId(capture), format),
        Commands::Export { capture, out } => run_export(&db, CaptureId(capture), &out),
        Commands::Rename { capture, name } => run_rename(&db, CaptureId(capture), name),
    }
}

fn run_add(db: &Database, image: &Path, agent: Option<String>) -> Result<()> {
    let path = std::fs::canonicalize(image)
        .with_context(|| format!("Failed to resolve {}", image.display()))?;
    let extent = media::image_extent(&path)?;

    let id = CaptureId(chrono::Utc::now().timestamp_millis());
    let mut capture = Capture::new(id, path);
    capture.agent_name = agent;
    db.insert_captures(std::slice::from_ref(&capture))?;

    log::info!(
        "Added capture {} ({}x{}) for {}",
        id,
        extent.width,
        extent.height,
        capture.path.display()
    );
    println!("{}", id);
    Ok(())
}

fn run_list(db: &Database) -> Result<()> {
    let captures = db.captures();
    if captures.is_empty() {
        println!("No captures");
        return Ok(());
    }
    for capture in captures {
        let state = match (&capture.crop_path, &capture.background_subtract_path) {
            (_, Some(_)) => "quantified",
            (Some(_), None) => "registered",
            (None, None) => "new",
        };
        println!(
            "{:>14}  {:<10}  {:<16}  {}",
            capture.id,
            state,
            capture.agent_name.as_deref().unwrap_or("-"),
            capture.path.display()
        );
    }
    Ok(())
}

fn load_report(db: &Database, id: CaptureId) -> Result<CaptureReport> {
    match db.load_full_info(id)? {
        Some(info) => Ok(CaptureReport::new(&info)),
        None => bail!("No capture with id {}", id),
    }
}

fn run_show(db: &Database, id: CaptureId, format: OutputFormat) -> Result<()> {
    let report = load_report(db, id)?;
    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
    }
    Ok(())
}

fn run_export(db: &Database, id: CaptureId, out: &Path) -> Result<()> {
    let report = load_report(db, id)?;
    serialization::export(&report, out)?;
    log::info!("Exported capture {} to {}", id, out.display());
    Ok(())
}

fn run_rename(db: &Database, id: CaptureId, name: String) -> Result<()> {
    let Some(mut capture) = db.find_capture(id)? else {
        bail!("No capture with id {}", id);
    };
    capture.agent_name = Some(name);
    db.update_capture(&capture)?;
    log::info!("Renamed capture {}", id);
    Ok(())
}
