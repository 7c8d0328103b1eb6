//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load one input file through the core import pipeline.
//! - Print a deterministic summary of the delivered snapshot.

use anyhow::{bail, Context, Result};
use attrib_core::{
    default_log_level, init_logging, EditingSurface, FsProjectFileStore, ImportService,
    MergedSnapshot, ProjectContext,
};
use clap::Parser;
use log::{error, warn};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "attrib", version, about = "Load an attribution project and summarize it")]
struct Cli {
    /// Scanner-produced input file (`.json`).
    input: PathBuf,
    /// Absolute directory for rolling log files; logging is off when omitted.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// One of trace|debug|info|warn|error.
    #[arg(long)]
    log_level: Option<String>,
}

/// Prints pipeline output instead of rendering it.
#[derive(Default)]
struct ConsoleSurface {
    snapshot: Option<MergedSnapshot>,
    dropped_references: usize,
}

impl EditingSurface for ConsoleSurface {
    fn reset_loaded_file(&mut self) {
        self.snapshot = None;
        self.dropped_references = 0;
    }

    fn present_parse_failure(&mut self, message: &str) {
        error!("event=cli_load_failed module=cli status=error message={message:?}");
        eprintln!("error: {message}");
    }

    fn report_dropped_reference(&mut self, resource_id: Option<&str>, attribution_id: &str) {
        self.dropped_references += 1;
        warn!(
            "event=cli_dropped_reference module=cli status=warn resource={} attribution={attribution_id}",
            resource_id.unwrap_or("-")
        );
        eprintln!(
            "warning: dropped reference resource={} attribution={attribution_id}",
            resource_id.unwrap_or("-")
        );
    }

    fn deliver_snapshot(&mut self, snapshot: MergedSnapshot) {
        self.snapshot = Some(snapshot);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    let mut import = ImportService::new(FsProjectFileStore::new());
    let mut context = ProjectContext::default();
    let mut surface = ConsoleSurface::default();
    if let Err(err) = import.load_project(&cli.input, &mut context, &mut surface) {
        if err.is_user_recoverable() {
            bail!("{err}");
        }
        return Err(err).context("project files need repair before loading");
    }

    let (Some(snapshot), Some(identity)) = (&surface.snapshot, context.identity()) else {
        bail!("import finished without delivering a project");
    };

    println!("project_id={}", identity.project_id);
    println!(
        "project_title={}",
        identity.project_title.as_deref().unwrap_or("-")
    );
    println!("input_checksum={}", identity.input_file_checksum);
    println!(
        "critical_external_attributions={}",
        identity.contains_critical_external_attributions
    );
    println!("resources={}", snapshot.resources.resource_ids().len());
    println!(
        "external_attributions={}",
        snapshot.external_attributions.attributions.len()
    );
    println!(
        "manual_attributions={}",
        snapshot.manual_attributions.attributions.len()
    );
    println!(
        "resolved_external_attributions={}",
        snapshot.resolved_external_attributions.len()
    );
    println!("dropped_references={}", surface.dropped_references);
    Ok(())
}
