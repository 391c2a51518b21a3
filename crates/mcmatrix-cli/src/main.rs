//! mcmatrix — multi-version build matrix for Minecraft mods.
//!
//! One codebase, many target game versions. Directive-guarded source
//! regions are toggled per revision, an external builder runs only when
//! the transformed sources changed, contiguous compatible revisions share
//! one artifact, and each artifact's descriptor is rewritten with the
//! computed version range.
//!
//! ## Commands
//!
//! - `compile`: run the full matrix across all declared revisions and
//!   loaders, then patch the finished artifacts
//! - `switch`: retarget the working tree at one revision without building

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use mcmatrix_build::{patch_artifacts, switch_version, CommandBuilder, MatrixPlanner};
use mcmatrix_core::{init_tracing, Manifest, McVersion};

#[derive(Parser)]
#[command(name = "mcmatrix")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-version build matrix for Minecraft mods", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to the project manifest
    #[arg(short, long, global = true, default_value = "mcmatrix.json")]
    manifest: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every loader across every declared revision, then patch
    /// artifact descriptors with the computed version ranges
    Compile,

    /// Apply one revision's configuration and source transform to the
    /// working tree, without building
    Switch {
        /// Target revision (default: the manifest's current_version)
        revision: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let mut manifest = Manifest::load(&cli.manifest)
        .with_context(|| format!("failed to load manifest {}", cli.manifest.display()))?;
    manifest.resolve_paths(&manifest_root(&cli.manifest));

    match cli.command {
        Commands::Compile => cmd_compile(&manifest).await,
        Commands::Switch { revision } => cmd_switch(&manifest, revision.as_deref()),
    }
}

/// Directory the manifest lives in; relative manifest paths resolve
/// against it.
fn manifest_root(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Run the full matrix, then the patch pass.
///
/// Builder failures are warnings — one bad revision does not fail the
/// command. Malformed directives and configuration errors do.
async fn cmd_compile(manifest: &Manifest) -> Result<()> {
    let builder = CommandBuilder::from_config(&manifest.builder);
    let planner = MatrixPlanner::new(manifest, &builder);
    let report = planner.compile().await.context("matrix build failed")?;

    for loader in &report.loaders {
        info!(
            loader = %loader.loader,
            built = loader.built.len(),
            reused = loader.reused.len(),
            "loader complete"
        );
        for failure in &loader.failures {
            warn!(
                loader = %loader.loader,
                revision = %failure.revision,
                "revision skipped: {}",
                failure.detail
            );
        }
    }

    let patches = patch_artifacts(manifest).context("artifact patch pass failed")?;
    for (artifact, detail) in &patches.failures {
        warn!(artifact = %artifact.display(), "patch failed: {}", detail);
    }

    info!(
        artifacts = patches.patched.len(),
        failures = report.total_failures(),
        duration_ms = report.duration_ms,
        "matrix complete"
    );
    Ok(())
}

fn cmd_switch(manifest: &Manifest, revision: Option<&str>) -> Result<()> {
    let token = revision
        .or(manifest.current_version.as_deref())
        .context("no revision given and no current_version in the manifest")?;
    let revision =
        McVersion::parse(token).with_context(|| format!("invalid revision '{}'", token))?;

    switch_version(manifest, &revision)?;
    Ok(())
}
