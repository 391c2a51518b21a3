//! Compatibility run planner: the matrix build orchestrator.
//!
//! For each loader, revisions are processed strictly in ascending order.
//! Every revision gets its configuration overrides applied and the
//! directive preprocessor run over the module's and the shared trees'
//! sources; a rebuild happens only when that pass actually changed
//! something (or no run is open yet). Revisions whose transformation was
//! a no-op are folded into the previous run — the preprocessor's output
//! is the literal build input, so an unchanged tree is guaranteed to
//! compile to an equivalent artifact.
//!
//! The pipeline is inherently stateful: each pass operates on the tree
//! left behind by the previous revision. Shared trees are therefore owned
//! by this single coordinating pass — their baselines are snapshotted
//! once before any loader runs and restored once after the whole matrix.
//!
//! Builder failures are recoverable: the failed revision is reported and
//! skipped, the current run is closed (the next revision rebuilds), and
//! the matrix carries on.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use mcmatrix_core::manifest::RevisionConfig;
use mcmatrix_core::{
    apply_to_tree, ConfigStore, Manifest, McMatrixError, McVersion, Result, RunRecord,
};

use crate::builder::Builder;

/// One revision that could not be built.
#[derive(Debug, Clone)]
pub struct RevisionFailure {
    pub revision: String,
    pub detail: String,
}

/// Outcome of a loader's pass over the revision sequence.
#[derive(Debug, Clone)]
pub struct LoaderReport {
    pub loader: String,

    /// Revisions that triggered a builder invocation.
    pub built: Vec<String>,

    /// Revisions folded into the previous run without a rebuild.
    pub reused: Vec<String>,

    /// Revisions skipped because the builder failed.
    pub failures: Vec<RevisionFailure>,

    /// Artifacts relocated into the output directory.
    pub artifacts: Vec<PathBuf>,
}

impl LoaderReport {
    fn new(loader: &str) -> Self {
        Self {
            loader: loader.to_string(),
            built: Vec::new(),
            reused: Vec::new(),
            failures: Vec::new(),
            artifacts: Vec::new(),
        }
    }
}

/// Outcome of the whole matrix.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub loaders: Vec<LoaderReport>,
    pub duration_ms: u64,
}

impl CompileReport {
    /// Total builder invocations across all loaders.
    pub fn total_built(&self) -> usize {
        self.loaders.iter().map(|l| l.built.len()).sum()
    }

    /// Total failed revisions across all loaders.
    pub fn total_failures(&self) -> usize {
        self.loaders.iter().map(|l| l.failures.len()).sum()
    }
}

/// Drives the matrix build for one manifest.
pub struct MatrixPlanner<'a> {
    manifest: &'a Manifest,
    builder: &'a dyn Builder,
}

impl<'a> MatrixPlanner<'a> {
    pub fn new(manifest: &'a Manifest, builder: &'a dyn Builder) -> Self {
        Self { manifest, builder }
    }

    /// Run the full matrix: every loader across every declared revision.
    pub async fn compile(&self) -> Result<CompileReport> {
        let start = Instant::now();
        std::fs::create_dir_all(&self.manifest.output_dir)?;

        let revisions = self.manifest.ordered_revisions()?;
        let common_stores = self.common_stores();
        for store in &common_stores {
            store.snapshot()?;
        }

        let result = self.run_loaders(&revisions, &common_stores).await;

        for store in &common_stores {
            if let Err(e) = store.restore() {
                warn!(path = %store.path().display(), error = %e, "failed to restore shared baseline");
            }
        }

        Ok(CompileReport {
            loaders: result?,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn run_loaders(
        &self,
        revisions: &[(McVersion, &RevisionConfig)],
        common_stores: &[ConfigStore],
    ) -> Result<Vec<LoaderReport>> {
        let mut reports = Vec::with_capacity(self.manifest.loaders.len());
        for (loader, module_dir) in &self.manifest.loaders {
            let module_store = ConfigStore::new(module_dir.join(&self.manifest.properties_file));
            module_store.snapshot()?;

            let outcome = self
                .run_loader(loader, module_dir, &module_store, revisions, common_stores)
                .await;

            if let Err(e) = module_store.restore() {
                warn!(loader, error = %e, "failed to restore loader baseline");
            }
            reports.push(outcome?);
        }
        Ok(reports)
    }

    async fn run_loader(
        &self,
        loader: &str,
        module_dir: &Path,
        module_store: &ConfigStore,
        revisions: &[(McVersion, &RevisionConfig)],
        common_stores: &[ConfigStore],
    ) -> Result<LoaderReport> {
        let mut report = LoaderReport::new(loader);
        let mut current_run: Option<RunRecord> = None;

        for (index, (revision, config)) in revisions.iter().enumerate() {
            let is_last = index + 1 == revisions.len();
            let future_compatible = is_last && self.manifest.future_compatible;
            info!(loader, revision = %revision, "--- processing revision ---");

            module_store.apply_overrides(&config.overrides)?;
            for store in common_stores {
                store.apply_overrides(&config.overrides)?;
            }

            let any_changed = self.preprocess(module_dir, revision)?;

            if current_run.is_none() || any_changed {
                info!(loader, revision = %revision, "incompatible with previous revision; building");
                match self.build_revision(loader, module_dir, revision).await {
                    Ok(artifact) => {
                        current_run =
                            Some(RunRecord::create(&artifact, revision, future_compatible)?);
                        report.built.push(revision.to_string());
                        report.artifacts.push(artifact);
                    }
                    Err(e) => {
                        warn!(loader, revision = %revision, error = %e, "build failed; skipping revision");
                        report.failures.push(RevisionFailure {
                            revision: revision.to_string(),
                            detail: e.to_string(),
                        });
                        // The next revision must not extend a run whose
                        // artifact was built from different sources.
                        current_run = None;
                    }
                }
            } else if let Some(record) = &current_run {
                info!(loader, revision = %revision, "compatible with previous revision; reusing artifact");
                record.append(revision, future_compatible)?;
                report.reused.push(revision.to_string());
            }
        }

        Ok(report)
    }

    /// Preprocess the module's own trees plus every shared tree. Returns
    /// whether any file changed.
    fn preprocess(&self, module_dir: &Path, revision: &McVersion) -> Result<bool> {
        let mut changed = false;
        for root in self.source_roots(module_dir) {
            changed |= apply_to_tree(&root, &self.manifest.source_ext, revision)?;
        }
        for common in &self.manifest.common_dirs {
            for root in self.source_roots(common) {
                changed |= apply_to_tree(&root, &self.manifest.source_ext, revision)?;
            }
        }
        Ok(changed)
    }

    /// One configuration store per shared tree.
    fn common_stores(&self) -> Vec<ConfigStore> {
        self.manifest
            .common_dirs
            .iter()
            .map(|dir| ConfigStore::new(dir.join(&self.manifest.properties_file)))
            .collect()
    }

    fn source_roots(&self, base: &Path) -> Vec<PathBuf> {
        self.manifest
            .source_roots
            .iter()
            .map(|root| base.join(root))
            .collect()
    }

    /// Invoke the builder and relocate its product into the output
    /// directory under the deterministic artifact name.
    async fn build_revision(
        &self,
        loader: &str,
        module_dir: &Path,
        revision: &McVersion,
    ) -> Result<PathBuf> {
        let output = self.builder.build(module_dir).await?;
        if !output.success {
            return Err(McMatrixError::BuildFailed {
                loader: loader.to_string(),
                revision: revision.to_string(),
                detail: output.failure_detail(),
            });
        }

        let build_dir = module_dir.join(&self.manifest.build_output_dir);
        let module_name = module_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let expected = self.manifest.build_product_name(&module_name);

        let product = find_build_product(&build_dir, &expected)?.ok_or_else(|| {
            McMatrixError::BuildFailed {
                loader: loader.to_string(),
                revision: revision.to_string(),
                detail: format!("no build product found in {}", build_dir.display()),
            }
        })?;

        let dest = self
            .manifest
            .output_dir
            .join(self.manifest.artifact_file_name(loader, revision));
        move_file(&product, &dest)?;
        info!(loader, revision = %revision, artifact = %dest.display(), "artifact relocated");
        Ok(dest)
    }
}

/// Look for the expected product name in the build directory; fall back
/// to the largest file there, which is almost always the right archive.
fn find_build_product(build_dir: &Path, expected: &str) -> Result<Option<PathBuf>> {
    let read_dir = match std::fs::read_dir(build_dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(McMatrixError::Io(e)),
    };

    let mut largest: Option<(u64, PathBuf)> = None;
    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.file_name().and_then(|n| n.to_str()) == Some(expected) {
            return Ok(Some(path));
        }
        let size = entry.metadata()?.len();
        if largest.as_ref().map_or(true, |(s, _)| size > *s) {
            largest = Some((size, path));
        }
    }
    Ok(largest.map(|(_, path)| path))
}

/// Rename, falling back to copy-and-delete across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_err() {
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)?;
    }
    Ok(())
}
