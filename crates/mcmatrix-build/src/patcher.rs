//! Artifact metadata patcher.
//!
//! After the matrix completes, every artifact in the output directory
//! with a run record sidecar gets its packaged descriptor rewritten: the
//! record's revision list is folded into a single range expression and
//! substituted for the placeholder token inside the archive's descriptor
//! entry. All other entries are streamed through byte-for-byte, the
//! rewritten archive atomically replaces the original, and the record is
//! deleted.
//!
//! Failures are isolated per artifact: one unreadable archive does not
//! stop the others from being patched.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use mcmatrix_core::{
    read_tokens, sidecar_path, version_range, ConfigStore, Manifest, McMatrixError, RangeFlavor,
    Result,
};

/// Outcome of the patch pass over the output directory.
#[derive(Debug, Clone, Default)]
pub struct PatchReport {
    /// Artifacts whose descriptor was rewritten (records deleted).
    pub patched: Vec<PathBuf>,

    /// Artifacts skipped: no loader match or unknown descriptor flavor
    /// (records kept for inspection).
    pub skipped: Vec<PathBuf>,

    /// Artifacts whose rewrite failed (records kept).
    pub failures: Vec<(PathBuf, String)>,
}

/// Patch every artifact in the output directory that has a run record.
pub fn patch_artifacts(manifest: &Manifest) -> Result<PatchReport> {
    let mut report = PatchReport::default();

    let read_dir = match std::fs::read_dir(&manifest.output_dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(McMatrixError::Io(e)),
    };

    let mut artifacts: Vec<PathBuf> = Vec::new();
    for entry in read_dir {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(manifest.artifact_ext.as_str()) {
            artifacts.push(path);
        }
    }
    artifacts.sort();

    for artifact in artifacts {
        let record = sidecar_path(&artifact);
        if !record.exists() {
            continue;
        }
        match patch_one(manifest, &artifact, &record) {
            Ok(true) => {
                std::fs::remove_file(&record)?;
                info!(artifact = %artifact.display(), "descriptor patched");
                report.patched.push(artifact);
            }
            Ok(false) => {
                report.skipped.push(artifact);
            }
            Err(e) => {
                warn!(artifact = %artifact.display(), error = %e, "patch failed; leaving record in place");
                report.failures.push((artifact, e.to_string()));
            }
        }
    }

    Ok(report)
}

/// Patch a single artifact. `Ok(false)` means the artifact was skipped
/// (no loader match, unknown flavor); the record is left in place.
fn patch_one(manifest: &Manifest, artifact: &Path, record: &Path) -> Result<bool> {
    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Artifact names embed the loader as `{project}-{loader}-...`.
    let Some((loader, module_dir)) = manifest
        .loaders
        .iter()
        .find(|(loader, _)| file_name.contains(&format!("-{}-", loader)))
    else {
        warn!(artifact = %artifact.display(), "no declared loader matches this artifact");
        return Ok(false);
    };

    let store = ConfigStore::new(module_dir.join(&manifest.properties_file));
    let descriptor = store.get(&manifest.descriptor_key)?.ok_or_else(|| {
        McMatrixError::ArchiveRewrite {
            artifact: artifact.to_path_buf(),
            detail: format!(
                "property '{}' is not set for loader '{}'",
                manifest.descriptor_key, loader
            ),
        }
    })?;

    let Some(flavor) = RangeFlavor::from_descriptor_path(&descriptor) else {
        warn!(
            artifact = %artifact.display(),
            descriptor = %descriptor,
            "descriptor has no known range flavor; skipping"
        );
        return Ok(false);
    };

    let tokens = read_tokens(record)?;
    let range = version_range(flavor, &tokens);
    info!(
        artifact = %artifact.display(),
        descriptor = %descriptor,
        range = %range,
        "rewriting descriptor"
    );

    rewrite_archive(artifact, &descriptor, &manifest.placeholder, &range)?;
    Ok(true)
}

fn archive_err(artifact: &Path, detail: impl std::fmt::Display) -> McMatrixError {
    McMatrixError::ArchiveRewrite {
        artifact: artifact.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Stream `artifact` into a sibling temp file, substituting the
/// placeholder inside the one entry at `entry_path`, then atomically
/// replace the original. Every other entry is raw-copied, preserving
/// order, compression, and bytes.
pub fn rewrite_archive(
    artifact: &Path,
    entry_path: &str,
    placeholder: &str,
    replacement: &str,
) -> Result<()> {
    let source = std::fs::File::open(artifact).map_err(|e| archive_err(artifact, e))?;
    let mut archive = ZipArchive::new(source).map_err(|e| archive_err(artifact, e))?;

    let parent = artifact.parent().unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(parent).map_err(|e| archive_err(artifact, e))?;
    let mut writer = ZipWriter::new(temp);

    for index in 0..archive.len() {
        let is_target = {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| archive_err(artifact, e))?;
            entry.name() == entry_path
        };

        if is_target {
            let mut text = String::new();
            archive
                .by_index(index)
                .map_err(|e| archive_err(artifact, e))?
                .read_to_string(&mut text)
                .map_err(|e| archive_err(artifact, e))?;
            let rewritten = text.replace(placeholder, replacement);

            writer
                .start_file(entry_path, SimpleFileOptions::default())
                .map_err(|e| archive_err(artifact, e))?;
            writer
                .write_all(rewritten.as_bytes())
                .map_err(|e| archive_err(artifact, e))?;
        } else {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| archive_err(artifact, e))?;
            writer
                .raw_copy_file(entry)
                .map_err(|e| archive_err(artifact, e))?;
        }
    }

    let temp = writer.finish().map_err(|e| archive_err(artifact, e))?;
    temp.persist(artifact).map_err(|e| archive_err(artifact, e))?;
    Ok(())
}
