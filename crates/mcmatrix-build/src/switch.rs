//! Switch-version mode: retarget the working tree at one revision.
//!
//! Applies the chosen revision's configuration overrides and the
//! directive preprocessor across the shared trees and every loader
//! module, without invoking the builder or the patcher. Supports local
//! iteration against a single target revision.

use tracing::info;

use mcmatrix_core::{apply_to_tree, ConfigStore, Manifest, McMatrixError, McVersion, Result};

/// Switch every loader's working tree (and the shared trees) to
/// `revision`. The revision must be declared in the manifest so its
/// override set is known.
pub fn switch_version(manifest: &Manifest, revision: &McVersion) -> Result<()> {
    let revisions = manifest.ordered_revisions()?;
    let config = revisions
        .iter()
        .find(|(v, _)| v == revision)
        .map(|(_, c)| *c)
        .ok_or_else(|| {
            McMatrixError::Manifest(format!("revision {} is not declared", revision))
        })?;

    info!(revision = %revision, "--- switching to {} ---", revision);

    // Shared trees first: they are a cross-loader resource and get
    // exactly one pass.
    for common in &manifest.common_dirs {
        let store = ConfigStore::new(common.join(&manifest.properties_file));
        store.apply_overrides(&config.overrides)?;
        for root in &manifest.source_roots {
            apply_to_tree(&common.join(root), &manifest.source_ext, revision)?;
        }
    }

    for (loader, module_dir) in &manifest.loaders {
        info!(loader, revision = %revision, "switching loader tree");
        let store = ConfigStore::new(module_dir.join(&manifest.properties_file));
        store.apply_overrides(&config.overrides)?;
        for root in &manifest.source_roots {
            apply_to_tree(&module_dir.join(root), &manifest.source_ext, revision)?;
        }
    }

    info!(revision = %revision, "--- switched to {} ---", revision);
    Ok(())
}
