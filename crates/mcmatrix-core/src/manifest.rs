//! Project manifest: the declaration of loaders, revisions, and overrides.
//!
//! Loaded from `mcmatrix.json` next to the project. The manifest is plain
//! data — the revision map is iterated in semantic-version order no matter
//! how the JSON happens to be ordered.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{McMatrixError, Result};
use crate::props::OverrideSet;
use crate::version::McVersion;

/// External builder invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Command and arguments, executed inside the loader module directory.
    pub command: Vec<String>,

    /// Kill the build after this many seconds. `0` disables the timeout.
    #[serde(default)]
    pub timeout_secs: u64,
}

/// Per-revision settings: configuration overrides applied before the
/// preprocessor pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevisionConfig {
    /// `key=value` replacements, applied only to keys already present.
    #[serde(default)]
    pub overrides: OverrideSet,
}

/// The project manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Project name, used in artifact file names.
    pub project: String,

    /// Project version, used in artifact file names.
    pub version: String,

    /// Directory receiving the final artifacts.
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Properties key (in each loader's store) whose value is the
    /// descriptor entry path inside the built archive.
    pub descriptor_key: String,

    /// Placeholder token in the descriptor, replaced with the computed
    /// version range.
    #[serde(default = "defaults::placeholder")]
    pub placeholder: String,

    /// Mark the newest revision's artifact as compatible with all future
    /// revisions.
    #[serde(default)]
    pub future_compatible: bool,

    /// The revision being actively developed against; used by the switch
    /// command when no revision is given on the command line.
    #[serde(default)]
    pub current_version: Option<String>,

    /// Shared source trees referenced by every loader.
    #[serde(default)]
    pub common_dirs: Vec<PathBuf>,

    /// Loader identifier → module directory.
    pub loaders: BTreeMap<String, PathBuf>,

    /// Source roots scanned by the preprocessor, relative to each module
    /// or common directory.
    #[serde(default = "defaults::source_roots")]
    pub source_roots: Vec<PathBuf>,

    /// Source file extension the preprocessor looks for.
    #[serde(default = "defaults::source_ext")]
    pub source_ext: String,

    /// Artifact archive extension.
    #[serde(default = "defaults::artifact_ext")]
    pub artifact_ext: String,

    /// Name of the properties file inside each module/common directory.
    #[serde(default = "defaults::properties_file")]
    pub properties_file: String,

    /// External builder settings.
    pub builder: BuilderConfig,

    /// Template for the builder's product file name. `{name}` and
    /// `{version}` expand to the module name and project version. When
    /// unset, `{name}-{version}.{ext}` is assumed.
    #[serde(default)]
    pub output_file: Option<String>,

    /// Where the builder leaves its product, relative to the module.
    #[serde(default = "defaults::build_output_dir")]
    pub build_output_dir: PathBuf,

    /// Revision identifier → per-revision configuration.
    pub revisions: BTreeMap<String, RevisionConfig>,
}

mod defaults {
    use std::path::PathBuf;

    pub fn output_dir() -> PathBuf {
        PathBuf::from("builds")
    }

    pub fn placeholder() -> String {
        "%mcVer%".to_string()
    }

    pub fn source_roots() -> Vec<PathBuf> {
        vec![PathBuf::from("src/main/java")]
    }

    pub fn source_ext() -> String {
        "java".to_string()
    }

    pub fn artifact_ext() -> String {
        "jar".to_string()
    }

    pub fn properties_file() -> String {
        "gradle.properties".to_string()
    }

    pub fn build_output_dir() -> PathBuf {
        PathBuf::from("build/libs")
    }
}

impl Manifest {
    /// Load and validate a manifest.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            McMatrixError::Manifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        let manifest: Manifest = serde_json::from_str(&contents).map_err(|e| {
            McMatrixError::Manifest(format!("cannot parse {}: {}", path.display(), e))
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.loaders.is_empty() {
            return Err(McMatrixError::Manifest("no loaders declared".to_string()));
        }
        if self.revisions.is_empty() {
            return Err(McMatrixError::Manifest("no revisions declared".to_string()));
        }
        if self.builder.command.is_empty() {
            return Err(McMatrixError::Manifest(
                "builder command is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Make every relative path absolute against `root` (the directory
    /// the manifest was loaded from).
    pub fn resolve_paths(&mut self, root: &Path) {
        resolve(&mut self.output_dir, root);
        for dir in &mut self.common_dirs {
            resolve(dir, root);
        }
        for dir in self.loaders.values_mut() {
            resolve(dir, root);
        }
    }

    /// Revisions in ascending semantic-version order, paired with their
    /// configuration.
    pub fn ordered_revisions(&self) -> Result<Vec<(McVersion, &RevisionConfig)>> {
        let mut revisions = Vec::with_capacity(self.revisions.len());
        for (token, config) in &self.revisions {
            revisions.push((McVersion::parse(token)?, config));
        }
        revisions.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(revisions)
    }

    /// Final artifact name: `{project}-{loader}-{version}+mc{revision}.{ext}`.
    pub fn artifact_file_name(&self, loader: &str, revision: &McVersion) -> String {
        format!(
            "{}-{}-{}+mc{}.{}",
            self.project, loader, self.version, revision, self.artifact_ext
        )
    }

    /// The file name the builder is expected to produce for `module_name`.
    pub fn build_product_name(&self, module_name: &str) -> String {
        match &self.output_file {
            Some(template) => template
                .replace("{name}", module_name)
                .replace("{version}", &self.version),
            None => format!("{}-{}.{}", module_name, self.version, self.artifact_ext),
        }
    }
}

fn resolve(path: &mut PathBuf, root: &Path) {
    if path.is_relative() {
        *path = root.join(&*path);
    }
}
