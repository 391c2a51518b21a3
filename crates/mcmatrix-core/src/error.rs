//! Error taxonomy for mcmatrix.

use std::path::PathBuf;

/// mcmatrix domain errors.
///
/// Directive and configuration errors are fatal for the loader being
/// processed; build and archive errors are isolated to the revision or
/// artifact they occurred on.
#[derive(Debug, thiserror::Error)]
pub enum McMatrixError {
    /// Marker nesting violated. The file's state is ambiguous, so the
    /// whole pass aborts.
    #[error("{file}:{line}: expected {expected}, found: {found}")]
    MalformedDirective {
        file: PathBuf,
        /// 1-based line number of the offending marker.
        line: usize,
        /// The marker line as it appears in the file (trimmed).
        found: String,
        /// What the scanner was expecting at this point.
        expected: &'static str,
    },

    /// Properties store missing or unreadable.
    #[error("failed to load properties at {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Project manifest missing, unreadable, or inconsistent.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// A revision identifier did not parse.
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    /// A directive predicate did not parse.
    #[error("invalid version requirement '{input}': {reason}")]
    InvalidRequirement { input: String, reason: String },

    /// External builder invocation failed. Recoverable: the planner logs
    /// the failure and moves on to the next revision.
    #[error("build failed for loader {loader}, revision {revision}: {detail}")]
    BuildFailed {
        loader: String,
        revision: String,
        detail: String,
    },

    /// I/O failure while streaming or replacing an artifact archive.
    #[error("archive rewrite failed for {artifact}: {detail}")]
    ArchiveRewrite { artifact: PathBuf, detail: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for mcmatrix operations.
pub type Result<T> = std::result::Result<T, McMatrixError>;
