//! mcmatrix core library.
//!
//! Domain layer for the multi-version build matrix tool: revision
//! ordering and range predicates, the directive preprocessor that toggles
//! version-guarded source regions, the `key=value` configuration store,
//! the project manifest, run record sidecars, and descriptor range
//! expressions.

pub mod directive;
pub mod error;
pub mod manifest;
pub mod props;
pub mod range;
pub mod record;
pub mod telemetry;
pub mod version;

pub use directive::{apply_to_file, apply_to_tree};
pub use error::{McMatrixError, Result};
pub use manifest::{BuilderConfig, Manifest, RevisionConfig};
pub use props::{ConfigStore, OverrideSet};
pub use range::{version_range, RangeFlavor};
pub use record::{read_tokens, sidecar_path, RunRecord, FUTURE_SENTINEL};
pub use telemetry::init_tracing;
pub use version::{McVersion, VersionReq};

/// mcmatrix version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
