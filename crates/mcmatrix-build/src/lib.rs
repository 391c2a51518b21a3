//! mcmatrix build orchestration.
//!
//! Ties the core domain layer together into the matrix pipeline:
//! - [`builder`]: the external builder seam (invoke-and-get-result)
//! - [`planner`]: the compatibility run planner driving the matrix
//! - [`patcher`]: descriptor rewriting inside finished artifacts
//! - [`switch`]: single-revision retargeting without a build
//! - [`fakes`]: test doubles for the builder seam

pub mod builder;
pub mod fakes;
pub mod patcher;
pub mod planner;
pub mod switch;

pub use builder::{BuildOutput, Builder, CommandBuilder};
pub use patcher::{patch_artifacts, rewrite_archive, PatchReport};
pub use planner::{CompileReport, LoaderReport, MatrixPlanner, RevisionFailure};
pub use switch::switch_version;
