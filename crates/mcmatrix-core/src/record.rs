//! Run record sidecars: the persisted revision list of a compatibility run.
//!
//! Each built artifact gets a sidecar text file next to it (same stem,
//! `.txt`) holding a single comma-terminated line of revision tokens, e.g.
//! `1.20,1.20.1,`. A trailing `*` token marks the run as compatible with
//! all future revisions. The record is created when the artifact is built,
//! appended to while the run stays contiguous, and consumed (deleted) by
//! the patcher once the final range expression is written into the
//! artifact.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::version::McVersion;

/// Wildcard sentinel: "and all future revisions".
pub const FUTURE_SENTINEL: &str = "*";

/// Sidecar path for an artifact: same name with the extension swapped to
/// `.txt`.
pub fn sidecar_path(artifact: &Path) -> PathBuf {
    artifact.with_extension("txt")
}

/// A run record sidecar file.
#[derive(Debug, Clone)]
pub struct RunRecord {
    path: PathBuf,
}

impl RunRecord {
    /// Create a fresh record containing just `revision` (replacing any
    /// stale record at the same path).
    pub fn create(artifact: &Path, revision: &McVersion, future_compatible: bool) -> Result<Self> {
        let record = Self {
            path: sidecar_path(artifact),
        };
        std::fs::write(&record.path, entry(revision, future_compatible))?;
        Ok(record)
    }

    /// Append `revision` to an existing record.
    pub fn append(&self, revision: &McVersion, future_compatible: bool) -> Result<()> {
        let mut line = std::fs::read_to_string(&self.path)?;
        line.push_str(&entry(revision, future_compatible));
        std::fs::write(&self.path, line)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn entry(revision: &McVersion, future_compatible: bool) -> String {
    if future_compatible {
        format!("{},{}", revision, FUTURE_SENTINEL)
    } else {
        format!("{},", revision)
    }
}

/// Read a record's tokens. Empty tokens (from the terminating comma) are
/// dropped; the `*` sentinel, when present, is the last token.
pub fn read_tokens(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .trim()
        .split(',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ver(s: &str) -> McVersion {
        McVersion::parse(s).expect("version")
    }

    #[test]
    fn test_sidecar_sits_next_to_artifact() {
        let artifact = Path::new("/out/craftlib-fabric-2.1.0+mc1.20.jar");
        assert_eq!(
            sidecar_path(artifact),
            PathBuf::from("/out/craftlib-fabric-2.1.0+mc1.20.txt")
        );
    }

    #[test]
    fn test_create_then_append_builds_comma_terminated_list() {
        let dir = tempdir().expect("tempdir");
        let artifact = dir.path().join("mod.jar");

        let record = RunRecord::create(&artifact, &ver("1.20"), false).expect("create");
        record.append(&ver("1.21"), false).expect("append");

        let contents = std::fs::read_to_string(record.path()).unwrap();
        assert_eq!(contents, "1.20,1.21,");
        assert_eq!(read_tokens(record.path()).unwrap(), vec!["1.20", "1.21"]);
    }

    #[test]
    fn test_future_sentinel_lands_last() {
        let dir = tempdir().expect("tempdir");
        let artifact = dir.path().join("mod.jar");

        let record = RunRecord::create(&artifact, &ver("1.21"), false).expect("create");
        record.append(&ver("1.22"), true).expect("append");

        assert_eq!(
            read_tokens(record.path()).unwrap(),
            vec!["1.21", "1.22", "*"]
        );
    }

    #[test]
    fn test_create_with_future_sentinel() {
        let dir = tempdir().expect("tempdir");
        let artifact = dir.path().join("mod.jar");

        let record = RunRecord::create(&artifact, &ver("1.22"), true).expect("create");
        assert_eq!(
            std::fs::read_to_string(record.path()).unwrap(),
            "1.22,*"
        );
    }

    #[test]
    fn test_create_replaces_stale_record() {
        let dir = tempdir().expect("tempdir");
        let artifact = dir.path().join("mod.jar");
        std::fs::write(sidecar_path(&artifact), "9.9,").unwrap();

        let record = RunRecord::create(&artifact, &ver("1.20"), false).expect("create");
        assert_eq!(std::fs::read_to_string(record.path()).unwrap(), "1.20,");
    }
}
