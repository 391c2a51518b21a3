//! Line-oriented `key=value` configuration store.
//!
//! Override application rewrites only the value of lines whose key is
//! already present — it never inserts keys, and comments (`#`/`!`) and
//! blank lines survive verbatim. A baseline snapshot/restore pair lets
//! the planner put a store back the way it found it after a matrix run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{McMatrixError, Result};

/// Configuration-key → replacement value, scoped to one revision.
pub type OverrideSet = BTreeMap<String, String>;

/// A `key=value` properties file on disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|source| McMatrixError::ConfigLoad {
            path: self.path.clone(),
            source,
        })
    }

    /// Look up the value of `key`, if present.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let contents = self.read()?;
        for line in contents.lines() {
            if let Some((k, v)) = parse_pair(line) {
                if k == key {
                    return Ok(Some(v.trim().to_string()));
                }
            }
        }
        Ok(None)
    }

    /// Replace the values of keys already present in the store. Keys in
    /// `overrides` with no existing line are ignored. Returns how many
    /// lines changed; the file is rewritten only when that is non-zero.
    pub fn apply_overrides(&self, overrides: &BTreeMap<String, String>) -> Result<usize> {
        if overrides.is_empty() {
            return Ok(0);
        }

        let contents = self.read()?;
        let mut changed = 0usize;
        let mut out = String::with_capacity(contents.len());

        for line in contents.split_inclusive('\n') {
            let (body, ending) = split_ending(line);
            match parse_pair(body) {
                Some((key, value)) => match overrides.get(key) {
                    Some(new_value) if value.trim() != new_value => {
                        debug!(path = %self.path.display(), key, value = %new_value, "override");
                        let key_part = body.split_once('=').map(|(k, _)| k).unwrap_or(key);
                        out.push_str(key_part);
                        out.push('=');
                        out.push_str(new_value);
                        out.push_str(ending);
                        changed += 1;
                    }
                    _ => out.push_str(line),
                },
                None => out.push_str(line),
            }
        }

        if changed > 0 {
            std::fs::write(&self.path, out)?;
        }
        Ok(changed)
    }

    fn baseline_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str(".orig");
        self.path.with_file_name(name)
    }

    /// Snapshot the store so [`ConfigStore::restore`] can put it back.
    pub fn snapshot(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(McMatrixError::ConfigLoad {
                path: self.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        std::fs::copy(&self.path, self.baseline_path())?;
        Ok(())
    }

    /// Restore the snapshot taken by [`ConfigStore::snapshot`]. A missing
    /// snapshot is a no-op.
    pub fn restore(&self) -> Result<()> {
        let baseline = self.baseline_path();
        if baseline.exists() {
            std::fs::rename(&baseline, &self.path)?;
        }
        Ok(())
    }
}

/// Parse a `key=value` line. Comments and lines without `=` yield `None`.
fn parse_pair(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with('!') {
        return None;
    }
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

fn split_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PROPS: &str = "\
# mod dependencies
minecraft_version=1.20.1
fabric_api=0.92.0

! loader settings
loader_version=0.15.3
mod_descriptor_path=fabric.mod.json
";

    fn store_with(dir: &Path, contents: &str) -> ConfigStore {
        let path = dir.join("gradle.properties");
        std::fs::write(&path, contents).expect("write fixture");
        ConfigStore::new(path)
    }

    fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_get_returns_existing_value() {
        let dir = tempdir().expect("tempdir");
        let store = store_with(dir.path(), PROPS);
        assert_eq!(
            store.get("minecraft_version").unwrap(),
            Some("1.20.1".to_string())
        );
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn test_overrides_mutate_only_existing_keys() {
        let dir = tempdir().expect("tempdir");
        let store = store_with(dir.path(), PROPS);

        let changed = store
            .apply_overrides(&overrides(&[
                ("minecraft_version", "1.21.4"),
                ("brand_new_key", "ignored"),
            ]))
            .expect("apply");
        assert_eq!(changed, 1);

        let after = std::fs::read_to_string(store.path()).unwrap();
        assert!(after.contains("minecraft_version=1.21.4"));
        assert!(!after.contains("brand_new_key"));
    }

    #[test]
    fn test_comments_and_blanks_survive() {
        let dir = tempdir().expect("tempdir");
        let store = store_with(dir.path(), PROPS);

        store
            .apply_overrides(&overrides(&[("fabric_api", "0.100.0")]))
            .expect("apply");

        let after = std::fs::read_to_string(store.path()).unwrap();
        assert!(after.contains("# mod dependencies\n"));
        assert!(after.contains("! loader settings\n"));
        assert!(after.contains("\n\n"));
    }

    #[test]
    fn test_no_change_means_no_write() {
        let dir = tempdir().expect("tempdir");
        let store = store_with(dir.path(), PROPS);

        let changed = store
            .apply_overrides(&overrides(&[("minecraft_version", "1.20.1")]))
            .expect("apply");
        assert_eq!(changed, 0);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), PROPS);
    }

    #[test]
    fn test_snapshot_and_restore_round_trip() {
        let dir = tempdir().expect("tempdir");
        let store = store_with(dir.path(), PROPS);

        store.snapshot().expect("snapshot");
        store
            .apply_overrides(&overrides(&[("minecraft_version", "1.21.4")]))
            .expect("apply");
        assert_ne!(std::fs::read_to_string(store.path()).unwrap(), PROPS);

        store.restore().expect("restore");
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), PROPS);
        assert!(!store.path().with_file_name("gradle.properties.orig").exists());
    }

    #[test]
    fn test_missing_store_is_config_load_error() {
        let dir = tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("absent.properties"));
        match store.get("key") {
            Err(McMatrixError::ConfigLoad { path, .. }) => {
                assert!(path.ends_with("absent.properties"));
            }
            other => panic!("expected ConfigLoad, got {:?}", other),
        }
    }
}
