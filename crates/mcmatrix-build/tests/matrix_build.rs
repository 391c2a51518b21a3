//! End-to-end planner behavior over a real (temporary) project tree,
//! with the builder replaced by a scripted fake.

use std::path::{Path, PathBuf};

use mcmatrix_core::{read_tokens, Manifest, McVersion};
use mcmatrix_build::fakes::ScriptedBuilder;
use mcmatrix_build::{switch_version, MatrixPlanner};
use tempfile::tempdir;

const MODULE_PROPS: &str = "\
minecraft_version=1.20
mod_descriptor_path=fabric.mod.json
";

fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

/// A manifest for one fabric loader with the given extra JSON fields.
fn write_manifest(root: &Path, revisions: &str, extra: &str) -> Manifest {
    let json = format!(
        r#"{{
            "project": "craftlib",
            "version": "2.1.0",
            "descriptor_key": "mod_descriptor_path",
            "loaders": {{ "fabric": "fabric" }},
            "builder": {{ "command": ["true"] }},
            "source_roots": ["src/main/java"],
            "revisions": {revisions}
            {extra}
        }}"#
    );
    let path = root.join("mcmatrix.json");
    std::fs::write(&path, json).unwrap();
    let mut manifest = Manifest::load(&path).expect("manifest");
    manifest.resolve_paths(root);
    manifest
}

fn three_revisions() -> &'static str {
    r#"{
        "1.20": { "overrides": { "minecraft_version": "1.20" } },
        "1.21": { "overrides": { "minecraft_version": "1.21" } },
        "1.22": { "overrides": { "minecraft_version": "1.22" } }
    }"#
}

#[tokio::test]
async fn contiguous_compatible_revisions_share_one_build() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    write(root, "fabric/gradle.properties", MODULE_PROPS);
    // The guarded region only flips at 1.22, so 1.21 reuses the 1.20 build.
    write(
        root,
        "fabric/src/main/java/Feature.java",
        "//: >=1.22\nvoid modern() {}\n//: END\n",
    );

    let manifest = write_manifest(root, three_revisions(), "");
    let builder = ScriptedBuilder::succeeding("fabric-2.1.0.jar", "build/libs");
    let report = MatrixPlanner::new(&manifest, &builder)
        .compile()
        .await
        .expect("compile");

    assert_eq!(builder.invocations().len(), 2);
    assert_eq!(report.total_built(), 2);
    assert_eq!(report.loaders[0].reused, vec!["1.21"]);
    assert_eq!(report.total_failures(), 0);

    let first = root.join("builds/craftlib-fabric-2.1.0+mc1.20.jar");
    let second = root.join("builds/craftlib-fabric-2.1.0+mc1.22.jar");
    assert!(first.exists());
    assert!(second.exists());

    // The coalesced run's record covers both compatible revisions.
    let record = std::fs::read_to_string(first.with_extension("txt")).unwrap();
    assert_eq!(record, "1.20,1.21,");
    let record = std::fs::read_to_string(second.with_extension("txt")).unwrap();
    assert_eq!(record, "1.22,");
}

#[tokio::test]
async fn loader_store_is_restored_after_the_matrix() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    write(root, "fabric/gradle.properties", MODULE_PROPS);
    write(root, "fabric/src/main/java/Plain.java", "class Plain {}\n");

    let manifest = write_manifest(root, three_revisions(), "");
    let builder = ScriptedBuilder::succeeding("fabric-2.1.0.jar", "build/libs");
    MatrixPlanner::new(&manifest, &builder)
        .compile()
        .await
        .expect("compile");

    // The last revision's override (1.22) was applied and then rolled back.
    assert_eq!(
        std::fs::read_to_string(root.join("fabric/gradle.properties")).unwrap(),
        MODULE_PROPS
    );
    assert!(!root.join("fabric/gradle.properties.orig").exists());
}

#[tokio::test]
async fn failed_build_is_skipped_and_forces_a_rebuild() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    write(root, "fabric/gradle.properties", MODULE_PROPS);
    write(root, "fabric/src/main/java/Plain.java", "class Plain {}\n");

    let manifest = write_manifest(
        root,
        r#"{ "1.20": {}, "1.21": {} }"#,
        "",
    );
    let builder = ScriptedBuilder::scripted("fabric-2.1.0.jar", "build/libs", &[false, true]);
    let report = MatrixPlanner::new(&manifest, &builder)
        .compile()
        .await
        .expect("compile");

    // 1.20 fails; 1.21 is unchanged source-wise but must rebuild because
    // no run is open.
    assert_eq!(builder.invocations().len(), 2);
    assert_eq!(report.total_failures(), 1);
    assert_eq!(report.loaders[0].failures[0].revision, "1.20");
    assert!(report.loaders[0].reused.is_empty());

    assert!(!root.join("builds/craftlib-fabric-2.1.0+mc1.20.jar").exists());
    let artifact = root.join("builds/craftlib-fabric-2.1.0+mc1.21.jar");
    assert!(artifact.exists());
    assert_eq!(read_tokens(&artifact.with_extension("txt")).unwrap(), vec!["1.21"]);
}

#[tokio::test]
async fn future_compatible_marks_the_final_revision() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    write(root, "fabric/gradle.properties", MODULE_PROPS);
    write(root, "fabric/src/main/java/Plain.java", "class Plain {}\n");

    let manifest = write_manifest(
        root,
        r#"{ "1.20": {}, "1.21": {} }"#,
        r#", "future_compatible": true"#,
    );
    let builder = ScriptedBuilder::succeeding("fabric-2.1.0.jar", "build/libs");
    MatrixPlanner::new(&manifest, &builder)
        .compile()
        .await
        .expect("compile");

    let record = root.join("builds/craftlib-fabric-2.1.0+mc1.20.txt");
    assert_eq!(std::fs::read_to_string(record).unwrap(), "1.20,1.21,*");
}

#[tokio::test]
async fn shared_tree_changes_trigger_rebuilds_too() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    write(root, "fabric/gradle.properties", MODULE_PROPS);
    write(root, "fabric/src/main/java/Plain.java", "class Plain {}\n");
    write(root, "common/gradle.properties", "minecraft_version=1.20\n");
    write(
        root,
        "common/src/main/java/Shared.java",
        "//: >=1.21\nvoid shared() {}\n//: END\n",
    );

    let manifest = write_manifest(
        root,
        r#"{ "1.20": {}, "1.21": {} }"#,
        r#", "common_dirs": ["common"]"#,
    );
    let builder = ScriptedBuilder::succeeding("fabric-2.1.0.jar", "build/libs");
    let report = MatrixPlanner::new(&manifest, &builder)
        .compile()
        .await
        .expect("compile");

    // The shared region flips at both 1.20 (close) and 1.21 (reopen).
    assert_eq!(builder.invocations().len(), 2);
    assert!(report.loaders[0].reused.is_empty());
}

#[test]
fn switch_retargets_without_building() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    write(root, "fabric/gradle.properties", MODULE_PROPS);
    let source = write(
        root,
        "fabric/src/main/java/Feature.java",
        "//: >=1.22\nvoid modern() {}\n//: END\n",
    );

    let manifest = write_manifest(root, three_revisions(), "");
    let revision = McVersion::parse("1.21").unwrap();
    switch_version(&manifest, &revision).expect("switch");

    let props = std::fs::read_to_string(root.join("fabric/gradle.properties")).unwrap();
    assert!(props.contains("minecraft_version=1.21"));

    let toggled = std::fs::read_to_string(&source).unwrap();
    assert!(toggled.starts_with("/*\\ >=1.22"));
    // No builder ran, no artifacts appeared.
    assert!(!root.join("builds").exists());
}

#[test]
fn switch_rejects_undeclared_revisions() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    write(root, "fabric/gradle.properties", MODULE_PROPS);

    let manifest = write_manifest(root, three_revisions(), "");
    let revision = McVersion::parse("1.99").unwrap();
    assert!(switch_version(&manifest, &revision).is_err());
}
