//! Yarn runtime binary and `.yarnrc.yml` registry handling
//!
//! This module provides:
//! - Detection of a changed `yarnPath` and the file changes that swap the
//!   committed Yarn release for the newly downloaded one
//! - Scheme-insensitive matching of registry keys in `npmRegistries`
//! - Merging host-rule registry configuration into a local `.yarnrc.yml`

use crate::domain::FileChange;
use crate::error::{ArtifactsError, FsError};
use crate::paths;
use crate::scm::Scm;
use crate::workspace::WorkingTree;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::io::ErrorKind;
use tracing::{debug, warn};

/// File name of the Yarn Berry configuration
pub const YARNRC_YML: &str = ".yarnrc.yml";

const NPM_REGISTRIES: &str = "npmRegistries";

/// Registry key with scheme, leading `//` and trailing `/` removed
///
/// `//registry.example.com`, `https://registry.example.com/` and
/// `registry.example.com` all normalize to `registry.example.com`.
pub fn normalize_registry_key(key: &str) -> &str {
    let key = key
        .strip_prefix("https:")
        .or_else(|| key.strip_prefix("http:"))
        .unwrap_or(key);
    let key = key.strip_prefix("//").unwrap_or(key);
    key.strip_suffix('/').unwrap_or(key)
}

/// Rewrite registry keys of `additional` to the spelling used in `existing`
///
/// Keys without a counterpart in `existing` are kept as given. Top-level
/// entries other than `npmRegistries` pass through unchanged.
pub fn fuzzy_match_additional_yarnrc_yml(additional: &Mapping, existing: &Mapping) -> Mapping {
    let existing_keys: HashMap<&str, &str> = existing
        .get(NPM_REGISTRIES)
        .and_then(Value::as_mapping)
        .map(|registries| {
            registries
                .keys()
                .filter_map(Value::as_str)
                .map(|k| (normalize_registry_key(k), k))
                .collect()
        })
        .unwrap_or_default();

    let mut result = additional.clone();
    if let Some(registries) = additional.get(NPM_REGISTRIES).and_then(Value::as_mapping) {
        let mut matched = Mapping::new();
        for (key, value) in registries {
            let key = match key.as_str() {
                Some(k) => {
                    let resolved = existing_keys
                        .get(normalize_registry_key(k))
                        .copied()
                        .unwrap_or(k);
                    Value::String(resolved.to_string())
                }
                None => key.clone(),
            };
            matched.insert(key, value.clone());
        }
        result.insert(Value::String(NPM_REGISTRIES.to_string()), Value::Mapping(matched));
    }
    result
}

/// Recursively merge `source` into `target`
///
/// Mappings merge key by key, sequences concatenate, anything else is
/// replaced by `source`.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Mapping(target), Value::Mapping(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Sequence(target), Value::Sequence(source)) => target.extend(source),
        (target, source) => *target = source,
    }
}

/// Merge host-rule configuration into `.yarnrc.yml` text
pub fn merge_yarnrc_yml(existing: &str, additional: &Mapping) -> Result<String, serde_yaml::Error> {
    let parsed: Value = serde_yaml::from_str(existing)?;
    let existing_map = parsed.as_mapping().cloned().unwrap_or_default();
    let matched = fuzzy_match_additional_yarnrc_yml(additional, &existing_map);

    let mut merged = Value::Mapping(existing_map);
    deep_merge(&mut merged, Value::Mapping(matched));
    serde_yaml::to_string(&merged)
}

/// `yarnPath` value of a `.yarnrc.yml`, ignoring blank values
fn yarn_path(content: &str) -> Option<String> {
    let parsed: Value = match serde_yaml::from_str(content) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(%err, "unparsable .yarnrc.yml");
            return None;
        }
    };
    parsed
        .get("yarnPath")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// Keeps the pinned Yarn release and its registry configuration in sync
pub struct RuntimeBinaryUpdater<'a> {
    tree: &'a dyn WorkingTree,
    scm: &'a dyn Scm,
}

impl<'a> RuntimeBinaryUpdater<'a> {
    pub fn new(tree: &'a dyn WorkingTree, scm: &'a dyn Scm) -> Self {
        Self { tree, scm }
    }

    /// Record the file changes for a `yarnPath` switch in `lock_file_dir`
    ///
    /// The old `.yarnrc.yml` is `existing_yarnrc_yml` when non-empty,
    /// otherwise the committed file. When both the old and the freshly
    /// generated `.yarnrc.yml` pin different releases and the new release
    /// exists on disk, three changes are appended: the old config with the
    /// new `yarnPath`, a deletion of the old release and the new release.
    ///
    /// Returns `existing_yarnrc_yml`, rewritten with the new `yarnPath` when
    /// a switch was recorded and the override was non-empty.
    pub async fn update_yarn_binary(
        &self,
        lock_file_dir: &str,
        updated_artifacts: &mut Vec<FileChange>,
        existing_yarnrc_yml: Option<&str>,
    ) -> Result<Option<String>, ArtifactsError> {
        let fallback = existing_yarnrc_yml.map(str::to_string);
        let yarnrc_path = paths::join(lock_file_dir, YARNRC_YML);

        let old_yarnrc = match existing_yarnrc_yml.filter(|c| !c.is_empty()) {
            Some(content) => Some(content.to_string()),
            None => match self.scm.get_file(&yarnrc_path, None).await {
                Ok(content) => content,
                Err(err) => {
                    warn!(%err, "error updating Yarn binary");
                    return Ok(fallback);
                }
            },
        };
        let new_yarnrc = self.tree.read_file(&yarnrc_path).await?;
        let (Some(old_yarnrc), Some(new_yarnrc)) = (old_yarnrc, new_yarnrc) else {
            return Ok(fallback);
        };

        let (Some(old_path), Some(new_path)) = (yarn_path(&old_yarnrc), yarn_path(&new_yarnrc))
        else {
            return Ok(fallback);
        };
        if old_path == new_path {
            return Ok(fallback);
        }

        let old_full_path = paths::join(lock_file_dir, &old_path);
        let new_full_path = paths::join(lock_file_dir, &new_path);
        // Releases are carried as text; anything else counts as unresolvable
        let new_binary = match self.tree.read_file(&new_full_path).await {
            Ok(Some(new_binary)) => new_binary,
            Ok(None) => {
                debug!(new_full_path, "new Yarn binary not found");
                return Ok(fallback);
            }
            Err(FsError::Read { source, .. }) if source.kind() == ErrorKind::InvalidData => {
                debug!(new_full_path, "new Yarn binary is not UTF-8 text");
                return Ok(fallback);
            }
            Err(err) => return Err(err.into()),
        };
        debug!(old_path, new_path, "found updated Yarn binary");

        let yarnrc = old_yarnrc.replacen(&old_path, &new_path, 1);
        updated_artifacts.push(FileChange::addition(&yarnrc_path, &yarnrc));
        updated_artifacts.push(FileChange::deletion(old_full_path));
        updated_artifacts.push(FileChange::executable(new_full_path, new_binary));

        Ok(match fallback {
            Some(existing) if !existing.is_empty() => Some(yarnrc),
            other => other,
        })
    }

    /// Merge host-rule registries into the local `.yarnrc.yml`
    ///
    /// Returns the content found before the merge so it can be restored
    /// after generation, `None` when there is no local `.yarnrc.yml`.
    /// Failing to write the merged file aborts the run.
    pub async fn merge_registry_config(
        &self,
        yarnrc_path: &str,
        additional: &Mapping,
    ) -> Result<Option<String>, ArtifactsError> {
        let Some(existing) = self
            .tree
            .read_file(yarnrc_path)
            .await?
            .filter(|c| !c.is_empty())
        else {
            return Ok(None);
        };

        let merged = merge_yarnrc_yml(&existing, additional).map_err(|err| {
            warn!(%err, "error appending runtime configuration content");
            ArtifactsError::runtime_config_append(yarnrc_path, err.to_string())
        })?;
        self.tree
            .write_file(yarnrc_path, &merged)
            .await
            .map_err(|err| {
                warn!(%err, "error appending runtime configuration content");
                ArtifactsError::runtime_config_append(yarnrc_path, err.to_string())
            })?;
        debug!(yarnrc_path, "added authentication to .yarnrc.yml");

        Ok(Some(existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScmError;
    use crate::workspace::LocalWorkingTree;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const LOCK_FILE_DIR: &str = "path/to/lockfile";
    const OLD_YARNRC_YML: &str = "yarnPath: .yarn/releases/yarn-3.0.1.cjs\na: b\n";
    const NEW_YARNRC_YML: &str = "yarnPath: .yarn/releases/yarn-3.0.2.cjs\nc: d\n";
    const NEW_YARN: &str = "new yarn\n";

    /// Committed state holding at most one `.yarnrc.yml`
    struct CommittedYarnrc {
        content: Option<String>,
        calls: AtomicUsize,
    }

    impl CommittedYarnrc {
        fn new(content: Option<&str>) -> Self {
            Self {
                content: content.map(str::to_string),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Scm for CommittedYarnrc {
        async fn get_file(&self, _path: &str, _branch: Option<&str>) -> Result<Option<String>, ScmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.content.clone())
        }

        async fn branch_exists(&self, _branch: &str) -> Result<bool, ScmError> {
            Ok(false)
        }
    }

    /// Working tree that refuses every write
    struct ReadOnlyTree(LocalWorkingTree);

    #[async_trait]
    impl WorkingTree for ReadOnlyTree {
        async fn read_file(&self, path: &str) -> Result<Option<String>, FsError> {
            self.0.read_file(path).await
        }

        async fn write_file(&self, path: &str, _contents: &str) -> Result<(), FsError> {
            Err(FsError::write(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ))
        }

        async fn delete_file(&self, path: &str) -> Result<(), FsError> {
            self.0.delete_file(path).await
        }
    }

    fn write(dir: &TempDir, path: &str, contents: &str) {
        let full = dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, contents).unwrap();
    }

    fn checkout_with_new_yarn() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(&dir, "path/to/lockfile/.yarnrc.yml", NEW_YARNRC_YML);
        write(&dir, "path/to/lockfile/.yarn/releases/yarn-3.0.2.cjs", NEW_YARN);
        dir
    }

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_normalize_registry_key() {
        assert_eq!(normalize_registry_key("//my-private-registry"), "my-private-registry");
        assert_eq!(
            normalize_registry_key("https://my-private-registry/"),
            "my-private-registry"
        );
        assert_eq!(normalize_registry_key("http://reg.example.com"), "reg.example.com");
        assert_eq!(normalize_registry_key("reg.example.com"), "reg.example.com");
    }

    #[test]
    fn test_fuzzy_match_keeps_existing_spelling() {
        let existing = mapping("npmRegistries:\n  https://my-private-registry:\n    npmAlwaysAuth: true\n");
        let additional = mapping(
            "npmRegistries:\n  //my-private-registry:\n    npmAuthToken: xxxxxx\n  //other:\n    npmAuthToken: y\nnpmScopes: {}\n",
        );

        let matched = fuzzy_match_additional_yarnrc_yml(&additional, &existing);
        let registries = matched.get("npmRegistries").unwrap().as_mapping().unwrap();
        assert!(registries.contains_key("https://my-private-registry"));
        assert!(registries.contains_key("//other"));
        assert!(!registries.contains_key("//my-private-registry"));
        assert!(matched.contains_key("npmScopes"));
    }

    #[test]
    fn test_fuzzy_match_without_existing_registries() {
        let additional = mapping("npmRegistries:\n  //reg:\n    npmAuthToken: x\n");
        let matched = fuzzy_match_additional_yarnrc_yml(&additional, &Mapping::new());
        assert_eq!(matched, additional);
    }

    #[test]
    fn test_merge_yarnrc_yml_appends_under_matched_entry() {
        let existing = "npmRegistries:\n  https://my-private-registry:\n    npmAlwaysAuth: true\n";
        let additional = mapping("npmRegistries:\n  //my-private-registry:\n    npmAuthToken: xxxxxx\n");

        let merged = merge_yarnrc_yml(existing, &additional).unwrap();
        let expected: Value = serde_yaml::from_str(
            "npmRegistries:\n  https://my-private-registry:\n    npmAlwaysAuth: true\n    npmAuthToken: xxxxxx\n",
        )
        .unwrap();
        assert_eq!(serde_yaml::from_str::<Value>(&merged).unwrap(), expected);
        assert!(merged.contains("npmAuthToken: xxxxxx"));
    }

    #[test]
    fn test_deep_merge() {
        let mut target: Value = serde_yaml::from_str("a: 1\nlist: [x]\nnested:\n  keep: true\n").unwrap();
        let source: Value = serde_yaml::from_str("a: 2\nlist: [y]\nnested:\n  add: 1\n").unwrap();
        deep_merge(&mut target, source);

        let expected: Value =
            serde_yaml::from_str("a: 2\nlist: [x, y]\nnested:\n  keep: true\n  add: 1\n").unwrap();
        assert_eq!(target, expected);
    }

    #[test]
    fn test_yarn_path() {
        assert_eq!(
            yarn_path(OLD_YARNRC_YML).as_deref(),
            Some(".yarn/releases/yarn-3.0.1.cjs")
        );
        assert_eq!(yarn_path(""), None);
        assert_eq!(yarn_path("yarnPath: '  '\n"), None);
        assert_eq!(yarn_path("a: [unclosed"), None);
    }

    #[tokio::test]
    async fn test_update_yarn_binary() {
        let dir = checkout_with_new_yarn();
        let tree = LocalWorkingTree::new(dir.path());
        let scm = CommittedYarnrc::new(Some(OLD_YARNRC_YML));
        let mut artifacts = Vec::new();

        let result = RuntimeBinaryUpdater::new(&tree, &scm)
            .update_yarn_binary(LOCK_FILE_DIR, &mut artifacts, None)
            .await
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(
            artifacts,
            vec![
                FileChange::addition(
                    "path/to/lockfile/.yarnrc.yml",
                    "yarnPath: .yarn/releases/yarn-3.0.2.cjs\na: b\n"
                ),
                FileChange::deletion("path/to/lockfile/.yarn/releases/yarn-3.0.1.cjs"),
                FileChange::executable("path/to/lockfile/.yarn/releases/yarn-3.0.2.cjs", NEW_YARN),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_yarn_binary_with_override() {
        let dir = checkout_with_new_yarn();
        let tree = LocalWorkingTree::new(dir.path());
        let scm = CommittedYarnrc::new(None);
        let mut artifacts = Vec::new();

        let result = RuntimeBinaryUpdater::new(&tree, &scm)
            .update_yarn_binary(LOCK_FILE_DIR, &mut artifacts, Some(OLD_YARNRC_YML))
            .await
            .unwrap();

        assert_eq!(scm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            result.as_deref(),
            Some("yarnPath: .yarn/releases/yarn-3.0.2.cjs\na: b\n")
        );
        assert_eq!(artifacts.len(), 3);
    }

    #[tokio::test]
    async fn test_update_yarn_binary_not_utf8_is_skipped() {
        let dir = checkout_with_new_yarn();
        std::fs::write(
            dir.path()
                .join(LOCK_FILE_DIR)
                .join(".yarn/releases/yarn-3.0.2.cjs"),
            [0xff, 0xfe, 0x00, 0x80],
        )
        .unwrap();
        let tree = LocalWorkingTree::new(dir.path());
        let scm = CommittedYarnrc::new(Some(OLD_YARNRC_YML));
        let mut artifacts = Vec::new();

        let result = RuntimeBinaryUpdater::new(&tree, &scm)
            .update_yarn_binary(LOCK_FILE_DIR, &mut artifacts, Some(OLD_YARNRC_YML))
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some(OLD_YARNRC_YML));
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_update_yarn_binary_without_old_yarnrc() {
        let dir = checkout_with_new_yarn();
        let tree = LocalWorkingTree::new(dir.path());
        let scm = CommittedYarnrc::new(None);
        let mut artifacts = Vec::new();

        let result = RuntimeBinaryUpdater::new(&tree, &scm)
            .update_yarn_binary(LOCK_FILE_DIR, &mut artifacts, None)
            .await
            .unwrap();
        assert_eq!(result, None);
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_update_yarn_binary_without_new_yarnrc() {
        let dir = TempDir::new().unwrap();
        let tree = LocalWorkingTree::new(dir.path());
        let scm = CommittedYarnrc::new(Some(OLD_YARNRC_YML));
        let mut artifacts = Vec::new();

        let updater = RuntimeBinaryUpdater::new(&tree, &scm);
        let result = updater
            .update_yarn_binary(LOCK_FILE_DIR, &mut artifacts, None)
            .await
            .unwrap();
        assert_eq!(result, None);

        // The override comes back untouched
        let result = updater
            .update_yarn_binary(LOCK_FILE_DIR, &mut artifacts, Some(OLD_YARNRC_YML))
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some(OLD_YARNRC_YML));
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_update_yarn_binary_unchanged_reference() {
        let dir = TempDir::new().unwrap();
        write(&dir, "path/to/lockfile/.yarnrc.yml", OLD_YARNRC_YML);
        write(&dir, "path/to/lockfile/.yarn/releases/yarn-3.0.1.cjs", "old yarn\n");
        let tree = LocalWorkingTree::new(dir.path());
        let scm = CommittedYarnrc::new(Some(OLD_YARNRC_YML));
        let mut artifacts = Vec::new();

        let result = RuntimeBinaryUpdater::new(&tree, &scm)
            .update_yarn_binary(LOCK_FILE_DIR, &mut artifacts, Some(OLD_YARNRC_YML))
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some(OLD_YARNRC_YML));
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_update_yarn_binary_missing_new_release() {
        let dir = TempDir::new().unwrap();
        write(&dir, "path/to/lockfile/.yarnrc.yml", NEW_YARNRC_YML);
        let tree = LocalWorkingTree::new(dir.path());
        let scm = CommittedYarnrc::new(Some(OLD_YARNRC_YML));
        let mut artifacts = Vec::new();

        RuntimeBinaryUpdater::new(&tree, &scm)
            .update_yarn_binary(LOCK_FILE_DIR, &mut artifacts, None)
            .await
            .unwrap();
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_update_yarn_binary_with_corepack() {
        let dir = TempDir::new().unwrap();
        write(&dir, "path/to/lockfile/.yarnrc.yml", "");
        let tree = LocalWorkingTree::new(dir.path());
        let scm = CommittedYarnrc::new(Some(""));
        let mut artifacts = Vec::new();

        let result = RuntimeBinaryUpdater::new(&tree, &scm)
            .update_yarn_binary(LOCK_FILE_DIR, &mut artifacts, Some(""))
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some(""));
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_merge_registry_config_writes_merged_file() {
        let dir = TempDir::new().unwrap();
        let existing = "npmRegistries:\n  https://my-private-registry:\n    npmAlwaysAuth: true\n";
        write(&dir, ".yarnrc.yml", existing);
        let tree = LocalWorkingTree::new(dir.path());
        let scm = CommittedYarnrc::new(None);
        let additional = mapping("npmRegistries:\n  //my-private-registry:\n    npmAuthToken: xxxxxx\n");

        let previous = RuntimeBinaryUpdater::new(&tree, &scm)
            .merge_registry_config(".yarnrc.yml", &additional)
            .await
            .unwrap();

        assert_eq!(previous.as_deref(), Some(existing));
        let on_disk = std::fs::read_to_string(dir.path().join(".yarnrc.yml")).unwrap();
        assert!(on_disk.contains("https://my-private-registry"));
        assert!(on_disk.contains("npmAuthToken: xxxxxx"));
        assert!(!on_disk.contains("//my-private-registry:\n"));
    }

    #[tokio::test]
    async fn test_merge_registry_config_without_local_file() {
        let dir = TempDir::new().unwrap();
        let tree = LocalWorkingTree::new(dir.path());
        let scm = CommittedYarnrc::new(None);
        let additional = mapping("npmRegistries: {}\n");

        let previous = RuntimeBinaryUpdater::new(&tree, &scm)
            .merge_registry_config(".yarnrc.yml", &additional)
            .await
            .unwrap();
        assert_eq!(previous, None);
        assert!(!dir.path().join(".yarnrc.yml").exists());
    }

    #[tokio::test]
    async fn test_merge_registry_config_write_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".yarnrc.yml", OLD_YARNRC_YML);
        let tree = ReadOnlyTree(LocalWorkingTree::new(dir.path()));
        let scm = CommittedYarnrc::new(None);
        let additional = mapping("npmRegistries:\n  //reg:\n    npmAuthToken: x\n");

        let err = RuntimeBinaryUpdater::new(&tree, &scm)
            .merge_registry_config(".yarnrc.yml", &additional)
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactsError::RuntimeConfigAppend { .. }));
        assert!(err
            .to_string()
            .contains("error appending runtime configuration content"));
    }
}
