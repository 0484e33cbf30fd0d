//! Temporary `.npmrc` augmentation around lockfile generation

use crate::error::FsError;
use crate::paths;
use crate::workspace::WorkingTree;
use tracing::debug;

/// `.npmrc` state of a lockfile directory, captured before generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmrcState {
    path: String,
    original: Option<String>,
}

impl NpmrcState {
    /// Capture the directory's `.npmrc` and append the host-rule lines
    ///
    /// The file is left untouched when there are no extra lines.
    pub async fn prepare(
        tree: &dyn WorkingTree,
        lock_file_dir: &str,
        additional_lines: &[String],
    ) -> Result<Self, FsError> {
        let path = paths::join(lock_file_dir, ".npmrc");
        let original = tree.read_file(&path).await?;

        if !additional_lines.is_empty() {
            let content = merged_content(original.as_deref(), additional_lines);
            if original.as_deref() != Some(content.as_str()) {
                debug!(path, "adding host rules to .npmrc");
                tree.write_file(&path, &content).await?;
            }
        }

        Ok(Self { path, original })
    }

    /// Put the original `.npmrc` back, or remove it if there was none
    pub async fn restore(self, tree: &dyn WorkingTree) -> Result<(), FsError> {
        match self.original.as_deref() {
            Some(original) if !original.is_empty() => tree.write_file(&self.path, original).await,
            _ => tree.delete_file(&self.path).await,
        }
    }
}

fn merged_content(original: Option<&str>, additional_lines: &[String]) -> String {
    original
        .filter(|o| !o.is_empty())
        .into_iter()
        .chain(additional_lines.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::LocalWorkingTree;
    use tempfile::TempDir;

    #[test]
    fn test_merged_content() {
        let lines = vec!["//reg/:_authToken=x".to_string()];
        assert_eq!(merged_content(None, &lines), "//reg/:_authToken=x");
        assert_eq!(
            merged_content(Some("# dummy"), &lines),
            "# dummy\n//reg/:_authToken=x"
        );
    }

    #[tokio::test]
    async fn test_prepare_and_restore_existing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".npmrc"), "# dummy").unwrap();
        let tree = LocalWorkingTree::new(dir.path());
        let lines = vec!["//reg/:_authToken=x".to_string()];

        let state = NpmrcState::prepare(&tree, "", &lines).await.unwrap();
        assert_eq!(state.original.as_deref(), Some("# dummy"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".npmrc")).unwrap(),
            "# dummy\n//reg/:_authToken=x"
        );

        state.restore(&tree).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".npmrc")).unwrap(),
            "# dummy"
        );
    }

    #[tokio::test]
    async fn test_restore_deletes_when_missing() {
        let dir = TempDir::new().unwrap();
        let tree = LocalWorkingTree::new(dir.path());
        let lines = vec!["//reg/:_authToken=x".to_string()];

        let state = NpmrcState::prepare(&tree, "randomFolder", &lines)
            .await
            .unwrap();
        assert!(dir.path().join("randomFolder/.npmrc").exists());

        state.restore(&tree).await.unwrap();
        assert!(!dir.path().join("randomFolder/.npmrc").exists());
    }

    #[tokio::test]
    async fn test_prepare_without_lines_leaves_file() {
        let dir = TempDir::new().unwrap();
        let tree = LocalWorkingTree::new(dir.path());
        let state = NpmrcState::prepare(&tree, "", &[]).await.unwrap();
        assert_eq!(state.original, None);
        assert!(!dir.path().join(".npmrc").exists());
    }
}
