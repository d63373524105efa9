//! Local filesystem driver confined to a root directory.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proto::ToolError;
use tracing::debug;

use super::driver::{DirectoryEntry, DiskDriver, EntryKind};

/// Filesystem driver rooted at a fixed directory.
///
/// Every path is resolved against the root and rejected with
/// [`ToolError::Security`] when it would land outside it, either lexically
/// (`..`, absolute paths) or through a symlinked ancestor. The lexical check
/// runs before any filesystem call.
pub struct LocalDriver {
    root: PathBuf,
}

impl LocalDriver {
    /// Creates a driver rooted at `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ToolError> {
        let given = root.as_ref();
        let root = std::fs::canonicalize(given).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                ToolError::NotFound(format!("sandbox root '{}'", given.display()))
            }
            _ => ToolError::ExecutionFailed(format!(
                "cannot open sandbox root '{}': {e}",
                given.display()
            )),
        })?;
        if !root.is_dir() {
            return Err(ToolError::ExecutionFailed(format!(
                "sandbox root '{}' is not a directory",
                root.display()
            )));
        }
        debug!(root = %root.display(), "Local disk driver ready");
        Ok(Self { root })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `path` against the root without touching the filesystem.
    pub fn resolve_lexically(&self, path: &str) -> Result<PathBuf, ToolError> {
        let requested = Path::new(path);
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                Component::Normal(part) => normalized.push(part),
            }
        }

        if normalized.starts_with(&self.root) {
            Ok(normalized)
        } else {
            Err(escape_error(path))
        }
    }

    /// Resolves `path` and verifies that no existing ancestor symlinks out of the root.
    pub async fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let resolved = self.resolve_lexically(path)?;

        let mut cursor = resolved.as_path();
        loop {
            if tokio::fs::symlink_metadata(cursor).await.is_ok() {
                let real = tokio::fs::canonicalize(cursor)
                    .await
                    .map_err(|e| io_failure("resolve", path, e))?;
                if !real.starts_with(&self.root) {
                    return Err(escape_error(path));
                }
                break;
            }
            match cursor.parent() {
                Some(parent) => cursor = parent,
                None => break,
            }
        }

        Ok(resolved)
    }

    async fn resolve_below_root(&self, path: &str) -> Result<PathBuf, ToolError> {
        let resolved = self.resolve(path).await?;
        if resolved == self.root {
            return Err(ToolError::Security(format!(
                "'{path}' is the sandbox root and cannot be moved or deleted"
            )));
        }
        Ok(resolved)
    }
}

fn escape_error(path: &str) -> ToolError {
    ToolError::Security(format!("path '{path}' resolves outside the sandbox root"))
}

fn io_failure(op: &str, path: &str, err: std::io::Error) -> ToolError {
    match err.kind() {
        ErrorKind::NotFound => ToolError::NotFound(path.to_string()),
        _ => ToolError::ExecutionFailed(format!("{op} '{path}': {err}")),
    }
}

#[async_trait]
impl DiskDriver for LocalDriver {
    async fn file_create(&self, path: &str) -> Result<(), ToolError> {
        let target = self.resolve(path).await?;
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target)
            .await
            .map_err(|e| io_failure("create", path, e))?;
        Ok(())
    }

    async fn file_read(&self, path: &str) -> Result<String, ToolError> {
        let target = self.resolve(path).await?;
        tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| io_failure("read", path, e))
    }

    async fn file_write(&self, path: &str, text: &str) -> Result<(), ToolError> {
        let target = self.resolve(path).await?;
        tokio::fs::write(&target, text)
            .await
            .map_err(|e| io_failure("write", path, e))
    }

    async fn file_delete(&self, path: &str) -> Result<(), ToolError> {
        let target = self.resolve_below_root(path).await?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| io_failure("delete", path, e))
    }

    async fn file_move(&self, path: &str, destination: &str) -> Result<(), ToolError> {
        let source = self.resolve_below_root(path).await?;
        let target = self.resolve_below_root(destination).await?;
        tokio::fs::rename(&source, &target)
            .await
            .map_err(|e| io_failure("move", path, e))
    }

    async fn file_replace(
        &self,
        path: &str,
        old_text: &str,
        new_text: &str,
    ) -> Result<usize, ToolError> {
        let target = self.resolve(path).await?;
        let contents = tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| io_failure("read", path, e))?;
        let count = contents.matches(old_text).count();
        if count > 0 {
            tokio::fs::write(&target, contents.replace(old_text, new_text))
                .await
                .map_err(|e| io_failure("write", path, e))?;
        }
        Ok(count)
    }

    async fn directory_create(&self, path: &str) -> Result<(), ToolError> {
        let target = self.resolve(path).await?;
        tokio::fs::create_dir_all(&target)
            .await
            .map_err(|e| io_failure("create directory", path, e))
    }

    async fn directory_delete(&self, path: &str) -> Result<(), ToolError> {
        let target = self.resolve_below_root(path).await?;
        tokio::fs::remove_dir_all(&target)
            .await
            .map_err(|e| io_failure("delete directory", path, e))
    }

    async fn directory_move(&self, path: &str, destination: &str) -> Result<(), ToolError> {
        let source = self.resolve_below_root(path).await?;
        let target = self.resolve_below_root(destination).await?;
        tokio::fs::rename(&source, &target)
            .await
            .map_err(|e| io_failure("move directory", path, e))
    }

    async fn directory_list(&self, path: &str) -> Result<Vec<DirectoryEntry>, ToolError> {
        let target = self.resolve(path).await?;
        let mut reader = tokio::fs::read_dir(&target)
            .await
            .map_err(|e| io_failure("list", path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| io_failure("list", path, e))?
        {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| io_failure("stat", path, e))?;
            let kind = if metadata.is_symlink() {
                EntryKind::Symlink
            } else if metadata.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
                size: metadata.len(),
                modified: metadata
                    .modified()
                    .ok()
                    .map(|time| DateTime::<Utc>::from(time).to_rfc3339()),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
