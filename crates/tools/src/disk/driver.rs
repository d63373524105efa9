use async_trait::async_trait;
use proto::ToolError;
use serde::{Deserialize, Serialize};

use crate::short_type_name;

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Last modification time (RFC 3339), when the backend knows it.
    pub modified: Option<String>,
}

/// Filesystem capability set.
///
/// Paths are relative to the driver's root. Every method defaults to
/// [`ToolError::NotImplemented`].
#[async_trait]
pub trait DiskDriver: Send + Sync {
    /// Name reported in errors.
    fn driver_name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Creates an empty file, leaving an existing file untouched.
    async fn file_create(&self, _path: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "file_create"))
    }

    async fn file_read(&self, _path: &str) -> Result<String, ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "file_read"))
    }

    /// Replaces the file's contents with `text`, creating it if needed.
    async fn file_write(&self, _path: &str, _text: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "file_write"))
    }

    async fn file_delete(&self, _path: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "file_delete"))
    }

    async fn file_move(&self, _path: &str, _destination: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "file_move"))
    }

    /// Replaces every occurrence of `old_text`; returns the number replaced.
    async fn file_replace(
        &self,
        _path: &str,
        _old_text: &str,
        _new_text: &str,
    ) -> Result<usize, ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "file_replace"))
    }

    /// Creates a directory and any missing parents.
    async fn directory_create(&self, _path: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "directory_create"))
    }

    /// Deletes a directory and everything below it.
    async fn directory_delete(&self, _path: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "directory_delete"))
    }

    async fn directory_move(&self, _path: &str, _destination: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "directory_move"))
    }

    /// Lists the entries of a directory, sorted by name.
    async fn directory_list(&self, _path: &str) -> Result<Vec<DirectoryEntry>, ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "directory_list"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BareDriver;

    impl DiskDriver for BareDriver {}

    #[tokio::test]
    async fn bare_driver_reports_not_implemented_for_every_method() {
        let driver = BareDriver;
        let errors = vec![
            driver.file_create("a").await.unwrap_err(),
            driver.file_read("a").await.unwrap_err(),
            driver.file_write("a", "t").await.unwrap_err(),
            driver.file_delete("a").await.unwrap_err(),
            driver.file_move("a", "b").await.unwrap_err(),
            driver.file_replace("a", "x", "y").await.unwrap_err(),
            driver.directory_create("d").await.unwrap_err(),
            driver.directory_delete("d").await.unwrap_err(),
            driver.directory_move("d", "e").await.unwrap_err(),
            driver.directory_list("d").await.unwrap_err(),
        ];
        for err in errors {
            match err {
                ToolError::NotImplemented { driver, .. } => assert_eq!(driver, "BareDriver"),
                other => panic!("unexpected error: {other:?}"),
            }
        }
        let err = driver.file_move("a", "b").await.unwrap_err();
        assert_eq!(err.to_string(), "BareDriver does not implement 'file_move'");
    }
}
