//! In-memory disk driver for tests and dry runs.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use proto::ToolError;

use super::driver::{DirectoryEntry, DiskDriver, EntryKind};

/// Disk driver that keeps files in memory and records every call.
#[derive(Default)]
pub struct MockDriver {
    files: Mutex<BTreeMap<String, String>>,
    directories: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockDriver {
    /// Creates an empty in-memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received so far, formatted as `"method arg1 arg2"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

fn key(path: &str) -> String {
    path.trim_start_matches("./").trim_end_matches('/').to_string()
}

fn child_name<'a>(dir: &str, candidate: &'a str) -> Option<&'a str> {
    let rest = if dir.is_empty() || dir == "." {
        candidate
    } else {
        candidate.strip_prefix(dir)?.strip_prefix('/')?
    };
    (!rest.is_empty() && !rest.contains('/')).then_some(rest)
}

#[async_trait]
impl DiskDriver for MockDriver {
    async fn file_create(&self, path: &str) -> Result<(), ToolError> {
        self.record(format!("file_create {path}"));
        self.files.lock().entry(key(path)).or_default();
        Ok(())
    }

    async fn file_read(&self, path: &str) -> Result<String, ToolError> {
        self.record(format!("file_read {path}"));
        self.files
            .lock()
            .get(&key(path))
            .cloned()
            .ok_or_else(|| ToolError::NotFound(path.to_string()))
    }

    async fn file_write(&self, path: &str, text: &str) -> Result<(), ToolError> {
        self.record(format!("file_write {path}"));
        self.files.lock().insert(key(path), text.to_string());
        Ok(())
    }

    async fn file_delete(&self, path: &str) -> Result<(), ToolError> {
        self.record(format!("file_delete {path}"));
        self.files
            .lock()
            .remove(&key(path))
            .map(|_| ())
            .ok_or_else(|| ToolError::NotFound(path.to_string()))
    }

    async fn file_move(&self, path: &str, destination: &str) -> Result<(), ToolError> {
        self.record(format!("file_move {path} {destination}"));
        let mut files = self.files.lock();
        let text = files
            .remove(&key(path))
            .ok_or_else(|| ToolError::NotFound(path.to_string()))?;
        files.insert(key(destination), text);
        Ok(())
    }

    async fn file_replace(
        &self,
        path: &str,
        old_text: &str,
        new_text: &str,
    ) -> Result<usize, ToolError> {
        self.record(format!("file_replace {path}"));
        let mut files = self.files.lock();
        let text = files
            .get_mut(&key(path))
            .ok_or_else(|| ToolError::NotFound(path.to_string()))?;
        let count = text.matches(old_text).count();
        *text = text.replace(old_text, new_text);
        Ok(count)
    }

    async fn directory_create(&self, path: &str) -> Result<(), ToolError> {
        self.record(format!("directory_create {path}"));
        self.directories.lock().insert(key(path));
        Ok(())
    }

    async fn directory_delete(&self, path: &str) -> Result<(), ToolError> {
        self.record(format!("directory_delete {path}"));
        let dir = key(path);
        if !self.directories.lock().remove(&dir) {
            return Err(ToolError::NotFound(path.to_string()));
        }
        let prefix = format!("{dir}/");
        self.files.lock().retain(|name, _| !name.starts_with(&prefix));
        self.directories
            .lock()
            .retain(|name| !name.starts_with(&prefix));
        Ok(())
    }

    async fn directory_move(&self, path: &str, destination: &str) -> Result<(), ToolError> {
        self.record(format!("directory_move {path} {destination}"));
        let (from, to) = (key(path), key(destination));
        let mut directories = self.directories.lock();
        if !directories.remove(&from) {
            return Err(ToolError::NotFound(path.to_string()));
        }
        directories.insert(to.clone());

        let prefix = format!("{from}/");
        let mut files = self.files.lock();
        let moved: Vec<String> = files
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect();
        for name in moved {
            if let Some(text) = files.remove(&name) {
                files.insert(format!("{to}/{}", &name[prefix.len()..]), text);
            }
        }
        Ok(())
    }

    async fn directory_list(&self, path: &str) -> Result<Vec<DirectoryEntry>, ToolError> {
        self.record(format!("directory_list {path}"));
        let dir = key(path);
        let directories = self.directories.lock();
        if !(dir.is_empty() || dir == "." || directories.contains(&dir)) {
            return Err(ToolError::NotFound(path.to_string()));
        }

        let mut entries: Vec<DirectoryEntry> = self
            .files
            .lock()
            .iter()
            .filter_map(|(name, text)| {
                child_name(&dir, name).map(|child| DirectoryEntry {
                    name: child.to_string(),
                    kind: EntryKind::File,
                    size: text.len() as u64,
                    modified: None,
                })
            })
            .collect();
        entries.extend(directories.iter().filter_map(|name| {
            child_name(&dir, name).map(|child| DirectoryEntry {
                name: child.to_string(),
                kind: EntryKind::Directory,
                size: 0,
                modified: None,
            })
        }));
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
