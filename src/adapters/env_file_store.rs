//! File-backed key/value store with durable, reload-on-read semantics.

use std::fs;
use std::path::PathBuf;

use crate::domain::SyncError;
use crate::ports::KeyValueStore;

/// Stores `KEY=value` lines in a single file. Every read re-parses the file
/// so a write from another process is visible immediately; every write lands
/// through a temp file and rename.
pub struct EnvFileStore {
    path: PathBuf,
}

impl EnvFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_entries(&self) -> Result<Vec<(String, String)>, SyncError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        Ok(entries)
    }

    fn write_entries(&self, entries: &[(String, String)]) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut content = String::new();
        for (key, value) in entries {
            content.push_str(key);
            content.push('=');
            content.push_str(value);
            content.push('\n');
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for EnvFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let entries = self.read_entries()?;
        Ok(entries.into_iter().rev().find(|(k, _)| k == key).map(|(_, value)| value))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SyncError> {
        let mut entries = self.read_entries()?;
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
        self.write_entries(&entries)
    }
}
