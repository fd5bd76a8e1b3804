use std::{collections::{BTreeMap, HashMap}, fs, io::{self, Write}, path::{Path, PathBuf}};

use dashmap::DashMap;
use log::{debug, warn};
use snafu::{ResultExt, Snafu};
use tempfile::NamedTempFile;

/// Durable string key/value store that survives restarts of the service.
///
/// Values are cached in memory and the whole map is written back to a JSON
/// file on every change.
#[derive(Debug)]
pub struct StateStore {
    path: Option<PathBuf>,
    entries: DashMap<String, String>,
}

impl StateStore {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self { path: None, entries: DashMap::new() }
    }

    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => DashMap::new(),
            Ok(contents) => {
                let values: HashMap<String, String> = serde_json::from_str(&contents).context(DecodeSnafu { path: path.clone() })?;
                values.into_iter().collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No state file at {}, starting empty.", path.display());
                DashMap::new()
            }
            Err(e) => return Err(e).context(ReadSnafu { path: path.clone() }),
        };

        Ok(Self { path: Some(path), entries })
    }

    /// Like [`StateStore::open`], but an unreadable or corrupt file is replaced by an empty store.
    pub fn open_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(store) => store,
            Err(e) => {
                warn!("Discarding unusable state file: {}", e);
                Self { path: Some(path.to_path_buf()), entries: DashMap::new() }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    /// Stores `value` under `key`. The in-memory value is kept even if writing the file fails.
    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<(), StoreError> {
        let value = value.into();
        if self.entries.get(key).is_some_and(|v| *v.value() == value) {
            return Ok(());
        }
        self.entries.insert(key.to_owned(), value);
        self.persist()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        // Sorted so the file diffs cleanly between runs.
        let sorted: BTreeMap<String, String> = self.entries.iter().map(|e| (e.key().clone(), e.value().clone())).collect();
        let json = serde_json::to_vec_pretty(&sorted).context(EncodeSnafu)?;

        // The rename is only atomic when the temporary file is on the target's filesystem.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).context(WriteSnafu { path: dir.to_path_buf() })?;
        let tmp_path = tmp.path().to_path_buf();
        tmp.write_all(&json).context(WriteSnafu { path: tmp_path.clone() })?;
        tmp.flush().context(WriteSnafu { path: tmp_path.clone() })?;
        tmp.as_file_mut().sync_all().context(WriteSnafu { path: tmp_path })?;
        tmp.persist(path).map_err(|e| e.error).context(WriteSnafu { path: path.clone() })?;
        Ok(())
    }
}

// ////// //
// Errors //
// ////// //

#[derive(Debug, Snafu)]
pub enum StoreError {
    #[snafu(display("Could not read state file {}", path.display()))]
    Read { path: PathBuf, source: io::Error },
    #[snafu(display("Could not write state file {}", path.display()))]
    Write { path: PathBuf, source: io::Error },
    #[snafu(display("State file {} is not a JSON object of strings", path.display()))]
    Decode { path: PathBuf, source: serde_json::Error },
    #[snafu(display("Could not encode state"))]
    Encode { source: serde_json::Error },
}
