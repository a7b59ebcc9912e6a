//! File-system store keeping every document as a JSON file.
//!
//! Writes go to a temp file that is synced and renamed over the target, so a
//! crash never leaves a half-written session behind. Session appends are
//! serialized through a store-wide lock (read, extend, write).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;

use colmap_model::{
    Dataset, DatasetId, Framework, FrameworkId, MappingEntry, MappingSession, Row, SessionId,
    SessionSummary,
};

use crate::error::{Result, StoreError};
use crate::{MappingStore, sort_newest_first};

const DATASETS_DIR: &str = "datasets";
const FRAMEWORKS_DIR: &str = "frameworks";
const SESSIONS_DIR: &str = "sessions";

/// Directory-backed store.
#[derive(Debug)]
pub struct JsonStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

/// Listing view of a stored dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub id: DatasetId,
    pub name: String,
    pub sheet_count: usize,
}

/// Listing view of a stored framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkInfo {
    pub id: FrameworkId,
    pub name: String,
    pub version: String,
    pub sheet_count: usize,
    pub column_count: usize,
}

impl JsonStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [DATASETS_DIR, FRAMEWORKS_DIR, SESSIONS_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|source| StoreError::Io {
                operation: "create directory",
                path: path.clone(),
                source,
            })?;
        }
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save_dataset(&self, dataset: &Dataset) -> Result<PathBuf> {
        let path = self.dataset_path(&dataset.id);
        write_json_atomic(&path, dataset, "dataset")?;
        tracing::info!(dataset = %dataset.id, "Saved dataset to {}", path.display());
        Ok(path)
    }

    pub fn save_framework(&self, framework: &Framework) -> Result<PathBuf> {
        let path = self.framework_path(&framework.id);
        write_json_atomic(&path, framework, "framework")?;
        tracing::info!(framework = %framework.id, "Saved framework to {}", path.display());
        Ok(path)
    }

    pub fn list_datasets(&self) -> Result<Vec<DatasetInfo>> {
        let mut infos: Vec<DatasetInfo> = self
            .read_all::<Dataset>(DATASETS_DIR)?
            .into_iter()
            .map(|dataset| DatasetInfo {
                sheet_count: dataset.sheets.len(),
                id: dataset.id,
                name: dataset.name,
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(infos)
    }

    pub fn list_frameworks(&self) -> Result<Vec<FrameworkInfo>> {
        let mut infos: Vec<FrameworkInfo> = self
            .read_all::<Framework>(FRAMEWORKS_DIR)?
            .into_iter()
            .map(|framework| FrameworkInfo {
                sheet_count: framework.sheet_names().len(),
                column_count: framework.columns.len(),
                id: framework.id,
                name: framework.name,
                version: framework.version,
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(infos)
    }

    fn dataset_path(&self, id: &DatasetId) -> PathBuf {
        self.root
            .join(DATASETS_DIR)
            .join(format!("{}.json", normalize_id(id.as_str())))
    }

    fn framework_path(&self, id: &FrameworkId) -> PathBuf {
        self.root
            .join(FRAMEWORKS_DIR)
            .join(format!("{}.json", normalize_id(id.as_str())))
    }

    fn session_path(&self, id: SessionId) -> PathBuf {
        self.root.join(SESSIONS_DIR).join(format!("{id}.json"))
    }

    /// Decode every `*.json` document in a sub-directory, skipping files that
    /// do not parse.
    fn read_all<T: DeserializeOwned>(&self, dir: &str) -> Result<Vec<T>> {
        let dir_path = self.root.join(dir);
        let entries = fs::read_dir(&dir_path).map_err(|source| StoreError::Io {
            operation: "read directory",
            path: dir_path.clone(),
            source,
        })?;

        let mut documents = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                operation: "read directory",
                path: dir_path.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_json::<T>(&path) {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "Skipping unreadable document");
                }
            }
        }
        Ok(documents)
    }
}

impl MappingStore for JsonStore {
    fn find_dataset(&self, id: &DatasetId) -> Result<Option<Dataset>> {
        read_json(&self.dataset_path(id))
    }

    fn find_framework(&self, id: &FrameworkId) -> Result<Option<Framework>> {
        read_json(&self.framework_path(id))
    }

    fn create_session(
        &self,
        dataset_id: &DatasetId,
        framework_id: &FrameworkId,
    ) -> Result<SessionId> {
        let session = MappingSession::new(
            SessionId::generate(),
            dataset_id.clone(),
            framework_id.clone(),
        );
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        write_json_atomic(&self.session_path(session.id), &session, "mapping session")?;
        tracing::debug!(session = %session.id, "Created mapping session");
        Ok(session.id)
    }

    fn append_entries(&self, session_id: SessionId, entries: &[MappingEntry]) -> Result<()> {
        let path = self.session_path(session_id);
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut session: MappingSession =
            read_json(&path)?.ok_or(StoreError::SessionNotFound(session_id))?;
        session.entries.extend_from_slice(entries);
        write_json_atomic(&path, &session, "mapping session")
    }

    fn sample_rows(&self, dataset_id: &DatasetId, sheet: &str, limit: usize) -> Result<Vec<Row>> {
        let dataset = self
            .find_dataset(dataset_id)?
            .ok_or_else(|| StoreError::DatasetNotFound(dataset_id.clone()))?;
        Ok(dataset
            .sheet(sheet)
            .map(|s| s.rows.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn load_session(&self, id: SessionId) -> Result<Option<MappingSession>> {
        read_json(&self.session_path(id))
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries: Vec<SessionSummary> = self
            .read_all::<MappingSession>(SESSIONS_DIR)?
            .iter()
            .map(MappingSession::summary)
            .collect();
        sort_newest_first(&mut summaries);
        Ok(summaries)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|source| StoreError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| StoreError::Deserialization {
            path: path.to_path_buf(),
            source,
        })
}

/// Write `value` as pretty JSON via temp file + rename.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialization {
        what: what.to_string(),
        source,
    })?;

    let temp_path = path.with_extension("json.tmp");

    let mut file = File::create(&temp_path).map_err(|source| StoreError::Io {
        operation: "create",
        path: temp_path.clone(),
        source,
    })?;

    file.write_all(&bytes).map_err(|source| StoreError::Io {
        operation: "write",
        path: temp_path.clone(),
        source,
    })?;

    file.sync_all().map_err(|source| StoreError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source,
    })?;

    fs::rename(&temp_path, path).map_err(|source| StoreError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source,
    })
}

/// Normalize an ID for use in filenames.
fn normalize_id(id: &str) -> String {
    id.trim()
        .to_uppercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_ids_for_filenames() {
        assert_eq!(normalize_id("study-01/ae"), "STUDY_01_AE");
        assert_eq!(normalize_id(" 临床 "), "临床");
    }
}
