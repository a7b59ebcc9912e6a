use std::collections::BTreeMap;
use std::sync::RwLock;

use colmap_model::{
    Dataset, DatasetId, Framework, FrameworkId, MappingEntry, MappingSession, Row, SessionId,
    SessionSummary,
};

use crate::error::{Result, StoreError};
use crate::{MappingStore, sort_newest_first};

/// In-process store backed by maps behind read/write locks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    datasets: RwLock<BTreeMap<DatasetId, Dataset>>,
    frameworks: RwLock<BTreeMap<FrameworkId, Framework>>,
    sessions: RwLock<BTreeMap<SessionId, MappingSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_dataset(&self, dataset: Dataset) -> Result<()> {
        let mut datasets = self.datasets.write().map_err(|_| StoreError::LockPoisoned)?;
        datasets.insert(dataset.id.clone(), dataset);
        Ok(())
    }

    pub fn insert_framework(&self, framework: Framework) -> Result<()> {
        let mut frameworks = self
            .frameworks
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        frameworks.insert(framework.id.clone(), framework);
        Ok(())
    }

    #[must_use]
    pub fn with_dataset(self, dataset: Dataset) -> Self {
        if let Ok(mut datasets) = self.datasets.write() {
            datasets.insert(dataset.id.clone(), dataset);
        }
        self
    }

    #[must_use]
    pub fn with_framework(self, framework: Framework) -> Self {
        if let Ok(mut frameworks) = self.frameworks.write() {
            frameworks.insert(framework.id.clone(), framework);
        }
        self
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or_default()
    }
}

impl MappingStore for MemoryStore {
    fn find_dataset(&self, id: &DatasetId) -> Result<Option<Dataset>> {
        let datasets = self.datasets.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(datasets.get(id).cloned())
    }

    fn find_framework(&self, id: &FrameworkId) -> Result<Option<Framework>> {
        let frameworks = self
            .frameworks
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(frameworks.get(id).cloned())
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
        let id = session.id;
        let mut sessions = self.sessions.write().map_err(|_| StoreError::LockPoisoned)?;
        sessions.insert(id, session);
        Ok(id)
    }

    fn append_entries(&self, session_id: SessionId, entries: &[MappingEntry]) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::LockPoisoned)?;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(StoreError::SessionNotFound(session_id))?;
        session.entries.extend_from_slice(entries);
        Ok(())
    }

    fn sample_rows(&self, dataset_id: &DatasetId, sheet: &str, limit: usize) -> Result<Vec<Row>> {
        let datasets = self.datasets.read().map_err(|_| StoreError::LockPoisoned)?;
        let dataset = datasets
            .get(dataset_id)
            .ok_or_else(|| StoreError::DatasetNotFound(dataset_id.clone()))?;
        Ok(dataset
            .sheet(sheet)
            .map(|s| s.rows.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn load_session(&self, id: SessionId) -> Result<Option<MappingSession>> {
        let sessions = self.sessions.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(sessions.get(&id).cloned())
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let sessions = self.sessions.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut summaries: Vec<SessionSummary> =
            sessions.values().map(MappingSession::summary).collect();
        sort_newest_first(&mut summaries);
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use colmap_model::{CellValue, Sheet, StandardColumn};

    use super::*;

    fn dataset() -> Dataset {
        let rows = (0..8)
            .map(|i| Row::from_pairs([("ID", format!("{i:03}"))]))
            .collect();
        Dataset::new(
            DatasetId::new("ds").unwrap(),
            "Demo",
            vec![Sheet::new("DM", rows)],
        )
    }

    #[test]
    fn samples_are_bounded_and_ordered() {
        let store = MemoryStore::new().with_dataset(dataset());
        let id = DatasetId::new("ds").unwrap();
        let rows = store.sample_rows(&id, "DM", 5).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].get("ID"), Some(&CellValue::from("000")));
        assert!(store.sample_rows(&id, "NOPE", 5).unwrap().is_empty());
    }

    #[test]
    fn appends_accumulate_per_session() {
        let store = MemoryStore::new();
        let ds = DatasetId::new("ds").unwrap();
        let fw = FrameworkId::new("fw").unwrap();
        let session = store.create_session(&ds, &fw).unwrap();
        let column = StandardColumn::new("AE", "AE_TERM");
        store
            .append_entries(session, &[MappingEntry::placeholder(&column, "x")])
            .unwrap();
        store
            .append_entries(session, &[MappingEntry::placeholder(&column, "y")])
            .unwrap();
        let loaded = store.load_session(session).unwrap().unwrap();
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn append_to_unknown_session_fails() {
        let store = MemoryStore::new();
        let err = store
            .append_entries(SessionId::generate(), &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }
}
