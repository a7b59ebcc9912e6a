//! Storage for datasets, frameworks and mapping sessions.
//!
//! The generation engine only talks to storage through [`MappingStore`].
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`] - process-local, used by tests and embedding callers
//! - [`JsonStore`] - a directory of JSON documents with atomic writes
//!
//! # Layout of a [`JsonStore`]
//!
//! ```text
//! <root>/
//!   datasets/<DATASET_ID>.json
//!   frameworks/<FRAMEWORK_ID>.json
//!   sessions/<session-uuid>.json
//! ```

mod error;
mod json;
mod memory;

pub use error::{Result, StoreError};
pub use json::{DatasetInfo, FrameworkInfo, JsonStore};
pub use memory::MemoryStore;

use colmap_model::{
    Dataset, DatasetId, Framework, FrameworkId, MappingEntry, MappingSession, Row, SessionId,
    SessionSummary,
};

/// The storage contract the generation engine depends on.
///
/// All calls are synchronous. Implementations must be safe to share between
/// threads; appends for different sessions (or different groups of the same
/// session) may arrive concurrently.
pub trait MappingStore: Send + Sync {
    /// Look up a dataset. `Ok(None)` when it does not exist.
    fn find_dataset(&self, id: &DatasetId) -> Result<Option<Dataset>>;

    /// Look up a framework. `Ok(None)` when it does not exist.
    fn find_framework(&self, id: &FrameworkId) -> Result<Option<Framework>>;

    /// Create an empty session for the pair and return its id.
    fn create_session(&self, dataset_id: &DatasetId, framework_id: &FrameworkId)
    -> Result<SessionId>;

    /// Append a batch of entries to a session. A batch is stored entirely or
    /// not at all.
    fn append_entries(&self, session_id: SessionId, entries: &[MappingEntry]) -> Result<()>;

    /// The first `limit` rows of a sheet, in stored order. A sheet that does
    /// not exist yields no rows.
    fn sample_rows(&self, dataset_id: &DatasetId, sheet: &str, limit: usize) -> Result<Vec<Row>>;

    /// Load a session with all of its entries.
    fn load_session(&self, id: SessionId) -> Result<Option<MappingSession>>;

    /// All sessions, newest first.
    fn list_sessions(&self) -> Result<Vec<SessionSummary>>;
}

impl<S: MappingStore + ?Sized> MappingStore for std::sync::Arc<S> {
    fn find_dataset(&self, id: &DatasetId) -> Result<Option<Dataset>> {
        (**self).find_dataset(id)
    }

    fn find_framework(&self, id: &FrameworkId) -> Result<Option<Framework>> {
        (**self).find_framework(id)
    }

    fn create_session(
        &self,
        dataset_id: &DatasetId,
        framework_id: &FrameworkId,
    ) -> Result<SessionId> {
        (**self).create_session(dataset_id, framework_id)
    }

    fn append_entries(&self, session_id: SessionId, entries: &[MappingEntry]) -> Result<()> {
        (**self).append_entries(session_id, entries)
    }

    fn sample_rows(&self, dataset_id: &DatasetId, sheet: &str, limit: usize) -> Result<Vec<Row>> {
        (**self).sample_rows(dataset_id, sheet, limit)
    }

    fn load_session(&self, id: SessionId) -> Result<Option<MappingSession>> {
        (**self).load_session(id)
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        (**self).list_sessions()
    }
}

pub(crate) fn sort_newest_first(summaries: &mut [SessionSummary]) {
    summaries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
