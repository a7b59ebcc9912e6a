//! Mapping session and entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::framework::StandardColumn;
use crate::ids::{DatasetId, FrameworkId, SessionId};

/// One resolved mapping from a source column to a standard column.
///
/// Empty source fields mean "no confident match".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source_sheet_name: String,
    pub source_column_name: String,
    pub standard_sheet_name: String,
    pub standard_column_name: String,
    #[serde(default)]
    pub info_type: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Confidence score (0.0 to 1.0).
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
}

impl MappingEntry {
    /// A source-less, zero-confidence entry for `column`.
    pub fn placeholder(column: &StandardColumn, rationale: impl Into<String>) -> Self {
        Self {
            source_sheet_name: String::new(),
            source_column_name: String::new(),
            standard_sheet_name: column.sheet.clone(),
            standard_column_name: column.column.clone(),
            info_type: column.info_type.clone(),
            note: column.note.clone(),
            confidence: 0.0,
            rationale: rationale.into(),
        }
    }

    /// True if the entry names a source column.
    pub fn has_source(&self) -> bool {
        !self.source_sheet_name.is_empty() || !self.source_column_name.is_empty()
    }

    pub fn is_placeholder(&self) -> bool {
        !self.has_source() && self.confidence == 0.0
    }

    /// The `(standard sheet, standard column)` key of this entry.
    pub fn standard_key(&self) -> (&str, &str) {
        (&self.standard_sheet_name, &self.standard_column_name)
    }
}

/// A persisted generation run for one (dataset, framework) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSession {
    pub id: SessionId,
    pub dataset_id: DatasetId,
    pub framework_id: FrameworkId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub entries: Vec<MappingEntry>,
}

impl MappingSession {
    pub fn new(id: SessionId, dataset_id: DatasetId, framework_id: FrameworkId) -> Self {
        Self {
            id,
            dataset_id,
            framework_id,
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            dataset_id: self.dataset_id.clone(),
            framework_id: self.framework_id.clone(),
            created_at: self.created_at,
            entry_count: self.entries.len(),
            matched_count: self.entries.iter().filter(|e| e.has_source()).count(),
        }
    }
}

/// Listing view of a session without its entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub dataset_id: DatasetId,
    pub framework_id: FrameworkId,
    pub created_at: DateTime<Utc>,
    pub entry_count: usize,
    pub matched_count: usize,
}
