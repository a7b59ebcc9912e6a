//! Target schema ("framework") types.

use serde::{Deserialize, Serialize};

use crate::ids::FrameworkId;

/// One field of the standard schema, identified by `(sheet, column)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardColumn {
    /// Standard sheet name (e.g. "AE").
    pub sheet: String,
    /// Standard column name (e.g. "AE_ONSET_DATE").
    pub column: String,
    /// Information category of the column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_type: Option<String>,
    /// Free-text note describing the column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StandardColumn {
    pub fn new(sheet: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            column: column.into(),
            info_type: None,
            note: None,
        }
    }

    #[must_use]
    pub fn with_info_type(mut self, info_type: impl Into<String>) -> Self {
        self.info_type = Some(info_type.into());
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The `(sheet, column)` pair that is unique within a framework version.
    pub fn key(&self) -> (&str, &str) {
        (&self.sheet, &self.column)
    }
}

/// A named, versioned standard schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Framework {
    pub id: FrameworkId,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<StandardColumn>,
}

impl Framework {
    pub fn new(id: FrameworkId, name: impl Into<String>, columns: Vec<StandardColumn>) -> Self {
        Self {
            id,
            name: name.into(),
            version: String::new(),
            description: None,
            columns,
        }
    }

    /// Distinct standard sheet names in first-seen order.
    pub fn sheet_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for column in &self.columns {
            if !names.contains(&column.sheet.as_str()) {
                names.push(&column.sheet);
            }
        }
        names
    }

    /// `(sheet, column)` pairs that occur more than once.
    pub fn duplicate_keys(&self) -> Vec<(String, String)> {
        let mut seen = std::collections::BTreeSet::new();
        let mut duplicates = Vec::new();
        for column in &self.columns {
            if !seen.insert(column.key()) {
                duplicates.push((column.sheet.clone(), column.column.clone()));
            }
        }
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framework(columns: Vec<StandardColumn>) -> Framework {
        Framework::new(FrameworkId::new("fw").unwrap(), "Test", columns)
    }

    #[test]
    fn sheet_names_in_first_seen_order() {
        let fw = framework(vec![
            StandardColumn::new("DM", "SUBJECT"),
            StandardColumn::new("AE", "AE_TERM"),
            StandardColumn::new("DM", "SEX"),
        ]);
        assert_eq!(fw.sheet_names(), vec!["DM", "AE"]);
    }

    #[test]
    fn reports_duplicate_pairs() {
        let fw = framework(vec![
            StandardColumn::new("AE", "AE_TERM"),
            StandardColumn::new("AE", "AE_TERM").with_note("again"),
            StandardColumn::new("DM", "AE_TERM"),
        ]);
        assert_eq!(
            fw.duplicate_keys(),
            vec![("AE".to_string(), "AE_TERM".to_string())]
        );
    }
}
