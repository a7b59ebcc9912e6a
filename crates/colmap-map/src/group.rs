//! Partition of the target schema into independent units of work.

use colmap_model::StandardColumn;

/// The standard columns sharing one standard sheet name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkGroup {
    pub sheet: String,
    columns: Vec<StandardColumn>,
}

impl WorkGroup {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column keyed by its column name. A column with the same name is
    /// replaced in place and returned.
    pub fn insert(&mut self, column: StandardColumn) -> Option<StandardColumn> {
        match self.columns.iter_mut().find(|c| c.column == column.column) {
            Some(existing) => Some(std::mem::replace(existing, column)),
            None => {
                self.columns.push(column);
                None
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&StandardColumn> {
        self.columns.iter().find(|c| c.column == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> &[StandardColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.column.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Group standard columns by sheet, in first-seen sheet order.
///
/// A repeated `(sheet, column)` pair is a data-quality problem in the
/// framework; the later definition wins and a warning is logged.
pub fn group_by_sheet(columns: &[StandardColumn]) -> Vec<WorkGroup> {
    let mut groups: Vec<WorkGroup> = Vec::new();
    for column in columns {
        let index = match groups.iter().position(|g| g.sheet == column.sheet) {
            Some(index) => index,
            None => {
                groups.push(WorkGroup::new(column.sheet.clone()));
                groups.len() - 1
            }
        };
        if groups[index].insert(column.clone()).is_some() {
            tracing::warn!(
                sheet = %column.sheet,
                column = %column.column,
                "Duplicate standard column in framework; keeping the last definition"
            );
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_in_first_seen_order() {
        let groups = group_by_sheet(&[
            StandardColumn::new("DM", "SUBJECT"),
            StandardColumn::new("AE", "AE_TERM"),
            StandardColumn::new("DM", "SEX"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].sheet, "DM");
        assert_eq!(
            groups[0].column_names().collect::<Vec<_>>(),
            vec!["SUBJECT", "SEX"]
        );
        assert_eq!(groups[1].sheet, "AE");
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn duplicate_pair_last_write_wins() {
        let groups = group_by_sheet(&[
            StandardColumn::new("AE", "AE_TERM").with_note("first"),
            StandardColumn::new("AE", "AE_SER"),
            StandardColumn::new("AE", "AE_TERM").with_note("second"),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        let term = groups[0].get("AE_TERM").unwrap();
        assert_eq!(term.note.as_deref(), Some("second"));
        assert_eq!(
            groups[0].column_names().collect::<Vec<_>>(),
            vec!["AE_TERM", "AE_SER"]
        );
    }

    #[test]
    fn same_column_name_in_different_sheets_is_not_a_duplicate() {
        let groups = group_by_sheet(&[
            StandardColumn::new("AE", "SUBJECT"),
            StandardColumn::new("DM", "SUBJECT"),
        ]);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.contains("SUBJECT")));
    }

    #[test]
    fn empty_schema_has_no_groups() {
        assert!(group_by_sheet(&[]).is_empty());
    }
}
