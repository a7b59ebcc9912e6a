//! Oracle-ready descriptions of the source dataset and the target schema.

use serde::Serialize;

use colmap_model::{Row, StandardColumn};

/// Rows sampled from each source sheet.
pub const SAMPLE_ROWS: usize = 5;

/// Sample values kept per source column.
pub const MAX_SAMPLE_VALUES: usize = 3;

const INFERRED_TYPE: &str = "string";
const UNKNOWN_ROW_COUNT: &str = "Unknown";

/// One observed source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub sample_values: Vec<String>,
    pub data_type: String,
}

/// Summary of one source sheet built from its sampled rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub description: String,
    pub row_count: String,
    pub columns: Vec<ColumnSummary>,
}

impl SheetSummary {
    /// Summarize a sheet from its sampled rows.
    ///
    /// Columns appear in first-seen order across the sample. Null and missing
    /// cells are skipped when collecting samples.
    pub fn from_rows(name: impl Into<String>, rows: &[Row]) -> Self {
        let name = name.into();
        let mut columns: Vec<ColumnSummary> = Vec::new();

        for row in rows {
            for (column, value) in row.iter() {
                let index = match columns.iter().position(|c| c.name == column) {
                    Some(index) => index,
                    None => {
                        columns.push(ColumnSummary {
                            name: column.to_string(),
                            sample_values: Vec::new(),
                            data_type: INFERRED_TYPE.to_string(),
                        });
                        columns.len() - 1
                    }
                };
                let samples = &mut columns[index].sample_values;
                if samples.len() < MAX_SAMPLE_VALUES
                    && let Some(text) = value.to_sample_string()
                {
                    samples.push(text);
                }
            }
        }

        Self {
            description: format!("Sheet {name}"),
            row_count: UNKNOWN_ROW_COUNT.to_string(),
            name,
            columns,
        }
    }
}

/// Summary of every sheet of a source dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub description: String,
    pub sheets: Vec<SheetSummary>,
}

impl SourceSummary {
    pub fn new(dataset_name: &str, sheets: Vec<SheetSummary>) -> Self {
        Self {
            description: format!("Source data from {dataset_name}"),
            sheets,
        }
    }

    /// Build the summary from `(sheet name, sampled rows)` pairs.
    pub fn from_samples<I, N>(dataset_name: &str, samples: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<Row>)>,
        N: Into<String>,
    {
        let sheets = samples
            .into_iter()
            .map(|(name, rows)| SheetSummary::from_rows(name, &rows))
            .collect();
        Self::new(dataset_name, sheets)
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetSummary> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str())
    }
}

/// The target schema as handed to the grouper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSchema {
    pub description: String,
    pub columns: Vec<StandardColumn>,
}

impl TargetSchema {
    pub fn new(framework_name: &str, columns: Vec<StandardColumn>) -> Self {
        Self {
            description: format!("Target schema: {framework_name}"),
            columns,
        }
    }

    pub fn total_columns(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use colmap_model::CellValue;

    use super::*;

    #[test]
    fn samples_are_capped_and_skip_nulls() {
        let rows: Vec<Row> = (1..=5)
            .map(|i| {
                let mut row = Row::new();
                row.insert("受试者编号", format!("00{i}"));
                row.insert(
                    "备注",
                    if i % 2 == 0 {
                        CellValue::Null
                    } else {
                        CellValue::from("x")
                    },
                );
                row
            })
            .collect();

        let summary = SheetSummary::from_rows("AE", &rows);
        assert_eq!(summary.columns.len(), 2);
        assert_eq!(
            summary.columns[0].sample_values,
            vec!["001", "002", "003"]
        );
        assert_eq!(summary.columns[1].sample_values, vec!["x", "x", "x"]);
        assert_eq!(summary.columns[0].data_type, "string");
        assert_eq!(summary.row_count, "Unknown");
    }

    #[test]
    fn columns_seen_only_in_later_rows_are_listed() {
        let rows = vec![
            Row::from_pairs([("A", "1")]),
            Row::from_pairs([("A", "2"), ("B", "b")]),
        ];
        let summary = SheetSummary::from_rows("S", &rows);
        let names: Vec<&str> = summary.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn empty_sheet_has_no_columns() {
        let summary = SheetSummary::from_rows("DM", &[]);
        assert!(summary.columns.is_empty());
        assert_eq!(summary.description, "Sheet DM");
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        let mut row = Row::new();
        row.insert("AGE", 42.0);
        row.insert("WEIGHT", 71.5);
        let summary = SheetSummary::from_rows("DM", &[row]);
        assert_eq!(summary.columns[0].sample_values, vec!["42"]);
        assert_eq!(summary.columns[1].sample_values, vec!["71.5"]);
    }

    #[test]
    fn source_summary_describes_dataset() {
        let summary = SourceSummary::from_samples("Study 01", [("AE", vec![]), ("DM", vec![])]);
        assert_eq!(summary.description, "Source data from Study 01");
        assert_eq!(summary.sheet_names().collect::<Vec<_>>(), vec!["AE", "DM"]);
        assert!(summary.sheet("LB").is_none());
    }
}
