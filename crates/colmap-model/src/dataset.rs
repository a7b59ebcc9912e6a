//! Source dataset types.
//!
//! A dataset is a named collection of sheets; every sheet is an ordered list
//! of rows, and every row maps column names to scalar cells. Column order is
//! the order the columns were observed in the source and is preserved through
//! serialization.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::DatasetId;

/// A scalar cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Renders the cell the way it is shown to the oracle.
    ///
    /// Returns `None` for null cells. Integral numbers drop the fractional
    /// part (`3`, not `3.0`).
    pub fn to_sample_string(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(value) => Some(value.to_string()),
            Self::Number(value) => Some(format_number(*value)),
            Self::Text(value) => Some(value.clone()),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One row of a sheet: column name to cell, in source column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from `(column, value)` pairs. Repeated columns keep their
    /// first position and take the last value.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.insert(column, value);
        }
        row
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping column names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
                let mut row = Row::new();
                while let Some((column, value)) = access.next_entry::<String, CellValue>()? {
                    row.insert(column, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// A source dataset as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Dataset {
    pub fn new(id: DatasetId, name: impl Into<String>, sheets: Vec<Sheet>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at: Some(Utc::now()),
            sheets,
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_keeps_source_column_order() {
        let json = r#"{"受试者编号": "001", "AGE": 42, "SEX": null}"#;
        let row: Row = serde_json::from_str(json).unwrap();
        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["受试者编号", "AGE", "SEX"]);
        assert_eq!(row.get("AGE"), Some(&CellValue::Number(42.0)));
        assert_eq!(row.get("SEX"), Some(&CellValue::Null));

        let back = serde_json::to_string(&row).unwrap();
        assert_eq!(back, r#"{"受试者编号":"001","AGE":42.0,"SEX":null}"#);
    }

    #[test]
    fn repeated_column_takes_last_value_in_first_position() {
        let row = Row::from_pairs([("A", "1"), ("B", "2"), ("A", "3")]);
        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["A", "B"]);
        assert_eq!(row.get("A"), Some(&CellValue::Text("3".to_string())));
    }

    #[test]
    fn sample_strings() {
        assert_eq!(CellValue::Null.to_sample_string(), None);
        assert_eq!(
            CellValue::Number(3.0).to_sample_string().as_deref(),
            Some("3")
        );
        assert_eq!(
            CellValue::Number(2.5).to_sample_string().as_deref(),
            Some("2.5")
        );
        assert_eq!(
            CellValue::Bool(true).to_sample_string().as_deref(),
            Some("true")
        );
        assert_eq!(
            CellValue::from("2024-01-01").to_sample_string().as_deref(),
            Some("2024-01-01")
        );
    }
}
