//! Validation and merging of raw oracle responses.
//!
//! The oracle's answer is untyped text. [`validate_response`] turns it into a
//! [`ParsedResponse`]: either exactly one entry per expected standard column,
//! or the reason the text could not be used.

use serde_json::{Map, Value};

use colmap_model::{MappingEntry, StandardColumn};

use crate::group::WorkGroup;

/// Candidates below this confidence lose their source fields.
pub const CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Rationale of placeholders for columns the oracle did not resolve.
pub const NO_MATCH_RATIONALE: &str = "No match found by the oracle; placeholder retained";

const FIELD_SOURCE_COLUMN: &str = "Source_ColumnName";
const FIELD_SOURCE_SHEET: &str = "Source_SheetName";
const FIELD_STANDARD_COLUMN: &str = "Standard_ColumnName";
const FIELD_CONFIDENCE: &str = "Confidence";
const FIELD_RATIONALE: &str = "Rationale";

/// Outcome of validating one oracle response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// One entry per expected standard column.
    Parsed(Vec<MappingEntry>),
    /// The response could not be used; carries the reason.
    Malformed(String),
}

impl ParsedResponse {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

/// Validate, redact, merge and backfill the oracle's candidates for `group`.
pub fn validate_response(raw: &str, group: &WorkGroup) -> ParsedResponse {
    let text = extract_json_text(raw);
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(error) => {
            tracing::debug!(sheet = %group.sheet, %error, preview = %preview(raw), "Unparseable oracle response");
            return ParsedResponse::Malformed(format!("response is not valid JSON: {error}"));
        }
    };

    let Value::Object(object) = value else {
        return ParsedResponse::Malformed("response is not a JSON object".to_string());
    };

    let candidates = match object.get("mappings") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            return ParsedResponse::Malformed("`mappings` is not an array".to_string());
        }
    };

    let mut merged: Vec<MappingEntry> = Vec::new();
    for candidate in &candidates {
        let Value::Object(fields) = candidate else {
            tracing::debug!(sheet = %group.sheet, "Skipping non-object mapping candidate");
            continue;
        };
        let Some(entry) = candidate_entry(fields, group) else {
            continue;
        };
        match merged
            .iter_mut()
            .find(|e| e.standard_column_name == entry.standard_column_name)
        {
            Some(current) if entry.confidence > current.confidence => *current = entry,
            Some(_) => {}
            None => merged.push(entry),
        }
    }

    for column in group.columns() {
        if !merged.iter().any(|e| e.standard_column_name == column.column) {
            merged.push(MappingEntry::placeholder(column, NO_MATCH_RATIONALE));
        }
    }

    ParsedResponse::Parsed(merged)
}

/// Placeholders for every column of `group`.
pub fn placeholders(group: &WorkGroup, rationale: &str) -> Vec<MappingEntry> {
    group
        .columns()
        .iter()
        .map(|column| MappingEntry::placeholder(column, rationale))
        .collect()
}

/// Rationale used when a group could not be processed.
pub fn failure_rationale(error: &str) -> String {
    format!("Processing failed: {error}")
}

/// The JSON text of a response: the first fenced ```json block if present,
/// otherwise the whole trimmed response.
pub fn extract_json_text(raw: &str) -> &str {
    const FENCE_OPEN: &str = "```json";
    const FENCE_CLOSE: &str = "```";

    if let Some(start) = raw.find(FENCE_OPEN) {
        let body = &raw[start + FENCE_OPEN.len()..];
        if let Some(end) = body.find(FENCE_CLOSE) {
            return body[..end].trim();
        }
    }
    raw.trim()
}

/// Build an entry from one candidate. `None` when the candidate names no
/// standard column or one outside the group.
fn candidate_entry(fields: &Map<String, Value>, group: &WorkGroup) -> Option<MappingEntry> {
    let standard_column = match fields.get(FIELD_STANDARD_COLUMN) {
        Some(Value::String(name)) if !name.trim().is_empty() => name.as_str(),
        _ => {
            tracing::debug!(
                sheet = %group.sheet,
                "Dropping candidate without a standard column name"
            );
            return None;
        }
    };
    let Some(column) = lookup_column(group, standard_column) else {
        tracing::debug!(
            sheet = %group.sheet,
            column = %standard_column,
            "Dropping candidate for a column outside the group"
        );
        return None;
    };

    let confidence = coerce_confidence(fields.get(FIELD_CONFIDENCE));
    let (source_sheet_name, source_column_name) = if confidence < CONFIDENCE_THRESHOLD {
        (String::new(), String::new())
    } else {
        (
            string_field(fields, FIELD_SOURCE_SHEET),
            string_field(fields, FIELD_SOURCE_COLUMN),
        )
    };

    Some(MappingEntry {
        source_sheet_name,
        source_column_name,
        standard_sheet_name: group.sheet.clone(),
        standard_column_name: column.column.clone(),
        info_type: column.info_type.clone(),
        note: column.note.clone(),
        confidence,
        rationale: string_field(fields, FIELD_RATIONALE),
    })
}

/// Exact match first, then a match ignoring surrounding whitespace on both
/// sides. Framework names may carry padding that the oracle drops or keeps.
fn lookup_column<'a>(group: &'a WorkGroup, name: &str) -> Option<&'a StandardColumn> {
    group.get(name).or_else(|| {
        let trimmed = name.trim();
        group.columns().iter().find(|c| c.column.trim() == trimmed)
    })
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Numbers and numeric strings are accepted; anything else is 0.0. The
/// result is clamped to `0.0..=1.0`.
fn coerce_confidence(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|c| c.is_finite())
        .map_or(0.0, |c| c.clamp(0.0, 1.0))
}

fn preview(raw: &str) -> String {
    raw.chars().take(200).collect::<String>().replace('\n', "\\n")
}
