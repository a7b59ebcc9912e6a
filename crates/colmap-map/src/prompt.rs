//! Prompt assembly for one work group.
//!
//! A prompt is made of fixed sections joined by blank lines:
//! task instructions, sheet context, source data structure, the group's
//! standard schema, mapping hints, the required output format and worked
//! examples. The output for a given input is deterministic.

use std::borrow::Cow;

use crate::context::{SheetSummary, SourceSummary};
use crate::group::WorkGroup;

const TASK_INSTRUCTIONS: &str = "\
# Column Mapping Task

You are an expert in clinical trial data standards. Map the columns of a
source dataset onto the columns of a standard schema.

## Goal

For every standard column listed below, choose the single source column that
best carries the same information. Weigh:
1. **Meaning** - what the column records
2. **Type** - whether the values can be converted
3. **Domain knowledge** - clinical trial conventions
4. **Naming** - Chinese labels, English abbreviations and codes

## Rules

1. Map each standard column to at most one source column.
2. Prefer the source sheet whose subject matches the standard sheet.
3. Do not reuse a source column for several standard columns without reason.
4. Keep each rationale short (at most 120 characters) and factual.
5. Answer with JSON only. No prose, no markdown fences.

## Output

- A JSON object with a `mappings` array
- One object per standard column, with every required field
- A confidence score between 0.0 and 1.0
- A brief rationale";

const OUTPUT_FORMAT: &str = r#"```json
{
  "mappings": [
    {
      "Source_ColumnName": "string - source column name as listed above",
      "Source_SheetName": "string - source sheet containing that column",
      "Standard_ColumnName": "string - standard column name from the schema",
      "Standard_SheetName": "string - standard sheet name from the schema",
      "Confidence": "number (0.0-1.0) - certainty of this mapping",
      "Rationale": "string - short explanation"
    }
  ]
}
```

**Important**:
- Only return mappings for the standard columns listed in the schema above.
- Never add standard columns that are not in the schema.
- Include every standard column of the schema, even without a good match.
- Confidence must reflect how certain the mapping is."#;

const MAPPING_EXAMPLES: &str = r#"### Example 1: direct meaning
```json
{
  "Source_ColumnName": "开始日期(AESTDAT)",
  "Source_SheetName": "AE",
  "Standard_ColumnName": "AE_ONSET_DATE",
  "Standard_SheetName": "AE",
  "Confidence": 0.95,
  "Rationale": "'开始日期' is the start date and AESTDAT is the adverse event start date code."
}
```

### Example 2: translated label
```json
{
  "Source_ColumnName": "受试者编号",
  "Source_SheetName": "AE",
  "Standard_ColumnName": "SUBJECT",
  "Standard_SheetName": "AE",
  "Confidence": 0.9,
  "Rationale": "'受试者编号' translates to subject number."
}
```

### Example 3: context
```json
{
  "Source_ColumnName": "最高级别（CTCAE 5.0）(AEHCTCAE)",
  "Source_SheetName": "AE",
  "Standard_ColumnName": "SEVERITY",
  "Standard_SheetName": "AE",
  "Confidence": 0.85,
  "Rationale": "Highest CTCAE grade of the event, i.e. its severity."
}
```"#;

/// Known meanings of common clinical sheet names.
const SHEET_MEANINGS: &[(&str, &str)] = &[
    (
        "AE",
        "Adverse Events - adverse medical events occurring during the study",
    ),
    (
        "DA1",
        "Drug Administration - drug exposure and administration records",
    ),
    (
        "DM",
        "Demographics - subject demographics and basic study information",
    ),
    (
        "EX",
        "Exposure - drug exposure and administration details",
    ),
    (
        "CM",
        "Concomitant Medications - other medications taken during the study",
    ),
    ("MH", "Medical History - pre-existing medical conditions"),
    ("VS", "Vital Signs - measurements of basic body functions"),
    ("LB", "Laboratory - clinical laboratory test results"),
];

const TERM_HINTS: &[(&str, &str)] = &[
    ("受试者编号", "Subject ID"),
    ("项目编号", "Project ID"),
    ("不良事件", "Adverse Event"),
    ("开始日期", "Start Date"),
    ("结束日期", "End Date"),
    ("给药", "Drug Administration"),
    ("剂量", "Dose"),
    ("严重性", "Severity"),
    ("转归", "Outcome"),
    ("因果关系", "Causality"),
    ("措施", "Action"),
];

const ABBREVIATION_HINTS: &[(&str, &str)] = &[
    ("AE", "Adverse Event"),
    ("SAE", "Serious Adverse Event"),
    ("DM", "Demographics"),
    ("EX", "Exposure"),
    ("DAT", "Date"),
    ("SER", "Serious"),
    ("TERM", "Terminology"),
    ("ACN", "Action"),
    ("REL", "Relationship"),
];

/// Restrict the source to sheets whose name contains the group's sheet name
/// (case-insensitive). Falls back to every sheet when none match.
pub fn filter_source_for_group<'a>(
    source: &'a SourceSummary,
    group_sheet: &str,
) -> Cow<'a, SourceSummary> {
    let needle = group_sheet.to_lowercase();
    let matching: Vec<SheetSummary> = source
        .sheets
        .iter()
        .filter(|sheet| sheet.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    if matching.is_empty() {
        tracing::debug!(sheet = group_sheet, "No matching source sheet, offering all sheets");
        return Cow::Borrowed(source);
    }

    tracing::debug!(
        sheet = group_sheet,
        matched = matching.len(),
        "Restricting source sheets for group"
    );
    Cow::Owned(SourceSummary {
        description: source.description.clone(),
        sheets: matching,
    })
}

/// Assemble the oracle prompt for one group.
pub fn build_group_prompt(source: &SourceSummary, group: &WorkGroup) -> String {
    [
        TASK_INSTRUCTIONS.to_string(),
        format!("## Sheet Context\n\n{}", sheet_context(source)),
        format!("## Source Data Structure\n\n{}", source_structure(source)),
        format!(
            "## Standard Schema for Sheet: {}\n\n{}",
            group.sheet,
            target_schema(group)
        ),
        format!("## Column Mapping Hints\n\n{}", column_hints()),
        format!("## Required Output Format\n\n{OUTPUT_FORMAT}"),
        format!("## Mapping Examples\n\n{MAPPING_EXAMPLES}"),
    ]
    .join("\n\n")
}

/// Business meaning of a source sheet name.
pub fn sheet_meaning(name: &str) -> Cow<'static, str> {
    SHEET_MEANINGS
        .iter()
        .find(|(sheet, _)| *sheet == name)
        .map_or_else(
            || Cow::Owned(format!("{name} - Study data sheet")),
            |(_, meaning)| Cow::Borrowed(*meaning),
        )
}

fn sheet_context(source: &SourceSummary) -> String {
    let mut lines = vec!["Business meaning of source sheets:".to_string()];
    lines.extend(
        source
            .sheet_names()
            .map(|name| format!("- **{name}**: {}", sheet_meaning(name))),
    );
    lines.join("\n")
}

fn source_structure(source: &SourceSummary) -> String {
    let mut lines = vec!["Available source sheets and their columns:".to_string()];
    for sheet in &source.sheets {
        lines.push(format!("\n### Sheet: {}", sheet.name));
        lines.push(format!("Row Count: {}", sheet.row_count));
        lines.push("Columns:".to_string());
        for column in &sheet.columns {
            let samples = if column.sample_values.is_empty() {
                "No data".to_string()
            } else {
                column.sample_values.join(", ")
            };
            lines.push(format!(
                "  - `{}` ({}): {samples}",
                column.name, column.data_type
            ));
        }
    }
    lines.join("\n")
}

fn target_schema(group: &WorkGroup) -> String {
    let mut lines = vec![format!("Target columns for sheet {}:", group.sheet)];
    for column in group.columns() {
        lines.push(format!("- **{}**", column.column));
        if let Some(info_type) = column.info_type.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("  - Type: {info_type}"));
        }
        if let Some(note) = column.note.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("  - Note: {note}"));
        }
    }
    lines.join("\n")
}

fn column_hints() -> String {
    let mut lines = vec!["Semantic mapping hints to help with column matching:".to_string()];

    lines.push("\n### Common Chinese-English Term Mappings:".to_string());
    lines.extend(
        TERM_HINTS
            .iter()
            .map(|(term, english)| format!("- {term} → {english}")),
    );

    lines.push("\n### Common Abbreviations:".to_string());
    lines.extend(
        ABBREVIATION_HINTS
            .iter()
            .map(|(abbr, full)| format!("- {abbr} → {full}")),
    );

    lines.push("\n### Date/Time Column Patterns:".to_string());
    lines.push("- Columns containing '日期' or 'DAT' usually hold dates".to_string());
    lines.push("- Columns containing '时间' or 'TIM' usually hold times".to_string());
    lines.push("- Pairs like AESTDAT / AEENDAT are start and end dates".to_string());

    lines.push("\n### Code vs Description Patterns:".to_string());
    lines.push("- Columns ending with '_CD' or '编码' usually hold codes".to_string());
    lines.push("- Columns without a code suffix usually hold text".to_string());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use colmap_model::{Row, StandardColumn};

    use super::*;
    use crate::context::SheetSummary;

    fn source() -> SourceSummary {
        SourceSummary::new(
            "Study",
            vec![
                SheetSummary::from_rows(
                    "AE",
                    &[Row::from_pairs([
                        ("开始日期", "2024-01-01"),
                        ("受试者编号", "001"),
                    ])],
                ),
                SheetSummary::from_rows("AE_SAE", &[]),
                SheetSummary::from_rows("DM", &[Row::from_pairs([("性别", "男")])]),
            ],
        )
    }

    fn ae_group() -> WorkGroup {
        let mut group = WorkGroup::new("AE");
        group.insert(
            StandardColumn::new("AE", "AE_ONSET_DATE")
                .with_info_type("基本信息")
                .with_note("AE开始日期"),
        );
        group.insert(StandardColumn::new("AE", "SUBJECT"));
        group
    }

    #[test]
    fn filter_keeps_matching_sheets_case_insensitively() {
        let source = source();
        let filtered = filter_source_for_group(&source, "ae");
        let names: Vec<&str> = filtered.sheet_names().collect();
        assert_eq!(names, vec!["AE", "AE_SAE"]);
        assert!(matches!(filtered, Cow::Owned(_)));
    }

    #[test]
    fn filter_falls_back_to_all_sheets() {
        let source = source();
        let filtered = filter_source_for_group(&source, "LB");
        assert_eq!(filtered.sheets.len(), 3);
        assert!(matches!(filtered, Cow::Borrowed(_)));
    }

    #[test]
    fn prompt_contains_every_section_in_order() {
        let prompt = build_group_prompt(&source(), &ae_group());
        let headings = [
            "# Column Mapping Task",
            "## Sheet Context",
            "## Source Data Structure",
            "## Standard Schema for Sheet: AE",
            "## Column Mapping Hints",
            "## Required Output Format",
            "## Mapping Examples",
        ];
        let mut last = 0;
        for heading in headings {
            let at = prompt[last..]
                .find(heading)
                .unwrap_or_else(|| panic!("missing {heading}"));
            last += at + heading.len();
        }
    }

    #[test]
    fn prompt_describes_columns_and_targets() {
        let prompt = build_group_prompt(&source(), &ae_group());
        assert!(prompt.contains("### Sheet: AE\nRow Count: Unknown\nColumns:"));
        assert!(prompt.contains("  - `开始日期` (string): 2024-01-01"));
        assert!(prompt.contains("### Sheet: AE_SAE\nRow Count: Unknown\nColumns:"));
        assert!(prompt.contains(
            "- **AE_ONSET_DATE**\n  - Type: 基本信息\n  - Note: AE开始日期\n- **SUBJECT**"
        ));
        assert!(prompt.contains("- **AE**: Adverse Events"));
        assert!(prompt.contains("- **AE_SAE**: AE_SAE - Study data sheet"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let source = source();
        let group = ae_group();
        assert_eq!(
            build_group_prompt(&source, &group),
            build_group_prompt(&source, &group)
        );
    }

    #[test]
    fn unknown_sheet_meaning() {
        assert_eq!(sheet_meaning("XYZ"), "XYZ - Study data sheet");
        assert!(sheet_meaning("VS").starts_with("Vital Signs"));
    }
}
