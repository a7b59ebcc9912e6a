use proptest::prelude::*;
use serde_json::{Value, json};

use colmap_map::{CONFIDENCE_THRESHOLD, ParsedResponse, WorkGroup, validate_response};
use colmap_model::StandardColumn;

const COLUMNS: &[&str] = &["SUBJECT", "AE_TERM", "AE_ONSET_DATE", "AE_SER"];

fn group() -> WorkGroup {
    let mut group = WorkGroup::new("AE");
    for column in COLUMNS {
        group.insert(StandardColumn::new("AE", *column));
    }
    group
}

fn confidence_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0.0f64..=1.0).prop_map(|c| json!(c)),
        (0.0f64..=1.0).prop_map(|c| json!(c.to_string())),
        Just(json!("unknown")),
        Just(Value::Null),
    ]
}

fn standard_column() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(COLUMNS).prop_map(str::to_string),
        "[A-Z_]{1,10}",
    ]
}

fn candidate() -> impl Strategy<Value = Value> {
    (
        "[A-Z]{1,4}",
        "\\PC{0,8}",
        standard_column(),
        prop::option::of("[A-Z]{1,4}"),
        confidence_value(),
    )
        .prop_map(|(source_sheet, source_column, standard, standard_sheet, confidence)| {
            json!({
                "Source_SheetName": source_sheet,
                "Source_ColumnName": source_column,
                "Standard_ColumnName": standard,
                "Standard_SheetName": standard_sheet,
                "Confidence": confidence,
                "Rationale": "generated",
            })
        })
}

proptest! {
    #[test]
    fn one_entry_per_expected_column(candidates in prop::collection::vec(candidate(), 0..12)) {
        let raw = json!({ "mappings": candidates }).to_string();
        let ParsedResponse::Parsed(entries) = validate_response(&raw, &group()) else {
            panic!("well-formed response rejected");
        };

        prop_assert_eq!(entries.len(), COLUMNS.len());
        for column in COLUMNS {
            let count = entries.iter().filter(|e| e.standard_column_name == *column).count();
            prop_assert_eq!(count, 1);
        }
        prop_assert!(entries.iter().all(|e| e.standard_sheet_name == "AE"));
    }

    #[test]
    fn low_confidence_never_claims_a_source(candidates in prop::collection::vec(candidate(), 0..12)) {
        let raw = json!({ "mappings": candidates }).to_string();
        if let ParsedResponse::Parsed(entries) = validate_response(&raw, &group()) {
            for entry in entries {
                prop_assert!((0.0..=1.0).contains(&entry.confidence));
                if entry.confidence < CONFIDENCE_THRESHOLD {
                    prop_assert!(entry.source_sheet_name.is_empty());
                    prop_assert!(entry.source_column_name.is_empty());
                }
            }
        }
    }

    #[test]
    fn arbitrary_text_never_panics(raw in "\\PC{0,64}") {
        let _ = validate_response(&raw, &group());
    }
}
