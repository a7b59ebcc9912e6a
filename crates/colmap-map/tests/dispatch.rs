mod common;

use std::sync::Arc;
use std::time::Duration;

use colmap_map::{
    CancelToken, Dispatcher, EngineOptions, GroupOutcome, GroupStatus, SourceSummary,
    group_by_sheet,
};
use colmap_model::Row;
use colmap_oracle::OracleError;

use common::{FakeOracle, candidate, mappings, prompt_sheet, wide_framework};

fn empty_source() -> Arc<SourceSummary> {
    Arc::new(SourceSummary::from_samples(
        "Study",
        [("AE", vec![Row::from_pairs([("开始日期", "2024-01-01")])])],
    ))
}

async fn drain(mut rx: tokio::sync::mpsc::Receiver<GroupOutcome>) -> Vec<GroupOutcome> {
    tokio::time::timeout(Duration::from_secs(10), async move {
        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    })
    .await
    .expect("dispatch finished")
}

#[tokio::test]
async fn concurrency_never_exceeds_limit() {
    let oracle = Arc::new(
        FakeOracle::new(|_, _| Ok(mappings(vec![]))).with_delay(Duration::from_millis(20)),
    );
    let options = EngineOptions {
        concurrency: 5,
        ..EngineOptions::default()
    };
    let dispatcher = Dispatcher::new(Arc::clone(&oracle), options);
    let groups = group_by_sheet(&wide_framework(12, 2).columns);

    let outcomes = drain(dispatcher.run(groups, empty_source(), CancelToken::new())).await;

    assert_eq!(outcomes.len(), 12);
    assert_eq!(oracle.calls(), 12);
    assert!(oracle.max_in_flight() <= 5, "peak {}", oracle.max_in_flight());
    assert!(oracle.max_in_flight() >= 2, "groups did not overlap");
    assert!(outcomes.iter().all(|o| o.entries.len() == 2));
}

#[tokio::test]
async fn exhausted_group_yields_placeholders_with_last_error() {
    let oracle = Arc::new(FakeOracle::new(|_, call| {
        Err(OracleError::Network(format!("connection reset #{call}")))
    }));
    let dispatcher = Dispatcher::new(Arc::clone(&oracle), EngineOptions::default());
    let groups = group_by_sheet(&wide_framework(1, 3).columns);

    let outcomes = drain(dispatcher.run(groups, empty_source(), CancelToken::new())).await;

    assert_eq!(oracle.calls(), 3);
    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.attempts, 3);
    assert!(outcome.is_degraded());
    assert_eq!(outcome.entries.len(), 3);
    for entry in &outcome.entries {
        assert_eq!(entry.confidence, 0.0);
        assert!(!entry.has_source());
        assert_eq!(
            entry.rationale,
            "Processing failed: network error: connection reset #3"
        );
    }
}

#[tokio::test]
async fn malformed_response_is_retried() {
    let oracle = Arc::new(FakeOracle::new(|prompt, call| {
        if call == 1 {
            Ok("Sorry, I cannot help with that.".to_string())
        } else {
            let sheet = prompt_sheet(prompt);
            Ok(mappings(vec![candidate(
                "AE", "开始日期", &sheet, "COL_0", 0.9,
            )]))
        }
    }));
    let dispatcher = Dispatcher::new(Arc::clone(&oracle), EngineOptions::default());
    let groups = group_by_sheet(&wide_framework(1, 1).columns);

    let outcomes = drain(dispatcher.run(groups, empty_source(), CancelToken::new())).await;

    assert_eq!(oracle.calls(), 2);
    assert_eq!(outcomes[0].status, GroupStatus::Resolved);
    assert_eq!(outcomes[0].attempts, 2);
    assert_eq!(outcomes[0].entries[0].source_column_name, "开始日期");
}

#[tokio::test]
async fn parse_failures_report_the_parse_error() {
    let oracle = Arc::new(FakeOracle::new(|_, _| Ok("[]".to_string())));
    let options = EngineOptions {
        max_attempts: 2,
        ..EngineOptions::default()
    };
    let dispatcher = Dispatcher::new(Arc::clone(&oracle), options);
    let groups = group_by_sheet(&wide_framework(1, 1).columns);

    let outcomes = drain(dispatcher.run(groups, empty_source(), CancelToken::new())).await;

    assert_eq!(oracle.calls(), 2);
    assert_eq!(
        outcomes[0].status,
        GroupStatus::Exhausted {
            last_error: "response is not a JSON object".to_string()
        }
    );
}

#[tokio::test]
async fn panicking_group_is_recovered_without_affecting_others() {
    let oracle = Arc::new(FakeOracle::new(|prompt, _| {
        let sheet = prompt_sheet(prompt);
        assert_ne!(sheet, "S01", "oracle blew up");
        Ok(mappings(vec![candidate("AE", "开始日期", &sheet, "COL_0", 0.95)]))
    }));
    let dispatcher = Dispatcher::new(Arc::clone(&oracle), EngineOptions::default());
    let groups = group_by_sheet(&wide_framework(3, 1).columns);

    let outcomes = drain(dispatcher.run(groups, empty_source(), CancelToken::new())).await;

    assert_eq!(outcomes.len(), 3);
    let crashed = outcomes.iter().find(|o| o.sheet == "S01").unwrap();
    assert!(matches!(crashed.status, GroupStatus::Crashed { .. }));
    assert!(crashed.entries[0].rationale.starts_with("Processing failed: "));
    assert!(
        outcomes
            .iter()
            .filter(|o| o.sheet != "S01")
            .all(|o| o.status == GroupStatus::Resolved && o.entries[0].confidence == 0.95)
    );
}

#[tokio::test]
async fn cancellation_stops_queued_and_in_flight_groups() {
    let oracle = Arc::new(
        FakeOracle::new(|_, _| Ok(mappings(vec![]))).with_delay(Duration::from_secs(30)),
    );
    let options = EngineOptions {
        concurrency: 2,
        ..EngineOptions::default()
    };
    let dispatcher = Dispatcher::new(Arc::clone(&oracle), options);
    let groups = group_by_sheet(&wide_framework(6, 1).columns);
    let cancel = CancelToken::new();

    let rx = dispatcher.run(groups, empty_source(), cancel.clone());
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let outcomes = drain(rx).await;
    assert!(outcomes.is_empty());
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn source_sheets_are_filtered_per_group() {
    let source = Arc::new(SourceSummary::from_samples(
        "Study",
        [
            ("AE", vec![Row::from_pairs([("开始日期", "2024-01-01")])]),
            ("DM", vec![Row::from_pairs([("性别", "男")])]),
        ],
    ));
    let oracle = Arc::new(FakeOracle::new(|prompt, _| {
        if prompt.contains("### Sheet: DM") {
            Err(OracleError::InvalidResponse("DM leaked into AE prompt".to_string()))
        } else {
            Ok(mappings(vec![]))
        }
    }));
    let dispatcher = Dispatcher::new(Arc::clone(&oracle), EngineOptions::default());
    let groups = group_by_sheet(&[colmap_model::StandardColumn::new("AE", "AE_TERM")]);

    let outcomes = drain(dispatcher.run(groups, source, CancelToken::new())).await;
    assert_eq!(outcomes[0].status, GroupStatus::Resolved);
    assert_eq!(oracle.calls(), 1);
}
