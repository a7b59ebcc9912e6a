#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use colmap_map::CancelToken;
use colmap_model::{
    Dataset, DatasetId, Framework, FrameworkId, Row, SessionEvent, Sheet, StandardColumn,
};
use colmap_oracle::{Oracle, OracleError};

type Responder = dyn Fn(&str, usize) -> Result<String, OracleError> + Send + Sync;

/// Scripted oracle recording call counts and peak concurrency.
pub struct FakeOracle {
    responder: Box<Responder>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeOracle {
    /// `responder` receives the prompt and the 1-based call number.
    pub fn new(
        responder: impl Fn(&str, usize) -> Result<String, OracleError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Oracle for FakeOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.responder)(prompt, call)
    }
}

/// The standard sheet a prompt was built for.
pub fn prompt_sheet(prompt: &str) -> String {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("## Standard Schema for Sheet: "))
        .unwrap_or_default()
        .to_string()
}

/// A candidate object as the oracle would return it.
pub fn candidate(
    source_sheet: &str,
    source_column: &str,
    sheet: &str,
    column: &str,
    confidence: f64,
) -> serde_json::Value {
    json!({
        "Source_ColumnName": source_column,
        "Source_SheetName": source_sheet,
        "Standard_ColumnName": column,
        "Standard_SheetName": sheet,
        "Confidence": confidence,
        "Rationale": format!("{source_column} corresponds to {column}"),
    })
}

pub fn mappings(candidates: Vec<serde_json::Value>) -> String {
    json!({ "mappings": candidates }).to_string()
}

pub fn dataset_id() -> DatasetId {
    DatasetId::new("study-01").unwrap()
}

pub fn framework_id() -> FrameworkId {
    FrameworkId::new("cdisc").unwrap()
}

/// One `AE` sheet with `开始日期` samples.
pub fn ae_dataset() -> Dataset {
    Dataset::new(
        dataset_id(),
        "Study 01",
        vec![Sheet::new(
            "AE",
            vec![
                Row::from_pairs([("开始日期", "2024-01-01")]),
                Row::from_pairs([("开始日期", "2024-01-05")]),
            ],
        )],
    )
}

pub fn framework(columns: Vec<StandardColumn>) -> Framework {
    Framework::new(framework_id(), "CDISC subset", columns)
}

/// `sheets` standard sheets named S00, S01, ... with `per_sheet` columns each.
pub fn wide_framework(sheets: usize, per_sheet: usize) -> Framework {
    let columns = (0..sheets)
        .flat_map(|s| {
            (0..per_sheet).map(move |c| StandardColumn::new(format!("S{s:02}"), format!("COL_{c}")))
        })
        .collect();
    framework(columns)
}

/// Drain a session stream until it closes, failing after `limit`.
pub async fn collect_events(
    mut events: mpsc::Receiver<SessionEvent>,
    limit: Duration,
) -> Vec<SessionEvent> {
    tokio::time::timeout(limit, async move {
        let mut collected = Vec::new();
        while let Some(event) = events.recv().await {
            collected.push(event);
        }
        collected
    })
    .await
    .expect("event stream did not finish in time")
}

pub fn never_cancelled() -> CancelToken {
    CancelToken::new()
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
