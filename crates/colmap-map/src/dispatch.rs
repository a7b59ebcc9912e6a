//! Bounded concurrent processing of work groups.
//!
//! Every group runs as its own task. A semaphore limits how many groups talk
//! to the oracle at once; attempts inside a group are sequential. Outcomes
//! are delivered through a bounded channel in completion order.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{Id, JoinSet};
use tracing::Instrument;

use colmap_model::MappingEntry;
use colmap_oracle::Oracle;

use crate::cancel::CancelToken;
use crate::context::{SAMPLE_ROWS, SourceSummary};
use crate::group::WorkGroup;
use crate::prompt::{build_group_prompt, filter_source_for_group};
use crate::response::{ParsedResponse, failure_rationale, placeholders, validate_response};

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Tuning knobs for a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum number of groups calling the oracle at once.
    pub concurrency: usize,
    /// Oracle attempts per group before falling back to placeholders.
    pub max_attempts: usize,
    /// Rows sampled per source sheet.
    pub sample_rows: usize,
    /// Offer only source sheets whose name contains the group's sheet name.
    pub filter_source_sheets: bool,
    /// Capacity of the outcome and event channels.
    pub channel_capacity: usize,
    /// Log prompts and raw responses at `trace` level.
    pub log_payloads: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sample_rows: SAMPLE_ROWS,
            filter_source_sheets: true,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_payloads: false,
        }
    }
}

impl EngineOptions {
    /// Raise zero limits to one.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.concurrency = self.concurrency.max(1);
        self.max_attempts = self.max_attempts.max(1);
        self.channel_capacity = self.channel_capacity.max(1);
        self
    }
}

/// How a group reached its final entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupStatus {
    /// The oracle produced a usable response.
    Resolved,
    /// Every attempt failed.
    Exhausted { last_error: String },
    /// The group's task panicked.
    Crashed { error: String },
}

/// Final result of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub sheet: String,
    pub entries: Vec<MappingEntry>,
    pub attempts: usize,
    pub status: GroupStatus,
}

impl GroupOutcome {
    fn resolved(group: &WorkGroup, entries: Vec<MappingEntry>, attempts: usize) -> Self {
        Self {
            sheet: group.sheet.clone(),
            entries,
            attempts,
            status: GroupStatus::Resolved,
        }
    }

    fn exhausted(group: &WorkGroup, last_error: String, attempts: usize) -> Self {
        Self {
            sheet: group.sheet.clone(),
            entries: placeholders(group, &failure_rationale(&last_error)),
            attempts,
            status: GroupStatus::Exhausted { last_error },
        }
    }

    fn crashed(group: &WorkGroup, error: String) -> Self {
        Self {
            sheet: group.sheet.clone(),
            entries: placeholders(group, &failure_rationale(&error)),
            attempts: 0,
            status: GroupStatus::Crashed { error },
        }
    }

    /// True when the entries are failure placeholders.
    pub fn is_degraded(&self) -> bool {
        !matches!(self.status, GroupStatus::Resolved)
    }
}

/// Runs groups against the oracle under a concurrency bound.
pub struct Dispatcher<O> {
    oracle: Arc<O>,
    options: EngineOptions,
}

impl<O> Clone for Dispatcher<O> {
    fn clone(&self) -> Self {
        Self {
            oracle: Arc::clone(&self.oracle),
            options: self.options.clone(),
        }
    }
}

impl<O: Oracle + 'static> Dispatcher<O> {
    pub fn new(oracle: Arc<O>, options: EngineOptions) -> Self {
        Self {
            oracle,
            options: options.normalized(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Start processing `groups` in the background.
    ///
    /// One outcome per group is sent in completion order. Processing stops
    /// early when `cancel` fires or the receiver is dropped; in-flight oracle
    /// calls are abandoned in both cases.
    pub fn run(
        &self,
        groups: Vec<WorkGroup>,
        source: Arc<SourceSummary>,
        cancel: CancelToken,
    ) -> mpsc::Receiver<GroupOutcome> {
        let (tx, rx) = mpsc::channel(self.options.channel_capacity);
        let driver = drive(
            Arc::clone(&self.oracle),
            Arc::new(self.options.clone()),
            groups,
            source,
            cancel,
            tx,
        );
        tokio::spawn(driver.in_current_span());
        rx
    }
}

async fn drive<O: Oracle + 'static>(
    oracle: Arc<O>,
    options: Arc<EngineOptions>,
    groups: Vec<WorkGroup>,
    source: Arc<SourceSummary>,
    cancel: CancelToken,
    tx: mpsc::Sender<GroupOutcome>,
) {
    let semaphore = Arc::new(Semaphore::new(options.concurrency));
    let mut tasks = JoinSet::new();
    let mut pending: HashMap<Id, WorkGroup> = HashMap::with_capacity(groups.len());

    for group in groups {
        let oracle = Arc::clone(&oracle);
        let options = Arc::clone(&options);
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let task_group = group.clone();
        let span = tracing::info_span!("group", sheet = %group.sheet, columns = group.len());

        let handle = tasks.spawn(
            async move {
                let _permit = semaphore.acquire_owned().await.ok();
                process_group(oracle.as_ref(), &task_group, &source, &options).await
            }
            .instrument(span),
        );
        pending.insert(handle.id(), group);
    }

    loop {
        let joined = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::info!(remaining = pending.len(), "Dispatch cancelled");
                tasks.abort_all();
                break;
            }
            joined = tasks.join_next_with_id() => joined,
        };
        let Some(joined) = joined else {
            break;
        };

        let outcome = match joined {
            Ok((id, outcome)) => {
                pending.remove(&id);
                outcome
            }
            Err(error) => {
                let Some(group) = pending.remove(&error.id()) else {
                    continue;
                };
                if error.is_cancelled() {
                    continue;
                }
                tracing::error!(sheet = %group.sheet, %error, "Group task crashed, using placeholders");
                GroupOutcome::crashed(&group, error.to_string())
            }
        };

        if tx.send(outcome).await.is_err() {
            tracing::info!(
                remaining = pending.len(),
                "Outcome receiver dropped, stopping dispatch"
            );
            tasks.abort_all();
            break;
        }
    }
}

/// Prompt the oracle for one group, retrying until a response validates or
/// attempts run out.
pub(crate) async fn process_group<O: Oracle>(
    oracle: &O,
    group: &WorkGroup,
    source: &SourceSummary,
    options: &EngineOptions,
) -> GroupOutcome {
    let offered = if options.filter_source_sheets {
        filter_source_for_group(source, &group.sheet)
    } else {
        Cow::Borrowed(source)
    };
    let prompt = build_group_prompt(&offered, group);
    if options.log_payloads {
        tracing::trace!(%prompt, "Group prompt");
    }

    let mut last_error = String::new();
    for attempt in 1..=options.max_attempts {
        tracing::debug!(attempt, max_attempts = options.max_attempts, "Calling oracle");
        match oracle.complete(&prompt).await {
            Ok(raw) => {
                if options.log_payloads {
                    tracing::trace!(response = %raw, "Oracle response");
                }
                match validate_response(&raw, group) {
                    ParsedResponse::Parsed(entries) => {
                        let matched = entries.iter().filter(|e| e.has_source()).count();
                        tracing::info!(attempt, matched, "Group resolved");
                        return GroupOutcome::resolved(group, entries, attempt);
                    }
                    ParsedResponse::Malformed(reason) => {
                        tracing::warn!(attempt, %reason, "Oracle response rejected");
                        last_error = reason;
                    }
                }
            }
            Err(error) => {
                tracing::warn!(
                    attempt,
                    retryable = error.is_retryable(),
                    %error,
                    "Oracle call failed"
                );
                last_error = error.to_string();
            }
        }
    }

    tracing::error!(
        attempts = options.max_attempts,
        %last_error,
        "Group exhausted its attempts, using placeholders"
    );
    GroupOutcome::exhausted(group, last_error, options.max_attempts)
}
