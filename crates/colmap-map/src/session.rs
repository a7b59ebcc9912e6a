//! Mapping session lifecycle and the event stream.
//!
//! A run moves through `created -> streaming -> (done | errored)`:
//!
//! 1. Dataset and framework are looked up. If either is missing a single
//!    `error` event without a session id is emitted and nothing is stored.
//! 2. The source is sampled, the framework grouped and a session created;
//!    `start` carries the session id and group count.
//! 3. Each group outcome is appended to the session and only then emitted as
//!    `data`. A failed append emits a group-scoped `error` instead and the run
//!    continues.
//! 4. `done` follows the last group. Cancellation or a dispatcher failure ends
//!    the stream with a terminal `error`; entries already stored are kept.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::Instrument;

use colmap_model::{DatasetId, FrameworkId, MappingEntry, SessionEvent, SessionId};
use colmap_oracle::Oracle;
use colmap_store::MappingStore;

use crate::cancel::CancelToken;
use crate::context::{SourceSummary, TargetSchema};
use crate::dispatch::{Dispatcher, EngineOptions};
use crate::error::{EngineError, Result};
use crate::group::{WorkGroup, group_by_sheet};

/// Generates mapping sessions from a store and an oracle.
pub struct MappingGenerator<S, O> {
    store: Arc<S>,
    dispatcher: Dispatcher<O>,
}

impl<S, O> MappingGenerator<S, O>
where
    S: MappingStore + 'static,
    O: Oracle + 'static,
{
    pub fn new(store: Arc<S>, oracle: Arc<O>, options: EngineOptions) -> Self {
        Self {
            store,
            dispatcher: Dispatcher::new(oracle, options),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        self.dispatcher.options()
    }

    /// Start generating a session for the pair and return its event stream.
    ///
    /// The stream always ends with `done` or a terminal `error`, unless the
    /// receiver is dropped first, which stops the run.
    pub fn generate(
        &self,
        dataset_id: DatasetId,
        framework_id: FrameworkId,
        cancel: CancelToken,
    ) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(self.options().channel_capacity);
        let run = SessionRun {
            store: Arc::clone(&self.store),
            dispatcher: self.dispatcher.clone(),
            tx,
        };
        let span = tracing::info_span!("session", dataset = %dataset_id, framework = %framework_id);
        tokio::spawn(
            run.execute(dataset_id, framework_id, cancel)
                .instrument(span),
        );
        rx
    }
}

struct Prepared {
    session_id: SessionId,
    groups: Vec<WorkGroup>,
    source: SourceSummary,
}

struct SessionRun<S, O> {
    store: Arc<S>,
    dispatcher: Dispatcher<O>,
    tx: mpsc::Sender<SessionEvent>,
}

impl<S, O> SessionRun<S, O>
where
    S: MappingStore + 'static,
    O: Oracle + 'static,
{
    async fn execute(self, dataset_id: DatasetId, framework_id: FrameworkId, cancel: CancelToken) {
        let Prepared {
            session_id,
            groups,
            source,
        } = match self.prepare(dataset_id, framework_id).await {
            Ok(prepared) => prepared,
            Err(error) => {
                tracing::error!(%error, "Generation could not start");
                self.emit(SessionEvent::fatal(None, error.user_message()))
                    .await;
                return;
            }
        };

        let total_groups = groups.len();
        tracing::info!(session = %session_id, total_groups, "Mapping session started");
        if !self
            .emit(SessionEvent::Start {
                session_id,
                total_groups,
            })
            .await
        {
            return;
        }

        match self.stream(session_id, groups, source, &cancel).await {
            Ok(()) => {
                tracing::info!(session = %session_id, "Mapping session complete");
                self.emit(SessionEvent::Done).await;
            }
            Err(EngineError::Disconnected { completed, total }) => {
                tracing::info!(
                    session = %session_id,
                    completed,
                    total,
                    "Event receiver dropped; stopping session"
                );
            }
            Err(error) => {
                tracing::error!(session = %session_id, %error, "Mapping session ended early");
                self.emit(SessionEvent::fatal(Some(session_id), error.user_message()))
                    .await;
            }
        }
    }

    /// Look up inputs, build the source summary and groups, and create the
    /// session. Runs on the blocking pool.
    async fn prepare(&self, dataset_id: DatasetId, framework_id: FrameworkId) -> Result<Prepared> {
        let store = Arc::clone(&self.store);
        let sample_rows = self.dispatcher.options().sample_rows;

        tokio::task::spawn_blocking(move || -> Result<Prepared> {
            let dataset = store.find_dataset(&dataset_id)?;
            let framework = store.find_framework(&framework_id)?;
            let (Some(dataset), Some(framework)) = (dataset, framework) else {
                return Err(EngineError::NotFound {
                    dataset_id,
                    framework_id,
                });
            };

            let samples = dataset
                .sheets
                .iter()
                .map(|sheet| {
                    let rows = store
                        .sample_rows(&dataset_id, &sheet.name, sample_rows)
                        .unwrap_or_else(|error| {
                            tracing::warn!(
                                sheet = %sheet.name,
                                %error,
                                "Failed to sample source sheet, using an empty summary"
                            );
                            Vec::new()
                        });
                    (sheet.name.clone(), rows)
                })
                .collect::<Vec<_>>();
            let source = SourceSummary::from_samples(&dataset.name, samples);

            let target = TargetSchema::new(&framework.name, framework.columns);
            let groups = group_by_sheet(&target.columns);
            tracing::debug!(
                target = %target.description,
                columns = target.total_columns(),
                groups = groups.len(),
                source_sheets = source.sheets.len(),
                "Prepared generation inputs"
            );

            let session_id = store.create_session(&dataset_id, &framework_id)?;
            Ok(Prepared {
                session_id,
                groups,
                source,
            })
        })
        .await?
    }

    async fn stream(
        &self,
        session_id: SessionId,
        groups: Vec<WorkGroup>,
        source: SourceSummary,
        cancel: &CancelToken,
    ) -> Result<()> {
        let total = groups.len();
        let mut outcomes = self
            .dispatcher
            .run(groups, Arc::new(source), cancel.clone());

        let mut completed = 0;
        while let Some(outcome) = outcomes.recv().await {
            completed += 1;
            let sheet = outcome.sheet;
            let (stored, entries) = self.append(session_id, outcome.entries).await;

            let event = match stored {
                Ok(()) => {
                    tracing::debug!(%sheet, entries = entries.len(), completed, total, "Group stored");
                    SessionEvent::Data {
                        session_id,
                        sheet,
                        entries,
                    }
                }
                Err(error) => {
                    tracing::error!(%sheet, %error, "Failed to store group entries");
                    let message = format!(
                        "Failed to save mappings for sheet {sheet}: {}",
                        error.user_message()
                    );
                    SessionEvent::group_error(session_id, sheet, message)
                }
            };

            if !self.emit(event).await {
                return Err(EngineError::Disconnected { completed, total });
            }
        }

        if completed == total {
            Ok(())
        } else if cancel.is_cancelled() {
            Err(EngineError::Cancelled { completed, total })
        } else {
            Err(EngineError::Incomplete { completed, total })
        }
    }

    /// Append a group's entries on the blocking pool, handing them back for
    /// the event.
    async fn append(
        &self,
        session_id: SessionId,
        entries: Vec<MappingEntry>,
    ) -> (Result<()>, Vec<MappingEntry>) {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || {
            let stored = store.append_entries(session_id, &entries);
            (stored, entries)
        });
        match task.await {
            Ok((stored, entries)) => (stored.map_err(EngineError::from), entries),
            Err(error) => (Err(error.into()), Vec::new()),
        }
    }

    /// Send an event. `false` once the receiver is gone.
    async fn emit(&self, event: SessionEvent) -> bool {
        let kind = event.kind();
        if self.tx.send(event).await.is_err() {
            tracing::info!(event = kind, "Event receiver dropped, stopping generation");
            return false;
        }
        true
    }
}
