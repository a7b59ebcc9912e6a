use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use colmap_cli::events::{EventFormat, EventWriter};
use colmap_cli::export::write_entries_csv;
use colmap_cli::logging::redact_value;
use colmap_cli::report::{datasets_table, frameworks_table, sessions_table};
use colmap_map::{CancelToken, EngineOptions, MappingGenerator};
use colmap_model::{
    Dataset, DatasetId, Framework, FrameworkId, MappingSession, SessionEvent, SessionId,
};
use colmap_oracle::{ChatOracle, OracleConfig};
use colmap_store::{JsonStore, MappingStore};

use crate::cli::{EventFormatArg, ExportArgs, GenerateArgs, ImportArgs, ImportKind};
use crate::progress::Progress;

/// What a generation run produced, as seen from the event stream.
#[derive(Debug, Default)]
pub struct GenerateReport {
    pub session_id: Option<SessionId>,
    /// The stored session, reloaded after the stream ends.
    pub session: Option<MappingSession>,
    /// Sheets whose entries could not be saved.
    pub group_errors: usize,
    /// Message of the terminal error, if the run did not finish.
    pub failure: Option<String>,
}

impl GenerateReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.group_errors == 0
    }
}

pub fn run_generate(
    store_dir: &Path,
    args: &GenerateArgs,
    log_data: bool,
) -> Result<GenerateReport> {
    let dataset_id = DatasetId::new(args.dataset.as_str()).context("invalid dataset id")?;
    let framework_id =
        FrameworkId::new(args.framework.as_str()).context("invalid framework id")?;

    let config = OracleConfig::from_env().context("load oracle configuration")?;
    info!(model = %config.model, base_url = %config.base_url, "Oracle configured");
    let oracle = ChatOracle::new(config).context("build oracle client")?;
    let store = Arc::new(open_store(store_dir)?);

    let options = EngineOptions {
        concurrency: args.concurrency,
        max_attempts: args.max_attempts,
        sample_rows: args.sample_rows,
        filter_source_sheets: !args.no_filter_sheets,
        log_payloads: log_data,
        ..EngineOptions::default()
    };
    let generator = MappingGenerator::new(Arc::clone(&store), Arc::new(oracle), options);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    let mut report = runtime.block_on(async {
        let cancel = CancelToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling generation");
                    cancel.cancel();
                }
            })
        };
        let events = generator.generate(dataset_id, framework_id, cancel);
        let streamed = follow_events(events, args).await;
        interrupt.abort();
        streamed
    })?;

    if let Some(session_id) = report.session_id {
        report.session = store
            .load_session(session_id)
            .with_context(|| format!("reload session {session_id}"))?;
    }
    Ok(report)
}

async fn follow_events(
    mut events: tokio::sync::mpsc::Receiver<SessionEvent>,
    args: &GenerateArgs,
) -> Result<GenerateReport> {
    let progress = Progress::new(!args.no_progress);
    let mut writer = EventWriter::new(io::stdout(), event_format(args.events));
    let mut report = GenerateReport::default();

    while let Some(event) = events.recv().await {
        writer.write(&event).context("write event")?;
        match &event {
            SessionEvent::Start {
                session_id,
                total_groups,
            } => {
                report.session_id = Some(*session_id);
                progress.start(*total_groups);
            }
            SessionEvent::Data { sheet, entries, .. } => {
                for entry in entries.iter().filter(|entry| entry.has_source()) {
                    tracing::trace!(
                        %sheet,
                        column = %entry.standard_column_name,
                        source = %entry.source_column_name,
                        rationale = redact_value(&entry.rationale),
                        "Mapped column"
                    );
                }
                progress.group_done(sheet);
            }
            SessionEvent::Error {
                sheet: Some(sheet),
                message,
                ..
            } => {
                warn!(%sheet, %message, "Sheet could not be saved");
                report.group_errors += 1;
                progress.group_done(sheet);
            }
            SessionEvent::Error {
                sheet: None,
                message,
                ..
            } => {
                report.failure = Some(message.clone());
            }
            SessionEvent::Done => {}
        }
    }

    match &report.failure {
        Some(message) => progress.finish_err(message),
        None => progress.finish_ok("done"),
    }
    Ok(report)
}

pub fn run_sessions(store_dir: &Path) -> Result<()> {
    let store = open_store(store_dir)?;
    let sessions = store.list_sessions().context("list sessions")?;
    if sessions.is_empty() {
        println!("No mapping sessions in {}", store.root().display());
        return Ok(());
    }
    println!("{}", sessions_table(&sessions));
    Ok(())
}

pub fn run_show(store_dir: &Path, session_id: SessionId) -> Result<MappingSession> {
    let store = open_store(store_dir)?;
    load_session(&store, session_id)
}

pub fn run_export(store_dir: &Path, args: &ExportArgs) -> Result<()> {
    let store = open_store(store_dir)?;
    let session = load_session(&store, args.session)?;
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("create {}", path.display()))?;
            write_entries_csv(BufWriter::new(file), &session.entries)
                .with_context(|| format!("write {}", path.display()))?;
            info!(
                session = %session.id,
                entries = session.entries.len(),
                "Exported session to {}",
                path.display()
            );
        }
        None => {
            write_entries_csv(io::stdout().lock(), &session.entries).context("write CSV")?;
        }
    }
    Ok(())
}

pub fn run_datasets(store_dir: &Path) -> Result<()> {
    let store = open_store(store_dir)?;
    let datasets = store.list_datasets().context("list datasets")?;
    if datasets.is_empty() {
        println!("No datasets in {}", store.root().display());
        return Ok(());
    }
    println!("{}", datasets_table(&datasets));
    Ok(())
}

pub fn run_frameworks(store_dir: &Path) -> Result<()> {
    let store = open_store(store_dir)?;
    let frameworks = store.list_frameworks().context("list frameworks")?;
    if frameworks.is_empty() {
        println!("No frameworks in {}", store.root().display());
        return Ok(());
    }
    println!("{}", frameworks_table(&frameworks));
    Ok(())
}

pub fn run_import(store_dir: &Path, args: &ImportArgs) -> Result<()> {
    let store = open_store(store_dir)?;
    let text = fs::read_to_string(&args.path)
        .with_context(|| format!("read {}", args.path.display()))?;
    match args.kind {
        ImportKind::Dataset => {
            let dataset: Dataset = serde_json::from_str(&text)
                .with_context(|| format!("parse dataset {}", args.path.display()))?;
            let path = store.save_dataset(&dataset).context("save dataset")?;
            println!("Imported dataset '{}' to {}", dataset.id, path.display());
        }
        ImportKind::Framework => {
            let framework: Framework = serde_json::from_str(&text)
                .with_context(|| format!("parse framework {}", args.path.display()))?;
            for (sheet, column) in framework.duplicate_keys() {
                warn!(%sheet, %column, "Framework lists the column more than once");
            }
            let path = store.save_framework(&framework).context("save framework")?;
            println!("Imported framework '{}' to {}", framework.id, path.display());
        }
    }
    Ok(())
}

fn open_store(store_dir: &Path) -> Result<JsonStore> {
    JsonStore::open(store_dir).with_context(|| format!("open store at {}", store_dir.display()))
}

fn load_session(store: &JsonStore, session_id: SessionId) -> Result<MappingSession> {
    store
        .load_session(session_id)
        .with_context(|| format!("load session {session_id}"))?
        .ok_or_else(|| anyhow!("mapping session '{session_id}' does not exist"))
}

fn event_format(arg: EventFormatArg) -> EventFormat {
    match arg {
        EventFormatArg::Jsonl => EventFormat::Jsonl,
        EventFormatArg::Sse => EventFormat::Sse,
        EventFormatArg::None => EventFormat::None,
    }
}
