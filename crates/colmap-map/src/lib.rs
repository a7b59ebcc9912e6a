//! Oracle-assisted column mapping engine.
//!
//! Given a source dataset and a target framework held by a
//! [`MappingStore`](colmap_store::MappingStore), the engine:
//!
//! - summarizes sampled source columns ([`context`])
//! - splits the framework into one [`WorkGroup`] per standard sheet ([`group`])
//! - prompts the [`Oracle`](colmap_oracle::Oracle) for every group under a
//!   concurrency bound, retrying failed attempts ([`dispatch`])
//! - validates and merges each response so every standard column ends with
//!   exactly one entry ([`response`])
//! - persists each group and streams [`SessionEvent`](colmap_model::SessionEvent)s
//!   as groups complete ([`session`])

pub mod cancel;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod group;
pub mod prompt;
pub mod response;
pub mod session;

pub use cancel::CancelToken;
pub use context::{
    ColumnSummary, MAX_SAMPLE_VALUES, SAMPLE_ROWS, SheetSummary, SourceSummary, TargetSchema,
};
pub use dispatch::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, Dispatcher,
    EngineOptions, GroupOutcome, GroupStatus,
};
pub use error::{EngineError, Result};
pub use group::{WorkGroup, group_by_sheet};
pub use prompt::{build_group_prompt, filter_source_for_group};
pub use response::{
    CONFIDENCE_THRESHOLD, NO_MATCH_RATIONALE, ParsedResponse, extract_json_text, placeholders,
    validate_response,
};
pub use session::MappingGenerator;
