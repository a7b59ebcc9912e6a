//! Data model for AI-assisted column mapping.
//!
//! - [`Dataset`]: source sheets and rows to be mapped
//! - [`Framework`]: the standard schema, a flat list of [`StandardColumn`]s
//! - [`MappingSession`] / [`MappingEntry`]: the persisted result of one run
//! - [`SessionEvent`]: the progress stream emitted while a session is built

pub mod dataset;
pub mod error;
pub mod event;
pub mod framework;
pub mod ids;
pub mod mapping;

pub use dataset::{CellValue, Dataset, Row, Sheet};
pub use error::{ModelError, Result};
pub use event::SessionEvent;
pub use framework::{Framework, StandardColumn};
pub use ids::{DatasetId, FrameworkId, SessionId};
pub use mapping::{MappingEntry, MappingSession, SessionSummary};
