//! Events streamed to the caller while a mapping session is generated.
//!
//! The set of event types is closed: `start`, `data`, `error`, `done`.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::mapping::MappingEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session exists and generation is about to begin.
    Start {
        session_id: SessionId,
        total_groups: usize,
    },
    /// Entries of one completed group, already persisted.
    Data {
        session_id: SessionId,
        sheet: String,
        entries: Vec<MappingEntry>,
    },
    /// A failure. With `sheet` set, only that group failed and the stream
    /// continues; otherwise the event is terminal.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sheet: Option<String>,
        message: String,
    },
    /// All groups were delivered.
    Done,
}

impl SessionEvent {
    /// Terminal error, optionally attached to a session.
    pub fn fatal(session_id: Option<SessionId>, message: impl Into<String>) -> Self {
        Self::Error {
            session_id,
            sheet: None,
            message: message.into(),
        }
    }

    /// Non-terminal error scoped to one group.
    pub fn group_error(
        session_id: SessionId,
        sheet: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Error {
            session_id: Some(session_id),
            sheet: Some(sheet.into()),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Data { .. } => "data",
            Self::Error { .. } => "error",
            Self::Done => "done",
        }
    }

    /// True for `done` and for errors not scoped to a group.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Done => true,
            Self::Error { sheet, .. } => sheet.is_none(),
            Self::Start { .. } | Self::Data { .. } => false,
        }
    }

    /// Single-line JSON encoding.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Server-sent-events frame: `data: {json}\n\n`.
    pub fn to_sse_frame(&self) -> serde_json::Result<String> {
        Ok(format!("data: {}\n\n", self.to_json_line()?))
    }
}
