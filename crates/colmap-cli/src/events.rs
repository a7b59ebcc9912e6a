//! Rendering of session events on standard output.

use std::io::Write;

use colmap_model::SessionEvent;

/// Wire format for streamed events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventFormat {
    /// One JSON object per line.
    Jsonl,
    /// Server-sent-event frames (`data: {json}` followed by a blank line).
    Sse,
    /// Events are not written.
    #[default]
    None,
}

/// Encode an event, or `None` when the format suppresses output.
pub fn render_event(
    event: &SessionEvent,
    format: EventFormat,
) -> serde_json::Result<Option<String>> {
    match format {
        EventFormat::Jsonl => event.to_json_line().map(|line| Some(format!("{line}\n"))),
        EventFormat::Sse => event.to_sse_frame().map(Some),
        EventFormat::None => Ok(None),
    }
}

/// Writes events to a sink, flushing after each one so consumers see them
/// as soon as a group completes.
pub struct EventWriter<W> {
    sink: W,
    format: EventFormat,
}

impl<W: Write> EventWriter<W> {
    pub fn new(sink: W, format: EventFormat) -> Self {
        Self { sink, format }
    }

    pub fn write(&mut self, event: &SessionEvent) -> anyhow::Result<()> {
        if let Some(frame) = render_event(event, self.format)? {
            self.sink.write_all(frame.as_bytes())?;
            self.sink.flush()?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_suppresses_output() {
        let rendered = render_event(&SessionEvent::Done, EventFormat::None).unwrap();
        assert_eq!(rendered, None);
    }

    #[test]
    fn jsonl_ends_with_newline() {
        let rendered = render_event(&SessionEvent::Done, EventFormat::Jsonl)
            .unwrap()
            .unwrap();
        assert_eq!(rendered, "{\"type\":\"done\"}\n");
    }

    #[test]
    fn sse_frames_are_blank_line_terminated() {
        let mut writer = EventWriter::new(Vec::new(), EventFormat::Sse);
        writer.write(&SessionEvent::Done).unwrap();
        writer
            .write(&SessionEvent::fatal(None, "Dataset or Framework not found"))
            .unwrap();
        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            output,
            "data: {\"type\":\"done\"}\n\n\
             data: {\"type\":\"error\",\"message\":\"Dataset or Framework not found\"}\n\n"
        );
    }
}
