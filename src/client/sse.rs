//! Incremental server-sent events decoder
//!
//! Bytes are fed in whatever pieces the transport delivers them. Complete
//! lines are interpreted as they become available; a trailing partial line
//! stays buffered until the next chunk completes it. An event is emitted on
//! the blank line that terminates it.

use crate::Result;
use crate::error::Error;

/// Event type assumed when an event carries no `event:` field
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// A single dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
    /// Last event id seen on this stream
    pub id: Option<String>,
    /// Reconnection delay requested by the server, in milliseconds
    pub retry: Option<u64>,
}

impl SseEvent {
    /// Whether this is a primary `message` event
    pub fn is_message(&self) -> bool {
        self.event.as_deref().map_or(true, |kind| kind == DEFAULT_EVENT_TYPE)
    }
}

/// Buffering SSE decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    // Previous chunk ended in '\r'; a leading '\n' belongs to that line break.
    skip_lf: bool,
    started: bool,
    event_type: Option<String>,
    data_lines: Vec<String>,
    last_event_id: Option<String>,
    retry: Option<u64>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and collect every event it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>> {
        let mut chunk = chunk;
        if self.skip_lf && !chunk.is_empty() {
            if chunk[0] == b'\n' {
                chunk = &chunk[1..];
            }
            self.skip_lf = false;
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;

        while let Some(offset) = self.buffer[consumed..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
        {
            let line_end = consumed + offset;
            let mut next = line_end + 1;
            if self.buffer[line_end] == b'\r' {
                match self.buffer.get(next) {
                    Some(b'\n') => next += 1,
                    Some(_) => {}
                    None => self.skip_lf = true,
                }
            }

            let line = std::str::from_utf8(&self.buffer[consumed..line_end])
                .map_err(|e| Error::Protocol(format!("Event stream is not valid UTF-8: {}", e)))?
                .to_string();
            consumed = next;

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        self.buffer.drain(..consumed);
        Ok(events)
    }

    /// True when no partial line or partial event is held
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty() && self.data_lines.is_empty() && self.event_type.is_none()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = if self.started {
            line
        } else {
            self.started = true;
            line.strip_prefix('\u{feff}').unwrap_or(line)
        };

        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event_type = Some(value.to_string()),
            "data" => self.data_lines.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_event_id = Some(value.to_string()),
            "retry" if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
                self.retry = value.parse().ok();
            }
            _ => tracing::trace!("Ignoring event field {:?}", field),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_type = self.event_type.take();
        if self.data_lines.is_empty() {
            return None;
        }

        let data = self.data_lines.join("\n");
        self.data_lines.clear();

        Some(SseEvent {
            event: event_type.filter(|kind| !kind.is_empty()),
            data,
            id: self.last_event_id.clone(),
            retry: self.retry,
        })
    }
}
