//! Answer reducer - folds event payloads into one answer
//!
//! Every event carries the whole answer so far, so the latest text replaces
//! the accumulator. The `[DONE]` sentinel resolves the answer exactly once.

use serde_json::Value;
use crate::Result;
use crate::error::Error;

/// Payload that terminates the answer stream
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Streaming,
    Resolved,
}

/// Per-call accumulator with a resolve-once guard
#[derive(Debug)]
pub struct AnswerReducer {
    answer: String,
    state: State,
}

impl AnswerReducer {
    pub fn new() -> Self {
        Self {
            answer: String::new(),
            state: State::Streaming,
        }
    }

    /// Apply one event payload
    ///
    /// Returns the final answer when the payload is the sentinel. After that
    /// every further payload is ignored.
    pub fn apply(&mut self, payload: &str) -> Result<Option<String>> {
        if self.state == State::Resolved {
            tracing::debug!("Ignoring event after the answer resolved");
            return Ok(None);
        }

        if payload == DONE_SENTINEL {
            self.state = State::Resolved;
            if self.answer.is_empty() {
                tracing::warn!("Answer stream finished without any text");
            }
            return Ok(Some(std::mem::take(&mut self.answer)));
        }

        let value: Value = serde_json::from_str(payload)
            .map_err(|e| Error::Protocol(format!("Invalid event payload: {}", e)))?;

        if let Some(text) = extract_text(&value) {
            self.answer.clear();
            self.answer.push_str(text);
        }
        Ok(None)
    }

    /// Text held so far
    pub fn current(&self) -> &str {
        &self.answer
    }

    pub fn is_resolved(&self) -> bool {
        self.state == State::Resolved
    }
}

impl Default for AnswerReducer {
    fn default() -> Self {
        Self::new()
    }
}

/// First content part of the message, when it is non-empty text
fn extract_text(value: &Value) -> Option<&str> {
    value
        .pointer("/message/content/parts/0")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}
