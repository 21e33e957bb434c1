//! Outcome of a reconciler write.

use serde::{Deserialize, Serialize};

/// What a `save_event` call achieved.
///
/// Writes are not transactional: the primary event record is persisted
/// before its location and terms, and a failure in a later step does not
/// roll it back. `event_id` is therefore set as soon as the primary record
/// exists, even when `has_error()` is true, so callers can retry the
/// remaining enrichment instead of losing the whole operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveResult {
    error: Option<String>,
    event_id: Option<i64>,
    content_id: Option<i64>,
}

impl SaveResult {
    pub fn new() -> Self {
        SaveResult::default()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Backend-native event id, once the primary record is persisted.
    pub fn event_id(&self) -> Option<i64> {
        self.event_id
    }

    pub fn set_event_id(&mut self, event_id: i64) {
        self.event_id = Some(event_id);
    }

    /// Backend-native content-record id, once the primary record is persisted.
    pub fn content_id(&self) -> Option<i64> {
        self.content_id
    }

    pub fn set_content_id(&mut self, content_id: i64) {
        self.content_id = Some(content_id);
    }
}
