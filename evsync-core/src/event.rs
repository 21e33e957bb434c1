//! Backend-neutral event types.
//!
//! Adapters convert their backend's native records into these types, and
//! hosts work exclusively with them. Absence is always expressed as
//! `Option`, never as an empty string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EvSyncError, EvSyncResult};
use crate::location::Location;
use crate::term::{Category, Tag};

/// A calendar event (backend-neutral).
///
/// `uid` is the host-assigned stable identifier and the sole idempotency
/// key for writes: the reconciler maps it onto the backend's native slug
/// field, so repeated saves with the same `uid` update one backend record
/// instead of creating duplicates. It is immutable once assigned and must
/// never collide across tenants sharing one backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub uid: String,
    /// Backend-native id, set only after a successful save.
    pub event_id: Option<i64>,
    /// Owning tenant on multi-tenant hosts.
    pub tenant_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub excerpt: Option<String>,
    /// Permalink on the backend.
    pub link: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub owner_user_id: Option<i64>,
    pub contact: Contact,
    pub image_url: Option<String>,
    /// Free-form cost descriptor ("FREE", "10 EUR", ...).
    pub cost: Option<String>,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub location: Option<Location>,
}

impl Event {
    pub fn new(
        uid: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Event {
            uid: uid.into(),
            event_id: None,
            tenant_id: None,
            title: title.into(),
            description: None,
            excerpt: None,
            link: None,
            start,
            end,
            all_day: false,
            published: None,
            updated: None,
            owner_user_id: None,
            contact: Contact::default(),
            image_url: None,
            cost: None,
            categories: Vec::new(),
            tags: Vec::new(),
            location: None,
        }
    }

    /// Create an event with a freshly minted uid, for hosts that author
    /// events themselves rather than importing them from a feed.
    pub fn with_generated_uid(
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Event::new(Uuid::new_v4().to_string(), title, start, end)
    }

    /// Check the model invariants: a non-empty uid and `end >= start`.
    pub fn validate(&self) -> EvSyncResult<()> {
        if self.uid.trim().is_empty() {
            return Err(EvSyncError::Config("event has an empty uid".into()));
        }
        if self.end < self.start {
            return Err(EvSyncError::Config(format!(
                "event '{}' ends before it starts",
                self.uid
            )));
        }
        Ok(())
    }
}

/// Contact details attached to an event. Every field is optional; the
/// reconciler never writes an absent field over stored data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

impl Contact {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.website.is_none()
    }
}
