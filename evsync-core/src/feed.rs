//! The host-facing feed contract.

use chrono::{DateTime, Utc};

use crate::error::EvSyncResult;
use crate::event::Event;
use crate::save_result::SaveResult;

/// Listener invoked with the backend-native id of a saved event.
pub type SavedListener = Box<dyn Fn(i64)>;

/// Listener invoked with the backend-native id of a deleted event.
pub type DeletedListener = Box<dyn Fn(i64)>;

/// One backend adapter: reads canonical events out of a specific calendar
/// backend and writes them back.
///
/// The engine is single-threaded and request-scoped; listeners run
/// synchronously on the calling thread and carry no `Send` bound.
pub trait CalendarFeed {
    /// Stable identifier of the backend ("events-manager", ...).
    fn identifier(&self) -> &str;

    /// Human-readable backend name.
    fn description(&self) -> &str;

    /// Whether the underlying backend plugin is installed and active.
    fn is_available(&self) -> bool;

    /// All published events overlapping the given range. The range is
    /// inclusive of `end`'s whole calendar day. `category` is an optional
    /// slug expression; comma-separated slugs are OR-ed.
    fn list_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        category: Option<&str>,
    ) -> EvSyncResult<Vec<Event>>;

    /// Look up one event by uid. Trashed records are never surfaced.
    fn get_event(&self, uid: &str) -> EvSyncResult<Option<Event>>;

    /// Create or update the backend record for `event`, keyed by its uid.
    fn save_event(&self, event: &Event) -> SaveResult;

    /// Delete by uid. An unknown uid is a silent no-op.
    fn delete_event(&self, uid: &str) -> EvSyncResult<()>;

    /// Register a listener for logical saves. One listener call per
    /// `save_event`, however many native writes that took.
    fn subscribe_saved(&self, listener: SavedListener);

    /// Register a listener for deletions.
    fn subscribe_deleted(&self, listener: DeletedListener);
}
