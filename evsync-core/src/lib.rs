//! Shared types for the evsync ecosystem.
//!
//! This crate provides the canonical, backend-agnostic event model and the
//! contracts shared between hosts and backend adapters:
//! - `Event`, `Location`, `Category`, `Tag` for calendar data
//! - `SaveResult` for write outcomes
//! - the `CalendarFeed` trait every adapter implements
//! - the `FeedRegistry` hosts use to reach the active adapters

pub mod error;
pub mod event;
pub mod feed;
pub mod location;
pub mod registry;
pub mod save_result;
pub mod term;

pub use error::{EvSyncError, EvSyncResult};
pub use event::{Contact, Event};
pub use feed::{CalendarFeed, DeletedListener, SavedListener};
pub use location::Location;
pub use registry::FeedRegistry;
pub use save_result::SaveResult;
pub use term::{Category, Tag};
