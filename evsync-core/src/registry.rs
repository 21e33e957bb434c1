//! Feed registry.
//!
//! Built explicitly once at startup with the adapters the host compiled
//! in, then passed to consumers. There is no global instance and no
//! lookup-by-constructed-type-name; hosts hand the registry the concrete
//! adapters they want.

use std::rc::Rc;

use crate::error::{EvSyncError, EvSyncResult};
use crate::feed::CalendarFeed;

pub struct FeedRegistry {
    feeds: Vec<Rc<dyn CalendarFeed>>,
}

impl FeedRegistry {
    pub fn new(feeds: Vec<Rc<dyn CalendarFeed>>) -> Self {
        FeedRegistry { feeds }
    }

    /// The currently available adapters, in registration order.
    pub fn feeds(&self) -> impl Iterator<Item = &Rc<dyn CalendarFeed>> {
        self.feeds.iter().filter(|feed| feed.is_available())
    }

    /// Look up an available adapter by identifier.
    pub fn feed(&self, identifier: &str) -> EvSyncResult<Rc<dyn CalendarFeed>> {
        self.feeds()
            .find(|feed| feed.identifier() == identifier)
            .cloned()
            .ok_or_else(|| EvSyncError::FeedNotFound(identifier.to_string()))
    }
}
