//! A complete backend adapter behind the host-facing `CalendarFeed`
//! contract: identity resolution, conversion, reconciliation and
//! notifications composed over one [`Backend`].

use std::rc::Rc;

use chrono::{DateTime, Utc};

use evsync_core::{CalendarFeed, DeletedListener, EvSyncResult, Event, SavedListener, SaveResult};

use crate::backend::Backend;
use crate::convert::ReadConverter;
use crate::identity::IdentityResolver;
use crate::notify::{NotificationBroker, NotifyKind};
use crate::reconcile::WriteReconciler;

pub struct EventsFeed<B: Backend> {
    backend: B,
    broker: Rc<NotificationBroker>,
}

impl<B: Backend> EventsFeed<B> {
    pub fn new(backend: B) -> Self {
        EventsFeed {
            backend,
            broker: Rc::new(NotificationBroker::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn wire_native_hook(&self, kind: NotifyKind) {
        // The backend hook is registered at most once per kind, however
        // often subscribe is called; the broker's suppression window
        // filters the per-step repeats during a reconciler write.
        if !self.broker.mark_hook_wired(kind) {
            return;
        }
        let broker = Rc::clone(&self.broker);
        match kind {
            NotifyKind::Saved => self
                .backend
                .signals()
                .on_saved(Box::new(move |id| broker.fire(NotifyKind::Saved, id))),
            NotifyKind::Deleted => self
                .backend
                .signals()
                .on_deleted(Box::new(move |id| broker.fire(NotifyKind::Deleted, id))),
        }
    }
}

impl<B: Backend> CalendarFeed for EventsFeed<B> {
    fn identifier(&self) -> &str {
        &self.backend.settings().identifier
    }

    fn description(&self) -> &str {
        &self.backend.settings().description
    }

    fn is_available(&self) -> bool {
        self.backend.settings().available
    }

    fn list_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        category: Option<&str>,
    ) -> EvSyncResult<Vec<Event>> {
        ReadConverter::new(&self.backend).list(start, end, category)
    }

    fn get_event(&self, uid: &str) -> EvSyncResult<Option<Event>> {
        let Some(record) = IdentityResolver::new(&self.backend).find_event(uid)? else {
            return Ok(None);
        };
        ReadConverter::new(&self.backend).convert(&record)
    }

    fn save_event(&self, event: &Event) -> SaveResult {
        WriteReconciler::new(&self.backend, &self.broker).save(event)
    }

    fn delete_event(&self, uid: &str) -> EvSyncResult<()> {
        WriteReconciler::new(&self.backend, &self.broker).delete(uid)
    }

    fn subscribe_saved(&self, listener: SavedListener) {
        self.broker.subscribe(NotifyKind::Saved, listener);
        self.wire_native_hook(NotifyKind::Saved);
    }

    fn subscribe_deleted(&self, listener: DeletedListener) {
        self.broker.subscribe(NotifyKind::Deleted, listener);
        self.wire_native_hook(NotifyKind::Deleted);
    }
}
