//! In-memory backend used by the engine tests.
//!
//! Mimics the awkward parts of a real calendar backend on purpose: the
//! event store regenerates the slug from the title on create (so the
//! reconciler's slug re-application is exercised), every native save
//! raises the internal `saved` signal, and soft deletes move records to
//! the trash instead of removing them.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use evsync_core::{EvSyncError, EvSyncResult};

use crate::backend::{
    Authorizer, Backend, BackendSettings, ContentPatch, ContentRecord, ContentStore, EventRecord,
    EventStore, Lifecycle, LocationFilter, LocationRecord, LocationStore, NativeListener,
    NativeSignals, RangeQuery, RecordMeta, TenantContext, TermNamespace, TermRecord, TermStore,
};

pub fn instant(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap()
        .and_utc()
}

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// The backend's own pub/sub hub; native saves and deletes emit here.
#[derive(Default)]
pub struct SignalHub {
    saved: RefCell<Vec<NativeListener>>,
    deleted: RefCell<Vec<NativeListener>>,
    pub saved_emits: Cell<u32>,
}

impl SignalHub {
    fn emit_saved(&self, id: i64) {
        self.saved_emits.set(self.saved_emits.get() + 1);
        for listener in self.saved.borrow().iter() {
            listener(id);
        }
    }

    fn emit_deleted(&self, id: i64) {
        for listener in self.deleted.borrow().iter() {
            listener(id);
        }
    }

    pub fn saved_listener_count(&self) -> usize {
        self.saved.borrow().len()
    }
}

impl NativeSignals for SignalHub {
    fn on_saved(&self, listener: NativeListener) {
        self.saved.borrow_mut().push(listener);
    }

    fn on_deleted(&self, listener: NativeListener) {
        self.deleted.borrow_mut().push(listener);
    }
}

#[derive(Default)]
struct Tables {
    events: RefCell<Vec<EventRecord>>,
    contents: RefCell<HashMap<i64, ContentRecord>>,
    locations: RefCell<Vec<LocationRecord>>,
    terms: RefCell<Vec<(TermNamespace, TermRecord)>>,
    meta: RefCell<HashMap<(i64, String), String>>,
    next_id: Cell<i64>,
}

impl Tables {
    fn assign_id(&self) -> i64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

pub struct MemoryEventStore {
    tables: Rc<Tables>,
    signals: Rc<SignalHub>,
    fail_next_save: Cell<bool>,
}

impl EventStore for MemoryEventStore {
    fn find_by_slug(&self, slug: &str, states: &[Lifecycle]) -> EvSyncResult<Vec<EventRecord>> {
        let mut matches: Vec<EventRecord> = self
            .tables
            .events
            .borrow()
            .iter()
            .filter(|e| e.slug == slug && states.contains(&e.status))
            .cloned()
            .collect();
        // Newest first, like the backend's own queries.
        matches.sort_by(|a, b| b.event_id.cmp(&a.event_id));
        Ok(matches)
    }

    fn find_in_range(&self, query: &RangeQuery) -> EvSyncResult<Vec<EventRecord>> {
        let term_ids: Vec<i64> = self
            .tables
            .terms
            .borrow()
            .iter()
            .filter(|(ns, term)| {
                *ns == TermNamespace::Category && query.category_slugs.contains(&term.slug)
            })
            .map(|(_, term)| term.term_id)
            .collect();

        Ok(self
            .tables
            .events
            .borrow()
            .iter()
            .filter(|e| e.status == query.status)
            .filter(|e| e.start_date < query.end_day_exclusive && e.end_date >= query.start_day)
            .filter(|e| {
                query.category_slugs.is_empty()
                    || e.category_term_ids.iter().any(|id| term_ids.contains(id))
            })
            .cloned()
            .collect())
    }

    fn save(&self, mut record: EventRecord) -> EvSyncResult<EventRecord> {
        if self.fail_next_save.replace(false) {
            return Err(EvSyncError::Backend("simulated event write failure".into()));
        }

        match record.event_id {
            Some(event_id) => {
                let mut events = self.tables.events.borrow_mut();
                let slot = events
                    .iter_mut()
                    .find(|e| e.event_id == Some(event_id))
                    .ok_or_else(|| EvSyncError::Backend(format!("no event {event_id}")))?;
                *slot = record.clone();
            }
            None => {
                // Like the real backend: the slug is regenerated from the
                // title on create, clobbering whatever the caller set.
                record.event_id = Some(self.tables.assign_id());
                let content_id = self.tables.assign_id();
                record.content_id = Some(content_id);
                record.slug = slug::slugify(&record.title);
                self.tables.contents.borrow_mut().insert(
                    content_id,
                    ContentRecord {
                        content_id,
                        permalink: format!("https://example.test/events/{}", record.slug),
                        author_id: None,
                        published: Utc::now(),
                        modified: Utc::now(),
                        image_url: String::new(),
                        status: record.status,
                    },
                );
                self.tables.events.borrow_mut().push(record.clone());
            }
        }

        self.signals.emit_saved(record.event_id.unwrap_or_default());
        Ok(record)
    }

    fn delete(&self, event_id: i64, permanently: bool) -> EvSyncResult<()> {
        let mut events = self.tables.events.borrow_mut();
        if permanently {
            events.retain(|e| e.event_id != Some(event_id));
        } else if let Some(event) = events.iter_mut().find(|e| e.event_id == Some(event_id)) {
            event.status = Lifecycle::Trashed;
        }
        drop(events);
        self.signals.emit_deleted(event_id);
        Ok(())
    }
}

pub struct MemoryContentStore {
    tables: Rc<Tables>,
}

impl ContentStore for MemoryContentStore {
    fn get(&self, content_id: i64) -> EvSyncResult<Option<ContentRecord>> {
        Ok(self.tables.contents.borrow().get(&content_id).cloned())
    }

    fn update(&self, content_id: i64, patch: ContentPatch) -> EvSyncResult<()> {
        if let Some(slug) = patch.slug {
            // Content slug updates write through to the event row.
            if let Some(event) = self
                .tables
                .events
                .borrow_mut()
                .iter_mut()
                .find(|e| e.content_id == Some(content_id))
            {
                event.slug = slug;
            }
        }
        if let Some(author_id) = patch.author_id {
            let mut contents = self.tables.contents.borrow_mut();
            let content = contents
                .get_mut(&content_id)
                .ok_or_else(|| EvSyncError::Backend(format!("no content {content_id}")))?;
            content.author_id = Some(author_id);
        }
        Ok(())
    }
}

pub struct MemoryLocationStore {
    tables: Rc<Tables>,
    signals: Rc<SignalHub>,
}

fn composed_address(record: &LocationRecord) -> String {
    [
        record.name.as_str(),
        record.address.as_str(),
        record.postcode.as_str(),
        record.city.as_str(),
        record.state.as_str(),
        record.country.as_str(),
    ]
    .iter()
    .map(|part| part.trim())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

impl LocationStore for MemoryLocationStore {
    fn find(&self, filter: &LocationFilter) -> EvSyncResult<Vec<LocationRecord>> {
        Ok(self
            .tables
            .locations
            .borrow()
            .iter()
            .filter(|l| {
                filter.name.as_deref().is_none_or(|v| l.name == v)
                    && filter.address.as_deref().is_none_or(|v| l.address == v)
                    && filter.postcode.as_deref().is_none_or(|v| l.postcode == v)
                    && filter.country.as_deref().is_none_or(|v| l.country == v)
            })
            .cloned()
            .collect())
    }

    fn search(&self, text: &str) -> EvSyncResult<Vec<LocationRecord>> {
        let needle = text.to_lowercase();
        Ok(self
            .tables
            .locations
            .borrow()
            .iter()
            .filter(|l| {
                let haystack = composed_address(l).to_lowercase();
                !haystack.is_empty() && (haystack.contains(&needle) || needle.contains(&haystack))
            })
            .cloned()
            .collect())
    }

    fn get(&self, location_id: i64) -> EvSyncResult<Option<LocationRecord>> {
        Ok(self
            .tables
            .locations
            .borrow()
            .iter()
            .find(|l| l.location_id == Some(location_id))
            .cloned())
    }

    fn save(&self, mut record: LocationRecord) -> EvSyncResult<LocationRecord> {
        match record.location_id {
            Some(location_id) => {
                let mut locations = self.tables.locations.borrow_mut();
                let slot = locations
                    .iter_mut()
                    .find(|l| l.location_id == Some(location_id))
                    .ok_or_else(|| EvSyncError::Backend(format!("no location {location_id}")))?;
                *slot = record.clone();
            }
            None => {
                record.location_id = Some(self.tables.assign_id());
                let content_id = self.tables.assign_id();
                record.content_id = Some(content_id);
                self.tables.contents.borrow_mut().insert(
                    content_id,
                    ContentRecord {
                        content_id,
                        permalink: String::new(),
                        author_id: None,
                        published: Utc::now(),
                        modified: Utc::now(),
                        image_url: String::new(),
                        status: record.status,
                    },
                );
                self.tables.locations.borrow_mut().push(record.clone());
            }
        }
        self.signals.emit_saved(record.location_id.unwrap_or_default());
        Ok(record)
    }
}

pub struct MemoryTermStore {
    tables: Rc<Tables>,
}

impl TermStore for MemoryTermStore {
    fn find(&self, slug: &str, namespace: TermNamespace) -> EvSyncResult<Option<TermRecord>> {
        Ok(self
            .tables
            .terms
            .borrow()
            .iter()
            .find(|(ns, term)| *ns == namespace && term.slug == slug)
            .map(|(_, term)| term.clone()))
    }

    fn create(
        &self,
        name: &str,
        slug: &str,
        namespace: TermNamespace,
    ) -> EvSyncResult<TermRecord> {
        let term = TermRecord {
            term_id: self.tables.assign_id(),
            name: name.to_string(),
            slug: slug.to_string(),
        };
        self.tables.terms.borrow_mut().push((namespace, term.clone()));
        Ok(term)
    }

    fn get(&self, term_id: i64, namespace: TermNamespace) -> EvSyncResult<Option<TermRecord>> {
        Ok(self
            .tables
            .terms
            .borrow()
            .iter()
            .find(|(ns, term)| *ns == namespace && term.term_id == term_id)
            .map(|(_, term)| term.clone()))
    }
}

/// Grants everything except the capabilities explicitly denied.
#[derive(Default)]
pub struct MemoryAuthorizer {
    denied: RefCell<Vec<String>>,
}

impl MemoryAuthorizer {
    pub fn deny(&self, capability: &str) {
        self.denied.borrow_mut().push(capability.to_string());
    }
}

impl Authorizer for MemoryAuthorizer {
    fn can_manage(&self, cap_self: &str, _cap_others: &str, _acting_user: Option<i64>) -> bool {
        !self.denied.borrow().iter().any(|c| c == cap_self)
    }
}

pub struct MemoryTenantContext {
    active: RefCell<Vec<i64>>,
}

impl Default for MemoryTenantContext {
    fn default() -> Self {
        MemoryTenantContext {
            active: RefCell::new(vec![1]),
        }
    }
}

impl TenantContext for MemoryTenantContext {
    fn current(&self) -> i64 {
        *self.active.borrow().last().unwrap_or(&1)
    }

    fn switch(&self, tenant_id: i64) {
        self.active.borrow_mut().push(tenant_id);
    }

    fn restore(&self) {
        let mut active = self.active.borrow_mut();
        if active.len() > 1 {
            active.pop();
        }
    }
}

pub struct MemoryMeta {
    tables: Rc<Tables>,
}

impl RecordMeta for MemoryMeta {
    fn get(&self, content_id: i64, key: &str) -> EvSyncResult<Option<String>> {
        Ok(self
            .tables
            .meta
            .borrow()
            .get(&(content_id, key.to_string()))
            .cloned())
    }

    fn set(&self, content_id: i64, key: &str, value: &str) -> EvSyncResult<()> {
        self.tables
            .meta
            .borrow_mut()
            .insert((content_id, key.to_string()), value.to_string());
        Ok(())
    }
}

pub struct MemoryBackend {
    tables: Rc<Tables>,
    pub events: MemoryEventStore,
    pub contents: MemoryContentStore,
    pub locations: MemoryLocationStore,
    pub terms: MemoryTermStore,
    pub auth: MemoryAuthorizer,
    pub tenants: MemoryTenantContext,
    pub meta: MemoryMeta,
    pub signals: Rc<SignalHub>,
    pub settings: BackendSettings,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let tables = Rc::new(Tables::default());
        let signals = Rc::new(SignalHub::default());
        MemoryBackend {
            events: MemoryEventStore {
                tables: Rc::clone(&tables),
                signals: Rc::clone(&signals),
                fail_next_save: Cell::new(false),
            },
            contents: MemoryContentStore {
                tables: Rc::clone(&tables),
            },
            locations: MemoryLocationStore {
                tables: Rc::clone(&tables),
                signals: Rc::clone(&signals),
            },
            terms: MemoryTermStore {
                tables: Rc::clone(&tables),
            },
            auth: MemoryAuthorizer::default(),
            tenants: MemoryTenantContext::default(),
            meta: MemoryMeta {
                tables: Rc::clone(&tables),
            },
            signals,
            settings: BackendSettings::default(),
            tables,
        }
    }

    /// Make the next event save fail, to exercise error paths.
    pub fn fail_next_event_save(&self) {
        self.events.fail_next_save.set(true);
    }

    /// Insert a published-style event with a content record, bypassing the
    /// reconciler. Returns the event id.
    pub fn seed_event(&self, slug: &str, status: Lifecycle) -> i64 {
        let event_id = self.tables.assign_id();
        let content_id = self.tables.assign_id();
        let mut record = EventRecord::new(slug, 1);
        record.event_id = Some(event_id);
        record.content_id = Some(content_id);
        record.title = slug.replace('-', " ");
        record.status = status;
        record.start_date = day("2024-04-10");
        record.start_time = instant("2024-04-10 10:00:00").time();
        record.end_date = day("2024-04-10");
        record.end_time = instant("2024-04-10 12:00:00").time();
        self.tables.events.borrow_mut().push(record);
        self.tables.contents.borrow_mut().insert(
            content_id,
            ContentRecord {
                content_id,
                permalink: format!("https://example.test/events/{slug}"),
                author_id: None,
                published: instant("2024-03-01 09:00:00"),
                modified: instant("2024-03-02 09:00:00"),
                image_url: String::new(),
                status,
            },
        );
        event_id
    }

    pub fn seed_location(&self, name: &str, postcode: &str, address: &str) -> i64 {
        let location_id = self.tables.assign_id();
        self.tables.locations.borrow_mut().push(LocationRecord {
            location_id: Some(location_id),
            content_id: None,
            name: name.to_string(),
            address: address.to_string(),
            city: String::new(),
            state: String::new(),
            postcode: postcode.to_string(),
            country: String::new(),
            latitude: None,
            longitude: None,
            owner_id: None,
            status: Lifecycle::Published,
        });
        location_id
    }

    pub fn seed_term(&self, name: &str, slug: &str, namespace: TermNamespace) -> i64 {
        let term = TermRecord {
            term_id: self.tables.assign_id(),
            name: name.to_string(),
            slug: slug.to_string(),
        };
        let term_id = term.term_id;
        self.tables.terms.borrow_mut().push((namespace, term));
        term_id
    }

    pub fn event_record(&self, event_id: i64) -> EventRecord {
        self.tables
            .events
            .borrow()
            .iter()
            .find(|e| e.event_id == Some(event_id))
            .cloned()
            .expect("seeded event exists")
    }

    pub fn put_event_record(&self, record: EventRecord) {
        let mut events = self.tables.events.borrow_mut();
        match events.iter_mut().find(|e| e.event_id == record.event_id) {
            Some(slot) => *slot = record,
            None => events.push(record),
        }
    }

    pub fn drop_content(&self, content_id: i64) {
        self.tables.contents.borrow_mut().remove(&content_id);
    }

    pub fn event_count(&self) -> usize {
        self.tables.events.borrow().len()
    }

    pub fn location_count(&self) -> usize {
        self.tables.locations.borrow().len()
    }

    pub fn location_record(&self, location_id: i64) -> LocationRecord {
        self.tables
            .locations
            .borrow()
            .iter()
            .find(|l| l.location_id == Some(location_id))
            .cloned()
            .expect("seeded location exists")
    }
}

impl Backend for MemoryBackend {
    fn events(&self) -> &dyn EventStore {
        &self.events
    }

    fn contents(&self) -> &dyn ContentStore {
        &self.contents
    }

    fn locations(&self) -> &dyn LocationStore {
        &self.locations
    }

    fn terms(&self) -> &dyn TermStore {
        &self.terms
    }

    fn auth(&self) -> &dyn Authorizer {
        &self.auth
    }

    fn tenants(&self) -> &dyn TenantContext {
        &self.tenants
    }

    fn meta(&self) -> &dyn RecordMeta {
        &self.meta
    }

    fn signals(&self) -> &dyn NativeSignals {
        &*self.signals
    }

    fn settings(&self) -> &BackendSettings {
        &self.settings
    }
}
