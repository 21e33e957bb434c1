//! Backend collaborator contracts.
//!
//! The engine treats the host platform as a set of black boxes: a record
//! store for events, a location store, a taxonomy term store, an
//! authorization check, a tenant switch, per-record key-value metadata,
//! and the backend's own save/delete signals. A backend adapter supplies
//! these for one specific calendar plugin; the engine never talks to
//! storage directly.
//!
//! All calls are blocking and single-threaded (one read or save completes
//! before the next begins). Native record shapes are loosely typed on
//! purpose: empty strings are how the backends themselves represent blank
//! fields, and the converter maps them to `Option` at the canonical
//! boundary.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use evsync_core::EvSyncResult;

/// Backend lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    Draft,
    Pending,
    Published,
    Trashed,
}

impl Lifecycle {
    /// States a uid lookup may match. Trashed records are invisible to
    /// identity resolution.
    pub const LIVE: [Lifecycle; 3] = [Lifecycle::Draft, Lifecycle::Pending, Lifecycle::Published];
}

/// Backend-native event row.
///
/// Date and time-of-day are stored as two independent fields that must
/// stay consistent with the combined instant; the reconciler derives both
/// from the canonical timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Assigned by the store on first save.
    pub event_id: Option<i64>,
    /// Id of the companion content record, assigned alongside `event_id`.
    pub content_id: Option<i64>,
    pub tenant_id: i64,
    /// Native slug; the reconciler keeps this equal to the canonical uid.
    pub slug: String,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    pub end_time: NaiveTime,
    pub all_day: bool,
    pub status: Lifecycle,
    pub owner_id: Option<i64>,
    pub location_id: Option<i64>,
    pub category_term_ids: Vec<i64>,
    pub tag_term_ids: Vec<i64>,
    pub cost: String,
    /// Whether the backend considers the event free of charge.
    pub free: bool,
    /// Whether the backend requires a booking/RSVP.
    pub rsvp: bool,
}

impl EventRecord {
    /// A fresh, unsaved record for `slug` in `tenant_id`.
    pub fn new(slug: impl Into<String>, tenant_id: i64) -> Self {
        EventRecord {
            event_id: None,
            content_id: None,
            tenant_id,
            slug: slug.into(),
            title: String::new(),
            body: String::new(),
            excerpt: String::new(),
            start_date: NaiveDate::MIN,
            start_time: NaiveTime::MIN,
            end_date: NaiveDate::MIN,
            end_time: NaiveTime::MIN,
            all_day: false,
            status: Lifecycle::Pending,
            owner_id: None,
            location_id: None,
            category_term_ids: Vec::new(),
            tag_term_ids: Vec::new(),
            cost: String::new(),
            free: false,
            rsvp: false,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start_date.and_time(self.start_time).and_utc()
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end_date.and_time(self.end_time).and_utc()
    }
}

/// Backend-native content record backing an event or location.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    pub content_id: i64,
    pub permalink: String,
    pub author_id: Option<i64>,
    pub published: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub image_url: String,
    pub status: Lifecycle,
}

/// Typed field map for partial content updates.
#[derive(Debug, Clone, Default)]
pub struct ContentPatch {
    pub slug: Option<String>,
    pub author_id: Option<i64>,
}

/// Backend-native location record.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub location_id: Option<i64>,
    pub content_id: Option<i64>,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub owner_id: Option<i64>,
    pub status: Lifecycle,
}

/// Backend-native taxonomy term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRecord {
    pub term_id: i64,
    pub name: String,
    pub slug: String,
}

/// Taxonomy namespace a term lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermNamespace {
    Category,
    Tag,
}

/// Range query for listings.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    pub start_day: NaiveDate,
    /// Exclusive upper bound; the caller extends the requested end date by
    /// one day so the whole final calendar day is covered.
    pub end_day_exclusive: NaiveDate,
    /// OR-ed category slugs; empty means no category filter.
    pub category_slugs: Vec<String>,
    pub status: Lifecycle,
}

/// Field filter for location lookup. Absent fields are omitted from the
/// query, not treated as wildcards.
#[derive(Debug, Clone, Default)]
pub struct LocationFilter {
    pub name: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
}

impl LocationFilter {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.postcode.is_none()
            && self.country.is_none()
    }
}

/// Event record storage.
pub trait EventStore {
    /// Records whose slug equals `slug` in any of `states`, newest first.
    fn find_by_slug(&self, slug: &str, states: &[Lifecycle]) -> EvSyncResult<Vec<EventRecord>>;

    /// Records overlapping the query window, filtered by status and
    /// category slugs.
    fn find_in_range(&self, query: &RangeQuery) -> EvSyncResult<Vec<EventRecord>>;

    /// Persist and return the record with ids assigned. The backend may
    /// rewrite the slug as a side effect of its own uniqueness logic; the
    /// reconciler re-applies the uid afterwards.
    fn save(&self, record: EventRecord) -> EvSyncResult<EventRecord>;

    /// Remove the record, to the trash or permanently.
    fn delete(&self, event_id: i64, permanently: bool) -> EvSyncResult<()>;
}

/// Content record storage, shared by events and locations.
pub trait ContentStore {
    fn get(&self, content_id: i64) -> EvSyncResult<Option<ContentRecord>>;

    /// Apply the non-absent fields of `patch` to the content record.
    fn update(&self, content_id: i64, patch: ContentPatch) -> EvSyncResult<()>;
}

/// Location record storage.
pub trait LocationStore {
    /// Records matching every field present in `filter`.
    fn find(&self, filter: &LocationFilter) -> EvSyncResult<Vec<LocationRecord>>;

    /// Free-text search over composed location addresses.
    fn search(&self, text: &str) -> EvSyncResult<Vec<LocationRecord>>;

    fn get(&self, location_id: i64) -> EvSyncResult<Option<LocationRecord>>;

    fn save(&self, record: LocationRecord) -> EvSyncResult<LocationRecord>;
}

/// Taxonomy term storage.
pub trait TermStore {
    fn find(&self, slug: &str, namespace: TermNamespace) -> EvSyncResult<Option<TermRecord>>;

    fn create(
        &self,
        name: &str,
        slug: &str,
        namespace: TermNamespace,
    ) -> EvSyncResult<TermRecord>;

    fn get(&self, term_id: i64, namespace: TermNamespace) -> EvSyncResult<Option<TermRecord>>;
}

/// Capability check supplied by the host platform.
pub trait Authorizer {
    /// Capability names are backend-defined opaque strings; `cap_self`
    /// covers the acting user's own records, `cap_others` other users'.
    fn can_manage(&self, cap_self: &str, cap_others: &str, acting_user: Option<i64>) -> bool;
}

/// Tenant switching on multi-tenant hosts.
///
/// A leaked switch corrupts unrelated reads in the same process; use
/// [`TenantGuard`] rather than calling `switch`/`restore` directly.
pub trait TenantContext {
    fn current(&self) -> i64;
    fn switch(&self, tenant_id: i64);
    fn restore(&self);
}

/// Scoped tenant switch; restores the previous tenant on every exit path.
pub struct TenantGuard<'a> {
    context: &'a dyn TenantContext,
}

impl<'a> TenantGuard<'a> {
    pub fn switch(context: &'a dyn TenantContext, tenant_id: i64) -> Self {
        context.switch(tenant_id);
        TenantGuard { context }
    }
}

impl Drop for TenantGuard<'_> {
    fn drop(&mut self) {
        self.context.restore();
    }
}

/// Per-record key-value metadata.
pub trait RecordMeta {
    fn get(&self, content_id: i64, key: &str) -> EvSyncResult<Option<String>>;
    fn set(&self, content_id: i64, key: &str, value: &str) -> EvSyncResult<()>;
}

/// Metadata keys for the contact block on an event's content record.
pub const META_CONTACT_NAME: &str = "contact_name";
pub const META_CONTACT_EMAIL: &str = "contact_email";
pub const META_CONTACT_PHONE: &str = "contact_phone";
pub const META_CONTACT_WEBSITE: &str = "contact_website";

/// Callback invoked with a backend-native event id.
pub type NativeListener = Box<dyn Fn(i64)>;

/// The backend's own publish/subscribe primitive. The backend raises
/// `saved` once per internal save call, so one logical upsert produces
/// several signals; the notification broker filters them.
pub trait NativeSignals {
    fn on_saved(&self, listener: NativeListener);
    fn on_deleted(&self, listener: NativeListener);
}

/// Capability strings consulted through [`Authorizer::can_manage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityNames {
    pub edit_events: String,
    pub edit_others_events: String,
    pub publish_events: String,
    pub publish_locations: String,
    pub manage_categories: String,
}

impl Default for CapabilityNames {
    fn default() -> Self {
        CapabilityNames {
            edit_events: "edit_events".into(),
            edit_others_events: "edit_other_events".into(),
            publish_events: "publish_events".into(),
            publish_locations: "publish_locations".into(),
            manage_categories: "edit_event_categories".into(),
        }
    }
}

/// Per-adapter configuration: identity, feature switches and capability
/// names, as stored in the backend's option storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    pub identifier: String,
    pub description: String,
    /// Whether the backend plugin is installed and active.
    pub available: bool,
    pub locations_enabled: bool,
    pub categories_enabled: bool,
    pub tags_enabled: bool,
    /// Bypass the trash on delete.
    pub delete_permanently: bool,
    pub capabilities: CapabilityNames,
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            identifier: "events-manager".into(),
            description: "Events Manager".into(),
            available: true,
            locations_enabled: true,
            categories_enabled: true,
            tags_enabled: true,
            delete_permanently: false,
            capabilities: CapabilityNames::default(),
        }
    }
}

/// One concrete backend: the full set of collaborators the engine needs.
pub trait Backend {
    fn events(&self) -> &dyn EventStore;
    fn contents(&self) -> &dyn ContentStore;
    fn locations(&self) -> &dyn LocationStore;
    fn terms(&self) -> &dyn TermStore;
    fn auth(&self) -> &dyn Authorizer;
    fn tenants(&self) -> &dyn TenantContext;
    fn meta(&self) -> &dyn RecordMeta;
    fn signals(&self) -> &dyn NativeSignals;
    fn settings(&self) -> &BackendSettings;
}
