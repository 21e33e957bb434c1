//! Write reconciliation: canonical events into backend-native records.
//!
//! An upsert is a fixed sequence of native writes that the backend does
//! not wrap in a transaction. The primary event record is persisted first
//! so the related records have an id to bind to; everything after that is
//! fail-forward: a failing sub-step stops the sequence but leaves the
//! already-committed writes in place, and the result carries the partial
//! ids so the caller can retry the enrichment.

use tracing::warn;

use evsync_core::{Category, Contact, EvSyncError, EvSyncResult, Event, Location, SaveResult, Tag};

use crate::backend::{
    Backend, ContentPatch, EventRecord, Lifecycle, LocationRecord, TermNamespace,
    META_CONTACT_EMAIL, META_CONTACT_NAME, META_CONTACT_PHONE, META_CONTACT_WEBSITE,
};
use crate::identity::{non_empty, IdentityResolver};
use crate::notify::{NotificationBroker, NotifyKind};

/// The upsert engine for one backend.
pub struct WriteReconciler<'a, B: Backend> {
    backend: &'a B,
    broker: &'a NotificationBroker,
}

impl<'a, B: Backend> WriteReconciler<'a, B> {
    pub fn new(backend: &'a B, broker: &'a NotificationBroker) -> Self {
        WriteReconciler { backend, broker }
    }

    /// Create or update the backend records for `event`, keyed by its uid.
    ///
    /// Native save signals are suppressed for the whole write; exactly one
    /// `saved` notification fires afterwards whenever the primary record
    /// made it to the store, even if a later sub-step failed.
    pub fn save(&self, event: &Event) -> SaveResult {
        let mut result = SaveResult::new();
        {
            let _window = self.broker.suppress();
            if let Err(err) = self.save_steps(event, &mut result) {
                result.set_error(err.to_string());
            }
        }
        if let Some(event_id) = result.event_id() {
            self.broker.fire(NotifyKind::Saved, event_id);
        }
        result
    }

    /// Delete by uid. An unknown uid is a silent no-op; a hit removes the
    /// record (to the trash, or permanently per configuration) and fires
    /// one `deleted` notification with the backend-native id.
    pub fn delete(&self, uid: &str) -> EvSyncResult<()> {
        let resolver = IdentityResolver::new(self.backend);
        let Some(record) = resolver.find_event(uid)? else {
            return Ok(());
        };
        let Some(event_id) = record.event_id else {
            return Ok(());
        };

        {
            let _window = self.broker.suppress();
            self.backend
                .events()
                .delete(event_id, self.backend.settings().delete_permanently)?;
        }
        self.broker.fire(NotifyKind::Deleted, event_id);
        Ok(())
    }

    fn save_steps(&self, event: &Event, result: &mut SaveResult) -> EvSyncResult<()> {
        event.validate()?;

        let settings = self.backend.settings();
        let caps = &settings.capabilities;
        let resolver = IdentityResolver::new(self.backend);

        let existing = resolver.find_event(&event.uid)?;
        let is_new = existing.is_none();

        if !self.backend.auth().can_manage(
            &caps.edit_events,
            &caps.edit_others_events,
            event.owner_user_id,
        ) {
            return Err(EvSyncError::PermissionDenied(
                "the acting user may not save events".into(),
            ));
        }

        let status = match &existing {
            // A republish never silently changes moderation state.
            Some(record) => record.status,
            None => {
                if self.backend.auth().can_manage(
                    &caps.publish_events,
                    &caps.publish_events,
                    event.owner_user_id,
                ) {
                    Lifecycle::Published
                } else {
                    Lifecycle::Pending
                }
            }
        };

        let mut record = existing.unwrap_or_else(|| {
            let tenant_id = event
                .tenant_id
                .unwrap_or_else(|| self.backend.tenants().current());
            EventRecord::new(&event.uid, tenant_id)
        });
        record.status = status;
        record.title = event.title.clone();
        record.body = event.description.clone().unwrap_or_default();
        record.excerpt = event.excerpt.clone().unwrap_or_default();
        record.all_day = event.all_day;
        if event.owner_user_id.is_some() {
            record.owner_id = event.owner_user_id;
        }
        if let Some(cost) = &event.cost {
            record.cost = cost.clone();
        }
        // The backend keeps date and time-of-day in separate fields; both
        // derive from the canonical instants so they stay consistent.
        record.start_date = event.start.date_naive();
        record.start_time = event.start.time();
        record.end_date = event.end.date_naive();
        record.end_time = event.end.time();

        // Persist before the related records so they have an id to bind
        // to, and report the ids immediately: later steps may still fail
        // and the caller must be able to find the partially-written event.
        let mut record = self.backend.events().save(record)?;
        let event_id = record
            .event_id
            .ok_or_else(|| EvSyncError::Backend("event store returned no event id".into()))?;
        let content_id = record
            .content_id
            .ok_or_else(|| EvSyncError::Backend("event store returned no content id".into()))?;
        result.set_event_id(event_id);
        result.set_content_id(content_id);

        // The native save rewrites the slug through its own uniqueness
        // logic; write the uid back or the next sync loses its key.
        self.backend.contents().update(
            content_id,
            ContentPatch {
                slug: Some(event.uid.clone()),
                ..ContentPatch::default()
            },
        )?;
        record.slug = event.uid.clone();

        if settings.locations_enabled {
            if let Some(location) = event.location.as_ref().filter(|l| !l.is_empty()) {
                let saved = self.save_location(location, event.owner_user_id, &resolver)?;
                record.location_id = saved.location_id;
            }
        }

        if settings.categories_enabled && !event.categories.is_empty() {
            record.category_term_ids =
                self.resolve_categories(&event.categories, event.owner_user_id)?;
        }

        if settings.tags_enabled && !event.tags.is_empty() {
            record.tag_term_ids = self.resolve_tags(&event.tags)?;
        }

        // Final persist with the location and term links attached.
        self.backend.events().save(record)?;

        // The primary save does not know the final author yet; backfill
        // ownership on create.
        if is_new {
            if let Some(owner) = event.owner_user_id {
                self.backend.contents().update(
                    content_id,
                    ContentPatch {
                        author_id: Some(owner),
                        ..ContentPatch::default()
                    },
                )?;
            }
        }

        self.write_contact(content_id, &event.contact)?;
        Ok(())
    }

    /// Reuse a fuzzy-matched backend location or create a new one.
    ///
    /// On a match, only the fields the candidate actually carries are
    /// overlaid; an absent incoming field never blanks out stored data.
    fn save_location(
        &self,
        candidate: &Location,
        owner: Option<i64>,
        resolver: &IdentityResolver<'a, B>,
    ) -> EvSyncResult<LocationRecord> {
        let caps = &self.backend.settings().capabilities;

        let (record, is_new) = match resolver.find_location(candidate)? {
            Some(mut existing) => {
                overlay(&mut existing, candidate);
                (existing, false)
            }
            None => (new_location_record(candidate, owner), true),
        };

        if !self
            .backend
            .auth()
            .can_manage(&caps.publish_locations, &caps.publish_locations, owner)
        {
            return Err(EvSyncError::PermissionDenied(
                "the acting user may not publish locations".into(),
            ));
        }

        let saved = self
            .backend
            .locations()
            .save(record)
            .map_err(|err| EvSyncError::Backend(format!("failed to save location: {err}")))?;

        if is_new {
            if let (Some(owner), Some(content_id)) = (owner, saved.content_id) {
                self.backend.contents().update(
                    content_id,
                    ContentPatch {
                        author_id: Some(owner),
                        ..ContentPatch::default()
                    },
                )?;
            }
        }
        Ok(saved)
    }

    /// Resolve category slugs to term ids, creating missing terms when the
    /// actor holds the category capability. A denied term is skipped, not
    /// an error.
    fn resolve_categories(
        &self,
        categories: &[Category],
        owner: Option<i64>,
    ) -> EvSyncResult<Vec<i64>> {
        let caps = &self.backend.settings().capabilities;
        let mut term_ids = Vec::new();
        for category in categories {
            match self
                .backend
                .terms()
                .find(&category.slug, TermNamespace::Category)?
            {
                Some(term) => term_ids.push(term.term_id),
                None => {
                    if self.backend.auth().can_manage(
                        &caps.manage_categories,
                        &caps.manage_categories,
                        owner,
                    ) {
                        let term = self.backend.terms().create(
                            &category.name,
                            &category.slug,
                            TermNamespace::Category,
                        )?;
                        term_ids.push(term.term_id);
                    } else {
                        warn!(slug = %category.slug, "skipping category term the actor may not create");
                    }
                }
            }
        }
        Ok(term_ids)
    }

    /// Resolve tag slugs to term ids. Tag creation is unconditional.
    fn resolve_tags(&self, tags: &[Tag]) -> EvSyncResult<Vec<i64>> {
        let mut term_ids = Vec::new();
        for tag in tags {
            let term = match self.backend.terms().find(&tag.slug, TermNamespace::Tag)? {
                Some(term) => term,
                None => self
                    .backend
                    .terms()
                    .create(&tag.name, &tag.slug, TermNamespace::Tag)?,
            };
            term_ids.push(term.term_id);
        }
        Ok(term_ids)
    }

    /// Persist the contact block as record metadata, non-empty fields only.
    fn write_contact(&self, content_id: i64, contact: &Contact) -> EvSyncResult<()> {
        let meta = self.backend.meta();
        let fields = [
            (META_CONTACT_NAME, &contact.name),
            (META_CONTACT_EMAIL, &contact.email),
            (META_CONTACT_PHONE, &contact.phone),
            (META_CONTACT_WEBSITE, &contact.website),
        ];
        for (key, value) in fields {
            if let Some(value) = non_empty(value) {
                meta.set(content_id, key, &value)?;
            }
        }
        Ok(())
    }
}

/// Overlay the non-empty candidate fields onto an existing native record.
fn overlay(existing: &mut LocationRecord, candidate: &Location) {
    let fields = [
        (&candidate.name, &mut existing.name),
        (&candidate.address, &mut existing.address),
        (&candidate.city, &mut existing.city),
        (&candidate.state, &mut existing.state),
        (&candidate.postcode, &mut existing.postcode),
        (&candidate.country, &mut existing.country),
    ];
    for (incoming, stored) in fields {
        if let Some(value) = non_empty(incoming) {
            *stored = value;
        }
    }
    if candidate.latitude.is_some() {
        existing.latitude = candidate.latitude;
    }
    if candidate.longitude.is_some() {
        existing.longitude = candidate.longitude;
    }
}

fn new_location_record(candidate: &Location, owner: Option<i64>) -> LocationRecord {
    LocationRecord {
        location_id: None,
        content_id: None,
        name: candidate.name.clone().unwrap_or_default(),
        address: candidate.address.clone().unwrap_or_default(),
        city: candidate.city.clone().unwrap_or_default(),
        state: candidate.state.clone().unwrap_or_default(),
        postcode: candidate.postcode.clone().unwrap_or_default(),
        country: candidate.country.clone().unwrap_or_default(),
        latitude: candidate.latitude,
        longitude: candidate.longitude,
        owner_id: owner,
        status: Lifecycle::Published,
    }
}
