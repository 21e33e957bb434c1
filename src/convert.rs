//! Read-side conversion: backend-native records into canonical events.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use evsync_core::{Category, Contact, EvSyncResult, Event, Location, Tag};

use crate::backend::{
    Backend, EventRecord, Lifecycle, LocationRecord, RangeQuery, TenantGuard, TermNamespace,
    META_CONTACT_EMAIL, META_CONTACT_NAME, META_CONTACT_PHONE, META_CONTACT_WEBSITE,
};

/// Maps native event records into canonical events.
pub struct ReadConverter<'a, B: Backend> {
    backend: &'a B,
}

impl<'a, B: Backend> ReadConverter<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        ReadConverter { backend }
    }

    /// Convert one native event row.
    ///
    /// Returns `None` when the record is trashed or its content record is
    /// gone (deleted underneath the event); neither is surfaced to the
    /// host. Side-effect-free apart from a scoped tenant switch for
    /// records owned by another tenant.
    pub fn convert(&self, record: &EventRecord) -> EvSyncResult<Option<Event>> {
        if record.status == Lifecycle::Trashed {
            return Ok(None);
        }
        let (Some(event_id), Some(content_id)) = (record.event_id, record.content_id) else {
            warn!(slug = %record.slug, "skipping event record without assigned ids");
            return Ok(None);
        };

        // Content and permalink live in the owning tenant's storage. The
        // guard restores the original tenant even when the fetch fails.
        let content = if record.tenant_id != self.backend.tenants().current() {
            let _guard = TenantGuard::switch(self.backend.tenants(), record.tenant_id);
            self.backend.contents().get(content_id)?
        } else {
            self.backend.contents().get(content_id)?
        };
        let Some(content) = content else {
            warn!(slug = %record.slug, content_id, "event content record is missing");
            return Ok(None);
        };

        let mut event = Event::new(&record.slug, &record.title, record.start(), record.end());
        event.event_id = Some(event_id);
        event.tenant_id = Some(record.tenant_id);
        event.all_day = record.all_day;
        event.description = non_blank(&record.body);
        event.excerpt = non_blank(&record.excerpt);
        event.link = non_blank(&content.permalink);
        event.published = Some(content.published);
        event.updated = Some(content.modified);
        event.owner_user_id = content.author_id.or(record.owner_id);
        event.image_url = non_blank(&content.image_url);
        event.cost = self.convert_cost(record);
        event.contact = self.read_contact(content_id)?;
        event.categories = self.read_categories(&record.category_term_ids)?;
        event.tags = self.read_tags(&record.tag_term_ids)?;
        event.location = self.read_location(record)?;

        Ok(Some(event))
    }

    /// All published events overlapping the range, oldest first as the
    /// store returns them. The window covers `end`'s whole calendar day:
    /// listings follow calendar-day semantics, not instant semantics.
    pub fn list(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        category: Option<&str>,
    ) -> EvSyncResult<Vec<Event>> {
        let query = RangeQuery {
            start_day: start.date_naive(),
            end_day_exclusive: end.date_naive() + Duration::days(1),
            category_slugs: split_category_filter(category),
            status: Lifecycle::Published,
        };

        let mut events = Vec::new();
        for record in self.backend.events().find_in_range(&query)? {
            match self.convert(&record)? {
                Some(event) => events.push(event),
                None => debug!(slug = %record.slug, "filtered unreadable event from listing"),
            }
        }
        Ok(events)
    }

    fn convert_cost(&self, record: &EventRecord) -> Option<String> {
        // A free event without a booking requirement reads as "FREE";
        // otherwise the stored cost text passes through.
        if record.free && !record.rsvp {
            Some("FREE".to_string())
        } else {
            non_blank(&record.cost)
        }
    }

    fn read_contact(&self, content_id: i64) -> EvSyncResult<Contact> {
        let meta = self.backend.meta();
        Ok(Contact {
            name: meta.get(content_id, META_CONTACT_NAME)?,
            email: meta.get(content_id, META_CONTACT_EMAIL)?,
            phone: meta.get(content_id, META_CONTACT_PHONE)?,
            website: meta.get(content_id, META_CONTACT_WEBSITE)?,
        })
    }

    fn read_categories(&self, term_ids: &[i64]) -> EvSyncResult<Vec<Category>> {
        let mut categories = Vec::new();
        for &term_id in term_ids {
            if let Some(term) = self.backend.terms().get(term_id, TermNamespace::Category)? {
                categories.push(Category::new(term.name, term.slug));
            }
        }
        Ok(categories)
    }

    fn read_tags(&self, term_ids: &[i64]) -> EvSyncResult<Vec<Tag>> {
        let mut tags = Vec::new();
        for &term_id in term_ids {
            if let Some(term) = self.backend.terms().get(term_id, TermNamespace::Tag)? {
                tags.push(Tag::new(term.name, term.slug));
            }
        }
        Ok(tags)
    }

    fn read_location(&self, record: &EventRecord) -> EvSyncResult<Option<Location>> {
        let Some(location_id) = record.location_id else {
            return Ok(None);
        };
        let Some(native) = self.backend.locations().get(location_id)? else {
            return Ok(None);
        };
        let location = canonical_location(&native);
        // An all-fields-empty location is no location, not an empty one.
        if location.is_empty() {
            Ok(None)
        } else {
            Ok(Some(location))
        }
    }
}

fn canonical_location(native: &LocationRecord) -> Location {
    Location {
        name: non_blank(&native.name),
        address: non_blank(&native.address),
        city: non_blank(&native.city),
        state: non_blank(&native.state),
        postcode: non_blank(&native.postcode),
        country: non_blank(&native.country),
        latitude: native.latitude,
        longitude: native.longitude,
    }
}

/// Comma-separated category slugs are OR-ed; blanks are dropped.
fn split_category_filter(category: Option<&str>) -> Vec<String> {
    category
        .map(|expr| {
            expr.split(',')
                .map(str::trim)
                .filter(|slug| !slug.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Native records use the empty string for blank fields; the canonical
/// model uses explicit absence.
fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
