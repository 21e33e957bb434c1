//! Identity resolution: canonical keys to backend-native records.

use evsync_core::{EvSyncResult, Location};

use crate::backend::{Backend, EventRecord, Lifecycle, LocationFilter, LocationRecord};

/// Locates backend records for canonical identities.
pub struct IdentityResolver<'a, B: Backend> {
    backend: &'a B,
}

impl<'a, B: Backend> IdentityResolver<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        IdentityResolver { backend }
    }

    /// Find the backend event whose native slug equals `uid`.
    ///
    /// Only live (draft/pending/published) records match; the store orders
    /// newest first, and when duplicates exist the newest wins.
    pub fn find_event(&self, uid: &str) -> EvSyncResult<Option<EventRecord>> {
        let mut matches = self.backend.events().find_by_slug(uid, &Lifecycle::LIVE)?;
        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(matches.remove(0)))
    }

    /// Fuzzy-match `candidate` against the backend's existing locations.
    ///
    /// The first pass filters on whichever of name, address, postcode and
    /// country the candidate carries. Names are entered inconsistently
    /// across sources, so a miss falls back to a free-text search over the
    /// composed address, which catches re-typed variants. A miss on both
    /// passes means a new location, even if a near-duplicate exists;
    /// dedup here is best-effort, not exact.
    pub fn find_location(&self, candidate: &Location) -> EvSyncResult<Option<LocationRecord>> {
        let filter = LocationFilter {
            name: non_empty(&candidate.name),
            address: non_empty(&candidate.address),
            postcode: non_empty(&candidate.postcode),
            country: non_empty(&candidate.country),
        };

        if !filter.is_empty() {
            let mut hits = self.backend.locations().find(&filter)?;
            if !hits.is_empty() {
                return Ok(Some(hits.remove(0)));
            }
        }

        let address = candidate.full_address();
        if address.is_empty() {
            return Ok(None);
        }
        let mut hits = self.backend.locations().search(&address)?;
        if hits.is_empty() {
            Ok(None)
        } else {
            Ok(Some(hits.remove(0)))
        }
    }
}

/// A present-but-blank field counts as absent when building filters.
pub(crate) fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
