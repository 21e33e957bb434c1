//! Event locations.

use serde::{Deserialize, Serialize};

/// A venue attached to an event.
///
/// Locations carry no identifier of their own: on the canonical side they
/// are identified by fuzzy matching against the backend's existing
/// locations, so repeated syncs reuse one backend record instead of piling
/// up near-duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: Option<String>,
    /// Street address ("Main St 5").
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    /// Country code ("DE", "US", ...).
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    /// An all-fields-absent location is treated as no location at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postcode.is_none()
            && self.country.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
    }

    /// Compose the free-text address used by the fuzzy-match fallback.
    pub fn full_address(&self) -> String {
        [
            self.name.as_deref(),
            self.address.as_deref(),
            self.postcode.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
            self.country.as_deref(),
        ]
        .iter()
        .filter_map(|part| *part)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}
