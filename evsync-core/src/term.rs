//! Category and tag terms.
//!
//! Terms are identified by their slug within a backend taxonomy namespace.
//! Slugs are unique per namespace; names are not.

use serde::{Deserialize, Serialize};

/// An event category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub slug: String,
}

impl Category {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Category {
            name: name.into(),
            slug: slug.into(),
        }
    }

    /// Build a category from a display name, deriving a url-safe slug.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slug::slugify(&name);
        Category { name, slug }
    }
}

/// An event tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub slug: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Tag {
            name: name.into(),
            slug: slug.into(),
        }
    }

    /// Build a tag from a display name, deriving a url-safe slug.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slug::slugify(&name);
        Tag { name, slug }
    }
}
