//! Tag model
//!
//! Tags are immutable reference data attached to recipes (breakfast,
//! lunch, dinner and so on). Each carries a display color.

use serde::{Deserialize, Serialize};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Display name (unique)
    pub name: String,
    /// Hex color, `#RRGGBB` or `#RGB` (unique)
    pub color: String,
    /// URL-friendly slug (unique)
    pub slug: String,
}

/// Input for creating a tag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTagInput {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl CreateTagInput {
    pub fn new(name: impl Into<String>, color: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            slug: slug.into(),
        }
    }
}
