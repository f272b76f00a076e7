//! Reference data import
//!
//! Loads tags and ingredients from JSON files. Records are inserted with
//! get-or-create semantics, so importing the same files twice leaves the
//! database unchanged.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::models::{CreateIngredientInput, CreateTagInput};
use crate::services::{IngredientService, TagService};

/// Default location of the ingredient fixture
pub const DEFAULT_INGREDIENTS_PATH: &str = "data/ingredients.json";

/// Default location of the tag fixture
pub const DEFAULT_TAGS_PATH: &str = "data/tags.json";

/// Number of records processed per fixture file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub ingredients: usize,
    pub tags: usize,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fixture file: {}", path.display()))
}

/// Read `[{"name", "measurement_unit"}]`
pub fn load_ingredients(path: &Path) -> Result<Vec<CreateIngredientInput>> {
    read_json(path)
}

/// Read `[{"name", "color", "slug"}]`
pub fn load_tags(path: &Path) -> Result<Vec<CreateTagInput>> {
    read_json(path)
}

/// Import both fixture files. A missing tag file is skipped.
pub async fn import(
    ingredient_service: &IngredientService,
    tag_service: &TagService,
    ingredients_path: &Path,
    tags_path: &Path,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for input in load_ingredients(ingredients_path)? {
        let label = format!("{} ({})", input.name, input.measurement_unit);
        ingredient_service
            .get_or_create(input)
            .await
            .with_context(|| format!("Failed to import ingredient {}", label))?;
        summary.ingredients += 1;
    }

    if tags_path.exists() {
        for input in load_tags(tags_path)? {
            let slug = input.slug.clone();
            tag_service
                .get_or_create(input)
                .await
                .with_context(|| format!("Failed to import tag {}", slug))?;
            summary.tags += 1;
        }
    } else {
        tracing::warn!("Tag fixture {} not found, skipping", tags_path.display());
    }

    Ok(summary)
}
