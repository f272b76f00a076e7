//! Tag service
//!
//! Tags are reference data: listed and read by everyone, created by the
//! fixture importer.

use crate::config::LimitsConfig;
use crate::db::repositories::TagRepository;
use crate::models::{CreateTagInput, Tag, ValidationErrors};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static COLOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3})$").expect("valid color pattern")
});

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"));

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// Name, color or slug already used by another tag
    #[error("Tag already exists: {0}")]
    Conflict(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Check that a string is a `#RRGGBB` or `#RGB` hex color
pub fn is_valid_color(color: &str) -> bool {
    COLOR_PATTERN.is_match(color)
}

/// Tag service for recipe tags
pub struct TagService {
    repo: Arc<dyn TagRepository>,
    limits: LimitsConfig,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>, limits: LimitsConfig) -> Self {
        Self { repo, limits }
    }

    /// List all tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }

    /// Get tag by ID
    ///
    /// # Errors
    /// - `NotFound` if the tag doesn't exist
    pub async fn get(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag by ID")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag with ID {} not found", id)))
    }

    /// Create a new tag
    ///
    /// # Errors
    /// - `ValidationError` for a bad color, slug or name
    /// - `Conflict` if the name, color or slug is taken
    pub async fn create(&self, input: CreateTagInput) -> Result<Tag, TagServiceError> {
        let input = CreateTagInput::new(input.name.trim(), input.color.trim(), input.slug.trim());
        self.validate(&input).map_err(TagServiceError::ValidationError)?;

        let tag = self
            .repo
            .create(&input)
            .await
            .context("Failed to create tag")?
            .ok_or_else(|| {
                TagServiceError::Conflict(format!(
                    "A tag with name '{}', color '{}' or slug '{}' already exists",
                    input.name, input.color, input.slug
                ))
            })?;

        tracing::info!("Created tag {} ({})", tag.id, tag.slug);
        Ok(tag)
    }

    /// Return the tag with the input's slug, creating it if missing.
    ///
    /// Re-running an import is therefore harmless.
    pub async fn get_or_create(&self, input: CreateTagInput) -> Result<Tag, TagServiceError> {
        if let Some(existing) = self
            .repo
            .get_by_slug(input.slug.trim())
            .await
            .context("Failed to check existing tag")?
        {
            return Ok(existing);
        }

        self.create(input).await
    }

    fn validate(&self, input: &CreateTagInput) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check_text("name", &input.name, self.limits.tag_name);

        if !is_valid_color(&input.color) {
            errors.add("color", "Enter a valid hex color, e.g. #49B64E.");
        }

        errors.check_text("slug", &input.slug, self.limits.tag_slug);
        if !input.slug.is_empty() && !SLUG_PATTERN.is_match(&input.slug) {
            errors.add(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            );
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;

    async fn setup_test_service() -> TagService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        TagService::new(SqlxTagRepository::boxed(pool), LimitsConfig::default())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = setup_test_service().await;

        let tag = service
            .create(CreateTagInput::new(" Breakfast ", "#E26C2D", "breakfast"))
            .await
            .unwrap();
        assert_eq!(tag.name, "Breakfast");

        assert_eq!(service.get(tag.id).await.unwrap(), tag);
        assert_eq!(service.list().await.unwrap(), vec![tag]);
    }

    #[tokio::test]
    async fn test_get_missing_tag() {
        let service = setup_test_service().await;
        assert!(matches!(service.get(1).await, Err(TagServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let service = setup_test_service().await;

        let result = service
            .create(CreateTagInput::new("", "green", "not a slug"))
            .await;

        match result {
            Err(TagServiceError::ValidationError(errors)) => {
                assert!(errors.has("name"));
                assert!(errors.has("color"));
                assert!(errors.has("slug"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_conflict_and_get_or_create() {
        let service = setup_test_service().await;
        let lunch = service
            .create(CreateTagInput::new("Lunch", "#49B64E", "lunch"))
            .await
            .unwrap();

        let duplicate = service
            .create(CreateTagInput::new("Lunch", "#000", "lunch-2"))
            .await;
        assert!(matches!(duplicate, Err(TagServiceError::Conflict(_))));

        let reused = service
            .get_or_create(CreateTagInput::new("Lunch", "#49B64E", "lunch"))
            .await
            .unwrap();
        assert_eq!(reused.id, lunch.id);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn property_hex_colors_are_valid(color in "#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})") {
            prop_assert!(is_valid_color(&color));
        }

        #[test]
        fn property_wrong_length_colors_are_invalid(digits in "[0-9a-f]{1,8}") {
            prop_assume!(digits.len() != 3 && digits.len() != 6);
            let color = format!("#{}", digits);
            prop_assert!(!is_valid_color(&color));
        }
    }
}
