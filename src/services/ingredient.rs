//! Ingredient service
//!
//! Ingredients are reference data searched by name prefix when composing
//! a recipe and loaded in bulk by the fixture importer.

use crate::config::LimitsConfig;
use crate::db::repositories::IngredientRepository;
use crate::models::{CreateIngredientInput, Ingredient, ValidationErrors};
use anyhow::Context;
use std::sync::Arc;

/// Error types for ingredient service operations
#[derive(Debug, thiserror::Error)]
pub enum IngredientServiceError {
    /// Ingredient not found
    #[error("Ingredient not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Ingredient service
pub struct IngredientService {
    repo: Arc<dyn IngredientRepository>,
    limits: LimitsConfig,
}

impl IngredientService {
    /// Create a new ingredient service
    pub fn new(repo: Arc<dyn IngredientRepository>, limits: LimitsConfig) -> Self {
        Self { repo, limits }
    }

    /// List ingredients, optionally by case-insensitive name prefix
    pub async fn list(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, IngredientServiceError> {
        let prefix = name_prefix.map(str::trim).filter(|p| !p.is_empty());
        self.repo
            .list(prefix)
            .await
            .context("Failed to list ingredients")
            .map_err(Into::into)
    }

    /// Get ingredient by ID
    ///
    /// # Errors
    /// - `NotFound` if the ingredient doesn't exist
    pub async fn get(&self, id: i64) -> Result<Ingredient, IngredientServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get ingredient by ID")?
            .ok_or_else(|| {
                IngredientServiceError::NotFound(format!("Ingredient with ID {} not found", id))
            })
    }

    /// Return the ingredient with this (name, unit) pair, creating it if missing
    pub async fn get_or_create(
        &self,
        input: CreateIngredientInput,
    ) -> Result<Ingredient, IngredientServiceError> {
        let input = CreateIngredientInput::new(input.name.trim(), input.measurement_unit.trim());

        let mut errors = ValidationErrors::new();
        errors.check_text("name", &input.name, self.limits.ingredient_name);
        errors.check_text(
            "measurement_unit",
            &input.measurement_unit,
            self.limits.measurement_unit,
        );
        errors
            .into_result()
            .map_err(IngredientServiceError::ValidationError)?;

        if let Some(existing) = self.find(&input).await? {
            return Ok(existing);
        }

        match self
            .repo
            .create(&input)
            .await
            .context("Failed to create ingredient")?
        {
            Some(created) => Ok(created),
            // Lost a race against a concurrent insert of the same pair
            None => self.find(&input).await?.ok_or_else(|| {
                anyhow::anyhow!(
                    "Ingredient {} ({}) vanished after conflict",
                    input.name,
                    input.measurement_unit
                )
                .into()
            }),
        }
    }

    async fn find(
        &self,
        input: &CreateIngredientInput,
    ) -> Result<Option<Ingredient>, IngredientServiceError> {
        let found = self
            .repo
            .get_by_name_and_unit(&input.name, &input.measurement_unit)
            .await
            .context("Failed to look up ingredient")?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxIngredientRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> IngredientService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        IngredientService::new(SqlxIngredientRepository::boxed(pool), LimitsConfig::default())
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let service = setup_test_service().await;

        let first = service
            .get_or_create(CreateIngredientInput::new("butter", "g"))
            .await
            .unwrap();
        let second = service
            .get_or_create(CreateIngredientInput::new(" butter ", "g"))
            .await
            .unwrap();
        assert_eq!(first, second);

        let other_unit = service
            .get_or_create(CreateIngredientInput::new("butter", "tbsp"))
            .await
            .unwrap();
        assert_ne!(first.id, other_unit.id);
    }

    #[tokio::test]
    async fn test_get_or_create_validates() {
        let service = setup_test_service().await;

        let result = service
            .get_or_create(CreateIngredientInput::new("", "x".repeat(201)))
            .await;
        match result {
            Err(IngredientServiceError::ValidationError(errors)) => {
                assert!(errors.has("name"));
                assert!(errors.has("measurement_unit"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_by_prefix_and_get() {
        let service = setup_test_service().await;
        let apple = service
            .get_or_create(CreateIngredientInput::new("Apple", "pcs"))
            .await
            .unwrap();
        service
            .get_or_create(CreateIngredientInput::new("apricot", "pcs"))
            .await
            .unwrap();
        service
            .get_or_create(CreateIngredientInput::new("banana", "pcs"))
            .await
            .unwrap();

        assert_eq!(service.list(Some("ap")).await.unwrap().len(), 2);
        assert_eq!(service.list(Some("  ")).await.unwrap().len(), 3);
        assert_eq!(service.get(apple.id).await.unwrap(), apple);
        assert!(matches!(
            service.get(999).await,
            Err(IngredientServiceError::NotFound(_))
        ));
    }
}
