//! Recipe service
//!
//! This module provides the recipe catalogue:
//! - Create, update and delete with author/admin permission checks
//! - Composition validation that reports every violation at once
//! - Detail views with per-viewer favorite, cart and subscription flags
//! - Filtered listing by tag slugs, authors and the viewer's lists

use crate::config::LimitsConfig;
use crate::db::repositories::{
    IngredientRepository, RecipeRepository, RelationRepository, SubscriptionRepository,
    TagRepository, UserRepository,
};
use crate::models::{
    Recipe, RecipeDetail, RecipeFilter, RecipeInput, RecipeShort, RelationKind, User, UserProfile,
    ValidationErrors,
};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Error types for recipe service operations
#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    /// Recipe not found
    #[error("Recipe not found: {0}")]
    NotFound(String),

    /// Actor is neither the author nor an admin
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Upper bound for ingredient amounts and cooking time
pub const MAX_AMOUNT: i64 = 32_767;

/// Check the shape of a recipe write request.
///
/// Reference existence is checked separately against storage.
pub fn validate_composition(input: &RecipeInput, limits: &LimitsConfig) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if input.tags.is_empty() {
        errors.add("tags", "At least one tag is required.");
    } else if has_duplicates(input.tags.iter().copied()) {
        errors.add("tags", "Tags must not repeat.");
    }

    if input.ingredients.is_empty() {
        errors.add("ingredients", "At least one ingredient is required.");
    } else {
        if has_duplicates(input.ingredients.iter().map(|i| i.id)) {
            errors.add("ingredients", "Ingredients must not repeat.");
        }
        if input.ingredients.iter().any(|i| i.amount < 1) {
            errors.add(
                "ingredients",
                "Ensure every amount is greater than or equal to 1.",
            );
        }
        if input.ingredients.iter().any(|i| i.amount > MAX_AMOUNT) {
            errors.add(
                "ingredients",
                format!("Ensure every amount is less than or equal to {}.", MAX_AMOUNT),
            );
        }
    }

    if input.cooking_time < 1 {
        errors.add(
            "cooking_time",
            "Ensure this value is greater than or equal to 1.",
        );
    } else if input.cooking_time > MAX_AMOUNT {
        errors.add(
            "cooking_time",
            format!("Ensure this value is less than or equal to {}.", MAX_AMOUNT),
        );
    }

    errors.check_text("name", &input.name, limits.recipe_name);
    if input.text.trim().is_empty() {
        errors.add("text", "This field may not be blank.");
    }

    errors
}

fn has_duplicates(ids: impl IntoIterator<Item = i64>) -> bool {
    let mut seen = HashSet::new();
    ids.into_iter().any(|id| !seen.insert(id))
}

/// What one viewer has favorited, carted and followed
#[derive(Debug, Default)]
struct ViewerContext {
    favorites: HashSet<i64>,
    cart: HashSet<i64>,
    following: HashSet<i64>,
}

/// Recipe service
pub struct RecipeService {
    recipe_repo: Arc<dyn RecipeRepository>,
    tag_repo: Arc<dyn TagRepository>,
    ingredient_repo: Arc<dyn IngredientRepository>,
    user_repo: Arc<dyn UserRepository>,
    relation_repo: Arc<dyn RelationRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    limits: LimitsConfig,
}

impl RecipeService {
    /// Create a new recipe service
    pub fn new(
        recipe_repo: Arc<dyn RecipeRepository>,
        tag_repo: Arc<dyn TagRepository>,
        ingredient_repo: Arc<dyn IngredientRepository>,
        user_repo: Arc<dyn UserRepository>,
        relation_repo: Arc<dyn RelationRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            recipe_repo,
            tag_repo,
            ingredient_repo,
            user_repo,
            relation_repo,
            subscription_repo,
            limits,
        }
    }

    /// Create a recipe authored by `author`
    ///
    /// # Errors
    /// - `ValidationError` listing every composition problem
    pub async fn create(
        &self,
        author: &User,
        input: RecipeInput,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let input = normalize(input);
        self.validate(&input).await?;

        let recipe = self
            .recipe_repo
            .create(author.id, &input)
            .await
            .context("Failed to create recipe")?;

        tracing::info!("User {} created recipe {}", author.id, recipe.id);
        self.detail_for(recipe, Some(author)).await
    }

    /// Replace a recipe's fields, tags and ingredients
    ///
    /// # Errors
    /// - `NotFound` if the recipe doesn't exist
    /// - `Forbidden` unless `actor` is the author or an admin
    /// - `ValidationError` listing every composition problem
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: RecipeInput,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let existing = self.get_recipe(id).await?;
        check_permission(actor, &existing)?;

        let input = normalize(input);
        self.validate(&input).await?;

        let recipe = self
            .recipe_repo
            .update(id, &input)
            .await
            .context("Failed to update recipe")?
            .ok_or_else(|| not_found(id))?;

        tracing::info!("User {} updated recipe {}", actor.id, recipe.id);
        self.detail_for(recipe, Some(actor)).await
    }

    /// Delete a recipe together with its composition, favorites and cart rows
    ///
    /// # Errors
    /// - `NotFound` if the recipe doesn't exist
    /// - `Forbidden` unless `actor` is the author or an admin
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), RecipeServiceError> {
        let existing = self.get_recipe(id).await?;
        check_permission(actor, &existing)?;

        let deleted = self
            .recipe_repo
            .delete(id)
            .await
            .context("Failed to delete recipe")?;
        if !deleted {
            return Err(not_found(id));
        }

        tracing::info!("User {} deleted recipe {}", actor.id, id);
        Ok(())
    }

    /// Get a recipe as seen by `viewer`
    pub async fn get(
        &self,
        viewer: Option<&User>,
        id: i64,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let recipe = self.get_recipe(id).await?;
        self.detail_for(recipe, viewer).await
    }

    /// Short view of a recipe, used by relation responses
    pub async fn get_short(&self, id: i64) -> Result<RecipeShort, RecipeServiceError> {
        let recipe = self.get_recipe(id).await?;
        Ok(RecipeShort::from(&recipe))
    }

    /// List recipes matching `filter`, newest first
    pub async fn list(
        &self,
        viewer: Option<&User>,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeDetail>, RecipeServiceError> {
        let recipes = self
            .recipe_repo
            .list(filter, viewer.map(|v| v.id))
            .await
            .context("Failed to list recipes")?;

        let ctx = self.viewer_context(viewer).await?;
        let mut authors: HashMap<i64, UserProfile> = HashMap::new();
        let mut details = Vec::with_capacity(recipes.len());

        for recipe in recipes {
            let author = match authors.get(&recipe.author_id) {
                Some(author) => author.clone(),
                None => {
                    let author = self.author_profile(recipe.author_id, &ctx).await?;
                    authors.insert(recipe.author_id, author.clone());
                    author
                }
            };
            details.push(self.build_detail(recipe, author, &ctx).await?);
        }

        Ok(details)
    }

    async fn validate(&self, input: &RecipeInput) -> Result<(), RecipeServiceError> {
        let mut errors = validate_composition(input, &self.limits);

        let tag_ids: HashSet<i64> = input.tags.iter().copied().collect();
        if !tag_ids.is_empty() {
            let ids: Vec<i64> = tag_ids.iter().copied().collect();
            let found: HashSet<i64> = self
                .tag_repo
                .get_by_ids(&ids)
                .await
                .context("Failed to load tags")?
                .into_iter()
                .map(|tag| tag.id)
                .collect();
            let mut missing: Vec<i64> = tag_ids.difference(&found).copied().collect();
            missing.sort_unstable();
            for id in missing {
                errors.add("tags", format!("Tag with ID {} does not exist.", id));
            }
        }

        let ingredient_ids: HashSet<i64> = input.ingredients.iter().map(|i| i.id).collect();
        if !ingredient_ids.is_empty() {
            let ids: Vec<i64> = ingredient_ids.iter().copied().collect();
            let found: HashSet<i64> = self
                .ingredient_repo
                .get_by_ids(&ids)
                .await
                .context("Failed to load ingredients")?
                .into_iter()
                .map(|ingredient| ingredient.id)
                .collect();
            let mut missing: Vec<i64> = ingredient_ids.difference(&found).copied().collect();
            missing.sort_unstable();
            for id in missing {
                errors.add(
                    "ingredients",
                    format!("Ingredient with ID {} does not exist.", id),
                );
            }
        }

        if !errors.is_empty() {
            tracing::warn!("Rejected recipe write: {}", errors);
        }
        errors.into_result().map_err(RecipeServiceError::ValidationError)
    }

    async fn get_recipe(&self, id: i64) -> Result<Recipe, RecipeServiceError> {
        self.recipe_repo
            .get_by_id(id)
            .await
            .context("Failed to get recipe by ID")?
            .ok_or_else(|| not_found(id))
    }

    async fn viewer_context(&self, viewer: Option<&User>) -> Result<ViewerContext, RecipeServiceError> {
        let Some(viewer) = viewer else {
            return Ok(ViewerContext::default());
        };

        let favorites = self
            .relation_repo
            .recipe_ids(RelationKind::Favorite, viewer.id)
            .await
            .context("Failed to load favorites")?;
        let cart = self
            .relation_repo
            .recipe_ids(RelationKind::ShoppingCart, viewer.id)
            .await
            .context("Failed to load shopping cart")?;
        let following = self
            .subscription_repo
            .author_ids(viewer.id)
            .await
            .context("Failed to load subscriptions")?;

        Ok(ViewerContext {
            favorites: favorites.into_iter().collect(),
            cart: cart.into_iter().collect(),
            following: following.into_iter().collect(),
        })
    }

    async fn author_profile(
        &self,
        author_id: i64,
        ctx: &ViewerContext,
    ) -> Result<UserProfile, RecipeServiceError> {
        let author = self
            .user_repo
            .get_by_id(author_id)
            .await
            .context("Failed to get recipe author")?
            .ok_or_else(|| anyhow::anyhow!("Recipe author {} is missing", author_id))?;
        let is_subscribed = ctx.following.contains(&author.id);
        Ok(UserProfile::from_user(author, is_subscribed))
    }

    async fn detail_for(
        &self,
        recipe: Recipe,
        viewer: Option<&User>,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let ctx = self.viewer_context(viewer).await?;
        let author = self.author_profile(recipe.author_id, &ctx).await?;
        self.build_detail(recipe, author, &ctx).await
    }

    async fn build_detail(
        &self,
        recipe: Recipe,
        author: UserProfile,
        ctx: &ViewerContext,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let tags = self
            .tag_repo
            .get_by_recipe_id(recipe.id)
            .await
            .context("Failed to load recipe tags")?;
        let ingredients = self
            .recipe_repo
            .get_ingredients(recipe.id)
            .await
            .context("Failed to load recipe ingredients")?;

        Ok(RecipeDetail {
            id: recipe.id,
            tags,
            author,
            ingredients,
            is_favorited: ctx.favorites.contains(&recipe.id),
            is_in_shopping_cart: ctx.cart.contains(&recipe.id),
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            created_at: recipe.created_at,
        })
    }
}

fn normalize(input: RecipeInput) -> RecipeInput {
    RecipeInput {
        name: input.name.trim().to_string(),
        text: input.text.trim().to_string(),
        image: input
            .image
            .map(|image| image.trim().to_string())
            .filter(|image| !image.is_empty()),
        ..input
    }
}

fn check_permission(actor: &User, recipe: &Recipe) -> Result<(), RecipeServiceError> {
    if actor.can_edit(recipe.author_id) {
        return Ok(());
    }

    tracing::warn!(
        "User {} denied write access to recipe {} of user {}",
        actor.id,
        recipe.id,
        recipe.author_id
    );
    Err(RecipeServiceError::Forbidden(format!(
        "Only the author can change recipe {}",
        recipe.id
    )))
}

fn not_found(id: i64) -> RecipeServiceError {
    RecipeServiceError::NotFound(format!("Recipe with ID {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxIngredientRepository, SqlxRecipeRepository, SqlxRelationRepository,
        SqlxSubscriptionRepository, SqlxTagRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateUserInput, RecipeIngredientInput, UserRole};
    use proptest::prelude::*;

    struct Fixture {
        pool: DynDatabasePool,
        service: RecipeService,
        admin: User,
        cook: User,
        guest: User,
    }

    async fn setup_test_service() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        for sql in [
            "INSERT INTO tags (name, color, slug) VALUES ('Breakfast', '#E26C2D', 'breakfast')",
            "INSERT INTO tags (name, color, slug) VALUES ('Lunch', '#49B64E', 'lunch')",
            "INSERT INTO ingredients (name, measurement_unit) VALUES ('flour', 'g')",
            "INSERT INTO ingredients (name, measurement_unit) VALUES ('salt', 'tsp')",
            "INSERT INTO ingredients (name, measurement_unit) VALUES ('egg', 'pcs')",
        ] {
            pool.execute(sql).await.unwrap();
        }

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let mut users = Vec::new();
        for (name, role) in [
            ("admin", UserRole::Admin),
            ("cook", UserRole::User),
            ("guest", UserRole::User),
        ] {
            let input = CreateUserInput {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                ..Default::default()
            };
            let user = user_repo.create(&input).await.unwrap().unwrap();
            assert_eq!(user.role, role);
            users.push(user);
        }

        let service = RecipeService::new(
            SqlxRecipeRepository::boxed(pool.clone()),
            SqlxTagRepository::boxed(pool.clone()),
            SqlxIngredientRepository::boxed(pool.clone()),
            user_repo,
            SqlxRelationRepository::boxed(pool.clone()),
            SqlxSubscriptionRepository::boxed(pool.clone()),
            LimitsConfig::default(),
        );

        let guest = users.pop().unwrap();
        let cook = users.pop().unwrap();
        let admin = users.pop().unwrap();
        Fixture {
            pool,
            service,
            admin,
            cook,
            guest,
        }
    }

    fn pancakes() -> RecipeInput {
        RecipeInput {
            tags: vec![1],
            ingredients: vec![
                RecipeIngredientInput::new(1, 200),
                RecipeIngredientInput::new(3, 2),
            ],
            name: "Pancakes".to_string(),
            image: Some("recipes/pancakes.png".to_string()),
            text: "Mix and fry".to_string(),
            cooking_time: 20,
        }
    }

    async fn count(pool: &DynDatabasePool, table: &str) -> i64 {
        use sqlx::Row;
        sqlx::query(&format!("SELECT COUNT(*) AS count FROM {}", table))
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap()
            .get("count")
    }

    #[tokio::test]
    async fn test_create_returns_detail() {
        let f = setup_test_service().await;

        let detail = f.service.create(&f.cook, pancakes()).await.unwrap();
        assert_eq!(detail.name, "Pancakes");
        assert_eq!(detail.author.id, f.cook.id);
        assert!(!detail.author.is_subscribed);
        assert_eq!(detail.tags.len(), 1);
        assert_eq!(detail.tags[0].slug, "breakfast");
        assert_eq!(detail.ingredients.len(), 2);
        assert_eq!(detail.ingredients[0].name, "flour");
        assert_eq!(detail.ingredients[0].amount, 200);
        assert!(!detail.is_favorited);
        assert!(!detail.is_in_shopping_cart);
    }

    #[tokio::test]
    async fn test_duplicate_tags_rejected() {
        let f = setup_test_service().await;
        let input = RecipeInput {
            tags: vec![1, 1],
            ..pancakes()
        };

        match f.service.create(&f.cook, input).await {
            Err(RecipeServiceError::ValidationError(errors)) => {
                assert!(errors.messages("tags").iter().any(|m| m.contains("repeat")));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
        assert_eq!(count(&f.pool, "recipes").await, 0);
    }

    #[tokio::test]
    async fn test_empty_ingredients_rejected() {
        let f = setup_test_service().await;
        let input = RecipeInput {
            ingredients: vec![],
            ..pancakes()
        };

        match f.service.create(&f.cook, input).await {
            Err(RecipeServiceError::ValidationError(errors)) => {
                assert!(errors
                    .messages("ingredients")
                    .iter()
                    .any(|m| m.contains("At least one ingredient")));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_violations_reported_together() {
        let f = setup_test_service().await;
        let input = RecipeInput {
            tags: vec![1, 42],
            ingredients: vec![
                RecipeIngredientInput::new(2, 0),
                RecipeIngredientInput::new(99, 1),
            ],
            name: " ".to_string(),
            image: None,
            text: String::new(),
            cooking_time: 0,
        };

        match f.service.create(&f.cook, input).await {
            Err(RecipeServiceError::ValidationError(errors)) => {
                assert_eq!(errors.messages("tags"), ["Tag with ID 42 does not exist."]);
                assert_eq!(errors.messages("ingredients").len(), 2);
                assert!(errors.has("cooking_time"));
                assert!(errors.has("name"));
                assert!(errors.has("text"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_amounts_above_limit_rejected() {
        let f = setup_test_service().await;
        let input = RecipeInput {
            ingredients: vec![RecipeIngredientInput::new(1, MAX_AMOUNT + 1)],
            cooking_time: MAX_AMOUNT + 1,
            ..pancakes()
        };

        match f.service.create(&f.cook, input).await {
            Err(RecipeServiceError::ValidationError(errors)) => {
                assert_eq!(
                    errors.messages("ingredients"),
                    ["Ensure every amount is less than or equal to 32767."]
                );
                assert_eq!(
                    errors.messages("cooking_time"),
                    ["Ensure this value is less than or equal to 32767."]
                );
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
        assert_eq!(count(&f.pool, "recipes").await, 0);
    }

    #[tokio::test]
    async fn test_cart_of_maximum_amounts_renders() {
        use crate::db::repositories::SqlxShoppingListRepository;
        use crate::services::{RelationService, ShoppingListService};

        let f = setup_test_service().await;
        let relations = RelationService::new(
            SqlxRelationRepository::boxed(f.pool.clone()),
            SqlxRecipeRepository::boxed(f.pool.clone()),
        );
        let shopping_list =
            ShoppingListService::new(SqlxShoppingListRepository::boxed(f.pool.clone()));

        for name in ["A", "B", "C"] {
            let input = RecipeInput {
                ingredients: vec![RecipeIngredientInput::new(1, MAX_AMOUNT)],
                cooking_time: MAX_AMOUNT,
                name: name.to_string(),
                ..pancakes()
            };
            let recipe = f.service.create(&f.cook, input).await.unwrap();
            relations
                .add(RelationKind::ShoppingCart, f.guest.id, recipe.id)
                .await
                .unwrap();
        }

        let text = shopping_list.render(f.guest.id).await.unwrap();
        assert_eq!(text, format!("Shopping list:\n\nflour, {} g", MAX_AMOUNT * 3));
    }

    #[tokio::test]
    async fn test_update_replaces_composition() {
        let f = setup_test_service().await;
        let created = f.service.create(&f.cook, pancakes()).await.unwrap();

        let input = RecipeInput {
            tags: vec![2],
            ingredients: vec![RecipeIngredientInput::new(2, 1)],
            name: "Salted pancakes".to_string(),
            image: None,
            text: "Mix, salt and fry".to_string(),
            cooking_time: 25,
        };
        let updated = f.service.update(&f.cook, created.id, input).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Salted pancakes");
        assert_eq!(updated.image.as_deref(), Some("recipes/pancakes.png"));
        assert_eq!(updated.tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.ingredients[0].name, "salt");
        assert_eq!(count(&f.pool, "recipe_ingredients").await, 1);
        assert_eq!(count(&f.pool, "recipe_tags").await, 1);
    }

    #[tokio::test]
    async fn test_update_checks_existence_then_permission() {
        let f = setup_test_service().await;
        let created = f.service.create(&f.cook, pancakes()).await.unwrap();

        let missing = f.service.update(&f.cook, 999, RecipeInput::default()).await;
        assert!(matches!(missing, Err(RecipeServiceError::NotFound(_))));

        let forbidden = f
            .service
            .update(&f.guest, created.id, RecipeInput::default())
            .await;
        assert!(matches!(forbidden, Err(RecipeServiceError::Forbidden(_))));

        let invalid = f
            .service
            .update(&f.cook, created.id, RecipeInput::default())
            .await;
        assert!(matches!(invalid, Err(RecipeServiceError::ValidationError(_))));

        let by_admin = f.service.update(&f.admin, created.id, pancakes()).await;
        assert!(by_admin.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_relation_rows() {
        let f = setup_test_service().await;
        let created = f.service.create(&f.cook, pancakes()).await.unwrap();
        for sql in [
            format!("INSERT INTO favorites (user_id, recipe_id) VALUES ({}, {})", f.guest.id, created.id),
            format!("INSERT INTO shopping_cart (user_id, recipe_id) VALUES ({}, {})", f.guest.id, created.id),
        ] {
            f.pool.execute(&sql).await.unwrap();
        }

        let forbidden = f.service.delete(&f.guest, created.id).await;
        assert!(matches!(forbidden, Err(RecipeServiceError::Forbidden(_))));

        f.service.delete(&f.cook, created.id).await.unwrap();
        assert_eq!(count(&f.pool, "recipes").await, 0);
        assert_eq!(count(&f.pool, "favorites").await, 0);
        assert_eq!(count(&f.pool, "shopping_cart").await, 0);
        assert_eq!(count(&f.pool, "recipe_ingredients").await, 0);

        let again = f.service.delete(&f.cook, created.id).await;
        assert!(matches!(again, Err(RecipeServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_computes_viewer_flags() {
        let f = setup_test_service().await;
        let created = f.service.create(&f.cook, pancakes()).await.unwrap();
        for sql in [
            format!("INSERT INTO favorites (user_id, recipe_id) VALUES ({}, {})", f.guest.id, created.id),
            format!("INSERT INTO subscriptions (user_id, author_id) VALUES ({}, {})", f.guest.id, f.cook.id),
        ] {
            f.pool.execute(&sql).await.unwrap();
        }

        let seen_by_guest = f.service.get(Some(&f.guest), created.id).await.unwrap();
        assert!(seen_by_guest.is_favorited);
        assert!(!seen_by_guest.is_in_shopping_cart);
        assert!(seen_by_guest.author.is_subscribed);

        let anonymous = f.service.get(None, created.id).await.unwrap();
        assert!(!anonymous.is_favorited);
        assert!(!anonymous.author.is_subscribed);

        assert!(matches!(
            f.service.get(None, 999).await,
            Err(RecipeServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let f = setup_test_service().await;
        let pancakes = f.service.create(&f.cook, pancakes()).await.unwrap();
        let soup = f
            .service
            .create(
                &f.admin,
                RecipeInput {
                    tags: vec![2],
                    ingredients: vec![RecipeIngredientInput::new(2, 1)],
                    name: "Soup".to_string(),
                    image: None,
                    text: "Boil".to_string(),
                    cooking_time: 40,
                },
            )
            .await
            .unwrap();
        f.pool
            .execute(&format!(
                "INSERT INTO shopping_cart (user_id, recipe_id) VALUES ({}, {})",
                f.guest.id, pancakes.id
            ))
            .await
            .unwrap();

        let all = f.service.list(None, &RecipeFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![soup.id, pancakes.id]);

        let lunch = f
            .service
            .list(None, &RecipeFilter {
                tags: vec!["lunch".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(lunch.len(), 1);
        assert_eq!(lunch[0].id, soup.id);

        let by_cook = f
            .service
            .list(None, &RecipeFilter {
                author: vec![f.cook.id],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_cook.len(), 1);
        assert_eq!(by_cook[0].id, pancakes.id);

        let cart_filter = RecipeFilter {
            is_in_shopping_cart: true,
            ..Default::default()
        };
        let cart = f.service.list(Some(&f.guest), &cart_filter).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert!(cart[0].is_in_shopping_cart);

        assert!(f.service.list(None, &cart_filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_short() {
        let f = setup_test_service().await;
        let created = f.service.create(&f.cook, pancakes()).await.unwrap();

        let short = f.service.get_short(created.id).await.unwrap();
        assert_eq!(short.id, created.id);
        assert_eq!(short.name, "Pancakes");
        assert_eq!(short.cooking_time, 20);
    }

    #[test]
    fn test_validate_composition_accepts_valid_input() {
        assert!(validate_composition(&pancakes(), &LimitsConfig::default()).is_empty());
    }

    #[test]
    fn test_validate_composition_name_limit() {
        let input = RecipeInput {
            name: "x".repeat(201),
            ..pancakes()
        };
        let errors = validate_composition(&input, &LimitsConfig::default());
        assert_eq!(
            errors.messages("name"),
            ["Ensure this field has no more than 200 characters."]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Duplicate tag ids are reported exactly when the list repeats an id
        #[test]
        fn property_duplicate_tags_detected(tags in proptest::collection::vec(1i64..6, 1..6)) {
            let input = RecipeInput { tags: tags.clone(), ..pancakes() };
            let errors = validate_composition(&input, &LimitsConfig::default());

            let unique: HashSet<i64> = tags.iter().copied().collect();
            prop_assert_eq!(errors.has("tags"), unique.len() != tags.len());
            prop_assert!(!errors.has("ingredients"));
        }

        /// Amounts and cooking time outside 1..=MAX_AMOUNT are rejected
        #[test]
        fn property_out_of_range_values_rejected(
            amounts in proptest::collection::vec(
                prop_oneof![-5i64..5, MAX_AMOUNT - 5..MAX_AMOUNT + 5],
                1..4,
            ),
            cooking_time in prop_oneof![-5i64..5, MAX_AMOUNT - 5..MAX_AMOUNT + 5],
        ) {
            let ingredients = amounts
                .iter()
                .enumerate()
                .map(|(index, amount)| RecipeIngredientInput::new(index as i64 + 1, *amount))
                .collect();
            let input = RecipeInput { ingredients, cooking_time, ..pancakes() };
            let errors = validate_composition(&input, &LimitsConfig::default());

            let in_range = |value: i64| (1..=MAX_AMOUNT).contains(&value);
            prop_assert_eq!(errors.has("ingredients"), !amounts.iter().all(|a| in_range(*a)));
            prop_assert_eq!(errors.has("cooking_time"), !in_range(cooking_time));
        }
    }
}
