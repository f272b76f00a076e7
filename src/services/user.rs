//! User service
//!
//! Implements business logic for user profiles:
//! - Registration (the first user becomes admin)
//! - Profile lookup with the viewer's subscription flag
//!
//! Authentication is not handled here. The identity provider in front of
//! the service authenticates users and forwards their id.

use crate::config::LimitsConfig;
use crate::db::repositories::{SubscriptionRepository, UserRepository};
use crate::models::{CreateUserInput, User, UserProfile, ValidationErrors};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"));

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// User not found
    #[error("User not found: {0}")]
    NotFound(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// Username or email already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for registration and profiles
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    limits: LimitsConfig,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            user_repo,
            subscription_repo,
            limits,
        }
    }

    /// Register a new user
    ///
    /// The first registered user becomes an admin.
    ///
    /// # Errors
    /// - `ValidationError` listing every invalid field
    /// - `UserExists` if username or email is already taken
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let input = CreateUserInput {
            username: input.username.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
        };
        self.validate_register_input(&input)
            .map_err(UserServiceError::ValidationError)?;

        let user = self
            .user_repo
            .create(&input)
            .await
            .context("Failed to create user")?
            .ok_or_else(|| {
                tracing::warn!("Registration rejected for duplicate user {}", input.username);
                UserServiceError::UserExists(format!(
                    "Username '{}' or email '{}' is already taken",
                    input.username, input.email
                ))
            })?;

        tracing::info!("Registered user {} ({}) as {}", user.id, user.username, user.role);
        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    /// Get a user's profile as seen by `viewer`
    ///
    /// # Errors
    /// - `NotFound` if the user doesn't exist
    pub async fn get_profile(
        &self,
        viewer: Option<&User>,
        id: i64,
    ) -> Result<UserProfile, UserServiceError> {
        let user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(format!("User with ID {} not found", id)))?;

        let is_subscribed = match viewer {
            Some(viewer) => self
                .subscription_repo
                .exists(viewer.id, user.id)
                .await
                .context("Failed to check subscription")?,
            None => false,
        };

        Ok(UserProfile::from_user(user, is_subscribed))
    }

    /// List every user's profile as seen by `viewer`
    pub async fn list(&self, viewer: Option<&User>) -> Result<Vec<UserProfile>, UserServiceError> {
        let users = self.user_repo.list().await.context("Failed to list users")?;

        let following = match viewer {
            Some(viewer) => self
                .subscription_repo
                .author_ids(viewer.id)
                .await
                .context("Failed to list subscriptions")?,
            None => Vec::new(),
        };

        Ok(users
            .into_iter()
            .map(|user| {
                let is_subscribed = following.contains(&user.id);
                UserProfile::from_user(user, is_subscribed)
            })
            .collect())
    }

    /// The current user's own profile
    pub fn me(&self, user: &User) -> UserProfile {
        UserProfile::from_user(user.clone(), false)
    }

    /// Validate registration input, collecting every violation
    fn validate_register_input(&self, input: &CreateUserInput) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check_text("username", &input.username, self.limits.username);
        if !input.username.is_empty() && !USERNAME_PATTERN.is_match(&input.username) {
            errors.add(
                "username",
                "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        errors.check_text("email", &input.email, self.limits.email);
        if !input.email.is_empty() && !EMAIL_PATTERN.is_match(&input.email) {
            errors.add("email", "Enter a valid email address.");
        }

        if input.first_name.chars().count() > self.limits.first_name {
            errors.add(
                "first_name",
                format!(
                    "Ensure this field has no more than {} characters.",
                    self.limits.first_name
                ),
            );
        }
        if input.last_name.chars().count() > self.limits.last_name {
            errors.add(
                "last_name",
                format!(
                    "Ensure this field has no more than {} characters.",
                    self.limits.last_name
                ),
            );
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSubscriptionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::UserRole;

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSubscriptionRepository::boxed(pool.clone()),
            LimitsConfig::default(),
        );

        (pool, service)
    }

    fn input(username: &str) -> CreateUserInput {
        CreateUserInput {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_first_user_becomes_admin() {
        let (_pool, service) = setup_test_service().await;

        let first = service.register(input("first")).await.expect("Failed to register");
        assert_eq!(first.role, UserRole::Admin);

        let second = service.register(input("second")).await.expect("Failed to register");
        assert_eq!(second.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_concurrent_first_registrations_yield_one_admin() {
        let (_pool, service) = setup_test_service().await;
        let service = Arc::new(service);

        let handles: Vec<_> = (0..6)
            .map(|n| {
                let service = service.clone();
                tokio::spawn(async move { service.register(input(&format!("cook{}", n))).await })
            })
            .collect();

        let mut admins = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().role == UserRole::Admin {
                admins += 1;
            }
        }
        assert_eq!(admins, 1);
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let (_pool, service) = setup_test_service().await;
        service.register(input("taken")).await.unwrap();

        let mut duplicate = input("taken");
        duplicate.email = "fresh@example.com".to_string();
        let result = service.register(duplicate).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_normalizes_email() {
        let (_pool, service) = setup_test_service().await;
        let mut shouting = input("loud");
        shouting.email = "  LOUD@Example.COM ".to_string();

        let user = service.register(shouting).await.unwrap();
        assert_eq!(user.email, "loud@example.com");
    }

    #[tokio::test]
    async fn test_register_reports_every_invalid_field() {
        let (_pool, service) = setup_test_service().await;

        let result = service
            .register(CreateUserInput {
                username: "bad name!".to_string(),
                email: "not-an-email".to_string(),
                first_name: "x".repeat(151),
                last_name: String::new(),
            })
            .await;

        match result {
            Err(UserServiceError::ValidationError(errors)) => {
                assert!(errors.has("username"));
                assert!(errors.has("email"));
                assert!(errors.has("first_name"));
                assert!(!errors.has("last_name"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_profile_subscription_flag() {
        let (pool, service) = setup_test_service().await;
        let reader = service.register(input("reader")).await.unwrap();
        let chef = service.register(input("chef")).await.unwrap();

        let profile = service.get_profile(Some(&reader), chef.id).await.unwrap();
        assert!(!profile.is_subscribed);

        pool.execute(&format!(
            "INSERT INTO subscriptions (user_id, author_id) VALUES ({}, {})",
            reader.id, chef.id
        ))
        .await
        .unwrap();

        let profile = service.get_profile(Some(&reader), chef.id).await.unwrap();
        assert!(profile.is_subscribed);
        let anonymous = service.get_profile(None, chef.id).await.unwrap();
        assert!(!anonymous.is_subscribed);

        let listed = service.list(Some(&reader)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|p| p.id == chef.id && p.is_subscribed));
        assert!(listed.iter().any(|p| p.id == reader.id && !p.is_subscribed));
    }

    #[tokio::test]
    async fn test_profile_not_found() {
        let (_pool, service) = setup_test_service().await;
        let result = service.get_profile(None, 404).await;
        assert!(matches!(result, Err(UserServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_me() {
        let (_pool, service) = setup_test_service().await;
        let user = service.register(input("self")).await.unwrap();

        let profile = service.me(&user);
        assert_eq!(profile.id, user.id);
        assert!(!profile.is_subscribed);
    }
}
