//! CLI tool to load reference data (ingredients and tags) into the database.
//!
//! Usage: `foodgram-import [ingredients.json] [tags.json]`
//!
//! Paths default to `data/ingredients.json` and `data/tags.json`. Existing
//! records are kept, so the import can be re-run safely.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodgram::{
    config::Config,
    db::{
        self,
        repositories::{SqlxIngredientRepository, SqlxTagRepository},
    },
    fixtures::{self, DEFAULT_INGREDIENTS_PATH, DEFAULT_TAGS_PATH},
    services::{IngredientService, TagService},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let ingredients_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INGREDIENTS_PATH));
    let tags_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TAGS_PATH));

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let ingredient_service = IngredientService::new(
        SqlxIngredientRepository::boxed(pool.clone()),
        config.limits.clone(),
    );
    let tag_service = TagService::new(SqlxTagRepository::boxed(pool.clone()), config.limits.clone());

    tracing::info!(
        "Importing {} and {}",
        ingredients_path.display(),
        tags_path.display()
    );
    let summary = fixtures::import(&ingredient_service, &tag_service, &ingredients_path, &tags_path).await?;
    tracing::info!(
        "Imported {} ingredients and {} tags",
        summary.ingredients,
        summary.tags
    );

    pool.close().await;
    Ok(())
}
