//! Persistence gateway.
//!
//! Repositories are traits with one implementation per backend. [`connect`]
//! runs once at startup and the resulting [`Database`] is handed to
//! `AppState`; nothing here is process-global.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::AppResult;
use crate::recipes::repo_types::{NewRecipe, Recipe};
use crate::users::repo_types::{NewUser, User, UserPatch};

pub mod dynamo;
pub mod memory;
pub mod postgres;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `Conflict` when the email (or a present username) is taken.
    async fn create(&self, new: NewUser) -> AppResult<User>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    /// Fails with `NotFound` for an unknown email and `BadRequest` for an empty patch.
    async fn update_by_email(&self, email: &str, patch: UserPatch) -> AppResult<User>;
}

#[async_trait]
pub trait RecipeRepo: Send + Sync {
    async fn create(&self, owner: &User, new: NewRecipe) -> AppResult<Recipe>;
    /// Newest first, whatever the backend's native order.
    async fn list_all(&self) -> AppResult<Vec<Recipe>>;
    async fn list_favorites(&self, email: &str) -> AppResult<Vec<Recipe>>;
    /// Negates `is_favorite` and returns the stored record. `NotFound` for an unknown id.
    async fn toggle_favorite(&self, id: Uuid) -> AppResult<Recipe>;
}

#[derive(Clone)]
pub struct Database {
    pub users: Arc<dyn UserRepo>,
    pub recipes: Arc<dyn RecipeRepo>,
}

impl Database {
    fn from_store<S>(store: S) -> Self
    where
        S: UserRepo + RecipeRepo + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            recipes: store,
        }
    }

    pub fn memory() -> Self {
        Self::from_store(memory::MemoryStore::default())
    }
}

/// Opens the configured backend. Errors here are fatal for the process.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Database> {
    match config {
        DatabaseConfig::Postgres { url } => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("connect to postgres")?;
            let store = postgres::PgStore::new(pool);
            store.migrate().await;
            tracing::info!("using postgres backend");
            Ok(Database::from_store(store))
        }
        DatabaseConfig::DynamoDb {
            region,
            endpoint,
            users_table,
            recipes_table,
        } => {
            let store = dynamo::DynamoStore::connect(
                region,
                endpoint.as_deref(),
                users_table,
                recipes_table,
            )
            .await;
            tracing::info!(%users_table, %recipes_table, "using dynamodb backend");
            Ok(Database::from_store(store))
        }
        DatabaseConfig::Memory => {
            tracing::warn!("using in-memory backend; data is lost on restart");
            Ok(Database::memory())
        }
    }
}
