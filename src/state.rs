use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{self, RecipeRepo, UserRepo};
use crate::generation::gemini::{GeminiClient, GenerativeModel};
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub recipes: Arc<dyn RecipeRepo>,
    pub storage: Arc<dyn StorageClient>,
    pub model: Arc<dyn GenerativeModel>,
}

impl AppState {
    /// Reads the environment and opens every backend. Any failure here is fatal.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let database = db::connect(&config.database).await?;
        let storage = Arc::new(Storage::new(&config.s3).await) as Arc<dyn StorageClient>;
        let model = Arc::new(GeminiClient::new(config.gemini.clone())) as Arc<dyn GenerativeModel>;

        Ok(Self {
            users: database.users,
            recipes: database.recipes,
            config,
            storage,
            model,
        })
    }

    /// Memory backend with a fake bucket and a model that always returns `recipe_json`.
    #[cfg(test)]
    pub fn fake(recipe_json: Option<&str>) -> Self {
        use async_trait::async_trait;
        use bytes::Bytes;

        use crate::config::{DatabaseConfig, GeminiConfig, JwtConfig, S3Config};
        use crate::generation::gemini::InlineImage;

        struct FakeStorage;

        #[async_trait]
        impl StorageClient for FakeStorage {
            async fn put_object(&self, _k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
                Ok(())
            }

            fn public_url(&self, key: &str) -> String {
                format!("https://fake.local/{key}")
            }
        }

        struct FakeModel(Option<String>);

        #[async_trait]
        impl GenerativeModel for FakeModel {
            async fn generate_text(&self, _prompt: &str) -> anyhow::Result<Option<String>> {
                Ok(self.0.clone())
            }

            async fn generate_image(&self, _prompt: &str) -> anyhow::Result<Option<InlineImage>> {
                Ok(Some(InlineImage { data: "iVBORw0KGgo=".into() }))
            }
        }

        let config = Arc::new(AppConfig {
            database: DatabaseConfig::Memory,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            s3: S3Config {
                bucket: "fake".into(),
                region: "us-east-1".into(),
                endpoint: None,
                access_key: None,
                secret_key: None,
            },
            gemini: GeminiConfig {
                api_key: "fake".into(),
                base_url: "http://fake.local".into(),
                text_model: "text".into(),
                image_model: "image".into(),
            },
        });

        let database = db::Database::memory();
        Self {
            config,
            users: database.users,
            recipes: database.recipes,
            storage: Arc::new(FakeStorage),
            model: Arc::new(FakeModel(recipe_json.map(Into::into))),
        }
    }
}
