use anyhow::{anyhow, bail};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which store backs the user and recipe repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Postgres {
        url: String,
    },
    DynamoDb {
        region: String,
        endpoint: Option<String>,
        users_table: String,
        recipes_table: String,
    },
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub s3: S3Config,
    pub gemini: GeminiConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require =
            |key: &str| get(key).ok_or_else(|| anyhow!("missing environment variable {key}"));

        let backend = get("DB_BACKEND").unwrap_or_else(|| "postgres".into());
        let database = match backend.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseConfig::Postgres {
                url: require("DATABASE_URL")?,
            },
            "dynamodb" | "dynamo" => DatabaseConfig::DynamoDb {
                region: require("AWS_REGION")?,
                endpoint: get("DYNAMODB_ENDPOINT"),
                users_table: get("DYNAMODB_USERS_TABLE").unwrap_or_else(|| "users".into()),
                recipes_table: get("DYNAMODB_RECIPES_TABLE").unwrap_or_else(|| "recipes".into()),
            },
            "memory" => DatabaseConfig::Memory,
            other => bail!("unknown DB_BACKEND {other:?} (expected postgres, dynamodb or memory)"),
        };

        let jwt = JwtConfig {
            secret: require("JWT_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "recipehub".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "recipehub-users".into()),
            ttl_minutes: get("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };

        let s3 = S3Config {
            bucket: require("S3_BUCKET_NAME")?,
            region: require("AWS_REGION")?,
            endpoint: get("S3_ENDPOINT"),
            access_key: get("AWS_ACCESS_KEY_ID"),
            secret_key: get("AWS_SECRET_ACCESS_KEY"),
        };

        let gemini = GeminiConfig {
            api_key: require("GEMINI_API_KEY")?,
            base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".into()),
            text_model: get("GEMINI_TEXT_MODEL").unwrap_or_else(|| "gemini-2.0-flash-001".into()),
            image_model: get("GEMINI_IMAGE_MODEL")
                .unwrap_or_else(|| "gemini-2.0-flash-preview-image-generation".into()),
        };

        Ok(Self {
            database,
            jwt,
            s3,
            gemini,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("JWT_SECRET", "s3cret"),
        ("S3_BUCKET_NAME", "recipes-bucket"),
        ("AWS_REGION", "eu-west-1"),
        ("GEMINI_API_KEY", "key"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        BASE.iter().chain(extra.iter()).copied().collect()
    }

    #[test]
    fn postgres_is_the_default_backend() {
        let cfg = AppConfig::from_lookup(lookup(&with(&[("DATABASE_URL", "postgres://x")])))
            .expect("config");
        assert_eq!(
            cfg.database,
            DatabaseConfig::Postgres {
                url: "postgres://x".into()
            }
        );
        assert_eq!(cfg.jwt.ttl_minutes, 1440);
        assert_eq!(cfg.jwt.issuer, "recipehub");
        assert_eq!(cfg.gemini.text_model, "gemini-2.0-flash-001");
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let err = AppConfig::from_lookup(lookup(BASE)).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn dynamodb_uses_table_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&with(&[("DB_BACKEND", "dynamodb")])))
            .expect("config");
        assert_eq!(
            cfg.database,
            DatabaseConfig::DynamoDb {
                region: "eu-west-1".into(),
                endpoint: None,
                users_table: "users".into(),
                recipes_table: "recipes".into(),
            }
        );
    }

    #[test]
    fn dynamodb_requires_region() {
        let pairs = [
            ("DB_BACKEND", "dynamodb"),
            ("JWT_SECRET", "s"),
            ("S3_BUCKET_NAME", "b"),
            ("GEMINI_API_KEY", "k"),
        ];
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("AWS_REGION"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&with(&[("DB_BACKEND", "sqlite")]))).unwrap_err();
        assert!(err.to_string().contains("sqlite"));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let pairs = with(&[("DB_BACKEND", "memory"), ("JWT_SECRET", "")]);
        // later duplicate wins in the map, so JWT_SECRET becomes empty
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }
}
