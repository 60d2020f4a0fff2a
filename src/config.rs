use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    DynamoDb,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "dynamodb" => Ok(StorageBackend::DynamoDb),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TableNames {
    pub memes: String,
    pub users: String,
    pub counters: String,
}

#[derive(Clone, Debug)] // Clone needed if passed around, Debug for logging
pub struct Config {
    pub bind_address: SocketAddr,
    pub storage_backend: StorageBackend,
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    pub tables: TableNames,
    pub seed_on_start: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::InvalidVar("STORAGE_BACKEND".into(), e))?,
            None => StorageBackend::Memory,
        };

        let aws_region = lookup("AWS_DEFAULT_REGION").unwrap_or_else(|| "ca-central-1".to_string());

        // Allow overriding endpoint for localstack/testing
        let localstack_endpoint = lookup("AWS_ENDPOINT_URL");

        let tables = TableNames {
            memes: lookup("MEMES_TABLE").unwrap_or_else(|| "memes".to_string()),
            users: lookup("USERS_TABLE").unwrap_or_else(|| "users".to_string()),
            counters: lookup("COUNTERS_TABLE").unwrap_or_else(|| "meme_counters".to_string()),
        };

        let seed_on_start = match lookup("SEED_ON_START") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| ConfigError::InvalidVar("SEED_ON_START".into(), raw.clone()))?,
            None => storage_backend == StorageBackend::Memory,
        };

        Ok(Config {
            bind_address,
            storage_backend,
            aws_region,
            localstack_endpoint,
            tables,
            seed_on_start,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
