//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{BackendKind, BulkStrategy, EntityStoreConfig, UpsertStrategy};
use super::secret::secret_string;
use crate::domain::errors::EntityStoreError;
use crate::domain::result::Result;
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "ENTITY_STORE_";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into EntityStoreConfig
/// 4. Applies environment variable overrides (ENTITY_STORE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`EntityStoreError::Configuration`] if the file cannot be read,
/// a referenced variable is unset, parsing fails or validation fails.
///
/// # Examples
///
/// ```no_run
/// use entity_store::config::loader::load_config;
///
/// let config = load_config("entity-store.toml").expect("Failed to load config");
/// println!("{}", config.cosmosdb.collection_link());
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<EntityStoreConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(EntityStoreError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        EntityStoreError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_from_str(&contents)
}

/// Same as [`load_config`] for configuration text already in memory
pub fn load_config_from_str(contents: &str) -> Result<EntityStoreConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: EntityStoreConfig = toml::from_str(&contents)
        .map_err(|e| EntityStoreError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        EntityStoreError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched. Every missing variable is reported
/// in a single error.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| EntityStoreError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut missing_vars: Vec<String> = Vec::new();

    let lines: Vec<String> = input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }
            re.replace_all(line, |cap: &Captures<'_>| match std::env::var(&cap[1]) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|name| name == &cap[1]) {
                        missing_vars.push(cap[1].to_string());
                    }
                    cap[0].to_string()
                }
            })
            .into_owned()
        })
        .collect();

    if !missing_vars.is_empty() {
        return Err(EntityStoreError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}")).ok()
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env(key) {
        Some(val) => val.trim().parse().map(Some).map_err(|_| {
            EntityStoreError::Configuration(format!(
                "Invalid value '{val}' for environment variable {ENV_PREFIX}{key}"
            ))
        }),
        None => Ok(None),
    }
}

fn parse_enum<T: serde::de::DeserializeOwned>(key: &str, val: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(val.trim().to_lowercase())).map_err(|_| {
        EntityStoreError::Configuration(format!(
            "Invalid value '{val}' for environment variable {ENV_PREFIX}{key}"
        ))
    })
}

/// Applies environment variable overrides using the ENTITY_STORE_* prefix
///
/// Variables follow the pattern `ENTITY_STORE_<SECTION>_<KEY>`, for example
/// `ENTITY_STORE_COSMOSDB_ENDPOINT` or `ENTITY_STORE_BULK_MAX_RETRIES`.
fn apply_env_overrides(config: &mut EntityStoreConfig) -> Result<()> {
    if let Some(val) = env("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env("BACKEND") {
        config.backend = parse_enum::<BackendKind>("BACKEND", &val)?;
    }

    // Cosmos DB overrides
    if let Some(val) = env("COSMOSDB_ENDPOINT") {
        config.cosmosdb.endpoint = val;
    }
    if let Some(val) = env("COSMOSDB_KEY") {
        config.cosmosdb.key = secret_string(val);
    }
    if let Some(val) = env("COSMOSDB_DATABASE_ID") {
        config.cosmosdb.database_id = val;
    }
    if let Some(val) = env("COSMOSDB_COLLECTION_ID") {
        config.cosmosdb.collection_id = val;
    }
    if let Some(val) = parse_env("COSMOSDB_OFFER_THROUGHPUT")? {
        config.cosmosdb.offer_throughput = val;
    }
    if let Some(val) = parse_env("COSMOSDB_SCALE_OFFER_THROUGHPUT")? {
        config.cosmosdb.scale_offer_throughput = val;
    }
    if let Some(val) = parse_env("COSMOSDB_REQUEST_TIMEOUT_SECONDS")? {
        config.cosmosdb.request_timeout_seconds = val;
    }

    // Store overrides
    if let Some(val) = parse_env("STORE_QUERY_PAGE_SIZE")? {
        config.store.query_page_size = val;
    }
    if let Some(val) = env("STORE_UPSERT_STRATEGY") {
        config.store.upsert_strategy = parse_enum::<UpsertStrategy>("STORE_UPSERT_STRATEGY", &val)?;
    }
    if let Some(val) = parse_env("STORE_SERIALIZE_UPSERTS")? {
        config.store.serialize_upserts = val;
    }
    if let Some(val) = parse_env("STORE_DEFAULT_RETRY_AFTER_MS")? {
        config.store.default_retry_after_ms = val;
    }

    // Bulk overrides
    if let Some(val) = env("BULK_STRATEGY") {
        config.bulk.strategy = parse_enum::<BulkStrategy>("BULK_STRATEGY", &val)?;
    }
    if let Some(val) = parse_env("BULK_MAX_CONCURRENCY")? {
        config.bulk.max_concurrency = val;
    }
    if let Some(val) = parse_env("BULK_MAX_RETRIES")? {
        config.bulk.max_retries = val;
    }
    if let Some(val) = parse_env("BULK_INITIAL_BACKOFF_MS")? {
        config.bulk.initial_backoff_ms = val;
    }
    if let Some(val) = parse_env("BULK_MAX_BACKOFF_MS")? {
        config.bulk.max_backoff_ms = val;
    }

    // Logging overrides
    if let Some(val) = parse_env("LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Some(val) = env("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env("LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
