use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_PREFIX: &str = "REGGIE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Dynamodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
}

/// Physical table names, derived from a common prefix
#[derive(Debug, Clone, PartialEq)]
pub struct TableNames {
    pub categories: String,
    pub dishes: String,
    pub dish_flavors: String,
    pub setmeals: String,
    pub setmeal_dishes: String,
    pub shopping_carts: String,
    pub orders: String,
    pub order_details: String,
    pub users: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_dish_cache_ttl")]
    pub dish_cache_ttl_seconds: u64,
    /// 0 keeps combo lists until they are invalidated
    #[serde(default)]
    pub setmeal_cache_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_code_ttl")]
    pub code_ttl_seconds: u64,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_trace_sample_ratio")]
    pub trace_sample_ratio: f64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

/// Deserialize one configuration section from `REGGIE_*` environment variables
fn load_section<T: DeserializeOwned>(section: &str) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl Config {
    /// Load every section from the environment and validate the result
    pub fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let config = Config {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            cache: CacheConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            observability: ObservabilityConfig::from_env()?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    /// Self-contained configuration: in-memory storage and cache, defaults elsewhere
    pub fn in_memory() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: default_port(),
                request_timeout_seconds: default_timeout(),
                max_request_size: default_max_request_size(),
            },
            database: DatabaseConfig {
                storage_backend: StorageBackend::Memory,
                region: default_region(),
                table_prefix: default_table_prefix(),
            },
            cache: CacheConfig {
                cache_backend: CacheBackend::Memory,
                redis_url: default_redis_url(),
                dish_cache_ttl_seconds: default_dish_cache_ttl(),
                setmeal_cache_ttl_seconds: 0,
            },
            auth: AuthConfig {
                code_ttl_seconds: default_code_ttl(),
                session_ttl_seconds: default_session_ttl(),
                session_cookie: default_session_cookie(),
            },
            observability: ObservabilityConfig {
                service_name: default_service_name(),
                service_version: default_service_version(),
                otlp_endpoint: None,
                trace_sample_ratio: default_trace_sample_ratio(),
                log_level: default_log_level(),
                enable_json_logging: false,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }

        if self.database.storage_backend == StorageBackend::Dynamodb
            && self.database.table_prefix.trim().is_empty()
        {
            return Err(ConfigError::ValidationError {
                message: "Table prefix cannot be empty".to_string(),
            });
        }

        if self.cache.cache_backend == CacheBackend::Redis
            && !self.cache.redis_url.starts_with("redis://")
            && !self.cache.redis_url.starts_with("rediss://")
        {
            return Err(ConfigError::ValidationError {
                message: format!("Invalid Redis URL: {}", self.cache.redis_url),
            });
        }

        if !(0.0..=1.0).contains(&self.observability.trace_sample_ratio) {
            return Err(ConfigError::ValidationError {
                message: "Trace sample ratio must be between 0 and 1".to_string(),
            });
        }

        if self.auth.code_ttl_seconds == 0 || self.auth.session_ttl_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Auth TTLs cannot be 0".to_string(),
            });
        }

        if self.auth.session_cookie.is_empty()
            || !self
                .auth
                .session_cookie
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::ValidationError {
                message: format!("Invalid session cookie name: {}", self.auth.session_cookie),
            });
        }

        Ok(())
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("server")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("database")
    }

    pub fn table_names(&self) -> TableNames {
        TableNames::with_prefix(&self.table_prefix)
    }

    /// Build a DynamoDB client for the configured region
    pub async fn dynamodb_client(&self) -> DynamoDbClient {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(self.region.clone()))
            .load()
            .await;
        DynamoDbClient::new(&aws_config)
    }
}

impl TableNames {
    pub fn with_prefix(prefix: &str) -> Self {
        let name = |suffix: &str| format!("{}{}", prefix, suffix);
        Self {
            categories: name("Categories"),
            dishes: name("Dishes"),
            dish_flavors: name("DishFlavors"),
            setmeals: name("Setmeals"),
            setmeal_dishes: name("SetmealDishes"),
            shopping_carts: name("ShoppingCarts"),
            orders: name("Orders"),
            order_details: name("OrderDetails"),
            users: name("Users"),
        }
    }
}

impl CacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("cache")
    }

    pub fn dish_ttl(&self) -> Option<Duration> {
        ttl(self.dish_cache_ttl_seconds)
    }

    pub fn setmeal_ttl(&self) -> Option<Duration> {
        ttl(self.setmeal_cache_ttl_seconds)
    }
}

fn ttl(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("auth")
    }

    pub fn code_ttl(&self) -> Duration {
        Duration::from_secs(self.code_ttl_seconds)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }
}

impl ObservabilityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("observability")
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_storage_backend() -> StorageBackend {
    StorageBackend::Dynamodb
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_table_prefix() -> String {
    "Reggie".to_string()
}

pub(crate) fn default_cache_backend() -> CacheBackend {
    CacheBackend::Redis
}

pub(crate) fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

pub(crate) fn default_dish_cache_ttl() -> u64 {
    60 * 60
}

pub(crate) fn default_code_ttl() -> u64 {
    5 * 60
}

pub(crate) fn default_session_ttl() -> u64 {
    30 * 60
}

pub(crate) fn default_session_cookie() -> String {
    "REGGIE_SESSION".to_string()
}

pub(crate) fn default_service_name() -> String {
    "reggie-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_trace_sample_ratio() -> f64 {
    1.0
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
