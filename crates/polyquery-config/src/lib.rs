mod config;
mod error;
mod raw;

pub use config::{
    DEFAULT_CONFIG_FILE, LlmConfig, MongoConfig, PolyqueryConfig, PostgresConfig,
    ENV_MONGODB_DATABASE, ENV_MONGODB_URI, ENV_POSTGRES_URL,
};
pub use error::ConfigError;
