use std::path::Path;
use std::time::Duration;

use polyquery_core::{KNOWN_BACKENDS, POSTGRES};
use tracing::debug;

use crate::error::ConfigError;
use crate::raw::{RawConfig, RawLlm};

pub const DEFAULT_CONFIG_FILE: &str = "polyquery.toml";

pub const ENV_POSTGRES_URL: &str = "POLYQUERY_POSTGRES_URL";
pub const ENV_MONGODB_URI: &str = "POLYQUERY_MONGODB_URI";
pub const ENV_MONGODB_DATABASE: &str = "POLYQUERY_MONGODB_DATABASE";

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MONGODB_DATABASE: &str = "polyquery";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    model: String,
    endpoint: String,
    api_key_env: String,
    max_retries: u32,
    timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl LlmConfig {
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Name of the environment variable holding the API key.
    #[must_use]
    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    /// Extra attempts after the first; `0` means a single attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn from_raw(raw: RawLlm) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout_secs = raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            model: non_empty("llm.model", raw.model)?.unwrap_or(defaults.model),
            endpoint: non_empty("llm.endpoint", raw.endpoint)?.unwrap_or(defaults.endpoint),
            api_key_env: non_empty("llm.api_key_env", raw.api_key_env)?
                .unwrap_or(defaults.api_key_env),
            max_retries: raw.max_retries.unwrap_or(defaults.max_retries),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    url: String,
}

impl PostgresConfig {
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    uri: String,
    database: String,
}

impl MongoConfig {
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }
}

/// Validated configuration. Backends without a section are not registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolyqueryConfig {
    default_backend: String,
    llm: LlmConfig,
    postgres: Option<PostgresConfig>,
    mongodb: Option<MongoConfig>,
}

impl Default for PolyqueryConfig {
    fn default() -> Self {
        Self {
            default_backend: POSTGRES.to_string(),
            llm: LlmConfig::default(),
            postgres: None,
            mongodb: None,
        }
    }
}

impl PolyqueryConfig {
    /// Reads, parses and validates the file at `path`, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a value
    /// is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_raw(raw, |name| std::env::var(name).ok())
    }

    /// Configuration from defaults and the process environment only.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment override is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_raw(RawConfig::default(), |name| std::env::var(name).ok())
    }

    /// Parses TOML text, taking overrides from `env` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or a value is invalid.
    pub fn from_toml_str(
        content: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: Path::new("<inline>").to_path_buf(),
            source,
        })?;
        Self::from_raw(raw, env)
    }

    fn from_raw(
        raw: RawConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let default_backend = non_empty("default_backend", raw.default_backend)?
            .map_or_else(|| POSTGRES.to_string(), |backend| backend.to_ascii_lowercase());
        if !KNOWN_BACKENDS.contains(&default_backend.as_str()) {
            return Err(ConfigError::UnknownBackend {
                backend: default_backend,
                expected: KNOWN_BACKENDS.join(", "),
            });
        }

        let llm = LlmConfig::from_raw(raw.llm.unwrap_or_default())?;

        let postgres_url = match env(ENV_POSTGRES_URL) {
            Some(url) => Some(url),
            None => raw.postgres.and_then(|postgres| postgres.url),
        };
        let postgres = non_empty("postgres.url", postgres_url)?.map(|url| PostgresConfig { url });

        let (file_uri, file_database) = raw
            .mongodb
            .map(|mongo| (mongo.uri, mongo.database))
            .unwrap_or_default();
        let mongo_uri = non_empty("mongodb.uri", env(ENV_MONGODB_URI).or(file_uri))?;
        let mongo_database =
            non_empty("mongodb.database", env(ENV_MONGODB_DATABASE).or(file_database))?;
        let mongodb = mongo_uri.map(|uri| MongoConfig {
            uri,
            database: mongo_database.unwrap_or_else(|| DEFAULT_MONGODB_DATABASE.to_string()),
        });

        Ok(Self {
            default_backend,
            llm,
            postgres,
            mongodb,
        })
    }

    #[must_use]
    pub fn default_backend(&self) -> &str {
        &self.default_backend
    }

    #[must_use]
    pub fn llm(&self) -> &LlmConfig {
        &self.llm
    }

    #[must_use]
    pub fn postgres(&self) -> Option<&PostgresConfig> {
        self.postgres.as_ref()
    }

    #[must_use]
    pub fn mongodb(&self) -> Option<&MongoConfig> {
        self.mongodb.as_ref()
    }
}

fn non_empty(field: &'static str, value: Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use polyquery_core::MONGODB;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn empty_file_uses_defaults() -> anyhow::Result<()> {
        let config = PolyqueryConfig::from_toml_str("", no_env)?;

        assert_eq!(config, PolyqueryConfig::default());
        assert_eq!(config.llm().model(), "gemini-2.5-flash");
        assert_eq!(config.llm().max_retries(), 3);
        assert_eq!(config.llm().timeout(), Duration::from_secs(30));
        assert!(config.postgres().is_none());
        assert!(config.mongodb().is_none());
        Ok(())
    }

    #[test]
    fn full_file_is_read() -> anyhow::Result<()> {
        let config = PolyqueryConfig::from_toml_str(
            r#"
default_backend = "MongoDB"

[llm]
model = "gemini-2.5-pro"
api_key_env = "MY_KEY"
max_retries = 0
timeout_secs = 5

[postgres]
url = "postgres://localhost/app"

[mongodb]
uri = "mongodb://localhost:27017"
database = "app"
"#,
            no_env,
        )?;

        assert_eq!(config.default_backend(), MONGODB);
        assert_eq!(config.llm().model(), "gemini-2.5-pro");
        assert_eq!(config.llm().api_key_env(), "MY_KEY");
        assert_eq!(config.llm().max_retries(), 0);
        assert_eq!(
            config.postgres().map(PostgresConfig::url),
            Some("postgres://localhost/app")
        );
        let mongodb = config.mongodb().expect("mongodb section");
        assert_eq!(mongodb.uri(), "mongodb://localhost:27017");
        assert_eq!(mongodb.database(), "app");
        Ok(())
    }

    #[test]
    fn environment_overrides_file() -> anyhow::Result<()> {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_POSTGRES_URL, "postgres://override/db"),
            (ENV_MONGODB_URI, "mongodb://override"),
        ]);

        let config = PolyqueryConfig::from_toml_str(
            "[postgres]\nurl = \"postgres://file/db\"\n",
            |name| env.get(name).map(ToString::to_string),
        )?;

        assert_eq!(
            config.postgres().map(PostgresConfig::url),
            Some("postgres://override/db")
        );
        let mongodb = config.mongodb().expect("mongodb from env");
        assert_eq!(mongodb.uri(), "mongodb://override");
        assert_eq!(mongodb.database(), "polyquery");
        Ok(())
    }

    #[test]
    fn unknown_default_backend_is_rejected() {
        let err = PolyqueryConfig::from_toml_str("default_backend = \"oracle\"", no_env)
            .expect_err("oracle is not a backend");

        assert!(matches!(err, ConfigError::UnknownBackend { ref backend, .. } if backend == "oracle"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = PolyqueryConfig::from_toml_str("[llm]\ntimeout_secs = 0", no_env)
            .expect_err("zero timeout");

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "llm.timeout_secs",
                ..
            }
        ));
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = PolyqueryConfig::from_toml_str("[postgres]\nurl = \"  \"", no_env)
            .expect_err("blank url");

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "postgres.url",
                ..
            }
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PolyqueryConfig::from_toml_str("[llm]\nmodle = \"typo\"", no_env)
            .expect_err("typo in key");

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "default_backend = \"postgres\"\n[llm]\nmax_retries = 1\n")?;

        let config = PolyqueryConfig::load(&path)?;

        assert_eq!(config.llm().max_retries(), 1);
        Ok(())
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("create temp dir");

        let err = PolyqueryConfig::load(&dir.path().join("absent.toml")).expect_err("no file");

        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
