//! Configuration loader
//!
//! Handles loading configuration from various sources including
//! TOML files, environment variables, and default values.
//!
//! Uses Figment for configuration management (migrated from config crate in v0.1.2).

use crate::config::AppConfig;
use crate::constants::*;
use crate::error_ext::ErrorContext;
use crate::logging::log_config_loaded;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use mcb_domain::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader service
#[derive(Clone)]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: Option<PathBuf>,

    /// Environment prefix
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Set the configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources
    ///
    /// Configuration sources are merged in this order (later sources override earlier):
    /// 1. Default values from `AppConfig::default()`
    /// 2. TOML configuration file (`--config` / `CONFIG_PATH`, falling back to well-known paths)
    /// 3. Environment variables with prefix (e.g., `MCB_POSTGRES_DSN`)
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if let Some(config_path) = &self.config_path {
            if config_path.exists() {
                figment = figment.merge(Toml::file(config_path));
                log_config_loaded(config_path, true);
            } else {
                log_config_loaded(config_path, false);
            }
        } else if let Some(default_path) = Self::find_default_config_path() {
            figment = figment.merge(Toml::file(&default_path));
            log_config_loaded(&default_path, true);
        }

        // Uses underscore as separator for nested keys (e.g., MCB_POSTGRES_DSN -> postgres.dsn)
        figment = figment.merge(Env::prefixed(&format!("{}_", self.env_prefix)).split("_"));

        let app_config: AppConfig = figment
            .extract()
            .context("Failed to extract configuration")?;

        validate_app_config(&app_config)?;

        Ok(app_config)
    }

    /// Reload configuration (useful for hot-reloading)
    pub fn reload(&self) -> Result<AppConfig> {
        self.load()
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &AppConfig, path: P) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the current configuration file path
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Find default configuration file paths to try
    fn find_default_config_path() -> Option<PathBuf> {
        if let Ok(env_path) = env::var("CONFIG_PATH") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let current_dir = env::current_dir().ok()?;

        let candidates = vec![
            current_dir.join(DEFAULT_CONFIG_FILENAME),
            current_dir
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME),
            dirs::config_dir()
                .map(|d| d.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|d| {
                    d.join(format!(".{}", DEFAULT_CONFIG_DIR))
                        .join(DEFAULT_CONFIG_FILENAME)
                })
                .unwrap_or_default(),
        ];

        candidates.into_iter().find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail-fast validation of required fields, per the external-interfaces contract:
/// `postgres.dsn` is always required; `auth.admin_user`/`admin_password` are
/// required once `auth.enabled` is set.
fn validate_app_config(config: &AppConfig) -> Result<()> {
    if config.postgres.dsn.trim().is_empty() {
        return Err(Error::configuration("postgres.dsn is required"));
    }

    if config.auth.enabled {
        if config.auth.admin_user.trim().is_empty() {
            return Err(Error::configuration(
                "auth.admin_user is required when auth.enabled is true",
            ));
        }
        if config.auth.admin_password.is_empty() {
            return Err(Error::configuration(
                "auth.admin_password is required when auth.enabled is true",
            ));
        }
    }

    if config.vector_store.dim == 0 {
        return Err(Error::configuration(
            "vector_store.dim must be greater than 0",
        ));
    }

    for source in &config.sources {
        if source.name.trim().is_empty() {
            return Err(Error::configuration(
                "every entry in sources[] requires a non-empty name",
            ));
        }
        if source.pg.table.trim().is_empty() {
            return Err(Error::configuration(format!(
                "sources[{}].pg.table is required",
                source.name
            )));
        }
    }

    Ok(())
}

/// Configuration builder for programmatic configuration, mainly used by tests.
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with defaults
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Set the postgres DSN.
    pub fn with_postgres_dsn(mut self, dsn: impl Into<String>) -> Self {
        self.config.postgres.dsn = dsn.into();
        self
    }

    /// Set authentication configuration
    pub fn with_auth(mut self, auth: crate::config::AuthConfig) -> Self {
        self.config.auth = auth;
        self
    }

    /// Set logging configuration
    pub fn with_logging(mut self, logging: crate::config::LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Add a source.
    pub fn with_source(mut self, source: crate::config::SourceConfig) -> Self {
        self.config.sources.push(source);
        self
    }

    /// Build the configuration
    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dsn_fails_validation() {
        let config = AppConfig::default();
        assert!(validate_app_config(&config).is_err());
    }

    #[test]
    fn dsn_alone_passes_validation() {
        let config = ConfigBuilder::new()
            .with_postgres_dsn("postgres://localhost/catalog")
            .build();
        assert!(validate_app_config(&config).is_ok());
    }

    #[test]
    fn auth_enabled_without_admin_password_fails() {
        let mut auth = crate::config::AuthConfig::default();
        auth.enabled = true;
        auth.admin_password = String::new();
        let config = ConfigBuilder::new()
            .with_postgres_dsn("postgres://localhost/catalog")
            .with_auth(auth)
            .build();
        assert!(validate_app_config(&config).is_err());
    }

    #[test]
    fn auth_enabled_with_credentials_passes() {
        let mut auth = crate::config::AuthConfig::default();
        auth.enabled = true;
        auth.admin_password = "secret".to_string();
        let config = ConfigBuilder::new()
            .with_postgres_dsn("postgres://localhost/catalog")
            .with_auth(auth)
            .build();
        assert!(validate_app_config(&config).is_ok());
    }

    #[test]
    fn source_without_table_fails() {
        let mut source = crate::config::SourceConfig::default();
        source.name = "movies".to_string();
        let config = ConfigBuilder::new()
            .with_postgres_dsn("postgres://localhost/catalog")
            .with_source(source)
            .build();
        assert!(validate_app_config(&config).is_err());
    }
}
