//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The configuration file path defaults to `config.yaml` but can
//! be specified via `-f` flag or the `AGENTCOST_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources
//! override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `AGENTCOST_`
//!    override YAML values. For nested values use double underscores, e.g.
//!    `AGENTCOST_PRICING__UNKNOWN_MODEL_POLICY=accept`.
//!
//! ## Example
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 8300
//! admin_token: change-me
//! database:
//!   path: data/agentcost.db
//! pricing:
//!   unknown_model_policy: reject
//!   sync_on_startup: true
//! analytics:
//!   max_window_days: 365
//! ingest:
//!   max_batch_size: 1000
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "AGENTCOST_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Bearer token for operator endpoints (project provisioning, pricing
    /// mutation). Required.
    pub admin_token: Option<String>,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Pricing table configuration
    pub pricing: PricingConfig,
    /// Analytics query limits
    pub analytics: AnalyticsConfig,
    /// Event ingestion limits
    pub ingest: IngestConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8300,
            admin_token: None,
            database: DatabaseConfig::default(),
            pricing: PricingConfig::default(),
            analytics: AnalyticsConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file (created if missing)
    pub path: PathBuf,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("agentcost.db"),
            max_connections: 5,
        }
    }
}

/// What to do with an event whose model has no applicable price quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownModelPolicy {
    /// Reject the event with an `unknown_pricing` error (default)
    Reject,
    /// Store the event with a NULL cost (unknown, distinct from zero)
    Accept,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    /// Policy for events naming a model with no applicable quote
    pub unknown_model_policy: UnknownModelPolicy,
    /// Optional remote catalog URL; the embedded catalog is the fallback
    pub catalog_url: Option<Url>,
    /// Sync the default catalog into the pricing table on startup
    pub sync_on_startup: bool,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            unknown_model_policy: UnknownModelPolicy::Reject,
            catalog_url: None,
            sync_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Maximum aggregation window span in days
    pub max_window_days: i64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self { max_window_days: 366 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Maximum number of events accepted in one batch
    pub max_batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { max_batch_size: 1000 }
    }
}

impl Config {
    fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("AGENTCOST_").split("__"))
    }

    /// Load configuration from the YAML file and environment overrides.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.admin_token.as_deref().map(str::is_empty).unwrap_or(true) {
            return Err(Error::Internal {
                operation: "Config validation: admin_token is not configured. \
                            Set AGENTCOST_ADMIN_TOKEN or add admin_token to the config file."
                    .to_string(),
            });
        }
        if self.analytics.max_window_days < 1 {
            return Err(Error::Internal {
                operation: "Config validation: analytics.max_window_days must be at least 1".to_string(),
            });
        }
        if self.ingest.max_batch_size < 1 {
            return Err(Error::Internal {
                operation: "Config validation: ingest.max_batch_size must be at least 1".to_string(),
            });
        }
        if let Some(url) = &self.pricing.catalog_url
            && !matches!(url.scheme(), "http" | "https")
        {
            return Err(Error::Internal {
                operation: format!("Config validation: unsupported catalog_url scheme '{}'", url.scheme()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            admin_token: Some("test-token".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn default_config_needs_an_admin_token() {
        assert!(Config::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn env_overrides_nested_fields() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "admin_token: from-file\nport: 9000\n")?;
            jail.set_env("AGENTCOST_PRICING__UNKNOWN_MODEL_POLICY", "accept");
            jail.set_env("AGENTCOST_PORT", "9100");

            let args = Args {
                config: "config.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");
            assert_eq!(config.port, 9100);
            assert_eq!(config.pricing.unknown_model_policy, UnknownModelPolicy::Accept);
            assert_eq!(config.admin_token.as_deref(), Some("from-file"));
            Ok(())
        });
    }

    #[test]
    fn rejects_bad_window_limit() {
        let mut config = valid_config();
        config.analytics.max_window_days = 0;
        assert!(config.validate().is_err());
    }
}
