//! Tracing setup for the Growth Guard server.
//!
//! Console output is always on. When built with the `loki` feature and
//! `LOKI_ENABLED` is set, events are also shipped to Loki under `service`
//! and `environment` labels, with the crate version as an extra field.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_SERVICE_NAME: &str = "growth-guard";
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_LOG_FILTER: &str = "info,growth_guard=debug,sqlx=warn,tower_http=info";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    /// `EnvFilter` directives, from `RUST_LOG`.
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let loki_enabled = lookup("LOKI_ENABLED")
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            loki_enabled,
            loki_url: lookup("LOKI_URL").filter(|url| !url.trim().is_empty()),
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err("LOKI_ENABLED is true but LOKI_URL is not set".to_string());
        }
        Ok(())
    }

    /// Parses the filter up front so a typo in `RUST_LOG` fails startup
    /// instead of silently dropping directives.
    fn filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error>> {
        EnvFilter::try_new(&self.log_level)
            .map_err(|e| format!("invalid RUST_LOG '{}': {}", self.log_level, e).into())
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    #[cfg(feature = "loki")]
    {
        if config.loki_enabled {
            if let Some(loki_url) = config.loki_url.clone() {
                return init_with_loki(config, &loki_url);
            }
        }
    }

    let loki_requested = config.loki_enabled;
    init_console_only(config)?;
    if loki_requested {
        tracing::warn!("LOKI_ENABLED is set but this build lacks the `loki` feature");
    }
    Ok(())
}

fn init_console_only(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(config.filter()?)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;

    tracing::info!(
        "📊 Console logging initialized for {} ({})",
        config.service_name,
        config.environment
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: LoggingConfig, loki_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = url::Url::parse(loki_url)?;

    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .extra_field("version", env!("CARGO_PKG_VERSION"))?
        .build_url(url)?;

    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(config.filter()?)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(loki_layer)
        .try_init()?;

    tracing::info!(
        "✅ Loki logging initialized at {} for {} ({})",
        loki_url,
        config.service_name,
        config.environment
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> LoggingConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoggingConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert!(!config.loki_enabled);
        assert_eq!(config.service_name, "growth-guard");
        assert_eq!(config.environment, "development");
        assert!(config.filter().is_ok());
    }

    #[test]
    fn test_loki_requires_url() {
        assert!(config_from(&[("LOKI_ENABLED", "true")]).validate().is_err());
        assert!(config_from(&[("LOKI_ENABLED", "true"), ("LOKI_URL", "  ")])
            .validate()
            .is_err());
        assert!(config_from(&[("LOKI_ENABLED", "1"), ("LOKI_URL", "http://localhost:3100")])
            .validate()
            .is_ok());
        assert!(config_from(&[("LOKI_ENABLED", "nope")]).validate().is_ok());
    }

    #[test]
    fn test_bad_filter_is_reported() {
        let config = config_from(&[("RUST_LOG", "growth_guard=loud")]);
        assert!(config.filter().is_err());
    }
}
