//! Configuration management for the notebook images API
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use notebook_images_common::Correlation;
use std::env;
use std::str::FromStr;

/// Where records are read from and written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Kubernetes API of the current cluster context
    Kube,
    /// In-process store, for local development
    Memory,
}

impl FromStr for StoreMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kube" | "kubernetes" => Ok(StoreMode::Kube),
            "memory" | "mock" => Ok(StoreMode::Memory),
            other => anyhow::bail!("Invalid STORE_MODE: {} (expected kube or memory)", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Namespace holding build intents and image streams
    pub namespace: String,

    pub store_mode: StoreMode,

    /// How produced images are joined to build intents
    pub correlation: Correlation,

    /// Users allowed to mutate records
    pub admin_users: Vec<String>,

    /// Groups whose members may mutate records
    pub admin_groups: Vec<String>,
}

fn list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            namespace: env::var("NAMESPACE").unwrap_or_else(|_| "opendatahub".to_string()),

            store_mode: env::var("STORE_MODE")
                .unwrap_or_else(|_| "kube".to_string())
                .parse()?,

            correlation: env::var("CORRELATION_MODE")
                .unwrap_or_else(|_| "foreign-key".to_string())
                .parse()
                .map_err(anyhow::Error::msg)
                .context("Invalid CORRELATION_MODE")?,

            admin_users: list(&env::var("ADMIN_USERS").unwrap_or_default()),

            admin_groups: list(&env::var("ADMIN_GROUPS").unwrap_or_else(|_| "odh-admins".to_string())),
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.namespace.trim().is_empty() {
            anyhow::bail!("NAMESPACE must not be empty");
        }

        if self.admin_users.is_empty() && self.admin_groups.is_empty() {
            tracing::warn!("No ADMIN_USERS or ADMIN_GROUPS configured, mutating routes are closed");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api_host: "127.0.0.1".to_string(),
            api_port: 9000,
            namespace: "opendatahub".to_string(),
            store_mode: StoreMode::Memory,
            correlation: Correlation::ForeignKey,
            admin_users: vec![],
            admin_groups: vec!["odh-admins".to_string()],
        }
    }

    #[test]
    fn test_config_defaults() {
        // Clear any existing environment variables
        for var in [
            "API_HOST",
            "API_PORT",
            "NAMESPACE",
            "STORE_MODE",
            "CORRELATION_MODE",
            "ADMIN_USERS",
            "ADMIN_GROUPS",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env().expect("Failed to load config");

        assert_eq!(config.api_host, "0.0.0.0");
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.namespace, "opendatahub");
        assert_eq!(config.store_mode, StoreMode::Kube);
        assert_eq!(config.correlation, Correlation::ForeignKey);
        assert!(config.admin_users.is_empty());
        assert_eq!(config.admin_groups, vec!["odh-admins"]);
    }

    #[test]
    fn test_api_address() {
        assert_eq!(config().api_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_validate_invalid_port() {
        let config = Config {
            api_port: 0,
            ..config()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("API_PORT must be greater than 0"));
    }

    #[test]
    fn test_parse_lists_and_modes() {
        assert_eq!(list(" alice, ,bob "), vec!["alice", "bob"]);
        assert_eq!("memory".parse::<StoreMode>().unwrap(), StoreMode::Memory);
        assert!("etcd".parse::<StoreMode>().is_err());
    }
}
