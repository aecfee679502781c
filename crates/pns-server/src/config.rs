//! Configuration for the registry service.

use anyhow::{Context, Result};
use pns_core::{Address, ClaimPolicy, ConfigurationAuthority, DurationBinding, Durations};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Registry policy configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Snapshot storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Initial nominal lifetime of a record (admins may change it at runtime)
    #[serde(default = "default_expiry", with = "humantime_serde")]
    pub expiry_duration: Duration,

    /// Initial grace window after expiry
    #[serde(default = "default_grace", with = "humantime_serde")]
    pub grace_duration: Duration,

    /// `live` applies config changes to existing records, `snapshot` pins them
    #[serde(default)]
    pub duration_binding: DurationBinding,

    /// Whether claiming an expired record needs a fresh phone verification
    #[serde(default)]
    pub claim_requires_verification: bool,

    /// Comma-separated administrator addresses
    #[serde(default)]
    pub admins: String,

    /// Number of recent events kept for the events endpoint
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the registry snapshot file
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, registry is in-memory only)
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Secret the snapshot encryption key is derived from (plain JSON if unset)
    #[serde(default)]
    pub encryption_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            expiry_duration: default_expiry(),
            grace_duration: default_grace(),
            duration_binding: DurationBinding::default(),
            claim_requires_verification: false,
            admins: String::new(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            persist: true,
            encryption_secret: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8090
}

fn default_expiry() -> Duration {
    Duration::from_secs(pns_core::lifecycle::DEFAULT_EXPIRY_SECS)
}

fn default_grace() -> Duration {
    Duration::from_secs(pns_core::lifecycle::DEFAULT_GRACE_SECS)
}

fn default_event_capacity() -> usize {
    1_000
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("/data/pns-registry.json")
}

fn default_true() -> bool {
    true
}

fn default_global_rpm() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

impl RegistryConfig {
    /// Parse the configured administrator list.
    pub fn admin_addresses(&self) -> Result<Vec<Address>> {
        self.admins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Address>()
                    .with_context(|| format!("Invalid admin address: {}", s))
            })
            .collect()
    }

    /// Configuration a fresh registry starts with.
    pub fn authority(&self) -> ConfigurationAuthority {
        ConfigurationAuthority::new(
            Durations {
                expiry: self.expiry_duration.as_secs(),
                grace: self.grace_duration.as_secs(),
            },
            self.duration_binding,
            ClaimPolicy {
                require_verification: self.claim_requires_verification,
            },
        )
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults() {
        let config = RegistryConfig::default();
        let authority = config.authority();

        assert_eq!(authority.durations(), Durations::default());
        assert_eq!(authority.binding(), DurationBinding::Snapshot);
        assert!(!authority.claim_policy().require_verification);
    }

    #[test]
    fn test_admin_addresses_parsing() {
        let config = RegistryConfig {
            admins: " 0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266 , ,0x0000000000000000000000000000000000000001"
                .into(),
            ..Default::default()
        };

        let admins = config.admin_addresses().unwrap();
        assert_eq!(admins.len(), 2);
        assert_eq!(
            admins[0].to_string(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_admin_addresses_rejects_garbage() {
        let config = RegistryConfig {
            admins: "not-an-address".into(),
            ..Default::default()
        };

        assert!(config.admin_addresses().is_err());
    }

    #[test]
    fn test_humantime_durations_deserialize() {
        let json = r#"{
            "expiry_duration": "730days",
            "grace_duration": "30days",
            "duration_binding": "live"
        }"#;

        let config: RegistryConfig = serde_json::from_str(json).unwrap();
        let authority = config.authority();

        assert_eq!(authority.durations().expiry, 63_072_000);
        assert_eq!(authority.durations().grace, 2_592_000);
        assert_eq!(authority.binding(), DurationBinding::Live);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.server.port, 8090);
        assert!(config.storage.persist);
        assert!(config.storage.encryption_secret.is_none());
        assert_eq!(config.rate_limit.global_per_minute, 60);
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn test_log_format_deserialize() {
        let log: LogConfig = serde_json::from_str(r#"{"format": "json"}"#).unwrap();

        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.level, "info");
    }
}
