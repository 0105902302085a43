//! Configuration management for Omnicast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the backend that proxies platform uploads and publishes
    pub api_base_url: String,
    /// Base URL of the Facebook Graph API (overridable for testing)
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    pub storage: StorageConfig,
    pub facebook: FacebookAppConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON key-value store holding session credentials
    pub path: String,
}

/// App-level Facebook credentials used for token exchange and introspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookAppConfig {
    pub app_id: String,
    pub app_secret: String,
}

/// Per-platform OAuth client settings for flows that start client-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Redirect URI base; callbacks land at `{redirect_base}/auth/{platform}/callback`
    #[serde(default = "default_redirect_base")]
    pub redirect_base: String,
    #[serde(default)]
    pub client_ids: std::collections::HashMap<String, String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            redirect_base: default_redirect_base(),
            client_ids: std::collections::HashMap::new(),
        }
    }
}

/// Token refresh tuning. The 7-day threshold and 24-hour check period carry
/// no strong rationale, so both are configuration rather than invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_threshold_days")]
    pub threshold_days: i64,
    #[serde(default = "default_check_interval_hours")]
    pub check_interval_hours: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            threshold_days: default_threshold_days(),
            check_interval_hours: default_check_interval_hours(),
        }
    }
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

fn default_redirect_base() -> String {
    "http://localhost:3000".to_string()
}

fn default_threshold_days() -> i64 {
    7
}

fn default_check_interval_hours() -> u64 {
    24
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            graph_base_url: default_graph_base_url(),
            storage: StorageConfig {
                path: "~/.local/share/omnicast/session.json".to_string(),
            },
            facebook: FacebookAppConfig {
                app_id: String::new(),
                app_secret: String::new(),
            },
            oauth: OAuthConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }

    /// OAuth client id configured for a platform, if any
    pub fn client_id(&self, platform: crate::registry::PlatformId) -> Option<&str> {
        self.oauth.client_ids.get(platform.as_str()).map(String::as_str)
    }

    /// Redirect URI for a platform's OAuth callback
    pub fn redirect_uri(&self, platform: crate::registry::PlatformId) -> String {
        format!("{}/auth/{}/callback", self.oauth.redirect_base, platform.as_str())
    }

    /// Storage path with tilde expansion applied
    pub fn expand_storage_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage.path).to_string())
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("OMNICAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("omnicast").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PlatformId;

    #[test]
    fn test_default_config_values() {
        let config = Config::default_config();
        assert_eq!(config.refresh.threshold_days, 7);
        assert_eq!(config.refresh.check_interval_hours, 24);
        assert!(config.graph_base_url.contains("graph.facebook.com"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
            api_base_url = "https://api.example.com"

            [storage]
            path = "/tmp/omnicast.json"

            [facebook]
            app_id = "123"
            app_secret = "secret"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.refresh.threshold_days, 7);
        assert!(config.oauth.client_ids.is_empty());
    }

    #[test]
    fn test_parse_refresh_overrides() {
        let toml = r#"
            api_base_url = "https://api.example.com"

            [storage]
            path = "/tmp/omnicast.json"

            [facebook]
            app_id = "123"
            app_secret = "secret"

            [refresh]
            threshold_days = 3
            check_interval_hours = 6
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.refresh.threshold_days, 3);
        assert_eq!(config.refresh.check_interval_hours, 6);
    }

    #[test]
    fn test_redirect_uri() {
        let config = Config::default_config();
        assert_eq!(
            config.redirect_uri(PlatformId::Facebook),
            "http://localhost:3000/auth/facebook/callback"
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_config_path_env_override() {
        std::env::set_var("OMNICAST_CONFIG", "/tmp/omnicast-test.toml");
        let path = resolve_config_path().unwrap();
        assert_eq!(path, PathBuf::from("/tmp/omnicast-test.toml"));
        std::env::remove_var("OMNICAST_CONFIG");
    }

    #[test]
    fn test_client_id_lookup() {
        let mut config = Config::default_config();
        config
            .oauth
            .client_ids
            .insert("linkedin".to_string(), "client-1".to_string());
        assert_eq!(config.client_id(PlatformId::LinkedIn), Some("client-1"));
        assert_eq!(config.client_id(PlatformId::TikTok), None);
    }
}
