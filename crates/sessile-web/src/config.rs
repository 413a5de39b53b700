//! TOML configuration for the session front end.
//!
//! ```toml
//! [store]
//! sweep_interval_secs = 60
//! idle_timeout_secs = 1800
//!
//! [cookie]
//! name = "sessile"
//! path = "/"
//! http_only = true
//! secure = true
//! same_site = "lax"
//!
//! [token]
//! length_bytes = 64
//! ```
//!
//! Every section and field is optional; missing values fall back to defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sessile_store::{DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL, DEFAULT_TOKEN_BYTES, StoreConfig};

use crate::error::ConfigError;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "sessile";

/// Fewest random bytes a session token may carry.
pub const MIN_TOKEN_BYTES: usize = 16;

/// Characters RFC 6265 forbids in a cookie name besides controls and spaces.
const COOKIE_NAME_SEPARATORS: &str = "()<>@,;:\\\"/[]?={}";

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessileConfig {
    /// Registry and eviction settings.
    pub store: StoreSection,
    /// Session cookie attributes.
    pub cookie: CookieConfig,
    /// Token generation settings.
    pub token: TokenSection,
}

impl SessileConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: SessileConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the store cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.sweep_interval_secs == 0 {
            return Err(invalid("store.sweep_interval_secs", "must be at least 1"));
        }
        if self.store.idle_timeout_secs == 0 {
            return Err(invalid("store.idle_timeout_secs", "must be at least 1"));
        }
        if self.token.length_bytes < MIN_TOKEN_BYTES {
            return Err(invalid(
                "token.length_bytes",
                &format!("must be at least {MIN_TOKEN_BYTES}"),
            ));
        }
        self.cookie.validate()
    }

    /// Store settings as a [`StoreConfig`].
    pub fn store_config(&self) -> StoreConfig {
        self.store.to_store_config()
    }
}

/// Load configuration from a TOML file.
pub fn load_config_file(path: &Path) -> Result<SessileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    SessileConfig::from_toml(&contents)
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Seconds between eviction sweeps.
    pub sweep_interval_secs: u64,
    /// Seconds without access before a session is evicted.
    pub idle_timeout_secs: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
        }
    }
}

impl StoreSection {
    fn to_store_config(&self) -> StoreConfig {
        StoreConfig::new()
            .with_sweep_interval(Duration::from_secs(self.sweep_interval_secs))
            .with_idle_timeout(Duration::from_secs(self.idle_timeout_secs))
    }
}

/// `[token]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSection {
    /// Random bytes per session id before encoding.
    pub length_bytes: usize,
}

impl Default for TokenSection {
    fn default() -> Self {
        Self {
            length_bytes: DEFAULT_TOKEN_BYTES,
        }
    }
}

/// `SameSite` attribute applied to the session cookie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    #[default]
    Lax,
    Strict,
    None,
}

impl From<SameSitePolicy> for cookie::SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Lax => cookie::SameSite::Lax,
            SameSitePolicy::Strict => cookie::SameSite::Strict,
            SameSitePolicy::None => cookie::SameSite::None,
        }
    }
}

/// `[cookie]` section: attributes of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Cookie name.
    pub name: String,
    /// Cookie path scope.
    pub path: String,
    /// Hide the cookie from scripts.
    pub http_only: bool,
    /// Only send the cookie over HTTPS.
    pub secure: bool,
    /// Cross-site sending policy.
    pub same_site: SameSitePolicy,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            http_only: true,
            secure: true,
            same_site: SameSitePolicy::Lax,
        }
    }
}

impl CookieConfig {
    /// Create a cookie configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cookie name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the cookie path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the HttpOnly flag.
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set the Secure flag.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the SameSite policy.
    pub fn with_same_site(mut self, same_site: SameSitePolicy) -> Self {
        self.same_site = same_site;
        self
    }

    /// Reject a name or path that would not serialize as a single cookie.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_cookie_name(&self.name) {
            return Err(invalid(
                "cookie.name",
                &format!("'{}' is not a valid cookie name", self.name),
            ));
        }
        if !is_valid_cookie_path(&self.path) {
            return Err(invalid(
                "cookie.path",
                &format!("'{}' is not a valid cookie path", self.path.escape_debug()),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !COOKIE_NAME_SEPARATORS.contains(c))
}

// RFC 6265 path-value: any CHAR except CTLs or ';'.
fn is_valid_cookie_path(path: &str) -> bool {
    !path.is_empty() && path.chars().all(|c| c.is_ascii() && !c.is_ascii_control() && c != ';')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SessileConfig::from_toml("").unwrap();
        assert_eq!(config, SessileConfig::default());
        assert_eq!(config.store_config(), StoreConfig::default());
        assert_eq!(config.cookie.name, DEFAULT_COOKIE_NAME);
        assert_eq!(config.token.length_bytes, DEFAULT_TOKEN_BYTES);
    }

    #[test]
    fn test_parse_full() {
        let toml = r#"
[store]
sweep_interval_secs = 1
idle_timeout_secs = 2

[cookie]
name = "test-session"
path = "/test"
http_only = false
secure = false
same_site = "strict"

[token]
length_bytes = 32
"#;
        let config = SessileConfig::from_toml(toml).unwrap();
        let store = config.store_config();
        assert_eq!(store.sweep_interval, Duration::from_secs(1));
        assert_eq!(store.idle_timeout, Duration::from_secs(2));
        assert_eq!(config.cookie.name, "test-session");
        assert_eq!(config.cookie.path, "/test");
        assert!(!config.cookie.http_only);
        assert!(!config.cookie.secure);
        assert_eq!(config.cookie.same_site, SameSitePolicy::Strict);
        assert_eq!(config.token.length_bytes, 32);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = SessileConfig::from_toml("[cookie]\nname = \"sid\"\n").unwrap();
        assert_eq!(config.cookie.name, "sid");
        assert_eq!(config.cookie.path, "/");
        assert!(config.cookie.secure);
    }

    #[test]
    fn test_zero_values_rejected() {
        let err = SessileConfig::from_toml("[store]\nidle_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "store.idle_timeout_secs"));

        let err = SessileConfig::from_toml("[token]\nlength_bytes = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_short_token_rejected() {
        let err = SessileConfig::from_toml("[token]\nlength_bytes = 8\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "token.length_bytes"));

        let config = SessileConfig::from_toml("[token]\nlength_bytes = 16\n").unwrap();
        assert_eq!(config.token.length_bytes, MIN_TOKEN_BYTES);
    }

    #[test]
    fn test_bad_cookie_name_rejected() {
        let err = SessileConfig::from_toml("[cookie]\nname = \"my session\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "cookie.name"));
    }

    #[test]
    fn test_cookie_path_injection_rejected() {
        let err = SessileConfig::from_toml("[cookie]\npath = \"/; Domain=evil.example\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "cookie.path"));

        for path in ["", "/a\nb", "/a\tb", "/caf\u{e9}"] {
            let err = CookieConfig::new().with_path(path).validate().unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "cookie.path"));
        }

        assert!(CookieConfig::new().with_path("/app/v1").validate().is_ok());
    }

    #[test]
    fn test_unknown_same_site_is_parse_error() {
        let err = SessileConfig::from_toml("[cookie]\nsame_site = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessile.toml");
        std::fs::write(&path, "[store]\nidle_timeout_secs = 90\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.store.idle_timeout_secs, 90);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
