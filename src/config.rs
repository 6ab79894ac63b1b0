//! Configuration for documentation capture.
//!
//! Loaded from a YAML or JSON file (chosen by extension). Every key except
//! `config_version` has a default, so a minimal file is:
//!
//! ```yaml
//! config_version: "2.0"
//! drivers:
//!   local:
//!     production_path: storage/documentation.json
//! ```

use crate::error::{Error, Result};
use crate::openapi_builder::{Info, License, Server};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Oldest `config_version` this release understands.
pub const PACKAGE_CONFIG_VERSION: &str = "2.0";

/// Environment variable that switches observation on.
pub const ENABLE_ENV: &str = "AUTODOC_ENABLE";

/// How authenticated requests are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    /// An `Authorization` header is present
    Jwt,
    /// The session cookie is present
    Laravel,
}

impl SecurityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityMode::Jwt => "jwt",
            SecurityMode::Laravel => "laravel",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// `major.minor` of the configuration format
    #[serde(default)]
    pub config_version: Option<String>,
    /// Whether exchanges are recorded at all
    #[serde(default = "enabled_from_env")]
    pub enabled: bool,
    /// Name of the driver in `drivers` to use
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub drivers: DriversConfig,
    /// `jwt`, `laravel`, or absent
    #[serde(default)]
    pub security: Option<String>,
    /// Cookie that marks an authenticated request in `laravel` mode
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Prefix stripped from every documented path
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub info: InfoConfig,
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub swagger: SwaggerConfig,
    #[serde(default)]
    pub defaults: Defaults,
    /// Supplementary documents (files or directories) merged at read time
    #[serde(default)]
    pub additional_paths: Vec<PathBuf>,
    /// Display strings for opaque values in examples, by type name
    #[serde(default = "default_placeholders")]
    pub example_placeholders: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriversConfig {
    #[serde(default)]
    pub local: LocalDriverConfig,
    #[serde(default)]
    pub storage: StorageDriverConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalDriverConfig {
    #[serde(default)]
    pub production_path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageDriverConfig {
    #[serde(default)]
    pub production_path: PathBuf,
    #[serde(default)]
    pub temporary_path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: BTreeMap<String, String>,
}

impl InfoConfig {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.version.is_empty()
            && self.description.is_empty()
            && self.license.values().all(String::is_empty)
    }

    pub fn to_info(&self) -> Info {
        Info {
            title: self.title.clone(),
            version: self.version.clone(),
            description: Some(self.description.clone()).filter(|d| !d.is_empty()),
            license: Some(License {
                name: self.license.get("name").cloned(),
                url: self.license.get("url").cloned(),
            }),
            extensions: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwaggerConfig {
    #[serde(default = "default_openapi_version")]
    pub version: String,
}

impl Default for SwaggerConfig {
    fn default() -> Self {
        Self {
            version: default_openapi_version(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
    /// Response descriptions by status code
    #[serde(default, alias = "code-descriptions")]
    pub code_descriptions: BTreeMap<String, String>,
}

fn enabled_from_env() -> bool {
    std::env::var(ENABLE_ENV)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn default_driver() -> String {
    "local".to_string()
}

fn default_session_cookie() -> String {
    "laravel_session".to_string()
}

fn default_openapi_version() -> String {
    "3.0.0".to_string()
}

fn default_placeholders() -> BTreeMap<String, String> {
    BTreeMap::from([("File".to_string(), "[uploaded_file]".to_string())])
}

impl Config {
    /// Loads configuration from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Config> {
        debug!("Loading configuration from {}", path.display());

        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Config> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Checks the version and security mode; returns the parsed security mode.
    pub fn validate(&self) -> Result<Option<SecurityMode>> {
        self.check_version()?;
        self.security_mode()
    }

    /// Fails unless `config_version` is at least [`PACKAGE_CONFIG_VERSION`].
    pub fn check_version(&self) -> Result<()> {
        let version = self
            .config_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(Error::LegacyConfig)?;

        let incompatible = || Error::IncompatibleConfig {
            found: version.to_string(),
            required: PACKAGE_CONFIG_VERSION.to_string(),
        };
        let found = parse_version(version).ok_or_else(incompatible)?;
        let required = parse_version(PACKAGE_CONFIG_VERSION).ok_or_else(incompatible)?;

        if found < required {
            return Err(incompatible());
        }
        Ok(())
    }

    pub fn security_mode(&self) -> Result<Option<SecurityMode>> {
        match self.security.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some("jwt") => Ok(Some(SecurityMode::Jwt)),
            Some("laravel") => Ok(Some(SecurityMode::Laravel)),
            Some(other) => Err(Error::WrongSecurityConfig(other.to_string())),
        }
    }

    /// Configured description for a status code, if any.
    pub fn code_description(&self, code: &str) -> Option<&str> {
        self.defaults
            .code_descriptions
            .get(code)
            .map(String::as_str)
            .filter(|d| !d.is_empty())
    }
}

/// Parses `major.minor` (extra components are ignored, a missing minor is 0).
fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(minor) => minor.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const MINIMAL: &str = r#"
config_version: "2.0"
enabled: true
drivers:
  local:
    production_path: /tmp/documentation.json
"#;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str(MINIMAL).unwrap();

        assert!(config.enabled);
        assert_eq!(config.driver, "local");
        assert_eq!(config.session_cookie, "laravel_session");
        assert_eq!(config.swagger.version, "3.0.0");
        assert_eq!(config.example_placeholders["File"], "[uploaded_file]");
        assert!(config.additional_paths.is_empty());
        assert_eq!(config.validate().unwrap(), None);
    }

    #[test]
    fn test_missing_version_is_legacy() {
        let config = Config::from_yaml_str("driver: local").unwrap();
        assert!(matches!(config.check_version(), Err(Error::LegacyConfig)));
    }

    #[test]
    fn test_version_comparison() {
        let mut config = Config::from_yaml_str(MINIMAL).unwrap();

        config.config_version = Some("2.3".to_string());
        assert!(config.check_version().is_ok());
        config.config_version = Some("3.0".to_string());
        assert!(config.check_version().is_ok());
        config.config_version = Some("1.9".to_string());
        assert!(matches!(
            config.check_version(),
            Err(Error::IncompatibleConfig { .. })
        ));
        config.config_version = Some("two".to_string());
        assert!(config.check_version().is_err());
    }

    #[test]
    fn test_security_modes() {
        let mut config = Config::from_yaml_str(MINIMAL).unwrap();

        config.security = Some("jwt".to_string());
        assert_eq!(config.security_mode().unwrap(), Some(SecurityMode::Jwt));
        config.security = Some("laravel".to_string());
        assert_eq!(config.security_mode().unwrap(), Some(SecurityMode::Laravel));
        config.security = Some("oauth".to_string());
        assert!(matches!(
            config.security_mode(),
            Err(Error::WrongSecurityConfig(mode)) if mode == "oauth"
        ));
    }

    #[test]
    fn test_code_descriptions_accept_dashed_key() {
        let yaml = format!("{}defaults:\n  code-descriptions:\n    \"204\": Nothing here\n", MINIMAL);
        let config = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.code_description("204"), Some("Nothing here"));
        assert_eq!(config.code_description("200"), None);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"config_version": "2.1", "security": "jwt", "base_path": "/api"}"#)
            .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.base_path, "/api");
        assert_eq!(config.validate().unwrap(), Some(SecurityMode::Jwt));
    }

    #[test]
    fn test_info_config() {
        let yaml = format!(
            "{}info:\n  title: Orders\n  version: \"1.0\"\n  license:\n    name: MIT\n    url: \"\"\n",
            MINIMAL
        );
        let config = Config::from_yaml_str(&yaml).unwrap();

        assert!(!config.info.is_empty());
        let info = config.info.to_info();
        assert_eq!(info.title, "Orders");
        assert_eq!(info.description, None);
    }
}
