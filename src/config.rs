//! Store configuration
//!
//! - `ConfigProvider`: environment lookup (overridable for tests) and the
//!   per-user config directory
//! - `StoreConfig`: service name + directory for encrypted token files

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Subdirectory of the user config dir owned by this crate
pub const APP_DIR_NAME: &str = "ringvault";
/// Overrides the token file directory
pub const TOKEN_DIR_ENV: &str = "RINGVAULT_TOKEN_DIR";
/// Suffix of the keyring namespace holding file encryption keys
pub const KEY_NAMESPACE_SUFFIX: &str = "-keys";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot determine config directory: neither $XDG_CONFIG_HOME nor $HOME is set")]
    NoConfigDir,

    #[error("service name must not be empty")]
    EmptyService,

    #[error("expected relative config path but was absolute: {0:?}")]
    AbsolutePath(PathBuf),

    #[error("config path must not leave the config directory: {0:?}")]
    PathTraversal(PathBuf),

    #[error("cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves environment-dependent settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigProvider {
    overrides: HashMap<String, String>,
}

impl ConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins `name` to `value` for this provider only, without touching the process environment.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Looks up an environment variable. Empty values count as unset.
    pub fn getenv(&self, name: &str) -> Option<String> {
        let value = match self.overrides.get(name) {
            Some(value) => Some(value.clone()),
            None => std::env::var(name).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// `$XDG_CONFIG_HOME`, falling back to `$HOME/.config`.
    pub fn config_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = self.getenv("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(dir));
        }
        self.getenv("HOME")
            .map(|home| PathBuf::from(home).join(".config"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn app_config_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.config_dir()?.join(APP_DIR_NAME))
    }

    /// Reads `relative` from the app config dir (`<config dir>/ringvault`).
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn read_file(&self, relative: &str) -> Result<Vec<u8>, ConfigError> {
        let relative = Path::new(relative);
        if relative.has_root() || relative.is_absolute() {
            return Err(ConfigError::AbsolutePath(relative.to_path_buf()));
        }
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ConfigError::PathTraversal(relative.to_path_buf()));
        }

        let path = self.app_config_dir()?.join(relative);
        std::fs::read(&path).map_err(|source| ConfigError::Io { path, source })
    }

    /// Loads `.env.local`, then `.env`, into the process environment.
    ///
    /// Missing files are not an error. Variables that are already set win.
    pub fn load_dotenv() {
        if let Ok(path) = dotenvy::from_filename(".env.local") {
            tracing::debug!(path = %path.display(), "loaded env file");
        }
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded env file");
        }
    }
}

/// Where a tiered token store keeps its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    service: String,
    token_dir: PathBuf,
}

impl StoreConfig {
    pub fn new(service: impl Into<String>, token_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let service = service.into();
        if service.trim().is_empty() {
            return Err(ConfigError::EmptyService);
        }
        Ok(Self {
            service,
            token_dir: token_dir.into(),
        })
    }

    /// Token dir from `$RINGVAULT_TOKEN_DIR`, else `<config dir>/ringvault/tokens`.
    pub fn from_provider(
        provider: &ConfigProvider,
        service: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let token_dir = match provider.getenv(TOKEN_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => provider.app_config_dir()?.join("tokens"),
        };
        Self::new(service, token_dir)
    }

    /// Primary keyring namespace
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Keyring namespace for file encryption keys (`<service>-keys`)
    pub fn key_namespace(&self) -> String {
        format!("{}{}", self.service, KEY_NAMESPACE_SUFFIX)
    }

    pub fn token_dir(&self) -> &Path {
        &self.token_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_dir_env_override() {
        let provider = ConfigProvider::new()
            .with_var(TOKEN_DIR_ENV, "/var/lib/tokens")
            .with_var("XDG_CONFIG_HOME", "/home/u/.cfg");
        let config = StoreConfig::from_provider(&provider, "gsheets").unwrap();

        assert_eq!(config.token_dir(), Path::new("/var/lib/tokens"));
        assert_eq!(config.service(), "gsheets");
        assert_eq!(config.key_namespace(), "gsheets-keys");
    }

    #[test]
    fn test_xdg_config_home_preferred() {
        let provider = ConfigProvider::new()
            .with_var(TOKEN_DIR_ENV, "")
            .with_var("XDG_CONFIG_HOME", "/home/u/.cfg")
            .with_var("HOME", "/home/u");
        let config = StoreConfig::from_provider(&provider, "gsheets").unwrap();

        assert_eq!(config.token_dir(), Path::new("/home/u/.cfg/ringvault/tokens"));
    }

    #[test]
    fn test_home_fallback() {
        let provider = ConfigProvider::new()
            .with_var(TOKEN_DIR_ENV, "")
            .with_var("XDG_CONFIG_HOME", " ")
            .with_var("HOME", "/home/u");

        assert_eq!(
            provider.app_config_dir().unwrap(),
            PathBuf::from("/home/u/.config/ringvault")
        );
    }

    #[test]
    fn test_missing_home_is_an_error() {
        let provider = ConfigProvider::new()
            .with_var("XDG_CONFIG_HOME", "")
            .with_var("HOME", "");

        assert!(matches!(provider.config_dir(), Err(ConfigError::NoConfigDir)));
    }

    #[test]
    fn test_read_file_under_app_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join(APP_DIR_NAME).join("clients");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("google.json"), b"{\"client_id\":\"abc\"}").unwrap();

        let provider = ConfigProvider::new()
            .with_var("XDG_CONFIG_HOME", dir.path().to_str().unwrap());

        assert_eq!(
            provider.read_file("clients/google.json").unwrap(),
            b"{\"client_id\":\"abc\"}"
        );
        assert!(matches!(
            provider.read_file("clients/missing.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_read_file_rejects_absolute_path() {
        let provider = ConfigProvider::new().with_var("XDG_CONFIG_HOME", "/home/u/.cfg");

        assert!(matches!(
            provider.read_file("/etc/passwd"),
            Err(ConfigError::AbsolutePath(_))
        ));
    }

    #[test]
    fn test_read_file_rejects_parent_components() {
        let provider = ConfigProvider::new().with_var("XDG_CONFIG_HOME", "/home/u/.cfg");

        assert!(matches!(
            provider.read_file("../other-app/secrets.json"),
            Err(ConfigError::PathTraversal(_))
        ));
        assert!(matches!(
            provider.read_file("clients/../../escape"),
            Err(ConfigError::PathTraversal(_))
        ));
    }

    #[test]
    fn test_empty_service_rejected() {
        assert!(matches!(
            StoreConfig::new("  ", "/tmp"),
            Err(ConfigError::EmptyService)
        ));
    }
}
