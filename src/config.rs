//! Client configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the configured API base URL.
pub const API_BASE_ENV: &str = "ROSTER_API_BASE";

/// Configuration for the dashboard client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the extraction service, e.g. `https://roster.example.edu`.
    pub api_base: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Countdown shown while a single course is extracted.
    pub extract_estimate_secs: u64,
    /// Countdown shown while every course is exported.
    pub extract_all_estimate_secs: u64,
    /// Directory where saved downloads are written.
    pub download_dir: PathBuf,
    /// Whether to overwrite existing files when saving.
    pub force_overwrite: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            request_timeout_secs: 30,
            extract_estimate_secs: 20,
            extract_all_estimate_secs: 120,
            download_dir: PathBuf::from("."),
            force_overwrite: false,
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Sets the countdown estimates for single-course and bulk extraction.
    #[must_use]
    pub const fn with_estimates(mut self, extract_secs: u64, extract_all_secs: u64) -> Self {
        self.extract_estimate_secs = extract_secs;
        self.extract_all_estimate_secs = extract_all_secs;
        self
    }

    /// Sets the download directory.
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Sets whether to force overwrite existing files.
    #[must_use]
    pub const fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    /// Returns the API base URL, treating a blank value as unset.
    #[must_use]
    pub fn api_base(&self) -> Option<&str> {
        self.api_base
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
    }

    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roster-dl")
            .join("config.toml")
    }

    /// Loads configuration from the default file, then applies environment overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> crate::Result<Self> {
        let mut config = Self::load_from(&Self::default_path())?;
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            config.api_base = Some(base);
        }
        Ok(config)
    }

    /// Loads configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents).map_err(|e| {
            crate::Error::Configuration(format!("Invalid config file {}: {e}", path.display()))
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert!(config.api_base().is_none());
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.extract_estimate_secs, 20);
        assert_eq!(config.extract_all_estimate_secs, 120);
        assert_eq!(config.download_dir, PathBuf::from("."));
        assert!(!config.force_overwrite);
    }

    #[test]
    fn builder_pattern() {
        let config = ClientConfig::new()
            .with_api_base("https://roster.example.edu")
            .with_request_timeout_secs(5)
            .with_estimates(3, 9)
            .with_download_dir("/tmp/out")
            .with_force_overwrite(true);

        assert_eq!(config.api_base(), Some("https://roster.example.edu"));
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.extract_estimate_secs, 3);
        assert_eq!(config.extract_all_estimate_secs, 9);
        assert_eq!(config.download_dir, PathBuf::from("/tmp/out"));
        assert!(config.force_overwrite);
    }

    #[test]
    fn blank_api_base_counts_as_missing() {
        let config = ClientConfig::new().with_api_base("   ");
        assert!(config.api_base().is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ClientConfig =
            toml::from_str("api_base = \"http://localhost:8000\"\nforce_overwrite = true\n")
                .unwrap();
        assert_eq!(config.api_base(), Some("http://localhost:8000"));
        assert!(config.force_overwrite);
        assert_eq!(config.extract_estimate_secs, 20);
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ClientConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.api_base.is_none());
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();
        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
    }

    #[test]
    fn default_path_is_under_config_dir() {
        let path = ClientConfig::default_path();
        assert!(path.to_string_lossy().contains("roster-dl"));
        assert!(path.ends_with("config.toml"));
    }
}
