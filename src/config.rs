use anyhow::{Context, Result, bail};
use dctkit::backend::http::HttpConfig;
use dctkit::{PollConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("hostenv"))
}

/// Get the default config file path
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

// ============================================================================
// Hostenv Config
// ============================================================================

/// Connection and polling settings.
///
/// Every key is optional in the file; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostenvConfig {
    /// Control plane base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub job_poll_interval_secs: u64,
    /// Unbounded when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_max_polls: Option<u32>,
    pub existence_poll_interval_secs: u64,
    pub existence_max_polls: u32,
    /// Attempts for idempotent reads, including the first
    pub read_retries: u32,
    pub state_dir: String,
}

impl Default for HostenvConfig {
    fn default() -> Self {
        Self {
            host: None,
            api_key: None,
            request_timeout_secs: 30,
            job_poll_interval_secs: dctkit::poll::JOB_POLL_INTERVAL.as_secs(),
            job_max_polls: None,
            existence_poll_interval_secs: dctkit::poll::EXISTENCE_POLL_INTERVAL.as_secs(),
            existence_max_polls: dctkit::poll::EXISTENCE_MAX_POLLS,
            read_retries: 3,
            state_dir: "~/.local/state/hostenv".to_string(),
        }
    }
}

impl HostenvConfig {
    /// Load from `path`, or the default location. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => config_file()?,
        };

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Apply command line / environment overrides.
    #[must_use]
    pub fn with_overrides(mut self, host: Option<String>, api_key: Option<String>) -> Self {
        if host.is_some() {
            self.host = host;
        }
        if api_key.is_some() {
            self.api_key = api_key;
        }
        self
    }

    /// State directory with `~` expanded
    pub fn state_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.state_dir);
        PathBuf::from(expanded.as_ref())
    }

    /// Connection settings; fails if the host or API key is missing.
    pub fn http(&self) -> Result<HttpConfig> {
        let Some(host) = self.host.as_deref().filter(|h| !h.is_empty()) else {
            bail!("No control plane host configured (set DCT_HOST or `host` in config.toml)");
        };
        let Some(api_key) = self.api_key.as_deref().filter(|k| !k.is_empty()) else {
            bail!("No API key configured (set DCT_API_KEY or `api_key` in config.toml)");
        };

        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}/v3", host.trim_end_matches('/'))
        };

        Ok(HttpConfig {
            base_url,
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            retry: RetryConfig {
                max_attempts: self.read_retries.max(1),
                ..RetryConfig::default()
            },
        })
    }

    pub fn job_polling(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.job_poll_interval_secs),
            max_polls: self.job_max_polls,
        }
    }

    pub fn existence_polling(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.existence_poll_interval_secs),
            max_polls: Some(self.existence_max_polls.max(1)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HostenvConfig::load(Some(&dir.path().join("config.toml"))).unwrap();
        assert_eq!(config, HostenvConfig::default());
        assert_eq!(config.job_polling().interval, Duration::from_secs(5));
        assert_eq!(config.job_polling().max_polls, None);
        assert_eq!(config.existence_polling().max_polls, Some(10));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "host = \"dct.example.com\"\njob_max_polls = 120\n").unwrap();

        let config = HostenvConfig::load(Some(&path)).unwrap();
        assert_eq!(config.host.as_deref(), Some("dct.example.com"));
        assert_eq!(config.job_max_polls, Some(120));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.read_retries, 3);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();
        assert!(HostenvConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let config = HostenvConfig {
            host: Some("file-host".to_string()),
            ..Default::default()
        }
        .with_overrides(Some("env-host".to_string()), None);
        assert_eq!(config.host.as_deref(), Some("env-host"));
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_http_requires_credentials() {
        let config = HostenvConfig {
            host: Some("dct.example.com".to_string()),
            ..Default::default()
        };
        let err = config.http().unwrap_err().to_string();
        assert!(err.contains("DCT_API_KEY"));
    }

    #[test]
    fn test_http_base_url() {
        let config = HostenvConfig::default()
            .with_overrides(Some("dct.example.com/".to_string()), Some("1.key".to_string()));
        assert_eq!(config.http().unwrap().base_url, "https://dct.example.com/v3");

        let config = config.with_overrides(Some("http://localhost:8080/v3/".to_string()), None);
        let http = config.http().unwrap();
        assert_eq!(http.base_url, "http://localhost:8080/v3");
        assert_eq!(http.retry.max_attempts, 3);
    }

    #[test]
    fn test_state_dir_expands_tilde() {
        let config = HostenvConfig::default();
        assert!(!config.state_dir().to_string_lossy().starts_with('~'));

        let config = HostenvConfig {
            state_dir: "/var/lib/hostenv".to_string(),
            ..Default::default()
        };
        assert_eq!(config.state_dir(), PathBuf::from("/var/lib/hostenv"));
    }
}
