//! Runtime settings.
//!
//! Precedence, highest first: explicit overrides (CLI flags), environment
//! variables, `<home>/config.toml`, built-in defaults.
//!
//! ```toml
//! [registry]
//! url = "https://proxy.golang.org"
//! timeout_secs = 30
//!
//! [install]
//! jobs = 4
//! verify = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Registry used when nothing else is configured.
pub const DEFAULT_REGISTRY: &str = "https://proxy.golang.org";
/// Network timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Global scope root and archive cache parent (usually `~/.gopkg`).
    pub home: PathBuf,
    /// Registry base URL (`https://…` or `file://…`).
    pub registry_url: String,
    /// Connect/read timeout for registry requests.
    pub timeout: Duration,
    /// Maximum modules prepared concurrently during install.
    pub jobs: usize,
    /// Re-hash cached archives before reuse.
    pub verify: bool,
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub registry_url: Option<String>,
    pub jobs: Option<usize>,
    pub verify: Option<bool>,
}

/// On-disk `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub registry: RegistrySection,
    #[serde(default)]
    pub install: InstallSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrySection {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallSection {
    #[serde(default)]
    pub jobs: Option<usize>,
    #[serde(default)]
    pub verify: Option<bool>,
}

impl ConfigFile {
    /// Read `path`; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigFile::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Settings {
    /// Resolve settings from the process environment and `<home>/config.toml`.
    pub fn from_env(overrides: &Overrides) -> Result<Self, ConfigError> {
        Settings::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve settings with an injectable environment lookup.
    pub fn resolve<F>(overrides: &Overrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = match env("GOPKG_HOME").filter(|s| !s.is_empty()) {
            Some(h) => PathBuf::from(h),
            None => env("HOME")
                .filter(|s| !s.is_empty())
                .map(|h| PathBuf::from(h).join(".gopkg"))
                .ok_or(ConfigError::NoHome)?,
        };
        let file = ConfigFile::load(&home.join("config.toml"))?;

        let registry_url = overrides
            .registry_url
            .clone()
            .or_else(|| env("GOPKG_PROXY").filter(|s| !s.trim().is_empty()))
            .or(file.registry.url)
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let timeout_secs = match env("GOPKG_TIMEOUT") {
            Some(raw) => parse_number::<u64>("GOPKG_TIMEOUT", &raw)?,
            None => file.registry.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout".to_string(),
                value: "0".to_string(),
            });
        }

        let jobs = match (overrides.jobs, env("GOPKG_JOBS")) {
            (Some(j), _) => j,
            (None, Some(raw)) => parse_number::<usize>("GOPKG_JOBS", &raw)?,
            (None, None) => file.install.jobs.unwrap_or(1),
        };
        if jobs == 0 {
            return Err(ConfigError::Invalid {
                key: "jobs".to_string(),
                value: "0".to_string(),
            });
        }

        let verify = match (overrides.verify, env("GOPKG_VERIFY")) {
            (Some(v), _) => v,
            (None, Some(raw)) => parse_bool("GOPKG_VERIFY", &raw)?,
            (None, None) => file.install.verify.unwrap_or(false),
        };

        Ok(Settings {
            home,
            registry_url,
            timeout: Duration::from_secs(timeout_secs),
            jobs,
            verify,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}
