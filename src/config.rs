//! Configuration file handling.
//!
//! Settings are read from a TOML file; every field is optional and falls
//! back to its default. Command-line flags take precedence over the file.
//!
//! # Configuration Location
//!
//! - Linux: `~/.config/reqstats/config.toml`
//! - macOS: `~/Library/Application Support/reqstats/config.toml`
//! - Windows: `%APPDATA%\reqstats\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! cache_ttl_hours = 24
//! pypi_url = "https://pypi.org/pypi"
//! osv_url = "https://api.osv.dev/v1/querybatch"
//! default_format = "table"
//! skip_vuln_check = false
//!
//! [ignore]
//! packages = ["pip", "setuptools", "types-*"]
//! vulnerabilities = ["PYSEC-2021-0001"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PYPI_URL: &str = "https://pypi.org/pypi";
pub const DEFAULT_OSV_URL: &str = "https://api.osv.dev/v1/querybatch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long fetched release lists stay cached, in hours. `0` disables
    /// the cache.
    pub cache_ttl_hours: u64,

    /// Base URL of the PyPI JSON API; `/{name}/json` is appended.
    pub pypi_url: String,

    /// OSV.dev batch query endpoint.
    pub osv_url: String,

    /// Output format when `--format` is not given: "table" or "json".
    pub default_format: String,

    /// Skip advisory lookups unless asked for.
    pub skip_vuln_check: bool,

    pub ignore: IgnoreConfig,
}

/// Suppression lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Packages hidden from popularity listings. `*` acts as a wildcard.
    pub packages: Vec<String>,

    /// Advisory ids that never mark a release insecure.
    pub vulnerabilities: Vec<String>,
}

impl IgnoreConfig {
    pub fn should_ignore_package(&self, name: &str) -> bool {
        self.packages.iter().any(|pattern| glob_match(pattern, name))
    }

    pub fn should_ignore_vulnerability(&self, id: &str) -> bool {
        self.vulnerabilities
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(id))
    }
}

/// Glob matching where `*` matches any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };

    let rest: Vec<&str> = parts.collect();
    let Some((last, middle)) = rest.split_last() else {
        // no wildcard at all
        return remaining.is_empty();
    };

    for part in middle {
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_hours: crate::cache::CACHE_TTL_HOURS,
            pypi_url: DEFAULT_PYPI_URL.to_string(),
            osv_url: DEFAULT_OSV_URL.to_string(),
            default_format: "table".to_string(),
            skip_vuln_check: false,
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config file, or defaults when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Writes the config file, creating its directory if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reqstats")
            .join("config.toml")
    }

    /// The settings in effect, one `key = value` line each, as used by
    /// `reqstats config`.
    pub fn summary(&self) -> String {
        let list = |items: &[String]| {
            if items.is_empty() {
                "(none)".to_string()
            } else {
                items.join(", ")
            }
        };
        let ttl = if self.cache_ttl_hours == 0 {
            "disabled".to_string()
        } else {
            format!("{}h", self.cache_ttl_hours)
        };

        [
            format!("pypi_url              = {}", self.pypi_url),
            format!("osv_url               = {}", self.osv_url),
            format!("default_format        = {}", self.default_format),
            format!("skip_vuln_check       = {}", self.skip_vuln_check),
            format!("cache_ttl_hours       = {}", ttl),
            format!("ignore.packages       = {}", list(&self.ignore.packages)),
            format!("ignore.vulnerabilities = {}", list(&self.ignore.vulnerabilities)),
        ]
        .join("\n")
    }

    /// The default configuration rendered as TOML.
    pub fn generate_default_config() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}
