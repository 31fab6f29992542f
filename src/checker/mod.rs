//! External lookups: release lists and vulnerability advisories.
//!
//! Both are traits so the analyzer can run against in-memory fakes; the
//! default implementations talk to PyPI and OSV.dev.

mod osv;
mod pypi;

pub use osv::OsvChecker;
pub use pypi::PyPiClient;

use crate::cache::Cache;
use crate::config::Config;
use crate::model::{Pin, Vulnerability};
use anyhow::Result;
use async_trait::async_trait;

/// Source of the published releases of a package.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every published version string, most recent first.
    async fn releases(&self, package: &str) -> Result<Vec<String>>;
}

/// Advisory database lookup for concrete releases.
#[async_trait]
pub trait VulnerabilityChecker: Send + Sync {
    fn name(&self) -> &'static str;

    /// Advisories affecting any of `pins`. An empty result means no known
    /// vulnerabilities.
    async fn check(&self, pins: &[Pin]) -> Result<Vec<Vulnerability>>;
}

pub fn default_release_source(config: &Config) -> PyPiClient {
    PyPiClient::new(&config.pypi_url).with_cache(Cache::with_ttl_hours(config.cache_ttl_hours))
}

pub fn default_checker(config: &Config) -> OsvChecker {
    OsvChecker::new(&config.osv_url)
}
