use crate::cache::Cache;
use crate::config::DEFAULT_PYPI_URL;
use crate::pep440::sort_descending;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

pub struct PyPiClient {
    client: reqwest::Client,
    base_url: String,
    cache: Option<Cache>,
}

impl PyPiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn project_url(&self, package: &str) -> String {
        format!("{}/{}/json", self.base_url, package)
    }

    fn cache_key(package: &str) -> String {
        format!("pypi_releases_{}", package)
    }
}

impl Default for PyPiClient {
    fn default() -> Self {
        Self::new(DEFAULT_PYPI_URL)
    }
}

/// The part of the PyPI JSON API document we read. Release file lists are
/// skipped; only the version keys matter.
#[derive(Deserialize)]
struct ProjectDocument {
    #[serde(default)]
    releases: HashMap<String, IgnoredAny>,
}

/// Version keys of a project document, most recent first.
fn release_versions(document: ProjectDocument) -> Vec<String> {
    let mut releases: Vec<String> = document.releases.into_keys().collect();
    sort_descending(&mut releases);
    releases
}

#[async_trait]
impl super::ReleaseSource for PyPiClient {
    fn name(&self) -> &'static str {
        "PyPI"
    }

    async fn releases(&self, package: &str) -> Result<Vec<String>> {
        let cache_key = Self::cache_key(package);
        if let Some(cached) = self
            .cache
            .as_ref()
            .and_then(|c| c.get::<Vec<String>>(&cache_key))
        {
            debug!(package, releases = cached.len(), "release list from cache");
            return Ok(cached);
        }

        let url = self.project_url(package);
        debug!(%url, "fetching release list");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("PyPI lookup for '{}' failed", package))?;

        let document: ProjectDocument = response
            .json()
            .await
            .with_context(|| format!("Failed to parse PyPI response for '{}'", package))?;
        let releases = release_versions(document);

        if let Some(cache) = &self.cache {
            let _ = cache.set(&cache_key, &releases);
        }

        Ok(releases)
    }
}
