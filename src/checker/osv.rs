use crate::config::DEFAULT_OSV_URL;
use crate::model::{Pin, Vulnerability};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of pins to query in a single batch request.
const BATCH_SIZE: usize = 100;

/// OSV ecosystem name for packages published on PyPI.
const ECOSYSTEM: &str = "PyPI";

pub struct OsvChecker {
    client: reqwest::Client,
    endpoint: String,
}

impl OsvChecker {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    async fn batch_query(&self, pins: &[Pin]) -> Result<Vec<Vulnerability>> {
        if pins.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&build_batch_query(pins))
            .send()
            .await
            .context("Failed to query OSV.dev")?
            .error_for_status()
            .context("OSV.dev rejected the batch query")?;

        let batch: OsvBatchResponse = response
            .json()
            .await
            .context("Failed to parse OSV.dev response")?;

        collect_matches(pins, batch)
    }
}

impl Default for OsvChecker {
    fn default() -> Self {
        Self::new(DEFAULT_OSV_URL)
    }
}

#[derive(Serialize)]
struct OsvPackage<'a> {
    name: &'a str,
    ecosystem: &'static str,
}

#[derive(Serialize)]
struct OsvBatchQuery<'a> {
    queries: Vec<OsvBatchQueryItem<'a>>,
}

#[derive(Serialize)]
struct OsvBatchQueryItem<'a> {
    package: OsvPackage<'a>,
    version: &'a str,
}

#[derive(Deserialize)]
struct OsvBatchResponse {
    results: Vec<OsvBatchResult>,
}

#[derive(Deserialize)]
struct OsvBatchResult {
    vulns: Option<Vec<OsvVuln>>,
}

#[derive(Deserialize)]
struct OsvVuln {
    id: String,
}

fn build_batch_query(pins: &[Pin]) -> OsvBatchQuery<'_> {
    OsvBatchQuery {
        queries: pins
            .iter()
            .map(|pin| OsvBatchQueryItem {
                package: OsvPackage {
                    name: &pin.name,
                    ecosystem: ECOSYSTEM,
                },
                version: &pin.version,
            })
            .collect(),
    }
}

/// Results come back in query order; pair each with its pin. A response
/// that does not answer every query is rejected.
fn collect_matches(pins: &[Pin], batch: OsvBatchResponse) -> Result<Vec<Vulnerability>> {
    if batch.results.len() != pins.len() {
        bail!(
            "OSV.dev returned {} results for {} queries",
            batch.results.len(),
            pins.len()
        );
    }

    Ok(pins
        .iter()
        .zip(batch.results)
        .flat_map(|(pin, result)| {
            result
                .vulns
                .unwrap_or_default()
                .into_iter()
                .map(move |vuln| Vulnerability {
                    id: vuln.id,
                    package: pin.name.clone(),
                    version: pin.version.clone(),
                })
        })
        .collect())
}

#[async_trait]
impl super::VulnerabilityChecker for OsvChecker {
    fn name(&self) -> &'static str {
        "OSV.dev"
    }

    async fn check(&self, pins: &[Pin]) -> Result<Vec<Vulnerability>> {
        let mut vulnerabilities = Vec::new();

        for chunk in pins.chunks(BATCH_SIZE) {
            let found = self.batch_query(chunk).await?;
            debug!(pins = chunk.len(), matches = found.len(), "OSV batch checked");
            vulnerabilities.extend(found);
        }

        Ok(vulnerabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::VulnerabilityChecker;

    #[test]
    fn test_batch_query_shape() {
        let pins = vec![Pin::new("django", "1.11"), Pin::new("flask", "0.12")];
        let json = serde_json::to_value(build_batch_query(&pins)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "queries": [
                    {"package": {"name": "django", "ecosystem": "PyPI"}, "version": "1.11"},
                    {"package": {"name": "flask", "ecosystem": "PyPI"}, "version": "0.12"}
                ]
            })
        );
    }

    #[test]
    fn test_collect_matches_pairs_results_with_pins() {
        let pins = vec![Pin::new("django", "1.11"), Pin::new("django", "2.2")];
        let batch: OsvBatchResponse = serde_json::from_str(
            r#"{
                "results": [
                    {"vulns": [{"id": "PYSEC-2019-1", "modified": "2021-01-01T00:00:00Z"},
                               {"id": "GHSA-aaaa-bbbb-cccc"}]},
                    {}
                ]
            }"#,
        )
        .unwrap();

        let matches = collect_matches(&pins, batch).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|v| v.version == "1.11"));
        assert_eq!(matches[0].id, "PYSEC-2019-1");
        assert_eq!(matches[1].id, "GHSA-aaaa-bbbb-cccc");
    }

    #[test]
    fn test_short_response_is_an_error() {
        let pins = vec![Pin::new("django", "1.11"), Pin::new("django", "2.2")];
        let batch: OsvBatchResponse =
            serde_json::from_str(r#"{"results": [{"vulns": [{"id": "PYSEC-2019-1"}]}]}"#).unwrap();

        let err = collect_matches(&pins, batch).unwrap_err();
        assert!(err.to_string().contains("1 results for 2 queries"));
    }

    #[tokio::test]
    async fn test_empty_pins_make_no_request() {
        let checker = OsvChecker::new("http://127.0.0.1:9/unreachable");
        assert!(checker.check(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_osv_checker_default() {
        let checker = OsvChecker::default();
        assert_eq!(checker.name(), "OSV.dev");
    }
}
