//! Types for Zenodo API requests and responses.

use crate::error::{Result, ZenodoError};
use crate::record::Record;
use crate::report::Reporter;
use crate::vocabulary::{ContentType, SearchSort, SearchStatus};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const PRODUCTION_URL: &str = "https://zenodo.org/api";
const SANDBOX_URL: &str = "https://sandbox.zenodo.org/api";

/// Which Zenodo instance the client talks to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Endpoint {
    #[default]
    Production,
    Sandbox,
    /// Self-hosted instance or test server (no trailing slash)
    Custom(String),
}

impl Endpoint {
    /// Validate and normalize a custom base URL.
    pub fn custom(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref().trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(ZenodoError::InvalidArgument(
                "Endpoint URL cannot be empty".into(),
            ));
        }
        validate_url(url)?;
        Ok(Endpoint::Custom(url.to_string()))
    }

    pub fn base_url(&self) -> &str {
        match self {
            Endpoint::Production => PRODUCTION_URL,
            Endpoint::Sandbox => SANDBOX_URL,
            Endpoint::Custom(url) => url,
        }
    }
}

/// Check that `url` is an absolute http(s) URL.
pub(crate) fn validate_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url)
        .map_err(|e| ZenodoError::InvalidArgument(format!("Invalid URL '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(parsed),
        _ => Err(ZenodoError::InvalidArgument(format!(
            "URL must start with http:// or https://: {}",
            url
        ))),
    }
}

/// Configuration for a [`ZenodoClient`](crate::ZenodoClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explicit access token; skips the credential file lookup
    pub token: Option<String>,
    /// Credential file; `~/.zenodorc` when neither this nor a token is set
    pub config_path: Option<PathBuf>,
    /// Selects the `SANDBOX` credential section
    pub sandbox: bool,
    pub endpoint: Endpoint,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            config_path: None,
            sandbox: false,
            endpoint: Endpoint::Production,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Production instance, token from the default credential file.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Switch between the production and sandbox instances. A custom
    /// endpoint is kept; only the credential section changes.
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        if !matches!(self.endpoint, Endpoint::Custom(_)) {
            self.endpoint = if sandbox {
                Endpoint::Sandbox
            } else {
                Endpoint::Production
            };
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Filters for listing depositions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositionQuery {
    /// Elasticsearch query string
    pub query: Option<String>,
    /// Defaults to `published`
    pub status: Option<SearchStatus>,
    /// Defaults to `bestmatch`
    pub sort: Option<SearchSort>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub all_versions: Option<bool>,
}

/// Filters for searching published records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub query: Option<String>,
    pub status: Option<SearchStatus>,
    pub sort: Option<SearchSort>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub all_versions: Option<bool>,
    pub communities: Option<String>,
    /// Upload type filter (`type`)
    pub record_type: Option<String>,
    pub subtype: Option<String>,
    /// Geolocation bounding box, `west,south,east,north`
    pub bounds: Option<String>,
    /// Custom keyword filter, `[field]:value`
    pub custom: Option<String>,
    /// Response encoding; defaults to JSON
    pub content_type: Option<ContentType>,
}

/// Filters for listing licenses, communities, funders or grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    pub query: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

// =============================================================================
// Targets
// =============================================================================

/// A deposition addressed by id or by its API URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositionTarget {
    Id(u64),
    Url(String),
}

impl From<u64> for DepositionTarget {
    fn from(id: u64) -> Self {
        DepositionTarget::Id(id)
    }
}

impl From<&str> for DepositionTarget {
    fn from(url: &str) -> Self {
        DepositionTarget::Url(url.to_string())
    }
}

impl From<String> for DepositionTarget {
    fn from(url: String) -> Self {
        DepositionTarget::Url(url)
    }
}

/// Where an upload goes: an explicit bucket URL or the bucket of a
/// deposition record (`links.bucket`).
#[derive(Debug, Clone, Copy)]
pub enum BucketTarget<'a> {
    Url(&'a str),
    Record(&'a Record),
}

/// Where a download is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Directory; the file keeps its remote name
    Directory(PathBuf),
    /// Exact file path
    File(PathBuf),
}

// =============================================================================
// Listing
// =============================================================================

/// Result of a `list` call.
#[derive(Debug, Clone)]
pub enum Listing {
    /// Plain JSON array, one record per element
    Records(Vec<Record>),
    /// Search envelope `{"hits": {"total": n, "hits": [...]}}`
    Hits { total: Option<u64>, records: Vec<Record> },
    /// Any other body, returned as decoded
    Raw(Value),
}

impl Listing {
    pub(crate) fn from_body(body: Value) -> Result<Self> {
        match body {
            Value::Array(items) => Ok(Listing::Records(split(items)?)),
            Value::Object(mut map) => {
                let hits = map
                    .get_mut("hits")
                    .and_then(Value::as_object_mut)
                    .filter(|hits| hits.get("hits").is_some_and(Value::is_array));
                match hits {
                    Some(hits) => {
                        let total = hits.get("total").and_then(total_hits);
                        let items = match hits.remove("hits") {
                            Some(Value::Array(items)) => items,
                            _ => Vec::new(),
                        };
                        Ok(Listing::Hits {
                            total,
                            records: split(items)?,
                        })
                    }
                    None => Ok(Listing::Raw(Value::Object(map))),
                }
            }
            other => Ok(Listing::Raw(other)),
        }
    }

    pub(crate) fn with_reporter(self, reporter: &Arc<dyn Reporter>) -> Self {
        let attach = |records: Vec<Record>| -> Vec<Record> {
            records
                .into_iter()
                .map(|r| r.with_reporter(Arc::clone(reporter)))
                .collect()
        };
        match self {
            Listing::Records(records) => Listing::Records(attach(records)),
            Listing::Hits { total, records } => Listing::Hits {
                total,
                records: attach(records),
            },
            raw @ Listing::Raw(_) => raw,
        }
    }

    /// Records of the listing; empty for a raw body.
    pub fn records(&self) -> &[Record] {
        match self {
            Listing::Records(records) | Listing::Hits { records, .. } => records,
            Listing::Raw(_) => &[],
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            Listing::Records(records) | Listing::Hits { records, .. } => records,
            Listing::Raw(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// JSON view of the listing, for printing.
    pub fn to_value(&self) -> Value {
        match self {
            Listing::Records(records) => {
                Value::Array(records.iter().map(|r| r.clone().into_value()).collect())
            }
            Listing::Hits { total, records } => serde_json::json!({
                "total": total,
                "hits": records.iter().map(|r| r.clone().into_value()).collect::<Vec<_>>(),
            }),
            Listing::Raw(value) => value.clone(),
        }
    }
}

// Newer search backends report `{"value": n, "relation": "eq"}`.
fn total_hits(total: &Value) -> Option<u64> {
    total
        .as_u64()
        .or_else(|| total.get("value").and_then(Value::as_u64))
}

fn split(items: Vec<Value>) -> Result<Vec<Record>> {
    items.into_iter().map(Record::from_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_urls() {
        assert_eq!(Endpoint::Production.base_url(), "https://zenodo.org/api");
        assert_eq!(Endpoint::Sandbox.base_url(), "https://sandbox.zenodo.org/api");
    }

    #[test]
    fn test_custom_endpoint_normalized() {
        let endpoint = Endpoint::custom("http://localhost:5000/api//").unwrap();
        assert_eq!(endpoint.base_url(), "http://localhost:5000/api");

        assert!(Endpoint::custom("").is_err());
        assert!(Endpoint::custom("ftp://example.org").is_err());
        assert!(Endpoint::custom("not a url").is_err());
    }

    #[test]
    fn test_sandbox_switch() {
        let config = ClientConfig::new().sandbox(true);
        assert!(config.sandbox);
        assert_eq!(config.endpoint, Endpoint::Sandbox);

        let custom = Endpoint::custom("http://127.0.0.1:9000").unwrap();
        let config = ClientConfig::new().with_endpoint(custom.clone()).sandbox(true);
        assert_eq!(config.endpoint, custom);
        assert!(config.sandbox);
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new().with_token("abc");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_listing_plain_array() {
        let listing = Listing::from_body(json!([{"id": 1}, {"id": 2}, {"id": 3}])).unwrap();
        assert!(matches!(listing, Listing::Records(_)));
        assert_eq!(listing.len(), 3);
    }

    #[test]
    fn test_listing_hits_envelope_keeps_order() {
        let body = json!({
            "hits": {"total": 2, "hits": [{"id": 10}, {"id": 20}]},
            "links": {"self": "https://zenodo.org/api/records?page=1"}
        });
        let listing = Listing::from_body(body).unwrap();
        match &listing {
            Listing::Hits { total, records } => {
                assert_eq!(*total, Some(2));
                assert_eq!(records[0].id().unwrap(), 10);
                assert_eq!(records[1].id().unwrap(), 20);
            }
            other => panic!("Expected hits, got: {:?}", other),
        }

        let mut records = listing.into_records();
        records[0].insert("title", json!("changed"));
        assert!(records[1].get("title").is_none());
    }

    #[test]
    fn test_listing_total_object() {
        let body = json!({"hits": {"total": {"value": 7, "relation": "eq"}, "hits": []}});
        match Listing::from_body(body).unwrap() {
            Listing::Hits { total, records } => {
                assert_eq!(total, Some(7));
                assert!(records.is_empty());
            }
            other => panic!("Expected hits, got: {:?}", other),
        }
    }

    #[test]
    fn test_listing_other_shape_is_raw() {
        let listing = Listing::from_body(json!("@misc{x}")).unwrap();
        assert!(matches!(listing, Listing::Raw(Value::String(_))));
        assert!(listing.is_empty());

        let listing = Listing::from_body(json!({"aggregations": {}})).unwrap();
        assert!(matches!(listing, Listing::Raw(_)));
    }

    #[test]
    fn test_listing_rejects_non_object_items() {
        assert!(Listing::from_body(json!([1, 2])).is_err());
    }
}
