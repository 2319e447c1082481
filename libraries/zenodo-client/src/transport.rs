//! HTTP boundary of the client.
//!
//! Every collection talks to the server through the [`Transport`] trait so the
//! wire layer can be swapped out (tests use a mock). [`ReqwestTransport`] is the
//! production implementation on top of `reqwest::blocking`.

use crate::error::{Result, ZenodoError};
use reqwest::blocking::{Body, Client};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;

/// HTTP verbs used by the Zenodo API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Streamed from disk in bounded chunks
    File(PathBuf),
}

/// A fully resolved request: absolute URL, headers and query parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.body = RequestBody::File(path.into());
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a header (case-insensitive name match), if present.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status code plus decoded body.
///
/// JSON bodies are parsed; any other non-empty body is kept as a JSON string
/// and an empty body becomes `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub(crate) fn from_text(status: u16, text: &str) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };
        Self { status, body }
    }
}

/// Performs one request-response cycle. No retries.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Send the request and decode the response body.
    fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;

    /// Send the request and stream a successful (2xx) response body into a
    /// new file at `target`. The returned body is `null` on success; error
    /// bodies are decoded and nothing is written.
    fn download(&self, request: ApiRequest, target: &Path) -> Result<ApiResponse>;
}

/// Blocking reqwest implementation of [`Transport`].
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(format!("zenodo-client/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ZenodoError::Request)?;

        Ok(Self { http })
    }

    fn send(&self, request: ApiRequest) -> Result<reqwest::blocking::Response> {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
            Method::Put => self.http.put(&request.url),
            Method::Delete => self.http.delete(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let has_content_type = request.header_value("content-type").is_some();
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::File(path) => {
                let file = File::open(&path)?;
                let length = file.metadata()?.len();
                if !has_content_type {
                    builder = builder.header("Content-Type", "application/octet-stream");
                }
                builder.body(Body::sized(file, length))
            }
        };

        builder.send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ZenodoError::ServerUnreachable(e.to_string())
            } else {
                ZenodoError::Request(e)
            }
        })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let response = self.send(request)?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|e| ZenodoError::Parse(format!("Failed to read response body: {}", e)))?;

        Ok(ApiResponse::from_text(status, &text))
    }

    fn download(&self, request: ApiRequest, target: &Path) -> Result<ApiResponse> {
        let mut response = self.send(request)?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Ok(ApiResponse::from_text(status.as_u16(), &text));
        }

        let written = stream_to(&mut response, target)?;
        debug!(bytes = written, target = %target.display(), "Response body streamed");

        Ok(ApiResponse::new(status.as_u16(), Value::Null))
    }
}

/// Copy `body` into a sibling temp file and move it over `target` once
/// complete. An interrupted body leaves `target` untouched.
fn stream_to(body: &mut impl Read, target: &Path) -> Result<u64> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut partial = NamedTempFile::new_in(dir)?;
    let written = {
        let mut sink = BufWriter::new(partial.as_file_mut());
        let written = io::copy(body, &mut sink)?;
        sink.flush()?;
        written
    };
    partial.persist(target).map_err(|e| e.error)?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    struct BrokenBody {
        sent: bool,
    }

    impl Read for BrokenBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"a,b\n");
            Ok(4)
        }
    }

    #[test]
    fn test_stream_to_replaces_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("data.csv");
        fs::write(&target, "old").unwrap();

        let written = stream_to(&mut &b"a,b\n1,2\n"[..], &target).unwrap();
        assert_eq!(written, 8);
        assert_eq!(fs::read_to_string(&target).unwrap(), "a,b\n1,2\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_interrupted_stream_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("data.csv");

        let result = stream_to(&mut BrokenBody { sent: false }, &target);
        assert!(matches!(result, Err(ZenodoError::Io(_))));
        assert!(!target.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_json_body_decoded() {
        let response = ApiResponse::from_text(200, r#"{"id": 7}"#);
        assert_eq!(response.body, json!({"id": 7}));
    }

    #[test]
    fn test_text_body_kept_as_string() {
        let response = ApiResponse::from_text(200, "@article{x, title={T}}");
        assert_eq!(response.body, json!("@article{x, title={T}}"));
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(ApiResponse::from_text(204, "").body, Value::Null);
        assert_eq!(ApiResponse::from_text(204, "  \n").body, Value::Null);
    }

    #[test]
    fn test_request_lookups() {
        let request = ApiRequest::new(Method::Get, "https://zenodo.org/api/records")
            .headers(vec![("Content-Type".into(), "application/json".into())])
            .query(vec![("q".into(), "title:foo".into())]);

        assert_eq!(request.query_value("q"), Some("title:foo"));
        assert_eq!(request.query_value("page"), None);
        assert_eq!(request.header_value("content-type"), Some("application/json"));
    }
}
