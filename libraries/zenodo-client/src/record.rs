//! Normalized view over one JSON resource.
//!
//! A [`Record`] wraps a single JSON object returned by the API: a deposition
//! draft, a published record, a file entry or a search hit. The shapes differ,
//! so identity, DOI, URL, timestamp, owner and state are derived through
//! fixed fallback chains instead of being stored twice.
//!
//! A value that is JSON `null` or an empty string counts as absent in every
//! chain. Every derived accessor fails with [`StateError::Missing`] when no
//! path of its chain is present.

use crate::client::ZenodoClient;
use crate::error::{Result, StateError, ZenodoError};
use crate::report::{Notice, Reporter, TracingReporter};
use crate::transport::{ApiResponse, Method};
use crate::types::validate_url;
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Index;
use std::sync::Arc;
use tracing::debug;

/// Link names tried, in order, for the canonical URL of a record.
const URL_LINKS: &[&str] = &["self", "record", "record_html", "html", "latest", "latest_html"];

static NULL: Value = Value::Null;

/// Lifecycle state of a deposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositionState {
    Unsubmitted,
    Draft,
    InProgress,
    Done,
}

impl DepositionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositionState::Unsubmitted => "unsubmitted",
            DepositionState::Draft => "draft",
            DepositionState::InProgress => "inprogress",
            DepositionState::Done => "done",
        }
    }
}

impl fmt::Display for DepositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of a deposition: one user id, or several with the first as the
/// primary owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Single(u64),
    Many(Vec<u64>),
}

impl Owner {
    /// Primary owner id.
    pub fn primary(&self) -> Option<u64> {
        match self {
            Owner::Single(id) => Some(*id),
            Owner::Many(ids) => ids.first().copied(),
        }
    }
}

/// One JSON object with derived accessors.
#[derive(Clone)]
pub struct Record {
    data: Map<String, Value>,
    reporter: Arc<dyn Reporter>,
}

impl Record {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Fetch a record by numeric id. `url_for` builds the detail URL of the
    /// collection asking for it.
    pub fn fetch_by_id<F>(client: &ZenodoClient, id: u64, url_for: F) -> Result<Self>
    where
        F: Fn(&ZenodoClient, u64) -> String,
    {
        if id == 0 {
            return Err(ZenodoError::InvalidArgument(
                "Record id must be a positive integer".into(),
            ));
        }
        let url = url_for(client, id);
        Self::fetch(client, &url)
    }

    /// Fetch a record from an explicit API URL.
    pub fn fetch_url(client: &ZenodoClient, url: &str) -> Result<Self> {
        validate_url(url)?;
        Self::fetch(client, url)
    }

    fn fetch(client: &ZenodoClient, url: &str) -> Result<Self> {
        debug!(url = %url, "Fetching record");
        let response = client.send(client.request(Method::Get, url)?, &[200])?;
        client.record(response.body)
    }

    /// Adopt an already decoded JSON object. Fails for `null`, an empty
    /// object, an array or a scalar.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(data) if !data.is_empty() => Ok(Self {
                data,
                reporter: Arc::new(TracingReporter),
            }),
            Value::Object(_) | Value::Null => Err(ZenodoError::InvalidArgument(
                "Cannot build a record from an empty value".into(),
            )),
            Value::Array(_) => Err(ZenodoError::InvalidArgument(
                "Cannot build a record from a JSON array; split the list into one record per element".into(),
            )),
            other => Err(ZenodoError::InvalidArgument(format!(
                "Cannot build a record from a JSON {}",
                json_type(&other)
            ))),
        }
    }

    /// Adopt the body of a response.
    pub fn from_response(response: ApiResponse) -> Result<Self> {
        Self::from_value(response.body)
    }

    /// Route replacement warnings through `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    // -------------------------------------------------------------------------
    // Associative access
    // -------------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }

    // -------------------------------------------------------------------------
    // Derived fields
    // -------------------------------------------------------------------------

    /// `id`, else `record_id`.
    pub fn id(&self) -> Result<u64> {
        self.first_present("id", &[&["id"], &["record_id"]])
            .and_then(|value| as_id("id", value))
    }

    /// `record_id`, else `metadata.prereserve_doi.recid`.
    pub fn record_id(&self) -> Result<u64> {
        self.first_present(
            "record_id",
            &[&["record_id"], &["metadata", "prereserve_doi", "recid"]],
        )
        .and_then(|value| as_id("record_id", value))
    }

    /// `doi`, else `metadata.doi`, else `metadata.prereserve_doi.doi`.
    pub fn doi(&self) -> Result<String> {
        let value = self.first_present(
            "doi",
            &[&["doi"], &["metadata", "doi"], &["metadata", "prereserve_doi", "doi"]],
        )?;
        as_string("doi", value)
    }

    /// `doi_url`, else `links.doi`, else `https://doi.org/<doi>`.
    pub fn doi_url(&self) -> Result<String> {
        if let Ok(value) = self.first_present("doi_url", &[&["doi_url"], &["links", "doi"]]) {
            return as_string("doi_url", value);
        }
        match self.doi() {
            Ok(doi) => Ok(format!("https://doi.org/{doi}")),
            Err(_) => Err(StateError::Missing("doi_url").into()),
        }
    }

    /// `record_url`, else the first of `links.{self, record, record_html,
    /// html, latest, latest_html}`.
    pub fn record_url(&self) -> Result<String> {
        if let Some(value) = present(self.data.get("record_url")) {
            return as_string("record_url", value);
        }
        URL_LINKS
            .iter()
            .find_map(|name| present(self.path(&["links", *name])))
            .ok_or_else(|| StateError::Missing("record_url").into())
            .and_then(|value| as_string("record_url", value))
    }

    /// `modified`, else `updated`.
    pub fn modified(&self) -> Result<String> {
        let value = self.first_present("modified", &[&["modified"], &["updated"]])?;
        as_string("modified", value)
    }

    pub fn created(&self) -> Result<String> {
        let value = self.first_present("created", &[&["created"]])?;
        as_string("created", value)
    }

    /// `owner`, else `owners`.
    pub fn owner(&self) -> Result<Owner> {
        let value = self.first_present("owner", &[&["owner"], &["owners"]])?;
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| as_id("owner", item))
                .collect::<Result<Vec<_>>>()
                .map(Owner::Many),
            other => as_id("owner", other).map(Owner::Single),
        }
    }

    /// Deposition state. An `error` state is itself a failure.
    pub fn state(&self) -> Result<DepositionState> {
        let value = self.first_present("state", &[&["state"]])?;
        let state = as_string("state", value)?;
        match state.as_str() {
            "unsubmitted" => Ok(DepositionState::Unsubmitted),
            "draft" => Ok(DepositionState::Draft),
            "inprogress" => Ok(DepositionState::InProgress),
            "done" => Ok(DepositionState::Done),
            "error" => Err(StateError::Errored.into()),
            _ => Err(StateError::Invalid {
                field: "state",
                value: state,
            }
            .into()),
        }
    }

    /// `title`, else `metadata.title`.
    pub fn title(&self) -> Result<String> {
        let value = self.first_present("title", &[&["title"], &["metadata", "title"]])?;
        as_string("title", value)
    }

    pub fn metadata(&self) -> Result<&Map<String, Value>> {
        self.object("metadata")
    }

    pub fn submitted(&self) -> Result<bool> {
        self.first_present("submitted", &[&["submitted"]])?
            .as_bool()
            .ok_or_else(|| {
                StateError::WrongType {
                    field: "submitted",
                    expected: "boolean",
                }
                .into()
            })
    }

    /// File entries, one record each.
    pub fn files(&self) -> Result<Vec<Record>> {
        let value = self.first_present("files", &[&["files"]])?;
        let items = value.as_array().ok_or(StateError::WrongType {
            field: "files",
            expected: "array",
        })?;
        items
            .iter()
            .map(|item| {
                Record::from_value(item.clone()).map(|r| r.with_reporter(Arc::clone(&self.reporter)))
            })
            .collect()
    }

    pub fn links(&self) -> Result<&Map<String, Value>> {
        self.object("links")
    }

    /// A single entry of `links`.
    pub fn link(&self, name: &str) -> Result<String> {
        match present(self.path(&["links", name])) {
            Some(value) => as_string("links", value),
            None => Err(StateError::Missing("links").into()),
        }
    }

    /// DOI shared by every version (`conceptdoi`).
    pub fn concept_doi(&self) -> Result<String> {
        let value = self.first_present("conceptdoi", &[&["conceptdoi"]])?;
        as_string("conceptdoi", value)
    }

    /// Record id shared by every version (`conceptrecid`).
    pub fn concept_record_id(&self) -> Result<String> {
        match self.first_present("conceptrecid", &[&["conceptrecid"]])? {
            Value::Number(n) => Ok(n.to_string()),
            other => as_string("conceptrecid", other),
        }
    }

    /// Upload bucket of a deposition (`links.bucket`).
    pub fn bucket_url(&self) -> Result<String> {
        match present(self.path(&["links", "bucket"])) {
            Some(value) => as_string("bucket", value),
            None => Err(StateError::Missing("bucket").into()),
        }
    }

    /// Draft created by a `newversion` action (`links.latest_draft`).
    pub fn latest_draft_url(&self) -> Result<String> {
        match present(self.path(&["links", "latest_draft"])) {
            Some(value) => as_string("latest_draft", value),
            None => Err(StateError::Missing("latest_draft").into()),
        }
    }

    // -------------------------------------------------------------------------
    // Setters
    // -------------------------------------------------------------------------

    /// Set `title` and `metadata.title`.
    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.set_mirrored("title", title)
    }

    /// Set `doi` and `metadata.doi`.
    pub fn set_doi(&mut self, doi: &str) -> Result<()> {
        self.set_mirrored("doi", doi)
    }

    /// Set `doi_url` and `metadata.doi_url`.
    pub fn set_doi_url(&mut self, doi_url: &str) -> Result<()> {
        self.set_mirrored("doi_url", doi_url)
    }

    /// Set both `id` and `record_id`.
    pub fn set_id(&mut self, id: u64) -> Result<()> {
        if id == 0 {
            return Err(ZenodoError::InvalidArgument(
                "Record id must be a positive integer".into(),
            ));
        }
        self.data.insert("id".into(), Value::from(id));
        self.data.insert("record_id".into(), Value::from(id));
        Ok(())
    }

    /// A single owner sets `owner`; several set `owner` to the first and
    /// `owners` to all of them.
    pub fn set_owner(&mut self, owner: Owner) -> Result<()> {
        match owner {
            Owner::Single(id) => {
                self.data.insert("owner".into(), Value::from(id));
            }
            Owner::Many(ids) => {
                let first = *ids.first().ok_or_else(|| {
                    ZenodoError::InvalidArgument("Owner list cannot be empty".into())
                })?;
                self.data.insert("owner".into(), Value::from(first));
                self.data.insert("owners".into(), Value::from(ids));
            }
        }
        Ok(())
    }

    /// Set `created`, reporting when an existing value is replaced.
    pub fn set_created(&mut self, created: &str) -> Result<()> {
        require_non_empty("created", created)?;
        if present(self.data.get("created")).is_some() {
            self.reporter.notice(Notice::FieldReplaced { field: "created" });
        }
        self.data.insert("created".into(), Value::from(created));
        Ok(())
    }

    /// Replace the modification time, in whichever of `modified`/`updated`
    /// holds it. Fails when neither exists.
    pub fn set_modified(&mut self, modified: &str) -> Result<()> {
        require_non_empty("modified", modified)?;
        let key = ["modified", "updated"]
            .into_iter()
            .find(|key| present(self.data.get(*key)).is_some())
            .ok_or(StateError::Missing("modified"))?;
        self.data.insert(key.into(), Value::from(modified));
        Ok(())
    }

    // Both writes happen only after every check passed.
    fn set_mirrored(&mut self, field: &'static str, value: &str) -> Result<()> {
        require_non_empty(field, value)?;
        match self.data.get("metadata") {
            None | Some(Value::Null | Value::Object(_)) => {}
            Some(_) => {
                return Err(StateError::WrongType {
                    field: "metadata",
                    expected: "object",
                }
                .into())
            }
        }

        self.data.insert(field.into(), Value::from(value));
        let metadata = self.data.entry("metadata").or_insert(Value::Null);
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        if let Value::Object(metadata) = metadata {
            metadata.insert(field.into(), Value::from(value));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.data.get(*first)?, |value, key| value.get(*key))
    }

    fn first_present(&self, field: &'static str, paths: &[&[&str]]) -> Result<&Value> {
        paths
            .iter()
            .find_map(|path| present(self.path(path)))
            .ok_or_else(|| StateError::Missing(field).into())
    }

    fn object(&self, field: &'static str) -> Result<&Map<String, Value>> {
        self.first_present(field, &[&[field]])?
            .as_object()
            .ok_or_else(|| {
                StateError::WrongType {
                    field,
                    expected: "object",
                }
                .into()
            })
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(value) => Some(value),
    }
}

fn as_string(field: &'static str, value: &Value) -> Result<String> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        StateError::WrongType {
            field,
            expected: "string",
        }
        .into()
    })
}

// Newer API versions send identifiers as digit strings.
fn as_id(field: &'static str, value: &Value) -> Result<u64> {
    let id = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| {
        StateError::WrongType {
            field,
            expected: "non-negative integer",
        }
        .into()
    })
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ZenodoError::InvalidArgument(format!(
            "The '{field}' value cannot be empty"
        )));
    }
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl TryFrom<Value> for Record {
    type Error = ZenodoError;

    fn try_from(value: Value) -> Result<Self> {
        Record::from_value(value)
    }
}

impl Index<&str> for Record {
    type Output = Value;

    /// Missing keys index to `null`, as with [`serde_json::Value`].
    fn index(&self, key: &str) -> &Value {
        self.data.get(key).unwrap_or(&NULL)
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record").field("data", &self.data).finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string_pretty(&self.data).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
