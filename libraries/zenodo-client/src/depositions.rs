//! Deposition operations.

use crate::client::ZenodoClient;
use crate::error::{Result, ZenodoError};
use crate::metadata::MetadataUpdate;
use crate::record::Record;
use crate::report::Notice;
use crate::transport::Method;
use crate::types::{validate_url, DepositionQuery, DepositionTarget, Listing};
use crate::vocabulary::{SearchSort, SearchStatus};
use serde_json::json;
use tracing::{debug, info};

/// Deposition collection of a [`ZenodoClient`].
pub struct Depositions<'a> {
    client: &'a ZenodoClient,
}

impl<'a> Depositions<'a> {
    pub(crate) fn new(client: &'a ZenodoClient) -> Self {
        Self { client }
    }

    /// Create an empty deposition.
    pub fn create(&self) -> Result<Record> {
        let url = self.client.deposition_collection_url();
        let request = self.client.request(Method::Post, url)?.json(json!({}));
        let response = self.client.send(request, &[201])?;

        let record = self.client.record(response.body)?;
        info!(id = ?record.id().ok(), "Deposition created");
        Ok(record)
    }

    /// List the depositions of the authenticated user.
    pub fn list(&self, query: &DepositionQuery) -> Result<Listing> {
        let mut params = self.client.params()?;
        search_params(
            self.client,
            &SearchFilter {
                query: query.query.as_deref(),
                status: query.status,
                sort: query.sort,
                page: query.page,
                size: query.size,
                all_versions: query.all_versions,
            },
            &mut params,
        )?;

        let url = self.client.deposition_collection_url();
        debug!(url = %url, params = params.len(), "Listing depositions");
        let request = self.client.request(Method::Get, url)?.query(params);
        let response = self.client.send(request, &[200])?;

        self.client.listing(response.body)
    }

    pub fn retrieve(&self, id: u64) -> Result<Record> {
        Record::fetch_by_id(self.client, id, ZenodoClient::deposition_url)
    }

    /// Retrieve by API URL, which must lie under the deposition collection.
    pub fn retrieve_url(&self, url: &str) -> Result<Record> {
        let url = self.owned_url(url)?;
        Record::fetch_url(self.client, &url)
    }

    /// Re-read the deposition's metadata, apply `update` over it and store
    /// the result.
    pub fn update(&self, target: impl Into<DepositionTarget>, update: &MetadataUpdate) -> Result<Record> {
        let url = self.target_url(target.into())?;
        let current = Record::fetch_url(self.client, &url)?;

        let existing = match current.get("metadata") {
            Some(serde_json::Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };
        let metadata = update.resolve(&existing, self.client.reporter().as_ref())?;

        let request = self
            .client
            .request(Method::Put, url.as_str())?
            .json(json!({ "metadata": metadata }));
        let response = self.client.send(request, &[200])?;

        info!(url = %url, "Deposition metadata updated");
        self.client.record(response.body)
    }

    /// Delete an unpublished deposition.
    pub fn delete(&self, target: impl Into<DepositionTarget>) -> Result<()> {
        let url = self.target_url(target.into())?;
        let request = self.client.request(Method::Delete, url.as_str())?;
        self.client.send(request, &[201, 204])?;

        self.client.notice(Notice::Deleted { url });
        Ok(())
    }

    fn target_url(&self, target: DepositionTarget) -> Result<String> {
        match target {
            DepositionTarget::Id(0) => Err(ZenodoError::InvalidArgument(
                "The deposition id must be a positive integer".into(),
            )),
            DepositionTarget::Id(id) => Ok(self.client.deposition_url(id)),
            DepositionTarget::Url(url) => self.owned_url(&url),
        }
    }

    fn owned_url(&self, url: &str) -> Result<String> {
        let url = url.trim().trim_end_matches('/');
        validate_url(url)?;
        let prefix = format!("{}/", self.client.deposition_collection_url());
        if !url.starts_with(&prefix) {
            return Err(ZenodoError::InvalidArgument(format!(
                "The URL ({url}) is not a deposition of {}",
                self.client.base_url()
            )));
        }
        Ok(url.to_string())
    }
}

/// Search filters shared by depositions and records.
pub(crate) struct SearchFilter<'q> {
    pub query: Option<&'q str>,
    pub status: Option<SearchStatus>,
    pub sort: Option<SearchSort>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub all_versions: Option<bool>,
}

/// Append search parameters, defaulting `status` and `sort` with a notice.
pub(crate) fn search_params(
    client: &ZenodoClient,
    filter: &SearchFilter<'_>,
    params: &mut Vec<(String, String)>,
) -> Result<()> {
    if let Some(query) = filter.query.map(str::trim).filter(|q| !q.is_empty()) {
        params.push(("q".into(), query.into()));
    }

    let status = filter.status.unwrap_or_else(|| {
        client.notice(Notice::DefaultApplied {
            field: "status",
            value: SearchStatus::Published.as_str().into(),
        });
        SearchStatus::Published
    });
    params.push(("status".into(), status.as_str().into()));

    let sort = filter.sort.unwrap_or_else(|| {
        client.notice(Notice::DefaultApplied {
            field: "sort",
            value: SearchSort::BestMatch.as_str().into(),
        });
        SearchSort::BestMatch
    });
    params.push(("sort".into(), sort.as_str().into()));

    for (name, value) in [("page", filter.page), ("size", filter.size)] {
        match value {
            Some(0) => {
                return Err(ZenodoError::InvalidArgument(format!(
                    "The '{name}' argument must be a positive integer"
                )))
            }
            Some(n) => params.push((name.into(), n.to_string())),
            None => {}
        }
    }

    if let Some(all_versions) = filter.all_versions {
        params.push(("all_versions".into(), all_versions.to_string()));
    }
    Ok(())
}
