//! Published record search and retrieval.

use crate::client::ZenodoClient;
use crate::depositions::{search_params, SearchFilter};
use crate::error::{Result, ZenodoError};
use crate::record::Record;
use crate::report::Notice;
use crate::transport::Method;
use crate::types::{validate_url, Listing, RecordQuery};
use crate::vocabulary::ContentType;
use tracing::debug;

/// Published records of a [`ZenodoClient`].
pub struct Records<'a> {
    client: &'a ZenodoClient,
}

impl<'a> Records<'a> {
    pub(crate) fn new(client: &'a ZenodoClient) -> Self {
        Self { client }
    }

    /// Search published records. Non-JSON encodings (BibTeX, XML) come back
    /// as [`Listing::Raw`] holding the text.
    pub fn list(&self, query: &RecordQuery) -> Result<Listing> {
        let content_type = query.content_type.unwrap_or_else(|| {
            self.client.notice(Notice::DefaultApplied {
                field: "content_type",
                value: ContentType::Json.as_str().into(),
            });
            ContentType::Json
        });

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
        let filters = [
            ("communities", &query.communities),
            ("type", &query.record_type),
            ("subtype", &query.subtype),
            ("bounds", &query.bounds),
            ("custom", &query.custom),
        ];
        for (name, value) in filters {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push((name.into(), value.into()));
            }
        }

        let url = self.client.records_url();
        debug!(url = %url, content_type = %content_type, "Searching records");
        let request = self
            .client
            .request(Method::Get, url)?
            .headers(self.client.headers(Some(content_type))?)
            .query(params);
        let response = self.client.send(request, &[200])?;

        self.client.listing(response.body)
    }

    pub fn retrieve(&self, id: u64) -> Result<Record> {
        Record::fetch_by_id(self.client, id, ZenodoClient::record_url)
    }

    /// Retrieve by API URL, which must lie under the records collection.
    pub fn retrieve_url(&self, url: &str) -> Result<Record> {
        let url = url.trim().trim_end_matches('/');
        validate_url(url)?;
        let prefix = format!("{}/", self.client.records_url());
        if !url.starts_with(&prefix) {
            return Err(ZenodoError::InvalidArgument(format!(
                "The URL ({url}) is not a record of {}",
                self.client.base_url()
            )));
        }
        Record::fetch_url(self.client, url)
    }
}
