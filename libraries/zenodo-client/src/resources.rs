//! Vocabulary resources: licenses, communities, funders and grants.

use crate::client::ZenodoClient;
use crate::error::{Result, ZenodoError};
use crate::record::Record;
use crate::transport::Method;
use crate::types::{Listing, ResourceQuery};
use crate::vocabulary::ResourceKind;
use tracing::debug;

/// Read-only collection of one [`ResourceKind`].
pub struct Resources<'a> {
    client: &'a ZenodoClient,
    kind: ResourceKind,
}

impl<'a> Resources<'a> {
    pub(crate) fn new(client: &'a ZenodoClient, kind: ResourceKind) -> Self {
        Self { client, kind }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn list(&self, query: &ResourceQuery) -> Result<Listing> {
        let mut params = self.client.params()?;
        if let Some(q) = query.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            params.push(("q".into(), q.into()));
        }
        for (name, value) in [("page", query.page), ("size", query.size)] {
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

        let url = self.client.resource_collection_url(self.kind);
        debug!(url = %url, kind = %self.kind, "Listing resources");
        let request = self.client.request(Method::Get, url)?.query(params);
        let response = self.client.send(request, &[200])?;

        self.client.listing(response.body)
    }

    /// Fetch one entry by its identifier (`cc-by`, a community slug, a
    /// funder DOI, `<funder>::<grant>`).
    pub fn retrieve(&self, id: &str) -> Result<Record> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ZenodoError::InvalidArgument(format!(
                "A {} identifier is required",
                self.kind.as_str()
            )));
        }
        Record::fetch_url(self.client, &self.client.resource_url(self.kind, id))
    }
}
