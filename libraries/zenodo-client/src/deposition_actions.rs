//! Deposition lifecycle actions.
//!
//! `publish` moves a draft to `done`, `edit` reopens a published deposition,
//! `discard` drops the current editing session and `newversion` creates a
//! new draft linked to the original. The `newversion` answer describes the
//! original deposition; the new draft is fetched from `links.latest_draft`.

use crate::client::ZenodoClient;
use crate::error::{Result, ZenodoError};
use crate::record::Record;
use crate::transport::Method;
use crate::vocabulary::DepositionAction;
use tracing::info;

/// Action endpoints of a deposition.
pub struct DepositionActions<'a> {
    client: &'a ZenodoClient,
}

impl<'a> DepositionActions<'a> {
    pub(crate) fn new(client: &'a ZenodoClient) -> Self {
        Self { client }
    }

    /// Run an action. For `newversion` the returned record is the new
    /// draft.
    pub fn perform(&self, deposition_id: u64, action: DepositionAction) -> Result<Record> {
        let record = self.action_response(deposition_id, action)?;

        match action {
            DepositionAction::NewVersion => {
                let draft_url = record.latest_draft_url()?;
                Record::fetch_url(self.client, &draft_url)
            }
            _ => Ok(record),
        }
    }

    /// Run an action and return the server's own answer. `newversion`
    /// answers with the source deposition; its draft is not fetched.
    pub fn action_response(
        &self,
        deposition_id: u64,
        action: DepositionAction,
    ) -> Result<Record> {
        if deposition_id == 0 {
            return Err(ZenodoError::InvalidArgument(
                "The deposition id must be a positive integer".into(),
            ));
        }

        let url = self.client.deposition_action_url(deposition_id, action);
        let request = self.client.request(Method::Post, url)?;
        let response = self.client.send(request, &[200, 201, 202])?;
        let record = self.client.record(response.body)?;
        info!(id = deposition_id, action = %action, "Deposition action performed");

        Ok(record)
    }

    pub fn publish(&self, deposition_id: u64) -> Result<Record> {
        self.perform(deposition_id, DepositionAction::Publish)
    }

    pub fn edit(&self, deposition_id: u64) -> Result<Record> {
        self.perform(deposition_id, DepositionAction::Edit)
    }

    pub fn discard(&self, deposition_id: u64) -> Result<Record> {
        self.perform(deposition_id, DepositionAction::Discard)
    }

    /// Create a new version and return its draft.
    pub fn new_version(&self, deposition_id: u64) -> Result<Record> {
        self.perform(deposition_id, DepositionAction::NewVersion)
    }
}
