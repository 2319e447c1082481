//! Files of a deposition: upload, download, ordering and removal.

use crate::client::ZenodoClient;
use crate::credentials::expand_home;
use crate::error::{Result, ZenodoError};
use crate::record::Record;
use crate::report::Notice;
use crate::status::remote_error;
use crate::transport::{ApiRequest, Method};
use crate::types::{validate_url, BucketTarget, Destination, Listing};
use percent_encoding::percent_decode_str;
use serde_json::{json, Value};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File collection of a deposition.
pub struct DepositionFiles<'a> {
    client: &'a ZenodoClient,
}

impl<'a> DepositionFiles<'a> {
    pub(crate) fn new(client: &'a ZenodoClient) -> Self {
        Self { client }
    }

    pub fn list(&self, deposition_id: u64) -> Result<Listing> {
        let url = self.client.deposition_files_url(check_id(deposition_id)?);
        let response = self
            .client
            .send(self.client.request(Method::Get, url)?, &[200])?;
        self.client.listing(response.body)
    }

    pub fn retrieve(&self, deposition_id: u64, file_id: &str) -> Result<Record> {
        let url = self.file_url(deposition_id, file_id)?;
        Record::fetch_url(self.client, &url)
    }

    /// Stream a local file into a bucket. The remote name is the local
    /// file name.
    pub fn upload(&self, path: impl AsRef<Path>, bucket: BucketTarget<'_>) -> Result<Record> {
        let path = expand_home(path.as_ref());
        if !path.is_file() {
            return Err(ZenodoError::InvalidArgument(format!(
                "The file to upload ({}) does not exist",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ZenodoError::InvalidArgument(format!(
                    "The file name of {} is not valid UTF-8",
                    path.display()
                ))
            })?
            .to_string();

        let bucket_url = match bucket {
            BucketTarget::Url(url) => url.trim().trim_end_matches('/').to_string(),
            BucketTarget::Record(record) => record.bucket_url()?,
        };
        let mut target = validate_url(&bucket_url)?;
        let namespace = format!("{}/", self.client.files_namespace());
        if !bucket_url.starts_with(&namespace) {
            return Err(ZenodoError::InvalidArgument(format!(
                "The bucket URL ({bucket_url}) is not under {namespace}"
            )));
        }
        target
            .path_segments_mut()
            .map_err(|()| ZenodoError::InvalidArgument(format!("Invalid bucket URL: {bucket_url}")))?
            .pop_if_empty()
            .push(&name);

        debug!(file = %path.display(), url = %target, "Uploading file");
        let headers = vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.client.token()?),
            ),
            (
                "Content-Type".to_string(),
                "application/octet-stream".to_string(),
            ),
        ];
        let request = ApiRequest::new(Method::Put, target.as_str())
            .headers(headers)
            .query(self.client.params()?)
            .file(&path);
        let response = self.client.send(request, &[200, 201])?;

        info!(file = %name, "File uploaded");
        self.client.record(response.body)
    }

    /// Download one file of a deposition through its `links.download`.
    pub fn download(
        &self,
        deposition_id: u64,
        file_id: &str,
        destination: Destination,
    ) -> Result<PathBuf> {
        let file = self.retrieve(deposition_id, file_id)?;
        let url = file.link("download")?;
        let remote_name = ["filename", "key"]
            .into_iter()
            .find_map(|key| file.get(key).and_then(Value::as_str))
            .map(str::to_string);

        self.fetch_to(&url, remote_name, destination)
    }

    /// Download any file URL (a bucket object or a record file).
    pub fn download_url(&self, url: &str, destination: Destination) -> Result<PathBuf> {
        let parsed = validate_url(url)?;
        let remote_name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .and_then(|name| percent_decode_str(name).decode_utf8().ok())
            .map(Cow::into_owned);

        self.fetch_to(url, remote_name, destination)
    }

    /// Set the order of a deposition's files; the first one is previewed.
    pub fn sort(&self, deposition_id: u64, file_ids: &[&str]) -> Result<Listing> {
        let url = self.client.deposition_files_url(check_id(deposition_id)?);
        if file_ids.is_empty() || file_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ZenodoError::InvalidArgument(
                "The file order must be a non-empty list of file ids".into(),
            ));
        }
        let order: Vec<Value> = file_ids.iter().map(|id| json!({ "id": id })).collect();

        let request = self
            .client
            .request(Method::Put, url)?
            .json(Value::Array(order));
        let response = self.client.send(request, &[200])?;
        self.client.listing(response.body)
    }

    /// Rename an uploaded file.
    pub fn rename(&self, deposition_id: u64, file_id: &str, filename: &str) -> Result<Record> {
        let url = self.file_url(deposition_id, file_id)?;
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(ZenodoError::InvalidArgument(
                "The new file name cannot be empty".into(),
            ));
        }

        let request = self
            .client
            .request(Method::Put, url)?
            .json(json!({ "filename": filename }));
        let response = self.client.send(request, &[200])?;
        self.client.record(response.body)
    }

    /// Delete a file of an unpublished deposition.
    pub fn delete(&self, deposition_id: u64, file_id: &str) -> Result<()> {
        let url = self.file_url(deposition_id, file_id)?;
        let request = self.client.request(Method::Delete, url.as_str())?;
        self.client.send(request, &[200, 204])?;

        self.client.notice(Notice::Deleted { url });
        Ok(())
    }

    fn file_url(&self, deposition_id: u64, file_id: &str) -> Result<String> {
        let deposition_id = check_id(deposition_id)?;
        let file_id = file_id.trim();
        if file_id.is_empty() {
            return Err(ZenodoError::InvalidArgument(
                "The deposition file id cannot be empty".into(),
            ));
        }
        Ok(self.client.deposition_file_url(deposition_id, file_id))
    }

    fn fetch_to(
        &self,
        url: &str,
        remote_name: Option<String>,
        destination: Destination,
    ) -> Result<PathBuf> {
        let target = match destination {
            Destination::File(path) => expand_home(&path),
            Destination::Directory(dir) => {
                let dir = expand_home(&dir);
                if !dir.is_dir() {
                    return Err(ZenodoError::InvalidArgument(format!(
                        "The download directory ({}) does not exist",
                        dir.display()
                    )));
                }
                let name = remote_name.ok_or_else(|| {
                    ZenodoError::InvalidArgument(
                        "The remote file has no name; download to an exact file path".into(),
                    )
                })?;
                dir.join(plain_file_name(&name)?)
            }
        };

        debug!(url = %url, target = %target.display(), "Downloading file");
        let request = ApiRequest::new(Method::Get, url)
            .headers(vec![(
                "Authorization".to_string(),
                format!("Bearer {}", self.client.token()?),
            )])
            .query(self.client.params()?);
        let response = self.client.transport().download(request, &target)?;
        if !(200..300).contains(&response.status) {
            return Err(remote_error(response.status, &response.body));
        }

        info!(target = %target.display(), "File downloaded");
        Ok(target)
    }
}

// Server-supplied names must not leave the download directory.
fn plain_file_name(name: &str) -> Result<&str> {
    match Path::new(name).file_name().and_then(|base| base.to_str()) {
        Some(base) if base == name => Ok(base),
        _ => Err(ZenodoError::InvalidArgument(format!(
            "The remote file name ({name}) is not a plain file name; download to an exact file path"
        ))),
    }
}

fn check_id(id: u64) -> Result<u64> {
    if id == 0 {
        return Err(ZenodoError::InvalidArgument(
            "The deposition id must be a positive integer".into(),
        ));
    }
    Ok(id)
}
