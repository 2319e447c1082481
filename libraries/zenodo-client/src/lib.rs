//! Zenodo Client
//!
//! Blocking HTTP client for the Zenodo REST API, production or sandbox.
//!
//! # Features
//!
//! - **Credentials**: Tokens read from an INI-style `~/.zenodorc`, per section
//! - **Depositions**: Create, search, retrieve, update metadata, delete
//! - **Actions**: Publish, edit, discard, new version
//! - **Files**: Bucket upload, download, sort, rename, delete
//! - **Records**: Search published records in JSON, BibTeX or XML encodings
//! - **Resources**: Licenses, communities, funders and grants
//!
//! # Example
//!
//! ```ignore
//! use zenodo_client::{
//!     BucketTarget, ClientConfig, Creator, MetadataUpdate, UploadType, ZenodoClient,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ZenodoClient::new(ClientConfig::new().sandbox(true))?;
//!
//!     // Create an empty deposition and describe it
//!     let deposition = client.depositions().create()?;
//!     let update = MetadataUpdate::new(UploadType::Dataset, "Field measurements")
//!         .with_description("Raw readings")
//!         .with_creator(Creator::new("Doe, Jane"));
//!     let deposition = client.depositions().update(deposition.id()?, &update)?;
//!
//!     // Upload into its bucket, then publish
//!     client
//!         .deposition_files()
//!         .upload("readings.csv".as_ref(), BucketTarget::Record(&deposition))?;
//!     let published = client.deposition_actions().publish(deposition.id()?)?;
//!     println!("Published {}", published.doi_url()?);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod credentials;
mod deposition_actions;
mod deposition_files;
mod depositions;
mod error;
mod metadata;
mod record;
mod records;
mod report;
mod resources;
mod status;
mod transport;
mod types;
mod vocabulary;

// Re-export main types
pub use client::ZenodoClient;
pub use credentials::{
    default_config_path, expand_home, section_for, CredentialStore, PLACEHOLDER_TOKEN,
    PRODUCTION_SECTION, SANDBOX_SECTION,
};
pub use error::{
    ApiErrorBody, ConfigError, FieldError, RemoteError, Result, StateError, ZenodoError,
};
pub use metadata::{Creator, MetadataUpdate};
pub use record::{DepositionState, Owner, Record};
pub use report::{MemoryReporter, Notice, Reporter, TracingReporter};
pub use status::{describe, expect_status, remote_error, status_name, StatusInfo};
pub use transport::{ApiRequest, ApiResponse, Method, RequestBody, ReqwestTransport, Transport};
pub use types::{
    BucketTarget, ClientConfig, DepositionQuery, DepositionTarget, Destination, Endpoint,
    Listing, RecordQuery, ResourceQuery,
};
pub use vocabulary::{
    funder_doi, AccessRight, ContentType, DepositionAction, ImageType, PublicationType,
    ResourceKind, SearchSort, SearchStatus, UploadType, CREATOR_FIELDS, FUNDER_DOIS,
};

// Re-export sub-clients for direct use if needed
pub use deposition_actions::DepositionActions;
pub use deposition_files::DepositionFiles;
pub use depositions::Depositions;
pub use records::Records;
pub use resources::Resources;
