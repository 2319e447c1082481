//! Error types for the Zenodo client.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to a Zenodo instance.
#[derive(Error, Debug)]
pub enum ZenodoError {
    /// A caller-supplied value was missing, empty, of the wrong shape or
    /// outside its controlled vocabulary. Raised before any network call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Credential file missing or malformed, or a section/key lookup failed
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Server answered with a status the operation does not accept
    #[error("{0}")]
    Remote(RemoteError),

    /// A derived field could not be resolved from the record data
    #[error("Record state error: {0}")]
    State(#[from] StateError),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    /// IO error during upload/download or credential file access
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ZenodoError {
    /// HTTP status carried by a remote failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ZenodoError::Remote(remote) => Some(remote.status),
            _ => None,
        }
    }
}

/// Result type for Zenodo client operations.
pub type Result<T> = std::result::Result<T, ZenodoError>;

/// Failures of the credential store.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No config file found at {}. Create one with `zenodo config init` or pass a token explicitly.", .0.display())]
    NotFound(PathBuf),

    #[error("A config file already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Malformed config file {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Section [{section}] does not exist in {}", .path.display())]
    UnknownSection { section: String, path: PathBuf },

    #[error("Key '{key}' does not exist in section [{section}]")]
    UnknownKey { section: String, key: String },

    #[error("The token '{key}' already exists in section [{section}]; force the rewrite to overwrite it")]
    DuplicateKey { section: String, key: String },

    #[error("Section [{section}] holds no token")]
    EmptySection { section: String },

    #[error("A token name is required")]
    MissingKey,

    #[error("No credential store is loaded and no token was supplied")]
    NoCredentials,

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A derived record field that could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("The record field '{0}' is not set or accessible")]
    Missing(&'static str),

    #[error("The record field '{field}' has an unexpected JSON type (expected {expected})")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("The record field '{field}' holds an invalid value: {value}")]
    Invalid { field: &'static str, value: String },

    #[error("Deposition is in an error state - contact Zenodo support at https://zenodo.org/support")]
    Errored,
}

/// A non-success response from the server.
#[derive(Debug)]
pub struct RemoteError {
    pub status: u16,
    /// Human-readable status name ("Not Found", "Conflict", ...)
    pub name: &'static str,
    pub description: Option<&'static str>,
    /// Decoded JSON error body, when the server sent one
    pub body: Option<ApiErrorBody>,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Server error ({} {})", self.status, self.name)?;
        if let Some(description) = self.description {
            write!(f, ": {description}")?;
        }
        if let Some(body) = &self.body {
            if let Some(message) = &body.message {
                write!(f, " - {message}")?;
            }
            for error in &body.errors {
                match &error.field {
                    Some(field) => write!(f, "\n  {field}: {}", error.message)?,
                    None => write!(f, "\n  {}", error.message)?,
                }
            }
        }
        Ok(())
    }
}

/// Error response body as documented by the Zenodo REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

/// Per-field validation message inside an [`ApiErrorBody`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}
