//! Access to the remote resource registry.
//!
//! The pipeline only talks to the registry through [`RegistryClient`]. Two
//! implementations are provided:
//! - [`GirderClient`] - blocking HTTP client for a Girder REST API
//! - [`MemoryRegistry`] - canned replies, used for tests and offline runs

pub mod girder;
pub mod memory;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

pub use girder::GirderClient;
pub use memory::MemoryRegistry;

/// Query parameters of a registry call, in request order.
pub type Params<'a> = &'a [(&'a str, &'a str)];

/// HTTP status the registry uses for malformed requests.
pub const STATUS_BAD_REQUEST: u16 = 400;

/// Error type for registry calls
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry answered with a non-success status
    #[error("HTTP {status} from {path}")]
    Status { status: u16, path: String },
    /// The request never produced a response
    #[error("transport error on {path}: {message}")]
    Transport { path: String, message: String },
    /// The response body did not have the expected shape
    #[error("malformed reply from {path}: {message}")]
    Decode { path: String, message: String },
    /// A download could not be written locally
    #[error("cannot store file {file_id}: {source}")]
    Io {
        file_id: String,
        #[source]
        source: std::io::Error,
    },
    /// Authentication was rejected or returned no token
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl RegistryError {
    /// True for the malformed-request class (HTTP 400).
    pub fn is_client_error(&self) -> bool {
        self.status() == Some(STATUS_BAD_REQUEST)
    }

    /// HTTP status of the failure, if the registry answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Blocking interface to a resource registry.
pub trait RegistryClient {
    /// Issue a GET against `path` (relative to the API root) and return the JSON reply.
    fn get(&self, path: &str, params: Params<'_>) -> Result<Value, RegistryError>;

    /// Download the contents of a file into `local_path`, replacing it.
    fn download_file(&self, file_id: &str, local_path: &Path) -> Result<(), RegistryError>;

    /// Fetch an item descriptor.
    fn get_item(&self, item_id: &str) -> Result<Value, RegistryError> {
        self.get(&format!("item/{}", item_id), &[])
    }
}

impl<C: RegistryClient + ?Sized> RegistryClient for &C {
    fn get(&self, path: &str, params: Params<'_>) -> Result<Value, RegistryError> {
        (**self).get(path, params)
    }

    fn download_file(&self, file_id: &str, local_path: &Path) -> Result<(), RegistryError> {
        (**self).download_file(file_id, local_path)
    }

    fn get_item(&self, item_id: &str) -> Result<Value, RegistryError> {
        (**self).get_item(item_id)
    }
}

/// Convert a JSON reply into a typed document, naming `path` on failure.
pub fn decode_reply<T: DeserializeOwned>(path: &str, reply: Value) -> Result<T, RegistryError> {
    serde_json::from_value(reply)
        .map_err(|e| RegistryError::Decode { path: path.to_string(), message: e.to_string() })
}
