//! In-memory registry with canned replies.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{Params, RegistryClient, RegistryError};

/// Canned outcome of a GET.
#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Status(u16),
}

/// Registry that answers from preloaded replies and records every call.
///
/// Calls with no canned reply fail with HTTP 404.
///
/// # Examples
///
/// ```
/// use overlay_labels::registry::{MemoryRegistry, RegistryClient};
/// use serde_json::json;
///
/// let registry = MemoryRegistry::new();
/// registry.insert("overlay", &[("itemId", "base")], json!([]));
///
/// assert_eq!(registry.get("overlay", &[("itemId", "base")]).unwrap(), json!([]));
/// assert_eq!(registry.calls(), vec!["GET overlay?itemId=base".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    replies: RefCell<HashMap<String, Reply>>,
    files: RefCell<HashMap<String, Vec<u8>>>,
    calls: RefCell<Vec<String>>,
}

fn request_key(path: &str, params: Params<'_>) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}?{}", path, query.join("&"))
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with `params` by returning `reply`.
    pub fn insert(&self, path: &str, params: Params<'_>, reply: Value) {
        self.replies.borrow_mut().insert(request_key(path, params), Reply::Json(reply));
    }

    /// Answer `path` with `params` by failing with an HTTP status.
    pub fn insert_status(&self, path: &str, params: Params<'_>, status: u16) {
        self.replies.borrow_mut().insert(request_key(path, params), Reply::Status(status));
    }

    /// Serve `bytes` as the contents of `file_id`.
    pub fn insert_file(&self, file_id: &str, bytes: Vec<u8>) {
        self.files.borrow_mut().insert(file_id.to_string(), bytes);
    }

    /// Every call made so far, e.g. `GET item/x/files?limit=2` or `DOWNLOAD f1`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl RegistryClient for MemoryRegistry {
    fn get(&self, path: &str, params: Params<'_>) -> Result<Value, RegistryError> {
        let key = request_key(path, params);
        self.calls.borrow_mut().push(format!("GET {}", key));

        match self.replies.borrow().get(&key) {
            Some(Reply::Json(value)) => Ok(value.clone()),
            Some(Reply::Status(status)) => {
                Err(RegistryError::Status { status: *status, path: path.to_string() })
            }
            None => Err(RegistryError::Status { status: 404, path: path.to_string() }),
        }
    }

    fn download_file(&self, file_id: &str, local_path: &Path) -> Result<(), RegistryError> {
        self.calls.borrow_mut().push(format!("DOWNLOAD {}", file_id));

        let files = self.files.borrow();
        let bytes = files.get(file_id).ok_or_else(|| RegistryError::Status {
            status: 404,
            path: format!("file/{}/download", file_id),
        })?;
        fs::write(local_path, bytes)
            .map_err(|source| RegistryError::Io { file_id: file_id.to_string(), source })
    }
}
