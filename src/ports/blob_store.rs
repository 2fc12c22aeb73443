//! Port for the blob store carrying the roster and the Target Document.

use serde_json::Value;

use crate::domain::SyncError;

/// Two-operation JSON blob interface (plus an existence probe). The
/// filesystem and object-store backends implement this; no other component
/// imports storage libraries.
pub trait BlobStore {
    fn save_json(&self, name: &str, data: &Value) -> Result<(), SyncError>;
    fn load_json(&self, name: &str) -> Result<Value, SyncError>;
    fn exists(&self, name: &str) -> Result<bool, SyncError>;
}
