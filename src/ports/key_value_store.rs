//! Port for the durable keyed store backing extractor token state.

use crate::domain::SyncError;

/// Arbitrary key/value persistence with durable writes. Implementations
/// must make a completed `set` visible to the next `get`, including across
/// processes (write-then-reload semantics).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SyncError>;
}
