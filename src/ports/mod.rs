//! Trait seams between the pipeline and the outside world.

pub mod blob_store;
pub mod key_value_store;
pub mod target_api;

pub use blob_store::BlobStore;
pub use key_value_store::KeyValueStore;
pub use target_api::{ApiGroup, ApiUser, RoleAssignment, TargetApi, UserUpdate};
