//! Concrete implementations of the outward-facing ports.

pub mod env_file_store;
pub mod http;
pub mod storage;
pub mod timecamp_api;
pub mod token_manager;

pub use env_file_store::EnvFileStore;
pub use http::{HttpClient, RetryPolicy};
pub use storage::{LocalBlobStore, S3BlobStore, storage_from_env};
pub use timecamp_api::TimeCampApi;
pub use token_manager::TokenManager;
