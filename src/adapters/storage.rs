//! Blob-store backends: local filesystem and S3-compatible object storage.

use std::env;
use std::fs;
use std::path::PathBuf;

use aws_sdk_s3::primitives::ByteStream;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::SyncError;
use crate::ports::BlobStore;

/// Pick the backend from `USE_S3_STORAGE`.
pub fn storage_from_env() -> Result<Box<dyn BlobStore>, SyncError> {
    let use_s3 = env::var("USE_S3_STORAGE")
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_s3 {
        info!("Storage backend: S3-compatible object storage");
        Ok(Box::new(S3BlobStore::from_env()?))
    } else {
        info!("Storage backend: local filesystem");
        Ok(Box::new(LocalBlobStore::new(PathBuf::from("."))))
    }
}

/// Filesystem-backed store. Documents are pretty-printed UTF-8 JSON with
/// non-ASCII preserved verbatim; writes go through a temp file and rename so
/// readers never observe a half-written document.
pub struct LocalBlobStore {
    base_dir: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }
}

impl BlobStore for LocalBlobStore {
    fn save_json(&self, name: &str, data: &Value) -> Result<(), SyncError> {
        let path = self.resolve(name);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(data)?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &path)?;
        debug!("Saved {name} to local storage");
        Ok(())
    }

    fn load_json(&self, name: &str) -> Result<Value, SyncError> {
        let path = self.resolve(name);
        if !path.exists() {
            return Err(SyncError::storage(format!("File not found: {name}")));
        }
        let content = fs::read_to_string(&path)?;
        debug!("Loaded {name} from local storage");
        Ok(serde_json::from_str(&content)?)
    }

    fn exists(&self, name: &str) -> Result<bool, SyncError> {
        Ok(self.resolve(name).exists())
    }
}

/// S3-compatible store. The SDK is async, so this adapter owns a
/// current-thread runtime and blocks on each call; nothing async leaks out.
pub struct S3BlobStore {
    runtime: tokio::runtime::Runtime,
    client: aws_sdk_s3::Client,
    bucket: String,
    key_prefix: String,
}

impl S3BlobStore {
    pub fn from_env() -> Result<Self, SyncError> {
        let access_key_id = env::var("S3_ACCESS_KEY_ID").unwrap_or_default();
        let secret_access_key = env::var("S3_SECRET_ACCESS_KEY").unwrap_or_default();
        let bucket = env::var("S3_BUCKET_NAME").unwrap_or_default();
        if access_key_id.is_empty() || secret_access_key.is_empty() || bucket.is_empty() {
            return Err(SyncError::config(
                "S3 storage is enabled but S3_ACCESS_KEY_ID, S3_SECRET_ACCESS_KEY and S3_BUCKET_NAME are not all set",
            ));
        }

        let region = env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let endpoint_url = env::var("S3_ENDPOINT_URL").ok().filter(|url| !url.is_empty());
        let key_prefix = env::var("S3_PATH_PREFIX")
            .map(|prefix| prefix.trim().trim_matches('/').to_string())
            .unwrap_or_default();
        let force_path_style = env::var("S3_FORCE_PATH_STYLE")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| SyncError::storage(format!("Failed to start S3 runtime: {err}")))?;

        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "environment",
        );
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region))
            .credentials_provider(credentials);
        if let Some(endpoint_url) = endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let shared_config = runtime.block_on(loader.load());
        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(force_path_style)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_config);

        Ok(Self { runtime, client, bucket, key_prefix })
    }

    fn key_for(&self, name: &str) -> String {
        if self.key_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.key_prefix)
        }
    }
}

impl BlobStore for S3BlobStore {
    fn save_json(&self, name: &str, data: &Value) -> Result<(), SyncError> {
        let key = self.key_for(name);
        let content = serde_json::to_string_pretty(data)?;
        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(&key)
                    .content_type("application/json")
                    .body(ByteStream::from(content.into_bytes()))
                    .send(),
            )
            .map_err(|err| SyncError::storage(format!("Failed to save {name} to S3: {err}")))?;
        debug!("Saved {name} to s3://{}/{key}", self.bucket);
        Ok(())
    }

    fn load_json(&self, name: &str) -> Result<Value, SyncError> {
        let key = self.key_for(name);
        let output = self
            .runtime
            .block_on(self.client.get_object().bucket(&self.bucket).key(&key).send())
            .map_err(|err| {
                let service_error = err.into_service_error();
                if service_error.is_no_such_key() {
                    SyncError::storage(format!("File not found in object storage: {name}"))
                } else {
                    SyncError::storage(format!("Failed to load {name} from S3: {service_error}"))
                }
            })?;
        let bytes = self
            .runtime
            .block_on(output.body.collect())
            .map_err(|err| SyncError::storage(format!("Failed to read {name} from S3: {err}")))?
            .into_bytes();
        debug!("Loaded {name} from s3://{}/{key}", self.bucket);
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn exists(&self, name: &str) -> Result<bool, SyncError> {
        let key = self.key_for(name);
        match self
            .runtime
            .block_on(self.client.head_object().bucket(&self.bucket).key(&key).send())
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(SyncError::storage(format!(
                        "Error checking whether {name} exists in S3: {service_error}"
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn local_store_round_trips_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf());

        assert!(!store.exists("var/users.json").unwrap());
        store.save_json("var/users.json", &json!({"users": []})).unwrap();
        assert!(store.exists("var/users.json").unwrap());
        assert_eq!(store.load_json("var/users.json").unwrap(), json!({"users": []}));
    }

    #[test]
    fn local_store_preserves_non_ascii_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf());

        store.save_json("out.json", &json!({"name": "Żółć Łukasz"})).unwrap();
        let raw = fs::read_to_string(dir.path().join("out.json")).unwrap();
        assert!(raw.contains("Żółć Łukasz"));
    }

    #[test]
    fn missing_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf());
        let err = store.load_json("nope.json").unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
    }

    #[test]
    fn no_temp_file_remains_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf());
        store.save_json("var/doc.json", &json!([])).unwrap();
        assert!(!dir.path().join("var/doc.tmp").exists());
    }
}
