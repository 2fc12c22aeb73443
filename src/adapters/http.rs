//! Blocking HTTP verb wrapper with retry and back-off policies.

use std::thread;
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use crate::domain::{SyncConfig, SyncError};

/// How a request is retried.
///
/// 429 responses sleep `base_delay × attempt` and retry up to
/// `max_attempts`. 5xx and transport errors get a single retry. 403 is
/// retried only under the group-creation policy, because the server
/// intermittently forbids creations during rapid tree growth.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub retry_forbidden: bool,
}

impl RetryPolicy {
    pub fn standard() -> Self {
        Self { max_attempts: 5, base_delay: Duration::from_secs(5), retry_forbidden: false }
    }

    pub fn group_creation() -> Self {
        Self { max_attempts: 10, base_delay: Duration::from_secs(15), retry_forbidden: true }
    }

    fn delay_for(&self, failed_attempt: u32) -> Duration {
        self.base_delay * failed_attempt
    }
}

/// Thin bearer-authenticated JSON client for the target API.
pub struct HttpClient {
    base_url: Url,
    client: Client,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").field("base_url", &self.base_url.as_str()).finish()
    }
}

impl HttpClient {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let base_url = Url::parse(&format!("https://{}/third_party/api/", config.domain))
            .map_err(|err| SyncError::config(format!("Invalid TIMECAMP_DOMAIN: {err}")))?;
        Self::with_base_url(base_url, &config.api_key, config.ssl_verify)
    }

    pub fn with_base_url(base_url: Url, api_key: &str, ssl_verify: bool) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| SyncError::config("API key contains invalid header characters"))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!ssl_verify)
            .build()
            .map_err(|err| SyncError::config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self { base_url, client })
    }

    /// Issue a request under the standard policy.
    pub fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<Value, SyncError> {
        self.request_with_policy(method, endpoint, body, query, &RetryPolicy::standard())
    }

    /// Issue a request under an explicit retry policy.
    pub fn request_with_policy(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
        policy: &RetryPolicy,
    ) -> Result<Value, SyncError> {
        let url = self
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|err| SyncError::config(format!("Invalid endpoint '{endpoint}': {err}")))?;
        debug!("API request: {method} {url}");

        let mut transient_retry_spent = false;

        for attempt in 1..=policy.max_attempts {
            let mut builder = self.client.request(method.clone(), url.clone());
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = match builder.send() {
                Ok(response) => response,
                Err(err) => {
                    if transient_retry_spent || attempt == policy.max_attempts {
                        error!("API error: {method} {url} - {err}");
                        return Err(SyncError::Transport(err));
                    }
                    warn!("Transport error on {method} {url}: {err}. Retrying once.");
                    transient_retry_spent = true;
                    thread::sleep(policy.delay_for(attempt));
                    continue;
                }
            };

            let status = response.status();
            debug!("Response status: {status}");

            if status.is_success() {
                let text = response.text().map_err(SyncError::Transport)?;
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                return Ok(serde_json::from_str(&text)?);
            }

            let status_code = status.as_u16();
            match status_code {
                429 => {
                    if attempt == policy.max_attempts {
                        return Err(SyncError::RateLimited {
                            endpoint: endpoint.to_string(),
                            attempts: policy.max_attempts,
                        });
                    }
                    let delay = policy.delay_for(attempt);
                    warn!(
                        "Rate limited on {method} {url} (attempt {attempt}/{}). Waiting {delay:?}.",
                        policy.max_attempts
                    );
                    thread::sleep(delay);
                }
                403 if policy.retry_forbidden && attempt < policy.max_attempts => {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        "Got 403 from {method} {url} (attempt {attempt}/{}). Waiting {delay:?}.",
                        policy.max_attempts
                    );
                    thread::sleep(delay);
                }
                401 => {
                    let message = response.text().unwrap_or_default();
                    error!("API error: {method} {url} - 401");
                    return Err(SyncError::Unauthorized(message));
                }
                500..=599 if !transient_retry_spent && attempt < policy.max_attempts => {
                    warn!("Server error {status_code} on {method} {url}. Retrying once.");
                    transient_retry_spent = true;
                    thread::sleep(policy.delay_for(attempt));
                }
                _ => {
                    let message = response.text().unwrap_or_default();
                    error!("API error: {method} {url} - {status_code}: {message}");
                    return Err(SyncError::Api { status: status_code, message });
                }
            }
        }

        Err(SyncError::RateLimited {
            endpoint: endpoint.to_string(),
            attempts: policy.max_attempts,
        })
    }
}
