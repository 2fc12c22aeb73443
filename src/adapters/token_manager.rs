//! OAuth token management for source extractors.

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::SyncError;
use crate::ports::KeyValueStore;

const ACCESS_TOKEN_KEY: &str = "ACCESS_TOKEN";
const TOKEN_EXPIRES_AT_KEY: &str = "TOKEN_EXPIRES_AT";
const REFRESH_TOKEN_KEY: &str = "REFRESH_TOKEN";
const REFRESH_TOKEN_EXPIRES_AT_KEY: &str = "REFRESH_TOKEN_EXPIRES_AT";

/// An access token is considered expired this many seconds early, so a
/// token never dies mid-extract.
const EXPIRY_BUFFER_SECS: i64 = 300;
const REFRESH_TOKEN_LIFETIME_DAYS: i64 = 90;
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Client-credentials token manager with refresh-token support, persisting
/// state through a [`KeyValueStore`].
pub struct TokenManager<S: KeyValueStore> {
    token_endpoint: Url,
    client_id: String,
    client_secret: String,
    scope: String,
    store: S,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl<S: KeyValueStore> TokenManager<S> {
    pub fn new(
        token_endpoint: Url,
        client_id: String,
        client_secret: String,
        scope: String,
        store: S,
    ) -> Result<Self, SyncError> {
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(SyncError::config("Missing OAuth client credentials"));
        }
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|err| SyncError::config(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self { token_endpoint, client_id, client_secret, scope, store, client })
    }

    /// Return a token valid for at least the expiry buffer, refreshing or
    /// re-authorising as needed.
    pub fn valid_token(&mut self) -> Result<String, SyncError> {
        let now = Utc::now().timestamp();

        if let Some(access_token) = self.store.get(ACCESS_TOKEN_KEY)? {
            let expires_at = self.stored_timestamp(TOKEN_EXPIRES_AT_KEY)?;
            if expires_at > now + EXPIRY_BUFFER_SECS {
                debug!("Using existing access token");
                return Ok(access_token);
            }
        }

        self.force_refresh()
    }

    /// Discard the cached access token: refresh if possible, otherwise run
    /// the client-credentials grant. Extractors call this once on a 401 and
    /// retry the failed request.
    pub fn force_refresh(&mut self) -> Result<String, SyncError> {
        let now = Utc::now().timestamp();

        if let Some(refresh_token) = self.store.get(REFRESH_TOKEN_KEY)? {
            let refresh_expires_at = self.stored_timestamp(REFRESH_TOKEN_EXPIRES_AT_KEY)?;
            if refresh_expires_at > now {
                info!("Refreshing access token");
                let client_id = self.client_id.clone();
                let client_secret = self.client_secret.clone();
                let form = [
                    ("grant_type", "refresh_token"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                ];
                return self.request_and_save(&form);
            }
            warn!("Refresh token expired; falling back to client credentials");
        }

        info!("Requesting new tokens via client credentials");
        let client_id = self.client_id.clone();
        let client_secret = self.client_secret.clone();
        let scope = self.scope.clone();
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("scope", scope.as_str()),
        ];
        self.request_and_save(&form)
    }

    fn stored_timestamp(&self, key: &str) -> Result<i64, SyncError> {
        Ok(self
            .store
            .get(key)?
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(0))
    }

    fn request_and_save(&mut self, form: &[(&str, &str)]) -> Result<String, SyncError> {
        let response = self
            .client
            .post(self.token_endpoint.clone())
            .form(form)
            .send()
            .map_err(SyncError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            if status.as_u16() == 401 {
                return Err(SyncError::Unauthorized(message));
            }
            return Err(SyncError::Api { status: status.as_u16(), message });
        }

        let token: TokenResponse = response.json().map_err(SyncError::Transport)?;
        self.save_tokens(&token)?;
        Ok(token.access_token)
    }

    fn save_tokens(&mut self, token: &TokenResponse) -> Result<(), SyncError> {
        let now = Utc::now().timestamp();
        let expires_at = now + token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        self.store.set(ACCESS_TOKEN_KEY, &token.access_token)?;
        self.store.set(TOKEN_EXPIRES_AT_KEY, &expires_at.to_string())?;

        if let Some(refresh_token) = &token.refresh_token {
            let refresh_expires_at =
                (Utc::now() + Duration::days(REFRESH_TOKEN_LIFETIME_DAYS)).timestamp();
            self.store.set(REFRESH_TOKEN_KEY, refresh_token)?;
            self.store.set(REFRESH_TOKEN_EXPIRES_AT_KEY, &refresh_expires_at.to_string())?;
        }
        debug!("Saved token state");
        Ok(())
    }
}
