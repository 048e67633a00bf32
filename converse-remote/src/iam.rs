//! IAM bearer token exchange.
//!
//! Every hosted service authenticates with a short-lived bearer token minted
//! from the service API key. Tokens are cached and refreshed once 80% of
//! their lifetime has passed.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{ensure_success, RemoteError};

const SERVICE: &str = "iam";
const GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Share of the token lifetime after which a refresh is forced.
const REFRESH_RATIO: f64 = 0.8;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds.
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Mints and caches bearer tokens for one API key.
pub struct IamTokenManager {
    client: Client,
    token_url: String,
    api_key: String,
    cached: Mutex<Option<CachedToken>>,
}

impl IamTokenManager {
    /// Create a token manager.
    ///
    /// * `iam_url` - IAM base URL, e.g. `https://iam.cloud.ibm.com`
    /// * `api_key` - service API key to exchange
    pub fn new(client: Client, iam_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            token_url: format!("{}/identity/token", iam_url.trim_end_matches('/')),
            api_key: api_key.into(),
            cached: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, fetching a new one when needed.
    ///
    /// The cache lock is held across the fetch so concurrent callers share
    /// one exchange.
    pub async fn token(&self) -> Result<String, RemoteError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.fetch().await?;
        let lifetime = Duration::from_secs_f64(fresh.expires_in as f64 * REFRESH_RATIO);
        tracing::debug!(expires_in = fresh.expires_in, "IAM token refreshed");

        let access_token = fresh.access_token;
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(access_token)
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    /// Check a service response made with one of our tokens.
    ///
    /// A 401 means the service no longer accepts the cached token, so it is
    /// dropped before the error is returned.
    pub(crate) async fn accept(
        &self,
        service: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RemoteError> {
        let result = ensure_success(service, response).await;
        if let Err(e) = &result {
            if e.status_code() == Some(401) {
                tracing::warn!(service, "Bearer token rejected, dropping cached token");
                self.invalidate().await;
            }
        }
        result
    }

    async fn fetch(&self) -> Result<TokenResponse, RemoteError> {
        let response = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[("grant_type", GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(SERVICE, e))?;

        let response = ensure_success(SERVICE, response).await?;
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| RemoteError::from_reqwest(SERVICE, e))
    }
}
