use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::EntraConfig;

#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    #[error("token request failed: {0}")]
    Token(#[source] reqwest::Error),
    #[error("token endpoint returned status {0}")]
    TokenStatus(reqwest::StatusCode),
    #[error("directory request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("directory returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Answers whether an email still resolves to a user in the identity
/// directory. A failure is never a verdict: callers treat it as "cannot
/// determine" and retry later.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn exists(&self, email: &str) -> Result<bool, IdentityError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Deserialize)]
struct UserList {
    #[serde(default)]
    value: Vec<UserEntry>,
}

#[derive(Deserialize)]
struct UserEntry {
    #[allow(dead_code)]
    mail: Option<String>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Renew the cached token this long before its reported expiry.
const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Graph API client for Microsoft Entra ID using the OAuth2
/// client-credentials flow. The access token is cached until shortly before
/// expiry; lookups filter server-side on the exact mail value.
pub struct EntraVerifier {
    http: reqwest::Client,
    cfg: EntraConfig,
    token: Mutex<Option<CachedToken>>,
}

impl EntraVerifier {
    pub fn new(cfg: EntraConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            cfg,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, IdentityError> {
        let mut slot = self.token.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > Instant::now() + TOKEN_EXPIRY_SKEW {
                return Ok(cached.access_token.clone());
            }
        }

        let res = self
            .http
            .post(self.cfg.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.cfg.client_id.as_str()),
                ("client_secret", self.cfg.client_secret.as_str()),
                ("scope", self.cfg.scope.as_str()),
            ])
            .send()
            .await
            .map_err(IdentityError::Token)?;
        if !res.status().is_success() {
            return Err(IdentityError::TokenStatus(res.status()));
        }
        let body: TokenResponse =
            res.json().await.map_err(IdentityError::Token)?;
        debug!(expires_in = body.expires_in, "acquired directory token");

        let token = body.access_token.clone();
        *slot = Some(CachedToken {
            access_token: body.access_token,
            expires_at: Instant::now()
                + Duration::from_secs(body.expires_in),
        });
        Ok(token)
    }
}

#[async_trait]
impl IdentityVerifier for EntraVerifier {
    #[instrument(skip(self), fields(email = %email))]
    async fn exists(&self, email: &str) -> Result<bool, IdentityError> {
        let token = self.access_token().await?;
        let url =
            format!("{}/users", self.cfg.graph_url.trim_end_matches('/'));
        let filter = format!("mail eq '{}'", email);
        let res = self
            .http
            .get(url)
            .query(&[("$filter", filter.as_str())])
            .bearer_auth(token)
            .send()
            .await
            .map_err(IdentityError::Request)?;
        if !res.status().is_success() {
            return Err(IdentityError::Status(res.status()));
        }
        let users: UserList =
            res.json().await.map_err(IdentityError::Request)?;
        debug!(matches = users.value.len(), "directory lookup complete");
        Ok(!users.value.is_empty())
    }
}
