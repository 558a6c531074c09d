//! OAuth2 refresh-token grant as the engine's [`CredentialProvider`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use reqwest::{Client, Url};
use sproutsync_engine::{AccessToken, AuthError, CredentialProvider, IssuedToken};

use crate::error::GoogleError;
use crate::types::{TokenErrorBody, TokenResponse};

const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Exchanges a long-lived refresh token for short-lived access tokens.
///
/// Both [`authorize`](CredentialProvider::authorize) and
/// [`reauthorize`](CredentialProvider::reauthorize) perform the same grant;
/// the refresh token itself never rotates.
pub struct OAuthRefreshProvider {
    client: Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl std::fmt::Debug for OAuthRefreshProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthRefreshProvider")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl OAuthRefreshProvider {
    /// # Errors
    ///
    /// Returns [`GoogleError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
        timeout_secs: u64,
    ) -> Result<Self, GoogleError> {
        Self::with_token_url(
            client_id,
            client_secret,
            refresh_token,
            timeout_secs,
            DEFAULT_TOKEN_URL,
        )
    }

    /// # Errors
    ///
    /// Same as [`OAuthRefreshProvider::new`], plus
    /// [`GoogleError::InvalidConfig`] if `token_url` is not a valid URL.
    pub fn with_token_url(
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
        timeout_secs: u64,
        token_url: &str,
    ) -> Result<Self, GoogleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("sproutsync/0.1")
            .build()?;
        let token_url = Url::parse(token_url)
            .map_err(|e| GoogleError::InvalidConfig(format!("token URL '{token_url}': {e}")))?;
        Ok(Self {
            client,
            token_url,
            client_id: client_id.trim().to_owned(),
            client_secret: client_secret.trim().to_owned(),
            refresh_token: refresh_token.trim().to_owned(),
        })
    }

    /// Performs one refresh-token grant.
    ///
    /// # Errors
    ///
    /// - [`GoogleError::Http`] on network failure.
    /// - [`GoogleError::Api`] when the token endpoint answers non-2xx; the
    ///   message starts with the OAuth error code, e.g. `invalid_grant`.
    /// - [`GoogleError::Deserialize`] if a 2xx body is not a token response.
    pub async fn refresh(&self) -> Result<IssuedToken, GoogleError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
        ];
        let response = self
            .client
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GoogleError::Api {
                status: status.as_u16(),
                message: token_error_message(&body),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| GoogleError::Deserialize {
                context: "oauth token response".to_owned(),
                source: e,
            })?;
        let expires_at = TimeDelta::try_seconds(parsed.expires_in.max(0))
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| GoogleError::Deserialize {
                context: "oauth token response".to_owned(),
                source: serde::de::Error::custom(format!(
                    "expires_in {} is out of range",
                    parsed.expires_in
                )),
            })?;
        Ok(IssuedToken {
            access_token: AccessToken::new(parsed.access_token),
            expires_at,
        })
    }
}

fn token_error_message(body: &str) -> String {
    match serde_json::from_str::<TokenErrorBody>(body) {
        Ok(TokenErrorBody {
            error,
            error_description: Some(description),
        }) => format!("{error}: {description}"),
        Ok(TokenErrorBody { error, .. }) => error,
        Err(_) => body.trim().to_owned(),
    }
}

#[async_trait]
impl CredentialProvider for OAuthRefreshProvider {
    async fn authorize(&self) -> Result<IssuedToken, AuthError> {
        Ok(self.refresh().await?)
    }

    async fn reauthorize(&self) -> Result<IssuedToken, AuthError> {
        Ok(self.refresh().await?)
    }
}
