//! The single credential session of a run.
//!
//! The session owns the current token and its expiry. It is passed by
//! reference into every mutation instead of living in shared client state, so
//! independent runs (and tests) never see each other's tokens.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::AuthError;
use crate::ports::{AccessToken, CredentialProvider, IssuedToken};

pub struct CredentialSession<P> {
    provider: P,
    refresh_threshold: Duration,
    current: Mutex<Option<IssuedToken>>,
}

impl<P: CredentialProvider> CredentialSession<P> {
    /// `refresh_threshold` is how close to expiry a token may get before
    /// [`ensure_fresh`](Self::ensure_fresh) replaces it.
    pub fn new(provider: P, refresh_threshold: Duration) -> Self {
        Self {
            provider,
            refresh_threshold,
            current: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Authorizes on first use and reauthorizes when the token is within the
    /// refresh threshold of expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the provider refuses or cannot be reached.
    /// The previous token, if any, is kept.
    pub async fn ensure_fresh(&self) -> Result<(), AuthError> {
        self.ensure_fresh_at(Utc::now()).await
    }

    /// [`ensure_fresh`](Self::ensure_fresh) against an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the provider refuses or cannot be reached.
    pub async fn ensure_fresh_at(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        let mut current = self.current.lock().await;
        match current.as_ref() {
            None => {
                let issued = self.provider.authorize().await?;
                tracing::info!(expires_at = %issued.expires_at, "credential session authorized");
                *current = Some(issued);
            }
            Some(issued) if self.needs_refresh(issued, now) => {
                let issued = self.provider.reauthorize().await?;
                tracing::info!(expires_at = %issued.expires_at, "credential session refreshed");
                *current = Some(issued);
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Opportunistic refresh before a mutation. Failure is logged and the
    /// existing token stays in use.
    pub async fn pre_refresh(&self, before: &str) {
        if let Err(e) = self.ensure_fresh().await {
            tracing::warn!(
                before,
                error = %e,
                "credential pre-refresh failed; continuing with existing token"
            );
        }
    }

    /// Replaces the token unconditionally, e.g. after the store rejected it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the provider refuses or cannot be reached.
    pub async fn force_refresh(&self) -> Result<(), AuthError> {
        let mut current = self.current.lock().await;
        let issued = self.provider.reauthorize().await?;
        tracing::info!(expires_at = %issued.expires_at, "credential session reauthorized");
        *current = Some(issued);
        Ok(())
    }

    /// The live token, authorizing first if the session has none yet.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if no token exists and authorization fails.
    pub async fn token(&self) -> Result<AccessToken, AuthError> {
        let mut current = self.current.lock().await;
        if let Some(issued) = current.as_ref() {
            return Ok(issued.access_token.clone());
        }
        let issued = self.provider.authorize().await?;
        let token = issued.access_token.clone();
        *current = Some(issued);
        Ok(token)
    }

    fn needs_refresh(&self, issued: &IssuedToken, now: DateTime<Utc>) -> bool {
        // A negative remaining lifetime fails `to_std` and counts as expired.
        let remaining = (issued.expires_at - now).to_std().unwrap_or(Duration::ZERO);
        remaining <= self.refresh_threshold
    }
}
