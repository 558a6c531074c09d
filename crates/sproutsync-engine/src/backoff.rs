//! Retry with multiplicative back-off for every document-store mutation.
//!
//! Failures are classified from their message text. Quota errors back off
//! faster (×3 per attempt) than other failures (×2), since the store's quota
//! windows are roughly a minute long. An auth failure triggers exactly one
//! reauthorization and an immediate retry; a second auth failure ends the
//! attempt. When the budget is spent the last error is returned.

use std::future::Future;
use std::time::Duration;

use crate::error::{StoreError, SyncError};
use crate::ports::{AccessToken, CredentialProvider};
use crate::session::CredentialSession;

/// Failure class derived from a store error's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Quota,
    Auth,
    AlreadyExists,
    Other,
}

const QUOTA_MARKERS: &[&str] = &[
    "quota",
    "rate limit",
    "ratelimit",
    "too many requests",
    "resource_exhausted",
    "http 429",
];

const AUTH_MARKERS: &[&str] = &[
    "http 401",
    "unauthenticated",
    "unauthorized",
    "invalid credentials",
    "invalid_grant",
    "token expired",
];

const ALREADY_EXISTS_MARKERS: &[&str] = &["already exists", "duplicate"];

impl ErrorClass {
    #[must_use]
    pub fn of(err: &StoreError) -> Self {
        Self::of_message(&err.to_string())
    }

    #[must_use]
    pub fn of_message(message: &str) -> Self {
        let lowered = message.to_lowercase();
        let has = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));
        if has(ALREADY_EXISTS_MARKERS) {
            ErrorClass::AlreadyExists
        } else if has(QUOTA_MARKERS) {
            ErrorClass::Quota
        } else if has(AUTH_MARKERS) {
            ErrorClass::Auth
        } else {
            ErrorClass::Other
        }
    }

    /// Growth factor applied per attempt.
    #[must_use]
    pub fn multiplier(self) -> u32 {
        match self {
            ErrorClass::Quota => 3,
            ErrorClass::Auth | ErrorClass::AlreadyExists | ErrorClass::Other => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based) after a `class` failure:
    /// `initial_delay × multiplier^(attempt-1)`, capped at `max_delay`.
    ///
    /// | Attempt | Quota      | Other      |
    /// |---------|------------|------------|
    /// | 1       | initial    | initial    |
    /// | 2       | initial×3  | initial×2  |
    /// | 3       | initial×9  | initial×4  |
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32, class: ErrorClass) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let factor = class.multiplier().saturating_pow(exponent);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackoffExecutor {
    policy: BackoffPolicy,
}

impl BackoffExecutor {
    #[must_use]
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Runs `operation` up to `max_retries + 1` times.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Exhausted`] with the last failure once the budget
    /// is spent.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0u32;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if attempt >= self.policy.max_retries {
                return Err(exhausted(label, attempt, err));
            }
            attempt += 1;
            self.pause(label, attempt, ErrorClass::of(&err), &err).await;
        }
    }

    /// Like [`execute`](Self::execute), but hands each attempt the session's
    /// live token and reauthorizes once on an auth-class failure.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Auth`] if no token can be obtained or the forced
    ///   reauthorization fails.
    /// - [`SyncError::Exhausted`] when retries run out or a second auth
    ///   failure follows a reauthorization.
    pub async fn execute_authorized<T, P, F, Fut>(
        &self,
        session: &CredentialSession<P>,
        label: &str,
        mut operation: F,
    ) -> Result<T, SyncError>
    where
        P: CredentialProvider,
        F: FnMut(AccessToken) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0u32;
        let mut reauthorized = false;
        loop {
            let token = session.token().await?;
            let err = match operation(token).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let class = ErrorClass::of(&err);
            if attempt >= self.policy.max_retries || (class == ErrorClass::Auth && reauthorized) {
                return Err(exhausted(label, attempt, err));
            }
            attempt += 1;
            if class == ErrorClass::Auth {
                tracing::warn!(label, attempt, error = %err, "credentials rejected; reauthorizing");
                reauthorized = true;
                session.force_refresh().await?;
                continue;
            }
            self.pause(label, attempt, class, &err).await;
        }
    }

    /// Authorized execution for create-if-missing operations: an "already
    /// exists" failure means the intent is satisfied and counts as success.
    ///
    /// # Errors
    ///
    /// Same as [`execute_authorized`](Self::execute_authorized).
    pub async fn execute_idempotent<P, F, Fut>(
        &self,
        session: &CredentialSession<P>,
        label: &str,
        mut operation: F,
    ) -> Result<(), SyncError>
    where
        P: CredentialProvider,
        F: FnMut(AccessToken) -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        self.execute_authorized(session, label, |token| {
            let pending = operation(token);
            async move {
                match pending.await {
                    Err(err) if ErrorClass::of(&err) == ErrorClass::AlreadyExists => {
                        tracing::debug!(label, error = %err, "target already exists; treating as success");
                        Ok(())
                    }
                    other => other,
                }
            }
        })
        .await
    }

    async fn pause(&self, label: &str, attempt: u32, class: ErrorClass, err: &StoreError) {
        let delay = self.policy.delay_for_attempt(attempt, class);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        tracing::warn!(
            label,
            attempt,
            max_retries = self.policy.max_retries,
            delay_ms,
            class = ?class,
            error = %err,
            "store call failed; retrying after back-off"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn exhausted(label: &str, retries: u32, source: StoreError) -> SyncError {
    SyncError::Exhausted {
        label: label.to_owned(),
        attempts: retries + 1,
        source,
    }
}
