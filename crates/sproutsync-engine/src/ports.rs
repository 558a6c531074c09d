//! Collaborator contracts the engine drives.
//!
//! The engine never talks HTTP itself. The analytics vendor, the document
//! store, and the credential provider are reached through these traits so a
//! run can be exercised against in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sproutsync_core::{AnalyticsDataPoint, DateRange, DocumentEntry, Group, Profile, ProfileId};

use crate::error::{AuthError, SourceError, StoreError};
use crate::format::Row;

/// Bearer token handed to every store call.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

/// A token together with the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: AccessToken,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Obtains the first token of a run.
    async fn authorize(&self) -> Result<IssuedToken, AuthError>;

    /// Obtains a replacement for an expiring or rejected token.
    async fn reauthorize(&self) -> Result<IssuedToken, AuthError>;
}

#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn fetch_groups(&self) -> Result<Vec<Group>, SourceError>;

    async fn fetch_profiles(&self) -> Result<Vec<Profile>, SourceError>;

    /// Daily data points for `profile_ids` within `range`, already paginated
    /// and retried by the implementation.
    async fn fetch_analytics(
        &self,
        profile_ids: &[ProfileId],
        range: DateRange,
    ) -> Result<Vec<AnalyticsDataPoint>, SourceError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents inside `container_id` whose name contains `name_pattern`.
    async fn list_documents(
        &self,
        token: &AccessToken,
        container_id: &str,
        name_pattern: &str,
    ) -> Result<Vec<DocumentEntry>, StoreError>;

    /// Creates a document whose sub-sections are exactly `subsections` and
    /// returns its id. With no names the store's own default sub-section is
    /// kept.
    async fn create_document(
        &self,
        token: &AccessToken,
        title: &str,
        subsections: &[&str],
    ) -> Result<String, StoreError>;

    async fn rename_document(
        &self,
        token: &AccessToken,
        document_id: &str,
        new_title: &str,
    ) -> Result<(), StoreError>;

    async fn move_document(
        &self,
        token: &AccessToken,
        document_id: &str,
        container_id: &str,
    ) -> Result<(), StoreError>;

    /// Names of the sub-sections currently present in the document.
    async fn list_subsections(
        &self,
        token: &AccessToken,
        document_id: &str,
    ) -> Result<Vec<String>, StoreError>;

    /// Adds a named sub-section. Fails with an "already exists" error when
    /// the name is taken.
    async fn add_subsection(
        &self,
        token: &AccessToken,
        document_id: &str,
        name: &str,
    ) -> Result<(), StoreError>;

    /// Replaces the contents of `subsection` with `rows` in one request.
    async fn write_rows(
        &self,
        token: &AccessToken,
        document_id: &str,
        subsection: &str,
        rows: &[Row],
    ) -> Result<(), StoreError>;

    /// Human-facing link to the document.
    fn document_url(&self, document_id: &str) -> String;
}

#[async_trait]
impl<T: CredentialProvider + ?Sized> CredentialProvider for Arc<T> {
    async fn authorize(&self) -> Result<IssuedToken, AuthError> {
        (**self).authorize().await
    }

    async fn reauthorize(&self) -> Result<IssuedToken, AuthError> {
        (**self).reauthorize().await
    }
}
