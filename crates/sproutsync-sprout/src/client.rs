//! HTTP client for the Sprout Social v1 API.
//!
//! Wraps `reqwest` with bearer-token auth, per-call retry of transient
//! failures, and paging of the profile analytics report.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use sproutsync_core::{AnalyticsDataPoint, DateRange, Group, Profile, ProfileId};
use sproutsync_engine::{AnalyticsSource, MetricsRowFormatter, SourceError};

use crate::error::SproutError;
use crate::normalize::{normalize_analytics, normalize_group, normalize_profile};
use crate::retry::retry_with_backoff;
use crate::types::{AnalyticsRecord, AnalyticsRequest, DataEnvelope, GroupRecord, ProfileRecord};

const DEFAULT_BASE_URL: &str = "https://api.sproutsocial.com/v1/";

/// Profile ids per analytics request.
const PROFILE_CHUNK: usize = 50;

/// Upper bound on pages per analytics request, in case `paging` never ends.
const MAX_PAGES: u32 = 500;

/// Client for one Sprout customer.
///
/// Use [`SproutClient::new`] for production or [`SproutClient::with_base_url`]
/// to point at a mock server in tests.
pub struct SproutClient {
    client: Client,
    customer_id: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl SproutClient {
    /// # Errors
    ///
    /// Returns [`SproutError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SproutError::InvalidConfig`] if the token is not a valid header.
    pub fn new(api_token: &str, customer_id: &str, timeout_secs: u64) -> Result<Self, SproutError> {
        Self::with_base_url(api_token, customer_id, timeout_secs, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Same as [`SproutClient::new`], plus [`SproutError::InvalidConfig`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        api_token: &str,
        customer_id: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SproutError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_token}"))
            .map_err(|e| SproutError::InvalidConfig(format!("API token: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("sproutsync/0.1")
            .default_headers(headers)
            .build()?;

        // Exactly one trailing slash so `Url::join` appends instead of
        // replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| SproutError::InvalidConfig(format!("base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            customer_id: customer_id.trim().to_owned(),
            base_url,
            max_retries: 3,
            backoff_base_ms: 1_000,
        })
    }

    /// Overrides the transient-error retry budget.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// # Errors
    ///
    /// - [`SproutError::Http`] on network failure or non-2xx status.
    /// - [`SproutError::Deserialize`] if the body does not match.
    pub async fn get_groups(&self) -> Result<Vec<GroupRecord>, SproutError> {
        let url = self.endpoint("metadata/customer/groups")?;
        let envelope: DataEnvelope<GroupRecord> = self.get_json(&url, "groups").await?;
        Ok(envelope.data)
    }

    /// # Errors
    ///
    /// - [`SproutError::Http`] on network failure or non-2xx status.
    /// - [`SproutError::Deserialize`] if the body does not match.
    pub async fn get_profiles(&self) -> Result<Vec<ProfileRecord>, SproutError> {
        let url = self.endpoint("metadata/customer")?;
        let envelope: DataEnvelope<ProfileRecord> = self.get_json(&url, "profiles").await?;
        Ok(envelope.data)
    }

    /// Daily analytics rows for `profile_ids` over `range`.
    ///
    /// Ids are requested in chunks; each chunk is paged until
    /// `paging.total_pages` is reached.
    ///
    /// # Errors
    ///
    /// - [`SproutError::Http`] on network failure or non-2xx status.
    /// - [`SproutError::Deserialize`] if a page does not match.
    pub async fn get_profile_analytics(
        &self,
        profile_ids: &[ProfileId],
        range: DateRange,
    ) -> Result<Vec<AnalyticsRecord>, SproutError> {
        let url = self.endpoint("analytics/profiles")?;
        let metrics: Vec<String> = MetricsRowFormatter::metric_keys()
            .into_iter()
            .map(str::to_owned)
            .collect();

        let mut records = Vec::new();
        for chunk in profile_ids.chunks(PROFILE_CHUNK) {
            let ids = chunk
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let filters = vec![
                format!("customer_profile_id.eq({ids})"),
                format!("reporting_period.in({range})"),
            ];

            let mut page = 1u32;
            loop {
                let request = AnalyticsRequest {
                    filters: filters.clone(),
                    metrics: metrics.clone(),
                    page,
                };
                let envelope: DataEnvelope<AnalyticsRecord> =
                    self.post_json(&url, &request, "analytics").await?;
                let total_pages = envelope.paging.map_or(1, |p| p.total_pages);
                tracing::debug!(
                    page,
                    total_pages,
                    rows = envelope.data.len(),
                    "fetched analytics page"
                );
                records.extend(envelope.data);

                if page >= total_pages {
                    break;
                }
                if page >= MAX_PAGES {
                    tracing::warn!(page, total_pages, "analytics paging limit reached");
                    break;
                }
                page += 1;
            }
        }
        Ok(records)
    }

    fn endpoint(&self, path: &str) -> Result<Url, SproutError> {
        self.base_url
            .join(&format!("{}/{path}", self.customer_id))
            .map_err(|e| SproutError::InvalidConfig(format!("endpoint '{path}': {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url, label: &str) -> Result<T, SproutError> {
        let body = retry_with_backoff(label, self.max_retries, self.backoff_base_ms, || async move {
            let response = self.client.get(url.clone()).send().await?;
            Ok::<_, SproutError>(response.error_for_status()?.text().await?)
        })
        .await?;
        Self::decode(&body, url)
    }

    async fn post_json<B, T>(&self, url: &Url, payload: &B, label: &str) -> Result<T, SproutError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = retry_with_backoff(label, self.max_retries, self.backoff_base_ms, || async move {
            let response = self.client.post(url.clone()).json(payload).send().await?;
            Ok::<_, SproutError>(response.error_for_status()?.text().await?)
        })
        .await?;
        Self::decode(&body, url)
    }

    fn decode<T: DeserializeOwned>(body: &str, url: &Url) -> Result<T, SproutError> {
        serde_json::from_str(body).map_err(|e| SproutError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl AnalyticsSource for SproutClient {
    async fn fetch_groups(&self) -> Result<Vec<Group>, SourceError> {
        let records = self.get_groups().await?;
        Ok(records.iter().map(normalize_group).collect())
    }

    async fn fetch_profiles(&self) -> Result<Vec<Profile>, SourceError> {
        let records = self.get_profiles().await?;
        Ok(records.iter().map(normalize_profile).collect())
    }

    async fn fetch_analytics(
        &self,
        profile_ids: &[ProfileId],
        range: DateRange,
    ) -> Result<Vec<AnalyticsDataPoint>, SourceError> {
        let records = self.get_profile_analytics(profile_ids, range).await?;
        let total = records.len();
        let points: Vec<AnalyticsDataPoint> =
            records.iter().filter_map(normalize_analytics).collect();
        if points.len() < total {
            tracing::warn!(
                skipped = total - points.len(),
                "analytics rows without profile or day dimension skipped"
            );
        }
        Ok(points)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
