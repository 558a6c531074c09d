//! A full sync run: fetch, resolve, then one reconciliation cycle per group.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use sproutsync_core::{DateRange, DocumentTitle, NetworkType};

use crate::diagnostics::Diagnostic;
use crate::error::SyncError;
use crate::merge::merge_rows;
use crate::ports::{AnalyticsSource, CredentialProvider, DocumentStore};
use crate::reconcile::{CycleFailure, CycleStage, SyncEngine};
use crate::resolver::{partition_by_network, resolve, BucketKey, GroupBucket, NetworkPartition};

/// One non-empty bucket selected for a run.
#[derive(Debug, Clone)]
pub struct GroupPlan {
    pub key: BucketKey,
    pub bucket: GroupBucket,
    pub partition: NetworkPartition,
}

#[derive(Debug, Clone)]
pub struct GroupSuccess {
    pub group_name: String,
    pub document_id: String,
    pub document_url: String,
    pub created: bool,
    pub rows_written: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct GroupFailure {
    pub group_name: String,
    pub stage: CycleStage,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub range: DateRange,
    pub succeeded: Vec<GroupSuccess>,
    pub failed: Vec<GroupFailure>,
}

impl RunSummary {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Rows a run would write for one group, without touching the store.
#[derive(Debug, Clone)]
pub struct GroupPreview {
    pub group_name: String,
    pub rows: BTreeMap<NetworkType, usize>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when analytics could not be fetched for the group.
    pub error: Option<String>,
}

impl<A, S, P> SyncEngine<A, S, P>
where
    A: AnalyticsSource,
    S: DocumentStore,
    P: CredentialProvider,
{
    /// Fetches groups and profiles and returns the non-empty buckets, in
    /// bucket order. `filter` keeps only the bucket whose name matches it
    /// case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Source`] if either listing fails.
    pub async fn plan(&self, filter: Option<&str>) -> Result<Vec<GroupPlan>, SyncError> {
        let groups = self.source.fetch_groups().await?;
        let profiles = self.source.fetch_profiles().await?;
        tracing::info!(
            groups = groups.len(),
            profiles = profiles.len(),
            "fetched groups and profiles"
        );

        let plans: Vec<GroupPlan> = resolve(&profiles, &groups)
            .into_iter()
            .filter(|(_, bucket)| !bucket.profiles.is_empty())
            .filter(|(_, bucket)| {
                filter.is_none_or(|name| bucket.group_name.eq_ignore_ascii_case(name.trim()))
            })
            .map(|(key, bucket)| {
                let partition = partition_by_network(&bucket.profiles);
                GroupPlan {
                    key,
                    bucket,
                    partition,
                }
            })
            .collect();

        let mut seen = HashSet::new();
        for plan in &plans {
            if !seen.insert(plan.bucket.group_name.as_str()) {
                tracing::warn!(
                    group = %plan.bucket.group_name,
                    "group name appears more than once; only the first is synced"
                );
            }
        }

        if let (Some(name), true) = (filter, plans.is_empty()) {
            tracing::warn!(filter = name, "no non-empty group matches the filter");
        }
        Ok(plans)
    }

    /// [`run_at`](Self::run_at) with the current time.
    ///
    /// # Errors
    ///
    /// See [`run_at`](Self::run_at).
    pub async fn run(&self, filter: Option<&str>) -> Result<RunSummary, SyncError> {
        self.run_at(filter, Utc::now()).await
    }

    /// Reconciles every planned group in turn. A failing group is recorded and
    /// the run moves on; the schedule policy's pause separates groups.
    ///
    /// Titles are claimed in plan order: a group whose document title repeats
    /// an earlier group's fails at `Locate` without touching the store.
    ///
    /// # Errors
    ///
    /// Only a failure to list groups or profiles aborts the run.
    pub async fn run_at(
        &self,
        filter: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, SyncError> {
        self.session.pre_refresh("sync run").await;

        let plans = self.plan(filter).await?;
        let range = DateRange::trailing_days(now.date_naive(), self.settings.lookback_days);
        tracing::info!(groups = plans.len(), range = %range, "starting sync run");

        let mut summary = RunSummary {
            range,
            succeeded: Vec::new(),
            failed: Vec::new(),
        };

        let mut claimed = HashSet::new();
        let total = plans.len();
        for (index, plan) in plans.iter().enumerate() {
            let group_name = plan.bucket.group_name.as_str();
            let title = DocumentTitle::for_group(&self.settings.title_prefix, group_name);
            let outcome = if claimed.insert(title.base_pattern().to_owned()) {
                self.run_group(&plan.bucket, range, now).await
            } else {
                Err(CycleFailure {
                    stage: CycleStage::Locate,
                    error: SyncError::DuplicateTitle {
                        pattern: title.base_pattern().to_owned(),
                    },
                })
            };
            let succeeded = match outcome {
                Ok(success) => {
                    summary.succeeded.push(success);
                    true
                }
                Err(failure) => {
                    tracing::error!(
                        group = %group_name,
                        stage = %failure.stage,
                        error = %failure.error,
                        "group sync failed"
                    );
                    summary.failed.push(GroupFailure {
                        group_name: group_name.to_owned(),
                        stage: failure.stage,
                        error: failure.error.to_string(),
                    });
                    false
                }
            };

            if index + 1 < total {
                let delay = self.settings.schedule.delay_after(succeeded);
                if !delay.is_zero() {
                    tracing::debug!(
                        delay_secs = delay.as_secs(),
                        "pausing before next group"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        tracing::info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            "sync run finished"
        );
        Ok(summary)
    }

    async fn run_group(
        &self,
        bucket: &GroupBucket,
        range: DateRange,
        now: DateTime<Utc>,
    ) -> Result<GroupSuccess, CycleFailure> {
        let fetch_failed = |error: SyncError| CycleFailure {
            stage: CycleStage::FetchAnalytics,
            error,
        };
        let points = self
            .source
            .fetch_analytics(&bucket.profile_ids(), range)
            .await
            .map_err(|e| fetch_failed(SyncError::Source(e)))?;
        if points.is_empty() {
            return Err(fetch_failed(SyncError::NoUsableData {
                group: bucket.group_name.clone(),
            }));
        }

        let outcome = self
            .reconcile(&bucket.group_name, &bucket.profiles, &points, now)
            .await?;
        Ok(GroupSuccess {
            group_name: bucket.group_name.clone(),
            document_url: self.store.document_url(&outcome.document.id),
            document_id: outcome.document.id,
            created: outcome.created,
            rows_written: outcome.rows_written,
            diagnostics: outcome.diagnostics,
        })
    }

    /// Fetches and merges like a run would, but never calls the store.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Source`] if groups or profiles cannot be listed.
    pub async fn preview_at(
        &self,
        filter: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupPreview>, SyncError> {
        let plans = self.plan(filter).await?;
        let range = DateRange::trailing_days(now.date_naive(), self.settings.lookback_days);

        let mut previews = Vec::with_capacity(plans.len());
        for plan in plans {
            let group_name = plan.bucket.group_name.clone();
            match self
                .source
                .fetch_analytics(&plan.bucket.profile_ids(), range)
                .await
            {
                Ok(points) => {
                    let merged = merge_rows(&plan.partition, &points, self.formatter.as_ref());
                    let mut diagnostics = plan.partition.diagnostics;
                    diagnostics.extend(merged.diagnostics);
                    previews.push(GroupPreview {
                        group_name,
                        rows: merged
                            .rows
                            .iter()
                            .map(|(network, rows)| (*network, rows.len()))
                            .collect(),
                        diagnostics,
                        error: None,
                    });
                }
                Err(e) => previews.push(GroupPreview {
                    group_name,
                    rows: BTreeMap::new(),
                    diagnostics: plan.partition.diagnostics,
                    error: Some(e.to_string()),
                }),
            }
        }
        Ok(previews)
    }
}
