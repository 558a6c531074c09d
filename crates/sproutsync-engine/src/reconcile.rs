//! The per-group reconciliation cycle.
//!
//! ```text
//! START -> LOCATE -> RENAME_EXISTING | CREATE_NEW -> ENSURE_SUBSECTIONS
//!       -> MERGE_DATA -> WRITE_SUBSECTIONS -> DONE
//! ```
//!
//! Rows are merged in memory before LOCATE, so a group with nothing to write
//! fails at MERGE_DATA without touching the store. The writes themselves still
//! happen only once the sub-sections are ensured.
//!
//! Any step can end the cycle in a [`CycleFailure`]. Every step that mutates
//! the store is preceded by a non-fatal credential pre-refresh.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use futures::future::join_all;
use sproutsync_core::{
    AnalyticsDataPoint, AppConfig, DocumentTitle, NetworkType, Profile, TargetDocument, TitleMatch,
};
use thiserror::Error;

use crate::backoff::{BackoffExecutor, BackoffPolicy};
use crate::diagnostics::Diagnostic;
use crate::error::SyncError;
use crate::format::{MetricsRowFormatter, Row, RowFormatter};
use crate::locator::DocumentLocator;
use crate::merge::merge_rows;
use crate::ports::{AnalyticsSource, CredentialProvider, DocumentStore};
use crate::resolver::partition_by_network;
use crate::schedule::SchedulePolicy;
use crate::session::CredentialSession;

/// Everything the engine needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Container (Drive folder) holding every target document.
    pub container_id: String,
    pub title_prefix: String,
    pub title_match: TitleMatch,
    pub title_offset: FixedOffset,
    pub backoff: BackoffPolicy,
    pub schedule: SchedulePolicy,
    pub refresh_threshold: Duration,
    pub lookback_days: u32,
}

impl EngineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            container_id: config.google_drive_folder_id.clone(),
            title_prefix: config.title_prefix.clone(),
            title_match: config.title_match,
            title_offset: config.title_utc_offset,
            backoff: BackoffPolicy {
                max_retries: config.max_retries,
                initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
                max_delay: Duration::from_millis(config.retry_max_delay_ms),
            },
            schedule: SchedulePolicy {
                success_delay: Duration::from_secs(config.group_success_delay_secs),
                failure_delay: Duration::from_secs(config.group_failure_delay_secs),
            },
            refresh_threshold: Duration::from_secs(config.token_refresh_threshold_secs),
            lookback_days: config.lookback_days,
        }
    }
}

/// Step of the cycle at which a group failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    FetchAnalytics,
    Locate,
    RenameExisting,
    CreateNew,
    EnsureSubsections,
    MergeData,
    WriteSubsections,
}

impl std::fmt::Display for CycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CycleStage::FetchAnalytics => "fetch_analytics",
            CycleStage::Locate => "locate",
            CycleStage::RenameExisting => "rename_existing",
            CycleStage::CreateNew => "create_new",
            CycleStage::EnsureSubsections => "ensure_subsections",
            CycleStage::MergeData => "merge_data",
            CycleStage::WriteSubsections => "write_subsections",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct CycleFailure {
    pub stage: CycleStage,
    #[source]
    pub error: SyncError,
}

impl CycleFailure {
    fn at(stage: CycleStage) -> impl FnOnce(SyncError) -> Self {
        move |error| Self { stage, error }
    }
}

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub document: TargetDocument,
    /// Whether this cycle minted the document.
    pub created: bool,
    pub rows_written: usize,
    pub subsections_written: Vec<NetworkType>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct SyncEngine<A, S, P> {
    pub(crate) source: A,
    pub(crate) store: S,
    pub(crate) session: CredentialSession<P>,
    pub(crate) executor: BackoffExecutor,
    pub(crate) formatter: Box<dyn RowFormatter>,
    pub(crate) settings: EngineSettings,
}

impl<A, S, P> SyncEngine<A, S, P>
where
    A: AnalyticsSource,
    S: DocumentStore,
    P: CredentialProvider,
{
    pub fn new(source: A, store: S, provider: P, settings: EngineSettings) -> Self {
        Self {
            source,
            store,
            session: CredentialSession::new(provider, settings.refresh_threshold),
            executor: BackoffExecutor::new(settings.backoff),
            formatter: Box::new(MetricsRowFormatter),
            settings,
        }
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: impl RowFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn source(&self) -> &A {
        &self.source
    }

    pub fn session(&self) -> &CredentialSession<P> {
        &self.session
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Runs one group's cycle against already-fetched `points`.
    ///
    /// `now` is stamped into the document title. A group whose points yield
    /// no rows fails at [`CycleStage::MergeData`] before any store call.
    ///
    /// # Errors
    ///
    /// Returns [`CycleFailure`] naming the step that gave up. Writes to sibling
    /// sub-sections are all awaited before a write failure is reported.
    pub async fn reconcile(
        &self,
        group_name: &str,
        profiles: &[Profile],
        points: &[AnalyticsDataPoint],
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome, CycleFailure> {
        let partition = partition_by_network(profiles);
        let wanted: Vec<NetworkType> = partition.networks().collect();
        let merged = merge_rows(&partition, points, self.formatter.as_ref());
        let mut diagnostics = partition.diagnostics.clone();
        diagnostics.extend(merged.diagnostics.iter().cloned());
        if merged.row_count() == 0 {
            tracing::warn!(
                group = %group_name,
                dropped = diagnostics.len(),
                "no rows survived merging; leaving the document untouched"
            );
            return Err(CycleFailure {
                stage: CycleStage::MergeData,
                error: SyncError::NoUsableData {
                    group: group_name.to_owned(),
                },
            });
        }

        let title = DocumentTitle::for_group(&self.settings.title_prefix, group_name);
        let stamped = title.stamped(now, self.settings.title_offset);
        let container_id = self.settings.container_id.as_str();

        let locator = DocumentLocator::new(&self.store, &self.executor, self.settings.title_match);
        let existing = locator
            .locate(&self.session, &title, container_id)
            .await
            .map_err(CycleFailure::at(CycleStage::Locate))?;

        let (document, created) = match existing {
            Some(found) => {
                let document = self
                    .rename_existing(found, &stamped)
                    .await
                    .map_err(CycleFailure::at(CycleStage::RenameExisting))?;
                (document, false)
            }
            None => {
                let document = self
                    .create_new(&title, &stamped, &wanted)
                    .await
                    .map_err(CycleFailure::at(CycleStage::CreateNew))?;
                (document, true)
            }
        };

        let ready = self.ensure_subsections(&document.id, &wanted).await;

        let mut payloads: Vec<(NetworkType, usize, Vec<Row>)> = Vec::new();
        for (network, rows) in &merged.rows {
            if !ready.contains(network) {
                tracing::warn!(
                    group = %group_name,
                    subsection = network.subsection_name(),
                    rows = rows.len(),
                    "sub-section unavailable; skipping write"
                );
                continue;
            }
            let mut values = Vec::with_capacity(rows.len() + 1);
            values.push(self.formatter.header(*network));
            values.extend(rows.iter().cloned());
            payloads.push((*network, rows.len(), values));
        }

        let results = join_all(
            payloads
                .iter()
                .map(|(network, _, values)| self.write_subsection(&document.id, *network, values)),
        )
        .await;

        let mut rows_written = 0;
        let mut subsections_written = Vec::new();
        let mut failed = 0;
        for ((network, row_count, _), result) in payloads.iter().zip(results) {
            match result {
                Ok(()) => {
                    rows_written += row_count;
                    subsections_written.push(*network);
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        group = %group_name,
                        subsection = network.subsection_name(),
                        error = %e,
                        "sub-section write failed"
                    );
                }
            }
        }

        if failed > 0 {
            return Err(CycleFailure {
                stage: CycleStage::WriteSubsections,
                error: SyncError::PartialWrite {
                    failed,
                    attempted: payloads.len(),
                },
            });
        }

        let missing: Vec<String> = wanted
            .iter()
            .filter(|n| !ready.contains(*n))
            .map(|n| n.subsection_name().to_owned())
            .collect();
        if !missing.is_empty() {
            return Err(CycleFailure {
                stage: CycleStage::EnsureSubsections,
                error: SyncError::MissingSubsections { names: missing },
            });
        }

        tracing::info!(
            group = %group_name,
            document_id = %document.id,
            created,
            rows_written,
            dropped = diagnostics.len(),
            "group reconciled"
        );

        Ok(CycleOutcome {
            document,
            created,
            rows_written,
            subsections_written,
            diagnostics,
        })
    }

    async fn rename_existing(
        &self,
        found: TargetDocument,
        stamped: &str,
    ) -> Result<TargetDocument, SyncError> {
        self.session.pre_refresh("rename document").await;
        let store = &self.store;
        let id = found.id.as_str();
        self.executor
            .execute_authorized(&self.session, "rename document", |token| async move {
                store.rename_document(&token, id, stamped).await
            })
            .await?;
        tracing::info!(document_id = %found.id, title = %stamped, "renamed existing document");
        Ok(TargetDocument {
            current_title: stamped.to_owned(),
            ..found
        })
    }

    /// Creates the document with one sub-section per network in `networks`,
    /// then moves it into the container.
    ///
    /// A create that succeeded server-side but reported failure leaves an
    /// orphan outside the container; it can never surface as a second match.
    async fn create_new(
        &self,
        title: &DocumentTitle,
        stamped: &str,
        networks: &[NetworkType],
    ) -> Result<TargetDocument, SyncError> {
        let store = &self.store;
        let container_id = self.settings.container_id.as_str();
        let subsections: Vec<&str> = networks.iter().map(|n| n.subsection_name()).collect();
        let subsections = subsections.as_slice();

        self.session.pre_refresh("create document").await;
        let id = self
            .executor
            .execute_authorized(&self.session, "create document", |token| async move {
                store.create_document(&token, stamped, subsections).await
            })
            .await?;

        self.session.pre_refresh("move document").await;
        let doc_id = id.as_str();
        self.executor
            .execute_authorized(&self.session, "move document", |token| async move {
                store.move_document(&token, doc_id, container_id).await
            })
            .await?;

        tracing::info!(document_id = %id, title = %stamped, "created new document");
        Ok(TargetDocument {
            id,
            current_title: stamped.to_owned(),
            base_pattern: title.base_pattern().to_owned(),
        })
    }

    /// Returns the networks whose sub-section is known to exist afterwards.
    async fn ensure_subsections(
        &self,
        document_id: &str,
        wanted: &[NetworkType],
    ) -> BTreeSet<NetworkType> {
        let store = &self.store;
        let existing = match self
            .executor
            .execute_authorized(&self.session, "list sub-sections", |token| async move {
                store.list_subsections(&token, document_id).await
            })
            .await
        {
            Ok(names) => names,
            Err(e) => {
                // Treated as empty; adds below tolerate "already exists".
                tracing::warn!(document_id, error = %e, "could not list sub-sections");
                Vec::new()
            }
        };

        let mut ready = BTreeSet::new();
        for network in wanted {
            let name = network.subsection_name();
            if existing.iter().any(|n| n == name) {
                ready.insert(*network);
                continue;
            }
            self.session.pre_refresh("add sub-section").await;
            let added = self
                .executor
                .execute_idempotent(&self.session, "add sub-section", |token| async move {
                    store.add_subsection(&token, document_id, name).await
                })
                .await;
            match added {
                Ok(()) => {
                    tracing::debug!(document_id, subsection = name, "sub-section ready");
                    ready.insert(*network);
                }
                Err(e) => {
                    tracing::error!(document_id, subsection = name, error = %e, "could not add sub-section");
                }
            }
        }
        ready
    }

    async fn write_subsection(
        &self,
        document_id: &str,
        network: NetworkType,
        values: &[Row],
    ) -> Result<(), SyncError> {
        let store = &self.store;
        let subsection = network.subsection_name();
        self.session.pre_refresh("write rows").await;
        self.executor
            .execute_authorized(&self.session, "write rows", |token| async move {
                store.write_rows(&token, document_id, subsection, values).await
            })
            .await
    }
}
