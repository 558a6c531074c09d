//! Reconciliation engine: pulls grouped analytics from the vendor and keeps
//! exactly one up-to-date spreadsheet per group in the document store.
//!
//! Every external mutation goes through [`BackoffExecutor`], which retries
//! quota and transient failures and uses the single [`CredentialSession`] to
//! recover from expired credentials.

pub mod backoff;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod locator;
pub mod merge;
pub mod ports;
pub mod reconcile;
pub mod resolver;
pub mod run;
pub mod schedule;
pub mod session;

pub use backoff::{BackoffExecutor, BackoffPolicy, ErrorClass};
pub use diagnostics::Diagnostic;
pub use error::{AuthError, SourceError, StoreError, SyncError};
pub use format::{MetricsRowFormatter, Row, RowFormatter};
pub use locator::{select_match, DocumentLocator};
pub use merge::{dedup_points, merge_rows, MergedRows};
pub use ports::{AccessToken, AnalyticsSource, CredentialProvider, DocumentStore, IssuedToken};
pub use reconcile::{CycleFailure, CycleOutcome, CycleStage, EngineSettings, SyncEngine};
pub use resolver::{
    partition_by_network, resolve, BucketKey, GroupBucket, NetworkPartition, DEFAULT_BUCKET_NAME,
};
pub use run::{GroupFailure, GroupPlan, GroupPreview, GroupSuccess, RunSummary};
pub use schedule::SchedulePolicy;
pub use session::CredentialSession;
