//! Cron-driven sync loop.
//!
//! Registers one job on the configured cron expression and keeps the
//! scheduler alive until Ctrl-C. A tick that fires while the previous run is
//! still going is skipped.

use std::sync::Arc;

use sproutsync_core::AppConfig;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::Engine;

/// Runs the sync job on `config.schedule_cron` until interrupted.
///
/// # Errors
///
/// Returns an error if the scheduler cannot be built, the cron expression is
/// invalid, or the Ctrl-C handler cannot be installed.
pub(crate) async fn run_schedule(engine: Engine, config: &AppConfig) -> anyhow::Result<()> {
    let mut scheduler = build_scheduler(Arc::new(engine), &config.schedule_cron).await?;
    tracing::info!(cron = %config.schedule_cron, "scheduler started; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("received shutdown signal, stopping scheduler");
    scheduler.shutdown().await?;
    Ok(())
}

async fn build_scheduler(
    engine: Arc<Engine>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let engine = Arc::clone(&engine);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                tracing::warn!("scheduler: previous sync still running; skipping tick");
                return;
            };
            tracing::info!("scheduler: starting sync run");
            match engine.run(None).await {
                Ok(summary) => tracing::info!(
                    succeeded = summary.succeeded.len(),
                    failed = summary.failed.len(),
                    "scheduler: sync run complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: sync run aborted"),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    Ok(scheduler)
}
