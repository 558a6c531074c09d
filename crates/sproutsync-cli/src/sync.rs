//! `sync` and `groups` commands.

use chrono::Utc;
use sproutsync_engine::{BucketKey, RunSummary};

use crate::Engine;

/// Runs one sync and prints a link per updated group.
///
/// # Errors
///
/// Returns an error when groups or profiles cannot be listed, or when any
/// group failed, so the process exits non-zero.
pub(crate) async fn run_sync(engine: &Engine, group: Option<&str>) -> anyhow::Result<()> {
    let summary = engine.run(group).await?;
    print_summary(&summary);
    if summary.is_clean() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} group(s) failed",
            summary.failed.len(),
            summary.failed.len() + summary.succeeded.len()
        )
    }
}

/// Fetches and merges analytics like `sync` but only prints row counts.
///
/// # Errors
///
/// Returns an error when groups or profiles cannot be listed.
pub(crate) async fn run_preview(engine: &Engine, group: Option<&str>) -> anyhow::Result<()> {
    let previews = engine.preview_at(group, Utc::now()).await?;
    if previews.is_empty() {
        println!("no groups with profiles to sync");
        return Ok(());
    }
    for preview in &previews {
        println!("{}", preview.group_name);
        if let Some(error) = &preview.error {
            println!("  analytics unavailable: {error}");
        }
        for (network, rows) in &preview.rows {
            println!("  {:<10} {rows} row(s)", network.subsection_name());
        }
        for diagnostic in &preview.diagnostics {
            println!("  note: {diagnostic}");
        }
    }
    Ok(())
}

/// Prints every non-empty bucket and its profiles by network.
///
/// # Errors
///
/// Returns an error when groups or profiles cannot be listed.
pub(crate) async fn run_groups(engine: &Engine) -> anyhow::Result<()> {
    let plans = engine.plan(None).await?;
    for plan in &plans {
        match plan.key {
            BucketKey::Group(id) => println!("{} (group {id})", plan.bucket.group_name),
            BucketKey::Default => println!("{} (profiles without a group)", plan.bucket.group_name),
        }
        for (network, profiles) in &plan.partition.by_network {
            let names: Vec<&str> = profiles.iter().map(|p| p.display_name.as_str()).collect();
            println!("  {:<10} {}", network.subsection_name(), names.join(", "));
        }
        for diagnostic in &plan.partition.diagnostics {
            println!("  skipped: {diagnostic}");
        }
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Synced {} ({} group(s))", summary.range, summary.succeeded.len());
    for success in &summary.succeeded {
        println!("{}: {}", success.group_name, success.document_url);
    }
    for failure in &summary.failed {
        eprintln!(
            "{}: failed at {}: {}",
            failure.group_name, failure.stage, failure.error
        );
    }
}
