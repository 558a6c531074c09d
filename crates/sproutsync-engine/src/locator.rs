//! Finds a group's existing document inside the target container.

use sproutsync_core::{DocumentEntry, DocumentTitle, TargetDocument, TitleMatch, SPREADSHEET_MIME_TYPE};

use crate::backoff::BackoffExecutor;
use crate::error::SyncError;
use crate::ports::{CredentialProvider, DocumentStore};
use crate::session::CredentialSession;

pub struct DocumentLocator<'a, S> {
    store: &'a S,
    executor: &'a BackoffExecutor,
    mode: TitleMatch,
}

impl<'a, S: DocumentStore> DocumentLocator<'a, S> {
    pub fn new(store: &'a S, executor: &'a BackoffExecutor, mode: TitleMatch) -> Self {
        Self {
            store,
            executor,
            mode,
        }
    }

    /// Looks up the document for `title` in `container_id`.
    ///
    /// The listing call is retried through the executor; `Ok(None)` is only
    /// returned for a listing that actually succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Locate`] wrapping the final failure once retries
    /// are exhausted.
    pub async fn locate<P: CredentialProvider>(
        &self,
        session: &CredentialSession<P>,
        title: &DocumentTitle,
        container_id: &str,
    ) -> Result<Option<TargetDocument>, SyncError> {
        let pattern = title.base_pattern();
        let entries = self
            .executor
            .execute_authorized(session, "list documents", |token| async move {
                self.store.list_documents(&token, container_id, pattern).await
            })
            .await
            .map_err(|e| SyncError::Locate {
                pattern: pattern.to_owned(),
                source: Box::new(e),
            })?;

        Ok(select_match(&entries, title, self.mode).map(|entry| TargetDocument {
            id: entry.id.clone(),
            current_title: entry.name.clone(),
            base_pattern: pattern.to_owned(),
        }))
    }
}

/// Picks the canonical document among listed `entries`.
///
/// Only live spreadsheets whose name matches `title` under `mode` qualify.
/// Among several, the most recently modified wins; equal timestamps keep the
/// store's list order. Extra matches are logged and left alone.
#[must_use]
pub fn select_match<'e>(
    entries: &'e [DocumentEntry],
    title: &DocumentTitle,
    mode: TitleMatch,
) -> Option<&'e DocumentEntry> {
    let matches: Vec<&DocumentEntry> = entries
        .iter()
        .filter(|e| !e.trashed && e.mime_type == SPREADSHEET_MIME_TYPE)
        .filter(|e| match mode {
            TitleMatch::Anchored => title.anchored_match(&e.name),
            TitleMatch::Contains => title.contains_match(&e.name),
        })
        .collect();

    let mut best: Option<&DocumentEntry> = None;
    for entry in &matches {
        if best.is_none_or(|b| entry.modified_time > b.modified_time) {
            best = Some(entry);
        }
    }

    if matches.len() > 1 {
        if let Some(chosen) = best {
            tracing::warn!(
                pattern = title.base_pattern(),
                matches = matches.len(),
                chosen = %chosen.id,
                "multiple documents match; using the most recently modified"
            );
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn entry(id: &str, name: &str, minute: u32) -> DocumentEntry {
        DocumentEntry {
            id: id.to_owned(),
            name: name.to_owned(),
            modified_time: Utc.with_ymd_and_hms(2025, 1, 1, 9, minute, 0).unwrap(),
            mime_type: SPREADSHEET_MIME_TYPE.to_owned(),
            trashed: false,
        }
    }

    fn marketing() -> DocumentTitle {
        DocumentTitle::for_group("Sprout Analytics", "Marketing")
    }

    #[test]
    fn no_entries_is_not_found() {
        assert!(select_match(&[], &marketing(), TitleMatch::Anchored).is_none());
    }

    #[test]
    fn most_recently_modified_wins() {
        let entries = [
            entry("old", "Sprout Analytics - Marketing - Last Updated 2024-12-30 09:00", 1),
            entry("new", "Sprout Analytics - Marketing - Last Updated 2024-12-31 09:00", 5),
        ];
        let chosen = select_match(&entries, &marketing(), TitleMatch::Anchored).unwrap();
        assert_eq!(chosen.id, "new");
    }

    #[test]
    fn ties_keep_list_order() {
        let entries = [
            entry("first", "Sprout Analytics - Marketing", 3),
            entry("second", "Sprout Analytics - Marketing", 3),
        ];
        let chosen = select_match(&entries, &marketing(), TitleMatch::Anchored).unwrap();
        assert_eq!(chosen.id, "first");
    }

    #[test]
    fn trashed_and_foreign_kinds_are_ignored() {
        let mut trashed = entry("trashed", "Sprout Analytics - Marketing", 9);
        trashed.trashed = true;
        let mut doc = entry("doc", "Sprout Analytics - Marketing", 8);
        doc.mime_type = "application/vnd.google-apps.document".to_owned();
        let live = entry("live", "Sprout Analytics - Marketing", 1);

        let entries = [trashed, doc, live];
        let chosen = select_match(&entries, &marketing(), TitleMatch::Anchored).unwrap();
        assert_eq!(chosen.id, "live");
    }

    #[test]
    fn anchored_mode_rejects_longer_group_names() {
        let entries = [entry(
            "eu",
            "Sprout Analytics - Marketing EU - Last Updated 2025-01-01 09:00",
            1,
        )];
        assert!(select_match(&entries, &marketing(), TitleMatch::Anchored).is_none());
    }

    #[test]
    fn contains_mode_accepts_any_substring() {
        let entries = [entry(
            "eu",
            "Sprout Analytics - Marketing EU - Last Updated 2025-01-01 09:00",
            1,
        )];
        let chosen = select_match(&entries, &marketing(), TitleMatch::Contains).unwrap();
        assert_eq!(chosen.id, "eu");
    }
}
