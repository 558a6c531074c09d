//! Target document identity and title rendering.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Drive MIME type of the only document kind the engine manages.
pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

const LAST_UPDATED_SEPARATOR: &str = " - Last Updated ";

/// A document as reported by the store's listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub id: String,
    pub name: String,
    pub modified_time: DateTime<Utc>,
    pub mime_type: String,
    #[serde(default)]
    pub trashed: bool,
}

/// The canonical document for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDocument {
    pub id: String,
    pub current_title: String,
    pub base_pattern: String,
}

/// Stable and timestamped title forms for one group's document.
///
/// The base pattern (`"<prefix> - <group>"`) never changes and is what the
/// locator searches for; the stamped title appends the sync time and changes
/// every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTitle {
    base_pattern: String,
}

impl DocumentTitle {
    #[must_use]
    pub fn for_group(prefix: &str, group_name: &str) -> Self {
        Self {
            base_pattern: format!("{prefix} - {group_name}"),
        }
    }

    #[must_use]
    pub fn base_pattern(&self) -> &str {
        &self.base_pattern
    }

    /// `"<base> - Last Updated YYYY-MM-DD HH:MM"` rendered in `offset`.
    #[must_use]
    pub fn stamped(&self, at: DateTime<Utc>, offset: FixedOffset) -> String {
        let local = at.with_timezone(&offset);
        format!(
            "{}{LAST_UPDATED_SEPARATOR}{}",
            self.base_pattern,
            local.format("%Y-%m-%d %H:%M")
        )
    }

    /// Whether `name` contains the base pattern anywhere.
    #[must_use]
    pub fn contains_match(&self, name: &str) -> bool {
        name.contains(&self.base_pattern)
    }

    /// Whether `name` is this group's title and not merely a longer group name
    /// that happens to contain it (`"... - Marketing EU - ..."` vs `"... - Marketing"`).
    #[must_use]
    pub fn anchored_match(&self, name: &str) -> bool {
        name == self.base_pattern
            || name
                .strip_prefix(self.base_pattern.as_str())
                .is_some_and(|rest| rest.starts_with(LAST_UPDATED_SEPARATOR))
    }
}
