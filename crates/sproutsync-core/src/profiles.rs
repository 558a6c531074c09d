//! Snapshot types fetched from the analytics vendor once per sync cycle.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::network::NetworkMapping;

pub type ProfileId = i64;
pub type GroupId = i64;

/// A tracked social-media account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub display_name: String,
    /// Raw vendor network identifier, mapped via [`Profile::network`].
    pub network_type: String,
    /// Declared group memberships; treated as a set.
    pub group_ids: Vec<GroupId>,
}

impl Profile {
    #[must_use]
    pub fn network(&self) -> NetworkMapping {
        NetworkMapping::from_vendor(&self.network_type)
    }
}

/// An organizational unit that owns one target document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// One day of metrics for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsDataPoint {
    pub profile_id: ProfileId,
    pub reporting_date: NaiveDate,
    /// Raw metrics object as returned by the vendor.
    pub metrics: serde_json::Value,
}

impl AnalyticsDataPoint {
    /// Identity used for deduplication.
    #[must_use]
    pub fn key(&self) -> (ProfileId, NaiveDate) {
        (self.profile_id, self.reporting_date)
    }
}

/// Inclusive range of reporting days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The `days` full days ending the day before `today`.
    ///
    /// `days == 0` is treated as one day.
    #[must_use]
    pub fn trailing_days(today: NaiveDate, days: u32) -> Self {
        let end = today.pred_opt().unwrap_or(today);
        let span = i64::from(days.max(1) - 1);
        let start = end
            .checked_sub_signed(chrono::Duration::days(span))
            .unwrap_or(end);
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}...{}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}
