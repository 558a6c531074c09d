//! Non-fatal resolution problems collected during a cycle.

use chrono::NaiveDate;
use sproutsync_core::{NetworkType, ProfileId};

/// A profile or data point that was dropped instead of being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The profile's vendor network type is outside the supported set.
    UnmappedNetwork { profile_id: ProfileId, raw: String },
    /// A data point references a profile that is not in the group.
    UnknownProfile {
        profile_id: ProfileId,
        reporting_date: NaiveDate,
    },
    /// A later data point repeated an already-seen (profile, day) key.
    DuplicatePoint {
        profile_id: ProfileId,
        reporting_date: NaiveDate,
    },
    /// The formatter produced nothing for this point.
    EmptyRow {
        profile_id: ProfileId,
        reporting_date: NaiveDate,
        network: NetworkType,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnmappedNetwork { profile_id, raw } => {
                write!(f, "profile {profile_id}: unsupported network type '{raw}'")
            }
            Diagnostic::UnknownProfile {
                profile_id,
                reporting_date,
            } => write!(
                f,
                "data point for unknown profile {profile_id} on {reporting_date}"
            ),
            Diagnostic::DuplicatePoint {
                profile_id,
                reporting_date,
            } => write!(
                f,
                "duplicate data point for profile {profile_id} on {reporting_date}"
            ),
            Diagnostic::EmptyRow {
                profile_id,
                reporting_date,
                network,
            } => write!(
                f,
                "no {network} metrics for profile {profile_id} on {reporting_date}"
            ),
        }
    }
}
