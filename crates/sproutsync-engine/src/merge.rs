//! Turns a group's raw data points into ordered rows per network.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use sproutsync_core::{AnalyticsDataPoint, NetworkType, Profile, ProfileId};

use crate::diagnostics::Diagnostic;
use crate::format::{Row, RowFormatter};
use crate::resolver::NetworkPartition;

/// Rows ready to write, keyed by network, plus everything that was dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRows {
    pub rows: BTreeMap<NetworkType, Vec<Row>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MergedRows {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }
}

/// Keeps the first point seen for each (profile, day) key, in input order.
#[must_use]
pub fn dedup_points(
    points: &[AnalyticsDataPoint],
) -> (Vec<&AnalyticsDataPoint>, Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(points.len());
    let mut diagnostics = Vec::new();
    for point in points {
        if seen.insert(point.key()) {
            kept.push(point);
        } else {
            diagnostics.push(Diagnostic::DuplicatePoint {
                profile_id: point.profile_id,
                reporting_date: point.reporting_date,
            });
        }
    }
    (kept, diagnostics)
}

/// Deduplicates `points`, resolves each to its profile and network, and
/// formats one row per surviving (profile, day) pair.
///
/// Rows within a network are ordered by (reporting date, profile id).
pub fn merge_rows(
    partition: &NetworkPartition,
    points: &[AnalyticsDataPoint],
    formatter: &dyn RowFormatter,
) -> MergedRows {
    let owners: HashMap<ProfileId, (NetworkType, &Profile)> = partition
        .by_network
        .iter()
        .flat_map(|(network, profiles)| profiles.iter().map(move |p| (p.id, (*network, p))))
        .collect();
    let unmapped: HashSet<ProfileId> = partition
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::UnmappedNetwork { profile_id, .. } => Some(*profile_id),
            _ => None,
        })
        .collect();

    let (kept, mut diagnostics) = dedup_points(points);
    for d in &diagnostics {
        tracing::debug!(diagnostic = %d, "dropping duplicate data point");
    }

    let mut keyed: BTreeMap<NetworkType, Vec<((NaiveDate, ProfileId), Row)>> =
        BTreeMap::new();
    for point in kept {
        let Some((network, profile)) = owners.get(&point.profile_id) else {
            if unmapped.contains(&point.profile_id) {
                // Already reported once at partition time.
                continue;
            }
            let diagnostic = Diagnostic::UnknownProfile {
                profile_id: point.profile_id,
                reporting_date: point.reporting_date,
            };
            tracing::warn!(diagnostic = %diagnostic, "data point dropped");
            diagnostics.push(diagnostic);
            continue;
        };
        match formatter.format_row(*network, profile, point) {
            Some(row) => keyed
                .entry(*network)
                .or_default()
                .push(((point.reporting_date, point.profile_id), row)),
            None => {
                let diagnostic = Diagnostic::EmptyRow {
                    profile_id: point.profile_id,
                    reporting_date: point.reporting_date,
                    network: *network,
                };
                tracing::debug!(diagnostic = %diagnostic, "data point dropped");
                diagnostics.push(diagnostic);
            }
        }
    }

    let rows = keyed
        .into_iter()
        .map(|(network, mut rows)| {
            rows.sort_by_key(|(key, _)| *key);
            (network, rows.into_iter().map(|(_, row)| row).collect())
        })
        .collect();

    MergedRows { rows, diagnostics }
}
