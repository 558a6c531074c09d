//! Row formatting for sub-section writes.

use serde_json::Value;
use sproutsync_core::{AnalyticsDataPoint, NetworkType, Profile};

/// One spreadsheet row; cells are plain JSON scalars.
pub type Row = Vec<Value>;

pub trait RowFormatter: Send + Sync {
    /// Header row written above the data rows of `network`'s sub-section.
    fn header(&self, network: NetworkType) -> Row;

    /// Row for one (profile, day) pair, or `None` when the point carries
    /// nothing this network reports.
    fn format_row(
        &self,
        network: NetworkType,
        profile: &Profile,
        point: &AnalyticsDataPoint,
    ) -> Option<Row>;
}

/// Default formatter: `Date`, `Profile`, then one column per metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRowFormatter;

const FOLLOWERS: (&str, &str) = ("lifetime_snapshot.followers_count", "Followers");
const IMPRESSIONS: (&str, &str) = ("impressions", "Impressions");
const REACTIONS: (&str, &str) = ("reactions", "Reactions");
const LIKES: (&str, &str) = ("likes", "Likes");
const COMMENTS: (&str, &str) = ("comments_count", "Comments");
const SHARES: (&str, &str) = ("shares_count", "Shares");
const LINK_CLICKS: (&str, &str) = ("post_link_clicks", "Link Clicks");
const VIDEO_VIEWS: (&str, &str) = ("video_views", "Video Views");
const SAVES: (&str, &str) = ("saves", "Saves");
const NET_FOLLOWER_GROWTH: (&str, &str) = ("net_follower_growth", "Net Follower Growth");

/// `(metric key, column header)` pairs per network, in column order.
fn metric_columns(network: NetworkType) -> &'static [(&'static str, &'static str)] {
    match network {
        NetworkType::Facebook => &[
            FOLLOWERS,
            NET_FOLLOWER_GROWTH,
            IMPRESSIONS,
            REACTIONS,
            COMMENTS,
            SHARES,
            LINK_CLICKS,
        ],
        NetworkType::Instagram => &[
            FOLLOWERS,
            NET_FOLLOWER_GROWTH,
            IMPRESSIONS,
            LIKES,
            COMMENTS,
            SAVES,
            VIDEO_VIEWS,
        ],
        NetworkType::Linkedin => &[
            FOLLOWERS,
            NET_FOLLOWER_GROWTH,
            IMPRESSIONS,
            REACTIONS,
            COMMENTS,
            SHARES,
            LINK_CLICKS,
        ],
        NetworkType::Twitter => &[
            FOLLOWERS,
            NET_FOLLOWER_GROWTH,
            IMPRESSIONS,
            LIKES,
            COMMENTS,
            SHARES,
            LINK_CLICKS,
        ],
        NetworkType::Youtube => &[
            FOLLOWERS,
            NET_FOLLOWER_GROWTH,
            VIDEO_VIEWS,
            LIKES,
            COMMENTS,
            SHARES,
        ],
    }
}

impl MetricsRowFormatter {
    /// Every metric key any network's columns read, each listed once.
    #[must_use]
    pub fn metric_keys() -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = Vec::new();
        for network in NetworkType::ALL {
            for (key, _) in metric_columns(network) {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }
        keys
    }
}

impl RowFormatter for MetricsRowFormatter {
    fn header(&self, network: NetworkType) -> Row {
        let mut row = vec![Value::from("Date"), Value::from("Profile")];
        row.extend(
            metric_columns(network)
                .iter()
                .map(|(_, header)| Value::from(*header)),
        );
        row
    }

    fn format_row(
        &self,
        network: NetworkType,
        profile: &Profile,
        point: &AnalyticsDataPoint,
    ) -> Option<Row> {
        let metrics = point.metrics.as_object()?;
        let columns = metric_columns(network);
        if !columns.iter().any(|(key, _)| metrics.contains_key(*key)) {
            return None;
        }

        let mut row = Vec::with_capacity(columns.len() + 2);
        row.push(Value::from(point.reporting_date.format("%Y-%m-%d").to_string()));
        row.push(Value::from(profile.display_name.as_str()));
        row.extend(
            columns
                .iter()
                .map(|(key, _)| metric_cell(metrics.get(*key))),
        );
        Some(row)
    }
}

/// Numbers pass through, numeric strings are parsed, anything else is blank.
fn metric_cell(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Number(n)) => Value::Number(n.clone()),
        Some(Value::String(s)) => s
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| s.parse::<f64>().map(Value::from))
            .unwrap_or_else(|_| Value::from("")),
        _ => Value::from(""),
    }
}
