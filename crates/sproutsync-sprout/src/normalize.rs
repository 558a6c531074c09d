//! Conversion of Sprout API records into domain types.

use chrono::NaiveDate;
use sproutsync_core::{AnalyticsDataPoint, Group, Profile};

use crate::types::{AnalyticsRecord, GroupRecord, ProfileRecord};

const PROFILE_DIMENSION: &str = "customer_profile_id";
const DAY_DIMENSION: &str = "reporting_period.by(day)";

#[must_use]
pub fn normalize_group(record: &GroupRecord) -> Group {
    Group {
        id: record.group_id,
        name: record.name.trim().to_owned(),
    }
}

/// Display name falls back from `name` to `native_name` to the profile id.
#[must_use]
pub fn normalize_profile(record: &ProfileRecord) -> Profile {
    let display_name = [record.name.as_deref(), record.native_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map_or_else(|| record.customer_profile_id.to_string(), str::to_owned);
    Profile {
        id: record.customer_profile_id,
        display_name,
        network_type: record.network_type.clone(),
        group_ids: record.groups.clone(),
    }
}

/// Parses `"YYYY-MM-DD"` or an RFC 3339 timestamp into its calendar day.
#[must_use]
pub fn parse_reporting_day(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Returns `None` for a record missing its profile or day dimension.
#[must_use]
pub fn normalize_analytics(record: &AnalyticsRecord) -> Option<AnalyticsDataPoint> {
    let profile_id = match record.dimensions.get(PROFILE_DIMENSION)? {
        serde_json::Value::Number(n) => n.as_i64()?,
        serde_json::Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    let reporting_date = record
        .dimensions
        .get(DAY_DIMENSION)
        .and_then(serde_json::Value::as_str)
        .and_then(parse_reporting_day)?;
    Some(AnalyticsDataPoint {
        profile_id,
        reporting_date,
        metrics: record.metrics.clone(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: serde_json::Value) -> AnalyticsRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn profile_name_falls_back_to_native_name_then_id() {
        let mut r = ProfileRecord {
            customer_profile_id: 9,
            network_type: "fb_page".to_owned(),
            name: Some("  ".to_owned()),
            native_name: Some("acme".to_owned()),
            groups: vec![1],
        };
        assert_eq!(normalize_profile(&r).display_name, "acme");
        r.native_name = None;
        assert_eq!(normalize_profile(&r).display_name, "9");
    }

    #[test]
    fn reporting_day_accepts_dates_and_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 2);
        assert_eq!(parse_reporting_day("2025-01-02"), expected);
        assert_eq!(parse_reporting_day("2025-01-02T00:00:00Z"), expected);
        assert_eq!(parse_reporting_day("01/02/2025"), None);
        assert_eq!(parse_reporting_day("short"), None);
    }

    #[test]
    fn analytics_record_maps_dimensions() {
        let point = normalize_analytics(&record(json!({
            "dimensions": {
                "customer_profile_id": "42",
                "reporting_period.by(day)": "2025-01-02T00:00:00Z"
            },
            "metrics": { "impressions": 10 }
        })))
        .unwrap();
        assert_eq!(point.profile_id, 42);
        assert_eq!(point.metrics, json!({ "impressions": 10 }));
    }

    #[test]
    fn analytics_record_without_day_is_skipped() {
        let point = normalize_analytics(&record(json!({
            "dimensions": { "customer_profile_id": 42 },
            "metrics": {}
        })));
        assert!(point.is_none());
    }
}
