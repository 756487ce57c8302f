//! Activity JSON ingestion.
//!
//! Reads the activity export (a JSON array of flat records) and normalizes
//! each record into an [`Activity`]: missing numbers become `0` or `None`,
//! the encoded summary polyline is decoded into a path, and the location
//! string becomes the city key.
//!
//! Only structural problems are errors: invalid JSON, or a record without
//! `run_id` or `start_date_local`. Everything else is a data-quality gap
//! that is logged and defaulted.

use std::collections::HashSet;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::activity_types::RUN;
use crate::error::{OptionExt, Result};
use crate::{Activity, GpsPoint};

/// Precision of encoded summary polylines.
const POLYLINE_PRECISION: u32 = 5;

/// One record as exported by the activity database.
#[derive(Debug, Deserialize)]
struct RawActivity {
    run_id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    distance: Option<f64>,
    #[serde(default)]
    moving_time: Option<String>,
    #[serde(default, rename = "type")]
    activity_type: Option<String>,
    #[serde(default)]
    start_date_local: Option<String>,
    #[serde(default)]
    location_country: Option<String>,
    #[serde(default)]
    summary_polyline: Option<String>,
    #[serde(default)]
    average_heartrate: Option<f64>,
    #[serde(default)]
    average_speed: Option<f64>,
    #[serde(default)]
    elevation_gain: Option<f64>,
}

/// Decode an encoded polyline into a path. Undecodable input yields an empty
/// path.
pub fn decode_path(encoded: &str) -> Vec<GpsPoint> {
    if encoded.is_empty() {
        return Vec::new();
    }
    match polyline::decode_polyline(encoded, POLYLINE_PRECISION) {
        // x is longitude, y is latitude
        Ok(line) => line.coords().map(|c| GpsPoint::new(c.y, c.x)).collect(),
        Err(e) => {
            warn!("[Ingest] Failed to decode polyline: {}", e);
            Vec::new()
        }
    }
}

impl RawActivity {
    fn into_activity(self, index: usize) -> Result<Activity> {
        let id = self.run_id.ok_or_invalid_record(index, "missing run_id")?;
        let start_date_local = self
            .start_date_local
            .filter(|s| !s.is_empty())
            .ok_or_invalid_record(index, "missing start_date_local")?;

        let activity_type = self.activity_type.unwrap_or_else(|| {
            debug!("[Ingest] Activity {} has no type, assuming {}", id, RUN);
            RUN.to_string()
        });

        let mut activity = Activity::new(id, &activity_type, 0.0, &start_date_local);
        activity.name = self.name.unwrap_or_default();
        activity.distance = self
            .distance
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(0.0);
        activity.moving_time = self.moving_time.unwrap_or_default();
        activity.average_speed = self
            .average_speed
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(0.0);
        activity.average_heartrate = self.average_heartrate;
        activity.elevation_gain = self.elevation_gain;
        activity.city = self.location_country.unwrap_or_default();
        activity.path = self
            .summary_polyline
            .as_deref()
            .map(decode_path)
            .unwrap_or_default();
        Ok(activity)
    }
}

/// Parse the activity export into normalized activities, in input order.
///
/// Duplicate ids keep their first occurrence.
pub fn load_activities_json(json: &str) -> Result<Vec<Activity>> {
    let raw: Vec<RawActivity> = serde_json::from_str(json)?;
    let total = raw.len();

    let mut seen = HashSet::with_capacity(total);
    let mut activities = Vec::with_capacity(total);
    for (index, record) in raw.into_iter().enumerate() {
        let activity = record.into_activity(index)?;
        if !seen.insert(activity.id) {
            warn!("[Ingest] Duplicate activity id {} at record {}, skipping", activity.id, index);
            continue;
        }
        activities.push(activity);
    }

    let without_path = activities.iter().filter(|a| !a.has_path()).count();
    info!(
        "[Ingest] Loaded {} activities ({} without map data)",
        activities.len(),
        without_path
    );
    Ok(activities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    const ENCODED: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    #[test]
    fn test_decode_path() {
        let path = decode_path(ENCODED);
        assert_eq!(path.len(), 3);
        assert!((path[0].latitude - 38.5).abs() < 1e-9);
        assert!((path[0].longitude + 120.2).abs() < 1e-9);
        assert!((path[2].latitude - 43.252).abs() < 1e-9);
        assert!(decode_path("").is_empty());
    }

    #[test]
    fn test_load_full_record() {
        let json = format!(
            r#"[{{
                "run_id": 42,
                "name": "Lakeside loop",
                "distance": 10020.5,
                "moving_time": "1 day, 0:50:01",
                "type": "Run",
                "start_date": "2024-03-08 23:00:00",
                "start_date_local": "2024-03-09 07:00:00",
                "location_country": "Chaoyang, Beijing, China",
                "summary_polyline": "{}",
                "average_heartrate": 151.0,
                "average_speed": 3.3,
                "elevation_gain": 12.0,
                "source": "strava"
            }}]"#,
            ENCODED
        );
        let activities = load_activities_json(&json).unwrap();
        assert_eq!(activities.len(), 1);
        let a = &activities[0];
        assert_eq!(a.id, 42);
        assert_eq!(a.name, "Lakeside loop");
        assert_eq!(a.city, "Chaoyang, Beijing, China");
        assert_eq!(a.moving_seconds(), 86_400 + 3001);
        assert_eq!(a.path.len(), 3);
        assert_eq!(a.average_heartrate, Some(151.0));
    }

    #[test]
    fn test_nulls_default() {
        let json = r#"[{
            "run_id": 1,
            "name": null,
            "distance": null,
            "type": "Hike",
            "start_date_local": "2023-01-01 10:00:00",
            "average_speed": null,
            "average_heartrate": null,
            "summary_polyline": null
        }]"#;
        let a = &load_activities_json(json).unwrap()[0];
        assert_eq!(a.name, "");
        assert_eq!(a.distance, 0.0);
        assert_eq!(a.average_speed, 0.0);
        assert_eq!(a.pace_text(), None);
        assert!(a.path.is_empty());
    }

    #[test]
    fn test_bad_polyline_keeps_record() {
        let json = r#"[{"run_id": 1, "start_date_local": "2023-01-01 10:00:00", "summary_polyline": "~"}]"#;
        let activities = load_activities_json(json).unwrap();
        assert_eq!(activities.len(), 1);
        assert!(activities[0].path.is_empty());
        assert_eq!(activities[0].activity_type, "Run");
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let json = r#"[
            {"run_id": 1, "name": "first", "start_date_local": "2023-01-01 10:00:00"},
            {"run_id": 1, "name": "second", "start_date_local": "2023-01-02 10:00:00"}
        ]"#;
        let activities = load_activities_json(json).unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].name, "first");
    }

    #[test]
    fn test_structural_errors() {
        let err = load_activities_json(r#"[{"name": "no id"}]"#).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRecord { index: 0, .. }));

        let err = load_activities_json(r#"[{"run_id": 1}]"#).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRecord { .. }));

        let err = load_activities_json("{not json").unwrap_err();
        assert!(matches!(err, PipelineError::Json(_)));
    }
}
