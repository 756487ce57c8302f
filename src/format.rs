//! Display formatting for raw activity fields.
//!
//! Pure functions turning speeds, duration strings and dates into display
//! strings and comparable values. None of them panic, including on inputs
//! that break their contract; such inputs just produce meaningless output.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Timelike};
use once_cell::sync::Lazy;

use crate::activity_types::*;
use crate::config::Locale;
use crate::Activity;

/// Color used for any category without an entry in the palette.
pub const DEFAULT_COLOR: &str = "rgb(224,237,94)";

static TYPE_COLORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (RUN, DEFAULT_COLOR),
        (TRACK_RUN, "rgb(255,255,153)"),
        (TRAIL_RUN, "rgb(255,153,51)"),
        (RIDE, "rgb(0,237,94)"),
        (INDOOR_RIDE, "rgb(0,237,94)"),
        (VIRTUAL_RIDE, "rgb(0,178,255)"),
        (HIKE, "rgb(151,222,255)"),
        (ROWING, "rgb(73,90,250)"),
        (SWIM, "rgb(255,51,204)"),
        (ROAD_TRIP, "rgb(170,170,170)"),
        (KAYAKING, "rgb(0,153,153)"),
        (SNOWBOARD, "rgb(219,112,147)"),
        (SKI, "rgb(255,255,255)"),
    ])
});

static ZH_TYPE_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (HIKE, "徒步"),
        (RIDE, "骑行"),
        (VIRTUAL_RIDE, "虚拟骑行"),
        (ROWING, "划船"),
        (RUN, "路跑"),
        (TRAIL_RUN, "越野跑"),
        (SWIM, "游泳"),
        (ROAD_TRIP, "公路旅行"),
        (KAYAKING, "皮划艇"),
        (SNOWBOARD, "滑雪"),
        (SKI, "滑板"),
        (TRACK_RUN, "操场跑"),
    ])
});

pub const FULL_MARATHON_TITLE: &str = "Full Marathon";
pub const HALF_MARATHON_TITLE: &str = "Half Marathon";

/// Format an average speed (m/s) as pace per kilometer, `M:SS`.
///
/// Callers treat a speed of zero as "no pace" and do not call this; a
/// non-positive or non-finite speed renders as `"0:00"`.
pub fn format_pace(average_speed: f64) -> String {
    if !(average_speed.is_finite() && average_speed > 0.0) {
        return "0:00".to_string();
    }
    let total_seconds = (1000.0 / average_speed).floor() as i64;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Parse a moving time string into seconds.
///
/// Accepts `HH:MM:SS`, `MM:SS` and the `N days, HH:MM:SS` form; fractional
/// seconds are truncated. Unparsable components count as zero.
pub fn convert_moving_time_to_seconds(text: &str) -> i64 {
    let text = text.trim();
    let (days, clock) = match text.split_once(',') {
        Some((day_part, clock)) => (leading_number(day_part), clock.trim()),
        None => (0, text),
    };

    const UNITS: [i64; 3] = [1, 60, 3600];
    // Absurd components clamp at the i64 range
    let clock_seconds = clock
        .rsplit(':')
        .take(UNITS.len())
        .zip(UNITS)
        .map(|(part, unit)| {
            let value = part.trim().parse::<f64>().unwrap_or(0.0);
            if value.is_finite() {
                (value.trunc() as i64).saturating_mul(unit)
            } else {
                0
            }
        })
        .fold(0i64, i64::saturating_add);

    days.saturating_mul(86_400).saturating_add(clock_seconds)
}

fn leading_number(text: &str) -> i64 {
    text.split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Re-render a moving time string as `H:MM:SS`, or `M:SS` under an hour.
pub fn format_run_time(text: &str) -> String {
    let total = convert_moving_time_to_seconds(text).max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Display color for an activity category.
pub fn color_from_type(activity_type: &str) -> &'static str {
    TYPE_COLORS
        .get(activity_type)
        .copied()
        .unwrap_or(DEFAULT_COLOR)
}

/// Category label in the requested language. Unknown categories pass through.
pub fn type_label(activity_type: &str, locale: Locale) -> String {
    match locale {
        Locale::En => activity_type.to_string(),
        Locale::Zh => ZH_TYPE_LABELS
            .get(activity_type)
            .map(|label| label.to_string())
            .unwrap_or_else(|| activity_type.to_string()),
    }
}

/// Distance in kilometers with two decimals, e.g. `"10.02"`.
pub fn format_distance_km(meters: f64) -> String {
    format!("{:.2}", meters / 1000.0)
}

/// Average heart rate, rounded, e.g. `"152bpm"`.
pub fn format_heart_rate(bpm: f64) -> String {
    format!("{:.0}bpm", bpm)
}

/// Elevation gain in whole meters, e.g. `"120m"`.
pub fn format_elevation(meters: f64) -> String {
    format!("{:.0}m", meters)
}

pub(crate) fn is_running_type(activity_type: &str) -> bool {
    matches!(activity_type, RUN | TRAIL_RUN | TRACK_RUN)
}

/// Hour of day of a `YYYY-MM-DD HH:MM:SS` timestamp.
pub(crate) fn start_hour(start_date_local: &str) -> u32 {
    NaiveDateTime::parse_from_str(start_date_local, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.hour())
        .ok()
        .or_else(|| start_date_local.get(11..13).and_then(|h| h.parse().ok()))
        .unwrap_or(0)
}

/// Label derived from category, distance and start time, e.g. "Morning Run".
///
/// Running categories over 20 km are labelled as half or full marathons.
pub fn title_for_run(activity: &Activity) -> String {
    let running = is_running_type(&activity.activity_type);
    let km = activity.distance / 1000.0;
    if running && km >= 40.0 {
        return FULL_MARATHON_TITLE.to_string();
    }
    if running && km > 20.0 {
        return HALF_MARATHON_TITLE.to_string();
    }

    let period = match start_hour(&activity.start_date_local) {
        0..=10 => "Morning",
        11..=14 => "Midday",
        15..=18 => "Afternoon",
        19..=21 => "Evening",
        _ => "Night",
    };
    let kind = if running { RUN } else { activity.activity_type.as_str() };
    format!("{} {}", period, kind)
}

/// Caption for a single activity shown on the map.
pub fn title_for_show(activity: &Activity) -> String {
    let name = if activity.name.is_empty() {
        activity.activity_type.as_str()
    } else {
        activity.name.as_str()
    };
    let mut title = format!(
        "{} {} {} KM",
        name,
        activity.date(),
        format_distance_km(activity.distance)
    );
    if !activity.has_path() {
        title.push_str(" (No map data for this run)");
    }
    title
}
