//! Summaries behind the year and location pickers.
//!
//! All functions take the whole catalog (or any subset) and return owned,
//! serializable values. Year keys are the first four characters of
//! `start_date_local`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::filter::{filter_year_runs, TOTAL};
use crate::format::{format_distance_km, format_pace};
use crate::Activity;

/// Which summary the side panel shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatPanel {
    #[default]
    Years,
    Locations,
}

impl StatPanel {
    pub fn toggled(self) -> Self {
        match self {
            StatPanel::Years => StatPanel::Locations,
            StatPanel::Locations => StatPanel::Years,
        }
    }
}

fn year_of(activity: &Activity) -> Option<&str> {
    activity.start_date_local.get(..4)
}

/// Distinct years, newest first.
pub fn years(activities: &[Activity]) -> Vec<String> {
    let set: BTreeSet<&str> = activities.iter().filter_map(year_of).collect();
    set.into_iter().rev().map(str::to_string).collect()
}

/// Most recent year present in the data.
pub fn latest_year(activities: &[Activity]) -> Option<String> {
    activities
        .iter()
        .filter_map(year_of)
        .max()
        .map(str::to_string)
}

/// Totals for one year (or for everything, with [`TOTAL`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: String,
    pub count: usize,
    /// Kilometers, two decimals
    pub distance_km: String,
    pub moving_seconds: i64,
    /// Overall pace, `None` without moving time
    pub average_pace: Option<String>,
    /// Mean over records carrying a heart rate
    pub average_heartrate: Option<f64>,
    /// Longest run of consecutive active days
    pub longest_streak: u32,
    pub type_counts: BTreeMap<String, usize>,
}

pub fn year_summary(activities: &[Activity], year: &str) -> YearSummary {
    let runs: Vec<&Activity> = activities
        .iter()
        .filter(|a| year == TOTAL || filter_year_runs(a, year))
        .collect();

    let distance: f64 = runs.iter().map(|r| r.distance).sum();
    let moving_seconds: i64 = runs.iter().map(|r| r.moving_seconds()).sum();
    let average_pace = (moving_seconds > 0 && distance > 0.0)
        .then(|| format_pace(distance / moving_seconds as f64));

    let heart_rates: Vec<f64> = runs.iter().filter_map(|r| r.average_heartrate).collect();
    let average_heartrate = (!heart_rates.is_empty())
        .then(|| heart_rates.iter().sum::<f64>() / heart_rates.len() as f64);

    let mut type_counts = BTreeMap::new();
    for run in &runs {
        *type_counts.entry(run.activity_type.clone()).or_insert(0) += 1;
    }

    YearSummary {
        year: year.to_string(),
        count: runs.len(),
        distance_km: format_distance_km(distance),
        moving_seconds,
        average_pace,
        average_heartrate,
        longest_streak: longest_streak(&runs),
        type_counts,
    }
}

/// Longest sequence of consecutive calendar days with at least one record.
fn longest_streak(runs: &[&Activity]) -> u32 {
    let days: BTreeSet<NaiveDate> = runs
        .iter()
        .filter_map(|r| NaiveDate::parse_from_str(r.date(), "%Y-%m-%d").ok())
        .collect();

    let mut best = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        current = match previous.and_then(|p| p.succ_opt()) {
            Some(next) if next == day => current + 1,
            _ => 1,
        };
        best = best.max(current);
        previous = Some(day);
    }
    best
}

/// Categories recorded in a year with their counts, most frequent first.
pub fn types_in_year(activities: &[Activity], year: &str) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = year_summary(activities, year)
        .type_counts
        .into_iter()
        .collect();
    // BTreeMap order breaks ties by name
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Distance and count per location string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub location: String,
    pub count: usize,
    pub distance_km: String,
}

/// Locations ordered by total distance, longest first. Records without a
/// location are left out.
pub fn locations(activities: &[Activity]) -> Vec<LocationSummary> {
    let mut totals: HashMap<&str, (usize, f64)> = HashMap::new();
    for activity in activities.iter().filter(|a| !a.city.trim().is_empty()) {
        let entry = totals.entry(activity.city.trim()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += activity.distance;
    }

    let mut ranked: Vec<(&str, usize, f64)> = totals
        .into_iter()
        .map(|(location, (count, distance))| (location, count, distance))
        .collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .map(|(location, count, distance)| LocationSummary {
            location: location.to_string(),
            count,
            distance_km: format_distance_km(distance),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Activity> {
        let mut a = Activity::new(1, "Run", 5000.0, "2024-05-01 07:00:00");
        a.moving_time = "25:00".to_string();
        a.average_heartrate = Some(150.0);
        a.city = "Beijing".to_string();
        let mut b = Activity::new(2, "Run", 5000.0, "2024-05-02 07:00:00");
        b.moving_time = "25:00".to_string();
        b.average_heartrate = Some(160.0);
        b.city = "Beijing".to_string();
        let mut c = Activity::new(3, "Ride", 30000.0, "2024-05-04 07:00:00");
        c.city = "Shanghai".to_string();
        let d = Activity::new(4, "Run", 8000.0, "2022-01-01 07:00:00");
        vec![a, b, c, d]
    }

    #[test]
    fn test_years_newest_first() {
        assert_eq!(years(&sample()), vec!["2024", "2022"]);
        assert_eq!(latest_year(&sample()).as_deref(), Some("2024"));
        assert!(years(&[]).is_empty());
        assert_eq!(latest_year(&[]), None);
    }

    #[test]
    fn test_year_summary() {
        let summary = year_summary(&sample(), "2024");
        assert_eq!(summary.count, 3);
        assert_eq!(summary.distance_km, "40.00");
        assert_eq!(summary.moving_seconds, 3000);
        assert_eq!(summary.average_heartrate, Some(155.0));
        assert_eq!(summary.longest_streak, 2);
        assert_eq!(summary.type_counts.get("Run"), Some(&2));

        let total = year_summary(&sample(), TOTAL);
        assert_eq!(total.count, 4);
    }

    #[test]
    fn test_empty_year() {
        let summary = year_summary(&sample(), "1999");
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average_pace, None);
        assert_eq!(summary.average_heartrate, None);
        assert_eq!(summary.longest_streak, 0);
    }

    #[test]
    fn test_types_in_year() {
        let types = types_in_year(&sample(), "2024");
        assert_eq!(types, vec![("Run".to_string(), 2), ("Ride".to_string(), 1)]);
    }

    #[test]
    fn test_locations() {
        let ranked = locations(&sample());
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].location, "Shanghai");
        assert_eq!(ranked[1].count, 2);
        assert_eq!(ranked[1].distance_km, "10.00");
    }

    #[test]
    fn test_stat_panel_toggle() {
        assert_eq!(StatPanel::default().toggled(), StatPanel::Locations);
        assert_eq!(StatPanel::Locations.toggled(), StatPanel::Years);
    }
}
