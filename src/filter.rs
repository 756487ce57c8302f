//! Activity filter/sort engine.
//!
//! Predicates have the shape `Fn(&Activity, &str) -> bool`, where the second
//! argument is the key chosen in a picker. [`filter_and_sort_runs`] applies
//! one or two of them (logical AND) and a comparator, returning a new vector.
//! The caller's slice is never reordered.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::{CityMatch, PipelineConfig};
use crate::format::{is_running_type, title_for_run, FULL_MARATHON_TITLE, HALF_MARATHON_TITLE};
use crate::Activity;

/// Key meaning "no filter": the corresponding predicate always matches.
pub const TOTAL: &str = "Total";

/// Which picker produced a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Year,
    City,
    Type,
    Title,
}

impl FilterKind {
    /// Name used in captions, e.g. "2024 Year Heatmap".
    pub fn label(self) -> &'static str {
        match self {
            FilterKind::Year => "Year",
            FilterKind::City => "City",
            FilterKind::Type => "Type",
            FilterKind::Title => "Title",
        }
    }

    /// Build the predicate for this picker under the given configuration.
    pub fn predicate(self, config: &PipelineConfig) -> impl Fn(&Activity, &str) -> bool {
        let city_match = config.city_match;
        move |activity: &Activity, key: &str| match self {
            FilterKind::Year => filter_year_runs(activity, key),
            FilterKind::City => city_matches(&activity.city, key, city_match),
            FilterKind::Type => filter_type_runs(activity, key),
            FilterKind::Title => filter_title_runs(activity, key),
        }
    }
}

/// Year predicate: `start_date_local` starts with the key.
pub fn filter_year_runs(activity: &Activity, year: &str) -> bool {
    activity.start_date_local.starts_with(year)
}

/// City predicate with the default rules (case-sensitive substring).
pub fn filter_city_runs(activity: &Activity, city: &str) -> bool {
    city_matches(&activity.city, city, CityMatch::default())
}

fn city_matches(location: &str, city: &str, rules: CityMatch) -> bool {
    match (rules.substring, rules.case_sensitive) {
        (true, true) => location.contains(city),
        (false, true) => location == city,
        (true, false) => location.to_lowercase().contains(&city.to_lowercase()),
        (false, false) => location.to_lowercase() == city.to_lowercase(),
    }
}

/// Type predicate. Besides exact categories, accepts the virtual keys
/// "Full Marathon" and "Half Marathon" over running categories.
pub fn filter_type_runs(activity: &Activity, activity_type: &str) -> bool {
    let km = activity.distance / 1000.0;
    match activity_type {
        FULL_MARATHON_TITLE => is_marathon_candidate(activity) && km >= 40.0,
        HALF_MARATHON_TITLE => is_marathon_candidate(activity) && km > 20.0 && km < 40.0,
        _ => activity.activity_type == activity_type,
    }
}

fn is_marathon_candidate(activity: &Activity) -> bool {
    is_running_type(&activity.activity_type)
}

/// Title predicate: the derived run title or the record's own name.
pub fn filter_title_runs(activity: &Activity, title: &str) -> bool {
    activity.name == title || title_for_run(activity) == title
}

/// Newest first.
pub fn sort_date_desc(a: &Activity, b: &Activity) -> Ordering {
    b.start_date_local.cmp(&a.start_date_local)
}

/// Oldest first.
pub fn sort_date_asc(a: &Activity, b: &Activity) -> Ordering {
    a.start_date_local.cmp(&b.start_date_local)
}

fn matches_key<P>(predicate: &P, activity: &Activity, key: &str) -> bool
where
    P: Fn(&Activity, &str) -> bool,
{
    key == TOTAL || predicate(activity, key)
}

/// Filter a collection by one or two predicates and sort the result.
///
/// # Arguments
/// * `activities` - Source collection, left untouched
/// * `key` / `predicate` - Primary filter; `TOTAL` disables it
/// * `comparator` - Ordering of the result; ties keep input order
/// * `secondary` - Optional second filter ANDed with the first
///
/// # Returns
/// A new vector, empty when nothing matches.
pub fn filter_and_sort_runs<P, C>(
    activities: &[Activity],
    key: &str,
    predicate: P,
    comparator: C,
    secondary: Option<(&str, &dyn Fn(&Activity, &str) -> bool)>,
) -> Vec<Activity>
where
    P: Fn(&Activity, &str) -> bool,
    C: Fn(&Activity, &Activity) -> Ordering,
{
    let mut runs: Vec<Activity> = activities
        .iter()
        .filter(|run| matches_key(&predicate, run, key))
        .filter(|run| match secondary {
            Some((key2, predicate2)) => matches_key(&predicate2, run, key2),
            None => true,
        })
        .cloned()
        .collect();

    // slice::sort_by is stable
    runs.sort_by(|a, b| comparator(a, b));

    log::debug!(
        "[Filter] {} of {} activities match '{}'{}",
        runs.len(),
        activities.len(),
        key,
        secondary
            .map(|(key2, _)| format!(" and '{}'", key2))
            .unwrap_or_default()
    );
    runs
}
