//! Table ranking: column comparators, toggle sort state and personal bests.
//!
//! ## Sort toggling
//!
//! Clicking a column that is not active sorts it descending and makes it
//! active. Clicking the active column sorts it ascending and clears the
//! active column, so the next click starts over. The date column runs the
//! other way round: the table already lists newest first, so its first click
//! sorts oldest first and the second restores the default order.
//!
//! ## Personal bests
//!
//! Within the displayed collection, the fastest record (by average speed) of
//! {Run, Track Run} and of {Trail Run} is highlighted. Highlights are derived
//! on every table build, so re-filtering moves them without a reset step.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::activity_types::{RUN, TRACK_RUN, TRAIL_RUN};
use crate::config::{Locale, PipelineConfig};
use crate::format::{
    color_from_type, format_distance_km, format_elevation, format_heart_rate, format_pace,
    format_run_time, title_for_run, type_label,
};
use crate::{Activity, ActivityId};

// ============================================================================
// Columns and sorting
// ============================================================================

/// A sortable table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Type,
    Distance,
    ElevationGain,
    Pace,
    HeartRate,
    Duration,
    Date,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Type,
        Column::Distance,
        Column::ElevationGain,
        Column::Pace,
        Column::HeartRate,
        Column::Duration,
        Column::Date,
    ];

    /// Columns shown in the table, in display order.
    pub fn visible(show_elevation_gain: bool) -> Vec<Column> {
        Self::ALL
            .into_iter()
            .filter(|c| show_elevation_gain || *c != Column::ElevationGain)
            .collect()
    }

    /// Header label.
    pub fn label(self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => match self {
                Column::Type => "Workout Type",
                Column::Distance => "KM",
                Column::ElevationGain => "Elevation Gain",
                Column::Pace => "Pace",
                Column::HeartRate => "BPM",
                Column::Duration => "Time",
                Column::Date => "Date",
            },
            Locale::Zh => match self {
                Column::Type => "运动类型",
                Column::Distance => "公里数",
                Column::ElevationGain => "累计爬升",
                Column::Pace => "平均配速",
                Column::HeartRate => "平均心率",
                Column::Duration => "运动时长",
                Column::Date => "运动日期",
            },
        }
    }

    /// Resolve a header label in any supported language.
    pub fn from_label(label: &str) -> Option<Column> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label(Locale::En) == label || c.label(Locale::Zh) == label)
    }

    /// Ascending order of two activities on this column. Missing heart rate
    /// and elevation compare as zero.
    fn compare_ascending(self, a: &Activity, b: &Activity) -> Ordering {
        match self {
            Column::Type => a.activity_type.cmp(&b.activity_type),
            Column::Distance => a.distance.total_cmp(&b.distance),
            Column::ElevationGain => a
                .elevation_gain
                .unwrap_or(0.0)
                .total_cmp(&b.elevation_gain.unwrap_or(0.0)),
            Column::Pace => a.average_speed.total_cmp(&b.average_speed),
            Column::HeartRate => a
                .average_heartrate
                .unwrap_or(0.0)
                .total_cmp(&b.average_heartrate.unwrap_or(0.0)),
            Column::Duration => a.moving_seconds().cmp(&b.moving_seconds()),
            Column::Date => a.start_date_local.cmp(&b.start_date_local),
        }
    }

    /// Comparator for this column in the given direction.
    pub fn comparator(self, direction: SortDirection) -> impl Fn(&Activity, &Activity) -> Ordering {
        move |a: &Activity, b: &Activity| match direction {
            SortDirection::Ascending => self.compare_ascending(a, b),
            SortDirection::Descending => self.compare_ascending(b, a),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Sort toggle state of the table. Empty means the default date-descending order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    /// Column whose next click sorts ascending
    pub active: Option<Column>,
    /// Column and direction of the last applied sort
    pub applied: Option<(Column, SortDirection)>,
}

impl SortState {
    /// Register a header click and return the direction to sort with.
    pub fn click(&mut self, column: Column) -> SortDirection {
        let was_active = self.active == Some(column);
        let mut direction = if was_active {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        if column == Column::Date {
            direction = direction.reversed();
        }
        self.active = if was_active { None } else { Some(column) };
        self.applied = Some((column, direction));
        direction
    }
}

/// Stable sort of a displayed collection by one column.
pub fn sort_by_column(runs: &mut [&Activity], column: Column, direction: SortDirection) {
    let comparator = column.comparator(direction);
    runs.sort_by(|a, b| comparator(a, b));
}

// ============================================================================
// Personal bests
// ============================================================================

/// Summary of a personal-best record, for the callout above the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalBestCallout {
    pub id: ActivityId,
    pub activity_type: String,
    /// "YYYY-MM-DD"
    pub date: String,
    /// "M:SS" per km
    pub pace: String,
    /// Kilometers, two decimals
    pub distance_km: String,
}

impl PersonalBestCallout {
    fn from_activity(activity: &Activity) -> Self {
        Self {
            id: activity.id,
            activity_type: activity.activity_type.clone(),
            date: activity.date().to_string(),
            pace: format_pace(activity.average_speed),
            distance_km: format_distance_km(activity.distance),
        }
    }
}

/// Fastest record of each category group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalBests {
    /// Fastest of Run / Track Run
    pub best_run: Option<PersonalBestCallout>,
    /// Fastest Trail Run
    pub best_trail: Option<PersonalBestCallout>,
}

/// Row decoration derived from the personal bests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowHighlight {
    #[default]
    None,
    BestRun,
    BestTrackRun,
    BestTrailRun,
}

impl PersonalBests {
    /// Highlight for a row. A record is never highlighted for both groups.
    pub fn highlight(&self, activity: &Activity) -> RowHighlight {
        if let Some(best) = self.best_run.as_ref().filter(|b| b.id == activity.id) {
            if best.activity_type == TRACK_RUN {
                RowHighlight::BestTrackRun
            } else {
                RowHighlight::BestRun
            }
        } else if self.best_trail.as_ref().is_some_and(|b| b.id == activity.id) {
            RowHighlight::BestTrailRun
        } else {
            RowHighlight::None
        }
    }
}

/// Find the fastest record per category group.
///
/// A record must be strictly faster than everything before it, so ties keep
/// the first occurrence and records without speed never qualify.
pub fn personal_bests<'a, I>(runs: I) -> PersonalBests
where
    I: IntoIterator<Item = &'a Activity>,
{
    let mut best_run: Option<&Activity> = None;
    let mut best_trail: Option<&Activity> = None;

    for run in runs {
        let slot = match run.activity_type.as_str() {
            RUN | TRACK_RUN => &mut best_run,
            TRAIL_RUN => &mut best_trail,
            _ => continue,
        };
        let current = slot.map_or(0.0, |b| b.average_speed);
        if run.average_speed > current {
            *slot = Some(run);
        }
    }

    PersonalBests {
        best_run: best_run.map(PersonalBestCallout::from_activity),
        best_trail: best_trail.map(PersonalBestCallout::from_activity),
    }
}

// ============================================================================
// Table view
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnHeader {
    pub column: Column,
    pub label: String,
}

/// One formatted table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub id: ActivityId,
    pub title: String,
    pub type_label: String,
    pub color: String,
    /// e.g. "10.02km"
    pub distance: String,
    /// e.g. "120m", `None` when the column is hidden
    pub elevation_gain: Option<String>,
    /// e.g. "5:33/km"
    pub pace: Option<String>,
    /// e.g. "152bpm"
    pub heart_rate: Option<String>,
    pub run_time: String,
    pub date: String,
    pub highlight: RowHighlight,
    pub selected: bool,
}

/// Everything the table widget renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableView {
    pub columns: Vec<ColumnHeader>,
    pub rows: Vec<TableRow>,
    pub sort: SortState,
    pub selected_index: Option<usize>,
    pub best_run: Option<PersonalBestCallout>,
    pub best_trail: Option<PersonalBestCallout>,
}

/// Build the table for a displayed collection.
pub fn build_table(
    runs: &[&Activity],
    sort: SortState,
    selected_index: Option<usize>,
    config: &PipelineConfig,
) -> TableView {
    let bests = personal_bests(runs.iter().copied());
    let columns = Column::visible(config.show_elevation_gain)
        .into_iter()
        .map(|column| ColumnHeader {
            column,
            label: column.label(config.locale).to_string(),
        })
        .collect();

    let rows = runs
        .iter()
        .enumerate()
        .map(|(index, run)| TableRow {
            id: run.id,
            title: title_for_run(run),
            type_label: type_label(&run.activity_type, config.locale),
            color: color_from_type(&run.activity_type).to_string(),
            distance: format!("{}km", format_distance_km(run.distance)),
            elevation_gain: config
                .show_elevation_gain
                .then(|| format_elevation(run.elevation_gain.unwrap_or(0.0))),
            pace: run.pace_text().map(|pace| format!("{}/km", pace)),
            heart_rate: run.average_heartrate.map(format_heart_rate),
            run_time: format_run_time(&run.moving_time),
            date: run.start_date_local.clone(),
            highlight: bests.highlight(run),
            selected: selected_index == Some(index),
        })
        .collect();

    TableView {
        columns,
        rows,
        sort,
        selected_index,
        best_run: bests.best_run,
        best_trail: bests.best_trail,
    }
}
