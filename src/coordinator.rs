//! Selection/interaction coordinator.
//!
//! Owns the catalog and the [`ViewState`] shared by the table, the map and
//! the calendar. Every input from those widgets arrives as an [`Event`];
//! [`Coordinator::handle_event`] applies it synchronously and tells the host
//! what to do with the reveal ticker. [`Coordinator::derive_views`] then
//! projects the state into what each widget renders.
//!
//! ## Modes
//!
//! - `Idle`: the map shows the displayed collection, no row selected
//! - `RowSelected`: the map shows the one selected row
//! - `MapFiltered`: the map shows a picker result or a located subset
//!
//! ## Example
//!
//! ```rust
//! use activity_atlas::{Activity, Coordinator, Event, InteractionMode, PipelineConfig};
//!
//! let mut run = Activity::new(1, "Run", 5000.0, "2024-03-01 07:10:00");
//! run.city = "Beijing".to_string();
//! let ride = Activity::new(2, "Ride", 30000.0, "2024-02-11 18:40:00");
//!
//! let mut coordinator = Coordinator::new(vec![run, ride], PipelineConfig::default());
//! coordinator.handle_event(Event::CitySelected("Beijing".to_string()));
//! assert_eq!(coordinator.state().displayed, vec![1]);
//! assert_eq!(coordinator.state().mode, InteractionMode::MapFiltered);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::filter::{
    filter_and_sort_runs, filter_type_runs, filter_year_runs, sort_date_desc, FilterKind, TOTAL,
};
use crate::format::{format_distance_km, title_for_show};
use crate::projection::{
    activities_to_feature_collection, bounds_for_feature_collection, FeatureCollection,
    FeatureIndex, Viewport,
};
use crate::ranking::{build_table, sort_by_column, Column, SortState, TableView};
use crate::reveal::{RevealProgress, TimerCommand};
use crate::stats::{latest_year, StatPanel};
use crate::{Activity, ActivityId};

/// Click tolerance for raw map points, in screen pixels.
const CLICK_RADIUS_PX: f64 = 6.0;

/// Zoom at or below which the location summary is the natural panel.
const LOCATION_STAT_ZOOM: f64 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionMode {
    #[default]
    Idle,
    RowSelected,
    MapFiltered,
}

/// Input from the table, map, calendar and pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    YearSelected(String),
    CitySelected(String),
    TypeSelected(String),
    TitleSelected(String),
    /// Type picker scoped to a year (`TOTAL` for all years)
    TypeInYearSelected { year: String, activity_type: String },
    /// Table row by display index
    RowClicked(usize),
    /// Table header by label, English or Chinese
    ColumnHeaderClicked(String),
    /// Map features resolved by the widget
    FeaturesClicked(Vec<ActivityId>),
    /// Raw map click, resolved against the drawn features
    MapPointClicked { longitude: f64, latitude: f64 },
    /// Calendar day, "YYYY-MM-DD" with or without zero padding
    DateClicked(String),
    /// Calendar route thumbnail; id 0 means "no route"
    PathClicked(ActivityId),
    ViewportChanged(Viewport),
    StatPanelToggled,
    RevealTick { generation: u64 },
}

/// Everything the views are derived from. Replaced wholesale on every
/// filter change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub year: String,
    /// Table contents, in display order
    pub displayed: Vec<ActivityId>,
    /// Map contents before any reveal is applied
    pub map_ids: Vec<ActivityId>,
    pub reveal: Option<RevealProgress>,
    pub selected_index: Option<usize>,
    pub title: String,
    pub sort: SortState,
    pub viewport: Viewport,
    pub mode: InteractionMode,
    pub stat_panel: StatPanel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub features: FeatureCollection,
    pub viewport: Viewport,
    pub caption: String,
}

/// One calendar cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: String,
    pub ids: Vec<ActivityId>,
    pub distance_km: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarView {
    pub year: String,
    /// Active days in the year, oldest first
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Views {
    pub table: TableView,
    pub map: MapView,
    pub calendar: CalendarView,
    pub stat_panel: StatPanel,
}

/// Event-driven owner of the catalog and the shared view state.
pub struct Coordinator {
    activities: Vec<Activity>,
    positions: HashMap<ActivityId, usize>,
    config: PipelineConfig,
    current_year: String,
    generation: u64,
    state: ViewState,
}

impl Coordinator {
    /// Start on the current year, newest first, with the whole year drawn.
    ///
    /// The current year comes from the configuration, else the latest year
    /// in the data, else the calendar. A configuration that fails
    /// [`PipelineConfig::validate`] is replaced by the defaults.
    pub fn new(activities: Vec<Activity>, config: PipelineConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("[Coordinator] {}, using default configuration", e);
                PipelineConfig::default()
            }
        };

        let mut positions = HashMap::with_capacity(activities.len());
        for (index, activity) in activities.iter().enumerate() {
            positions.entry(activity.id).or_insert(index);
        }

        let current_year = config
            .current_year
            .clone()
            .or_else(|| latest_year(&activities))
            .unwrap_or_else(|| chrono::Local::now().year().to_string());

        let state = ViewState {
            year: current_year.clone(),
            displayed: Vec::new(),
            map_ids: Vec::new(),
            reveal: None,
            selected_index: None,
            title: format!("{} {} Heatmap", current_year, FilterKind::Year.label()),
            sort: SortState::default(),
            viewport: config.viewport.default_viewport,
            mode: InteractionMode::Idle,
            stat_panel: StatPanel::default(),
        };

        let mut coordinator = Self {
            activities,
            positions,
            config,
            current_year,
            generation: 0,
            state,
        };
        let displayed = coordinator.select(&coordinator.current_year.clone(), FilterKind::Year, None);
        coordinator.state.map_ids = displayed.clone();
        coordinator.state.displayed = displayed;
        coordinator.refit();

        info!(
            "[Coordinator] Loaded {} activities, current year {} ({} shown)",
            coordinator.activities.len(),
            coordinator.current_year,
            coordinator.state.displayed.len()
        );
        coordinator
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn current_year(&self) -> &str {
        &self.current_year
    }

    pub fn activity(&self, id: ActivityId) -> Option<&Activity> {
        self.positions.get(&id).map(|&i| &self.activities[i])
    }

    /// Table contents, in display order.
    pub fn displayed(&self) -> Vec<&Activity> {
        self.resolve(&self.state.displayed)
    }

    fn resolve(&self, ids: &[ActivityId]) -> Vec<&Activity> {
        ids.iter().filter_map(|&id| self.activity(id)).collect()
    }

    /// Ids currently drawn: the map contents cut to the reveal prefix.
    fn drawn_ids(&self) -> &[ActivityId] {
        match &self.state.reveal {
            Some(progress) => {
                let visible = progress.visible().min(self.state.map_ids.len());
                &self.state.map_ids[..visible]
            }
            None => &self.state.map_ids,
        }
    }

    fn drawn_features(&self) -> FeatureCollection {
        activities_to_feature_collection(self.resolve(self.drawn_ids()))
    }

    /// Apply one event. Never fails; events that match nothing leave the
    /// state untouched.
    pub fn handle_event(&mut self, event: Event) -> TimerCommand {
        debug!("[Coordinator] {:?} in {:?}", event, self.state.mode);
        match event {
            Event::YearSelected(year) => self.change_by_item(year, FilterKind::Year),
            Event::CitySelected(city) => self.change_by_item(city, FilterKind::City),
            Event::TypeSelected(kind) => self.change_by_item(kind, FilterKind::Type),
            Event::TitleSelected(title) => self.change_by_item(title, FilterKind::Title),
            Event::TypeInYearSelected {
                year,
                activity_type,
            } => self.change_type_in_year(year, activity_type),
            Event::RowClicked(index) => self.click_row(index),
            Event::ColumnHeaderClicked(label) => self.click_header(&label),
            Event::FeaturesClicked(ids) => self.locate(&ids),
            Event::MapPointClicked {
                longitude,
                latitude,
            } => self.click_map_point(longitude, latitude),
            Event::DateClicked(date) => self.click_date(&date),
            Event::PathClicked(0) => TimerCommand::None,
            Event::PathClicked(id) => self.locate(&[id]),
            Event::ViewportChanged(viewport) => {
                self.set_viewport(viewport);
                TimerCommand::None
            }
            Event::StatPanelToggled => {
                self.toggle_stat_panel();
                TimerCommand::None
            }
            Event::RevealTick { generation } => self.reveal_tick(generation),
        }
    }

    // ========================================================================
    // Pickers
    // ========================================================================

    /// Filter the whole catalog, newest first.
    fn select(
        &self,
        key: &str,
        kind: FilterKind,
        secondary: Option<(&str, &dyn Fn(&Activity, &str) -> bool)>,
    ) -> Vec<ActivityId> {
        let predicate = kind.predicate(&self.config);
        filter_and_sort_runs(&self.activities, key, predicate, sort_date_desc, secondary)
            .into_iter()
            .map(|a| a.id)
            .collect()
    }

    fn change_by_item(&mut self, item: String, kind: FilterKind) -> TimerCommand {
        let displayed = self.select(&item, kind, None);
        let year = if kind == FilterKind::Year {
            item.clone()
        } else {
            self.current_year.clone()
        };
        let title = format!("{} {} Heatmap", item, kind.label());
        self.replace_collection(year, displayed, title)
    }

    fn change_type_in_year(&mut self, year: String, activity_type: String) -> TimerCommand {
        let (state_year, displayed) = if year != TOTAL {
            let by_type: &dyn Fn(&Activity, &str) -> bool = &filter_type_runs;
            let displayed = self.select(
                &year,
                FilterKind::Year,
                Some((activity_type.as_str(), by_type)),
            );
            (year.clone(), displayed)
        } else {
            (
                self.current_year.clone(),
                self.select(&activity_type, FilterKind::Type, None),
            )
        };
        let title = format!("{} {} Type Heatmap", year, activity_type);
        self.replace_collection(state_year, displayed, title)
    }

    /// Swap in a new displayed collection and start revealing it.
    fn replace_collection(
        &mut self,
        year: String,
        displayed: Vec<ActivityId>,
        title: String,
    ) -> TimerCommand {
        let had_reveal = self.state.reveal.is_some();
        self.generation += 1;

        let reveal = Some(RevealProgress::new(
            self.generation,
            displayed.len(),
            self.config.reveal.slices as usize,
        ))
        .filter(|p| self.config.reveal.enabled && !p.is_complete());

        info!(
            "[Coordinator] {} -> {} activities (generation {})",
            title,
            displayed.len(),
            self.generation
        );

        self.state = ViewState {
            year,
            map_ids: displayed.clone(),
            displayed,
            reveal,
            selected_index: None,
            title,
            sort: SortState::default(),
            viewport: self.state.viewport,
            mode: InteractionMode::MapFiltered,
            stat_panel: self.state.stat_panel,
        };
        self.refit();

        match reveal {
            Some(_) => TimerCommand::Start {
                generation: self.generation,
                interval: Duration::from_millis(self.config.reveal.interval_ms),
            },
            None if had_reveal => TimerCommand::Cancel,
            None => TimerCommand::None,
        }
    }

    // ========================================================================
    // Table
    // ========================================================================

    fn click_row(&mut self, index: usize) -> TimerCommand {
        let Some(&id) = self.state.displayed.get(index) else {
            return TimerCommand::None;
        };

        if self.state.selected_index == Some(index) {
            // Deselect: back to the whole displayed collection
            let newest = self
                .displayed()
                .into_iter()
                .min_by(|a, b| sort_date_desc(a, b))
                .map(title_for_show);
            let command = self.cancel_reveal();
            self.state.selected_index = None;
            self.state.map_ids = self.state.displayed.clone();
            self.state.mode = InteractionMode::Idle;
            if let Some(title) = newest {
                self.state.title = title;
            }
            self.refit();
            return command;
        }

        let title = self.activity(id).map(title_for_show);
        let command = self.cancel_reveal();
        if let Some(title) = title {
            self.state.title = title;
        }
        self.state.selected_index = Some(index);
        self.state.map_ids = vec![id];
        self.state.mode = InteractionMode::RowSelected;
        self.refit();
        command
    }

    fn click_header(&mut self, label: &str) -> TimerCommand {
        let Some(column) = Column::from_label(label) else {
            debug!("[Coordinator] Unknown column '{}'", label);
            return TimerCommand::None;
        };
        if column == Column::ElevationGain && !self.config.show_elevation_gain {
            return TimerCommand::None;
        }

        let direction = self.state.sort.click(column);
        let mut rows = self.displayed();
        sort_by_column(&mut rows, column, direction);
        let displayed: Vec<ActivityId> = rows.into_iter().map(|a| a.id).collect();

        let command = self.cancel_reveal();
        self.state.map_ids = displayed.clone();
        self.state.displayed = displayed;
        self.state.selected_index = None;
        if self.state.mode == InteractionMode::RowSelected {
            self.state.mode = InteractionMode::Idle;
        }
        self.refit();
        command
    }

    // ========================================================================
    // Map and calendar
    // ========================================================================

    /// Narrow the map to the displayed activities with the given ids.
    /// Nothing happens when none of them is displayed.
    fn locate(&mut self, ids: &[ActivityId]) -> TimerCommand {
        let wanted: HashSet<ActivityId> = ids.iter().copied().collect();
        let selected: Vec<ActivityId> = self
            .state
            .displayed
            .iter()
            .copied()
            .filter(|id| wanted.contains(id))
            .collect();
        if selected.is_empty() {
            debug!("[Coordinator] Locate matched nothing, ignoring");
            return TimerCommand::None;
        }

        let newest = self
            .resolve(&selected)
            .into_iter()
            .min_by(|a, b| sort_date_desc(a, b))
            .map(title_for_show);

        let command = self.cancel_reveal();
        if let Some(title) = newest {
            self.state.title = title;
        }
        self.state.map_ids = selected;
        self.state.selected_index = None;
        self.state.mode = InteractionMode::MapFiltered;
        self.refit();
        command
    }

    fn click_map_point(&mut self, longitude: f64, latitude: f64) -> TimerCommand {
        let index = FeatureIndex::build(&self.drawn_features());
        // Degrees per screen pixel at the current zoom
        let degrees_per_px = 360.0 / (512.0 * 2f64.powf(self.state.viewport.zoom));
        let ids = index.ids_near(longitude, latitude, CLICK_RADIUS_PX * degrees_per_px);
        self.locate(&ids)
    }

    fn click_date(&mut self, text: &str) -> TimerCommand {
        let Ok(date) = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") else {
            debug!("[Coordinator] Unparsable calendar date '{}'", text);
            return TimerCommand::None;
        };
        let date = date.format("%Y-%m-%d").to_string();
        let ids: Vec<ActivityId> = self
            .displayed()
            .into_iter()
            .filter(|a| a.date() == date)
            .map(|a| a.id)
            .collect();
        self.locate(&ids)
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = viewport;
        if self.config.auto_location_stat {
            self.state.stat_panel = if viewport.zoom <= LOCATION_STAT_ZOOM {
                StatPanel::Locations
            } else {
                StatPanel::Years
            };
        }
    }

    fn toggle_stat_panel(&mut self) {
        self.state.stat_panel = self.state.stat_panel.toggled();
        match self.state.stat_panel {
            StatPanel::Locations => {
                let mut viewport = self.state.viewport;
                viewport.zoom = LOCATION_STAT_ZOOM;
                self.set_viewport(viewport);
            }
            StatPanel::Years => self.refit(),
        }
    }

    // ========================================================================
    // Reveal
    // ========================================================================

    fn reveal_tick(&mut self, generation: u64) -> TimerCommand {
        let Some(progress) = self.state.reveal.as_mut() else {
            return TimerCommand::None;
        };
        if progress.generation != generation {
            debug!(
                "[Coordinator] Stale reveal tick {} (current {})",
                generation, progress.generation
            );
            return TimerCommand::None;
        }

        let complete = progress.advance();
        if complete {
            self.state.reveal = None;
        }
        self.refit();
        if complete {
            TimerCommand::Cancel
        } else {
            TimerCommand::None
        }
    }

    fn cancel_reveal(&mut self) -> TimerCommand {
        match self.state.reveal.take() {
            Some(_) => TimerCommand::Cancel,
            None => TimerCommand::None,
        }
    }

    /// Fit the viewport to whatever is drawn now.
    fn refit(&mut self) {
        let viewport = bounds_for_feature_collection(&self.drawn_features(), &self.config.viewport);
        self.set_viewport(viewport);
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Project the state into table, map and calendar views.
    pub fn derive_views(&self) -> Views {
        let rows = self.displayed();
        let table = build_table(&rows, self.state.sort, self.state.selected_index, &self.config);

        let map = MapView {
            features: self.drawn_features(),
            viewport: self.state.viewport,
            caption: self.state.title.clone(),
        };

        Views {
            table,
            map,
            calendar: self.calendar(),
            stat_panel: self.state.stat_panel,
        }
    }

    fn calendar(&self) -> CalendarView {
        let mut days: BTreeMap<&str, (Vec<ActivityId>, f64)> = BTreeMap::new();
        for activity in self
            .activities
            .iter()
            .filter(|a| self.state.year == TOTAL || filter_year_runs(a, &self.state.year))
        {
            let day = days.entry(activity.date()).or_default();
            day.0.push(activity.id);
            day.1 += activity.distance;
        }

        CalendarView {
            year: self.state.year.clone(),
            days: days
                .into_iter()
                .map(|(date, (ids, distance))| CalendarDay {
                    date: date.to_string(),
                    ids,
                    distance_km: format_distance_km(distance),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpsPoint;

    fn track(lat: f64, lng: f64) -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(lat, lng),
            GpsPoint::new(lat + 0.01, lng + 0.01),
        ]
    }

    fn catalog() -> Vec<Activity> {
        let mut a = Activity::new(1, "Run", 5000.0, "2024-05-02 07:00:00");
        a.city = "Beijing".to_string();
        a.average_speed = 3.0;
        a.path = track(39.9, 116.4);
        let mut b = Activity::new(2, "Ride", 40000.0, "2024-04-01 18:00:00");
        b.city = "Shanghai".to_string();
        b.path = track(31.2, 121.4);
        let mut c = Activity::new(3, "Run", 10000.0, "2024-03-05 06:30:00");
        c.city = "Beijing".to_string();
        c.average_speed = 3.5;
        c.path = track(39.95, 116.3);
        let mut d = Activity::new(4, "Trail Run", 21500.0, "2023-06-01 05:00:00");
        d.average_speed = 2.5;
        d.path = track(40.2, 116.1);
        vec![a, b, c, d]
    }

    fn no_reveal() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.reveal.enabled = false;
        config
    }

    #[test]
    fn test_initial_state() {
        let coordinator = Coordinator::new(catalog(), PipelineConfig::default());
        let state = coordinator.state();
        assert_eq!(coordinator.current_year(), "2024");
        assert_eq!(state.displayed, vec![1, 2, 3]);
        assert_eq!(state.map_ids, state.displayed);
        assert_eq!(state.mode, InteractionMode::Idle);
        assert_eq!(state.selected_index, None);
        assert!(state.reveal.is_none());
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let mut config = no_reveal();
        config.viewport.padding_fraction = 0.6;
        let coordinator = Coordinator::new(catalog(), config);
        assert_eq!(coordinator.config(), &PipelineConfig::default());
        let viewport = coordinator.state().viewport;
        assert!(viewport.zoom.is_finite());
        assert!(viewport.longitude.is_finite() && viewport.latitude.is_finite());
    }

    #[test]
    fn test_configured_current_year() {
        let mut config = no_reveal();
        config.current_year = Some("2023".to_string());
        let coordinator = Coordinator::new(catalog(), config);
        assert_eq!(coordinator.state().displayed, vec![4]);
    }

    #[test]
    fn test_city_picker_resets_year() {
        let mut coordinator = Coordinator::new(catalog(), no_reveal());
        coordinator.handle_event(Event::YearSelected("2023".to_string()));
        assert_eq!(coordinator.state().year, "2023");
        coordinator.handle_event(Event::CitySelected("Beijing".to_string()));
        let state = coordinator.state();
        assert_eq!(state.year, "2024");
        assert_eq!(state.displayed, vec![1, 3]);
        assert_eq!(state.title, "Beijing City Heatmap");
        assert_eq!(state.mode, InteractionMode::MapFiltered);
    }

    #[test]
    fn test_type_in_year() {
        let mut coordinator = Coordinator::new(catalog(), no_reveal());
        coordinator.handle_event(Event::TypeInYearSelected {
            year: "2024".to_string(),
            activity_type: "Run".to_string(),
        });
        assert_eq!(coordinator.state().displayed, vec![1, 3]);
        assert_eq!(coordinator.state().title, "2024 Run Type Heatmap");

        coordinator.handle_event(Event::TypeInYearSelected {
            year: TOTAL.to_string(),
            activity_type: "Trail Run".to_string(),
        });
        assert_eq!(coordinator.state().displayed, vec![4]);
        assert_eq!(coordinator.state().year, "2024");
    }

    #[test]
    fn test_row_click_toggles_selection() {
        let mut coordinator = Coordinator::new(catalog(), no_reveal());
        coordinator.handle_event(Event::RowClicked(1));
        let state = coordinator.state();
        assert_eq!(state.mode, InteractionMode::RowSelected);
        assert_eq!(state.selected_index, Some(1));
        assert_eq!(state.map_ids, vec![2]);
        assert!(state.title.starts_with("Ride 2024-04-01 40.00 KM"));

        coordinator.handle_event(Event::RowClicked(1));
        let state = coordinator.state();
        assert_eq!(state.mode, InteractionMode::Idle);
        assert_eq!(state.selected_index, None);
        assert_eq!(state.map_ids, vec![1, 2, 3]);
        assert!(state.title.starts_with("Run 2024-05-02"));
    }

    #[test]
    fn test_row_click_out_of_range_is_ignored() {
        let mut coordinator = Coordinator::new(catalog(), no_reveal());
        let before = coordinator.state().clone();
        assert_eq!(coordinator.handle_event(Event::RowClicked(9)), TimerCommand::None);
        assert_eq!(coordinator.state(), &before);
    }

    #[test]
    fn test_header_click_resorts_and_clears_selection() {
        let mut coordinator = Coordinator::new(catalog(), no_reveal());
        coordinator.handle_event(Event::RowClicked(0));
        coordinator.handle_event(Event::ColumnHeaderClicked("KM".to_string()));
        let state = coordinator.state();
        assert_eq!(state.displayed, vec![2, 3, 1]);
        assert_eq!(state.map_ids, state.displayed);
        assert_eq!(state.selected_index, None);
        assert_eq!(state.mode, InteractionMode::Idle);

        coordinator.handle_event(Event::ColumnHeaderClicked("公里数".to_string()));
        assert_eq!(coordinator.state().displayed, vec![1, 3, 2]);
    }

    #[test]
    fn test_hidden_elevation_header_is_ignored() {
        let mut config = no_reveal();
        config.show_elevation_gain = false;
        let mut coordinator = Coordinator::new(catalog(), config);
        let before = coordinator.state().clone();
        coordinator.handle_event(Event::ColumnHeaderClicked("Elevation Gain".to_string()));
        assert_eq!(coordinator.state(), &before);
    }

    #[test]
    fn test_locate_narrows_to_displayed() {
        let mut coordinator = Coordinator::new(catalog(), no_reveal());
        coordinator.handle_event(Event::FeaturesClicked(vec![3, 4]));
        let state = coordinator.state();
        // 4 is from 2023 and not displayed
        assert_eq!(state.map_ids, vec![3]);
        assert_eq!(state.mode, InteractionMode::MapFiltered);
        assert_eq!(state.displayed, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_locate_is_noop() {
        let mut coordinator = Coordinator::new(catalog(), no_reveal());
        coordinator.handle_event(Event::RowClicked(0));
        let before = coordinator.state().clone();
        coordinator.handle_event(Event::FeaturesClicked(vec![]));
        coordinator.handle_event(Event::FeaturesClicked(vec![99]));
        coordinator.handle_event(Event::PathClicked(0));
        coordinator.handle_event(Event::DateClicked("1999-01-01".to_string()));
        coordinator.handle_event(Event::DateClicked("not a date".to_string()));
        assert_eq!(coordinator.state(), &before);
    }

    #[test]
    fn test_date_click_normalizes() {
        let mut coordinator = Coordinator::new(catalog(), no_reveal());
        coordinator.handle_event(Event::DateClicked("2024-3-5".to_string()));
        assert_eq!(coordinator.state().map_ids, vec![3]);
        coordinator.handle_event(Event::PathClicked(1));
        assert_eq!(coordinator.state().map_ids, vec![1]);
    }

    #[test]
    fn test_map_point_click() {
        let mut coordinator = Coordinator::new(catalog(), no_reveal());
        coordinator.handle_event(Event::MapPointClicked {
            longitude: 121.4,
            latitude: 31.2,
        });
        assert_eq!(coordinator.state().map_ids, vec![2]);
    }

    #[test]
    fn test_reveal_progress_and_stale_ticks() {
        let mut config = PipelineConfig::default();
        config.reveal.slices = 10;
        let mut coordinator = Coordinator::new(catalog(), config);
        let command = coordinator.handle_event(Event::YearSelected("2024".to_string()));
        let TimerCommand::Start { generation, .. } = command else {
            panic!("expected a reveal to start, got {:?}", command);
        };
        assert_eq!(coordinator.derive_views().map.features.len(), 1);

        // Older generation is ignored
        assert_eq!(
            coordinator.handle_event(Event::RevealTick { generation: generation - 1 }),
            TimerCommand::None
        );
        assert_eq!(coordinator.derive_views().map.features.len(), 1);

        assert_eq!(
            coordinator.handle_event(Event::RevealTick { generation }),
            TimerCommand::None
        );
        assert_eq!(coordinator.derive_views().map.features.len(), 2);
        assert_eq!(
            coordinator.handle_event(Event::RevealTick { generation }),
            TimerCommand::Cancel
        );
        assert!(coordinator.state().reveal.is_none());
        assert_eq!(coordinator.derive_views().map.features.len(), 3);
    }

    #[test]
    fn test_other_transitions_cancel_reveal() {
        let mut coordinator = Coordinator::new(catalog(), PipelineConfig::default());
        coordinator.handle_event(Event::YearSelected("2024".to_string()));
        assert!(coordinator.state().reveal.is_some());
        assert_eq!(coordinator.handle_event(Event::RowClicked(0)), TimerCommand::Cancel);
        assert!(coordinator.state().reveal.is_none());
    }

    #[test]
    fn test_reveal_keeps_final_viewport() {
        let mut revealing = Coordinator::new(catalog(), PipelineConfig::default());
        let mut instant = Coordinator::new(catalog(), no_reveal());
        let command = revealing.handle_event(Event::YearSelected("2024".to_string()));
        instant.handle_event(Event::YearSelected("2024".to_string()));
        if let TimerCommand::Start { generation, .. } = command {
            while revealing.state().reveal.is_some() {
                revealing.handle_event(Event::RevealTick { generation });
            }
        }
        assert_eq!(revealing.state().viewport, instant.state().viewport);
        assert_eq!(revealing.state().displayed, instant.state().displayed);
    }

    #[test]
    fn test_stat_panel() {
        let mut config = no_reveal();
        config.auto_location_stat = true;
        let mut coordinator = Coordinator::new(catalog(), config);
        coordinator.handle_event(Event::ViewportChanged(Viewport::new(100.0, 30.0, 2.5)));
        assert_eq!(coordinator.state().stat_panel, StatPanel::Locations);
        coordinator.handle_event(Event::ViewportChanged(Viewport::new(100.0, 30.0, 9.0)));
        assert_eq!(coordinator.state().stat_panel, StatPanel::Years);

        coordinator.handle_event(Event::StatPanelToggled);
        assert_eq!(coordinator.state().stat_panel, StatPanel::Locations);
        assert_eq!(coordinator.state().viewport.zoom, 3.0);
    }

    #[test]
    fn test_derive_views() {
        let coordinator = Coordinator::new(catalog(), no_reveal());
        let views = coordinator.derive_views();
        assert_eq!(views.table.rows.len(), 3);
        assert_eq!(views.map.features.len(), 3);
        assert_eq!(views.calendar.year, "2024");
        assert_eq!(views.calendar.days.len(), 3);
        assert_eq!(views.calendar.days[0].date, "2024-03-05");
        assert_eq!(views.table.best_run.as_ref().map(|b| b.id), Some(3));
    }

    #[test]
    fn test_state_serializes() {
        let coordinator = Coordinator::new(catalog(), no_reveal());
        let json = serde_json::to_string(coordinator.state()).unwrap();
        let back: ViewState = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, coordinator.state());
    }
}
