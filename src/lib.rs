//! # Activity Atlas
//!
//! The data pipeline behind a personal activity page: a map, a calendar
//! heatmap and a sortable table over runs, rides, hikes and friends.
//!
//! This library provides:
//! - Year/city/type/title filtering with stable, non-mutating sorting
//! - Projection of activities to a GeoJSON-style feature collection
//! - Viewport fitting (center + zoom) for a feature collection
//! - Table column ranking and personal-best detection
//! - An event-driven coordinator keeping table, map and caption in sync
//!
//! ## Features
//!
//! - **`timer`** (default) - tokio-backed progressive reveal ticker
//!
//! ## Quick Start
//!
//! ```rust
//! use activity_atlas::{Activity, Coordinator, Event, PipelineConfig};
//!
//! let activities = vec![
//!     Activity::new(1, "Run", 5000.0, "2024-03-01 07:10:00"),
//!     Activity::new(2, "Ride", 30000.0, "2023-06-11 18:40:00"),
//! ];
//!
//! let mut coordinator = Coordinator::new(activities, PipelineConfig::default());
//! coordinator.handle_event(Event::YearSelected("2023".to_string()));
//!
//! let views = coordinator.derive_views();
//! assert_eq!(views.table.rows.len(), 1);
//! assert_eq!(views.map.caption, "2023 Year Heatmap");
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, PipelineError, Result};

// Configuration
pub mod config;
pub use config::{CityMatch, Locale, PipelineConfig, RevealConfig, ViewportConfig};

// Display formatting for raw activity fields
pub mod format;
pub use format::{
    color_from_type, convert_moving_time_to_seconds, format_distance_km, format_pace,
    format_run_time, title_for_run, title_for_show, type_label,
};

// Filter predicates and the filter/sort engine
pub mod filter;
pub use filter::{filter_and_sort_runs, sort_date_asc, sort_date_desc, FilterKind, TOTAL};

// Feature collections and viewport fitting
pub mod projection;
pub use projection::{
    activities_to_feature_collection, bounds_for_feature_collection, Feature, FeatureCollection,
    FeatureIndex, Viewport,
};

// Table columns, sort toggling and personal bests
pub mod ranking;
pub use ranking::{
    build_table, personal_bests, Column, PersonalBestCallout, PersonalBests, RowHighlight,
    SortDirection, SortState, TableView,
};

// Picker summaries (years, types, cities)
pub mod stats;
pub use stats::StatPanel;

// JSON ingestion
pub mod ingest;
pub use ingest::{decode_path, load_activities_json};

// Progressive reveal schedule and ticker
pub mod reveal;
pub use reveal::{RevealProgress, TimerCommand};
#[cfg(feature = "timer")]
pub use reveal::RevealTimer;

// Selection/interaction coordinator
pub mod coordinator;
pub use coordinator::{
    CalendarDay, CalendarView, Coordinator, Event, InteractionMode, MapView, ViewState, Views,
};

// ============================================================================
// Core Types
// ============================================================================

/// Stable activity identifier, shared by table rows, map features and selection.
pub type ActivityId = i64;

/// Well-known activity categories. The category set is open; anything else
/// passes through unchanged.
pub mod activity_types {
    pub const RUN: &str = "Run";
    pub const TRAIL_RUN: &str = "Trail Run";
    pub const TRACK_RUN: &str = "Track Run";
    pub const RIDE: &str = "Ride";
    pub const INDOOR_RIDE: &str = "Indoor Ride";
    pub const VIRTUAL_RIDE: &str = "VirtualRide";
    pub const HIKE: &str = "Hike";
    pub const ROWING: &str = "Rowing";
    pub const SWIM: &str = "Swim";
    pub const ROAD_TRIP: &str = "RoadTrip";
    pub const KAYAKING: &str = "Kayaking";
    pub const SNOWBOARD: &str = "Snowboard";
    pub const SKI: &str = "Ski";
}

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use activity_atlas::GpsPoint;
/// let point = GpsPoint::new(39.9042, 116.4074); // Beijing
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box over a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut bounds = Self {
            min_lat: f64::MAX,
            max_lat: f64::MIN,
            min_lng: f64::MAX,
            max_lng: f64::MIN,
        };
        for p in points {
            bounds.include(p.longitude, p.latitude);
        }
        Some(bounds)
    }

    /// Grow the bounds to contain a `[lng, lat]` coordinate.
    pub fn include(&mut self, lng: f64, lat: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lng = self.min_lng.min(lng);
        self.max_lng = self.max_lng.max(lng);
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// True when the box has no extent in either direction.
    pub fn is_degenerate(&self) -> bool {
        self.min_lat == self.max_lat && self.min_lng == self.max_lng
    }
}

/// One recorded workout, normalized to a fixed shape.
///
/// Optional numeric fields are explicit `Option`s; an `average_speed` of zero
/// means "no pace available".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    /// Free-text title of the record
    pub name: String,
    /// Category, e.g. "Run" or "Trail Run"
    pub activity_type: String,
    /// Distance in meters
    pub distance: f64,
    /// Moving time as "HH:MM:SS", "MM:SS" or "N days, HH:MM:SS"
    pub moving_time: String,
    /// Average speed in m/s, 0 when unknown
    pub average_speed: f64,
    pub average_heartrate: Option<f64>,
    /// Elevation gain in meters
    pub elevation_gain: Option<f64>,
    /// "YYYY-MM-DD HH:MM:SS" in the athlete's local time
    pub start_date_local: String,
    /// Location string used by the city picker
    pub city: String,
    /// Decoded track, may be empty
    pub path: Vec<GpsPoint>,
}

impl Activity {
    /// Create an activity with the required fields; everything else is empty.
    pub fn new(id: ActivityId, activity_type: &str, distance: f64, start_date_local: &str) -> Self {
        Self {
            id,
            name: String::new(),
            activity_type: activity_type.to_string(),
            distance,
            moving_time: String::new(),
            average_speed: 0.0,
            average_heartrate: None,
            elevation_gain: None,
            start_date_local: start_date_local.to_string(),
            city: String::new(),
            path: Vec::new(),
        }
    }

    /// Calendar date part of `start_date_local` ("YYYY-MM-DD").
    pub fn date(&self) -> &str {
        self.start_date_local
            .get(..10)
            .unwrap_or(&self.start_date_local)
    }

    /// Pace text for the table, `None` when the record carries no speed.
    pub fn pace_text(&self) -> Option<String> {
        if self.average_speed > 0.0 {
            Some(format_pace(self.average_speed))
        } else {
            None
        }
    }

    /// Moving time in seconds.
    pub fn moving_seconds(&self) -> i64 {
        convert_moving_time_to_seconds(&self.moving_time)
    }

    /// True when the record has map data.
    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }
}
