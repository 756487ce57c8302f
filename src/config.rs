//! Pipeline configuration.
//!
//! Every knob the pipeline reads lives in [`PipelineConfig`]. Defaults mirror
//! what the activity page ships with; hosts may override them from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::projection::Viewport;

/// How the city picker matches an activity's location string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityMatch {
    /// Match anywhere inside the location string instead of the whole string.
    /// Default: true (location strings are full addresses)
    pub substring: bool,
    /// Compare case-sensitively.
    /// Default: true
    pub case_sensitive: bool,
}

impl Default for CityMatch {
    fn default() -> Self {
        Self {
            substring: true,
            case_sensitive: true,
        }
    }
}

/// Language used for category labels and table headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

/// Map viewport fitting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Map width in pixels used when fitting bounds.
    /// Default: 800
    pub width: f64,
    /// Map height in pixels used when fitting bounds.
    /// Default: 600
    pub height: f64,
    /// Fraction of each dimension kept free on every side.
    /// Default: 0.25 (200px on an 800px map)
    pub padding_fraction: f64,
    /// Lowest zoom a fitted viewport may have.
    /// Default: 0.0
    pub min_zoom: f64,
    /// Zoom ceiling, also used when the bounds have zero area.
    /// Default: 16.0
    pub max_zoom: f64,
    /// Viewport shown when there is nothing to draw.
    /// Default: center [20, 20], zoom 3
    pub default_viewport: Viewport,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            padding_fraction: 0.25,
            min_zoom: 0.0,
            max_zoom: 16.0,
            default_viewport: Viewport::new(20.0, 20.0, 3.0),
        }
    }
}

/// Progressive reveal parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Enable the animated draw-in after a picker change.
    /// Default: true
    pub enabled: bool,
    /// Number of slices the collection is revealed in.
    /// Default: 10
    pub slices: u32,
    /// Milliseconds between two ticks.
    /// Default: 10
    pub interval_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slices: 10,
            interval_ms: 10,
        }
    }
}

/// Configuration for the whole activity pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Year selected at startup and restored by non-year pickers.
    /// Default: the latest year present in the data (resolved by the coordinator)
    pub current_year: Option<String>,
    /// Show the elevation gain column and allow sorting by it.
    /// Default: true
    pub show_elevation_gain: bool,
    /// City picker matching rules.
    pub city_match: CityMatch,
    /// Label language.
    /// Default: English
    pub locale: Locale,
    /// Switch the stat panel to locations when the map zooms out to 3 or below.
    /// Default: false
    pub auto_location_stat: bool,
    pub viewport: ViewportConfig,
    pub reveal: RevealConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            current_year: None,
            show_elevation_gain: true,
            city_match: CityMatch::default(),
            locale: Locale::default(),
            auto_location_stat: false,
            viewport: ViewportConfig::default(),
            reveal: RevealConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<()> {
        let vp = &self.viewport;
        if !(vp.width > 0.0 && vp.height > 0.0) {
            return Err(invalid(format!(
                "viewport size must be positive, got {}x{}",
                vp.width, vp.height
            )));
        }
        if !(0.0..0.5).contains(&vp.padding_fraction) {
            return Err(invalid(format!(
                "padding_fraction must be in [0, 0.5), got {}",
                vp.padding_fraction
            )));
        }
        if !(vp.min_zoom <= vp.max_zoom) {
            return Err(invalid(format!(
                "min_zoom {} exceeds max_zoom {}",
                vp.min_zoom, vp.max_zoom
            )));
        }
        if self.reveal.slices == 0 {
            return Err(invalid("reveal.slices must be at least 1".to_string()));
        }
        if let Some(year) = &self.current_year {
            if year.is_empty() {
                return Err(invalid("current_year must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> PipelineError {
    PipelineError::InvalidConfig { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            PipelineConfig::from_json(r#"{"show_elevation_gain": false, "locale": "Zh"}"#).unwrap();
        assert!(!config.show_elevation_gain);
        assert_eq!(config.locale, Locale::Zh);
        assert_eq!(config.reveal.slices, 10);
        assert_eq!(config.viewport.default_viewport.zoom, 3.0);
    }

    #[test]
    fn test_rejects_bad_padding() {
        let mut config = PipelineConfig::default();
        config.viewport.padding_fraction = 0.5;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_slices() {
        let json = r#"{"reveal": {"enabled": true, "slices": 0, "interval_ms": 10}}"#;
        assert!(PipelineConfig::from_json(json).is_err());
    }
}
