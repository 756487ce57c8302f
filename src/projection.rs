//! Geo projection: activities to map features, features to a viewport.
//!
//! The feature collection serializes as GeoJSON (`FeatureCollection` of
//! `LineString` features with `[lng, lat]` coordinates). Each feature carries
//! the activity id and date so map clicks can be correlated back to table
//! rows.
//!
//! Viewport fitting uses the Web Mercator projection on 512px tiles, the same
//! convention as the map widget consuming it.

use std::f64::consts::PI;

use geo::{BoundingRect, Coord, LineString};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::config::ViewportConfig;
use crate::format::color_from_type;
use crate::{Activity, ActivityId, Bounds};

const TILE_SIZE: f64 = 512.0;
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

// ============================================================================
// Types
// ============================================================================

/// Map center and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(longitude: f64, latitude: f64, zoom: f64) -> Self {
        Self {
            longitude,
            latitude,
            zoom,
        }
    }

    /// Center as `[lng, lat]`.
    pub fn center(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Correlation metadata attached to every feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub id: ActivityId,
    /// "YYYY-MM-DD"
    pub date: String,
    pub color: String,
    pub name: String,
}

/// GeoJSON LineString geometry, coordinates as `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "LineString")]
pub struct LineGeometry {
    pub coordinates: Vec<[f64; 2]>,
}

impl LineGeometry {
    fn to_line_string(&self) -> LineString<f64> {
        LineString::new(
            self.coordinates
                .iter()
                .map(|c| Coord { x: c[0], y: c[1] })
                .collect(),
        )
    }
}

/// One drawable activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub properties: FeatureProperties,
    pub geometry: LineGeometry,
}

/// Everything the map draws.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Activity ids in drawing order.
    pub fn ids(&self) -> Vec<ActivityId> {
        self.features.iter().map(|f| f.properties.id).collect()
    }

    /// GeoJSON text for the map widget.
    pub fn to_geojson_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"FeatureCollection","features":[]}"#.to_string()
        })
    }

    /// Smallest box containing every coordinate of every feature.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut bounds: Option<Bounds> = None;
        for feature in &self.features {
            let Some(rect) = feature.geometry.to_line_string().bounding_rect() else {
                continue;
            };
            let (min, max) = (rect.min(), rect.max());
            match bounds.as_mut() {
                Some(b) => {
                    b.include(min.x, min.y);
                    b.include(max.x, max.y);
                }
                None => {
                    bounds = Some(Bounds {
                        min_lat: min.y,
                        max_lat: max.y,
                        min_lng: min.x,
                        max_lng: max.x,
                    })
                }
            }
        }
        bounds
    }
}

// ============================================================================
// Projection
// ============================================================================

/// Build one feature per activity with a usable path.
///
/// Invalid coordinates are dropped; activities left with fewer than two
/// points are skipped and noted in the log.
pub fn activities_to_feature_collection<'a, I>(activities: I) -> FeatureCollection
where
    I: IntoIterator<Item = &'a Activity>,
{
    let mut skipped = 0usize;
    let features: Vec<Feature> = activities
        .into_iter()
        .filter_map(|activity| {
            let coordinates: Vec<[f64; 2]> = activity
                .path
                .iter()
                .filter(|p| p.is_valid())
                .map(|p| [p.longitude, p.latitude])
                .collect();
            if coordinates.len() < 2 {
                skipped += 1;
                log::debug!(
                    "[Projection] Activity {} has no usable path ({} valid points)",
                    activity.id,
                    coordinates.len()
                );
                return None;
            }
            Some(Feature {
                properties: FeatureProperties {
                    id: activity.id,
                    date: activity.date().to_string(),
                    color: color_from_type(&activity.activity_type).to_string(),
                    name: activity.name.clone(),
                },
                geometry: LineGeometry { coordinates },
            })
        })
        .collect();

    if skipped > 0 {
        log::debug!(
            "[Projection] Built {} features, skipped {} without map data",
            features.len(),
            skipped
        );
    }
    FeatureCollection { features }
}

fn project(lng: f64, lat: f64) -> (f64, f64) {
    let x = (lng + 180.0) / 360.0 * TILE_SIZE;
    let phi = lat
        .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
        .to_radians();
    let y = (1.0 - (PI / 4.0 + phi / 2.0).tan().ln() / PI) / 2.0 * TILE_SIZE;
    (x, y)
}

fn unproject(x: f64, y: f64) -> (f64, f64) {
    let lng = x / TILE_SIZE * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / TILE_SIZE);
    let lat = (2.0 * n.exp().atan() - PI / 2.0).to_degrees();
    (lng, lat)
}

/// Fit a viewport around every coordinate of the collection.
///
/// - No features: the configured default viewport.
/// - Zero-area bounds (one point, or identical points): centered on the point
///   at the zoom ceiling.
/// - Otherwise: the largest zoom at which the bounds fit inside the map with
///   `padding_fraction` kept free on each side, clamped to the zoom range.
///
/// Pure: the same collection always yields the same viewport.
pub fn bounds_for_feature_collection(fc: &FeatureCollection, config: &ViewportConfig) -> Viewport {
    let Some(bounds) = fc.bounds() else {
        return config.default_viewport;
    };

    if bounds.is_degenerate() {
        return Viewport::new(bounds.min_lng, bounds.min_lat, config.max_zoom);
    }

    let (x0, y0) = project(bounds.min_lng, bounds.max_lat);
    let (x1, y1) = project(bounds.max_lng, bounds.min_lat);
    let (dx, dy) = (x1 - x0, y1 - y0);

    let usable = 1.0 - 2.0 * config.padding_fraction;
    let scale_x = if dx > 0.0 {
        config.width * usable / dx
    } else {
        f64::INFINITY
    };
    let scale_y = if dy > 0.0 {
        config.height * usable / dy
    } else {
        f64::INFINITY
    };
    let zoom = scale_x
        .min(scale_y)
        .log2()
        .clamp(config.min_zoom, config.max_zoom);

    let (longitude, latitude) = unproject((x0 + x1) / 2.0, (y0 + y1) / 2.0);
    Viewport::new(longitude, latitude, zoom)
}

// ============================================================================
// Click lookup
// ============================================================================

/// A feature's bounding box for R-tree indexing.
#[derive(Debug, Clone)]
struct IndexedFeature {
    id: ActivityId,
    min: [f64; 2],
    max: [f64; 2],
    coordinates: Vec<[f64; 2]>,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

/// Spatial index resolving map point clicks to activity ids.
pub struct FeatureIndex {
    tree: RTree<IndexedFeature>,
}

impl FeatureIndex {
    /// Index every feature of a collection.
    pub fn build(fc: &FeatureCollection) -> Self {
        let entries: Vec<IndexedFeature> = fc
            .features
            .iter()
            .filter_map(|f| {
                let rect = f.geometry.to_line_string().bounding_rect()?;
                Some(IndexedFeature {
                    id: f.properties.id,
                    min: [rect.min().x, rect.min().y],
                    max: [rect.max().x, rect.max().y],
                    coordinates: f.geometry.coordinates.clone(),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Ids of features passing within `radius_degrees` of a `[lng, lat]` point,
    /// ascending and without duplicates.
    pub fn ids_near(&self, lng: f64, lat: f64, radius_degrees: f64) -> Vec<ActivityId> {
        let search = AABB::from_corners(
            [lng - radius_degrees, lat - radius_degrees],
            [lng + radius_degrees, lat + radius_degrees],
        );
        let mut ids: Vec<ActivityId> = self
            .tree
            .locate_in_envelope_intersecting(&search)
            .filter(|f| distance_to_path([lng, lat], &f.coordinates) <= radius_degrees)
            .map(|f| f.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

fn distance_to_path(point: [f64; 2], path: &[[f64; 2]]) -> f64 {
    path.windows(2)
        .map(|w| distance_to_segment(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

fn distance_to_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let (abx, aby) = (b[0] - a[0], b[1] - a[1]);
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 {
        (((p[0] - a[0]) * abx + (p[1] - a[1]) * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a[0] + t * abx, a[1] + t * aby);
    ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt()
}
