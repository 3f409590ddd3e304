//! Geographic points and proximity search.
//!
//! Stores carry a longitude/latitude point. The "stores near me" lookup narrows
//! candidates with a [`BoundingBox`] in SQL and then ranks them exactly here
//! with the haversine distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Search radius used by the near-me lookup.
pub const NEAR_RADIUS_METERS: f64 = 10_000.0;

/// Maximum number of stores returned by the near-me lookup.
pub const NEAR_LIMIT: usize = 10;

/// Errors for invalid coordinates.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum GeoError {
    /// Longitude outside -180..=180 or not finite.
    #[error("longitude must be between -180 and 180 (got {0})")]
    Longitude(f64),
    /// Latitude outside -90..=90 or not finite.
    #[error("latitude must be between -90 and 90 (got {0})")]
    Latitude(f64),
}

/// A WGS84 point, longitude first like GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    lng: f64,
    lat: f64,
}

impl GeoPoint {
    /// Create a point from longitude and latitude in degrees.
    ///
    /// # Errors
    ///
    /// Returns `GeoError` if either coordinate is out of range or not finite.
    pub fn new(lng: f64, lat: f64) -> Result<Self, GeoError> {
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::Longitude(lng));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::Latitude(lat));
        }
        Ok(Self { lng, lat })
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Great-circle distance to `other` in meters (haversine).
    #[must_use]
    pub fn distance_meters(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// A box that contains every point within `radius_meters` of this one.
    ///
    /// Near the poles, or when the box would wrap the antimeridian, the
    /// longitude range widens to the whole globe.
    #[must_use]
    pub fn bounding_box(&self, radius_meters: f64) -> BoundingBox {
        let d_lat = (radius_meters / EARTH_RADIUS_METERS).to_degrees();
        let min_lat = (self.lat - d_lat).max(-90.0);
        let max_lat = (self.lat + d_lat).min(90.0);

        let cos_lat = self.lat.to_radians().cos();
        let (min_lng, max_lng) = if cos_lat <= f64::EPSILON || max_lat >= 90.0 || min_lat <= -90.0
        {
            (-180.0, 180.0)
        } else {
            let d_lng = (radius_meters / (EARTH_RADIUS_METERS * cos_lat)).to_degrees();
            let (lo, hi) = (self.lng - d_lng, self.lng + d_lng);
            if lo < -180.0 || hi > 180.0 {
                (-180.0, 180.0)
            } else {
                (lo, hi)
            }
        };

        BoundingBox {
            min_lng,
            max_lng,
            min_lat,
            max_lat,
        }
    }
}

/// Axis-aligned longitude/latitude box used as a cheap SQL prefilter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub max_lng: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Whether `point` falls inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lng..=self.max_lng).contains(&point.lng)
            && (self.min_lat..=self.max_lat).contains(&point.lat)
    }
}

/// Keep candidates within `max_distance_meters` of `origin`, nearest first,
/// at most `limit` of them. Equal distances keep their input order.
///
/// Candidates outside the bounding box are dropped before any haversine
/// distance is computed.
pub fn nearest<T>(
    origin: &GeoPoint,
    candidates: impl IntoIterator<Item = (GeoPoint, T)>,
    max_distance_meters: f64,
    limit: usize,
) -> Vec<(f64, T)> {
    let bbox = origin.bounding_box(max_distance_meters);
    let mut within: Vec<(f64, T)> = candidates
        .into_iter()
        .filter(|(point, _)| bbox.contains(point))
        .map(|(point, item)| (origin.distance_meters(&point), item))
        .filter(|(distance, _)| *distance <= max_distance_meters)
        .collect();

    within.sort_by(|a, b| a.0.total_cmp(&b.0));
    within.truncate(limit);
    within
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn point(lng: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lng, lat).unwrap()
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(GeoPoint::new(181.0, 0.0), Err(GeoError::Longitude(181.0)));
        assert_eq!(GeoPoint::new(0.0, -91.0), Err(GeoError::Latitude(-91.0)));
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = point(-79.38, 43.65);
        assert!(p.distance_meters(&p).abs() < 1e-6);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        // One degree of latitude is roughly 111.2 km everywhere.
        let d = point(0.0, 10.0).distance_meters(&point(0.0, 11.0));
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn test_bounding_box_contains_radius() {
        let origin = point(-79.38, 43.65);
        let bbox = origin.bounding_box(NEAR_RADIUS_METERS);
        // Points just inside the radius in each direction are in the box.
        assert!(bbox.contains(&point(-79.38, 43.73)));
        assert!(bbox.contains(&point(-79.38, 43.57)));
        assert!(bbox.contains(&point(-79.26, 43.65)));
        assert!(!bbox.contains(&point(-79.38, 44.0)));
    }

    #[test]
    fn test_bounding_box_wraps_to_full_longitude() {
        let bbox = point(179.99, 0.0).bounding_box(NEAR_RADIUS_METERS);
        assert!((bbox.min_lng + 180.0).abs() < f64::EPSILON);
        assert!((bbox.max_lng - 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_nearest_filters_sorts_and_limits() {
        let origin = point(0.0, 0.0);
        let candidates = vec![
            (point(0.0, 0.05), "far-ish"),
            (point(0.0, 0.01), "close"),
            (point(0.0, 1.0), "too far"),
            (point(0.0, 0.02), "middle"),
        ];

        let found = nearest(&origin, candidates.clone(), NEAR_RADIUS_METERS, 10);
        let names: Vec<_> = found.iter().map(|(_, n)| *n).collect();
        assert_eq!(names, vec!["close", "middle", "far-ish"]);

        let limited = nearest(&origin, candidates, NEAR_RADIUS_METERS, 2);
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_nearest_empty() {
        let found: Vec<(f64, ())> = nearest(&point(0.0, 0.0), Vec::new(), 1.0, 10);
        assert!(found.is_empty());
    }
}
