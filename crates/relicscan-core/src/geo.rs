use serde::{Deserialize, Serialize};

/// Geographic bounding box in WGS84 degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Center of the box as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

/// Affine pixel-to-geographic transform.
///
/// Maps a pixel position `(col, row)` to geographic `(lon, lat)`:
///
/// ```text
/// lon = a * col + b * row + c
/// lat = d * col + e * row + f
/// ```
///
/// The transform is attached to every [`crate::RasterTile`]; this crate never
/// geo-references imagery itself.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up transform: `origin` is the top-left corner, rows advance
    /// southwards. Both resolutions are given in degrees per pixel, positive.
    pub fn north_up(origin_lon: f64, origin_lat: f64, lon_res: f64, lat_res: f64) -> Self {
        Self {
            a: lon_res,
            b: 0.0,
            c: origin_lon,
            d: 0.0,
            e: -lat_res,
            f: origin_lat,
        }
    }

    /// North-up transform covering `bounds` with a `width x height` raster.
    pub fn from_bounds(bounds: &GeoBounds, width: u32, height: u32) -> Self {
        Self::north_up(
            bounds.min_lon,
            bounds.max_lat,
            bounds.lon_span() / f64::from(width.max(1)),
            bounds.lat_span() / f64::from(height.max(1)),
        )
    }

    /// Map a (sub)pixel position to `(lon, lat)`.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }
}

/// Planar Euclidean distance between two geographic points, in degrees.
///
/// Tile-local approximation: at tile scale the curvature error is far below
/// every clustering threshold used by the detectors, so no great-circle math.
pub fn planar_distance_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = lat1 - lat2;
    let dlon = lon1 - lon2;
    (dlat * dlat + dlon * dlon).sqrt()
}
