//! Enclosure detectors built on contour geometry.
//!
//! Two passes share one edge map and one contour set: near-square
//! quadrilaterals (city-block "insula" geometry) and closed circular/oval
//! boundaries. Both passes run independently, so an ambiguous shape may be
//! reported by each; the fusion stage keeps the stronger record.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::edges::canny;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use log::debug;
use nalgebra::Point2;

use relicscan_core::{Detection, DetectionSource, FeatureKind, PixelBox, RasterTile};

/// Minimum contour area for a rectangular enclosure, in pixels.
pub const MIN_RECT_AREA_PX: f64 = 1000.0;

/// Minimum contour area for a circular enclosure, in pixels.
pub const MIN_ENCLOSURE_AREA_PX: f64 = 500.0;

/// Circularity threshold; a perfect circle scores 1.0, a square ~0.785.
pub const MIN_CIRCULARITY: f64 = 0.7;

/// Accepted width/height aspect band for near-square blocks.
pub const RECT_ASPECT_RANGE: (f64, f64) = (0.7, 1.3);

/// Douglas-Peucker tolerance as a fraction of the contour perimeter.
const POLY_EPSILON_FRAC: f64 = 0.02;

/// Edge thresholds for the contour passes.
const EDGE_LOW: f32 = 50.0;
const EDGE_HIGH: f32 = 150.0;

/// Run both enclosure passes over a grayscale composite.
pub fn detect(gray: &GrayImage, tile: &RasterTile) -> Vec<Detection> {
    let edges = canny(gray, EDGE_LOW, EDGE_HIGH);
    let contours: Vec<Contour<i32>> = find_contours(&edges);
    let outer: Vec<&Contour<i32>> = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .collect();

    let mut detections = rectangles(&outer, tile);
    detections.extend(circles(&outer, tile));
    debug!(
        "shape pass: {} outer contours, {} enclosures",
        outer.len(),
        detections.len()
    );
    detections
}

/// Near-square quadrilateral pass.
fn rectangles(contours: &[&Contour<i32>], tile: &RasterTile) -> Vec<Detection> {
    let mut out = Vec::new();
    for contour in contours {
        let points = &contour.points;
        if points.len() < 3 {
            continue;
        }
        let area = polygon_area(points);
        let perimeter = arc_length(points, true);
        if area < MIN_RECT_AREA_PX || perimeter == 0.0 {
            continue;
        }

        let approx = approximate_polygon_dp(points, POLY_EPSILON_FRAC * perimeter, true);
        let Some((center, width, height)) = quad_candidate(&approx) else {
            continue;
        };

        let (lon, lat) = tile.pixel_to_geo(center.x, center.y);
        out.push(Detection {
            latitude: lat,
            longitude: lon,
            kind: FeatureKind::RectangularEnclosure,
            confidence: (0.5 + area as f32 / 20000.0).min(0.85),
            source: DetectionSource::ClassicContour,
            description: format!("rectangular structure {width}x{height} px"),
            bounding_box: Some(bounding_box(&approx)),
            tile_reference: tile.reference().map(str::to_owned),
        });
    }
    out
}

/// Closed circular/oval boundary pass.
fn circles(contours: &[&Contour<i32>], tile: &RasterTile) -> Vec<Detection> {
    let mut out = Vec::new();
    for contour in contours {
        let points = &contour.points;
        if points.len() < 3 {
            continue;
        }
        let area = polygon_area(points);
        let perimeter = arc_length(points, true);
        if area < MIN_ENCLOSURE_AREA_PX || perimeter == 0.0 {
            continue;
        }
        let roundness = circularity(area, perimeter);
        if roundness <= MIN_CIRCULARITY {
            continue;
        }
        let Some(centroid) = polygon_centroid(points) else {
            continue;
        };

        let (lon, lat) = tile.pixel_to_geo(centroid.x, centroid.y);
        out.push(Detection {
            latitude: lat,
            longitude: lon,
            kind: FeatureKind::CircularEnclosure,
            confidence: (roundness as f32 * 0.9).min(0.9),
            source: DetectionSource::ClassicContour,
            description: format!("closed circular boundary, area {} px", area.round() as u64),
            bounding_box: None,
            tile_reference: tile.reference().map(str::to_owned),
        });
    }
    out
}

/// `4 * pi * area / perimeter^2`; 1.0 for a perfect circle.
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter == 0.0 {
        return 0.0;
    }
    4.0 * std::f64::consts::PI * area / (perimeter * perimeter)
}

/// Shoelace area of a closed polygon, in pixels.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y);
    }
    (twice_area as f64 / 2.0).abs()
}

/// Area-weighted centroid of a closed polygon; `None` when degenerate.
pub fn polygon_centroid(points: &[Point<i32>]) -> Option<Point2<f64>> {
    if points.len() < 3 {
        return None;
    }
    let mut twice_area = 0.0f64;
    let mut cx = 0.0f64;
    let mut cy = 0.0f64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        let cross = f64::from(p.x) * f64::from(q.y) - f64::from(q.x) * f64::from(p.y);
        twice_area += cross;
        cx += (f64::from(p.x) + f64::from(q.x)) * cross;
        cy += (f64::from(p.y) + f64::from(q.y)) * cross;
    }
    if twice_area.abs() < f64::EPSILON {
        return None;
    }
    let scale = 3.0 * twice_area;
    Some(Point2::new(cx / scale, cy / scale))
}

/// Accept a polygon approximation as a near-square quadrilateral.
///
/// Exactly four vertices and a bounding-rectangle aspect ratio within
/// [`RECT_ASPECT_RANGE`]; returns the rectangle center and extent.
pub fn quad_candidate(approx: &[Point<i32>]) -> Option<(Point2<f64>, u32, u32)> {
    if approx.len() != 4 {
        return None;
    }
    let rect = bounding_box(approx);
    let width = rect.x1.saturating_sub(rect.x0);
    let height = rect.y1.saturating_sub(rect.y0);
    if height == 0 {
        return None;
    }
    let aspect = f64::from(width) / f64::from(height);
    let (lo, hi) = RECT_ASPECT_RANGE;
    if aspect <= lo || aspect >= hi {
        return None;
    }
    let center = Point2::new(
        f64::from(rect.x0) + f64::from(width) / 2.0,
        f64::from(rect.y0) + f64::from(height) / 2.0,
    );
    Some((center, width, height))
}

fn bounding_box(points: &[Point<i32>]) -> PixelBox {
    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;
    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    PixelBox::new(
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        max_x.max(0) as u32,
        max_y.max(0) as u32,
    )
}
