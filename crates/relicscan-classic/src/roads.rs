//! Straight-road candidate detector with a parallel-pair refinement.
//!
//! Engineered roads survive as long straight edges aligned to a dominant
//! axis, and ancient roadbeds in particular tend to appear as two close
//! parallel lines (the flanking ditches). The detector votes edge pixels
//! into a Hough accumulator, traces contiguous edge support along each
//! voted line into segments, filters by length and orientation, then pairs
//! nearby candidates into parallel-road detections.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use log::debug;
use nalgebra::Point2;

use relicscan_core::{
    planar_distance_deg, ClassicParams, Detection, DetectionSource, FeatureKind, PixelBox,
    RasterTile,
};

/// Tolerance around the horizontal axis; segments outside
/// `[0, 5] U [175, 180]` degrees are discarded. A simplifying heuristic for
/// gridded road networks, not a general road model.
pub const ROAD_ANGLE_TOLERANCE_DEG: f32 = 5.0;

/// Parallel-road clustering distance in degrees, tile-local. Two candidates
/// whose geographic centers sit closer than this are read as one roadbed.
pub const PARALLEL_PAIR_DISTANCE_DEG: f64 = 0.01;

/// A line segment in pixel space.
#[derive(Clone, Copy, Debug)]
pub struct Segment {
    pub start: Point2<f32>,
    pub end: Point2<f32>,
}

impl Segment {
    pub fn length(&self) -> f32 {
        (self.end - self.start).norm()
    }

    pub fn midpoint(&self) -> Point2<f32> {
        nalgebra::center(&self.start, &self.end)
    }

    /// Absolute angle from the horizontal axis, in `[0, 180]` degrees.
    pub fn angle_from_horizontal_deg(&self) -> f32 {
        let d = self.end - self.start;
        d.y.atan2(d.x).to_degrees().abs()
    }
}

/// True for segments aligned with the horizontal axis in either direction.
pub fn is_axis_aligned(angle_deg: f32) -> bool {
    angle_deg <= ROAD_ANGLE_TOLERANCE_DEG || angle_deg >= 180.0 - ROAD_ANGLE_TOLERANCE_DEG
}

/// Full road pass over a grayscale composite: edges, segments, candidates,
/// parallel pairs. Unpaired candidates are kept alongside the pairs; only
/// the fusion stage drops detections.
pub fn detect(gray: &GrayImage, tile: &RasterTile, params: &ClassicParams) -> Vec<Detection> {
    let edges = canny(gray, params.canny_low, params.canny_high);
    let segments = extract_segments(&edges, params);
    let mut detections = road_candidates(&segments, tile, params);
    let pairs = parallel_pairs(&detections, tile);
    debug!(
        "road pass: {} segments, {} candidates, {} parallel pairs",
        segments.len(),
        detections.len(),
        pairs.len()
    );
    detections.extend(pairs);
    detections
}

/// Extract maximal edge-supported segments along every voted Hough line.
///
/// Support runs are split where the gap exceeds `line_max_gap`; runs shorter
/// than `line_min_length` are dropped.
pub fn extract_segments(edges: &GrayImage, params: &ClassicParams) -> Vec<Segment> {
    let lines = detect_lines(
        edges,
        LineDetectionOptions {
            vote_threshold: params.line_votes,
            suppression_radius: params.line_suppression_radius,
        },
    );

    lines
        .iter()
        .flat_map(|line| segments_along_line(edges, line, params))
        .collect()
}

/// Walk one polar line across the image and collect contiguous support runs.
fn segments_along_line(edges: &GrayImage, line: &PolarLine, params: &ClassicParams) -> Vec<Segment> {
    let theta = (line.angle_in_degrees as f32).to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    // Closest point to the origin and the unit direction along the line.
    let base = Point2::new(line.r * cos_t, line.r * sin_t);
    let dir = nalgebra::Vector2::new(-sin_t, cos_t);

    let reach = (edges.width() as f32).hypot(edges.height() as f32);
    let mut out = Vec::new();
    let mut run: Option<(f32, f32)> = None; // (t_start, t_last)

    let mut t = -reach;
    while t <= reach {
        let p = base + dir * t;
        let supported = has_edge_support(edges, p.x, p.y, cos_t, sin_t);

        if supported {
            run = Some(match run {
                None => (t, t),
                Some((t_start, _)) => (t_start, t),
            });
        } else if let Some((t_start, t_last)) = run {
            if t - t_last > params.line_max_gap {
                push_run(&mut out, base, dir, t_start, t_last, params);
                run = None;
            }
        }
        t += 1.0;
    }
    if let Some((t_start, t_last)) = run {
        push_run(&mut out, base, dir, t_start, t_last, params);
    }
    out
}

fn push_run(
    out: &mut Vec<Segment>,
    base: Point2<f32>,
    dir: nalgebra::Vector2<f32>,
    t_start: f32,
    t_last: f32,
    params: &ClassicParams,
) {
    let segment = Segment {
        start: base + dir * t_start,
        end: base + dir * t_last,
    };
    if segment.length() >= params.line_min_length {
        out.push(segment);
    }
}

/// Check the pixel and its two neighbours along the line normal.
fn has_edge_support(edges: &GrayImage, x: f32, y: f32, nx: f32, ny: f32) -> bool {
    for k in [-1.0f32, 0.0, 1.0] {
        let xi = (x + k * nx).round() as i32;
        let yi = (y + k * ny).round() as i32;
        if xi < 0 || yi < 0 || xi >= edges.width() as i32 || yi >= edges.height() as i32 {
            continue;
        }
        if edges.get_pixel(xi as u32, yi as u32)[0] > 0 {
            return true;
        }
    }
    false
}

/// Convert axis-aligned segments of sufficient length into detections.
pub fn road_candidates(
    segments: &[Segment],
    tile: &RasterTile,
    params: &ClassicParams,
) -> Vec<Detection> {
    let mut out = Vec::new();
    for segment in segments {
        let length = segment.length();
        if length < params.line_min_length {
            continue;
        }
        if !is_axis_aligned(segment.angle_from_horizontal_deg()) {
            continue;
        }

        let mid = segment.midpoint();
        let (lon, lat) = tile.pixel_to_geo(f64::from(mid.x), f64::from(mid.y));
        out.push(Detection {
            latitude: lat,
            longitude: lon,
            kind: FeatureKind::RoadCandidate,
            confidence: (0.4 + length / 500.0).min(0.8),
            source: DetectionSource::ClassicEdge,
            description: format!("straight segment of {} px", length.round() as u32),
            bounding_box: Some(PixelBox::from_points(
                segment.start.x,
                segment.start.y,
                segment.end.x,
                segment.end.y,
            )),
            tile_reference: tile.reference().map(str::to_owned),
        });
    }
    out
}

/// Pair candidates whose centers fall within the clustering distance.
pub fn parallel_pairs(candidates: &[Detection], tile: &RasterTile) -> Vec<Detection> {
    let mut pairs = Vec::new();
    for (i, first) in candidates.iter().enumerate() {
        for second in &candidates[i + 1..] {
            let dist = planar_distance_deg(
                first.latitude,
                first.longitude,
                second.latitude,
                second.longitude,
            );
            if dist >= PARALLEL_PAIR_DISTANCE_DEG {
                continue;
            }
            let avg = (first.confidence + second.confidence) / 2.0;
            pairs.push(Detection {
                latitude: (first.latitude + second.latitude) / 2.0,
                longitude: (first.longitude + second.longitude) / 2.0,
                kind: FeatureKind::ParallelRoad,
                confidence: (avg + 0.2).min(0.95),
                source: DetectionSource::ClassicEdge,
                description: "paired parallel segments, likely engineered roadbed".to_owned(),
                bounding_box: None,
                tile_reference: tile.reference().map(str::to_owned),
            });
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use relicscan_core::GeoTransform;

    fn params() -> ClassicParams {
        ClassicParams {
            line_votes: 80,
            line_suppression_radius: 3,
            line_min_length: 50.0,
            line_max_gap: 5.0,
            ..ClassicParams::default()
        }
    }

    fn tile(width: u32, height: u32) -> RasterTile {
        let n = (width * height) as usize;
        RasterTile::new(
            width,
            height,
            vec![vec![0u8; n]; 3],
            GeoTransform::north_up(12.0, 42.0, 1e-4, 1e-4),
        )
        .unwrap()
    }

    fn horizontal_segment(y: f32, x0: f32, x1: f32) -> Segment {
        Segment {
            start: Point2::new(x0, y),
            end: Point2::new(x1, y),
        }
    }

    #[test]
    fn angle_filter_keeps_both_horizontal_directions() {
        assert!(is_axis_aligned(0.0));
        assert!(is_axis_aligned(4.9));
        assert!(is_axis_aligned(176.0));
        assert!(!is_axis_aligned(5.1));
        assert!(!is_axis_aligned(90.0));
        assert!(!is_axis_aligned(45.0));
    }

    #[test]
    fn segment_geometry() {
        let s = Segment {
            start: Point2::new(0.0, 0.0),
            end: Point2::new(3.0, 4.0),
        };
        assert_relative_eq!(s.length(), 5.0);
        assert_relative_eq!(s.midpoint().x, 1.5);
        assert_relative_eq!(s.midpoint().y, 2.0);

        let flat = horizontal_segment(7.0, 10.0, 60.0);
        assert_relative_eq!(flat.angle_from_horizontal_deg(), 0.0);
        let reversed = horizontal_segment(7.0, 60.0, 10.0);
        assert_relative_eq!(reversed.angle_from_horizontal_deg(), 180.0);
    }

    #[test]
    fn candidates_reject_short_and_oblique_segments() {
        let t = tile(200, 100);
        let segments = vec![
            horizontal_segment(10.0, 0.0, 30.0), // too short
            Segment {
                start: Point2::new(0.0, 0.0),
                end: Point2::new(60.0, 60.0), // 45 degrees
            },
            horizontal_segment(40.0, 10.0, 150.0), // kept
        ];
        let out = road_candidates(&segments, &t, &params());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, FeatureKind::RoadCandidate);
        // length 140 -> 0.4 + 140/500
        assert_relative_eq!(out[0].confidence, 0.68, epsilon = 1e-5);
        assert!(out[0].bounding_box.is_some());
    }

    #[test]
    fn candidate_confidence_caps_at_08() {
        let t = tile(600, 100);
        let segments = vec![horizontal_segment(50.0, 0.0, 500.0)];
        let out = road_candidates(&segments, &t, &params());
        assert_relative_eq!(out[0].confidence, 0.8);
    }

    #[test]
    fn extracts_two_segments_from_two_edge_rows() {
        let mut edges = GrayImage::new(120, 60);
        for x in 0..120 {
            edges.put_pixel(x, 20, image::Luma([255]));
            edges.put_pixel(x, 28, image::Luma([255]));
        }
        let segments = extract_segments(&edges, &params());
        assert_eq!(segments.len(), 2);
        for s in &segments {
            assert!(s.length() >= 110.0);
            assert!(is_axis_aligned(s.angle_from_horizontal_deg()));
        }
    }

    #[test]
    fn gap_wider_than_limit_splits_the_run() {
        let mut edges = GrayImage::new(200, 40);
        for x in 0..80 {
            edges.put_pixel(x, 16, image::Luma([255]));
        }
        for x in 100..200 {
            edges.put_pixel(x, 16, image::Luma([255]));
        }
        let p = ClassicParams {
            line_min_length: 50.0,
            line_max_gap: 5.0,
            line_votes: 80,
            line_suppression_radius: 3,
            ..ClassicParams::default()
        };
        let segments = extract_segments(&edges, &p);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn close_candidates_pair_into_a_parallel_road() {
        let t = tile(200, 100);
        let candidates = road_candidates(
            &[
                horizontal_segment(30.0, 10.0, 150.0),
                horizontal_segment(38.0, 10.0, 150.0),
            ],
            &t,
            &params(),
        );
        assert_eq!(candidates.len(), 2);

        let pairs = parallel_pairs(&candidates, &t);
        assert_eq!(pairs.len(), 1);
        let pair = &pairs[0];
        assert_eq!(pair.kind, FeatureKind::ParallelRoad);
        let avg = (candidates[0].confidence + candidates[1].confidence) / 2.0;
        assert_relative_eq!(pair.confidence, (avg + 0.2).min(0.95), epsilon = 1e-6);
        assert_relative_eq!(
            pair.latitude,
            (candidates[0].latitude + candidates[1].latitude) / 2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn distant_candidates_do_not_pair() {
        let t = tile(200, 200);
        // 150 px apart at 1e-4 deg/px is 0.015 deg, beyond the clustering distance
        let candidates = road_candidates(
            &[
                horizontal_segment(10.0, 10.0, 150.0),
                horizontal_segment(160.0, 10.0, 150.0),
            ],
            &t,
            &params(),
        );
        assert!(parallel_pairs(&candidates, &t).is_empty());
    }
}
