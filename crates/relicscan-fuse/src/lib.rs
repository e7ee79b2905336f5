//! Fusion of classic and learned-model detection streams.
//!
//! Concatenates both streams, removes near-duplicates with a
//! distance-threshold suppression (the non-maximum-suppression analogue for
//! point detections), recalibrates every survivor's confidence from its
//! source and feature kind, and returns a confidence-ranked list. Pure
//! in-memory transformation: empty in, empty out, no errors.

mod export;

pub use export::{
    feature_collection, flat_records, Feature, FeatureCollection, FlatRecord, Geometry, Properties,
};

use log::debug;

use relicscan_core::{planar_distance_deg, Detection, DetectionSource, FeatureKind};

/// Geographic radius (degrees, tile-local) inside which two detections are
/// considered one find. Of any mutually-close cluster exactly the
/// highest-confidence member survives.
pub const SUPPRESSION_RADIUS_DEG: f64 = 0.005;

/// Recalibrated confidence never reaches certainty.
pub const MAX_CONFIDENCE: f32 = 0.99;

/// Fusion settings; the default radius suits tile-scale degree coordinates.
#[derive(Clone, Copy, Debug)]
pub struct FuseParams {
    pub suppression_radius_deg: f64,
}

impl Default for FuseParams {
    fn default() -> Self {
        Self {
            suppression_radius_deg: SUPPRESSION_RADIUS_DEG,
        }
    }
}

/// Merge both detection streams into one deduplicated, re-scored, ranked list.
pub fn fuse(classic: Vec<Detection>, model: Vec<Detection>) -> Vec<Detection> {
    fuse_with(FuseParams::default(), classic, model)
}

/// [`fuse`] with explicit parameters.
pub fn fuse_with(
    params: FuseParams,
    classic: Vec<Detection>,
    model: Vec<Detection>,
) -> Vec<Detection> {
    let mut all = classic;
    all.extend(model);
    if all.is_empty() {
        return all;
    }
    let total = all.len();

    let mut fused: Vec<Detection> = suppress(all, params.suppression_radius_deg)
        .into_iter()
        .map(recalibrate)
        .collect();
    sort_by_confidence(&mut fused);

    debug!("fused {total} detections into {}", fused.len());
    fused
}

/// Distance-threshold suppression over raw (pre-recalibration) confidences.
///
/// Walks detections in descending confidence order (ties keep submission
/// order) and suppresses every not-yet-kept record within the radius of a
/// kept one.
fn suppress(detections: Vec<Detection>, radius_deg: f64) -> Vec<Detection> {
    if detections.len() <= 1 {
        return detections;
    }

    let mut order: Vec<usize> = (0..detections.len()).collect();
    // stable sort: equal confidences stay in submission order
    order.sort_by(|&i, &j| {
        detections[j]
            .confidence
            .partial_cmp(&detections[i].confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut suppressed = vec![false; detections.len()];
    let mut kept = Vec::new();
    for &i in &order {
        if suppressed[i] {
            continue;
        }
        kept.push(i);
        for &j in &order {
            if j == i || suppressed[j] {
                continue;
            }
            let dist = planar_distance_deg(
                detections[i].latitude,
                detections[i].longitude,
                detections[j].latitude,
                detections[j].longitude,
            );
            if dist < radius_deg {
                suppressed[j] = true;
            }
        }
    }

    let mut keep_flags = vec![false; detections.len()];
    for &i in &kept {
        keep_flags[i] = true;
    }
    detections
        .into_iter()
        .zip(keep_flags)
        .filter_map(|(d, keep)| keep.then_some(d))
        .collect()
}

/// Additive, capped confidence adjustment from source reliability and
/// feature-type specificity.
fn recalibrate(mut detection: Detection) -> Detection {
    let boost = source_boost(detection.source) + kind_boost(detection.kind);
    detection.confidence = (detection.confidence + boost).min(MAX_CONFIDENCE);
    detection
}

/// Learned inference outranks heuristics; the simulated stand-in earns nothing.
fn source_boost(source: DetectionSource) -> f32 {
    match source {
        DetectionSource::ModelInference => 0.15,
        DetectionSource::ClassicEdge => 0.10,
        DetectionSource::ClassicContour => 0.08,
        DetectionSource::ClassicVegetationIndex => 0.05,
        DetectionSource::ModelFallbackSimulated => 0.0,
    }
}

/// High-specificity signatures outrank generic anomalies.
fn kind_boost(kind: FeatureKind) -> f32 {
    match kind {
        FeatureKind::ParallelRoad => 0.15,
        FeatureKind::RectangularEnclosure => 0.12,
        FeatureKind::CircularEnclosure => 0.10,
        FeatureKind::RoadCandidate => 0.05,
        _ => 0.0,
    }
}

fn sort_by_confidence(detections: &mut [Detection]) {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn detection(
        lat: f64,
        lon: f64,
        kind: FeatureKind,
        confidence: f32,
        source: DetectionSource,
    ) -> Detection {
        Detection {
            latitude: lat,
            longitude: lon,
            kind,
            confidence,
            source,
            description: String::new(),
            bounding_box: None,
            tile_reference: None,
        }
    }

    #[test]
    fn empty_inputs_fuse_to_empty_output() {
        assert!(fuse(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn close_cluster_keeps_only_the_strongest() {
        let a = detection(
            42.0,
            12.0,
            FeatureKind::VegetationAnomaly,
            0.5,
            DetectionSource::ClassicVegetationIndex,
        );
        let b = detection(
            42.001,
            12.001,
            FeatureKind::VegetationAnomaly,
            0.7,
            DetectionSource::ClassicVegetationIndex,
        );
        let c = detection(
            42.0005,
            12.0005,
            FeatureKind::VegetationAnomaly,
            0.6,
            DetectionSource::ClassicVegetationIndex,
        );
        let fused = fuse(vec![a, b, c], Vec::new());
        assert_eq!(fused.len(), 1);
        // pre-suppression winner is b (0.7), then +0.05 source boost
        assert_relative_eq!(fused[0].confidence, 0.75, epsilon = 1e-6);
    }

    #[test]
    fn distant_detections_all_survive() {
        let a = detection(
            42.0,
            12.0,
            FeatureKind::VegetationAnomaly,
            0.5,
            DetectionSource::ClassicVegetationIndex,
        );
        let b = detection(
            42.1,
            12.1,
            FeatureKind::VegetationAnomaly,
            0.7,
            DetectionSource::ClassicVegetationIndex,
        );
        let fused = fuse(vec![a, b], Vec::new());
        assert_eq!(fused.len(), 2);
        assert!(fused[0].confidence >= fused[1].confidence);
    }

    #[test]
    fn suppression_crosses_source_boundaries() {
        let classic = detection(
            42.0,
            12.0,
            FeatureKind::RoadCandidate,
            0.6,
            DetectionSource::ClassicEdge,
        );
        let model = detection(
            42.0001,
            12.0001,
            FeatureKind::AncientRoad,
            0.9,
            DetectionSource::ModelInference,
        );
        let fused = fuse(vec![classic], vec![model]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].source, DetectionSource::ModelInference);
    }

    #[test]
    fn recalibration_is_additive_and_capped() {
        let pair = detection(
            42.0,
            12.0,
            FeatureKind::ParallelRoad,
            0.95,
            DetectionSource::ClassicEdge,
        );
        let anomaly = detection(
            43.0,
            13.0,
            FeatureKind::VegetationAnomaly,
            0.4,
            DetectionSource::ClassicVegetationIndex,
        );
        let simulated = detection(
            44.0,
            14.0,
            FeatureKind::BuildingRuins,
            0.8,
            DetectionSource::ModelFallbackSimulated,
        );
        let fused = fuse(vec![pair, anomaly], vec![simulated]);
        assert_eq!(fused.len(), 3);

        // 0.95 + 0.10 + 0.15 caps at MAX_CONFIDENCE
        assert_relative_eq!(fused[0].confidence, MAX_CONFIDENCE, epsilon = 1e-6);
        // simulated fallback gets no boost at all
        let sim = fused
            .iter()
            .find(|d| d.source == DetectionSource::ModelFallbackSimulated)
            .unwrap();
        assert_relative_eq!(sim.confidence, 0.8, epsilon = 1e-6);
        // 0.4 + 0.05 source boost, no kind boost for a raw anomaly
        let veg = fused
            .iter()
            .find(|d| d.kind == FeatureKind::VegetationAnomaly)
            .unwrap();
        assert_relative_eq!(veg.confidence, 0.45, epsilon = 1e-6);
    }

    #[test]
    fn confidence_never_exceeds_cap() {
        let hot = detection(
            42.0,
            12.0,
            FeatureKind::ParallelRoad,
            1.0,
            DetectionSource::ModelInference,
        );
        let fused = fuse(vec![hot], Vec::new());
        assert!(fused[0].confidence <= MAX_CONFIDENCE);
    }

    #[test]
    fn output_is_sorted_by_descending_confidence() {
        let detections = vec![
            detection(
                42.0,
                12.0,
                FeatureKind::VegetationAnomaly,
                0.3,
                DetectionSource::ClassicVegetationIndex,
            ),
            detection(
                42.5,
                12.5,
                FeatureKind::ParallelRoad,
                0.9,
                DetectionSource::ClassicEdge,
            ),
            detection(
                43.0,
                13.0,
                FeatureKind::RoadCandidate,
                0.6,
                DetectionSource::ClassicEdge,
            ),
        ];
        let fused = fuse(detections, Vec::new());
        for pair in fused.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn fusion_is_deterministic() {
        let classic = vec![
            detection(
                42.0,
                12.0,
                FeatureKind::RoadCandidate,
                0.6,
                DetectionSource::ClassicEdge,
            ),
            // same confidence, close by: tie broken by submission order
            detection(
                42.0001,
                12.0001,
                FeatureKind::RoadCandidate,
                0.6,
                DetectionSource::ClassicEdge,
            ),
        ];
        let model = vec![detection(
            42.5,
            12.5,
            FeatureKind::BuildingRuins,
            0.7,
            DetectionSource::ModelFallbackSimulated,
        )];

        let first = fuse(classic.clone(), model.clone());
        let second = fuse(classic, model);
        assert_eq!(first, second);
        // the earlier-submitted of the tied pair survived
        assert_relative_eq!(first[0].latitude, 42.0);
    }
}
