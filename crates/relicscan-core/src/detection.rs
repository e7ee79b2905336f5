use serde::{Deserialize, Serialize};

/// Closed taxonomy of candidate archaeological features.
///
/// The first five variants are produced by the heuristic detectors; the rest
/// mirror the learned model's fixed class table. Keeping the taxonomy closed
/// makes an unknown class id a construction-time `None` instead of a silent
/// free-form string.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    RoadCandidate,
    ParallelRoad,
    RectangularEnclosure,
    CircularEnclosure,
    VegetationAnomaly,
    BuildingRuins,
    Wall,
    AncientRoad,
    CircularStructure,
    RectangularStructure,
    Necropolis,
    ArchaeologicalSite,
}

impl FeatureKind {
    /// Stable display label, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            FeatureKind::RoadCandidate => "road-candidate",
            FeatureKind::ParallelRoad => "parallel-road",
            FeatureKind::RectangularEnclosure => "rectangular-enclosure",
            FeatureKind::CircularEnclosure => "circular-enclosure",
            FeatureKind::VegetationAnomaly => "vegetation-anomaly",
            FeatureKind::BuildingRuins => "building-ruins",
            FeatureKind::Wall => "wall",
            FeatureKind::AncientRoad => "ancient-road",
            FeatureKind::CircularStructure => "circular-structure",
            FeatureKind::RectangularStructure => "rectangular-structure",
            FeatureKind::Necropolis => "necropolis",
            FeatureKind::ArchaeologicalSite => "archaeological-site",
        }
    }

    /// Map a learned-model class id to its feature kind.
    ///
    /// The table is fixed; ids outside it yield `None` and the caller decides
    /// how loudly to drop the box.
    pub fn from_class_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(FeatureKind::BuildingRuins),
            1 => Some(FeatureKind::Wall),
            2 => Some(FeatureKind::AncientRoad),
            3 => Some(FeatureKind::CircularStructure),
            4 => Some(FeatureKind::RectangularStructure),
            5 => Some(FeatureKind::Necropolis),
            6 => Some(FeatureKind::ArchaeologicalSite),
            _ => None,
        }
    }
}

/// Which detector, and which algorithm within it, produced a record.
///
/// Consumers rely on this to tell real inference from the simulated stand-in,
/// and the fusion stage keys its confidence recalibration on it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionSource {
    ClassicEdge,
    ClassicVegetationIndex,
    ClassicContour,
    ModelInference,
    ModelFallbackSimulated,
}

impl DetectionSource {
    pub fn label(&self) -> &'static str {
        match self {
            DetectionSource::ClassicEdge => "classic-edge",
            DetectionSource::ClassicVegetationIndex => "classic-vegetation-index",
            DetectionSource::ClassicContour => "classic-contour",
            DetectionSource::ModelInference => "model-inference",
            DetectionSource::ModelFallbackSimulated => "model-fallback-simulated",
        }
    }

    /// True for records fabricated by the deterministic fallback.
    pub fn is_simulated(&self) -> bool {
        matches!(self, DetectionSource::ModelFallbackSimulated)
    }
}

/// Pixel-space rectangle; for line detections the two segment endpoints.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelBox {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Round floating pixel coordinates, clamping negatives to zero.
    pub fn from_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let r = |v: f32| v.round().max(0.0) as u32;
        Self::new(r(x0), r(y0), r(x1), r(y1))
    }

    pub fn as_array(&self) -> [u32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

/// One candidate finding, already in geographic coordinates.
///
/// Immutable value record: detectors create these and hand them by value to
/// the fusion stage; nothing mutates a detection in place except the fusion
/// stage's confidence recalibration of records it owns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub latitude: f64,
    pub longitude: f64,
    pub kind: FeatureKind,
    /// In `[0, 1]` at creation; capped at 0.99 after fusion recalibration.
    pub confidence: f32,
    pub source: DetectionSource,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<PixelBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_serialized_form() {
        for kind in [
            FeatureKind::RoadCandidate,
            FeatureKind::ParallelRoad,
            FeatureKind::VegetationAnomaly,
            FeatureKind::ArchaeologicalSite,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.label()));
        }
        for source in [
            DetectionSource::ClassicEdge,
            DetectionSource::ClassicVegetationIndex,
            DetectionSource::ModelFallbackSimulated,
        ] {
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{}\"", source.label()));
        }
    }

    #[test]
    fn class_table_is_closed() {
        assert_eq!(
            FeatureKind::from_class_id(0),
            Some(FeatureKind::BuildingRuins)
        );
        assert_eq!(
            FeatureKind::from_class_id(6),
            Some(FeatureKind::ArchaeologicalSite)
        );
        assert_eq!(FeatureKind::from_class_id(7), None);
        assert_eq!(FeatureKind::from_class_id(u32::MAX), None);
    }

    #[test]
    fn only_the_fallback_is_simulated() {
        assert!(DetectionSource::ModelFallbackSimulated.is_simulated());
        assert!(!DetectionSource::ModelInference.is_simulated());
        assert!(!DetectionSource::ClassicEdge.is_simulated());
    }

    #[test]
    fn pixel_box_rounds_and_clamps() {
        let b = PixelBox::from_points(-1.2, 0.6, 10.4, 19.5);
        assert_eq!(b.as_array(), [0, 1, 10, 20]);
    }
}
