//! Export of fused detections as pure data.
//!
//! Two shapes: a flat record list for tabular consumers, and a GeoJSON-style
//! point feature collection for map consumers. Persistence is a collaborator
//! concern; nothing here touches the filesystem.

use serde::{Deserialize, Serialize};

use relicscan_core::{Detection, DetectionSource, FeatureKind};

/// One detection flattened for tabular export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub kind: FeatureKind,
    /// Rounded to three decimals for stable diffs across runs.
    pub confidence: f32,
    pub source: DetectionSource,
    pub description: String,
}

/// GeoJSON-style feature collection of point detections.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub features: Vec<Feature>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub geometry: Geometry,
    pub properties: Properties,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub geometry_type: String,
    /// `[lon, lat]` per the GeoJSON axis order.
    pub coordinates: [f64; 2],
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Properties {
    pub kind: FeatureKind,
    pub confidence: f32,
    pub source: DetectionSource,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<[u32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_reference: Option<String>,
}

/// Flatten detections for tabular export.
pub fn flat_records(detections: &[Detection]) -> Vec<FlatRecord> {
    detections
        .iter()
        .map(|d| FlatRecord {
            latitude: d.latitude,
            longitude: d.longitude,
            kind: d.kind,
            confidence: round3(d.confidence),
            source: d.source,
            description: d.description.clone(),
        })
        .collect()
}

/// Build a point feature collection from detections.
pub fn feature_collection(detections: &[Detection]) -> FeatureCollection {
    FeatureCollection {
        collection_type: "FeatureCollection".to_owned(),
        features: detections
            .iter()
            .map(|d| Feature {
                feature_type: "Feature".to_owned(),
                geometry: Geometry {
                    geometry_type: "Point".to_owned(),
                    coordinates: [d.longitude, d.latitude],
                },
                properties: Properties {
                    kind: d.kind,
                    confidence: round3(d.confidence),
                    source: d.source,
                    description: d.description.clone(),
                    bounding_box: d.bounding_box.map(|b| b.as_array()),
                    tile_reference: d.tile_reference.clone(),
                },
            })
            .collect(),
    }
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}
