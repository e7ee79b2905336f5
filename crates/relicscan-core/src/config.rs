use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::geo::GeoBounds;

/// Thresholds for the heuristic detectors.
///
/// Defaults are tuned for 10 m/px multispectral chips; revisit every value
/// when the pipeline is pointed at imagery of a different resolution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassicParams {
    /// Canny hysteresis low threshold for the road detector.
    pub canny_low: f32,
    /// Canny hysteresis high threshold for the road detector.
    pub canny_high: f32,
    /// Minimum Hough accumulator votes for a line to be considered.
    pub line_votes: u32,
    /// Accumulator-space suppression radius around each vote peak.
    pub line_suppression_radius: u32,
    /// Minimum segment length in pixels.
    pub line_min_length: f32,
    /// Maximum gap in pixels bridged while tracing edge support of a line.
    pub line_max_gap: f32,
    /// Lower bound of the vegetation-index anomaly band.
    pub vegetation_lower: f32,
    /// Upper bound of the vegetation-index anomaly band. Values between the
    /// two bounds read as neither bare soil nor healthy vegetation.
    pub vegetation_threshold: f32,
}

impl Default for ClassicParams {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            line_votes: 50,
            line_suppression_radius: 8,
            line_min_length: 50.0,
            line_max_gap: 10.0,
            vegetation_lower: -0.1,
            vegetation_threshold: 0.3,
        }
    }
}

/// Learned-model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelParams {
    /// Path to an ONNX object-detection model. `None` selects the simulated
    /// stand-in outright.
    pub model_path: Option<PathBuf>,
    /// Minimum box confidence kept during decoding.
    pub confidence_threshold: f32,
    /// IoU above which overlapping boxes of one inference call are merged.
    pub iou_threshold: f32,
    /// Seed for the deterministic fallback detector.
    pub fallback_seed: u64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model_path: None,
            confidence_threshold: 0.5,
            iou_threshold: 0.4,
            fallback_seed: 42,
        }
    }
}

/// One scan run: the survey area plus all detector thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    pub name: String,
    pub area: GeoBounds,
    #[serde(default)]
    pub classic: ClassicParams,
    #[serde(default)]
    pub model: ModelParams,
}

impl ScanConfig {
    pub fn new(name: impl Into<String>, area: GeoBounds) -> Self {
        Self {
            name: name.into(),
            area,
            classic: ClassicParams::default(),
            model: ModelParams::default(),
        }
    }
}
