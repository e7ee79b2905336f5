//! Learned-model detection stage.
//!
//! The capability interface is the [`Detector`] trait with two concrete
//! variants: an ONNX-backed object detector (cargo feature `onnx`) and a
//! deterministic [`SimulatedDetector`] stand-in. The composing code selects
//! the variant explicitly through [`ModelStage`]; there is no import-success
//! probing, and the fallback is a first-class, testable strategy.

#[cfg(feature = "onnx")]
mod onnx;
mod simulated;

#[cfg(feature = "onnx")]
pub use onnx::OnnxDetector;
pub use simulated::{seed_for_tile, SimulatedDetector, DEFAULT_FALLBACK_SEED};

use log::warn;

use relicscan_core::{Detection, ModelParams, RasterTile, TileError};

/// Errors raised by model-backed detectors.
///
/// None of these escape [`ModelStage::detect`]; they exist so a detector can
/// report *why* the stage degraded to simulation.
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Tile(#[from] TileError),
}

/// Object-detection capability over one raster tile.
pub trait Detector: Send + Sync {
    /// Emit detections in geographic coordinates for one tile.
    fn detect(&self, tile: &RasterTile) -> Result<Vec<Detection>, ModelError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// The model stage of the pipeline: a primary detector plus the simulated
/// fallback it degrades to.
///
/// Degradation is local and loud-but-not-fatal: a load failure selects the
/// fallback for the whole run, an inference failure substitutes it for the
/// affected tile only. Either way every fabricated record is tagged
/// [`relicscan_core::DetectionSource::ModelFallbackSimulated`], so consumers
/// can never mistake it for a real inference result.
pub struct ModelStage {
    primary: Option<Box<dyn Detector>>,
    fallback: SimulatedDetector,
}

impl ModelStage {
    /// Compose a stage from an explicit primary detector and fallback.
    pub fn new(primary: Option<Box<dyn Detector>>, fallback: SimulatedDetector) -> Self {
        Self { primary, fallback }
    }

    /// A stage that only ever simulates.
    pub fn simulated(seed: u64) -> Self {
        Self::new(None, SimulatedDetector::new(seed))
    }

    /// Select the stage from run parameters.
    ///
    /// Tries the configured ONNX model when the `onnx` feature is compiled
    /// in; every failure path logs a warning and lands on the simulated
    /// fallback.
    pub fn from_params(params: &ModelParams) -> Self {
        #[cfg(feature = "onnx")]
        if let Some(path) = &params.model_path {
            match OnnxDetector::load(path, params) {
                Ok(detector) => {
                    return Self::new(
                        Some(Box::new(detector)),
                        SimulatedDetector::new(params.fallback_seed),
                    );
                }
                Err(err) => warn!(
                    "could not load model {}: {err}; degrading to simulated detections",
                    path.display()
                ),
            }
        }

        #[cfg(not(feature = "onnx"))]
        if params.model_path.is_some() {
            warn!("built without the `onnx` feature; degrading to simulated detections");
        }

        Self::simulated(params.fallback_seed)
    }

    /// True when a real model is loaded behind this stage.
    pub fn is_model_backed(&self) -> bool {
        self.primary.is_some()
    }

    /// Run the stage over one tile. Never fails: inference errors degrade to
    /// the simulated fallback for this tile.
    pub fn detect(&self, tile: &RasterTile) -> Vec<Detection> {
        if let Some(primary) = &self.primary {
            match primary.detect(tile) {
                Ok(detections) => return detections,
                Err(err) => warn!(
                    "{} inference failed: {err}; substituting simulated detections for this tile",
                    primary.name()
                ),
            }
        }
        self.fallback.sample(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relicscan_core::{DetectionSource, GeoTransform};

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn detect(&self, _tile: &RasterTile) -> Result<Vec<Detection>, ModelError> {
            Err(ModelError::Inference("tensor shape mismatch".to_owned()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn tile() -> RasterTile {
        let n = 512 * 512;
        RasterTile::new(
            512,
            512,
            vec![vec![0u8; n]; 3],
            GeoTransform::north_up(12.0, 42.0, 1e-4, 1e-4),
        )
        .unwrap()
    }

    #[test]
    fn simulated_stage_is_not_model_backed() {
        let stage = ModelStage::simulated(7);
        assert!(!stage.is_model_backed());
    }

    #[test]
    fn inference_failure_degrades_to_simulation() {
        let stage = ModelStage::new(Some(Box::new(FailingDetector)), SimulatedDetector::new(7));
        let detections = stage.detect(&tile());
        assert!(!detections.is_empty());
        assert!(detections
            .iter()
            .all(|d| d.source == DetectionSource::ModelFallbackSimulated));
    }

    #[test]
    fn from_params_without_model_path_simulates() {
        let stage = ModelStage::from_params(&ModelParams::default());
        assert!(!stage.is_model_backed());
        let detections = stage.detect(&tile());
        assert!(detections
            .iter()
            .all(|d| d.source == DetectionSource::ModelFallbackSimulated));
    }
}
