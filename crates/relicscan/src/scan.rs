use log::info;

use relicscan_classic::ClassicDetector;
use relicscan_core::{Detection, RasterTile, ScanConfig, TileError};
use relicscan_fuse::fuse;
use relicscan_model::ModelStage;

/// Errors that abort a scan. Model failures never land here; the model
/// stage degrades to its simulated fallback instead.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Tile(#[from] TileError),
}

/// Outcome of scanning one tile.
#[derive(Clone, Debug)]
pub struct ScanReport {
    /// Fused, deduplicated, confidence-ranked detections.
    pub detections: Vec<Detection>,
    /// Detections the classic heuristics contributed before fusion.
    pub classic_count: usize,
    /// Detections the model stage contributed before fusion.
    pub model_count: usize,
}

/// Run the full pipeline over one tile: classic heuristics, model stage,
/// fusion. The two detectors share no mutable state; only the fusion stage
/// needs both their outputs.
pub fn scan_tile(
    tile: &RasterTile,
    config: &ScanConfig,
    model: &ModelStage,
) -> Result<ScanReport, ScanError> {
    info!(
        "scanning {} ({}x{} px, {} bands)",
        tile.reference().unwrap_or(&config.name),
        tile.width(),
        tile.height(),
        tile.band_count()
    );

    let classic = ClassicDetector::new(config.classic.clone()).detect(tile)?;
    info!("classic detectors: {} candidates", classic.len());

    let inferred = model.detect(tile);
    info!(
        "model stage ({}): {} candidates",
        if model.is_model_backed() {
            "model-backed"
        } else {
            "simulated"
        },
        inferred.len()
    );

    let classic_count = classic.len();
    let model_count = inferred.len();
    let detections = fuse(classic, inferred);
    info!("fused into {} unique detections", detections.len());

    Ok(ScanReport {
        detections,
        classic_count,
        model_count,
    })
}
