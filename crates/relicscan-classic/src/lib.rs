//! Heuristic pattern detectors over one raster tile.
//!
//! Four independent algorithms (vegetation-index anomalies, straight road
//! candidates with a parallel-pair refinement, rectangular enclosures,
//! circular enclosures), each emitting [`Detection`] records already mapped
//! to geographic coordinates. No learned model is involved here.

mod raster;
pub mod roads;
pub mod shapes;
pub mod vegetation;

use log::{debug, info};

use relicscan_core::{ClassicParams, Detection, RasterTile, TileError};

/// Runs every heuristic algorithm over a tile.
pub struct ClassicDetector {
    params: ClassicParams,
}

impl ClassicDetector {
    pub fn new(params: ClassicParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &ClassicParams {
        &self.params
    }

    /// Run all algorithms and collect their detections.
    ///
    /// Fails fast on tiles with fewer than three bands; a missing
    /// near-infrared band only skips the vegetation index.
    pub fn detect(&self, tile: &RasterTile) -> Result<Vec<Detection>, TileError> {
        let [red, green, blue] = tile.rgb_bands()?;
        let gray = raster::luma_composite(red, green, blue, tile.width(), tile.height());

        let mut detections = Vec::new();

        match tile.nir_band() {
            Some(nir) => {
                detections.extend(vegetation::detect(nir, red, tile, &self.params));
            }
            None => debug!("no near-infrared band, skipping vegetation index"),
        }

        detections.extend(roads::detect(&gray, tile, &self.params));
        detections.extend(shapes::detect(&gray, tile));

        info!(
            "classic detectors found {} candidates on {}x{} tile",
            detections.len(),
            tile.width(),
            tile.height()
        );
        Ok(detections)
    }
}
