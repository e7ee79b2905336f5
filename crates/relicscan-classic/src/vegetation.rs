//! Vegetation-index anomaly detector.
//!
//! Buried masonry alters subsurface moisture, which shows up as patches whose
//! normalized-difference index sits between bare soil and healthy vegetation.
//! The detector thresholds that band, closes small gaps and reports every
//! connected component of consequence.

use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;
use imageproc::region_labelling::{connected_components, Connectivity};
use log::debug;

use relicscan_core::{ClassicParams, Detection, DetectionSource, FeatureKind, RasterTile};

/// Components smaller than this many pixels are noise, not anomalies.
pub const MIN_ANOMALY_PIXELS: usize = 10;

/// L-inf closing radius; 2 gives the classic 5x5 square structuring element.
const CLOSING_RADIUS: u8 = 2;

/// Per-pixel normalized difference index `(nir - red) / (nir + red)`.
///
/// Defined as 0 where `nir + red` is zero, clipped to `[-1, 1]`.
pub fn index(nir: &[u8], red: &[u8]) -> Vec<f32> {
    nir.iter()
        .zip(red)
        .map(|(&n, &r)| {
            let n = f32::from(n);
            let r = f32::from(r);
            let denom = n + r;
            if denom == 0.0 {
                0.0
            } else {
                ((n - r) / denom).clamp(-1.0, 1.0)
            }
        })
        .collect()
}

/// Binary mask of index values strictly inside the anomaly band.
pub(crate) fn anomaly_mask(index: &[f32], lower: f32, upper: f32, width: u32, height: u32) -> GrayImage {
    let data: Vec<u8> = index
        .iter()
        .map(|&v| if v > lower && v < upper { 255 } else { 0 })
        .collect();
    GrayImage::from_raw(width, height, data).expect("index length matches tile dimensions")
}

/// Run the detector over the near-infrared and red planes of one tile.
pub fn detect(nir: &[u8], red: &[u8], tile: &RasterTile, params: &ClassicParams) -> Vec<Detection> {
    let ndvi = index(nir, red);
    let mask = anomaly_mask(
        &ndvi,
        params.vegetation_lower,
        params.vegetation_threshold,
        tile.width(),
        tile.height(),
    );
    let closed = close(&mask, Norm::LInf, CLOSING_RADIUS);
    let labelled = connected_components(&closed, Connectivity::Eight, Luma([0u8]));

    // label -> (pixel count, sum of cols, sum of rows)
    let mut components: HashMap<u32, (usize, f64, f64)> = HashMap::new();
    for (x, y, label) in labelled.enumerate_pixels() {
        if label[0] == 0 {
            continue;
        }
        let entry = components.entry(label[0]).or_insert((0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += f64::from(x);
        entry.2 += f64::from(y);
    }

    let mut detections = Vec::new();
    let mut labels: Vec<_> = components.into_iter().collect();
    labels.sort_by_key(|(label, _)| *label);

    for (_, (count, sum_col, sum_row)) in labels {
        if count < MIN_ANOMALY_PIXELS {
            continue;
        }
        let col = sum_col / count as f64;
        let row = sum_row / count as f64;
        let (lon, lat) = tile.pixel_to_geo(col, row);
        let confidence = (0.3 + count as f32 / 1000.0).min(0.9);
        detections.push(Detection {
            latitude: lat,
            longitude: lon,
            kind: FeatureKind::VegetationAnomaly,
            confidence,
            source: DetectionSource::ClassicVegetationIndex,
            description: format!("vegetation-index anomaly over {count} px"),
            bounding_box: None,
            tile_reference: tile.reference().map(str::to_owned),
        });
    }

    debug!("vegetation index produced {} anomalies", detections.len());
    detections
}
