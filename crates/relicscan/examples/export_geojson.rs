//! Scan a synthetic tile and print the GeoJSON feature collection.
//!
//! ```sh
//! cargo run --example export_geojson
//! ```

use relicscan::{
    feature_collection, scan_tile, GeoBounds, GeoTransform, ModelStage, RasterTile, ScanConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (width, height) = (512u32, 512u32);
    let n = (width * height) as usize;
    let tile = RasterTile::new(
        width,
        height,
        vec![vec![96u8; n]; 3],
        GeoTransform::north_up(14.48, 40.75, 1e-4, 1e-4),
    )?
    .with_reference("bay-survey-007");

    let config = ScanConfig::new("bay-survey", GeoBounds::new(14.4, 40.7, 14.6, 40.8));
    // quiet tile: the simulated stage keeps the pipeline demonstrable offline
    let stage = ModelStage::from_params(&config.model);

    let report = scan_tile(&tile, &config, &stage)?;
    let collection = feature_collection(&report.detections);
    println!("{}", serde_json::to_string_pretty(&collection)?);
    Ok(())
}
