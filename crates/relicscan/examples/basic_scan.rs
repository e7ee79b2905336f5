//! Scan a synthetic tile and print the ranked detections.
//!
//! ```sh
//! cargo run --example basic_scan
//! ```

use log::LevelFilter;

use relicscan::{
    init_with_level, scan_tile, GeoBounds, GeoTransform, ModelStage, RasterTile, ScanConfig,
};

fn synthetic_tile() -> RasterTile {
    let (width, height) = (256u32, 256u32);
    let n = (width * height) as usize;
    let mut plane = vec![40u8; n];

    // a pair of bright parallel stripes, the classic roadbed signature
    for &top in &[100u32, 108] {
        for y in top..top + 2 {
            for x in 30..220u32 {
                plane[(y * width + x) as usize] = 220;
            }
        }
    }

    RasterTile::new(
        width,
        height,
        vec![plane.clone(), plane.clone(), plane],
        GeoTransform::north_up(11.25, 42.42, 1e-4, 1e-4),
    )
    .expect("valid synthetic tile")
    .with_reference("demo-tile")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(LevelFilter::Info)?;

    let config = ScanConfig::new("demo-area", GeoBounds::new(11.2, 42.4, 11.3, 42.5));
    let stage = ModelStage::from_params(&config.model);

    let tile = synthetic_tile();
    let report = scan_tile(&tile, &config, &stage)?;

    println!(
        "{} detections ({} classic, {} model-stage)",
        report.detections.len(),
        report.classic_count,
        report.model_count
    );
    for d in &report.detections {
        println!(
            "  {:<24} {:.2}  ({:.5}, {:.5})  [{}]",
            d.kind.label(),
            d.confidence,
            d.latitude,
            d.longitude,
            d.source.label()
        );
    }
    Ok(())
}
