//! Entry-point crate for the relicscan detection pipeline.
//!
//! One tile goes in, one deduplicated confidence-ranked detection list comes
//! out. The heavy lifting lives in the member crates; this facade wires the
//! classic detector, the model stage and the fusion engine together and
//! re-exports the public vocabulary.
//!
//! ```no_run
//! use relicscan::{scan_tile, GeoBounds, ModelStage, RasterTile, ScanConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let tile: RasterTile = unimplemented!();
//! let config = ScanConfig::new("etruria-north", GeoBounds::new(11.0, 42.0, 11.5, 42.5));
//! let stage = ModelStage::from_params(&config.model);
//! let report = scan_tile(&tile, &config, &stage)?;
//! for detection in &report.detections {
//!     println!("{} {:.2}", detection.kind.label(), detection.confidence);
//! }
//! # Ok(())
//! # }
//! ```

mod scan;

pub use scan::{scan_tile, ScanError, ScanReport};

pub use relicscan_classic::ClassicDetector;
pub use relicscan_core::{
    init_with_level, ClassicParams, Detection, DetectionSource, FeatureKind, GeoBounds,
    GeoTransform, ModelParams, PixelBox, RasterTile, ScanConfig, TileError,
};
pub use relicscan_fuse::{
    feature_collection, flat_records, fuse, fuse_with, FeatureCollection, FlatRecord, FuseParams,
};
pub use relicscan_model::{
    seed_for_tile, Detector, ModelError, ModelStage, SimulatedDetector, DEFAULT_FALLBACK_SEED,
};

#[cfg(feature = "onnx")]
pub use relicscan_model::OnnxDetector;

#[cfg(feature = "tracing")]
pub use relicscan_core::init_tracing;
