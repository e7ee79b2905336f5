//! Core types for archaeological feature detection over raster tiles.
//!
//! This crate is intentionally small and carries no image-processing code.
//! It defines the tile/geo-transform model shared by every detector, the
//! detection record vocabulary, and the run configuration.

mod config;
mod detection;
mod geo;
mod logger;
mod tile;

pub use config::{ClassicParams, ModelParams, ScanConfig};
pub use detection::{Detection, DetectionSource, FeatureKind, PixelBox};
pub use geo::{planar_distance_deg, GeoBounds, GeoTransform};
pub use tile::{RasterTile, TileError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
