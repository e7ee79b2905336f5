//! Deterministic stand-in for the learned detector.
//!
//! Keeps the pipeline runnable end-to-end (integration tests, offline demos)
//! when no model is available. The pseudo-random stream is seeded explicitly
//! by the caller, so runs are reproducible without hidden global state, and
//! every record carries the simulated source tag.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use relicscan_core::{Detection, DetectionSource, FeatureKind, RasterTile};

/// Seed used when the caller expresses no preference.
pub const DEFAULT_FALLBACK_SEED: u64 = 42;

/// Fabricated positions stay at least this far from the tile border, shrunk
/// on tiles too small to honour it.
const BORDER_INSET_PX: u32 = 100;

/// Kinds the stand-in draws from.
const SIMULATED_KINDS: [FeatureKind; 4] = [
    FeatureKind::BuildingRuins,
    FeatureKind::AncientRoad,
    FeatureKind::RectangularStructure,
    FeatureKind::ArchaeologicalSite,
];

/// Derive a reproducible seed from a tile's reference string (FNV-1a), so
/// distinct tiles get distinct but stable streams. Tiles without a reference
/// share [`DEFAULT_FALLBACK_SEED`].
pub fn seed_for_tile(tile: &RasterTile) -> u64 {
    match tile.reference() {
        Some(reference) => {
            let mut hash = 0xcbf2_9ce4_8422_2325u64;
            for byte in reference.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            }
            hash
        }
        None => DEFAULT_FALLBACK_SEED,
    }
}

/// The deterministic fallback detector.
#[derive(Clone, Copy, Debug)]
pub struct SimulatedDetector {
    seed: u64,
}

impl SimulatedDetector {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fabricate between one and four detections inside the tile.
    pub fn sample(&self, tile: &RasterTile) -> Vec<Detection> {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let inset = BORDER_INSET_PX
            .min(tile.width() / 4)
            .min(tile.height() / 4);
        let count = rng.gen_range(1..=4);

        (0..count)
            .map(|_| {
                let col = rng.gen_range(inset..tile.width() - inset);
                let row = rng.gen_range(inset..tile.height() - inset);
                let (lon, lat) = tile.pixel_to_geo(f64::from(col), f64::from(row));
                let kind = SIMULATED_KINDS[rng.gen_range(0..SIMULATED_KINDS.len())];
                Detection {
                    latitude: lat,
                    longitude: lon,
                    kind,
                    confidence: rng.gen_range(0.5..0.9),
                    source: DetectionSource::ModelFallbackSimulated,
                    description: "simulated stand-in detection (no model loaded)".to_owned(),
                    bounding_box: None,
                    tile_reference: tile.reference().map(str::to_owned),
                }
            })
            .collect()
    }
}

impl crate::Detector for SimulatedDetector {
    fn detect(&self, tile: &RasterTile) -> Result<Vec<Detection>, crate::ModelError> {
        Ok(self.sample(tile))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relicscan_core::GeoTransform;

    fn tile(width: u32, height: u32, reference: Option<&str>) -> RasterTile {
        let n = (width * height) as usize;
        let tile = RasterTile::new(
            width,
            height,
            vec![vec![0u8; n]; 3],
            GeoTransform::north_up(12.0, 42.0, 1e-4, 1e-4),
        )
        .unwrap();
        match reference {
            Some(r) => tile.with_reference(r),
            None => tile,
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_detections() {
        let t = tile(512, 512, Some("scene-0001"));
        let a = SimulatedDetector::new(7).sample(&t);
        let b = SimulatedDetector::new(7).sample(&t);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_usually_differ() {
        let t = tile(512, 512, None);
        let a = SimulatedDetector::new(1).sample(&t);
        let b = SimulatedDetector::new(2).sample(&t);
        // counts alone may coincide; full equality must not
        assert_ne!(a, b);
    }

    #[test]
    fn count_and_confidence_stay_in_range() {
        for seed in 0..32u64 {
            let t = tile(512, 512, None);
            let detections = SimulatedDetector::new(seed).sample(&t);
            assert!((1..=4).contains(&detections.len()));
            for d in &detections {
                assert!((0.5..0.9).contains(&d.confidence));
                assert_eq!(d.source, DetectionSource::ModelFallbackSimulated);
                assert!(SIMULATED_KINDS.contains(&d.kind));
            }
        }
    }

    #[test]
    fn positions_respect_the_border_inset() {
        let t = tile(512, 512, None);
        for d in SimulatedDetector::new(3).sample(&t) {
            // 100 px inset at 1e-4 deg/px from the north-up origin
            assert!(d.longitude >= 12.0 + 100.0 * 1e-4 - 1e-9);
            assert!(d.longitude <= 12.0 + 412.0 * 1e-4 + 1e-9);
            assert!(d.latitude <= 42.0 - 100.0 * 1e-4 + 1e-9);
            assert!(d.latitude >= 42.0 - 412.0 * 1e-4 - 1e-9);
        }
    }

    #[test]
    fn small_tiles_shrink_the_inset_instead_of_panicking() {
        let t = tile(16, 16, None);
        let detections = SimulatedDetector::new(9).sample(&t);
        assert!(!detections.is_empty());
    }

    #[test]
    fn tile_seeds_are_stable_and_reference_sensitive() {
        let a = tile(64, 64, Some("scene-a"));
        let b = tile(64, 64, Some("scene-b"));
        assert_eq!(seed_for_tile(&a), seed_for_tile(&a));
        assert_ne!(seed_for_tile(&a), seed_for_tile(&b));
        assert_eq!(seed_for_tile(&tile(64, 64, None)), DEFAULT_FALLBACK_SEED);
    }
}
