//! Threshold classification of a normalized NDVI map

use tracing::debug;

use crate::carbon_pipeline::raster::{NdviMap, VegetationMask};

/// Normalized NDVI above which a pixel counts as vegetation.
pub const DEFAULT_THRESHOLD: f32 = 0.4;

#[derive(Debug, Clone, Copy, Default)]
pub struct VegetationClassifier;

impl VegetationClassifier {
    /// Marks every cell with `ndvi > threshold`. A cell exactly at the threshold
    /// is not vegetation.
    pub fn classify(ndvi: &NdviMap, threshold: f32) -> VegetationMask {
        let mask = VegetationMask::from_array(ndvi.as_array().mapv(|v| v > threshold));
        debug!(
            threshold,
            vegetation_pixels = mask.count(),
            "Vegetation mask computed"
        );
        mask
    }
}
