//! Conversion of decoded images into the fixed analysis raster.

use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::Array3;
use tracing::debug;

use crate::carbon_pipeline::common::error::{EstimationError, Result};
use crate::carbon_pipeline::raster::types::{Raster, ANALYSIS_SIZE};

/// Resizes any RGB-capable image to the analysis grid and scales it to [0, 1].
///
/// Non-square inputs are stretched, not letterboxed. Resampling uses the
/// bilinear `Triangle` filter so the same input always yields the same raster.
#[derive(Debug, Clone, Copy)]
pub struct RasterPreprocessor {
    size: u32,
    filter: FilterType,
}

impl Default for RasterPreprocessor {
    fn default() -> Self {
        Self {
            size: ANALYSIS_SIZE as u32,
            filter: FilterType::Triangle,
        }
    }
}

impl RasterPreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Converts `image` to a (3, 512, 512) raster.
    ///
    /// # Errors
    ///
    /// * `InvalidDimensions` - the image has zero width or height
    pub fn prepare(&self, image: &DynamicImage) -> Result<Raster> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(EstimationError::InvalidDimensions(
                width as usize,
                height as usize,
            ));
        }

        debug!("Preparing {}x{} image for analysis", width, height);

        // Alpha is dropped and grayscale expanded before resampling
        let rgb = image.to_rgb8();
        let resized = imageops::resize(&rgb, self.size, self.size, self.filter);

        let size = self.size as usize;
        let data = Array3::from_shape_fn((3, size, size), |(c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });

        Raster::from_array(data)
    }
}
