//! Image source for data already on this machine.

use std::path::Path;

use tracing::debug;

use crate::carbon_pipeline::common::error::{EstimationError, Result};
use crate::carbon_pipeline::source::reader::ImageSource;
use crate::carbon_pipeline::source::types::{DecodedImage, ImageDescriptor};

/// Loads images from files, encoded bytes and raw pixel buffers.
///
/// Area-of-interest descriptors need a remote provider and are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalImageSource;

impl LocalImageSource {
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        debug!("Decoding image, {} bytes", bytes.len());
        image::load_from_memory(bytes).map_err(|e| EstimationError::InvalidImage(e.to_string()))
    }

    pub fn read_file(&self, path: &Path) -> Result<DecodedImage> {
        let bytes = std::fs::read(path).map_err(|e| {
            EstimationError::InputReadError(format!("{}: {}", path.display(), e))
        })?;
        self.decode(&bytes)
    }
}

impl ImageSource for LocalImageSource {
    fn fetch(&self, descriptor: &ImageDescriptor) -> Result<DecodedImage> {
        match descriptor {
            ImageDescriptor::Path(path) => self.read_file(path),
            ImageDescriptor::Encoded(bytes) => self.decode(bytes),
            ImageDescriptor::Pixels(pixels) => pixels.clone().into_image(),
            ImageDescriptor::Decoded(image) => Ok(image.clone()),
            ImageDescriptor::AreaOfInterest(_) => Err(EstimationError::ConfigError(
                "area-of-interest descriptors need a remote image source".to_string(),
            )),
        }
    }
}
