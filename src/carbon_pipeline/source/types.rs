//! Image descriptor and area-of-interest types

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::carbon_pipeline::common::error::{EstimationError, Result};

/// Decoded pixel buffer of arbitrary size handed to the preprocessor.
pub type DecodedImage = DynamicImage;

/// 2024-12-01T00:00:00Z
const DEFAULT_TIME_FROM: i64 = 1_733_011_200;
/// 2025-01-31T23:59:59Z
const DEFAULT_TIME_TO: i64 = 1_738_367_999;

/// Default maximum cloud cover, in percent.
pub const DEFAULT_MAX_CLOUD_COVERAGE: f32 = 20.0;

/// What to load the image from.
#[derive(Debug, Clone)]
pub enum ImageDescriptor {
    /// Image file on disk, any format the decoder recognizes
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, TIFF)
    Encoded(Vec<u8>),
    /// Uncompressed 8-bit pixel buffer
    Pixels(RawPixels),
    /// Already decoded image
    Decoded(DecodedImage),
    /// Region to acquire from a remote imagery provider
    AreaOfInterest(AreaOfInterest),
}

impl From<PathBuf> for ImageDescriptor {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageDescriptor {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<RawPixels> for ImageDescriptor {
    fn from(pixels: RawPixels) -> Self {
        Self::Pixels(pixels)
    }
}

impl From<DecodedImage> for ImageDescriptor {
    fn from(image: DecodedImage) -> Self {
        Self::Decoded(image)
    }
}

impl From<AreaOfInterest> for ImageDescriptor {
    fn from(area: AreaOfInterest) -> Self {
        Self::AreaOfInterest(area)
    }
}

/// Interleaved 8-bit pixels, row-major, with 1 (gray), 3 (RGB) or 4 (RGBA) channels.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPixels {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl RawPixels {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Wraps the buffer into a decoded image after checking its size.
    pub fn into_image(self) -> Result<DecodedImage> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(EstimationError::InvalidDimensions(
                width as usize,
                height as usize,
            ));
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(self.channels as usize))
            .ok_or_else(|| {
                EstimationError::InvalidImage(format!(
                    "{}x{}x{} pixel buffer is too large",
                    width, height, self.channels
                ))
            })?;
        if self.data.len() != expected {
            return Err(EstimationError::InvalidImage(format!(
                "pixel buffer holds {} bytes, {}x{}x{} needs {}",
                self.data.len(),
                width,
                height,
                self.channels,
                expected
            )));
        }

        let image = match self.channels {
            1 => GrayImage::from_raw(width, height, self.data).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(width, height, self.data).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(width, height, self.data).map(DynamicImage::ImageRgba8),
            n => {
                return Err(EstimationError::InvalidImage(format!(
                    "unsupported channel count {}",
                    n
                )));
            }
        };

        image.ok_or_else(|| EstimationError::InvalidImage("pixel buffer too small".to_string()))
    }
}

/// WGS84 bounding box, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    pub fn validate(&self) -> Result<()> {
        let lon_ok = |v: f64| (-180.0..=180.0).contains(&v);
        let lat_ok = |v: f64| (-90.0..=90.0).contains(&v);
        if !(lon_ok(self.min_lon) && lon_ok(self.max_lon)) {
            return Err(EstimationError::ConfigError(format!(
                "longitude out of range in bbox {:?}",
                self.to_array()
            )));
        }
        if !(lat_ok(self.min_lat) && lat_ok(self.max_lat)) {
            return Err(EstimationError::ConfigError(format!(
                "latitude out of range in bbox {:?}",
                self.to_array()
            )));
        }
        if self.min_lon >= self.max_lon || self.min_lat >= self.max_lat {
            return Err(EstimationError::ConfigError(format!(
                "bbox minimum must be below maximum: {:?}",
                self.to_array()
            )));
        }
        Ok(())
    }
}

/// Acquisition window, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            from: DateTime::from_timestamp(DEFAULT_TIME_FROM, 0).unwrap_or_default(),
            to: DateTime::from_timestamp(DEFAULT_TIME_TO, 0).unwrap_or_default(),
        }
    }
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    pub fn from_rfc3339(from: &str, to: &str) -> Result<Self> {
        let parse = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| EstimationError::ConfigError(format!("invalid timestamp {}: {}", s, e)))
        };
        Ok(Self::new(parse(from)?, parse(to)?))
    }

    /// `(from, to)` as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_rfc3339(&self) -> (String, String) {
        (
            self.from.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.to.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.from >= self.to {
            return Err(EstimationError::ConfigError(format!(
                "time range start {} is not before end {}",
                self.from, self.to
            )));
        }
        Ok(())
    }
}

/// Region and acquisition constraints for a remote imagery request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaOfInterest {
    pub bbox: BoundingBox,
    pub time_range: TimeRange,
    /// Maximum scene cloud cover, in percent
    pub max_cloud_coverage: f32,
}

impl AreaOfInterest {
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            time_range: TimeRange::default(),
            max_cloud_coverage: DEFAULT_MAX_CLOUD_COVERAGE,
        }
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    pub fn with_max_cloud_coverage(mut self, percent: f32) -> Self {
        self.max_cloud_coverage = percent;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.bbox.validate()?;
        self.time_range.validate()?;
        if !(0.0..=100.0).contains(&self.max_cloud_coverage) {
            return Err(EstimationError::ConfigError(format!(
                "cloud coverage must be within 0-100%, got {}",
                self.max_cloud_coverage
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_pixels_channel_layouts() {
        let gray = RawPixels::new(2, 2, 1, vec![0, 64, 128, 255]).into_image().unwrap();
        assert!(matches!(gray, DynamicImage::ImageLuma8(_)));

        let rgb = RawPixels::new(2, 1, 3, vec![0; 6]).into_image().unwrap();
        assert_eq!((rgb.width(), rgb.height()), (2, 1));

        let rgba = RawPixels::new(1, 1, 4, vec![1, 2, 3, 4]).into_image().unwrap();
        assert!(matches!(rgba, DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn test_raw_pixels_rejects_bad_buffers() {
        let short = RawPixels::new(4, 4, 3, vec![0; 10]).into_image().unwrap_err();
        assert!(matches!(short, EstimationError::InvalidImage(_)));

        let empty = RawPixels::new(0, 4, 3, vec![]).into_image().unwrap_err();
        assert!(matches!(empty, EstimationError::InvalidDimensions(0, 4)));

        let two_channels = RawPixels::new(1, 1, 2, vec![0, 0]).into_image().unwrap_err();
        assert!(matches!(two_channels, EstimationError::InvalidImage(_)));
    }

    #[test]
    fn test_raw_pixels_oversized_dimensions() {
        let err = RawPixels::new(u32::MAX, u32::MAX, 4, vec![0; 4])
            .into_image()
            .unwrap_err();
        assert!(matches!(err, EstimationError::InvalidImage(_)));
    }

    #[test]
    fn test_default_time_range_formatting() {
        let (from, to) = TimeRange::default().to_rfc3339();
        assert_eq!(from, "2024-12-01T00:00:00Z");
        assert_eq!(to, "2025-01-31T23:59:59Z");
    }

    #[test]
    fn test_time_range_parsing() {
        let range = TimeRange::from_rfc3339("2025-06-06T00:00:00Z", "2025-06-06T23:59:00+00:00").unwrap();
        assert!(range.validate().is_ok());
        assert!(TimeRange::from_rfc3339("yesterday", "today").is_err());

        let reversed = TimeRange::new(range.to, range.from);
        assert!(reversed.validate().is_err());
    }

    #[test]
    fn test_area_of_interest_validation() {
        let bbox = BoundingBox::new(-60.1, -3.2, -59.9, -3.0);
        let area = AreaOfInterest::new(bbox);
        assert!(area.validate().is_ok());
        assert_eq!(area.max_cloud_coverage, DEFAULT_MAX_CLOUD_COVERAGE);

        assert!(AreaOfInterest::new(BoundingBox::new(10.0, 0.0, 5.0, 1.0)).validate().is_err());
        assert!(AreaOfInterest::new(BoundingBox::new(0.0, -95.0, 1.0, 1.0)).validate().is_err());
        assert!(AreaOfInterest::new(BoundingBox::new(179.0, 0.0, 181.0, 1.0)).validate().is_err());
        assert!(area.with_max_cloud_coverage(120.0).validate().is_err());
    }
}
