//! NDVI export configuration types

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

/// Configuration for writing an NDVI map
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Compression method to use
    pub compression: TiffCompression,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::DeflateBalanced,
        }
    }
}

impl ExportConfig {
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder::default()
    }
}

/// Builder for ExportConfig
#[derive(Default)]
pub struct ExportConfigBuilder {
    compression: Option<TiffCompression>,
}

impl ExportConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn build(self) -> ExportConfig {
        let default = ExportConfig::default();
        ExportConfig {
            compression: self.compression.unwrap_or(default.compression),
        }
    }
}
