//! NDVI map export module
//!
//! Writes the normalized NDVI map as a single-band 32-bit float TIFF.

mod tiff_writer;
pub mod types;
mod writer;

pub use tiff_writer::TiffNdviWriter;
pub use types::{ExportConfig, ExportConfigBuilder, TiffCompression};
pub use writer::NdviWriter;
