//! Raster module
//!
//! Fixed-shape array types shared by the numeric stages, and the preprocessor
//! that turns a decoded image into the analysis raster.

mod preprocessor;
pub mod types;

pub use preprocessor::RasterPreprocessor;
pub use types::{NdviMap, Raster, VegetationMask, ANALYSIS_SIZE};
