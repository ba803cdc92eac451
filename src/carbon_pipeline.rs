//! Vegetation and carbon-credit estimation pipeline
//!
//! A true-color raster is resized to a fixed analysis grid, turned into a
//! visible-light NDVI approximation (green standing in for near-infrared),
//! thresholded into a vegetation mask and converted into area and carbon
//! figures.

pub mod classifier;
pub mod common;
pub mod config;
pub mod estimator;
pub mod export;
pub mod ndvi;
pub mod pipeline;
pub mod raster;
pub mod source;


pub use common::{EstimationError, PipelineTimings, Result};

pub use raster::{NdviMap, Raster, RasterPreprocessor, VegetationMask, ANALYSIS_SIZE};

pub use ndvi::{DegeneratePolicy, NdviCalculator};

pub use classifier::{VegetationClassifier, DEFAULT_THRESHOLD};

pub use estimator::{
    CarbonEstimator, EstimationResult, DEFAULT_EMISSIONS_FACTOR, DEFAULT_PIXEL_RESOLUTION_M,
};

pub use config::{EstimationConfig, EstimationConfigBuilder};

pub use source::{
    AreaOfInterest, BoundingBox, DecodedImage, ImageDescriptor, ImageSource, LocalImageSource,
    RawPixels, SentinelHubConfig, SentinelHubSource, TimeRange,
};

pub use export::{ExportConfig, NdviWriter, TiffCompression, TiffNdviWriter};

pub use pipeline::CarbonPipeline;
