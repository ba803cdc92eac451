//! Area and carbon-credit estimation from a classified NDVI map

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::carbon_pipeline::common::error::{EstimationError, Result};
use crate::carbon_pipeline::raster::{NdviMap, VegetationMask};

/// Ground-sample distance of one pixel edge, in meters (Sentinel-2 visible bands).
pub const DEFAULT_PIXEL_RESOLUTION_M: f64 = 10.0;

/// Tonnes CO2-equivalent per hectare per unit NDVI. Illustrative, not calibrated.
pub const DEFAULT_EMISSIONS_FACTOR: f64 = 370.0;

const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Outcome of one estimation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    pub area_hectares: f64,
    pub carbon_credits_tonnes: f64,
    #[serde(rename = "vegetation_pixels")]
    pub vegetation_pixel_count: usize,
    pub average_ndvi: f64,
}

impl EstimationResult {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EstimationError::EncodeError(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CarbonEstimator {
    pixel_resolution_m: f64,
    emissions_factor: f64,
}

impl Default for CarbonEstimator {
    fn default() -> Self {
        Self {
            pixel_resolution_m: DEFAULT_PIXEL_RESOLUTION_M,
            emissions_factor: DEFAULT_EMISSIONS_FACTOR,
        }
    }
}

impl CarbonEstimator {
    pub fn new(pixel_resolution_m: f64, emissions_factor: f64) -> Self {
        Self {
            pixel_resolution_m,
            emissions_factor,
        }
    }

    pub fn pixel_resolution_m(&self) -> f64 {
        self.pixel_resolution_m
    }

    pub fn emissions_factor(&self) -> f64 {
        self.emissions_factor
    }

    /// Converts the vegetated pixels of `mask` into area and carbon figures.
    ///
    /// With no vegetated pixels the average NDVI, and with it the carbon
    /// figure, is exactly 0.
    ///
    /// # Errors
    ///
    /// * `ShapeMismatch` - `ndvi` and `mask` do not have the same shape
    pub fn estimate(&self, ndvi: &NdviMap, mask: &VegetationMask) -> Result<EstimationResult> {
        let average_ndvi = ndvi.masked_mean(mask)?;
        let vegetation_pixel_count = mask.count();

        let area_m2 = vegetation_pixel_count as f64 * self.pixel_resolution_m.powi(2);
        let area_hectares = area_m2 / SQUARE_METERS_PER_HECTARE;
        let carbon_credits_tonnes = area_hectares * average_ndvi * self.emissions_factor;

        debug!(
            vegetation_pixel_count,
            area_hectares, average_ndvi, carbon_credits_tonnes, "Carbon estimate computed"
        );

        Ok(EstimationResult {
            area_hectares,
            carbon_credits_tonnes,
            vegetation_pixel_count,
            average_ndvi,
        })
    }
}
