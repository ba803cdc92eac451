//! Visible-light NDVI approximation
//!
//! Without a near-infrared band the green channel stands in for NIR:
//!
//! `raw = (G - R) / (G + R + 1e-6)`
//!
//! The raw index is then min-max normalized over the whole map to [0, 1].

use ndarray::{Array2, Zip};
use tracing::{debug, warn};

use crate::carbon_pipeline::common::error::{EstimationError, Result};
use crate::carbon_pipeline::raster::{NdviMap, Raster};

/// Guard added to the denominator so black pixels do not divide by zero.
pub const NDVI_EPSILON: f32 = 1e-6;

/// Value of every cell when a flat map is resolved with [`DegeneratePolicy::Midpoint`].
pub const DEGENERATE_MIDPOINT: f32 = 0.5;

/// What to do when the raw index has no variance and min-max scaling is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegeneratePolicy {
    /// Fail with `DegenerateNdvi`
    #[default]
    Fail,
    /// Return a constant 0.5 map and log a warning
    Midpoint,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NdviCalculator {
    policy: DegeneratePolicy,
}

impl NdviCalculator {
    pub fn new(policy: DegeneratePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DegeneratePolicy {
        self.policy
    }

    /// Computes the normalized NDVI-proxy map of `raster`.
    ///
    /// # Errors
    ///
    /// * `DegenerateNdvi` - the raw index is constant and the policy is `Fail`
    pub fn compute(&self, raster: &Raster) -> Result<NdviMap> {
        let raw = raw_index(raster);

        let (min, max) = raw
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        debug!("Raw NDVI range: [{}, {}]", min, max);

        if max == min {
            return match self.policy {
                DegeneratePolicy::Fail => Err(EstimationError::DegenerateNdvi { value: min }),
                DegeneratePolicy::Midpoint => {
                    warn!(
                        value = min,
                        "Raw NDVI is constant, using {} for every pixel", DEGENERATE_MIDPOINT
                    );
                    Ok(NdviMap::from_normalized(Array2::from_elem(
                        raw.dim(),
                        DEGENERATE_MIDPOINT,
                    )))
                }
            };
        }

        let range = max - min;
        let normalized = raw.mapv_into(|v| (v - min) / range);
        Ok(NdviMap::from_normalized(normalized))
    }
}

/// Per-pixel `(G - R) / (G + R + ε)`, in the raw [-1, 1] range.
pub fn raw_index(raster: &Raster) -> Array2<f32> {
    let red = raster.red();
    let green = raster.green();
    Zip::from(&green)
        .and(&red)
        .par_map_collect(|&nir, &red| (nir - red) / (nir + red + NDVI_EPSILON))
}
