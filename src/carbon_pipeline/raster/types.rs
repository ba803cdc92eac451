//! Fixed-shape array types flowing between pipeline stages

use ndarray::{Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;

use crate::carbon_pipeline::common::error::{EstimationError, Result};

/// Side length, in pixels, of the square analysis grid.
pub const ANALYSIS_SIZE: usize = 512;

/// Channel indices inside a [`Raster`].
pub const RED: usize = 0;
pub const GREEN: usize = 1;
pub const BLUE: usize = 2;

/// Normalized RGB raster of shape (3, height, width), every sample in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    data: Array3<f32>,
}

impl Raster {
    /// Wraps a channel-first array after checking its shape and value range.
    pub fn from_array(data: Array3<f32>) -> Result<Self> {
        let (channels, height, width) = data.dim();
        if channels != 3 {
            return Err(EstimationError::InvalidImage(format!(
                "expected 3 channels, got {}",
                channels
            )));
        }
        if height == 0 || width == 0 {
            return Err(EstimationError::InvalidDimensions(width, height));
        }
        if let Some(bad) = data.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(EstimationError::InvalidImage(format!(
                "raster sample {} outside [0, 1]",
                bad
            )));
        }
        Ok(Self { data })
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn channel(&self, index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), index)
    }

    pub fn red(&self) -> ArrayView2<'_, f32> {
        self.channel(RED)
    }

    pub fn green(&self) -> ArrayView2<'_, f32> {
        self.channel(GREEN)
    }

    pub fn blue(&self) -> ArrayView2<'_, f32> {
        self.channel(BLUE)
    }

    pub fn as_array(&self) -> &Array3<f32> {
        &self.data
    }
}

/// Normalized vegetation-index map of shape (height, width).
#[derive(Debug, Clone, PartialEq)]
pub struct NdviMap {
    values: Array2<f32>,
}

impl NdviMap {
    /// Wraps an already normalized map; every value must be finite and in [0, 1].
    pub fn from_array(values: Array2<f32>) -> Result<Self> {
        if let Some(bad) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(EstimationError::InvalidImage(format!(
                "NDVI value {} outside [0, 1]",
                bad
            )));
        }
        Ok(Self { values })
    }

    pub(crate) fn from_normalized(values: Array2<f32>) -> Self {
        Self { values }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.values.get((row, col)).copied()
    }

    pub fn min(&self) -> f32 {
        self.values.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn into_array(self) -> Array2<f32> {
        self.values
    }

    /// Sum of the values selected by `mask`.
    ///
    /// Rows are reduced in parallel into f64 partial sums which are then added
    /// in row order, so the result does not depend on thread scheduling.
    pub fn masked_sum(&self, mask: &VegetationMask) -> Result<f64> {
        self.check_shape(mask)?;
        let selected = mask.as_array();
        let row_sums: Vec<f64> = (0..self.values.nrows())
            .into_par_iter()
            .map(|row| {
                self.values
                    .row(row)
                    .iter()
                    .zip(selected.row(row).iter())
                    .filter(|(_, keep)| **keep)
                    .map(|(v, _)| *v as f64)
                    .sum::<f64>()
            })
            .collect();
        Ok(row_sums.iter().sum())
    }

    /// Mean of the values selected by `mask`; exactly 0 when nothing is selected.
    pub fn masked_mean(&self, mask: &VegetationMask) -> Result<f64> {
        let sum = self.masked_sum(mask)?;
        let count = mask.count();
        if count == 0 {
            return Ok(0.0);
        }
        Ok(sum / count as f64)
    }

    fn check_shape(&self, mask: &VegetationMask) -> Result<()> {
        if self.shape() != mask.shape() {
            return Err(EstimationError::ShapeMismatch {
                expected: self.shape(),
                found: mask.shape(),
            });
        }
        Ok(())
    }
}

/// Boolean vegetation classification, same shape as the map it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct VegetationMask {
    cells: Array2<bool>,
}

impl VegetationMask {
    pub fn from_array(cells: Array2<bool>) -> Self {
        Self { cells }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    /// Number of cells classified as vegetation.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        self.cells.get((row, col)).copied()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.cells
    }
}
