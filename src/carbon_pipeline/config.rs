//! Estimation parameters

use crate::carbon_pipeline::classifier::DEFAULT_THRESHOLD;
use crate::carbon_pipeline::common::error::{EstimationError, Result};
use crate::carbon_pipeline::estimator::{DEFAULT_EMISSIONS_FACTOR, DEFAULT_PIXEL_RESOLUTION_M};
use crate::carbon_pipeline::ndvi::DegeneratePolicy;

/// Parameters of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimationConfig {
    /// Normalized NDVI above which a pixel is vegetation
    pub threshold: f32,
    /// Ground-sample distance of one pixel edge, in meters
    pub pixel_resolution_m: f64,
    /// Tonnes CO2e per hectare per unit NDVI
    pub emissions_factor: f64,
    /// Handling of a raw NDVI map with no variance
    pub degenerate_policy: DegeneratePolicy,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            pixel_resolution_m: DEFAULT_PIXEL_RESOLUTION_M,
            emissions_factor: DEFAULT_EMISSIONS_FACTOR,
            degenerate_policy: DegeneratePolicy::default(),
        }
    }
}

impl EstimationConfig {
    pub fn builder() -> EstimationConfigBuilder {
        EstimationConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(EstimationError::ConfigError(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if !(self.pixel_resolution_m.is_finite() && self.pixel_resolution_m > 0.0) {
            return Err(EstimationError::ConfigError(format!(
                "pixel resolution must be a positive number of meters, got {}",
                self.pixel_resolution_m
            )));
        }
        if !(self.emissions_factor.is_finite() && self.emissions_factor >= 0.0) {
            return Err(EstimationError::ConfigError(format!(
                "emissions factor must be finite and non-negative, got {}",
                self.emissions_factor
            )));
        }
        Ok(())
    }
}

/// Builder for EstimationConfig
#[derive(Default)]
pub struct EstimationConfigBuilder {
    threshold: Option<f32>,
    pixel_resolution_m: Option<f64>,
    emissions_factor: Option<f64>,
    degenerate_policy: Option<DegeneratePolicy>,
}

impl EstimationConfigBuilder {
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn pixel_resolution_m(mut self, meters: f64) -> Self {
        self.pixel_resolution_m = Some(meters);
        self
    }

    pub fn emissions_factor(mut self, factor: f64) -> Self {
        self.emissions_factor = Some(factor);
        self
    }

    pub fn degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.degenerate_policy = Some(policy);
        self
    }

    pub fn build(self) -> EstimationConfig {
        let default = EstimationConfig::default();
        EstimationConfig {
            threshold: self.threshold.unwrap_or(default.threshold),
            pixel_resolution_m: self.pixel_resolution_m.unwrap_or(default.pixel_resolution_m),
            emissions_factor: self.emissions_factor.unwrap_or(default.emissions_factor),
            degenerate_policy: self.degenerate_policy.unwrap_or(default.degenerate_policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EstimationConfig::default();
        assert_eq!(config.threshold, 0.4);
        assert_eq!(config.pixel_resolution_m, 10.0);
        assert_eq!(config.emissions_factor, 370.0);
        assert_eq!(config.degenerate_policy, DegeneratePolicy::Fail);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = EstimationConfig::builder()
            .threshold(0.6)
            .pixel_resolution_m(30.0)
            .degenerate_policy(DegeneratePolicy::Midpoint)
            .build();

        assert_eq!(config.threshold, 0.6);
        assert_eq!(config.pixel_resolution_m, 30.0);
        assert_eq!(config.emissions_factor, DEFAULT_EMISSIONS_FACTOR);
        assert_eq!(config.degenerate_policy, DegeneratePolicy::Midpoint);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad = [
            EstimationConfig::builder().threshold(f32::NAN).build(),
            EstimationConfig::builder().pixel_resolution_m(0.0).build(),
            EstimationConfig::builder().pixel_resolution_m(-5.0).build(),
            EstimationConfig::builder().emissions_factor(-1.0).build(),
            EstimationConfig::builder().emissions_factor(f64::INFINITY).build(),
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(EstimationError::ConfigError(_))
            ));
        }
    }
}
