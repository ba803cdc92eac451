use tracing::{info, instrument};

use crate::carbon_pipeline::{
    classifier::VegetationClassifier,
    common::{error::Result, timing::PipelineTimings},
    config::EstimationConfig,
    estimator::{CarbonEstimator, EstimationResult},
    ndvi::NdviCalculator,
    raster::{NdviMap, RasterPreprocessor},
    source::{DecodedImage, ImageDescriptor, ImageSource, LocalImageSource},
};

/// Image → raster → NDVI map → vegetation mask → estimate.
pub struct CarbonPipeline<S: ImageSource> {
    source: S,
    preprocessor: RasterPreprocessor,
    config: EstimationConfig,
}

impl CarbonPipeline<LocalImageSource> {
    pub fn new(config: EstimationConfig) -> Result<Self> {
        Self::with_source(LocalImageSource, config)
    }
}

impl<S: ImageSource> CarbonPipeline<S> {
    pub fn with_source(source: S, config: EstimationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            preprocessor: RasterPreprocessor::new(),
            config,
        })
    }

    /// Resolves `descriptor` through the image source and runs every stage on it.
    pub fn run(&self, descriptor: &ImageDescriptor) -> Result<(EstimationResult, NdviMap)> {
        let (result, ndvi, timings) = self.run_with_timings(descriptor)?;
        timings.log_summary();
        Ok((result, ndvi))
    }

    /// Runs the numeric stages on an image that is already decoded.
    pub fn run_image(&self, image: &DecodedImage) -> Result<(EstimationResult, NdviMap)> {
        let mut timings = PipelineTimings::new();
        let (result, ndvi) = self.estimate_image(image, &mut timings)?;
        timings.log_summary();
        Ok((result, ndvi))
    }

    #[instrument(skip(self, descriptor))]
    pub fn run_with_timings(
        &self,
        descriptor: &ImageDescriptor,
    ) -> Result<(EstimationResult, NdviMap, PipelineTimings)> {
        info!("Starting carbon estimation");
        let mut timings = PipelineTimings::new();

        let image = {
            let _span = tracing::info_span!("fetch_image").entered();
            timings.measure("fetch_image", || self.source.fetch(descriptor))?
        };

        let (result, ndvi) = self.estimate_image(&image, &mut timings)?;
        Ok((result, ndvi, timings))
    }

    fn estimate_image(
        &self,
        image: &DecodedImage,
        timings: &mut PipelineTimings,
    ) -> Result<(EstimationResult, NdviMap)> {
        let raster = {
            let _span = tracing::info_span!(
                "prepare_raster",
                width = image.width(),
                height = image.height()
            )
            .entered();
            timings.measure("prepare_raster", || self.preprocessor.prepare(image))?
        };

        let ndvi = {
            let _span = tracing::info_span!("compute_ndvi").entered();
            let calculator = NdviCalculator::new(self.config.degenerate_policy);
            timings.measure("compute_ndvi", || calculator.compute(&raster))?
        };

        let mask = {
            let _span = tracing::info_span!("classify", threshold = self.config.threshold).entered();
            timings.measure("classify", || {
                VegetationClassifier::classify(&ndvi, self.config.threshold)
            })
        };

        let result = {
            let _span = tracing::info_span!("estimate_carbon").entered();
            let estimator =
                CarbonEstimator::new(self.config.pixel_resolution_m, self.config.emissions_factor);
            timings.measure("estimate_carbon", || estimator.estimate(&ndvi, &mask))?
        };

        info!(
            vegetation_pixels = result.vegetation_pixel_count,
            area_hectares = result.area_hectares,
            carbon_credits_tonnes = result.carbon_credits_tonnes,
            "Estimation complete"
        );
        Ok((result, ndvi))
    }

    pub fn config(&self) -> &EstimationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EstimationConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
