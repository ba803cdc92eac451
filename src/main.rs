use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use vegecarbon_rs::carbon_pipeline::{
    AreaOfInterest, BoundingBox, CarbonPipeline, DegeneratePolicy, EstimationConfig,
    EstimationResult, ExportConfig, ImageDescriptor, ImageSource, NdviMap, SentinelHubSource,
    TiffNdviWriter, TimeRange,
};
use vegecarbon_rs::logger;

#[derive(Parser)]
#[command(name = "vegecarbon")]
#[command(author, version, about = "Vegetation area and carbon-credit estimate from RGB imagery", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate from a local image file
    Estimate {
        /// Input image (PNG, JPEG or TIFF)
        input: PathBuf,

        #[command(flatten)]
        estimation: EstimationArgs,
    },
    /// Fetch a Sentinel-2 true-color image and estimate from it
    ///
    /// Credentials are read from SENTINEL_HUB_CLIENT_ID and SENTINEL_HUB_CLIENT_SECRET.
    Fetch {
        /// Bounding box in WGS84 degrees
        #[arg(long, required = true, num_args = 4, value_names = ["MIN_LON", "MIN_LAT", "MAX_LON", "MAX_LAT"], allow_hyphen_values = true)]
        bbox: Vec<f64>,

        /// Start of the acquisition window (RFC 3339)
        #[arg(long, default_value = "2024-12-01T00:00:00Z")]
        from: String,

        /// End of the acquisition window (RFC 3339)
        #[arg(long, default_value = "2025-01-31T23:59:59Z")]
        to: String,

        /// Maximum cloud cover, in percent
        #[arg(long, default_value_t = 20.0)]
        max_cloud: f32,

        /// Also save the fetched image to this path
        #[arg(long)]
        save: Option<PathBuf>,

        #[command(flatten)]
        estimation: EstimationArgs,
    },
}

#[derive(Args)]
struct EstimationArgs {
    /// Normalized NDVI above which a pixel is vegetation
    #[arg(long, default_value_t = 0.4)]
    threshold: f32,

    /// Ground-sample distance in meters per pixel
    #[arg(long, default_value_t = 10.0)]
    resolution: f64,

    /// Tonnes CO2e per hectare per unit NDVI
    #[arg(long, default_value_t = 370.0)]
    emissions_factor: f64,

    /// Behaviour when the image has no NDVI variance
    #[arg(long, value_enum, default_value_t = DegenerateArg::Fail)]
    degenerate: DegenerateArg,

    /// Write the normalized NDVI map to this TIFF file
    #[arg(long)]
    ndvi_tiff: Option<PathBuf>,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DegenerateArg {
    Fail,
    Midpoint,
}

impl EstimationArgs {
    fn config(&self) -> EstimationConfig {
        let policy = match self.degenerate {
            DegenerateArg::Fail => DegeneratePolicy::Fail,
            DegenerateArg::Midpoint => DegeneratePolicy::Midpoint,
        };
        EstimationConfig::builder()
            .threshold(self.threshold)
            .pixel_resolution_m(self.resolution)
            .emissions_factor(self.emissions_factor)
            .degenerate_policy(policy)
            .build()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(if cli.verbose { "debug" } else { "info" });

    match cli.command {
        Commands::Estimate { input, estimation } => {
            info!(input = %input.display(), "Estimating from local image");
            let pipeline = CarbonPipeline::new(estimation.config())?;
            let (result, ndvi) = pipeline
                .run(&ImageDescriptor::Path(input.clone()))
                .with_context(|| format!("Estimation failed for {}", input.display()))?;
            report(&estimation, &result, &ndvi)?;
        }
        Commands::Fetch {
            bbox,
            from,
            to,
            max_cloud,
            save,
            estimation,
        } => {
            let area = AreaOfInterest::new(BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]))
                .with_time_range(TimeRange::from_rfc3339(&from, &to)?)
                .with_max_cloud_coverage(max_cloud);

            estimation.config().validate()?;

            let source = SentinelHubSource::from_env()
                .context("Sentinel Hub client could not be configured")?;
            let image = source.fetch(&area.into()).map_err(|e| {
                if e.is_acquisition() {
                    warn!("Check credentials, bounding box, date range and cloud coverage");
                }
                e
            })?;

            if let Some(path) = save {
                image
                    .save(&path)
                    .with_context(|| format!("Failed to save image to {}", path.display()))?;
                info!(path = %path.display(), "Fetched image saved");
            }

            let pipeline = CarbonPipeline::new(estimation.config())?;
            let (result, ndvi) = pipeline.run_image(&image)?;
            report(&estimation, &result, &ndvi)?;
        }
    }

    Ok(())
}

fn report(args: &EstimationArgs, result: &EstimationResult, ndvi: &NdviMap) -> Result<()> {
    if let Some(path) = &args.ndvi_tiff {
        TiffNdviWriter.write_file(ndvi, path, &ExportConfig::default())?;
        info!(path = %path.display(), "NDVI map written");
    }

    if args.json {
        println!("{}", result.to_json()?);
    } else {
        info!("Area detected: {:.2} hectares", result.area_hectares);
        info!("Carbon credits: {:.2} CO2e tonnes", result.carbon_credits_tonnes);
        info!("Vegetation pixels: {}", result.vegetation_pixel_count);
        info!("Average NDVI: {:.4}", result.average_ndvi);
    }
    Ok(())
}
