use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimationError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Degenerate NDVI: raw index is constant ({value}) across the raster")]
    DegenerateNdvi { value: f32 },

    #[error("Shape mismatch: NDVI map is {expected:?}, mask is {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Image acquisition failed with status {status}: {message}")]
    AcquisitionError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to encode output: {0}")]
    EncodeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EstimationError {
    /// True for failures that mean the input image itself is unusable.
    pub fn is_invalid_image(&self) -> bool {
        matches!(self, Self::InvalidImage(_) | Self::InvalidDimensions(_, _))
    }

    /// True for failures raised while acquiring imagery from a remote provider.
    pub fn is_acquisition(&self) -> bool {
        matches!(self, Self::AcquisitionError { .. } | Self::NetworkError(_))
    }
}

pub type Result<T> = std::result::Result<T, EstimationError>;
