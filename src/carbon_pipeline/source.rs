//! Image acquisition module
//!
//! Resolves an [`ImageDescriptor`] into a decoded image, either locally (file,
//! encoded bytes, raw pixel buffer) or from the Sentinel Hub Process API.

mod local_source;
mod reader;
mod sentinel_config;
mod sentinel_hub;
pub mod types;

pub use local_source::LocalImageSource;
pub use reader::ImageSource;
pub use sentinel_config::{SentinelHubConfig, SentinelHubConfigBuilder};
pub use sentinel_hub::SentinelHubSource;
pub use types::{AreaOfInterest, BoundingBox, DecodedImage, ImageDescriptor, RawPixels, TimeRange};
