use crate::carbon_pipeline::common::error::Result;
use crate::carbon_pipeline::source::types::{DecodedImage, ImageDescriptor};

pub trait ImageSource {
    fn fetch(&self, descriptor: &ImageDescriptor) -> Result<DecodedImage>;
}
