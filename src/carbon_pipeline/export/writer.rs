use std::io::Write;

use crate::carbon_pipeline::common::error::Result;
use crate::carbon_pipeline::export::types::ExportConfig;
use crate::carbon_pipeline::raster::NdviMap;

pub trait NdviWriter {
    fn write_ndvi(&self, ndvi: &NdviMap, output: &mut dyn Write, config: &ExportConfig) -> Result<()>;
}
