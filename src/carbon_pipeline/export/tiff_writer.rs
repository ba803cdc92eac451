use std::io::Write;
use std::path::Path;

use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{colortype, Compression, TiffEncoder};
use tracing::debug;

use crate::carbon_pipeline::common::error::{EstimationError, Result};
use crate::carbon_pipeline::export::types::{ExportConfig, TiffCompression};
use crate::carbon_pipeline::export::writer::NdviWriter;
use crate::carbon_pipeline::raster::NdviMap;

pub struct TiffNdviWriter;

impl TiffNdviWriter {
    /// Writes `ndvi` to a new file at `path`.
    pub fn write_file<P: AsRef<Path>>(
        &self,
        ndvi: &NdviMap,
        path: P,
        config: &ExportConfig,
    ) -> Result<()> {
        let path = path.as_ref();
        let mut file = std::fs::File::create(path).map_err(|e| {
            EstimationError::OutputWriteError(format!("{}: {}", path.display(), e))
        })?;
        self.write_ndvi(ndvi, &mut file, config)
    }
}

impl NdviWriter for TiffNdviWriter {
    fn write_ndvi(&self, ndvi: &NdviMap, output: &mut dyn Write, config: &ExportConfig) -> Result<()> {
        let (height, width) = ndvi.shape();
        debug!("Encoding NDVI TIFF: {}x{}", width, height);

        let compression = match config.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        let samples: Vec<f32> = ndvi.as_array().iter().copied().collect();

        let mut buffer = Vec::new();
        let mut encoder = TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| EstimationError::EncodeError(e.to_string()))?
            .with_compression(compression);

        encoder
            .write_image::<colortype::Gray32Float>(width as u32, height as u32, &samples)
            .map_err(|e| EstimationError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!("NDVI TIFF encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::io::Cursor;
    use tiff::decoder::{Decoder, DecodingResult};

    fn gradient_map() -> NdviMap {
        NdviMap::from_array(Array2::from_shape_fn((6, 9), |(y, x)| {
            (y * 9 + x) as f32 / 53.0
        }))
        .unwrap()
    }

    fn decode(bytes: Vec<u8>) -> (u32, u32, Vec<f32>) {
        let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
        let (width, height) = decoder.dimensions().unwrap();
        match decoder.read_image().unwrap() {
            DecodingResult::F32(values) => (width, height, values),
            _ => panic!("expected 32-bit float samples"),
        }
    }

    #[test]
    fn test_written_tiff_preserves_values() {
        let map = gradient_map();
        for compression in [TiffCompression::None, TiffCompression::DeflateBalanced, TiffCompression::Lzw] {
            let config = ExportConfig::builder().compression(compression).build();
            let mut output = Vec::new();
            TiffNdviWriter.write_ndvi(&map, &mut output, &config).unwrap();

            let (width, height, values) = decode(output);
            assert_eq!((width, height), (9, 6));
            let expected: Vec<f32> = map.as_array().iter().copied().collect();
            assert_eq!(values, expected);
        }
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ndvi.tif");
        TiffNdviWriter
            .write_file(&gradient_map(), &path, &ExportConfig::default())
            .unwrap();

        let (width, height, _) = decode(std::fs::read(&path).unwrap());
        assert_eq!((width, height), (9, 6));
    }

    #[test]
    fn test_write_file_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("ndvi.tif");
        let err = TiffNdviWriter
            .write_file(&gradient_map(), &path, &ExportConfig::default())
            .unwrap_err();
        assert!(matches!(err, EstimationError::OutputWriteError(_)));
    }
}
