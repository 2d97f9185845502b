//! Compression of stored voxel payloads (MetaImage `CompressedData`)

use crate::error::{ResampleError, Result};
use flate2::write::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Compression methods a payload can be stored with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionMethod {
    /// Plain bytes
    #[default]
    None,
    /// zlib stream, as written by MetaIO
    Zlib,
}

/// zlib effort from 0 (store) to 9 (smallest output)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// Levels above 9 are clamped
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    pub fn fast() -> Self {
        Self(1)
    }

    pub fn best() -> Self {
        Self(9)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(6)
    }
}

impl From<CompressionLevel> for Compression {
    fn from(level: CompressionLevel) -> Self {
        Compression::new(u32::from(level.value()))
    }
}

/// Codec for a stored payload
pub trait Compressor {
    fn compress(&self, data: &[u8], level: CompressionLevel) -> Result<Vec<u8>>;

    /// Inflate a whole payload; `expected_size` only sizes the output buffer
    fn decompress(&self, data: &[u8], expected_size: Option<usize>) -> Result<Vec<u8>>;

    fn method(&self) -> CompressionMethod;
}

/// Pass-through codec for plain payloads
#[derive(Debug, Default)]
pub struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn compress(&self, data: &[u8], _level: CompressionLevel) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8], _expected_size: Option<usize>) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::None
    }
}

/// zlib codec used by MetaImage `CompressedData = True`
#[derive(Debug, Default)]
pub struct ZlibCompressor;

impl Compressor for ZlibCompressor {
    fn compress(&self, data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), level.into());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, data: &[u8], expected_size: Option<usize>) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(Vec::with_capacity(expected_size.unwrap_or(0)));
        decoder
            .write_all(data)
            .and_then(|_| decoder.try_finish())
            .map_err(|e| ResampleError::parse(format!("Corrupt zlib payload: {}", e)))?;
        decoder
            .finish()
            .map_err(|e| ResampleError::parse(format!("Corrupt zlib payload: {}", e)))
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::Zlib
    }
}

/// Codec for `method`
pub fn get_compressor(method: CompressionMethod) -> Box<dyn Compressor> {
    match method {
        CompressionMethod::None => Box::new(NoneCompressor),
        CompressionMethod::Zlib => Box::new(ZlibCompressor),
    }
}
