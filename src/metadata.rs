//! Stored-volume metadata recovered from a container header

use crate::compression::CompressionMethod;
use crate::error::{ResampleError, Result};
use crate::types::{checked_payload_bytes, ArrayOrder, ElementType, VolumeShape};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Capability shared by the container formats: recover the stored-volume
/// metadata from a file
pub trait HeaderParser {
    fn parse_header(&self, path: &Path) -> Result<SourceHeader>;
}

/// Everything the resample pipeline needs to know about a stored volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHeader {
    /// Shape in image order `(x, y, z)`, x fastest in memory
    pub shape: VolumeShape,

    /// Element descriptor of the stored payload
    pub element: ElementType,

    /// Memory order the shape was declared in
    pub order: ArrayOrder,

    /// File holding the voxel payload
    pub data_file: PathBuf,

    /// Byte offset of the payload within `data_file`
    pub data_offset: u64,

    /// Compression of the payload
    pub compression: CompressionMethod,

    /// Size of the compressed payload, when the header states it
    pub compressed_size: Option<u64>,

    /// Voxel spacing in image order
    pub spacing: [f64; 3],
}

impl SourceHeader {
    /// Header for an uncompressed payload with unit spacing
    pub fn new(
        array_shape: VolumeShape,
        order: ArrayOrder,
        element: ElementType,
        data_file: impl Into<PathBuf>,
        data_offset: u64,
    ) -> Self {
        Self {
            shape: order.to_image_order(array_shape),
            element,
            order,
            data_file: data_file.into(),
            data_offset,
            compression: CompressionMethod::None,
            compressed_size: None,
            spacing: [1.0; 3],
        }
    }

    /// Set compression
    pub fn with_compression(mut self, method: CompressionMethod, compressed_size: Option<u64>) -> Self {
        self.compression = method;
        self.compressed_size = compressed_size;
        self
    }

    /// Set spacing (image order)
    pub fn with_spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    /// Uncompressed payload size, `None` when the shape cannot be addressed
    pub fn checked_payload_bytes(&self) -> Option<u64> {
        checked_payload_bytes(&self.shape, self.element.size_in_bytes())
    }

    /// Voxel count; the shape must have passed [`checked_payload_bytes`](Self::checked_payload_bytes)
    pub fn total_voxels(&self) -> usize {
        self.shape.iter().product()
    }

    /// Uncompressed payload size in bytes
    pub fn payload_bytes(&self) -> u64 {
        self.total_voxels() as u64 * self.element.size_in_bytes() as u64
    }

    /// Check that a data file of `file_size` bytes holds exactly the declared payload
    pub fn check_payload_size(&self, file_size: u64) -> Result<()> {
        let available = file_size.saturating_sub(self.data_offset);
        let expected = match self.compression {
            CompressionMethod::None => self.payload_bytes(),
            CompressionMethod::Zlib => match self.compressed_size {
                Some(size) => size,
                None => return Ok(()),
            },
        };

        if available != expected {
            return Err(ResampleError::SizeMismatch {
                expected,
                actual: available,
            });
        }
        Ok(())
    }
}
