//! Volume Resample - budget-driven volume readers
//!
//! Reads 3D volumes stored as raw binary, numpy `.npy` or MetaImage
//! (`.mha`/`.mhd`) files and downsamples them on the fly so the result fits
//! a caller-given voxel budget.
//!
//! # Features
//!
//! - Raw payloads described by caller-supplied shape, type code, byte order
//!   and memory order
//! - Numpy `.npy` header versions 1, 2 and 3
//! - MetaImage with local, detached and zlib-compressed payloads
//! - Slice-at-a-time streaming: only one source slice is held in memory
//! - Acquisition mode that keeps every slice along the stacking axis
//! - Output in image order `(x, y, z)` with x varying fastest
//!
//! # Example
//!
//! ```rust,no_run
//! use volume_resample::NumpyResampleReader;
//!
//! # fn example() -> volume_resample::Result<()> {
//! let mut reader = NumpyResampleReader::new();
//! reader.set_file_name("/data/scan.npy");
//! reader.set_target_size(128 * 128 * 128);
//!
//! let volume = reader.update()?;
//! println!("extent {:?}, spacing {:?}", volume.extent(), volume.spacing());
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod convert;
pub mod error;
pub mod io;
pub mod layout;
pub mod metadata;
pub mod metaimage;
pub mod numpy;
pub mod raw;
pub mod reader;
pub mod request;
pub mod shape;
pub mod types;
pub mod utils;
pub mod volume;

// Re-exports
pub use compression::{CompressionLevel, CompressionMethod, Compressor};
pub use convert::Converter;
pub use error::{ResampleError, Result};
pub use io::{FileSource, MemorySource, VolumeSource};
pub use layout::ResampleLayout;
pub use metadata::{HeaderParser, SourceHeader};
pub use metaimage::{MetaImageFormat, MetaImageWriter};
pub use numpy::{write_npy, NumpyFormat};
pub use raw::RawFormat;
pub use reader::{
    read_resampled, resample, resample_source, BaseResampleReader, ContainerFormat,
    MetaImageResampleReader, NumpyResampleReader, ResampleReader,
};
pub use request::{ResampleRequest, DEFAULT_TARGET_SIZE};
pub use shape::{compute_target_shape, TargetShape};
pub use types::{ArrayOrder, ElementType, Endianness, ScalarKind, VolumeShape};
pub use volume::{DownsampledVolume, Element, ImageVolume, VoxelBuffer};

/// Version of the resample readers
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
