//! Resample readers - main API for reading volumes at a voxel budget

use crate::compression::{get_compressor, CompressionMethod};
use crate::error::{ResampleError, Result};
use crate::io::{read_exact_at, FileSource, ReadSeek, VolumeSource};
use crate::layout::ResampleLayout;
use crate::metadata::{HeaderParser, SourceHeader};
use crate::metaimage::MetaImageFormat;
use crate::numpy::NumpyFormat;
use crate::raw::RawFormat;
use crate::request::ResampleRequest;
use crate::shape::compute_target_shape;
use crate::utils::format_bytes;
use crate::volume::{ImageVolume, VoxelBuffer};
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Resample the volume described by `header`, reading its payload from
/// `header.data_file`.
pub fn resample(header: &SourceHeader, request: &ResampleRequest) -> Result<ImageVolume> {
    let source = FileSource::new(&header.data_file);
    resample_source(&source, header, request)
}

/// Resample the volume described by `header` from an explicit source.
///
/// The source is opened once and released before returning, on success
/// and on failure alike.
pub fn resample_source(
    source: &dyn VolumeSource,
    header: &SourceHeader,
    request: &ResampleRequest,
) -> Result<ImageVolume> {
    request.validate()?;
    if header.checked_payload_bytes().is_none() {
        return Err(ResampleError::config(format!(
            "Volume shape {:?} is too large to address",
            header.shape
        )));
    }

    let target = compute_target_shape(
        header.shape,
        header.total_voxels(),
        request.target_size,
        request.acquisition,
    );
    let layout = ResampleLayout::new(header.shape, &target, header.element)?;

    debug!(
        source = %source.describe(),
        target_size = request.target_size,
        acquisition = request.acquisition,
        magnification = target.magnification,
        slice_per_chunk = target.slice_per_chunk,
        "Resample plan: {}",
        layout.summary()
    );

    header.check_payload_size(source.size()?)?;

    let mut handle = source.open()?;
    let picked = match header.compression {
        CompressionMethod::None => extract(handle.as_mut(), header.data_offset, &layout)?,
        CompressionMethod::Zlib => {
            let payload = read_compressed(handle.as_mut(), header, &layout)?;
            extract(&mut Cursor::new(payload.as_slice()), 0, &layout)?
        }
    };
    drop(handle);

    let data = VoxelBuffer::decode(header.element.kind, header.element.endianness, &picked)?;
    let volume = ImageVolume::new(layout.output_shape, data)?
        .with_spacing(layout.output_spacing(header.spacing))
        .with_target(target);

    info!(
        source = %source.describe(),
        "Resampled {} ({})",
        layout.summary(),
        format_bytes(picked.len() as u64)
    );

    Ok(volume)
}

/// Read every output slice from an uncompressed payload, one source slice at a time
fn extract(reader: &mut dyn ReadSeek, data_offset: u64, layout: &ResampleLayout) -> Result<Vec<u8>> {
    let width = layout.element.size_in_bytes();
    let row_bytes = layout.source_shape[0] * width;
    let mut slice = vec![0u8; layout.slice_bytes()];
    let mut picked = Vec::with_capacity(layout.output_voxels() * width);

    for &z in &layout.z_indices {
        read_exact_at(reader, data_offset + layout.slice_offset(z), &mut slice)?;

        if layout.is_identity() {
            picked.extend_from_slice(&slice);
            continue;
        }

        for &y in &layout.y_indices {
            let row = &slice[y * row_bytes..(y + 1) * row_bytes];
            for &x in &layout.x_indices {
                picked.extend_from_slice(&row[x * width..(x + 1) * width]);
            }
        }
    }

    Ok(picked)
}

/// Inflate a compressed payload and check it holds exactly the declared voxels
fn read_compressed(
    reader: &mut dyn ReadSeek,
    header: &SourceHeader,
    layout: &ResampleLayout,
) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(header.data_offset))?;
    let mut compressed = Vec::new();
    match header.compressed_size {
        Some(size) => reader.take(size).read_to_end(&mut compressed)?,
        None => reader.read_to_end(&mut compressed)?,
    };

    let expected = layout.payload_bytes();
    let payload = get_compressor(header.compression)
        .decompress(&compressed, usize::try_from(expected).ok())?;
    if payload.len() as u64 != expected {
        return Err(ResampleError::SizeMismatch {
            expected,
            actual: payload.len() as u64,
        });
    }
    Ok(payload)
}

/// Reader that parses a container with `F` and resamples it on every update.
///
/// Configuration is kept between updates; each update re-reads the source
/// with the current configuration and replaces the previous output.
#[derive(Debug, Clone, Default)]
pub struct ResampleReader<F> {
    format: F,
    file_name: Option<PathBuf>,
    request: ResampleRequest,
    output: Option<ImageVolume>,
}

/// Reader for raw binary files
pub type BaseResampleReader = ResampleReader<RawFormat>;

/// Reader for numpy `.npy` files
pub type NumpyResampleReader = ResampleReader<NumpyFormat>;

/// Reader for MetaImage `.mha`/`.mhd` files
pub type MetaImageResampleReader = ResampleReader<MetaImageFormat>;

impl<F: HeaderParser + Default> ResampleReader<F> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: HeaderParser> ResampleReader<F> {
    /// Create a reader around a configured format
    pub fn with_format(format: F) -> Self {
        Self {
            format,
            file_name: None,
            request: ResampleRequest::default(),
            output: None,
        }
    }

    pub fn set_file_name(&mut self, path: impl AsRef<Path>) {
        self.file_name = Some(path.as_ref().to_path_buf());
    }

    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    /// Set the voxel budget
    pub fn set_target_size(&mut self, target_size: usize) {
        self.request.target_size = target_size;
    }

    pub fn target_size(&self) -> usize {
        self.request.target_size
    }

    pub fn set_is_acquisition_data(&mut self, acquisition: bool) {
        self.request.acquisition = acquisition;
    }

    pub fn is_acquisition_data(&self) -> bool {
        self.request.acquisition
    }

    /// Replace the whole request
    pub fn set_request(&mut self, request: ResampleRequest) {
        self.request = request;
    }

    pub fn request(&self) -> &ResampleRequest {
        &self.request
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn format_mut(&mut self) -> &mut F {
        &mut self.format
    }

    /// Parse the header of the configured file without reading voxels
    pub fn read_header(&self) -> Result<SourceHeader> {
        let path = self
            .file_name
            .as_deref()
            .ok_or_else(|| ResampleError::config("No file name set"))?;
        self.format.parse_header(path)
    }

    /// Read and resample the configured file
    pub fn update(&mut self) -> Result<&ImageVolume> {
        self.output = None;
        let header = self.read_header()?;
        let volume = resample(&header, &self.request)?;
        Ok(self.output.insert(volume))
    }

    /// Same as [`update`](Self::update)
    pub fn execute(&mut self) -> Result<&ImageVolume> {
        self.update()
    }

    /// Output of the last successful update
    pub fn output(&self) -> Option<&ImageVolume> {
        self.output.as_ref()
    }

    /// Take ownership of the last output
    pub fn take_output(&mut self) -> Option<ImageVolume> {
        self.output.take()
    }
}

impl ResampleReader<RawFormat> {
    /// Shape of the stored array in array order
    pub fn set_stored_array_shape(&mut self, shape: &[usize]) {
        self.format.array_shape = Some(shape.to_vec());
    }

    /// Element type code, e.g. `uint8` or `<f4`
    pub fn set_raw_type_code(&mut self, type_code: impl Into<String>) {
        self.format.type_code = Some(type_code.into());
    }

    pub fn set_big_endian(&mut self, big_endian: bool) {
        self.format.big_endian = big_endian;
    }

    pub fn set_is_fortran(&mut self, fortran_order: bool) {
        self.format.fortran_order = fortran_order;
    }
}

/// Self-describing container formats, picked by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Numpy,
    MetaImage,
}

impl ContainerFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("npy") => Ok(ContainerFormat::Numpy),
            Some("mha") | Some("mhd") => Ok(ContainerFormat::MetaImage),
            _ => Err(ResampleError::config(format!(
                "Cannot detect a self-describing format for {}",
                path.display()
            ))),
        }
    }
}

impl HeaderParser for ContainerFormat {
    fn parse_header(&self, path: &Path) -> Result<SourceHeader> {
        match self {
            ContainerFormat::Numpy => NumpyFormat.parse_header(path),
            ContainerFormat::MetaImage => MetaImageFormat.parse_header(path),
        }
    }
}

/// Read a `.npy`, `.mha` or `.mhd` file at a voxel budget
pub fn read_resampled(path: impl AsRef<Path>, request: &ResampleRequest) -> Result<ImageVolume> {
    let path = path.as_ref();
    let header = ContainerFormat::from_path(path)?.parse_header(path)?;
    resample(&header, request)
}
