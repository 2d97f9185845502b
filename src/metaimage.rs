//! MetaImage (`.mha` / `.mhd`) container support
//!
//! A MetaImage header is a list of `Key = Value` lines terminated by
//! `ElementDataFile`. With `ElementDataFile = LOCAL` the payload follows the
//! header in the same file (`.mha`); otherwise it names a detached data file
//! relative to the header (`.mhd`).

use crate::compression::{get_compressor, CompressionLevel, CompressionMethod};
use crate::error::{ResampleError, Result};
use crate::metadata::{HeaderParser, SourceHeader};
use crate::types::{checked_payload_bytes, ArrayOrder, ElementType, Endianness, VolumeShape};
use crate::volume::ImageVolume;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Longest header accepted before giving up on finding `ElementDataFile`
const MAX_HEADER_BYTES: u64 = 64 * 1024;

/// Value of `ElementDataFile` for an attached payload
const LOCAL_DATA_FILE: &str = "LOCAL";

/// Keys that carry no information the resampler uses
const IGNORED_KEYS: &[&str] = &[
    "Comment",
    "ObjectSubType",
    "TransformType",
    "Name",
    "ID",
    "ParentID",
    "TransformMatrix",
    "Rotation",
    "Orientation",
    "CenterOfRotation",
    "AnatomicalOrientation",
    "ElementMin",
    "ElementMax",
    "Modality",
    "Color",
    "AcquisitionDate",
];

/// Parser for MetaImage headers
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaImageFormat;

/// Parsed MetaImage header fields
#[derive(Debug, Clone, PartialEq)]
pub struct MetaImageHeader {
    /// Dimensions, fastest axis first
    pub dim_size: Vec<usize>,
    pub element_type: String,
    pub big_endian: bool,
    pub spacing: Option<Vec<f64>>,
    pub header_size: Option<i64>,
    pub compressed: bool,
    pub compressed_size: Option<u64>,
    pub data_file: String,
    /// Length in bytes of the header text, including the `ElementDataFile` line
    pub header_len: u64,
}

impl MetaImageHeader {
    /// Read header lines up to and including `ElementDataFile`
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self> {
        let mut ndims = None;
        let mut dim_size = None;
        let mut element_type = None;
        let mut big_endian = false;
        let mut spacing = None;
        let mut element_size = None;
        let mut header_size = None;
        let mut compressed = false;
        let mut compressed_size = None;
        let mut data_file = None;
        let mut header_len = 0u64;
        let mut line = Vec::new();

        while data_file.is_none() {
            line.clear();
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                return Err(ResampleError::parse(
                    "MetaImage header ends before ElementDataFile",
                ));
            }
            header_len += read as u64;
            if header_len > MAX_HEADER_BYTES {
                return Err(ResampleError::parse(
                    "MetaImage header too long, ElementDataFile not found",
                ));
            }

            let text = std::str::from_utf8(&line)
                .map_err(|_| ResampleError::parse("MetaImage header is not valid text"))?
                .trim();
            if text.is_empty() {
                continue;
            }

            let (key, value) = text.split_once('=').ok_or_else(|| {
                ResampleError::parse(format!("Malformed MetaImage header line '{}'", text))
            })?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                "ObjectType" => {
                    if !value.eq_ignore_ascii_case("Image") {
                        return Err(ResampleError::parse(format!(
                            "MetaImage object type '{}' is not an image",
                            value
                        )));
                    }
                }
                "NDims" => ndims = Some(parse_number::<usize>(key, value)?),
                "DimSize" => dim_size = Some(parse_list::<usize>(key, value)?),
                "ElementType" => element_type = Some(value.to_string()),
                "ElementByteOrderMSB" | "BinaryDataByteOrderMSB" => {
                    big_endian = parse_bool(key, value)?
                }
                "ElementSpacing" => spacing = Some(parse_list::<f64>(key, value)?),
                "ElementSize" => element_size = Some(parse_list::<f64>(key, value)?),
                "HeaderSize" => header_size = Some(parse_number::<i64>(key, value)?),
                "CompressedData" => compressed = parse_bool(key, value)?,
                "CompressedDataSize" => compressed_size = Some(parse_number::<u64>(key, value)?),
                "BinaryData" => {
                    if !parse_bool(key, value)? {
                        return Err(ResampleError::parse("ASCII MetaImage data is not supported"));
                    }
                }
                "ElementNumberOfChannels" => {
                    let channels = parse_number::<usize>(key, value)?;
                    if channels != 1 {
                        return Err(ResampleError::parse(format!(
                            "Only single channel MetaImages are supported, found {} channels",
                            channels
                        )));
                    }
                }
                "Offset" | "Position" | "Origin" => {
                    if parse_list::<f64>(key, value)?.iter().any(|&v| v != 0.0) {
                        warn!(key, value, "MetaImage origin is ignored, output origin is zero");
                    }
                }
                "ElementDataFile" => data_file = Some(value.to_string()),
                key if IGNORED_KEYS.contains(&key) => {}
                key => debug!(key, value, "Skipping unknown MetaImage header key"),
            }
        }

        let ndims = ndims.ok_or_else(|| ResampleError::parse("MetaImage header has no NDims"))?;
        if !(2..=3).contains(&ndims) {
            return Err(ResampleError::parse(format!(
                "MetaImage with {} dimensions is not supported",
                ndims
            )));
        }

        let dim_size =
            dim_size.ok_or_else(|| ResampleError::parse("MetaImage header has no DimSize"))?;
        if dim_size.len() != ndims || dim_size.iter().any(|&d| d == 0) {
            return Err(ResampleError::parse(format!(
                "DimSize {:?} does not describe a {}-dimensional image",
                dim_size, ndims
            )));
        }

        let spacing = spacing.or(element_size);
        if spacing.as_ref().is_some_and(|s| s.len() != ndims) {
            return Err(ResampleError::parse(format!(
                "ElementSpacing does not have {} values",
                ndims
            )));
        }

        Ok(Self {
            dim_size,
            element_type: element_type
                .ok_or_else(|| ResampleError::parse("MetaImage header has no ElementType"))?,
            big_endian,
            spacing,
            header_size,
            compressed,
            compressed_size,
            data_file: data_file.unwrap_or_default(),
            header_len,
        })
    }

    /// Image-order shape, padding 2D images with a single slice
    pub fn shape(&self) -> VolumeShape {
        let mut shape = [1; 3];
        shape[..self.dim_size.len()].copy_from_slice(&self.dim_size);
        shape
    }

    pub fn element(&self) -> Result<ElementType> {
        if !self.element_type.starts_with("MET_") {
            return Err(ResampleError::UnsupportedType(self.element_type.clone()));
        }
        ElementType::from_type_code(
            &self.element_type,
            Endianness::from_big_endian_flag(self.big_endian),
        )
    }

    /// Image-order spacing, 1.0 where the header is silent
    pub fn spacing(&self) -> [f64; 3] {
        let mut spacing = [1.0; 3];
        if let Some(values) = &self.spacing {
            spacing[..values.len()].copy_from_slice(values);
        }
        spacing
    }

    /// Resolve the payload file and offset for a header read from `header_path`
    pub fn data_location(&self, header_path: &Path, payload_bytes: u64) -> Result<(PathBuf, u64)> {
        if self.data_file.eq_ignore_ascii_case(LOCAL_DATA_FILE) {
            return Ok((header_path.to_path_buf(), self.header_len));
        }
        if self.data_file.is_empty() || self.data_file == "LIST" || self.data_file.contains('%') {
            return Err(ResampleError::parse(format!(
                "Unsupported ElementDataFile '{}'",
                self.data_file
            )));
        }

        let data_path = header_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&self.data_file);

        let offset = match self.header_size {
            None | Some(0) => 0,
            Some(-1) if !self.compressed => {
                let file_size = fs::metadata(&data_path)?.len();
                file_size
                    .checked_sub(payload_bytes)
                    .ok_or(ResampleError::SizeMismatch {
                        expected: payload_bytes,
                        actual: file_size,
                    })?
            }
            Some(size) if size > 0 => size as u64,
            Some(size) => {
                return Err(ResampleError::parse(format!("Invalid HeaderSize {}", size)));
            }
        };

        Ok((data_path, offset))
    }
}

impl HeaderParser for MetaImageFormat {
    fn parse_header(&self, path: &Path) -> Result<SourceHeader> {
        let mut reader = BufReader::new(File::open(path)?);
        let meta = MetaImageHeader::read_from(&mut reader)?;

        let element = meta.element()?;
        let shape = meta.shape();
        let payload_bytes = checked_payload_bytes(&shape, element.size_in_bytes()).ok_or_else(|| {
            ResampleError::parse(format!("DimSize {:?} is too large to address", meta.dim_size))
        })?;
        let (data_file, data_offset) = meta.data_location(path, payload_bytes)?;

        let compression = if meta.compressed {
            CompressionMethod::Zlib
        } else {
            CompressionMethod::None
        };

        // DimSize lists the fastest axis first, which is image order already
        Ok(
            SourceHeader::new(shape, ArrayOrder::Fortran, element, data_file, data_offset)
                .with_compression(compression, meta.compressed_size)
                .with_spacing(meta.spacing()),
        )
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ResampleError::parse(format!("Invalid {} value '{}'", key, value)))
}

fn parse_list<T: std::str::FromStr>(key: &str, value: &str) -> Result<Vec<T>> {
    value
        .split_whitespace()
        .map(|item| parse_number(key, item))
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ResampleError::parse(format!(
            "Invalid {} value '{}'",
            key, value
        ))),
    }
}

/// Writes image volumes as MetaImage files
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaImageWriter {
    compression: Option<CompressionLevel>,
}

impl MetaImageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the payload zlib-compressed
    pub fn with_compression(mut self, level: Option<CompressionLevel>) -> Self {
        self.compression = level;
        self
    }

    /// Write `volume` to `path`. A `.mhd` path gets a detached `.raw`
    /// (`.zraw` when compressed) payload next to it, anything else a single
    /// `.mha` style file.
    pub fn write(&self, path: impl AsRef<Path>, volume: &ImageVolume) -> Result<()> {
        let path = path.as_ref();
        let raw = volume.data().to_bytes(Endianness::Little);
        let payload = match self.compression {
            Some(level) => get_compressor(CompressionMethod::Zlib).compress(&raw, level)?,
            None => raw,
        };

        let detached = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mhd"));
        let data_path = detached.then(|| {
            path.with_extension(if self.compression.is_some() { "zraw" } else { "raw" })
        });
        let data_file_name = match &data_path {
            Some(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| ResampleError::config("MetaImage path has no file name"))?,
            None => LOCAL_DATA_FILE.to_string(),
        };

        let join = |values: &[String]| values.join(" ");
        let dims = volume.dims();
        let spacing = volume.spacing();

        let mut header = String::new();
        header.push_str("ObjectType = Image\n");
        header.push_str("NDims = 3\n");
        header.push_str("BinaryData = True\n");
        header.push_str("BinaryDataByteOrderMSB = False\n");
        if self.compression.is_some() {
            header.push_str("CompressedData = True\n");
            header.push_str(&format!("CompressedDataSize = {}\n", payload.len()));
        } else {
            header.push_str("CompressedData = False\n");
        }
        header.push_str(&format!(
            "DimSize = {}\n",
            join(&dims.map(|d| d.to_string()))
        ));
        header.push_str(&format!(
            "ElementSpacing = {}\n",
            join(&spacing.map(|s| s.to_string()))
        ));
        header.push_str("Offset = 0 0 0\n");
        header.push_str("ElementNumberOfChannels = 1\n");
        header.push_str(&format!(
            "ElementType = {}\n",
            volume.scalar_kind().metaimage_name()
        ));
        header.push_str(&format!("ElementDataFile = {}\n", data_file_name));

        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(header.as_bytes())?;
        match &data_path {
            Some(data_path) => fs::write(data_path, &payload)?,
            None => writer.write_all(&payload)?,
        }
        writer.flush()?;
        Ok(())
    }
}
