//! numpy `.npy` container support
//!
//! Headers are read and written with `npyz`. Only the header is parsed here;
//! the payload that follows it is streamed slice by slice by the resample
//! pipeline, starting at the offset where the header ends.

use crate::error::{ResampleError, Result};
use crate::metadata::{HeaderParser, SourceHeader};
use crate::types::{
    checked_payload_bytes, shape_from_dims, ArrayOrder, ElementType, Endianness, VolumeShape,
};
use crate::volume::{with_buffer, Element, ImageVolume, VoxelBuffer};
use npyz::{DType, NpyHeader, Order, WriteOptions, WriterBuilder};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Seek, Write};
use std::path::Path;

/// Longest header dict accepted
const MAX_HEADER_BYTES: u64 = 64 * 1024;

/// Parser for `.npy` files
#[derive(Debug, Clone, Copy, Default)]
pub struct NumpyFormat;

impl HeaderParser for NumpyFormat {
    fn parse_header(&self, path: &Path) -> Result<SourceHeader> {
        let mut reader = BufReader::new(File::open(path)?);
        check_header_len(reader.fill_buf()?)?;

        let header = NpyHeader::from_reader(&mut reader)
            .map_err(|e| ResampleError::parse(format!("Invalid .npy header: {}", e)))?;
        let data_offset = reader.stream_position()?;

        let descr = match header.dtype() {
            DType::Plain(type_str) => type_str.to_string(),
            other => {
                return Err(ResampleError::UnsupportedType(format!(
                    "numpy dtype {:?}",
                    other
                )))
            }
        };
        let element = ElementType::from_type_code(&descr, Endianness::native())?;

        let order = match header.order() {
            Order::C => ArrayOrder::C,
            Order::Fortran => ArrayOrder::Fortran,
        };
        let shape = array_shape(header.shape(), order)?;
        if checked_payload_bytes(&shape, element.size_in_bytes()).is_none() {
            return Err(ResampleError::parse(format!(
                ".npy shape {:?} is too large to address",
                header.shape()
            )));
        }

        Ok(SourceHeader::new(shape, order, element, path, data_offset))
    }
}

/// Reject a declared header length over [`MAX_HEADER_BYTES`] before it is allocated
fn check_header_len(preamble: &[u8]) -> Result<()> {
    let declared = match preamble.get(6) {
        Some(1) => preamble
            .get(8..10)
            .map(|b| u64::from(u16::from_le_bytes([b[0], b[1]]))),
        Some(2) | Some(3) => preamble
            .get(8..12)
            .map(|b| u64::from(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))),
        _ => None,
    };

    match declared {
        Some(len) if len > MAX_HEADER_BYTES => Err(ResampleError::parse(format!(
            ".npy header of {} bytes is too long",
            len
        ))),
        _ => Ok(()),
    }
}

fn array_shape(dims: &[u64], order: ArrayOrder) -> Result<VolumeShape> {
    let invalid = || {
        ResampleError::parse(format!(
            ".npy shape {:?} is not a 1 to 3 dimensional array",
            dims
        ))
    };

    let dims = dims
        .iter()
        .map(|&d| usize::try_from(d).map_err(|_| invalid()))
        .collect::<Result<Vec<_>>>()?;
    let shape = shape_from_dims(&dims, order).ok_or_else(invalid)?;
    if shape.iter().any(|&d| d == 0) {
        return Err(ResampleError::parse(format!(
            ".npy shape {:?} has an empty axis",
            dims
        )));
    }
    Ok(shape)
}

/// Write `volume` as a C-ordered, native-endian `.npy` of shape `(z, y, x)`
pub fn write_npy(path: impl AsRef<Path>, volume: &ImageVolume) -> Result<()> {
    let [x, y, z] = volume.dims();
    let shape = [z as u64, y as u64, x as u64];

    let mut file = BufWriter::new(File::create(path.as_ref())?);
    with_buffer!(volume.data(), data => write_values(&mut file, &shape, data))?;
    file.flush()?;
    Ok(())
}

fn write_values<T: Element, W: Write>(writer: W, shape: &[u64], data: &[T]) -> io::Result<()> {
    let mut npy = WriteOptions::new()
        .default_dtype()
        .shape(shape)
        .writer(writer)
        .begin_nd()?;
    for value in data {
        npy.push(value)?;
    }
    npy.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarKind;
    use std::fs;
    use tempfile::TempDir;

    /// `.npy` v1 file with `dict` padded the way numpy pads it
    fn npy_bytes(dict: &str) -> Vec<u8> {
        let mut dict = dict.to_string();
        while (10 + dict.len() + 1) % 64 != 0 {
            dict.push(' ');
        }
        dict.push('\n');

        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        bytes.extend_from_slice(dict.as_bytes());
        bytes
    }

    fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_parse_numpy_written_header() {
        let temp_dir = TempDir::new().unwrap();
        let mut bytes = npy_bytes("{'descr': '|u1', 'fortran_order': False, 'shape': (5, 10, 6), }");
        let header_len = bytes.len() as u64;
        bytes.extend(std::iter::repeat(0u8).take(300));
        let path = write_file(&temp_dir, "volume.npy", &bytes);

        let header = NumpyFormat.parse_header(&path).unwrap();
        assert_eq!(header.shape, [6, 10, 5]);
        assert_eq!(header.order, ArrayOrder::C);
        assert_eq!(header.element.kind, ScalarKind::U8);
        assert_eq!(header.data_offset, header_len);
        assert!(header.check_payload_size(bytes.len() as u64).is_ok());
    }

    #[test]
    fn test_fortran_big_endian_header() {
        let temp_dir = TempDir::new().unwrap();
        let bytes = npy_bytes("{'descr': '>f8', 'fortran_order': True, 'shape': (7,), }");
        let path = write_file(&temp_dir, "column.npy", &bytes);

        let header = NumpyFormat.parse_header(&path).unwrap();
        assert_eq!(header.shape, [7, 1, 1]);
        assert_eq!(header.order, ArrayOrder::Fortran);
        assert_eq!(header.element, ElementType::new(ScalarKind::F64, Endianness::Big));
    }

    #[test]
    fn test_malformed_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut wrong_magic = npy_bytes("{'descr': '|u1', 'fortran_order': False, 'shape': (2,), }");
        wrong_magic[5] = b'Z';

        let mut huge_header = b"\x93NUMPY\x02\x00".to_vec();
        huge_header.extend_from_slice(&u32::MAX.to_le_bytes());

        for (name, bytes) in [
            ("magic.npy", wrong_magic),
            ("short.npy", b"\x93NU".to_vec()),
            ("huge.npy", huge_header),
            (
                "four_d.npy",
                npy_bytes("{'descr': '|u1', 'fortran_order': False, 'shape': (1, 2, 3, 4), }"),
            ),
            (
                "scalar.npy",
                npy_bytes("{'descr': '|u1', 'fortran_order': False, 'shape': (), }"),
            ),
            (
                "empty.npy",
                npy_bytes("{'descr': '|u1', 'fortran_order': False, 'shape': (0, 4), }"),
            ),
        ] {
            let path = write_file(&temp_dir, name, &bytes);
            let err = NumpyFormat.parse_header(&path).unwrap_err();
            assert!(matches!(err, ResampleError::FormatParse(_)), "{name}: {err}");
        }
    }

    #[test]
    fn test_oversized_shape() {
        let temp_dir = TempDir::new().unwrap();
        let bytes = npy_bytes(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (2147483648, 2147483648, 1), }",
        );
        let path = write_file(&temp_dir, "huge.npy", &bytes);

        let err = NumpyFormat.parse_header(&path).unwrap_err();
        assert!(matches!(err, ResampleError::FormatParse(_)));
    }

    #[test]
    fn test_structured_dtype_unsupported() {
        let temp_dir = TempDir::new().unwrap();
        let bytes = npy_bytes("{'descr': [('a', '<i2'), ('b', '<f4')], 'fortran_order': False, 'shape': (3,), }");
        let path = write_file(&temp_dir, "record.npy", &bytes);

        let err = NumpyFormat.parse_header(&path).unwrap_err();
        assert!(matches!(err, ResampleError::UnsupportedType(_)));
    }

    #[test]
    fn test_write_and_parse_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("volume.npy");
        let data: Vec<i16> = (0..24).map(|v| v * 100 - 1000).collect();
        let volume = ImageVolume::new([4, 3, 2], VoxelBuffer::I16(data)).unwrap();
        write_npy(&path, &volume).unwrap();

        let header = NumpyFormat.parse_header(&path).unwrap();
        assert_eq!(header.shape, [4, 3, 2]);
        assert_eq!(header.element, ElementType::new(ScalarKind::I16, Endianness::native()));

        let file_len = fs::metadata(&path).unwrap().len();
        assert_eq!(file_len - header.data_offset, 48);
        assert!(header.check_payload_size(file_len).is_ok());
    }
}
