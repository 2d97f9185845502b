//! Utility functions

use crate::error::{ResampleError, Result};
use crate::types::Endianness;
use crate::volume::Element;
use std::mem;

/// Convert raw bytes stored in `endianness` to typed data
pub fn bytes_to_typed_data<T: Element>(bytes: &[u8], endianness: Endianness) -> Result<Vec<T>> {
    let width = mem::size_of::<T>();
    if bytes.len() % width != 0 {
        return Err(ResampleError::SizeMismatch {
            expected: (bytes.len() / width * width + width) as u64,
            actual: bytes.len() as u64,
        });
    }

    Ok(bytes
        .chunks_exact(width)
        .map(|chunk| T::from_bytes(chunk, endianness))
        .collect())
}

/// Convert typed data to raw bytes in `endianness`
pub fn typed_data_to_bytes<T: Element>(data: &[T], endianness: Endianness) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(mem::size_of_val(data));
    for value in data {
        value.write_bytes(endianness, &mut bytes);
    }
    bytes
}

/// Format byte size in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
