//! Raw binary volumes described by caller-supplied metadata

use crate::error::{ResampleError, Result};
use crate::metadata::{HeaderParser, SourceHeader};
use crate::types::{checked_payload_bytes, shape_from_dims, ArrayOrder, ElementType, Endianness};
use std::path::Path;

/// Raw payload with no header: shape, type code, byte order and memory
/// order must all be supplied before parsing.
#[derive(Debug, Clone, Default)]
pub struct RawFormat {
    /// Stored array shape in array order
    pub array_shape: Option<Vec<usize>>,

    /// Type code such as `uint8`, `<i2` or `MET_FLOAT`
    pub type_code: Option<String>,

    pub big_endian: bool,

    pub fortran_order: bool,
}

impl RawFormat {
    pub fn new(array_shape: &[usize], type_code: impl Into<String>) -> Self {
        Self {
            array_shape: Some(array_shape.to_vec()),
            type_code: Some(type_code.into()),
            ..Self::default()
        }
    }

    /// Set big endian byte order
    pub fn with_big_endian(mut self, big_endian: bool) -> Self {
        self.big_endian = big_endian;
        self
    }

    /// Set Fortran memory order
    pub fn with_fortran_order(mut self, fortran_order: bool) -> Self {
        self.fortran_order = fortran_order;
        self
    }

    fn order(&self) -> ArrayOrder {
        ArrayOrder::from_fortran_flag(self.fortran_order)
    }
}

impl HeaderParser for RawFormat {
    /// Build the header for a payload starting at byte 0 of `path`
    fn parse_header(&self, path: &Path) -> Result<SourceHeader> {
        let dims = self
            .array_shape
            .as_deref()
            .ok_or_else(|| ResampleError::config("Stored array shape is not set"))?;
        let type_code = self
            .type_code
            .as_deref()
            .ok_or_else(|| ResampleError::config("Raw type code is not set"))?;

        let shape = shape_from_dims(dims, self.order()).ok_or_else(|| {
            ResampleError::config(format!(
                "Stored array shape {:?} must have 1 to 3 dimensions",
                dims
            ))
        })?;
        if shape.iter().any(|&d| d == 0) {
            return Err(ResampleError::config(format!(
                "Stored array shape {:?} has an empty axis",
                dims
            )));
        }

        let element = ElementType::from_type_code(
            type_code,
            Endianness::from_big_endian_flag(self.big_endian),
        )?;
        if checked_payload_bytes(&shape, element.size_in_bytes()).is_none() {
            return Err(ResampleError::config(format!(
                "Stored array shape {:?} is too large to address",
                dims
            )));
        }

        Ok(SourceHeader::new(shape, self.order(), element, path, 0))
    }
}
