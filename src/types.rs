//! Core data types for volume resampling

use crate::error::{ResampleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a 3D volume. Whether it is in array order or image order
/// depends on the context, see [`ArrayOrder`].
pub type VolumeShape = [usize; 3];

/// Pad a 1-3 dimensional array-order shape to three dimensions. The
/// missing axes are added as slow axes of length 1: leading for C order,
/// trailing for Fortran order.
pub fn shape_from_dims(dims: &[usize], order: ArrayOrder) -> Option<VolumeShape> {
    if dims.is_empty() || dims.len() > 3 {
        return None;
    }
    let mut shape = [1; 3];
    match order {
        ArrayOrder::C => shape[3 - dims.len()..].copy_from_slice(dims),
        ArrayOrder::Fortran => shape[..dims.len()].copy_from_slice(dims),
    }
    Some(shape)
}

/// Number of voxels in `shape`, `None` if it overflows `usize`
pub fn checked_voxels(shape: &VolumeShape) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Byte size of `shape` elements of `width` bytes, `None` if it overflows
pub fn checked_payload_bytes(shape: &VolumeShape, width: usize) -> Option<u64> {
    checked_voxels(shape)?
        .checked_mul(width)
        .and_then(|bytes| u64::try_from(bytes).ok())
}

/// Scalar kinds supported by the readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScalarKind {
    /// Unsigned 8-bit integer
    U8 = 0,
    /// Signed 8-bit integer
    I8 = 1,
    /// Unsigned 16-bit integer
    U16 = 2,
    /// Signed 16-bit integer
    I16 = 3,
    /// Unsigned 32-bit integer
    U32 = 4,
    /// Signed 32-bit integer
    I32 = 5,
    /// Unsigned 64-bit integer
    U64 = 6,
    /// Signed 64-bit integer
    I64 = 7,
    /// 32-bit floating point
    F32 = 8,
    /// 64-bit floating point
    F64 = 9,
}

impl ScalarKind {
    /// Size in bytes of this scalar kind
    pub fn size_in_bytes(&self) -> usize {
        match self {
            ScalarKind::U8 | ScalarKind::I8 => 1,
            ScalarKind::U16 | ScalarKind::I16 => 2,
            ScalarKind::U32 | ScalarKind::I32 | ScalarKind::F32 => 4,
            ScalarKind::U64 | ScalarKind::I64 | ScalarKind::F64 => 8,
        }
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    pub fn is_signed(&self) -> bool {
        !matches!(
            self,
            ScalarKind::U8 | ScalarKind::U16 | ScalarKind::U32 | ScalarKind::U64
        )
    }

    /// numpy dtype name, e.g. `uint8`
    pub fn numpy_name(&self) -> &'static str {
        match self {
            ScalarKind::U8 => "uint8",
            ScalarKind::I8 => "int8",
            ScalarKind::U16 => "uint16",
            ScalarKind::I16 => "int16",
            ScalarKind::U32 => "uint32",
            ScalarKind::I32 => "int32",
            ScalarKind::U64 => "uint64",
            ScalarKind::I64 => "int64",
            ScalarKind::F32 => "float32",
            ScalarKind::F64 => "float64",
        }
    }

    /// MetaImage `ElementType` value
    pub fn metaimage_name(&self) -> &'static str {
        match self {
            ScalarKind::U8 => "MET_UCHAR",
            ScalarKind::I8 => "MET_CHAR",
            ScalarKind::U16 => "MET_USHORT",
            ScalarKind::I16 => "MET_SHORT",
            ScalarKind::U32 => "MET_UINT",
            ScalarKind::I32 => "MET_INT",
            ScalarKind::U64 => "MET_ULONG_LONG",
            ScalarKind::I64 => "MET_LONG_LONG",
            ScalarKind::F32 => "MET_FLOAT",
            ScalarKind::F64 => "MET_DOUBLE",
        }
    }

    /// Kind character and width used in numpy array-protocol codes
    fn protocol_parts(&self) -> (char, usize) {
        let kind = if self.is_float() {
            'f'
        } else if self.is_signed() {
            'i'
        } else {
            'u'
        };
        (kind, self.size_in_bytes())
    }

    fn from_protocol_parts(kind: char, width: usize) -> Option<Self> {
        match (kind, width) {
            ('u', 1) => Some(ScalarKind::U8),
            ('i', 1) => Some(ScalarKind::I8),
            ('u', 2) => Some(ScalarKind::U16),
            ('i', 2) => Some(ScalarKind::I16),
            ('u', 4) => Some(ScalarKind::U32),
            ('i', 4) => Some(ScalarKind::I32),
            ('u', 8) => Some(ScalarKind::U64),
            ('i', 8) => Some(ScalarKind::I64),
            ('f', 4) => Some(ScalarKind::F32),
            ('f', 8) => Some(ScalarKind::F64),
            _ => None,
        }
    }

    fn from_numpy_name(name: &str) -> Option<Self> {
        match name {
            "uint8" => Some(ScalarKind::U8),
            "int8" => Some(ScalarKind::I8),
            "uint16" => Some(ScalarKind::U16),
            "int16" => Some(ScalarKind::I16),
            "uint32" => Some(ScalarKind::U32),
            "int32" => Some(ScalarKind::I32),
            "uint64" => Some(ScalarKind::U64),
            "int64" => Some(ScalarKind::I64),
            "float32" | "single" => Some(ScalarKind::F32),
            "float64" | "double" => Some(ScalarKind::F64),
            _ => None,
        }
    }

    fn from_numpy_char(c: char) -> Option<Self> {
        match c {
            'B' => Some(ScalarKind::U8),
            'b' => Some(ScalarKind::I8),
            'H' => Some(ScalarKind::U16),
            'h' => Some(ScalarKind::I16),
            'I' => Some(ScalarKind::U32),
            'i' => Some(ScalarKind::I32),
            'Q' => Some(ScalarKind::U64),
            'q' => Some(ScalarKind::I64),
            'f' => Some(ScalarKind::F32),
            'd' => Some(ScalarKind::F64),
            _ => None,
        }
    }

    fn from_metaimage_name(name: &str) -> Option<Self> {
        match name {
            "MET_UCHAR" => Some(ScalarKind::U8),
            "MET_CHAR" => Some(ScalarKind::I8),
            "MET_USHORT" => Some(ScalarKind::U16),
            "MET_SHORT" => Some(ScalarKind::I16),
            "MET_UINT" | "MET_ULONG" => Some(ScalarKind::U32),
            "MET_INT" | "MET_LONG" => Some(ScalarKind::I32),
            "MET_ULONG_LONG" => Some(ScalarKind::U64),
            "MET_LONG_LONG" => Some(ScalarKind::I64),
            "MET_FLOAT" => Some(ScalarKind::F32),
            "MET_DOUBLE" => Some(ScalarKind::F64),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.numpy_name())
    }
}

/// Byte order of stored elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the running platform
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    pub fn from_big_endian_flag(big_endian: bool) -> Self {
        if big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    pub fn is_native(&self) -> bool {
        *self == Self::native()
    }
}

/// Memory order of a stored array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrayOrder {
    /// Row-major, last array axis varies fastest
    #[default]
    C,
    /// Column-major, first array axis varies fastest
    Fortran,
}

impl ArrayOrder {
    pub fn from_fortran_flag(fortran: bool) -> Self {
        if fortran {
            ArrayOrder::Fortran
        } else {
            ArrayOrder::C
        }
    }

    /// Convert an array-order shape into image order `(x, y, z)`,
    /// x being the fastest varying axis in memory.
    pub fn to_image_order(&self, shape: VolumeShape) -> VolumeShape {
        match self {
            ArrayOrder::C => [shape[2], shape[1], shape[0]],
            ArrayOrder::Fortran => shape,
        }
    }
}

/// Element descriptor: scalar kind plus stored byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementType {
    pub kind: ScalarKind,
    pub endianness: Endianness,
}

impl ElementType {
    pub fn new(kind: ScalarKind, endianness: Endianness) -> Self {
        Self { kind, endianness }
    }

    /// Parse a type code.
    ///
    /// Accepts numpy dtype names (`uint8`, `float32`), numpy array-protocol
    /// codes (`<u2`, `|u1`, `>f8`), single numpy type characters (`B`, `h`)
    /// and MetaImage codes (`MET_USHORT`). A byte-order prefix in the code
    /// overrides `default_endianness`.
    pub fn from_type_code(code: &str, default_endianness: Endianness) -> Result<Self> {
        let code = code.trim();
        let unsupported = || ResampleError::UnsupportedType(code.to_string());

        if code.starts_with("MET_") {
            let kind = ScalarKind::from_metaimage_name(code).ok_or_else(unsupported)?;
            return Ok(Self::new(kind, default_endianness));
        }

        if let Some(kind) = ScalarKind::from_numpy_name(code) {
            return Ok(Self::new(kind, default_endianness));
        }

        let (endianness, rest) = match code.chars().next() {
            Some('<') => (Endianness::Little, &code[1..]),
            Some('>') => (Endianness::Big, &code[1..]),
            Some('=') => (Endianness::native(), &code[1..]),
            Some('|') => (default_endianness, &code[1..]),
            _ => (default_endianness, code),
        };

        let mut chars = rest.chars();
        let kind_char = chars.next().ok_or_else(unsupported)?;
        let width_str = chars.as_str();

        let kind = if width_str.is_empty() {
            ScalarKind::from_numpy_char(kind_char)
        } else {
            width_str
                .parse::<usize>()
                .ok()
                .and_then(|width| ScalarKind::from_protocol_parts(kind_char, width))
        }
        .ok_or_else(unsupported)?;

        Ok(Self::new(kind, endianness))
    }

    /// numpy array-protocol code, e.g. `<u2` or `|u1`
    pub fn numpy_descr(&self) -> String {
        let (kind, width) = self.kind.protocol_parts();
        let order = if width == 1 {
            '|'
        } else {
            match self.endianness {
                Endianness::Little => '<',
                Endianness::Big => '>',
            }
        };
        format!("{}{}{}", order, kind, width)
    }

    pub fn size_in_bytes(&self) -> usize {
        self.kind.size_in_bytes()
    }
}

/// Value range of a volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}
