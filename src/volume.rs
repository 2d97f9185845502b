//! Dense image volumes produced by the resample readers

use crate::error::{ResampleError, Result};
use crate::shape::TargetShape;
use crate::types::{Endianness, ScalarKind, ValueRange, VolumeShape};
use crate::utils::{bytes_to_typed_data, typed_data_to_bytes};
use npyz::AutoSerialize;
use num_traits::ToPrimitive;
use std::fmt::Debug;

/// Scalar type that can be stored in a [`VoxelBuffer`]
pub trait Element:
    Copy + Default + PartialOrd + ToPrimitive + Debug + AutoSerialize + 'static
{
    const KIND: ScalarKind;

    /// Decode one element from exactly `size_of::<Self>()` bytes
    fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self;

    /// Append the encoded element to `out`
    fn write_bytes(self, endianness: Endianness, out: &mut Vec<u8>);

    fn into_buffer(data: Vec<Self>) -> VoxelBuffer;

    fn from_buffer(buffer: &VoxelBuffer) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const KIND: ScalarKind = ScalarKind::$variant;

                fn from_bytes(bytes: &[u8], endianness: Endianness) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    match endianness {
                        Endianness::Little => <$ty>::from_le_bytes(raw),
                        Endianness::Big => <$ty>::from_be_bytes(raw),
                    }
                }

                fn write_bytes(self, endianness: Endianness, out: &mut Vec<u8>) {
                    match endianness {
                        Endianness::Little => out.extend_from_slice(&self.to_le_bytes()),
                        Endianness::Big => out.extend_from_slice(&self.to_be_bytes()),
                    }
                }

                fn into_buffer(data: Vec<Self>) -> VoxelBuffer {
                    VoxelBuffer::$variant(data)
                }

                fn from_buffer(buffer: &VoxelBuffer) -> Option<&[Self]> {
                    match buffer {
                        VoxelBuffer::$variant(data) => Some(data),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_element!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

/// Native-endian voxel storage, x varying fastest
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelBuffer {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! with_buffer {
    ($buffer:expr, $data:ident => $body:expr) => {
        match $buffer {
            VoxelBuffer::U8($data) => $body,
            VoxelBuffer::I8($data) => $body,
            VoxelBuffer::U16($data) => $body,
            VoxelBuffer::I16($data) => $body,
            VoxelBuffer::U32($data) => $body,
            VoxelBuffer::I32($data) => $body,
            VoxelBuffer::U64($data) => $body,
            VoxelBuffer::I64($data) => $body,
            VoxelBuffer::F32($data) => $body,
            VoxelBuffer::F64($data) => $body,
        }
    };
}

pub(crate) use with_buffer;

impl VoxelBuffer {
    /// Decode stored bytes of `kind` into native values
    pub fn decode(kind: ScalarKind, endianness: Endianness, bytes: &[u8]) -> Result<Self> {
        fn typed<T: Element>(bytes: &[u8], endianness: Endianness) -> Result<VoxelBuffer> {
            Ok(T::into_buffer(bytes_to_typed_data::<T>(bytes, endianness)?))
        }

        match kind {
            ScalarKind::U8 => typed::<u8>(bytes, endianness),
            ScalarKind::I8 => typed::<i8>(bytes, endianness),
            ScalarKind::U16 => typed::<u16>(bytes, endianness),
            ScalarKind::I16 => typed::<i16>(bytes, endianness),
            ScalarKind::U32 => typed::<u32>(bytes, endianness),
            ScalarKind::I32 => typed::<i32>(bytes, endianness),
            ScalarKind::U64 => typed::<u64>(bytes, endianness),
            ScalarKind::I64 => typed::<i64>(bytes, endianness),
            ScalarKind::F32 => typed::<f32>(bytes, endianness),
            ScalarKind::F64 => typed::<f64>(bytes, endianness),
        }
    }

    /// Encode the values as bytes in `endianness`
    pub fn to_bytes(&self, endianness: Endianness) -> Vec<u8> {
        with_buffer!(self, data => typed_data_to_bytes(data, endianness))
    }

    pub fn kind(&self) -> ScalarKind {
        match self {
            VoxelBuffer::U8(_) => ScalarKind::U8,
            VoxelBuffer::I8(_) => ScalarKind::I8,
            VoxelBuffer::U16(_) => ScalarKind::U16,
            VoxelBuffer::I16(_) => ScalarKind::I16,
            VoxelBuffer::U32(_) => ScalarKind::U32,
            VoxelBuffer::I32(_) => ScalarKind::I32,
            VoxelBuffer::U64(_) => ScalarKind::U64,
            VoxelBuffer::I64(_) => ScalarKind::I64,
            VoxelBuffer::F32(_) => ScalarKind::F32,
            VoxelBuffer::F64(_) => ScalarKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        with_buffer!(self, data => data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value as `f64`, `None` when out of range
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        with_buffer!(self, data => data.get(index).and_then(|v| v.to_f64()))
    }

    /// Minimum and maximum over all values, ignoring NaN
    pub fn value_range(&self) -> Option<ValueRange> {
        with_buffer!(self, data => {
            data.iter()
                .filter_map(|v| v.to_f64())
                .filter(|v| !v.is_nan())
                .fold(None, |range: Option<ValueRange>, v| match range {
                    None => Some(ValueRange::new(v, v)),
                    Some(r) => Some(ValueRange::new(r.min.min(v), r.max.max(v))),
                })
        })
    }
}

/// Dense 3D image in image order, with the extent convention of
/// visualization toolkits: `[0, dim-1]` per axis, origin at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageVolume {
    dims: VolumeShape,
    spacing: [f64; 3],
    origin: [f64; 3],
    data: VoxelBuffer,
    target: Option<TargetShape>,
}

/// Output of a resample pass
pub type DownsampledVolume = ImageVolume;

impl ImageVolume {
    /// Create a volume; `data` holds `dims[0] * dims[1] * dims[2]` values, x fastest
    pub fn new(dims: VolumeShape, data: VoxelBuffer) -> Result<Self> {
        if dims.iter().any(|&d| d == 0) {
            return Err(ResampleError::config(format!(
                "Volume dimensions {:?} must be positive",
                dims
            )));
        }

        let voxels: usize = dims.iter().product();
        if data.len() != voxels {
            let width = data.kind().size_in_bytes() as u64;
            return Err(ResampleError::SizeMismatch {
                expected: voxels as u64 * width,
                actual: data.len() as u64 * width,
            });
        }

        Ok(Self {
            dims,
            spacing: [1.0; 3],
            origin: [0.0; 3],
            data,
            target: None,
        })
    }

    /// Set spacing
    pub fn with_spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    /// Record the target shape the volume was resampled with
    pub fn with_target(mut self, target: TargetShape) -> Self {
        self.target = Some(target);
        self
    }

    /// Dimensions `(x, y, z)`
    pub fn dims(&self) -> VolumeShape {
        self.dims
    }

    /// Inclusive extent `[x0, x1, y0, y1, z0, z1]`
    pub fn extent(&self) -> [i64; 6] {
        [
            0,
            self.dims[0] as i64 - 1,
            0,
            self.dims[1] as i64 - 1,
            0,
            self.dims[2] as i64 - 1,
        ]
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn data(&self) -> &VoxelBuffer {
        &self.data
    }

    pub fn into_data(self) -> VoxelBuffer {
        self.data
    }

    pub fn scalar_kind(&self) -> ScalarKind {
        self.data.kind()
    }

    pub fn target(&self) -> Option<&TargetShape> {
        self.target.as_ref()
    }

    pub fn voxel_count(&self) -> usize {
        self.data.len()
    }

    /// Typed view of the voxels
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        T::from_buffer(&self.data).ok_or(ResampleError::TypeMismatch {
            expected: T::KIND,
            actual: self.scalar_kind(),
        })
    }

    /// Value at `(x, y, z)` as `f64`
    pub fn value_at(&self, x: usize, y: usize, z: usize) -> Option<f64> {
        if x >= self.dims[0] || y >= self.dims[1] || z >= self.dims[2] {
            return None;
        }
        self.data
            .get_f64(x + self.dims[0] * (y + self.dims[1] * z))
    }

    pub fn value_range(&self) -> Option<ValueRange> {
        self.data.value_range()
    }
}
