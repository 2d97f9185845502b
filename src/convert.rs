//! Conversion between image volumes and `ndarray` arrays

use crate::error::{ResampleError, Result};
use crate::volume::{Element, ImageVolume};
use ndarray::{Array3, ArrayBase, Data, Ix3};

/// Converts volumes to and from `(z, y, x)` arrays, x varying fastest
pub struct Converter;

impl Converter {
    /// Copy a volume into an array indexed `[z, y, x]`
    pub fn volume_to_array<T: Element>(volume: &ImageVolume) -> Result<Array3<T>> {
        let [x, y, z] = volume.dims();
        let data = volume.as_slice::<T>()?.to_vec();
        Array3::from_shape_vec((z, y, x), data)
            .map_err(|e| ResampleError::config(format!("Cannot shape volume as array: {}", e)))
    }

    /// Build a volume from an array indexed `[z, y, x]`, in any memory layout
    pub fn array_to_volume<S, T>(array: &ArrayBase<S, Ix3>) -> Result<ImageVolume>
    where
        S: Data<Elem = T>,
        T: Element,
    {
        let (z, y, x) = array.dim();
        let data: Vec<T> = array.iter().copied().collect();
        ImageVolume::new([x, y, z], T::into_buffer(data))
    }
}
