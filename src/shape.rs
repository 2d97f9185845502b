//! Target shape computation for budget-driven downsampling
//!
//! Shapes here are in image order `(x, y, z)`: z is the slow axis that is
//! grouped into chunks of consecutive slices.

use crate::types::VolumeShape;
use serde::{Deserialize, Serialize};

/// Result of a shape computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetShape {
    /// Output shape in image order
    pub shape: VolumeShape,
    /// Linear magnification applied to the x and y axes
    pub magnification: f64,
    /// Number of source z slices collapsed into one output slice
    pub slice_per_chunk: usize,
}

impl TargetShape {
    /// Shape that leaves the volume untouched
    pub fn identity(shape: VolumeShape) -> Self {
        Self {
            shape,
            magnification: 1.0,
            slice_per_chunk: 1,
        }
    }

    pub fn is_identity(&self, original: &VolumeShape) -> bool {
        self.shape == *original && self.slice_per_chunk == 1
    }

    pub fn total_voxels(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Compute the downsampled shape of `original` for a voxel budget.
///
/// Generic volumes are shrunk isotropically by `(budget/total)^(1/3)`: x and
/// y are scaled and truncated, z is divided into chunks of
/// `floor(1/magnification)` slices. Acquisition data keeps every z slice and
/// spends the whole budget in-plane with `(budget/total)^(1/2)`.
///
/// When `slice_per_chunk` clamps to 1 on the generic path, x and y still
/// shrink while z does not. The in-plane axes never drop below one sample.
pub fn compute_target_shape(
    original: VolumeShape,
    total_voxels: usize,
    target_size: usize,
    acquisition: bool,
) -> TargetShape {
    if target_size >= total_voxels {
        return TargetShape::identity(original);
    }

    let ratio = target_size as f64 / total_voxels as f64;
    let (magnification, slice_per_chunk) = if acquisition {
        (ratio.powf(0.5), 1)
    } else {
        let magnification = ratio.powf(1.0 / 3.0);
        let slice_per_chunk = ((1.0 / magnification) as usize).max(1);
        (magnification, slice_per_chunk)
    };

    let num_chunks = 1 + (slice_per_chunk..original[2])
        .step_by(slice_per_chunk)
        .count();

    let scale = |dim: usize| ((magnification * dim as f64) as usize).max(1);

    TargetShape {
        shape: [scale(original[0]), scale(original[1]), num_chunks],
        magnification,
        slice_per_chunk,
    }
}
