//! Resample layout - maps every output sample to the source sample it is read from

use crate::error::{ResampleError, Result};
use crate::shape::TargetShape;
use crate::types::{checked_payload_bytes, ElementType, VolumeShape};

/// Per-axis source index tables for one resample pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResampleLayout {
    /// Source shape in image order
    pub source_shape: VolumeShape,

    /// Output shape in image order
    pub output_shape: VolumeShape,

    /// Element descriptor of the stored data
    pub element: ElementType,

    /// Source x index for every output x
    pub x_indices: Vec<usize>,

    /// Source y index for every output y
    pub y_indices: Vec<usize>,

    /// Source z slice for every output slice (first slice of each chunk)
    pub z_indices: Vec<usize>,
}

impl ResampleLayout {
    /// Build the index tables for a computed target shape
    pub fn new(source_shape: VolumeShape, target: &TargetShape, element: ElementType) -> Result<Self> {
        if source_shape.iter().any(|&d| d == 0) {
            return Err(ResampleError::config(format!(
                "Source shape {:?} has an empty axis",
                source_shape
            )));
        }
        if checked_payload_bytes(&source_shape, element.size_in_bytes()).is_none() {
            return Err(ResampleError::config(format!(
                "Source shape {:?} is too large to address",
                source_shape
            )));
        }

        let output_shape = target.shape;
        let z_indices: Vec<usize> = (0..output_shape[2])
            .map(|k| k * target.slice_per_chunk)
            .collect();

        if z_indices.last().is_some_and(|&z| z >= source_shape[2]) {
            return Err(ResampleError::config(format!(
                "Target shape {:?} does not fit source shape {:?}",
                output_shape, source_shape
            )));
        }

        Ok(Self {
            source_shape,
            output_shape,
            element,
            x_indices: decimate(source_shape[0], output_shape[0]),
            y_indices: decimate(source_shape[1], output_shape[1]),
            z_indices,
        })
    }

    /// Number of voxels in the source
    pub fn source_voxels(&self) -> usize {
        self.source_shape.iter().product()
    }

    /// Number of voxels in the output
    pub fn output_voxels(&self) -> usize {
        self.output_shape.iter().product()
    }

    /// Bytes of one source z slice
    pub fn slice_bytes(&self) -> usize {
        self.source_shape[0] * self.source_shape[1] * self.element.size_in_bytes()
    }

    /// Total bytes of the source payload
    pub fn payload_bytes(&self) -> u64 {
        self.source_voxels() as u64 * self.element.size_in_bytes() as u64
    }

    /// Byte offset of a source z slice relative to the start of the payload
    pub fn slice_offset(&self, z: usize) -> u64 {
        z as u64 * self.slice_bytes() as u64
    }

    /// Whether every source sample is kept
    pub fn is_identity(&self) -> bool {
        self.source_shape == self.output_shape
    }

    /// Output spacing that preserves the physical extent of the source
    pub fn output_spacing(&self, source_spacing: [f64; 3]) -> [f64; 3] {
        let mut spacing = source_spacing;
        for (axis, s) in spacing.iter_mut().enumerate() {
            *s *= self.source_shape[axis] as f64 / self.output_shape[axis] as f64;
        }
        spacing
    }

    /// Get a summary string of the layout
    pub fn summary(&self) -> String {
        let fmt_shape = |s: &VolumeShape| {
            s.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(" x ")
        };

        format!(
            "{} -> {} ({}), {} of {} voxels",
            fmt_shape(&self.source_shape),
            fmt_shape(&self.output_shape),
            self.element.kind,
            self.output_voxels(),
            self.source_voxels(),
        )
    }
}

/// Nearest-lower source index for each of `output` samples over `source` samples
fn decimate(source: usize, output: usize) -> Vec<usize> {
    (0..output).map(|i| i * source / output).collect()
}
