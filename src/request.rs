//! Resample request - the immutable configuration of one resample pass

use crate::error::{ResampleError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default voxel budget (a 256^3 volume)
pub const DEFAULT_TARGET_SIZE: usize = 256 * 256 * 256;

/// What a single resample pass should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleRequest {
    /// Maximum number of voxels in the output
    pub target_size: usize,

    /// Stack of projections whose slow axis must never be subsampled
    pub acquisition: bool,
}

impl ResampleRequest {
    pub fn new(target_size: usize) -> Self {
        Self {
            target_size,
            ..Self::default()
        }
    }

    /// Set the voxel budget
    pub fn with_target_size(mut self, target_size: usize) -> Self {
        self.target_size = target_size;
        self
    }

    /// Mark the source as acquisition data
    pub fn with_acquisition(mut self, acquisition: bool) -> Self {
        self.acquisition = acquisition;
        self
    }

    /// Check the request can drive a resample pass
    pub fn validate(&self) -> Result<()> {
        if self.target_size == 0 {
            return Err(ResampleError::config("Target size must be positive"));
        }
        Ok(())
    }

    /// Parse a request from JSON, e.g. `{"target_size": 1000000, "acquisition": true}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(json)?;
        request.validate()?;
        Ok(request)
    }

    /// Load a request from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }
}

impl Default for ResampleRequest {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            acquisition: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let request = ResampleRequest::new(100).with_acquisition(true);
        assert_eq!(request.target_size, 100);
        assert!(request.acquisition);
        assert_eq!(request.with_target_size(7).target_size, 7);
    }

    #[test]
    fn test_json_defaults() {
        let request = ResampleRequest::from_json_str(r#"{"acquisition": true}"#).unwrap();
        assert_eq!(request.target_size, DEFAULT_TARGET_SIZE);
        assert!(request.acquisition);

        let request = ResampleRequest::from_json_str(r#"{"target_size": 1000}"#).unwrap();
        assert_eq!(request, ResampleRequest::new(1000));
    }

    #[test]
    fn test_json_errors() {
        let err = ResampleRequest::from_json_str(r#"{"target_size": 0}"#).unwrap_err();
        assert!(matches!(err, ResampleError::Configuration(_)));

        let err = ResampleRequest::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ResampleError::Serialization(_)));
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("request.json");
        let request = ResampleRequest::new(4096).with_acquisition(true);
        fs::write(&path, serde_json::to_string_pretty(&request).unwrap()).unwrap();
        assert_eq!(ResampleRequest::from_json_file(&path).unwrap(), request);
    }
}
