//! End-to-end tests for the resample readers
//!
//! Every test writes the same small volume to disk in one of the supported
//! containers and reads it back through the public reader API.

use ndarray::Array3;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use volume_resample::{
    read_resampled, write_npy, BaseResampleReader, CompressionLevel, Converter, ImageVolume,
    MetaImageResampleReader, MetaImageWriter, NumpyResampleReader, ResampleError,
    ResampleRequest, ScalarKind,
};

/// Stored array shape `(z, y, x)`
const ARRAY_SHAPE: (usize, usize, usize) = (5, 10, 6);
const TOTAL: usize = 5 * 10 * 6;

/// Deterministic test array indexed `[z, y, x]`
fn test_array() -> Array3<u8> {
    Array3::from_shape_fn(ARRAY_SHAPE, |(z, y, x)| ((x * 7 + y * 13 + z * 31) % 256) as u8)
}

fn test_volume() -> ImageVolume {
    Converter::array_to_volume(&test_array()).unwrap()
}

fn write_raw(path: &Path) {
    let bytes: Vec<u8> = test_array().iter().copied().collect();
    fs::write(path, bytes).unwrap();
}

fn raw_reader(path: &Path) -> BaseResampleReader {
    let mut reader = BaseResampleReader::new();
    reader.set_file_name(path);
    reader.set_stored_array_shape(&[5, 10, 6]);
    reader.set_raw_type_code("uint8");
    reader
}

#[test]
fn test_raw_reader_downsamples_to_budget() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("volume.raw");
    write_raw(&path);

    let mut reader = raw_reader(&path);
    reader.set_target_size(100);
    let volume = reader.update().unwrap();

    assert_eq!(volume.extent(), [0, 3, 0, 5, 0, 4]);
    assert_eq!(volume.origin(), [0.0; 3]);
    assert_eq!(volume.scalar_kind(), ScalarKind::U8);
    assert!(volume.voxel_count() <= TOTAL);
}

#[test]
fn test_numpy_reader_downsamples_to_budget() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("volume.npy");
    write_npy(&path, &test_volume()).unwrap();

    let mut reader = NumpyResampleReader::new();
    reader.set_file_name(&path);
    reader.set_target_size(100);
    let volume = reader.update().unwrap();

    assert_eq!(volume.extent(), [0, 3, 0, 5, 0, 4]);
}

#[test]
fn test_metaimage_reader_downsamples_to_budget() {
    let dir = TempDir::new().unwrap();
    for name in ["volume.mha", "volume.mhd"] {
        let path = dir.path().join(name);
        MetaImageWriter::new().write(&path, &test_volume()).unwrap();

        let mut reader = MetaImageResampleReader::new();
        reader.set_file_name(&path);
        reader.set_target_size(100);
        let volume = reader.update().unwrap();

        assert_eq!(volume.extent(), [0, 3, 0, 5, 0, 4], "{name}");
    }
    assert!(dir.path().join("volume.raw").exists());
}

#[test]
fn test_all_formats_agree() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("volume.raw");
    let npy = dir.path().join("volume.npy");
    let mha = dir.path().join("volume.mha");
    write_raw(&raw);
    write_npy(&npy, &test_volume()).unwrap();
    MetaImageWriter::new().write(&mha, &test_volume()).unwrap();

    let request = ResampleRequest::new(100);
    let mut reader = raw_reader(&raw);
    reader.set_request(request);
    let from_raw = reader.update().unwrap().clone();

    let from_npy = read_resampled(&npy, &request).unwrap();
    let from_mha = read_resampled(&mha, &request).unwrap();

    assert_eq!(from_raw.data(), from_npy.data());
    assert_eq!(from_raw.data(), from_mha.data());
}

/// Write the test volume as raw, `.npy`, `.mha` and `.mhd` and read each
/// back with its own reader at `request`
fn read_every_container(dir: &TempDir, request: ResampleRequest) -> Vec<(&'static str, ImageVolume)> {
    let raw = dir.path().join("volume.raw");
    let npy = dir.path().join("volume.npy");
    let mha = dir.path().join("volume.mha");
    let mhd = dir.path().join("detached.mhd");
    write_raw(&raw);
    write_npy(&npy, &test_volume()).unwrap();
    MetaImageWriter::new().write(&mha, &test_volume()).unwrap();
    MetaImageWriter::new().write(&mhd, &test_volume()).unwrap();

    let mut base_reader = raw_reader(&raw);
    base_reader.set_request(request);

    let mut numpy_reader = NumpyResampleReader::new();
    numpy_reader.set_file_name(&npy);
    numpy_reader.set_request(request);

    let mut meta_reader = MetaImageResampleReader::new();
    meta_reader.set_request(request);
    meta_reader.set_file_name(&mha);
    let from_mha = meta_reader.update().unwrap().clone();
    meta_reader.set_file_name(&mhd);
    let from_mhd = meta_reader.update().unwrap().clone();

    vec![
        ("raw", base_reader.update().unwrap().clone()),
        ("npy", numpy_reader.update().unwrap().clone()),
        ("mha", from_mha),
        ("mhd", from_mhd),
    ]
}

#[test]
fn test_large_budget_is_exact_copy() {
    let dir = TempDir::new().unwrap();
    for (name, volume) in read_every_container(&dir, ResampleRequest::new(2 * TOTAL)) {
        assert_eq!(volume.extent(), [0, 5, 0, 9, 0, 4], "{name}");
        assert_eq!(volume.spacing(), [1.0; 3], "{name}");

        let array = Converter::volume_to_array::<u8>(&volume).unwrap();
        assert_eq!(array, test_array(), "{name}");
    }
}

#[test]
fn test_acquisition_mode_in_every_container() {
    let dir = TempDir::new().unwrap();
    let request = ResampleRequest::new(100).with_acquisition(true);
    for (name, volume) in read_every_container(&dir, request) {
        assert_eq!(volume.extent(), [0, 2, 0, 4, 0, 4], "{name}");
        assert_eq!(volume.voxel_count(), 3 * 5 * 5, "{name}");
    }
}

#[test]
fn test_oversized_declared_shapes_are_errors() {
    let dir = TempDir::new().unwrap();
    let huge = 1usize << 32;

    let raw = dir.path().join("volume.raw");
    write_raw(&raw);
    let mut reader = BaseResampleReader::new();
    reader.set_file_name(&raw);
    reader.set_stored_array_shape(&[huge, huge, huge]);
    reader.set_raw_type_code("uint8");
    assert!(matches!(reader.update(), Err(ResampleError::Configuration(_))));

    let mha = dir.path().join("huge.mha");
    fs::write(
        &mha,
        format!(
            "NDims = 3\nDimSize = {huge} {huge} {huge}\nElementType = MET_UCHAR\nElementDataFile = LOCAL\n"
        ),
    )
    .unwrap();
    let mut reader = MetaImageResampleReader::new();
    reader.set_file_name(&mha);
    assert!(matches!(reader.update(), Err(ResampleError::FormatParse(_))));

    let npy = dir.path().join("huge.npy");
    // 2^62 voxels of 8 bytes
    let half = 1usize << 31;
    let mut dict =
        format!("{{'descr': '<f8', 'fortran_order': False, 'shape': ({half}, {half}, 1), }}");
    while (10 + dict.len() + 1) % 64 != 0 {
        dict.push(' ');
    }
    dict.push('\n');
    let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
    bytes.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    bytes.extend_from_slice(dict.as_bytes());
    fs::write(&npy, bytes).unwrap();
    let mut reader = NumpyResampleReader::new();
    reader.set_file_name(&npy);
    assert!(matches!(reader.update(), Err(ResampleError::FormatParse(_))));
}

#[test]
fn test_acquisition_mode_keeps_every_slice() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("volume.raw");
    write_raw(&path);

    let mut reader = raw_reader(&path);
    reader.set_target_size(100);
    reader.set_is_acquisition_data(true);
    let volume = reader.update().unwrap();

    assert_eq!(volume.extent(), [0, 2, 0, 4, 0, 4]);
    assert_eq!(volume.voxel_count(), 3 * 5 * 5);

    // slice z of the output is decimated slice z of the source
    let source = test_array();
    for z in 0..5 {
        assert_eq!(volume.value_at(0, 0, z), Some(source[[z, 0, 0]] as f64));
    }
}

#[test]
fn test_reader_update_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("volume.raw");
    write_raw(&path);

    let mut reader = raw_reader(&path);
    reader.set_target_size(100);
    let first = reader.update().unwrap().clone();
    let second = reader.execute().unwrap().clone();
    assert_eq!(first, second);

    reader.set_target_size(2 * TOTAL);
    assert_eq!(reader.update().unwrap().dims(), [6, 10, 5]);
    assert!(reader.take_output().is_some());
    assert!(reader.output().is_none());
}

#[test]
fn test_truncated_raw_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("volume.raw");
    let bytes: Vec<u8> = test_array().iter().copied().take(TOTAL - 1).collect();
    fs::write(&path, bytes).unwrap();

    let mut reader = raw_reader(&path);
    let err = reader.update().unwrap_err();
    assert!(matches!(
        err,
        ResampleError::SizeMismatch {
            expected: 300,
            actual: 299
        }
    ));
    assert!(reader.output().is_none());
}

#[test]
fn test_raw_reader_requires_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("volume.raw");
    write_raw(&path);

    let mut reader = BaseResampleReader::new();
    reader.set_file_name(&path);
    let err = reader.update().unwrap_err();
    assert!(matches!(err, ResampleError::Configuration(_)));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let mut reader = NumpyResampleReader::new();
    reader.set_file_name(dir.path().join("absent.npy"));
    let err = reader.update().unwrap_err();
    assert!(matches!(err, ResampleError::Io(_)));
}

#[test]
fn test_compressed_metaimage_matches_uncompressed() {
    let dir = TempDir::new().unwrap();
    let plain = dir.path().join("plain.mha");
    let packed = dir.path().join("packed.mhd");
    MetaImageWriter::new().write(&plain, &test_volume()).unwrap();
    MetaImageWriter::new()
        .with_compression(Some(CompressionLevel::best()))
        .write(&packed, &test_volume())
        .unwrap();
    assert!(dir.path().join("packed.zraw").exists());

    for budget in [100, 2 * TOTAL] {
        let request = ResampleRequest::new(budget);
        let a = read_resampled(&plain, &request).unwrap();
        let b = read_resampled(&packed, &request).unwrap();
        assert_eq!(a, b, "budget {budget}");
    }
}

#[test]
fn test_metaimage_spacing_is_scaled() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spaced.mha");
    let volume = test_volume().with_spacing([0.5, 0.5, 2.0]);
    MetaImageWriter::new().write(&path, &volume).unwrap();

    let out = read_resampled(&path, &ResampleRequest::new(100)).unwrap();
    let spacing = out.spacing();
    assert!((spacing[0] - 0.75).abs() < 1e-9);
    assert!((spacing[1] - 0.5 * 10.0 / 6.0).abs() < 1e-9);
    assert!((spacing[2] - 2.0).abs() < 1e-9);
}

#[test]
fn test_big_endian_raw() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("volume.raw");
    let values: Vec<u16> = (0..TOTAL as u16).map(|v| v * 97).collect();
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
    fs::write(&path, bytes).unwrap();

    let mut reader = BaseResampleReader::new();
    reader.set_file_name(&path);
    reader.set_stored_array_shape(&[5, 10, 6]);
    reader.set_raw_type_code("uint16");
    reader.set_big_endian(true);
    reader.set_target_size(TOTAL);
    let volume = reader.update().unwrap();

    assert_eq!(volume.as_slice::<u16>().unwrap(), values.as_slice());
}

#[test]
fn test_fortran_raw_matches_c_raw() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("volume.raw");
    write_raw(&path);

    // the same bytes declared as a Fortran array of shape (x, y, z)
    let mut reader = BaseResampleReader::new();
    reader.set_file_name(&path);
    reader.set_stored_array_shape(&[6, 10, 5]);
    reader.set_raw_type_code("u1");
    reader.set_is_fortran(true);
    reader.set_target_size(100);
    let fortran = reader.update().unwrap().clone();

    let mut reader = raw_reader(&path);
    reader.set_target_size(100);
    assert_eq!(&fortran, reader.update().unwrap());
}

#[test]
fn test_request_from_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("request.json");
    fs::write(&path, r#"{ "target_size": 100, "acquisition": true }"#).unwrap();

    let request = ResampleRequest::from_json_file(&path).unwrap();
    assert_eq!(request.target_size, 100);
    assert!(request.acquisition);
}
