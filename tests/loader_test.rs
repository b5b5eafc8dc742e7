use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use shipcnn::error::CnnError;
use shipcnn::loader::*;
use shipcnn::ship_detector::*;

#[test]
fn offsets_follow_execution_order() {
    let blob = vec![0i8; TOTAL_WEIGHTS];
    let mut stream = WeightStream::new(&blob);
    let conv1 = stream.load_conv(CONV1_OUT_CH, CONV1_IN_CH, CONV1_K).unwrap();
    assert_eq!(conv1.len(), 432);
    assert_eq!(stream.offset(), 432);
    stream.load_conv(CONV2_OUT_CH, CONV2_IN_CH, CONV2_K).unwrap();
    assert_eq!(stream.offset(), 5040);
    assert_eq!(stream.remaining(), TOTAL_WEIGHTS - 5040);
}

#[test]
fn total_weight_count() {
    assert_eq!(TOTAL_WEIGHTS, 432 + 4608 + 9216 + 262_144 + 1024);
}

#[test]
fn weights_are_read_in_blob_order() {
    let blob: Vec<i8> = (0..TOTAL_WEIGHTS).map(|i| (i % 251) as u8 as i8).collect();
    let weights = NetworkWeights::from_blob(&blob).unwrap();
    assert_eq!(weights.conv1[0], blob[0]);
    assert_eq!(weights.conv2[0], blob[CONV1_WEIGHTS]);
    assert_eq!(weights.fc2[FC2_WEIGHTS - 1], blob[TOTAL_WEIGHTS - 1]);
    assert!(weights.fc1_bias.iter().all(|&b| b == 0));
}

#[test]
fn truncated_blob_is_rejected() {
    let blob = vec![1i8; TOTAL_WEIGHTS - 1];
    let err = NetworkWeights::from_blob(&blob).err().unwrap();
    assert!(matches!(
        err,
        CnnError::InsufficientWeightData { requested: FC2_WEIGHTS, available, .. }
            if available == TOTAL_WEIGHTS - 1
    ));
}

#[test]
fn oversized_blob_is_rejected() {
    let blob = vec![1i8; TOTAL_WEIGHTS + 3];
    let err = NetworkWeights::from_blob(&blob).err().unwrap();
    assert!(matches!(
        err,
        CnnError::WeightBlobSizeMismatch { expected: TOTAL_WEIGHTS, actual } if actual == TOTAL_WEIGHTS + 3
    ));
}

#[test]
fn map_is_zero_copy() {
    let blob = [1i8, 2, 3, 4, 5];
    let mut stream = WeightStream::new(&blob);
    stream.skip(1).unwrap();
    let view = stream.map(3).unwrap();
    assert_eq!(view, &blob[1..4]);
    assert!(std::ptr::eq(view.as_ptr(), blob[1..].as_ptr()));
    assert!(stream.finish(5).is_err());
}

#[test]
fn image_conversion_is_hwc_to_chw() {
    // 1x2 image, 3 channels, HWC: (r, g, b) per pixel
    let bytes = [0u8, 128, 255, 10, 20, 30];
    let t = image_from_hwc_u8(&bytes, 3, 1, 2).unwrap();
    assert_eq!(t.shape(), (3, 1, 2));
    assert_eq!(t.get(0, 0, 0), -128);
    assert_eq!(t.get(1, 0, 0), 0);
    assert_eq!(t.get(2, 0, 0), 127);
    assert_eq!(t.as_slice(), &[-128i8, -118, 0, -108, 127, -98][..]);
}

#[test]
fn image_length_is_checked() {
    let err = image_from_hwc_u8(&[0u8; 5], 3, 1, 2).unwrap_err();
    assert!(matches!(err, CnnError::InvalidInputLength { expected: 6, actual: 5 }));
}

#[test]
fn blob_file_plain_and_gzipped() {
    let dir = std::env::temp_dir().join(format!("shipcnn-loader-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let raw: Vec<u8> = vec![0, 1, 127, 128, 255];

    let plain = dir.join("weights.bin");
    std::fs::write(&plain, &raw).unwrap();
    assert_eq!(load_blob_file(&plain).unwrap(), vec![0, 1, 127, -128, -1]);

    let gz = dir.join("weights.bin.gz");
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&raw).unwrap();
    std::fs::write(&gz, enc.finish().unwrap()).unwrap();
    assert_eq!(load_blob_file(&gz).unwrap(), vec![0, 1, 127, -128, -1]);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_blob_file("/nonexistent/shipcnn/weights.bin").unwrap_err();
    assert!(matches!(err, CnnError::Io(_)));
}
