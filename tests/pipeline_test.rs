use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use shipcnn::benchmark::run_benchmark;
use shipcnn::conv::ConvAlgorithm;
use shipcnn::error::CnnError;
use shipcnn::network::LayerType;
use shipcnn::ship_detector::*;
use shipcnn::tensor::TensorI8;

fn seeded_blob(seed: u64) -> Vec<i8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..TOTAL_WEIGHTS).map(|_| rng.gen_range(-3i8..=3)).collect()
}

fn seeded_image(seed: u64, shape: InputShape) -> TensorI8 {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..CONV1_IN_CH * shape.h * shape.w).map(|_| rng.gen::<i8>()).collect();
    TensorI8::from_vec(CONV1_IN_CH, shape.h, shape.w, data).unwrap()
}

fn config(algorithm: ConvAlgorithm) -> PipelineConfig {
    PipelineConfig { algorithm, ..PipelineConfig::default() }
}

#[test]
fn default_shape_propagates_to_fc1_width() {
    let shape = NetworkShape::propagate(InputShape::default()).unwrap();
    assert_eq!((shape.conv1.out_h(), shape.conv1.out_w()), (136, 72));
    assert_eq!((shape.pool1.out_h(), shape.pool1.out_w()), (68, 36));
    assert_eq!((shape.conv2.out_h(), shape.conv2.out_w()), (66, 34));
    assert_eq!((shape.pool2.out_h(), shape.pool2.out_w()), (33, 17));
    assert_eq!((shape.conv3.out_h(), shape.conv3.out_w()), (16, 8));
    assert_eq!((shape.pool3.out_h(), shape.pool3.out_w()), (8, 4));
    assert_eq!(shape.flatten, FC1_IN);
}

#[test]
fn square_128_input_is_rejected() {
    let err = NetworkShape::propagate(InputShape { h: 128, w: 128 }).unwrap_err();
    assert!(matches!(err, CnnError::FlattenMismatch { computed: 1568, declared: 1024 }));
}

#[test]
fn uneven_pooling_is_rejected() {
    // 139 -> conv1 137, which AvgPool(2) cannot tile
    let err = NetworkShape::propagate(InputShape { h: 139, w: 74 }).unwrap_err();
    assert!(matches!(
        err,
        CnnError::UnevenPooling { layer: LayerType::AvgPool2d, size: 137, pool: 2 }
    ));
}

#[test]
fn tiny_input_is_degenerate() {
    let err = NetworkShape::propagate(InputShape { h: 2, w: 74 }).unwrap_err();
    assert!(matches!(err, CnnError::DegenerateDimension { .. }));
}

#[test]
fn hand_built_weights_are_size_checked() {
    let mut weights = NetworkWeights::from_blob(&seeded_blob(1)).unwrap();
    weights.fc2.pop();
    let err = ShipDetector::new(weights, PipelineConfig::default()).err().unwrap();
    assert!(matches!(err, CnnError::WeightBlobSizeMismatch { expected: FC2_WEIGHTS, .. }));
}

#[test]
fn detector_has_ten_layers() {
    let detector = ShipDetector::from_blob(&seeded_blob(1), PipelineConfig::default()).unwrap();
    let kinds: Vec<LayerType> = detector.network().intermediates().map(|(k, _)| k).collect();
    assert_eq!(
        kinds,
        vec![
            LayerType::Conv2dReLu,
            LayerType::AvgPool2d,
            LayerType::Conv2dReLu,
            LayerType::AvgPool2d,
            LayerType::Conv2dReLu,
            LayerType::MaxPool2d,
            LayerType::Flatten,
            LayerType::LinearReLu,
            LayerType::Dropout,
            LayerType::Linear,
        ]
    );
}

#[test]
fn inference_is_deterministic() {
    let blob = seeded_blob(42);
    let image = seeded_image(43, InputShape::default());
    let mut detector = ShipDetector::from_blob(&blob, PipelineConfig::default()).unwrap();

    let first = detector.predict(&image).unwrap();
    let second = detector.predict(&image).unwrap();
    assert_eq!(first, second);

    let mut rebuilt = ShipDetector::from_blob(&blob, PipelineConfig::default()).unwrap();
    assert_eq!(rebuilt.predict(&image).unwrap(), first);
    assert_eq!(rebuilt.classify(&image).unwrap(), argmax(&first));
}

#[test]
fn direct_and_line_buffer_pipelines_agree() {
    let blob = seeded_blob(5);
    let mut direct = ShipDetector::from_blob(&blob, config(ConvAlgorithm::Direct)).unwrap();
    let mut streaming = ShipDetector::from_blob(&blob, config(ConvAlgorithm::LineBuffer)).unwrap();

    for seed in 0..3 {
        let image = seeded_image(100 + seed, InputShape::default());
        assert_eq!(direct.predict(&image).unwrap(), streaming.predict(&image).unwrap());
        let layers = direct.network().intermediates().zip(streaming.network().intermediates());
        for ((kind, d), (_, s)) in layers {
            assert_eq!(d, s, "{} differs for image seed {}", kind, seed);
        }
    }
}

#[test]
fn wrong_image_shape_is_rejected() {
    let mut detector = ShipDetector::from_blob(&seeded_blob(1), PipelineConfig::default()).unwrap();
    let image = TensorI8::new(3, 128, 128);
    let err = detector.predict(&image).unwrap_err();
    assert!(matches!(
        err,
        CnnError::InputShapeMismatch { expected: (3, 138, 74), actual: (3, 128, 128) }
    ));
}

#[test]
fn argmax_prefers_the_first_maximum() {
    assert_eq!(argmax(&[1, 5, 5, -3]), 1);
    assert_eq!(argmax(&[-128, -128, -128, -128]), 0);
    assert_eq!(argmax(&[-7, -9, -2, -2]), 2);
}

#[test]
fn benchmark_reports_full_agreement() {
    let blob = seeded_blob(9);
    let mut direct = ShipDetector::from_blob(&blob, config(ConvAlgorithm::Direct)).unwrap();
    let mut streaming = ShipDetector::from_blob(&blob, config(ConvAlgorithm::LineBuffer)).unwrap();
    let inputs: Vec<TensorI8> = (0..2).map(|s| seeded_image(s, InputShape::default())).collect();

    let result = run_benchmark(&mut direct, &mut streaming, &inputs).unwrap();
    assert_eq!(result.num_samples, 2);
    assert_eq!(result.layer_metrics.len(), 10);
    assert!(result.layer_metrics.iter().all(|m| m.identical));
    assert_eq!(result.class_agreement, 100.0);
    assert_eq!(result.score_agreement, 100.0);
    assert_eq!(result.weight_mem, TOTAL_WEIGHTS + 4 * (16 + 32 + 32 + 256 + 4));
    // (K-1) rows plus a KxK window per input channel
    assert_eq!(
        result.line_buffer_mem,
        3 * (2 * 74 + 9) + 16 * (2 * 36 + 9) + 32 * (2 * 17 + 9)
    );
}
