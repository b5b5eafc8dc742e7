use shipcnn::conv::{ConvAlgorithm, ConvGeometry};
use shipcnn::error::CnnError;
use shipcnn::network::*;
use shipcnn::quantization::Activation;

fn pool_one(input: &[i8], kind: PoolKind) -> i8 {
    let geometry = PoolGeometry::new(1, 2, 2, 2);
    let mut out = [0i8; 1];
    pool2d_i8(input, &geometry, kind, &mut out);
    out[0]
}

#[test]
fn avg_pool_truncates() {
    assert_eq!(pool_one(&[4, 4, 4, 4], PoolKind::Average), 4);
    assert_eq!(pool_one(&[1, 2, 3, 4], PoolKind::Average), 2);
    // -5 / 4 truncates toward zero
    assert_eq!(pool_one(&[-1, -1, -1, -2], PoolKind::Average), -1);
}

#[test]
fn max_pool_picks_largest() {
    assert_eq!(pool_one(&[-10, 3, -5, 7], PoolKind::Max), 7);
    assert_eq!(pool_one(&[-128, -128, -128, -128], PoolKind::Max), -128);
}

#[test]
fn pool_discards_remainder_rows_and_columns() {
    // 1 channel, 3x5 input, pool 2 -> 1x2
    let geometry = PoolGeometry::new(1, 2, 3, 5);
    assert_eq!((geometry.out_h(), geometry.out_w()), (1, 2));
    #[rustfmt::skip]
    let input = [
        1, 2, 3, 4, 100,
        5, 6, 7, 8, 100,
        100, 100, 100, 100, 100,
    ];
    let mut out = [0i8; 2];
    pool2d_i8(&input, &geometry, PoolKind::Max, &mut out);
    assert_eq!(out, [6, 8]);
}

#[test]
fn pool_is_per_channel() {
    let geometry = PoolGeometry::new(2, 2, 2, 2);
    let input = [1, 1, 1, 1, 10, 20, 30, 40];
    let mut out = [0i8; 2];
    pool2d_i8(&input, &geometry, PoolKind::Average, &mut out);
    assert_eq!(out, [1, 25]);
}

#[test]
fn linear_relu_and_clamp() {
    let input = [1i8, 2, 3];
    // two outputs: +14 and -14 before bias
    let weights = [1i8, 2, 3, -1, -2, -3];
    let bias = [0i32, 0];
    let mut out = [0i8; 2];

    linear_i8(&input, &weights, &bias, Activation::Relu, &mut out);
    assert_eq!(out, [14, 0]);

    linear_i8(&input, &weights, &bias, Activation::Clamp, &mut out);
    assert_eq!(out, [14, -14]);

    linear_i8(&input, &weights, &[200, -200], Activation::Clamp, &mut out);
    assert_eq!(out, [127, -128]);
}

#[test]
fn dropout_and_flatten_are_identity() {
    let input: Vec<i8> = (-5..5).collect();
    let mut out = vec![0i8; input.len()];
    dropout_i8(&input, &mut out);
    assert_eq!(out, input);

    let mut layer = FlattenLayerQ::new(2, 5, 1);
    let mut out = vec![0i8; 10];
    layer.fwd_i8(&input, &mut out);
    assert_eq!(out, input);
}

#[test]
fn network_rejects_mismatched_chain() {
    let mut net = QuantizedNeuralNetwork::new(16);
    net.add(Box::new(Pool2dLayerQ::new(PoolGeometry::new(1, 2, 4, 4), PoolKind::Max)))
        .unwrap();
    let err = net.add(Box::new(DropoutLayerQ::new(5))).unwrap_err();
    assert!(matches!(
        err,
        CnnError::LayerChainMismatch { layer: LayerType::Dropout, expected: 5, actual: 4 }
    ));
    assert_eq!(net.num_layers(), 1);
}

#[test]
fn network_runs_layers_in_order() {
    let geometry = ConvGeometry::new(1, 1, 3, 1, 4, 4);
    let mut net = QuantizedNeuralNetwork::new(16);
    net.add(Box::new(Conv2dLayerQ::new(geometry, vec![1; 9], vec![0], ConvAlgorithm::LineBuffer)))
        .unwrap();
    net.add(Box::new(Pool2dLayerQ::new(PoolGeometry::new(1, 2, 2, 2), PoolKind::Average)))
        .unwrap();
    net.add(Box::new(LinearLayerQ::new(1, 2, vec![1, -1], vec![0, 0], Activation::Clamp)))
        .unwrap();

    let out = net.predict(&[1i8; 16]).unwrap();
    assert_eq!(out, &[9i8, -9][..]);

    let kinds: Vec<LayerType> = net.intermediates().map(|(k, _)| k).collect();
    assert_eq!(kinds, vec![LayerType::Conv2dReLu, LayerType::AvgPool2d, LayerType::Linear]);
    assert_eq!(net.buffer_memory_bytes(), 4 + 1 + 2);
    assert_eq!(net.layer_weight_memory(), vec![9 + 4, 0, 2 + 8]);
}

#[test]
fn network_rejects_wrong_input_length() {
    let mut net = QuantizedNeuralNetwork::new(4);
    net.add(Box::new(DropoutLayerQ::new(4))).unwrap();
    let err = net.predict(&[0i8; 3]).unwrap_err();
    assert!(matches!(err, CnnError::InvalidInputLength { expected: 4, actual: 3 }));
}
