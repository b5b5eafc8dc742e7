use crate::conv::{conv2d_i8, ConvAlgorithm, ConvGeometry, LineBufferConv};
use crate::conv::simd;
use crate::quantization::Activation;
use super::LayerType;

/// Output extent of a non-overlapping pool: `floor(in / pool)`.
pub fn pool_out_size(in_size: usize, pool_size: usize) -> usize {
    if pool_size == 0 {
        return 0;
    }
    in_size / pool_size
}

/// Reduction applied to each pooling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// Window sum divided by `pool²`, truncating toward zero.
    Average,
    /// Largest element, starting from -128.
    Max,
}

/// Static shape of one pooling layer. Stride always equals `pool_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolGeometry {
    pub channels: usize,
    pub pool_size: usize,
    pub in_h: usize,
    pub in_w: usize,
}

impl PoolGeometry {
    pub fn new(channels: usize, pool_size: usize, in_h: usize, in_w: usize) -> Self {
        PoolGeometry { channels, pool_size, in_h, in_w }
    }

    pub fn out_h(&self) -> usize {
        pool_out_size(self.in_h, self.pool_size)
    }

    pub fn out_w(&self) -> usize {
        pool_out_size(self.in_w, self.pool_size)
    }

    pub fn input_len(&self) -> usize {
        self.channels * self.in_h * self.in_w
    }

    pub fn output_len(&self) -> usize {
        self.channels * self.out_h() * self.out_w()
    }
}

/// 2D pooling over non-overlapping windows, CHW in and out.
///
/// Rows and columns beyond `out * pool_size` are ignored.
pub fn pool2d_i8(input: &[i8], geometry: &PoolGeometry, kind: PoolKind, output: &mut [i8]) {
    let p = geometry.pool_size;
    let (in_h, in_w) = (geometry.in_h, geometry.in_w);
    let (out_h, out_w) = (geometry.out_h(), geometry.out_w());
    let area = (p * p) as i32;

    for c in 0..geometry.channels {
        let in_plane = c * in_h * in_w;
        let out_plane = c * out_h * out_w;
        for oh in 0..out_h {
            for ow in 0..out_w {
                let val = match kind {
                    PoolKind::Average => {
                        let mut sum: i32 = 0;
                        for ph in 0..p {
                            let off = in_plane + (oh * p + ph) * in_w + ow * p;
                            sum += simd::sum_i8(input, off, p);
                        }
                        // i32 division truncates toward zero; the mean of in-range
                        // values is already in range
                        (sum / area) as i8
                    }
                    PoolKind::Max => {
                        let mut max_val = i8::MIN;
                        for ph in 0..p {
                            let off = in_plane + (oh * p + ph) * in_w + ow * p;
                            for &v in &input[off..off + p] {
                                max_val = max_val.max(v);
                            }
                        }
                        max_val
                    }
                };
                output[out_plane + oh * out_w + ow] = val;
            }
        }
    }
}

/// Fully-connected INT8 layer.
///
/// `output[m] = activation(bias[m] + sum_n input[n] * weights[m][n])` with the
/// accumulation done in `i32`.
pub fn linear_i8(
    input: &[i8],
    weights: &[i8],
    bias: &[i32],
    activation: Activation,
    output: &mut [i8],
) {
    let in_features = input.len();
    for (o, out) in output.iter_mut().enumerate() {
        let sum = bias[o] + simd::dot_i8(input, 0, weights, o * in_features, in_features);
        *out = activation.apply(sum);
    }
}

/// Flattens a CHW map into a feature vector, channel-major.
pub fn flatten_i8(input: &[i8], output: &mut [i8]) {
    output.copy_from_slice(input);
}

/// Dropout at inference time: the identity.
pub fn dropout_i8(input: &[i8], output: &mut [i8]) {
    output.copy_from_slice(input);
}

/// A layer of the INT8 pipeline.
///
/// Layers read a flat input slice and overwrite a flat output slice, both owned by
/// the network; a layer never keeps a reference to either past the call.
pub trait QuantizedLayer {
    fn layer_type(&self) -> LayerType;
    fn input_len(&self) -> usize;
    fn output_len(&self) -> usize;
    fn fwd_i8(&mut self, input: &[i8], output: &mut [i8]);

    fn weight_memory_bytes(&self) -> usize {
        0
    }
}

/// INT8 convolution + ReLU-saturation, run by either engine.
pub struct Conv2dLayerQ {
    geometry: ConvGeometry,
    weights: Vec<i8>,
    bias: Vec<i32>,
    algorithm: ConvAlgorithm,
    line_buffer: LineBufferConv,
}

impl Conv2dLayerQ {
    pub fn new(geometry: ConvGeometry, weights: Vec<i8>, bias: Vec<i32>, algorithm: ConvAlgorithm) -> Self {
        Conv2dLayerQ {
            line_buffer: LineBufferConv::new(geometry),
            geometry,
            weights,
            bias,
            algorithm,
        }
    }

    pub fn geometry(&self) -> &ConvGeometry {
        &self.geometry
    }

    pub fn algorithm(&self) -> ConvAlgorithm {
        self.algorithm
    }
}

impl QuantizedLayer for Conv2dLayerQ {
    fn layer_type(&self) -> LayerType { LayerType::Conv2dReLu }
    fn input_len(&self) -> usize { self.geometry.input_len() }
    fn output_len(&self) -> usize { self.geometry.output_len() }

    fn weight_memory_bytes(&self) -> usize {
        self.weights.len() + self.bias.len() * 4
    }

    fn fwd_i8(&mut self, input: &[i8], output: &mut [i8]) {
        conv2d_i8(
            self.algorithm,
            input,
            &self.geometry,
            &self.weights,
            &self.bias,
            &mut self.line_buffer,
            output,
        );
    }
}

/// INT8 2D average or max pooling.
pub struct Pool2dLayerQ {
    geometry: PoolGeometry,
    kind: PoolKind,
}

impl Pool2dLayerQ {
    pub fn new(geometry: PoolGeometry, kind: PoolKind) -> Self {
        Pool2dLayerQ { geometry, kind }
    }
}

impl QuantizedLayer for Pool2dLayerQ {
    fn layer_type(&self) -> LayerType {
        match self.kind {
            PoolKind::Average => LayerType::AvgPool2d,
            PoolKind::Max => LayerType::MaxPool2d,
        }
    }
    fn input_len(&self) -> usize { self.geometry.input_len() }
    fn output_len(&self) -> usize { self.geometry.output_len() }

    fn fwd_i8(&mut self, input: &[i8], output: &mut [i8]) {
        pool2d_i8(input, &self.geometry, self.kind, output);
    }
}

/// INT8 flatten layer.
pub struct FlattenLayerQ {
    len: usize,
}

impl FlattenLayerQ {
    pub fn new(c: usize, h: usize, w: usize) -> Self {
        FlattenLayerQ { len: c * h * w }
    }
}

impl QuantizedLayer for FlattenLayerQ {
    fn layer_type(&self) -> LayerType { LayerType::Flatten }
    fn input_len(&self) -> usize { self.len }
    fn output_len(&self) -> usize { self.len }

    fn fwd_i8(&mut self, input: &[i8], output: &mut [i8]) {
        flatten_i8(input, output);
    }
}

/// INT8 fully-connected layer with a selectable output policy.
pub struct LinearLayerQ {
    in_features: usize,
    out_features: usize,
    weights: Vec<i8>,
    bias: Vec<i32>,
    activation: Activation,
}

impl LinearLayerQ {
    pub fn new(
        in_features: usize,
        out_features: usize,
        weights: Vec<i8>,
        bias: Vec<i32>,
        activation: Activation,
    ) -> Self {
        LinearLayerQ { in_features, out_features, weights, bias, activation }
    }
}

impl QuantizedLayer for LinearLayerQ {
    fn layer_type(&self) -> LayerType {
        match self.activation {
            Activation::Relu => LayerType::LinearReLu,
            Activation::Clamp => LayerType::Linear,
        }
    }
    fn input_len(&self) -> usize { self.in_features }
    fn output_len(&self) -> usize { self.out_features }

    fn weight_memory_bytes(&self) -> usize {
        self.weights.len() + self.bias.len() * 4
    }

    fn fwd_i8(&mut self, input: &[i8], output: &mut [i8]) {
        linear_i8(input, &self.weights, &self.bias, self.activation, output);
    }
}

/// Dropout layer; a pass-through at inference.
pub struct DropoutLayerQ {
    len: usize,
}

impl DropoutLayerQ {
    pub fn new(len: usize) -> Self {
        DropoutLayerQ { len }
    }
}

impl QuantizedLayer for DropoutLayerQ {
    fn layer_type(&self) -> LayerType { LayerType::Dropout }
    fn input_len(&self) -> usize { self.len }
    fn output_len(&self) -> usize { self.len }

    fn fwd_i8(&mut self, input: &[i8], output: &mut [i8]) {
        dropout_i8(input, output);
    }
}
