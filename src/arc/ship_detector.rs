use crate::conv::{ConvAlgorithm, ConvGeometry};
use crate::error::{CnnError, CnnResult};
use crate::loader::WeightStream;
use crate::network::*;
use crate::quantization::Activation;
use crate::tensor::TensorI8;

// Conv1 + ReLU: 3 -> 16, 3x3
pub const CONV1_IN_CH: usize = 3;
pub const CONV1_OUT_CH: usize = 16;
pub const CONV1_K: usize = 3;
pub const CONV1_STRIDE: usize = 1;

pub const POOL1_SIZE: usize = 2;

// Conv2 + ReLU: 16 -> 32, 3x3
pub const CONV2_IN_CH: usize = 16;
pub const CONV2_OUT_CH: usize = 32;
pub const CONV2_K: usize = 3;
pub const CONV2_STRIDE: usize = 1;

pub const POOL2_SIZE: usize = 2;

// Conv3 + ReLU: 32 -> 32, 3x3, stride 2
pub const CONV3_IN_CH: usize = 32;
pub const CONV3_OUT_CH: usize = 32;
pub const CONV3_K: usize = 3;
pub const CONV3_STRIDE: usize = 2;

pub const POOL3_SIZE: usize = 2;

pub const FC1_IN: usize = 1024;
pub const FC1_OUT: usize = 256;
pub const FC2_IN: usize = 256;
pub const FC2_OUT: usize = 4;

/// Number of output classes.
pub const NUM_CLASSES: usize = FC2_OUT;

pub const CONV1_WEIGHTS: usize = CONV1_OUT_CH * CONV1_IN_CH * CONV1_K * CONV1_K;
pub const CONV2_WEIGHTS: usize = CONV2_OUT_CH * CONV2_IN_CH * CONV2_K * CONV2_K;
pub const CONV3_WEIGHTS: usize = CONV3_OUT_CH * CONV3_IN_CH * CONV3_K * CONV3_K;
pub const FC1_WEIGHTS: usize = FC1_OUT * FC1_IN;
pub const FC2_WEIGHTS: usize = FC2_OUT * FC2_IN;

/// Length of the weight blob: every layer's weights, no biases.
pub const TOTAL_WEIGHTS: usize =
    CONV1_WEIGHTS + CONV2_WEIGHTS + CONV3_WEIGHTS + FC1_WEIGHTS + FC2_WEIGHTS;

/// Default input height. 138 x 74 pools evenly at every stage and ends at 32x8x4 = 1024.
pub const DEFAULT_INPUT_H: usize = 138;
pub const DEFAULT_INPUT_W: usize = 74;

/// Spatial size of the RGB input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub h: usize,
    pub w: usize,
}

impl Default for InputShape {
    fn default() -> Self {
        InputShape { h: DEFAULT_INPUT_H, w: DEFAULT_INPUT_W }
    }
}

/// Construction-time settings of the detector pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineConfig {
    pub input: InputShape,
    pub algorithm: ConvAlgorithm,
}

/// Dimensions of every stage, propagated once from the input shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkShape {
    pub conv1: ConvGeometry,
    pub pool1: PoolGeometry,
    pub conv2: ConvGeometry,
    pub pool2: PoolGeometry,
    pub conv3: ConvGeometry,
    pub pool3: PoolGeometry,
    pub flatten: usize,
}

fn conv_stage(layer: ConvGeometry) -> CnnResult<ConvGeometry> {
    layer.validate()?;
    Ok(layer)
}

fn pool_stage(layer: PoolGeometry, kind: LayerType) -> CnnResult<PoolGeometry> {
    for size in [layer.in_h, layer.in_w] {
        if layer.pool_size == 0 || size < layer.pool_size {
            return Err(CnnError::DegenerateDimension {
                layer: kind,
                input: size,
                kernel: layer.pool_size,
            });
        }
    }
    Ok(layer)
}

fn check_even(layer: &PoolGeometry, kind: LayerType) -> CnnResult<()> {
    for size in [layer.in_h, layer.in_w] {
        if size % layer.pool_size != 0 {
            return Err(CnnError::UnevenPooling {
                layer: kind,
                size,
                pool: layer.pool_size,
            });
        }
    }
    Ok(())
}

impl NetworkShape {
    /// Walks the conv/pool output-size formulas from `input` and checks that the
    /// flattened size equals the declared FC1 width and that every pool divides
    /// its input evenly.
    pub fn propagate(input: InputShape) -> CnnResult<Self> {
        let conv1 = conv_stage(ConvGeometry::new(
            CONV1_IN_CH, CONV1_OUT_CH, CONV1_K, CONV1_STRIDE, input.h, input.w,
        ))?;
        let pool1 = pool_stage(
            PoolGeometry::new(CONV1_OUT_CH, POOL1_SIZE, conv1.out_h(), conv1.out_w()),
            LayerType::AvgPool2d,
        )?;
        let conv2 = conv_stage(ConvGeometry::new(
            CONV2_IN_CH, CONV2_OUT_CH, CONV2_K, CONV2_STRIDE, pool1.out_h(), pool1.out_w(),
        ))?;
        let pool2 = pool_stage(
            PoolGeometry::new(CONV2_OUT_CH, POOL2_SIZE, conv2.out_h(), conv2.out_w()),
            LayerType::AvgPool2d,
        )?;
        let conv3 = conv_stage(ConvGeometry::new(
            CONV3_IN_CH, CONV3_OUT_CH, CONV3_K, CONV3_STRIDE, pool2.out_h(), pool2.out_w(),
        ))?;
        let pool3 = pool_stage(
            PoolGeometry::new(CONV3_OUT_CH, POOL3_SIZE, conv3.out_h(), conv3.out_w()),
            LayerType::MaxPool2d,
        )?;

        let flatten = pool3.output_len();
        if flatten != FC1_IN {
            return Err(CnnError::FlattenMismatch {
                computed: flatten,
                declared: FC1_IN,
            });
        }

        // flatten mismatch is reported ahead of uneven pooling
        check_even(&pool1, LayerType::AvgPool2d)?;
        check_even(&pool2, LayerType::AvgPool2d)?;
        check_even(&pool3, LayerType::MaxPool2d)?;

        Ok(NetworkShape { conv1, pool1, conv2, pool2, conv3, pool3, flatten })
    }
}

/// Every trained parameter of the detector.
#[derive(Clone)]
pub struct NetworkWeights {
    pub conv1: Vec<i8>,
    pub conv2: Vec<i8>,
    pub conv3: Vec<i8>,
    pub fc1: Vec<i8>,
    pub fc2: Vec<i8>,
    pub conv1_bias: Vec<i32>,
    pub conv2_bias: Vec<i32>,
    pub conv3_bias: Vec<i32>,
    pub fc1_bias: Vec<i32>,
    pub fc2_bias: Vec<i32>,
}

impl NetworkWeights {
    /// Reads all weights from `blob` in execution order (conv1, conv2, conv3, fc1,
    /// fc2). Biases are not part of the blob and start at zero.
    pub fn from_blob(blob: &[i8]) -> CnnResult<Self> {
        tracing::info!("loading {} weight values", blob.len());
        let mut stream = WeightStream::new(blob);
        let conv1 = stream.load_conv(CONV1_OUT_CH, CONV1_IN_CH, CONV1_K)?;
        let conv2 = stream.load_conv(CONV2_OUT_CH, CONV2_IN_CH, CONV2_K)?;
        let conv3 = stream.load_conv(CONV3_OUT_CH, CONV3_IN_CH, CONV3_K)?;
        let fc1 = stream.load_fc(FC1_OUT, FC1_IN)?;
        let fc2 = stream.load_fc(FC2_OUT, FC2_IN)?;
        stream.finish(TOTAL_WEIGHTS)?;
        tracing::info!("weights loaded, {} values consumed", stream.offset());

        Ok(NetworkWeights {
            conv1,
            conv2,
            conv3,
            fc1,
            fc2,
            conv1_bias: vec![0; CONV1_OUT_CH],
            conv2_bias: vec![0; CONV2_OUT_CH],
            conv3_bias: vec![0; CONV3_OUT_CH],
            fc1_bias: vec![0; FC1_OUT],
            fc2_bias: vec![0; FC2_OUT],
        })
    }
}

impl NetworkWeights {
    /// Checks every tensor against the layer sizes, for weights assembled by hand
    /// rather than read with [`from_blob`](Self::from_blob).
    pub fn validate(&self) -> CnnResult<()> {
        let expected = [
            (self.conv1.len(), CONV1_WEIGHTS),
            (self.conv2.len(), CONV2_WEIGHTS),
            (self.conv3.len(), CONV3_WEIGHTS),
            (self.fc1.len(), FC1_WEIGHTS),
            (self.fc2.len(), FC2_WEIGHTS),
            (self.conv1_bias.len(), CONV1_OUT_CH),
            (self.conv2_bias.len(), CONV2_OUT_CH),
            (self.conv3_bias.len(), CONV3_OUT_CH),
            (self.fc1_bias.len(), FC1_OUT),
            (self.fc2_bias.len(), FC2_OUT),
        ];
        for (actual, expected) in expected {
            if actual != expected {
                return Err(CnnError::WeightBlobSizeMismatch { expected, actual });
            }
        }
        Ok(())
    }
}

/// Index of the largest score; ties go to the lowest index.
pub fn argmax(scores: &[i8]) -> usize {
    let mut max_idx = 0;
    for (i, &v) in scores.iter().enumerate().skip(1) {
        if v > scores[max_idx] {
            max_idx = i;
        }
    }
    max_idx
}

/// The 4-class detector: Conv1 -> AvgPool -> Conv2 -> AvgPool -> Conv3 -> MaxPool ->
/// Flatten -> FC1(ReLU) -> Dropout -> FC2(clamp).
pub struct ShipDetector {
    shape: NetworkShape,
    config: PipelineConfig,
    net: QuantizedNeuralNetwork,
}

impl ShipDetector {
    pub fn new(weights: NetworkWeights, config: PipelineConfig) -> CnnResult<Self> {
        let shape = NetworkShape::propagate(config.input)?;
        weights.validate()?;
        tracing::info!(
            "building detector for {}x{} input ({:?}), flatten {}",
            config.input.h, config.input.w, config.algorithm, shape.flatten
        );

        let NetworkWeights {
            conv1, conv2, conv3, fc1, fc2,
            conv1_bias, conv2_bias, conv3_bias, fc1_bias, fc2_bias,
        } = weights;

        let mut net = QuantizedNeuralNetwork::new(shape.conv1.input_len());
        net.add(Box::new(Conv2dLayerQ::new(shape.conv1, conv1, conv1_bias, config.algorithm)))?;
        net.add(Box::new(Pool2dLayerQ::new(shape.pool1, PoolKind::Average)))?;
        net.add(Box::new(Conv2dLayerQ::new(shape.conv2, conv2, conv2_bias, config.algorithm)))?;
        net.add(Box::new(Pool2dLayerQ::new(shape.pool2, PoolKind::Average)))?;
        net.add(Box::new(Conv2dLayerQ::new(shape.conv3, conv3, conv3_bias, config.algorithm)))?;
        net.add(Box::new(Pool2dLayerQ::new(shape.pool3, PoolKind::Max)))?;
        net.add(Box::new(FlattenLayerQ::new(
            shape.pool3.channels,
            shape.pool3.out_h(),
            shape.pool3.out_w(),
        )))?;
        net.add(Box::new(LinearLayerQ::new(FC1_IN, FC1_OUT, fc1, fc1_bias, Activation::Relu)))?;
        net.add(Box::new(DropoutLayerQ::new(FC1_OUT)))?;
        net.add(Box::new(LinearLayerQ::new(FC2_IN, FC2_OUT, fc2, fc2_bias, Activation::Clamp)))?;

        Ok(ShipDetector { shape, config, net })
    }

    /// Loads the blob and builds the pipeline in one step.
    pub fn from_blob(blob: &[i8], config: PipelineConfig) -> CnnResult<Self> {
        Self::new(NetworkWeights::from_blob(blob)?, config)
    }

    fn check_image(&self, image: &TensorI8) -> CnnResult<()> {
        let expected = (CONV1_IN_CH, self.config.input.h, self.config.input.w);
        if image.shape() != expected {
            return Err(CnnError::InputShapeMismatch {
                expected,
                actual: image.shape(),
            });
        }
        Ok(())
    }

    /// Runs one inference and returns the four class scores.
    pub fn predict(&mut self, image: &TensorI8) -> CnnResult<[i8; NUM_CLASSES]> {
        self.check_image(image)?;
        let out = self.net.predict(image.as_slice())?;
        let mut scores = [0i8; NUM_CLASSES];
        scores.copy_from_slice(out);
        Ok(scores)
    }

    /// Runs one inference and returns the predicted class index.
    pub fn classify(&mut self, image: &TensorI8) -> CnnResult<usize> {
        Ok(argmax(&self.predict(image)?))
    }

    /// Runs one inference, returning per-layer wall times.
    pub fn predict_timed(
        &mut self,
        image: &TensorI8,
    ) -> CnnResult<Vec<(LayerType, std::time::Duration)>> {
        self.check_image(image)?;
        self.net.predict_timed(image.as_slice())
    }

    pub fn shape(&self) -> &NetworkShape {
        &self.shape
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn network(&self) -> &QuantizedNeuralNetwork {
        &self.net
    }
}
