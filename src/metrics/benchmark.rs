use std::fmt;
use std::time::{Duration, Instant};

use crate::conv::LineBufferConv;
use crate::error::CnnResult;
use crate::network::LayerType;
use crate::ship_detector::{argmax, ShipDetector};
use crate::tensor::TensorI8;

/// Summary of one feature map: extremes, mean and element count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMapStats {
    pub min: i8,
    pub max: i8,
    pub mean: f32,
    pub len: usize,
}

impl fmt::Display for FeatureMapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min={} max={} mean={:.2} ({} values)",
            self.min, self.max, self.mean, self.len
        )
    }
}

/// Min, max and mean of a flat feature map. An empty map reports zeros.
pub fn feature_map_stats(data: &[i8]) -> FeatureMapStats {
    if data.is_empty() {
        return FeatureMapStats { min: 0, max: 0, mean: 0.0, len: 0 };
    }
    let mut min = i8::MAX;
    let mut max = i8::MIN;
    let mut sum: i64 = 0;
    for &v in data {
        min = min.min(v);
        max = max.max(v);
        sum += v as i64;
    }
    FeatureMapStats {
        min,
        max,
        mean: (sum as f64 / data.len() as f64) as f32,
        len: data.len(),
    }
}

/// Per-layer metrics for the two convolution engines.
pub struct LayerMetrics {
    pub layer_idx: usize,
    pub layer_type: LayerType,
    pub direct_time: Duration,
    pub streaming_time: Duration,
    pub weight_mem: usize,
    /// Streaming state held by this layer; zero for non-convolution layers.
    pub line_buffer_mem: usize,
    pub direct_stats: FeatureMapStats,
    /// Whether both engines produced the same feature map for this layer.
    pub identical: bool,
}

/// Aggregate results of running both pipelines over the same inputs.
pub struct BenchmarkResult {
    pub layer_metrics: Vec<LayerMetrics>,
    pub direct_total_time: Duration,
    pub streaming_total_time: Duration,
    pub weight_mem: usize,
    pub buffer_mem: usize,
    pub line_buffer_mem: usize,
    /// Percentage of inputs for which both engines chose the same class.
    pub class_agreement: f32,
    /// Percentage of inputs for which all four scores matched exactly.
    pub score_agreement: f32,
    pub num_samples: usize,
}

fn line_buffer_bytes(detector: &ShipDetector) -> [usize; 3] {
    let shape = detector.shape();
    [shape.conv1, shape.conv2, shape.conv3].map(|g| LineBufferConv::new(g).state_bytes())
}

/// Runs the direct and streaming pipelines over `inputs` and compares them.
///
/// Per-layer timings and feature maps come from the first input; totals and
/// agreement cover all of them.
pub fn run_benchmark(
    direct: &mut ShipDetector,
    streaming: &mut ShipDetector,
    inputs: &[TensorI8],
) -> CnnResult<BenchmarkResult> {
    let mut layer_metrics = Vec::new();

    if let Some(first) = inputs.first() {
        let direct_times = direct.predict_timed(first)?;
        let streaming_times = streaming.predict_timed(first)?;
        let weight_mem = direct.network().layer_weight_memory();
        let mut conv_state = line_buffer_bytes(streaming).into_iter();

        let layers = direct
            .network()
            .intermediates()
            .zip(streaming.network().intermediates());
        for (i, ((layer_type, d), (_, s))) in layers.enumerate() {
            let line_buffer_mem = if layer_type == LayerType::Conv2dReLu {
                conv_state.next().unwrap_or(0)
            } else {
                0
            };
            layer_metrics.push(LayerMetrics {
                layer_idx: i,
                layer_type,
                direct_time: direct_times.get(i).map_or(Duration::ZERO, |t| t.1),
                streaming_time: streaming_times.get(i).map_or(Duration::ZERO, |t| t.1),
                weight_mem: weight_mem.get(i).copied().unwrap_or(0),
                line_buffer_mem,
                direct_stats: feature_map_stats(d),
                identical: d == s,
            });
        }
    }

    let mut direct_total_time = Duration::ZERO;
    let mut streaming_total_time = Duration::ZERO;
    let mut class_agree = 0usize;
    let mut score_agree = 0usize;

    for input in inputs {
        let start = Instant::now();
        let d = direct.predict(input)?;
        direct_total_time += start.elapsed();

        let start = Instant::now();
        let s = streaming.predict(input)?;
        streaming_total_time += start.elapsed();

        if argmax(&d) == argmax(&s) { class_agree += 1; }
        if d == s { score_agree += 1; }
    }

    let num_samples = inputs.len();
    let pct = |n: usize| if num_samples == 0 { 0.0 } else { n as f32 / num_samples as f32 * 100.0 };

    tracing::info!(
        samples = num_samples,
        class_agreement = pct(class_agree),
        "benchmark finished"
    );

    Ok(BenchmarkResult {
        layer_metrics,
        direct_total_time,
        streaming_total_time,
        weight_mem: direct.network().layer_weight_memory().iter().sum(),
        buffer_mem: direct.network().buffer_memory_bytes(),
        line_buffer_mem: line_buffer_bytes(streaming).iter().sum(),
        class_agreement: pct(class_agree),
        score_agreement: pct(score_agree),
        num_samples,
    })
}

/// Print a formatted benchmark report to stdout.
pub fn print_report(result: &BenchmarkResult) {
    println!("\n=== Per-Layer Metrics ===");
    println!(
        "{:<6} {:<12} {:>11} {:>11} {:>10} {:>10} {:>6}  {}",
        "Layer", "Type", "Direct", "Streaming", "Weights", "LineBuf", "Match", "Feature map"
    );

    for m in &result.layer_metrics {
        let direct_ms = m.direct_time.as_micros() as f64 / 1000.0;
        let streaming_ms = m.streaming_time.as_micros() as f64 / 1000.0;
        println!(
            "{:<6} {:<12} {:>9.3}ms {:>9.3}ms {:>9}B {:>9}B {:>6}  {}",
            m.layer_idx,
            m.layer_type.to_string(),
            direct_ms,
            streaming_ms,
            m.weight_mem,
            m.line_buffer_mem,
            if m.identical { "yes" } else { "NO" },
            m.direct_stats,
        );
    }

    let direct_ms = result.direct_total_time.as_micros() as f64 / 1000.0;
    let streaming_ms = result.streaming_total_time.as_micros() as f64 / 1000.0;
    let speedup = if streaming_ms > 0.001 { direct_ms / streaming_ms } else { 0.0 };

    println!("\n=== Totals ({} samples) ===", result.num_samples);
    println!("Direct:    {:.1}ms", direct_ms);
    println!("Streaming: {:.1}ms    Relative: {:.2}x", streaming_ms, speedup);
    println!(
        "Weights: {}B    Feature maps: {}B    Line buffers: {}B",
        result.weight_mem, result.buffer_mem, result.line_buffer_mem
    );
    println!(
        "Agreement: class {:.1}%, scores {:.1}%",
        result.class_agreement, result.score_agreement
    );
}
