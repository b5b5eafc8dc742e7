//! End-to-end INT8 ship detector.
//!
//! Run with: `cargo run --release --example ship_detector -- --help`
//!
//! Without `--weights` / `--image` a seeded synthetic blob and image are used, which
//! is enough to exercise the whole pipeline and compare the two engines.

use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use shipcnn::benchmark::{print_report, run_benchmark};
use shipcnn::conv::ConvAlgorithm;
use shipcnn::error::CnnResult;
use shipcnn::loader::{blob_from_bytes, image_from_hwc_u8, load_blob_file, load_image_file};
use shipcnn::ship_detector::{
    argmax, InputShape, PipelineConfig, ShipDetector, CONV1_IN_CH, DEFAULT_INPUT_H,
    DEFAULT_INPUT_W, TOTAL_WEIGHTS,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Engine {
    Direct,
    LineBuffer,
}

impl From<Engine> for ConvAlgorithm {
    fn from(e: Engine) -> Self {
        match e {
            Engine::Direct => ConvAlgorithm::Direct,
            Engine::LineBuffer => ConvAlgorithm::LineBuffer,
        }
    }
}

/// INT8 ship detector demo.
#[derive(Parser, Debug)]
#[command(name = "ship_detector", about = "Quantized CNN ship detector", version)]
struct Cli {
    /// Weight blob (raw i8, optionally .gz). Synthetic if omitted.
    #[arg(short, long)]
    weights: Option<String>,

    /// Raw HWC u8 RGB image. Synthetic if omitted.
    #[arg(short, long)]
    image: Option<String>,

    /// Image height.
    #[arg(long, default_value_t = DEFAULT_INPUT_H)]
    height: usize,

    /// Image width.
    #[arg(long, default_value_t = DEFAULT_INPUT_W)]
    width: usize,

    /// Convolution engine.
    #[arg(short, long, value_enum, default_value_t = Engine::LineBuffer)]
    algorithm: Engine,

    /// Seed for synthetic data.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Also run both engines over this many synthetic images and print a report.
    #[arg(long, default_value_t = 0)]
    bench: usize,
}

fn synthetic_blob(rng: &mut StdRng) -> Vec<i8> {
    let bytes: Vec<u8> = (0..TOTAL_WEIGHTS).map(|_| rng.gen_range(-3i8..=3) as u8).collect();
    blob_from_bytes(&bytes)
}

fn synthetic_image(rng: &mut StdRng, h: usize, w: usize) -> Vec<u8> {
    (0..h * w * CONV1_IN_CH).map(|_| rng.gen::<u8>()).collect()
}

fn run(cli: Cli) -> CnnResult<()> {
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let input = InputShape { h: cli.height, w: cli.width };
    let config = PipelineConfig { input, algorithm: cli.algorithm.into() };

    let blob = match &cli.weights {
        Some(path) => load_blob_file(path)?,
        None => {
            tracing::info!("no weights given, using synthetic blob (seed {})", cli.seed);
            synthetic_blob(&mut rng)
        }
    };
    let image = match &cli.image {
        Some(path) => load_image_file(path, CONV1_IN_CH, input.h, input.w)?,
        None => image_from_hwc_u8(&synthetic_image(&mut rng, input.h, input.w), CONV1_IN_CH, input.h, input.w)?,
    };

    let mut detector = ShipDetector::from_blob(&blob, config)?;
    let scores = detector.predict(&image)?;
    let class = argmax(&scores);

    println!("Scores:");
    for (i, s) in scores.iter().enumerate() {
        println!("  class {}: {:>4}", i, s);
    }
    println!("Predicted class: {}", class);

    if cli.bench > 0 {
        let mut direct = ShipDetector::from_blob(&blob, PipelineConfig { algorithm: ConvAlgorithm::Direct, ..config })?;
        let mut streaming = ShipDetector::from_blob(&blob, PipelineConfig { algorithm: ConvAlgorithm::LineBuffer, ..config })?;
        let mut inputs = vec![image];
        for _ in 1..cli.bench {
            inputs.push(image_from_hwc_u8(
                &synthetic_image(&mut rng, input.h, input.w),
                CONV1_IN_CH,
                input.h,
                input.w,
            )?);
        }
        let result = run_benchmark(&mut direct, &mut streaming, &inputs)?;
        print_report(&result);
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
