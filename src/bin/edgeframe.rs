use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use memmap2::Mmap;

use edgeframe::capture::save_frame;
use edgeframe::frame::GrayFrameBuf;
use edgeframe::stats::{FpsCounter, FrameTimer};
use edgeframe::{
    CannyDetector, EdgeDetector, FilterConfig, FrameEdgeFilter, FrameGeometry, GaussianCannyDetector, GrayFrame,
    TestPattern,
};

type Filter = FrameEdgeFilter<Box<dyn EdgeDetector>>;

#[derive(Parser)]
#[command(name = "edgeframe")]
#[command(about = "Run the native edge filter on frames from disk or synthetic patterns")]
#[command(version)]
struct Cli {
    /// JSON file with `low_threshold` / `high_threshold` (defaults 50 / 150)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Edge detector implementation
    #[arg(short, long, value_enum, global = true, default_value = "canny")]
    detector: DetectorKind,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a raw 8-bit grayscale dump (e.g. a camera Y plane)
    Process {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        width: usize,

        #[arg(long)]
        height: usize,

        /// Bytes per row (defaults to width)
        #[arg(long)]
        stride: Option<usize>,

        /// Output file (.png or .jpg)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Filter an encoded image (converted to grayscale first)
    Image {
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (.png or .jpg)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Filter a synthetic test pattern
    Pattern {
        #[arg(short, long, value_enum, default_value = "checkerboard")]
        kind: PatternKind,

        #[arg(long, default_value = "640")]
        width: usize,

        #[arg(long, default_value = "480")]
        height: usize,

        /// Output file (.png or .jpg)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Time repeated filtering of a synthetic frame
    Bench {
        #[arg(long, default_value = "1920")]
        width: usize,

        #[arg(long, default_value = "1080")]
        height: usize,

        #[arg(short = 'n', long, default_value = "100")]
        iterations: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DetectorKind {
    /// Unblurred Canny, one-pixel lines on sharp steps
    Canny,
    /// imageproc's Canny with a Gaussian pre-blur
    Gaussian,
}

#[derive(Clone, Copy, ValueEnum)]
enum PatternKind {
    Gradient,
    Checkerboard,
    Noise,
}

impl From<PatternKind> for TestPattern {
    fn from(kind: PatternKind) -> Self {
        match kind {
            PatternKind::Gradient => TestPattern::Gradient,
            PatternKind::Checkerboard => TestPattern::Checkerboard,
            PatternKind::Noise => TestPattern::Noise,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=edgeframe=debug
    edgeframe::logging::init_with_default("info");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FilterConfig::from_path(path)?,
        None => FilterConfig::default(),
    };
    config.validate()?;
    let detector: Box<dyn EdgeDetector> = match cli.detector {
        DetectorKind::Canny => Box::new(CannyDetector::new(&config)),
        DetectorKind::Gaussian => Box::new(GaussianCannyDetector::new(&config)),
    };
    let filter = FrameEdgeFilter::with_detector(detector);

    match cli.command {
        Commands::Process {
            input,
            width,
            height,
            stride,
            output,
        } => process_raw(&filter, &input, width, height, stride.unwrap_or(width), &output),
        Commands::Image { input, output } => process_image(&filter, &input, &output),
        Commands::Pattern {
            kind,
            width,
            height,
            output,
        } => process_pattern(&filter, kind.into(), width, height, &output),
        Commands::Bench {
            width,
            height,
            iterations,
        } => bench(&filter, width, height, iterations),
    }
}

fn process_raw(
    filter: &Filter,
    input: &Path,
    width: usize,
    height: usize,
    stride: usize,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let geometry = FrameGeometry::new(width, height, stride)?;
    let file = File::open(input)?;
    // SAFETY: the mapping is read-only and the file is not expected to be
    // modified while this short-lived process runs.
    let mmap = unsafe { Mmap::map(&file)? };

    let frame = GrayFrame::new(&mmap, geometry)?;
    let timer = FrameTimer::start();
    let rgba = filter.process(&frame)?;
    tracing::info!(
        elapsed_ms = timer.elapsed().as_secs_f64() * 1000.0,
        width,
        height,
        stride,
        "raw frame filtered"
    );

    save_frame(&rgba, output)?;
    Ok(())
}

fn process_image(filter: &Filter, input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let gray = image::open(input)?.to_luma8();
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    let geometry = FrameGeometry::new(width, height, width)?;

    let frame = GrayFrame::new(gray.as_raw(), geometry)?;
    let rgba = filter.process(&frame)?;
    save_frame(&rgba, output)?;
    Ok(())
}

fn process_pattern(
    filter: &Filter,
    pattern: TestPattern,
    width: usize,
    height: usize,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let geometry = FrameGeometry::new(width, height, width)?;
    let source = GrayFrameBuf::test_pattern(geometry, pattern);
    let rgba = filter.process(&source.view()?)?;
    save_frame(&rgba, output)?;
    Ok(())
}

fn bench(filter: &Filter, width: usize, height: usize, iterations: u32) -> Result<(), Box<dyn std::error::Error>> {
    let geometry = FrameGeometry::new(width, height, width)?;
    let source = GrayFrameBuf::test_pattern(geometry, TestPattern::Noise);
    let frame = source.view()?;

    let mut fps = FpsCounter::new();
    let mut total_ms = 0.0;
    for _ in 0..iterations {
        let timer = FrameTimer::start();
        let rgba = filter.process(&frame)?;
        let ms = timer.elapsed().as_secs_f64() * 1000.0;
        total_ms += ms;
        tracing::debug!(elapsed_ms = ms, bytes = rgba.as_bytes().len(), "frame filtered");
        if let Some(rate) = fps.tick() {
            tracing::info!(fps = format!("{rate:.2}"), "throughput");
        }
    }

    if iterations > 0 {
        println!(
            "{width}x{height}: {iterations} frames, mean {:.2} ms/frame",
            total_ms / f64::from(iterations)
        );
    }
    Ok(())
}
