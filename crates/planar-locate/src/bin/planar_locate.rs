//! planar-locate CLI: anchor matching and paper detection from the command line.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use planar_locate::core::{load_json, write_json};
use planar_locate::detect::{self, ImageRole};
use planar_locate::paper::rectify_paper;
use planar_locate::report::{HomographyReport, PaperReport};
use planar_locate::{AnchorMatchParams, Detection, PaperDetectionConfig, PaperDetector};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "planar-locate")]
#[command(about = "Locate a known planar image or a sheet of paper in a photo")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find an anchor image inside a scene image.
    Match(MatchArgs),

    /// Estimate the anchor placement from externally matched points.
    MatchPoints(MatchPointsArgs),

    /// Detect a sheet of paper.
    Paper(PaperArgs),

    /// Print a default configuration as JSON.
    DefaultConfig {
        #[arg(value_enum, default_value_t = ConfigKind::Paper)]
        kind: ConfigKind,
    },

    /// Print the library version.
    Version,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ConfigKind {
    Paper,
    Anchor,
}

#[derive(Debug, Clone, Args)]
struct OutputArgs {
    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct MatchArgs {
    /// Encoded anchor image (PNG/JPEG).
    #[arg(long)]
    anchor: PathBuf,

    /// Encoded scene image (PNG/JPEG).
    #[arg(long)]
    scene: PathBuf,

    /// JSON file with `AnchorMatchParams` overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Clone, Args)]
struct MatchPointsArgs {
    /// JSON file `{ "anchor": [[x, y], ..], "scene": [[x, y], ..] }`.
    #[arg(long)]
    points: PathBuf,

    #[arg(long)]
    anchor_width: f32,

    #[arg(long)]
    anchor_height: f32,

    /// JSON file with `AnchorMatchParams` overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Clone, Args)]
struct PaperArgs {
    /// Encoded input image.
    #[arg(long)]
    image: PathBuf,

    /// JSON file with `PaperDetectionConfig` overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Focal length in pixels; enables pose estimation.
    #[arg(long)]
    focal_length: Option<f32>,

    /// Write a fronto-parallel PNG of the detected sheet.
    #[arg(long)]
    rectified: Option<PathBuf>,

    /// Resolution of the rectified image.
    #[arg(long, default_value = "2.0")]
    px_per_mm: f32,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Deserialize)]
struct PointPairs {
    anchor: Vec<[f32; 2]>,
    scene: Vec<[f32; 2]>,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs)?;

    match cli.command {
        Commands::Match(args) => run_match(&args),
        Commands::MatchPoints(args) => run_match_points(&args),
        Commands::Paper(args) => run_paper(&args),
        Commands::DefaultConfig { kind } => match kind {
            ConfigKind::Paper => print_json(&detect::default_paper_config()),
            ConfigKind::Anchor => print_json(&AnchorMatchParams::default()),
        },
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(verbose: u8, json: bool) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    {
        let _ = verbose;
        planar_locate::core::init_tracing(json);
        Ok(())
    }
    #[cfg(not(feature = "tracing"))]
    {
        if json {
            return Err("--json-logs requires the `tracing` feature".into());
        }
        let level = match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        planar_locate::core::init_with_level(level)?;
        Ok(())
    }
}

fn load_config<T: Default + serde::de::DeserializeOwned>(path: Option<&Path>) -> CliResult<T> {
    match path {
        Some(p) => Ok(load_json(p).map_err(|e| format!("config {}: {e}", p.display()))?),
        None => Ok(T::default()),
    }
}

fn read_bytes(path: &Path) -> CliResult<Vec<u8>> {
    Ok(std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?)
}

fn emit<T: Serialize>(value: &T, out: &OutputArgs) -> CliResult<()> {
    match &out.out {
        Some(path) => {
            write_json(value, path)?;
            info!("wrote {}", path.display());
            Ok(())
        }
        None => print_json(value),
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_match(args: &MatchArgs) -> CliResult<()> {
    let params: AnchorMatchParams = load_config(args.config.as_deref())?;
    let anchor = read_bytes(&args.anchor)?;
    let scene = read_bytes(&args.scene)?;
    let outcome = detect::match_encoded_images(&anchor, &scene, &params);
    if let Err(err) = &outcome {
        log::warn!("{err}");
    }
    emit(&HomographyReport::from_outcome(&outcome), &args.output)
}

fn run_match_points(args: &MatchPointsArgs) -> CliResult<()> {
    let params: AnchorMatchParams = load_config(args.config.as_deref())?;
    let pairs: PointPairs =
        load_json(&args.points).map_err(|e| format!("points {}: {e}", args.points.display()))?;
    let to_points = |v: &[[f32; 2]]| v.iter().map(|&[x, y]| Point2::new(x, y)).collect::<Vec<_>>();
    let outcome = detect::match_from_points(
        &to_points(&pairs.anchor),
        &to_points(&pairs.scene),
        args.anchor_width,
        args.anchor_height,
        &params,
    );
    if let Err(err) = &outcome {
        log::warn!("{err}");
    }
    emit(&HomographyReport::from_outcome(&outcome), &args.output)
}

fn run_paper(args: &PaperArgs) -> CliResult<()> {
    let mut config: PaperDetectionConfig = load_config(args.config.as_deref())?;
    if let Some(f) = args.focal_length {
        config.focal_length_px = f;
    }
    let bytes = read_bytes(&args.image)?;

    let gray = match detect::decode_gray(&bytes, ImageRole::Image) {
        Ok(gray) => gray,
        Err(err) => {
            log::warn!("{err}");
            return emit(&PaperReport::from_error(&err), &args.output);
        }
    };
    let detection = PaperDetector::new(config).detect(&gray);

    if let (Some(path), Detection::Found(paper)) = (&args.rectified, &detection) {
        let flat = rectify_paper(&gray, paper, args.px_per_mm)?;
        flat.save(path)?;
        info!("rectified sheet written to {}", path.display());
    }
    emit(&PaperReport::from_detection(&detection), &args.output)
}
