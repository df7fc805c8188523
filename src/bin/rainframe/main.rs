// rainframe - Render rain-on-glass frames without a browser
//
// Pipeline:
//   1. Load config (JSON, optional) and background image
//   2. Hand the background to the engine through the same
//      request/fulfill protocol the browser host uses
//   3. Tick at a fixed step, writing every K-th frame as PNG
//
// Usage: cargo run --bin rainframe -- <image> [--frames N] [--every K] [--out DIR]

mod export;

use clap::Parser;
use glass_rain::{RainEngine, SimulationConfig, Viewport};
use std::path::PathBuf;

/// Headless rain-on-glass renderer
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Background image
    background: PathBuf,

    /// Path to JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Viewport width (CSS px)
    #[arg(long, default_value_t = 960)]
    width: u32,

    /// Viewport height (CSS px)
    #[arg(long, default_value_t = 540)]
    height: u32,

    /// Device pixel ratio
    #[arg(long, default_value_t = 1.0)]
    ratio: f32,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 240)]
    frames: u32,

    /// Seconds per tick
    #[arg(long, default_value_t = 0.016_666_668)]
    step: f32,

    /// RNG seed
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Write every K-th frame
    #[arg(long, default_value_t = 10)]
    every: u32,

    /// Also write the optical map next to each frame
    #[arg(long)]
    map: bool,

    /// Output directory
    #[arg(short, long, default_value = "frames")]
    out: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => match SimulationConfig::from_file(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                SimulationConfig::default()
            }
        },
        None => SimulationConfig::default(),
    };

    let viewport = Viewport::new(args.width, args.height, args.ratio);
    let mut engine = RainEngine::new(viewport, config, args.seed);

    let generation = engine.request_background();
    let background = export::load_background(&args.background)?;
    engine.fulfill_background(generation, background);

    std::fs::create_dir_all(&args.out)?;
    let every = args.every.max(1);
    let (mut trails, mut merges, mut written) = (0usize, 0usize, 0usize);

    for i in 1..=args.frames {
        let events = engine.advance(args.step);
        trails += events.trails.len();
        merges += events.merges.len();

        if i % every != 0 { continue; }
        export::write_frame(engine.frame(), &args.out.join(format!("frame_{:04}.png", i)))?;
        if args.map {
            export::write_map(engine.optical_map(), &args.out.join(format!("map_{:04}.png", i)))?;
        }
        written += 1;
    }

    log::info!(
        "Wrote {} frames to {} ({} trail marks, {} merges, {} droplets live)",
        written,
        args.out.display(),
        trails,
        merges,
        engine.droplets().len()
    );
    Ok(())
}
