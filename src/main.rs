use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use surfacecam::{
    AcquisitionLoop, CancelFlag, Config, DirectorySink, DisplaySink, FrameSource,
    ImageSequenceSource, NullSink, PlayingSurface, StaticFrameSource, SurfaceDetector,
};

#[derive(Parser)]
#[command(name = "surfacecam")]
#[command(about = "Find a playing surface in camera frames and rectify it")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// TOML file with [detector] and [acquisition] settings
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Minimum surface area relative to the frame
    #[arg(long, global = true)]
    cutoff: Option<f64>,

    /// Save stage images of every detection to directory
    #[arg(long, value_name = "DIR", global = true)]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the surface in a single image
    Detect {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Write annotated.png and rectified.png here
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
    /// Run the countdown acquisition loop over a frame directory or image
    Acquire {
        /// Directory of frames (read in name order) or a single image
        #[arg(value_name = "FRAMES")]
        frames: PathBuf,

        /// Seconds to count down from
        #[arg(short, long)]
        countdown: Option<u32>,

        /// Write the display buffers here every tick
        #[arg(long, value_name = "DIR")]
        display_dir: Option<PathBuf>,

        /// Keep every tick's display buffers instead of only the latest
        #[arg(long)]
        history: bool,

        /// Restart the frame directory when it runs out
        #[arg(long)]
        cycle: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let level = if args.common.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut config = match &args.common.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(cutoff) = args.common.cutoff {
        config.detector.cutoff = cutoff;
    }

    let mut detector = SurfaceDetector::with_params(config.detector.clone());
    if let Some(debug_dir) = args.common.debug_out {
        detector = detector.with_debug(debug_dir)?;
    }

    match args.command {
        Command::Detect { image_path, out } => run_detect(&detector, &image_path, out),
        Command::Acquire {
            frames,
            countdown,
            display_dir,
            history,
            cycle,
        } => {
            if let Some(countdown) = countdown {
                config.acquisition.countdown = countdown;
            }

            let source: Box<dyn FrameSource> = if frames.is_dir() {
                Box::new(ImageSequenceSource::open(&frames, cycle)?)
            } else {
                Box::new(StaticFrameSource::open(&frames)?)
            };

            let sink: Box<dyn DisplaySink> = match display_dir {
                Some(dir) => Box::new(DirectorySink::new(dir)?.with_history(history)),
                None => Box::new(NullSink),
            };

            let cancel = watch_stdin_for_cancel();
            println!("Type 'a' and press Enter to stop early.");

            let countdown = config.acquisition.countdown;
            let mut acquisition = AcquisitionLoop::new(source, &detector, sink, cancel)
                .with_params(config.acquisition.clone());
            let surface = match acquisition.run(countdown) {
                Ok(surface) => surface,
                Err(e) if e.is_exhausted() => {
                    log::warn!("Frames ran out before the countdown finished");
                    e.held.map(|surface| *surface)
                }
                Err(e) => {
                    if let Some(surface) = &e.held {
                        println!("\n=== Last Surface Before Failure ===");
                        print_surface(surface);
                    }
                    return Err(e.into());
                }
            };

            println!("\n=== Acquisition Result ===");
            match surface {
                Some(surface) => print_surface(&surface),
                None => println!("No playing surface found."),
            }
            Ok(())
        }
    }
}

fn run_detect(detector: &SurfaceDetector, image_path: &Path, out: Option<PathBuf>) -> anyhow::Result<()> {
    log::debug!("Loading image: {:?}", image_path);

    let img = image::ImageReader::open(image_path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;

    log::debug!("Image loaded: {}x{}", img.width(), img.height());

    println!("\n=== Surface Detection Result ===");
    match detector.try_detect(&img) {
        Ok(surface) => {
            print_surface(&surface);
            if let Some(dir) = out {
                std::fs::create_dir_all(&dir)?;
                surface
                    .annotated()
                    .save(dir.join("annotated.png"))
                    .map_err(|e| anyhow::anyhow!("Failed to save annotated image: {}", e))?;
                surface
                    .rectified()
                    .save(dir.join("rectified.png"))
                    .map_err(|e| anyhow::anyhow!("Failed to save rectified image: {}", e))?;
                println!("Saved annotated.png and rectified.png to {}", dir.display());
            }
        }
        Err(miss) => println!("No playing surface found: {}", miss),
    }

    Ok(())
}

fn print_surface(surface: &PlayingSurface) {
    let detected_at = surface
        .detected_at
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    println!("Surface '{}' detected at {}", surface.name, detected_at);
    println!("  Area: {:.1} px² (relative {:.4})", surface.area, surface.relative_area);
    println!("  Output: {}x{}", surface.width, surface.height);
    for (label, p) in ["TL", "TR", "BR", "BL"].iter().zip(surface.contour.points.iter()) {
        println!("  {}: ({:.1}, {:.1})", label, p.x, p.y);
    }
    println!(
        "  Dealer columns {}..={}, player columns {}..={}",
        surface.dealer_region.start,
        surface.dealer_region.end,
        surface.player_region.start,
        surface.player_region.end
    );
}

/// Flip a cancel flag when the user enters `a` on stdin
fn watch_stdin_for_cancel() -> CancelFlag {
    let flag = CancelFlag::new();
    let watcher = flag.clone();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("a") {
                watcher.cancel();
                break;
            }
        }
    });
    flag
}
