use std::{num::NonZeroU32, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use glint::{
    FrameTracer, RenderSettings, TraceSettings,
    geometry::ScreenSize,
    scene::demo::{StaticScene, demo_lights, demo_shapes, demo_view},
};
use indicatif::ProgressBar;
use log::LevelFilter;

/// Renders the demo scene without a window and saves the last frame.
#[derive(Debug, Parser)]
#[command(name = "glint-cli")]
struct Args {
    /// Image width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Number of frames to trace
    #[arg(short, long, default_value_t = NonZeroU32::MIN)]
    frames: NonZeroU32,

    /// Output PNG file
    #[arg(short, long, default_value = "glint.png")]
    output: PathBuf,

    /// Maximal recursion depth of reflected and refracted rays
    #[arg(long, default_value_t = 3)]
    max_depth: u32,

    /// Edge length of the tiles handed out to workers
    #[arg(long, default_value_t = 32)]
    tile_size: u32,

    /// Mark the center pixel and log its trace
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level)
        .init();

    anyhow::ensure!(
        args.width > 0 && args.height > 0,
        "Image size must be non-zero"
    );
    let resolution = ScreenSize::new(args.width, args.height);

    let tile_size = NonZeroU32::try_from(args.tile_size).context("Tile size must be non-zero")?;

    let settings = RenderSettings::builder()
        .tile_size(tile_size)
        .highlight_marked(args.verbose)
        .trace(TraceSettings::builder().max_depth(args.max_depth).build())
        .build();
    let frame_tracer = FrameTracer::builder()
        .source(Arc::new(StaticScene::new(demo_shapes())))
        .viewing_volume(Arc::new(demo_view(resolution)))
        .resolution(resolution)
        .lights(demo_lights())
        .settings(settings)
        .build();

    let bar = ProgressBar::new(args.frames.get().into());
    for _ in 0..args.frames.get() {
        if args.verbose {
            frame_tracer.marker().request_verbose();
        }
        let stats = frame_tracer.trace_frame()?;
        bar.set_message(format!("{:.1} ms", stats.elapsed.as_secs_f64() * 1000.0));
        bar.inc(1);
    }
    bar.finish();

    frame_tracer.frame_buffer().save(&args.output)?;
    log::info!("Saved {}", args.output.display());

    Ok(())
}
