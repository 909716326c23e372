//! Headless renderer: simulates N frames of the demo scene and writes the
//! last one as a PNG.
//!
//! Usage: snapshot [CART.p8] [--sheet PNG] [--config RON] [--frames N] [--out PNG]

use std::process::ExitCode;

use clap::Parser;
use hyperspace_engine::assets::load_assets;
use hyperspace_engine::config::LaunchOptions;
use hyperspace_engine::logging::{init_logging, LoggingConfig};
use hyperspace_engine::rasterizer::{CullReason, DoubleBuffer, Palette, RasterStats, Renderer};
use hyperspace_engine::scene::{DemoScene, MeshLibrary};

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    let opts = LaunchOptions::parse();
    let settings = opts.settings();
    let cart = load_assets(&opts, &Palette::default());
    let library = MeshLibrary::decode(&cart.map);
    let renderer = Renderer::new(settings, cart.sheet);
    let mut scene = DemoScene::new(library);
    let mut buffers = DoubleBuffer::new(renderer.settings.width, renderer.settings.height);

    let mut last = RasterStats::default();
    for _ in 0..opts.frames {
        scene.update();
        last = scene.render(&renderer, buffers.back_mut());
        buffers.swap();
    }

    log::info!(
        "frame {}: {} triangles drawn, {} pixels written",
        scene.tick(),
        last.triangles_drawn,
        last.pixels_written
    );
    for reason in CullReason::ALL {
        let n = last.culled(reason);
        if n > 0 {
            log::info!("  culled {:?}: {}", reason, n);
        }
    }

    match buffers.front().save_png(&opts.output) {
        Ok(()) => {
            log::info!("wrote {}", opts.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}: {}", opts.output.display(), e);
            ExitCode::FAILURE
        }
    }
}
