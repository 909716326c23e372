//! Hyperspace viewer
//!
//! Renders the demo scene in software and presents the front buffer as a
//! nearest-filtered texture, scaled to fit the window.
//!
//! Usage: hyperspace-engine [CART.p8] [--sheet PNG] [--config RON]

use clap::Parser;
use hyperspace_engine::assets::load_assets;
use hyperspace_engine::config::LaunchOptions;
use hyperspace_engine::logging::{init_logging, LoggingConfig};
use hyperspace_engine::rasterizer::{
    DoubleBuffer, Framebuffer, Palette, Renderer, DEFAULT_WINDOW_SCALE, HEIGHT, WIDTH,
};
use hyperspace_engine::scene::{DemoScene, MeshLibrary};
use hyperspace_engine::VERSION;
use macroquad::prelude::*;

/// Simulation rate; rendering follows the display
const TICK_SECONDS: f32 = 1.0 / 30.0;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Hyperspace Engine v{}", VERSION),
        window_width: (WIDTH as u32 * DEFAULT_WINDOW_SCALE) as i32,
        window_height: (HEIGHT as u32 * DEFAULT_WINDOW_SCALE) as i32,
        window_resizable: true,
        ..Default::default()
    }
}

/// Blit the framebuffer centered, at the largest integer scale that fits
fn present(fb: &Framebuffer) {
    let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
    texture.set_filter(FilterMode::Nearest);

    let scale = (screen_width() / fb.width as f32)
        .min(screen_height() / fb.height as f32)
        .floor()
        .max(1.0);
    let draw_w = fb.width as f32 * scale;
    let draw_h = fb.height as f32 * scale;

    draw_texture_ex(
        &texture,
        ((screen_width() - draw_w) / 2.0).floor(),
        ((screen_height() - draw_h) / 2.0).floor(),
        WHITE,
        DrawTextureParams {
            dest_size: Some(Vec2::new(draw_w, draw_h)),
            ..Default::default()
        },
    );
}

#[macroquad::main(window_conf)]
async fn main() {
    init_logging(LoggingConfig::default());

    let opts = LaunchOptions::parse();
    let settings = opts.settings();
    if settings.window_scale != DEFAULT_WINDOW_SCALE
        || settings.width != WIDTH
        || settings.height != HEIGHT
    {
        request_new_screen_size(
            (settings.width as u32 * settings.window_scale) as f32,
            (settings.height as u32 * settings.window_scale) as f32,
        );
    }

    let cart = load_assets(&opts, &Palette::default());
    let library = MeshLibrary::decode(&cart.map);
    let renderer = Renderer::new(settings, cart.sheet);

    let mut scene = DemoScene::new(library);
    let mut buffers = DoubleBuffer::new(renderer.settings.width, renderer.settings.height);
    let mut accumulator = 0.0f32;
    let mut show_stats = false;

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        if is_key_pressed(KeyCode::Tab) {
            show_stats = !show_stats;
        }

        accumulator += get_frame_time().min(0.25);
        while accumulator >= TICK_SECONDS {
            scene.update();
            accumulator -= TICK_SECONDS;
        }

        let stats = scene.render(&renderer, buffers.back_mut());
        buffers.swap();

        clear_background(BLACK);
        present(buffers.front());

        if show_stats {
            draw_text(
                &format!(
                    "{} fps | {} tris | {} culled | {} px",
                    get_fps(),
                    stats.triangles_drawn,
                    stats.culled_total(),
                    stats.pixels_written
                ),
                8.0,
                20.0,
                20.0,
                WHITE,
            );
        }

        next_frame().await;
    }
}
