//! Asset loading: PICO-8 carts, PNG spritesheets and the built-in demo set

pub mod cart;
pub mod demo;

pub use cart::{load_cart, parse_cart, CartError, Cartridge, MAP_SIZE};

use std::path::Path;

use crate::config::LaunchOptions;
use crate::rasterizer::{Palette, Spritesheet};

/// Load a PNG spritesheet, quantized to `palette`
pub fn load_sheet_png<P: AsRef<Path>>(path: P, palette: &Palette) -> Result<Spritesheet, CartError> {
    let sheet = Spritesheet::from_png(path, palette)?;
    Ok(sheet)
}

/// Resolve the cart and spritesheet named on the command line. Failures
/// are logged and fall back to the demo assets.
pub fn load_assets(opts: &LaunchOptions, palette: &Palette) -> Cartridge {
    let mut cart = match &opts.cart {
        Some(path) => match load_cart(path) {
            Ok(cart) => {
                log::info!("using cart {}", path.display());
                cart
            }
            Err(e) => {
                log::error!("{}: {}; using built-in assets", path.display(), e);
                demo::demo_cart()
            }
        },
        None => {
            log::info!("no cart given, using built-in assets");
            demo::demo_cart()
        }
    };

    if let Some(path) = &opts.sheet {
        match load_sheet_png(path, palette) {
            Ok(sheet) => {
                log::info!("spritesheet replaced from {}", path.display());
                cart.sheet = sheet;
            }
            Err(e) => log::error!("{}: {}", path.display(), e),
        }
    }

    cart
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_cart_falls_back_to_demo() {
        let opts = LaunchOptions {
            cart: Some(PathBuf::from("/nonexistent/game.p8")),
            sheet: Some(PathBuf::from("/nonexistent/sheet.png")),
            ..Default::default()
        };
        let cart = load_assets(&opts, &Palette::default());
        assert_eq!(cart.map, demo::demo_map());
        assert_eq!(cart.sheet, demo::demo_spritesheet());
    }

    #[test]
    fn test_bad_png_is_an_image_error() {
        let err = load_sheet_png("/nonexistent/sheet.png", &Palette::default()).unwrap_err();
        assert!(matches!(err, CartError::ImageError(_)));
    }
}
