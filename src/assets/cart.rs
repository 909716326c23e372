//! PICO-8 text cartridge loading
//!
//! Only two sections matter to the renderer:
//! - `__gfx__`: 128 rows of 128 hex nibbles, the spritesheet
//! - `__map__`: rows of hex byte pairs, 128 bytes per row, holding the
//!   packed mesh stream
//!
//! Parsing is lenient the way the console is: bad hex digits read as 0,
//! short rows leave the remainder untouched, surplus rows are ignored.

use std::fs;
use std::path::Path;

use crate::rasterizer::{Spritesheet, SHEET_SIZE};

/// Bytes of dedicated map memory
pub const MAP_SIZE: usize = 0x1000;

const MAP_ROW_BYTES: usize = 128;

/// Error type for cartridge loading
#[derive(Debug)]
pub enum CartError {
    IoError(std::io::Error),
    /// A required section header never appeared
    MissingSection(&'static str),
    ImageError(image::ImageError),
}

impl From<std::io::Error> for CartError {
    fn from(e: std::io::Error) -> Self {
        CartError::IoError(e)
    }
}

impl From<image::ImageError> for CartError {
    fn from(e: image::ImageError) -> Self {
        CartError::ImageError(e)
    }
}

impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartError::IoError(e) => write!(f, "IO error: {}", e),
            CartError::MissingSection(name) => write!(f, "Missing section: {}", name),
            CartError::ImageError(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for CartError {}

/// Spritesheet and map memory from a cart
#[derive(Debug, Clone)]
pub struct Cartridge {
    pub sheet: Spritesheet,
    pub map: Vec<u8>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Gfx,
    Map,
}

fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

/// Parse the text of a `.p8` cart
pub fn parse_cart(text: &str) -> Result<Cartridge, CartError> {
    let mut sheet = Spritesheet::new();
    let mut map = vec![0u8; MAP_SIZE];
    let mut section = Section::Other;
    let (mut seen_gfx, mut seen_map) = (false, false);
    let (mut gfx_row, mut map_row) = (0usize, 0usize);

    for line in text.lines() {
        let line = line.trim_end();
        if line.starts_with("__") && line.ends_with("__") && line.len() > 4 {
            section = match line {
                "__gfx__" => {
                    seen_gfx = true;
                    gfx_row = 0;
                    Section::Gfx
                }
                "__map__" => {
                    seen_map = true;
                    map_row = 0;
                    Section::Map
                }
                _ => Section::Other,
            };
            continue;
        }

        match section {
            Section::Gfx if gfx_row < SHEET_SIZE => {
                for (x, c) in line.bytes().take(SHEET_SIZE).enumerate() {
                    sheet.set(x as i32, gfx_row as i32, hex_digit(c));
                }
                gfx_row += 1;
            }
            Section::Map if map_row * MAP_ROW_BYTES < MAP_SIZE => {
                for (i, pair) in line.as_bytes().chunks_exact(2).take(MAP_ROW_BYTES).enumerate() {
                    map[map_row * MAP_ROW_BYTES + i] = (hex_digit(pair[0]) << 4) | hex_digit(pair[1]);
                }
                map_row += 1;
            }
            _ => {}
        }
    }

    if !seen_gfx {
        return Err(CartError::MissingSection("__gfx__"));
    }
    if !seen_map {
        return Err(CartError::MissingSection("__map__"));
    }

    log::info!("cart loaded: {} gfx rows, {} map rows", gfx_row, map_row);
    log::debug!("first map bytes: {:02x} {:02x} {:02x} {:02x}", map[0], map[1], map[2], map[3]);

    Ok(Cartridge { sheet, map })
}

/// Load a `.p8` cart from disk
pub fn load_cart<P: AsRef<Path>>(path: P) -> Result<Cartridge, CartError> {
    let text = fs::read_to_string(path)?;
    parse_cart(&text)
}
