//! APRS symbol icons cut from the two 16-column sprite sheets.
//!
//! Each sheet holds the 94 printable symbols `!`..`~` in a grid of 128x128
//! pixel cells, 16 per row. The primary table (`/`) uses the first sheet,
//! every other table identifier (alternate `\` and overlays) the second.
//! A cropped cell is shrunk to a tiny pixel block that fits on one line of
//! terminal text.

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::Path;
use tracing::info;

pub const SYMBOL_CELL_SIZE: u32 = 128;
pub const SYMBOLS_PER_ROW: u32 = 16;
const FIRST_SYMBOL: u32 = '!' as u32;
const LAST_SYMBOL: u32 = '~' as u32;

/// Glyph width in terminal columns; each column shows two stacked pixels
pub const GLYPH_COLUMNS: u32 = 2;
/// Two pixel rows share one line of text via half blocks
pub const GLYPH_PIXEL_ROWS: u32 = 2;

/// Primary symbol table identifier
pub const PRIMARY_TABLE: char = '/';

/// Grid position of one symbol on a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolCell {
    pub row: u32,
    pub col: u32,
}

impl SymbolCell {
    /// Locate `symbol` on its sheet; only `!` through `~` are valid symbols
    pub fn for_symbol(symbol: char) -> Option<Self> {
        let code = symbol as u32;
        if !(FIRST_SYMBOL..=LAST_SYMBOL).contains(&code) {
            return None;
        }
        let offset = code - FIRST_SYMBOL;
        Some(Self {
            row: offset / SYMBOLS_PER_ROW,
            col: offset % SYMBOLS_PER_ROW,
        })
    }

    /// Pixel rectangle `(x, y, width, height)` of this cell
    pub fn crop_area(&self) -> (u32, u32, u32, u32) {
        (
            self.col * SYMBOL_CELL_SIZE,
            self.row * SYMBOL_CELL_SIZE,
            SYMBOL_CELL_SIZE,
            SYMBOL_CELL_SIZE,
        )
    }
}

/// A symbol shrunk to `GLYPH_COLUMNS` x `GLYPH_PIXEL_ROWS` pixels
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolGlyph {
    pixels: RgbaImage,
}

impl SymbolGlyph {
    pub fn columns(&self) -> u32 {
        self.pixels.width()
    }

    /// Top and bottom pixel of terminal column `col`
    pub fn column(&self, col: u32) -> (Rgba<u8>, Rgba<u8>) {
        (*self.pixels.get_pixel(col, 0), *self.pixels.get_pixel(col, 1))
    }
}

/// Both symbol sheets, loaded once at startup
pub struct SymbolSheets {
    primary: RgbaImage,
    secondary: RgbaImage,
}

impl SymbolSheets {
    /// Load both sprite sheets. Missing or unreadable sheets are fatal for the caller.
    pub fn load<P: AsRef<Path>>(primary: P, secondary: P) -> Result<Self> {
        let primary_path = primary.as_ref();
        let secondary_path = secondary.as_ref();

        let primary = image::open(primary_path)
            .with_context(|| format!("Failed to load primary symbol sheet {:?}", primary_path))?
            .to_rgba8();
        let secondary = image::open(secondary_path)
            .with_context(|| {
                format!("Failed to load secondary symbol sheet {:?}", secondary_path)
            })?
            .to_rgba8();

        info!(
            "Loaded symbol sheets {:?} ({}x{}) and {:?} ({}x{})",
            primary_path,
            primary.width(),
            primary.height(),
            secondary_path,
            secondary.width(),
            secondary.height()
        );

        Ok(Self::from_images(primary, secondary))
    }

    pub fn from_images(primary: RgbaImage, secondary: RgbaImage) -> Self {
        Self { primary, secondary }
    }

    fn sheet_for(&self, table: char) -> &RgbaImage {
        if table == PRIMARY_TABLE {
            &self.primary
        } else {
            &self.secondary
        }
    }

    /// Crop the full-size cell for `symbol` from the sheet selected by `table`.
    ///
    /// `None` for symbols outside `!`..`~` or cells beyond the sheet bounds.
    pub fn crop(&self, symbol: char, table: char) -> Option<RgbaImage> {
        let sheet = self.sheet_for(table);
        let (x, y, width, height) = SymbolCell::for_symbol(symbol)?.crop_area();
        if x + width > sheet.width() || y + height > sheet.height() {
            return None;
        }
        Some(imageops::crop_imm(sheet, x, y, width, height).to_image())
    }

    /// The symbol scaled down to one line of text
    pub fn glyph(&self, symbol: char, table: char) -> Option<SymbolGlyph> {
        let cell = self.crop(symbol, table)?;
        let pixels = imageops::resize(&cell, GLYPH_COLUMNS, GLYPH_PIXEL_ROWS, FilterType::Triangle);
        Some(SymbolGlyph { pixels })
    }
}
