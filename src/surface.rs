//! Output surfaces that print rendered summaries.

use anyhow::{Context, Result};
use crossterm::queue;
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use image::Rgba;
use std::io::Write;

use crate::summary::{RenderedSummary, Segment};
use crate::symbols::SymbolSheets;

/// Upper half block; foreground paints the top pixel, background the bottom one
const HALF_BLOCK: char = '\u{2580}';

/// Pixels at least this opaque are drawn, the rest show the terminal background
const MIN_ALPHA: u8 = 128;

/// Something that can show one summary per line
pub trait OutputSurface {
    fn emit(&mut self, summary: &RenderedSummary) -> Result<()>;
}

/// ANSI terminal output with 24-bit color and inline symbol icons
pub struct TerminalSurface<W: Write> {
    out: W,
    sheets: SymbolSheets,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, sheets: SymbolSheets) -> Self {
        Self { out, sheets }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_glyph(&mut self, symbol: char, table: char) -> Result<()> {
        let Some(glyph) = self.sheets.glyph(symbol, table) else {
            queue!(self.out, Print(format!("{}{}", table, symbol)))?;
            return Ok(());
        };

        for col in 0..glyph.columns() {
            let (top, bottom) = glyph.column(col);
            queue!(
                self.out,
                SetForegroundColor(pixel_color(top)),
                SetBackgroundColor(pixel_color(bottom)),
                Print(HALF_BLOCK),
                ResetColor
            )?;
        }
        Ok(())
    }
}

fn pixel_color(pixel: Rgba<u8>) -> Color {
    let [r, g, b, a] = pixel.0;
    if a < MIN_ALPHA {
        Color::Reset
    } else {
        Color::Rgb { r, g, b }
    }
}

impl<W: Write> OutputSurface for TerminalSurface<W> {
    fn emit(&mut self, summary: &RenderedSummary) -> Result<()> {
        for segment in summary.segments() {
            match segment {
                Segment::Text { text, style } => {
                    if style.bold {
                        queue!(self.out, SetAttribute(Attribute::Bold))?;
                    }
                    if let Some(color) = style.foreground {
                        queue!(self.out, SetForegroundColor(color))?;
                    }
                    queue!(self.out, Print(text), SetAttribute(Attribute::Reset), ResetColor)?;
                }
                Segment::Glyph { symbol, table } => self.write_glyph(*symbol, *table)?,
            }
        }
        queue!(self.out, Print("\n"))?;
        self.out.flush().context("Failed to flush terminal output")
    }
}

/// Uncolored output, for pipes and dumb terminals
pub struct PlainSurface<W: Write> {
    out: W,
}

impl<W: Write> PlainSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputSurface for PlainSurface<W> {
    fn emit(&mut self, summary: &RenderedSummary) -> Result<()> {
        writeln!(self.out, "{}", summary.plain_text()).context("Failed to write summary")?;
        self.out.flush().context("Failed to flush output")
    }
}
