//! Styled, surface-independent packet summaries.

use crossterm::style::Color;

/// Which way a packet travelled, as shown by the leading marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    /// Heard on RF or handed in by the internet gateway
    Rx,
    /// Transmitted by direwolf
    Tx,
    /// Relayed; the label replaces `RX`
    Relay(String),
}

impl Direction {
    pub fn marker(&self) -> String {
        match self {
            Direction::Rx => "RX\u{2193}".to_string(),
            Direction::Tx => "TX\u{2191}".to_string(),
            Direction::Relay(label) => format!("{}\u{2193}", label),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub foreground: Option<Color>,
    pub bold: bool,
}

impl Style {
    pub const PLAIN: Style = Style {
        foreground: None,
        bold: false,
    };

    pub const fn fg(color: Color) -> Self {
        Self {
            foreground: Some(color),
            bold: false,
        }
    }

    pub const fn bold(self) -> Self {
        Self {
            foreground: self.foreground,
            bold: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text { text: String, style: Style },
    /// APRS symbol icon, drawn however the surface can
    Glyph { symbol: char, table: char },
}

/// Ordered segments making up one line of output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedSummary {
    segments: Vec<Segment>,
}

impl RenderedSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, text: impl Into<String>, style: Style) {
        let text = text.into();
        if !text.is_empty() {
            self.segments.push(Segment::Text { text, style });
        }
    }

    pub fn push_plain(&mut self, text: impl Into<String>) {
        self.push_text(text, Style::PLAIN);
    }

    pub fn push_glyph(&mut self, symbol: char, table: char) {
        self.segments.push(Segment::Glyph { symbol, table });
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The summary without styling; glyphs appear as `<table><symbol>`
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text { text, .. } => text.clone(),
                Segment::Glyph { symbol, table } => format!("{}{}", table, symbol),
            })
            .collect()
    }
}
