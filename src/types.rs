//! Output data model
//!
//! Everything a host needs to materialize a native brush asset: a name, a
//! kind tag, normalized parameters, and decoded texture frames. All values
//! are fully materialized before they are returned; nothing borrows from the
//! source buffer.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ParseError;

/// Semantic arrangement of pixel components in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelLayout {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl ChannelLayout {
    pub fn channels(&self) -> u32 {
        match self {
            ChannelLayout::Gray => 1,
            ChannelLayout::GrayAlpha => 2,
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
        }
    }
}

/// What the source format says the brush is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BrushKind {
    /// A sampled tip image stamped along the stroke.
    Stamp,
    /// A paper/grain texture modulating the stroke.
    Texture,
    /// A multi-frame sequence played back during the stroke.
    Stroke,
}

/// One decoded raster texture, 8-bit per channel, interleaved.
#[derive(Debug, Clone, Serialize)]
pub struct TextureFrame {
    pub width: u32,
    pub height: u32,
    pub layout: ChannelLayout,
    pub pixels: Vec<u8>,
}

impl TextureFrame {
    /// Build a frame, enforcing nonzero dimensions and a pixel buffer of
    /// exactly `width * height * channels` bytes.
    pub fn new(
        width: u32,
        height: u32,
        layout: ChannelLayout,
        pixels: Vec<u8>,
    ) -> Result<Self, ParseError> {
        if width == 0 || height == 0 {
            return Err(ParseError::ImageDecode(format!(
                "zero-dimension frame ({}x{})",
                width, height
            )));
        }
        let expected = width as usize * height as usize * layout.channels() as usize;
        if pixels.len() != expected {
            return Err(ParseError::ImageDecode(format!(
                "pixel buffer is {} bytes, expected {} for {}x{}",
                pixels.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            pixels,
        })
    }

    /// Pixel components at (x, y), or None outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.layout.channels() as usize;
        let idx = (y as usize * self.width as usize + x as usize) * c;
        self.pixels.get(idx..idx + c)
    }
}

/// A single normalized parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Bool(bool),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Bool(_) => None,
        }
    }
}

/// Parameter map in insertion order. Keys absent in the source file are
/// simply absent here; defaulting is the host's job.
pub type Parameters = IndexMap<String, ParamValue>;

/// One converted brush.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedBrush {
    pub name: String,
    pub kind: BrushKind,
    pub parameters: Parameters,
    /// Texture frames in playback/selection order. Never empty in dispatcher
    /// output; brushes without image data are discarded before the caller
    /// sees them.
    pub textures: Vec<TextureFrame>,
}

/// A non-fatal skip recorded during a parse.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Brush name, entry index, or archive path the skip applies to.
    pub entry: String,
    pub reason: String,
}

impl Diagnostic {
    pub fn new(entry: impl Into<String>, err: &ParseError) -> Self {
        Self {
            entry: entry.into(),
            reason: err.to_string(),
        }
    }

    /// A skip that has no backing error value.
    pub fn skip(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

/// Result of parsing one file: the surviving brushes plus a record of what
/// was skipped. Hosts show aggregated counts, not one failure per skip.
#[derive(Debug, Default, Serialize)]
pub struct ParseOutput {
    pub brushes: Vec<ParsedBrush>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    /// (imported, skipped) counts for host-side reporting.
    pub fn summary(&self) -> (usize, usize) {
        (self.brushes.len(), self.diagnostics.len())
    }
}

impl IntoIterator for ParseOutput {
    type Item = ParsedBrush;
    type IntoIter = std::vec::IntoIter<ParsedBrush>;

    fn into_iter(self) -> Self::IntoIter {
        self.brushes.into_iter()
    }
}

/// Caller-tunable knobs recognized by the core.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Ceiling for declared width/height; larger headers fail with
    /// `DimensionOutOfRange` before any pixel allocation.
    pub max_dimension: u32,
    /// When set, a brush with N > 1 textures is expanded into N single-frame
    /// brushes sharing parameters. Off by default so sequence-aware hosts
    /// keep the grouping.
    pub split_multi_frame: bool,
}

impl ParseOptions {
    /// Reject declared dimensions above the configured ceiling. Called on
    /// header fields before any buffer is sized from them.
    pub(crate) fn check_dimensions(&self, width: u32, height: u32) -> Result<(), ParseError> {
        if width > self.max_dimension || height > self.max_dimension {
            return Err(ParseError::DimensionOutOfRange {
                width,
                height,
                limit: self.max_dimension,
            });
        }
        Ok(())
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_dimension: 16384,
            split_multi_frame: false,
        }
    }
}
