//! GIMP `.gbr` brush and `.gih` image-hose parser
//!
//! A `.gbr` file is one header plus one raw pixel blob, big-endian
//! throughout. Version 1 has no magic; version 2 adds a "GIMP" magic and a
//! spacing field, and the name length is derived from the declared header
//! size. A `.gih` hose is two text lines (name, then a cell count with
//! placement parameters) followed by concatenated v2 brushes.
//!
//! Reference: devel-docs/gbr.txt and gih.txt in the GIMP source tree.

use crate::codec::{self, PixelEncoding};
use crate::error::ParseError;
use crate::reader::{ByteReader, Endian};
use crate::types::{
    BrushKind, ChannelLayout, Diagnostic, ParamValue, Parameters, ParseOptions, ParseOutput,
    ParsedBrush,
};

/// Header bytes before the name field: 5 u32 fields in v1, plus magic and
/// spacing in v2.
const V1_FIXED_HEADER: u32 = 20;
const V2_FIXED_HEADER: u32 = 28;

pub struct GbrParser;

impl GbrParser {
    /// Parse a standalone `.gbr` file: exactly one brush.
    pub fn parse(data: &[u8], options: &ParseOptions) -> Result<ParseOutput, ParseError> {
        let mut out = ParseOutput::default();
        match Self::parse_brush(&mut ByteReader::new(data), options) {
            Ok(brush) => out.brushes.push(brush),
            Err(e) if !e.is_fatal() => {
                tracing::warn!(error = %e, "skipping brush");
                out.diagnostics.push(Diagnostic::new("brush 0", &e));
            }
            Err(e) => return Err(e),
        }
        Ok(out)
    }

    /// Parse a `.gih` image hose into one multi-frame brush.
    pub fn parse_hose(data: &[u8], options: &ParseOptions) -> Result<ParseOutput, ParseError> {
        let (name, rest) = read_text_line(data)?;
        let (params, body) = read_text_line(rest)?;

        let count: usize = params
            .split_whitespace()
            .next()
            .and_then(|tok| tok.parse().ok())
            .ok_or_else(|| {
                ParseError::CorruptFile(format!("bad hose cell count line {:?}", params))
            })?;

        let mut out = ParseOutput::default();
        let mut reader = ByteReader::new(body);
        let mut textures = Vec::with_capacity(count);
        let mut parameters = Parameters::new();

        for index in 0..count {
            // Cells are self-delimiting, so a bad one loses the rest of the
            // hose, not just itself.
            match Self::parse_brush(&mut reader, options) {
                Ok(mut brush) => {
                    if parameters.is_empty() {
                        parameters = std::mem::take(&mut brush.parameters);
                    }
                    textures.extend(brush.textures);
                }
                Err(e) if !e.is_fatal() => {
                    tracing::warn!(index, error = %e, "dropping remaining hose cells");
                    out.diagnostics
                        .push(Diagnostic::new(format!("cell {}", index), &e));
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let kind = if textures.len() > 1 {
            BrushKind::Stroke
        } else {
            BrushKind::Stamp
        };
        out.brushes.push(ParsedBrush {
            name,
            kind,
            parameters,
            textures,
        });
        Ok(out)
    }

    /// Parse one brush record at the reader's position, consuming exactly
    /// the header plus pixel blob.
    fn parse_brush(
        reader: &mut ByteReader<'_>,
        options: &ParseOptions,
    ) -> Result<ParsedBrush, ParseError> {
        let header_size = reader.read_u32(Endian::Big)?;
        let version = reader.read_u32(Endian::Big)?;
        let width = reader.read_u32(Endian::Big)?;
        let height = reader.read_u32(Endian::Big)?;
        let bytes_per_pixel = reader.read_u32(Endian::Big)?;

        let mut parameters = Parameters::new();
        let name_len = match version {
            1 => header_size.checked_sub(V1_FIXED_HEADER),
            2 => {
                let magic = reader.read_bytes(4)?;
                if magic != b"GIMP" {
                    return Err(ParseError::CorruptFile(format!(
                        "bad GBR magic {:02x?}",
                        magic
                    )));
                }
                let spacing = reader.read_u32(Endian::Big)?;
                parameters.insert("spacing".into(), ParamValue::Number(spacing as f64));
                header_size.checked_sub(V2_FIXED_HEADER)
            }
            other => {
                return Err(ParseError::UnsupportedSubVersion {
                    format: "gbr",
                    version: other,
                })
            }
        };
        let name_len = name_len.ok_or_else(|| {
            ParseError::CorruptFile(format!("GBR header size {} too small", header_size))
        })? as usize;

        let name_bytes = reader.read_bytes(name_len)?;
        let name = String::from_utf8_lossy(name_bytes)
            .trim_end_matches(char::from(0))
            .to_string();

        options.check_dimensions(width, height)?;
        let layout = match bytes_per_pixel {
            1 => ChannelLayout::Gray,
            4 => ChannelLayout::Rgba,
            other => {
                return Err(ParseError::ImageDecode(format!(
                    "unsupported GBR pixel size {}",
                    other
                )))
            }
        };

        let byte_len = width as usize * height as usize * bytes_per_pixel as usize;
        let payload = reader.read_bytes(byte_len)?;
        let frame = codec::decode(payload, PixelEncoding::Raw, width, height, layout, 8)?;

        Ok(ParsedBrush {
            name,
            kind: BrushKind::Stamp,
            parameters,
            textures: vec![frame],
        })
    }
}

/// Split off one LF-terminated text line, tolerating a trailing CR.
fn read_text_line(data: &[u8]) -> Result<(String, &[u8]), ParseError> {
    let end = data
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(ParseError::TruncatedData {
            needed: 1,
            remaining: 0,
        })?;
    let line = String::from_utf8_lossy(&data[..end])
        .trim_end_matches('\r')
        .to_string();
    Ok((line, &data[end + 1..]))
}
