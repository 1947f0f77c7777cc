//! Clip Studio `.sut` brush parser
//!
//! A `.sut` file is a zip archive whose brush entries live under a
//! `brushes/` path. Each entry is a little-endian tagged-chunk blob rather
//! than a standard image container: `NAME` carries the display name, `PRMV`
//! carries key/value parameter records, and each `TEXF` chunk is one texture
//! frame with a declared playback index. Unknown tags are skipped so newer
//! writers don't break the walk.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::chunk::{ChunkWalker, Framing, LengthWidth};
use crate::codec::{self, PixelEncoding};
use crate::error::ParseError;
use crate::reader::{ByteReader, Endian};
use crate::types::{
    BrushKind, ChannelLayout, Diagnostic, ParamValue, Parameters, ParseOptions, ParseOutput,
    ParsedBrush, TextureFrame,
};

const BRUSH_DIR: &str = "brushes/";

const SUT_FRAMING: Framing = Framing {
    tag_len: 4,
    length_width: LengthWidth::U32,
    endian: Endian::Little,
    length_includes_header: false,
    align: 1,
};

/// `TEXF` pixel payload encodings.
const FRAME_RAW_GRAY: u8 = 0;
const FRAME_PNG: u8 = 1;

pub struct SutParser;

impl SutParser {
    pub fn parse(data: &[u8], options: &ParseOptions) -> Result<ParseOutput, ParseError> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ParseError::CorruptFile(format!("zip archive: {}", e)))?;

        let mut members: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with(BRUSH_DIR) && !n.ends_with('/'))
            .map(str::to_string)
            .collect();
        members.sort_unstable();

        let mut out = ParseOutput::default();
        for member in &members {
            let blob = match read_member(&mut archive, member) {
                Ok(blob) => blob,
                Err(e) => {
                    tracing::warn!(member = member.as_str(), error = %e, "unreadable brush entry");
                    out.diagnostics.push(Diagnostic::new(member.as_str(), &e));
                    continue;
                }
            };
            match Self::parse_blob(&blob, member, options, &mut out.diagnostics) {
                Ok(brush) => out.brushes.push(brush),
                Err(e) => {
                    tracing::warn!(member = member.as_str(), error = %e, "skipping brush entry");
                    out.diagnostics.push(Diagnostic::new(member.as_str(), &e));
                }
            }
        }
        Ok(out)
    }

    fn parse_blob(
        blob: &[u8],
        member: &str,
        options: &ParseOptions,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<ParsedBrush, ParseError> {
        let mut name = String::new();
        let mut parameters = Parameters::new();
        let mut frames: Vec<(u16, TextureFrame)> = Vec::new();
        let mut frame_no = 0usize;

        for chunk in ChunkWalker::new(blob, SUT_FRAMING) {
            let chunk = chunk?;
            match chunk.tag {
                b"NAME" => {
                    name = String::from_utf8_lossy(chunk.payload)
                        .trim_end_matches(char::from(0))
                        .to_string();
                }
                b"PRMV" => Self::parse_params(&mut chunk.reader(), &mut parameters)?,
                b"TEXF" => {
                    frame_no += 1;
                    match Self::parse_frame(&mut chunk.reader(), options) {
                        Ok(indexed) => frames.push(indexed),
                        Err(e) if !e.is_fatal() => {
                            tracing::warn!(member, frame = frame_no, error = %e, "skipping frame");
                            diagnostics.push(Diagnostic::new(
                                format!("{} frame {}", member, frame_no),
                                &e,
                            ));
                        }
                        Err(e) => return Err(e),
                    }
                }
                _ => tracing::debug!(member, tag = %chunk.tag_str(), "ignoring chunk"),
            }
        }

        // Playback order is the declared index; gaps from dropped frames
        // compact rather than zero-fill.
        frames.sort_by_key(|(index, _)| *index);
        let textures: Vec<TextureFrame> = frames.into_iter().map(|(_, f)| f).collect();

        let kind = if textures.len() > 1 {
            BrushKind::Stroke
        } else {
            BrushKind::Stamp
        };
        Ok(ParsedBrush {
            name,
            kind,
            parameters,
            textures,
        })
    }

    /// `PRMV`: consecutive pascal-string key + `f32` value records.
    fn parse_params(
        reader: &mut ByteReader<'_>,
        parameters: &mut Parameters,
    ) -> Result<(), ParseError> {
        while reader.remaining() > 0 {
            let key = reader.read_pascal_string()?;
            let value = reader.read_f32(Endian::Little)?;
            parameters.insert(key, ParamValue::Number(value as f64));
        }
        Ok(())
    }

    /// `TEXF`: frame index, encoding byte, declared size, pixel payload.
    fn parse_frame(
        reader: &mut ByteReader<'_>,
        options: &ParseOptions,
    ) -> Result<(u16, TextureFrame), ParseError> {
        let index = reader.read_u16(Endian::Little)?;
        let encoding = reader.read_u8()?;
        let width = reader.read_u16(Endian::Little)? as u32;
        let height = reader.read_u16(Endian::Little)? as u32;
        let payload = reader.read_bytes(reader.remaining())?;

        let frame = match encoding {
            FRAME_RAW_GRAY => {
                options.check_dimensions(width, height)?;
                codec::decode(
                    payload,
                    PixelEncoding::Raw,
                    width,
                    height,
                    ChannelLayout::Gray,
                    8,
                )?
            }
            FRAME_PNG => {
                let (w, h) = codec::standard_image_dimensions(payload)?;
                options.check_dimensions(w, h)?;
                codec::decode_standard_image(payload)?
            }
            other => {
                return Err(ParseError::ImageDecode(format!(
                    "unknown frame encoding {}",
                    other
                )))
            }
        };
        Ok((index, frame))
    }
}

fn read_member(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ParseError> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| ParseError::MissingArchiveMember(name.to_string()))?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(buf)
}
