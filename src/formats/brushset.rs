//! Procreate `.brushset` / `.brush` archive parser
//!
//! A brushset is a zip archive with one folder per brush. Each folder holds
//! a `Brush.archive` manifest (an NSKeyedArchiver binary plist) plus the
//! brush images: `Shape.png` for the stamp tip and `Grain.png` for the paper
//! texture. Enumeration is manifest-first, so stray images without a
//! manifest are never imported on their own.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::codec;
use crate::error::ParseError;
use crate::types::{
    BrushKind, Diagnostic, ParamValue, Parameters, ParseOptions, ParseOutput, ParsedBrush,
    TextureFrame,
};

const MANIFEST_NAME: &str = "Brush.archive";

pub struct BrushsetParser;

impl BrushsetParser {
    pub fn parse(data: &[u8], options: &ParseOptions) -> Result<ParseOutput, ParseError> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ParseError::CorruptFile(format!("zip archive: {}", e)))?;

        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        let mut manifests: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| n.ends_with(MANIFEST_NAME))
            .collect();
        manifests.sort_unstable();

        let mut out = ParseOutput::default();
        for manifest in manifests {
            let folder = &manifest[..manifest.len() - MANIFEST_NAME.len()];
            let label = folder.trim_end_matches('/');

            // Factory "Reset" sets ship alongside user brushes; they are
            // not importable content.
            if folder.split('/').any(|part| part == "Reset") {
                tracing::debug!(folder = label, "skipping reset set");
                continue;
            }

            // One bad folder loses that brush, never the archive.
            if let Err(e) = Self::parse_folder(&mut archive, &names, manifest, folder, options, &mut out)
            {
                tracing::warn!(folder = label, error = %e, "skipping brush folder");
                out.diagnostics.push(Diagnostic::new(label, &e));
            }
        }

        Ok(out)
    }

    fn parse_folder(
        archive: &mut ZipArchive<Cursor<&[u8]>>,
        names: &[String],
        manifest: &str,
        folder: &str,
        options: &ParseOptions,
        out: &mut ParseOutput,
    ) -> Result<(), ParseError> {
        let manifest_bytes = read_member(archive, manifest)?;
        let (name, parameters) = parse_manifest(&manifest_bytes)?;

        let shape = Self::decode_role(archive, names, folder, "Shape.png", options, out)?;
        let grain = Self::decode_role(archive, names, folder, "Grain.png", options, out)?;

        if shape.is_empty() && grain.is_empty() {
            return Err(ParseError::MissingArchiveMember(format!(
                "{}Shape.png",
                folder
            )));
        }

        if !shape.is_empty() {
            out.brushes.push(ParsedBrush {
                name: name.clone(),
                kind: BrushKind::Stamp,
                parameters: parameters.clone(),
                textures: shape,
            });
        }
        if !grain.is_empty() {
            out.brushes.push(ParsedBrush {
                name,
                kind: BrushKind::Texture,
                parameters,
                textures: grain,
            });
        }
        Ok(())
    }

    /// Decode every image of one role in the folder, in name order. A bad
    /// frame is skipped on its own; the brush keeps its other frames.
    fn decode_role(
        archive: &mut ZipArchive<Cursor<&[u8]>>,
        names: &[String],
        folder: &str,
        role: &str,
        options: &ParseOptions,
        out: &mut ParseOutput,
    ) -> Result<Vec<TextureFrame>, ParseError> {
        let mut members: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| n.starts_with(folder) && n.ends_with(role))
            .collect();
        members.sort_unstable();

        let mut frames = Vec::with_capacity(members.len());
        for member in members {
            let decoded = read_member(archive, member).and_then(|bytes| {
                let (width, height) = codec::standard_image_dimensions(&bytes)?;
                options.check_dimensions(width, height)?;
                codec::decode_standard_image(&bytes)
            });
            match decoded {
                Ok(frame) => frames.push(frame),
                Err(e) if !e.is_fatal() => {
                    tracing::warn!(member, error = %e, "skipping frame");
                    out.diagnostics.push(Diagnostic::new(member, &e));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(frames)
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

/// Pull the display name and the parameter block out of an NSKeyedArchiver
/// manifest. The archiver flattens the brush object into a dictionary inside
/// `$objects`; we recognize it by its `paintSize` key. The display name is
/// the first plain string in `$objects` (everything else in there is either
/// `$null` or a keyed-archive marker).
fn parse_manifest(bytes: &[u8]) -> Result<(String, Parameters), ParseError> {
    let value = plist::Value::from_reader(Cursor::new(bytes))
        .map_err(|e| ParseError::CorruptFile(format!("brush manifest: {}", e)))?;
    let objects = value
        .as_dictionary()
        .and_then(|d| d.get("$objects"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| ParseError::CorruptFile("brush manifest has no $objects".into()))?;

    let mut name = String::new();
    for obj in objects {
        if let plist::Value::String(s) = obj {
            // Skip archiver markers ("$null", "$classname"), serialized
            // sub-dictionaries, and image path strings.
            if !s.starts_with('$') && !s.starts_with('{') && !s.ends_with(".png") {
                name = s.clone();
                break;
            }
        }
    }

    let mut parameters = Parameters::new();
    for obj in objects {
        let dict = match obj.as_dictionary() {
            Some(d) if d.get("paintSize").is_some() => d,
            _ => continue,
        };
        for (key, v) in dict {
            let key: &str = key;
            match v {
                plist::Value::Real(n) => {
                    parameters.insert(key.to_string(), ParamValue::Number(*n));
                }
                plist::Value::Integer(i) => {
                    if let Some(n) = i.as_signed() {
                        parameters.insert(key.to_string(), ParamValue::Number(n as f64));
                    }
                }
                plist::Value::Boolean(b) => {
                    parameters.insert(key.to_string(), ParamValue::Bool(*b));
                }
                _ => {}
            }
        }
        break;
    }

    Ok((name, parameters))
}
