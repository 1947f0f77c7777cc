//! Format detection and dispatch
//!
//! Magic bytes are authoritative; the extension is a tiebreak for ambiguous
//! containers (both `.sut` and `.brushset` are zip archives) and a fallback
//! for the magicless GBR v1 header, which is only accepted after a
//! plausibility check so arbitrary binaries don't decode as brushes.

use std::path::Path;

use crate::error::ParseError;
use crate::formats::{AbrParser, BrushsetParser, GbrParser, SutParser};
use crate::normalize;
use crate::reader::{ByteReader, Endian};
use crate::types::{ParseOptions, ParseOutput};

/// Supported on-disk brush formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Abr,
    Gbr,
    Gih,
    Brushset,
    Sut,
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ABR_VERSIONS: [u16; 5] = [1, 2, 6, 7, 10];

/// Identify the format from the filename and the head of the file.
pub fn detect(filename: &str, head: &[u8]) -> Result<FormatKind, ParseError> {
    let ext = extension(filename);

    if head.starts_with(ZIP_MAGIC) {
        return Ok(if ext == "sut" {
            FormatKind::Sut
        } else {
            FormatKind::Brushset
        });
    }
    if head.len() >= 8 && &head[4..8] == b"8BIM" {
        return Ok(FormatKind::Abr);
    }
    if head.len() >= 24 && &head[20..24] == b"GIMP" {
        return Ok(FormatKind::Gbr);
    }

    match ext.as_str() {
        "abr" => {
            let mut reader = ByteReader::new(head);
            match reader.read_u16(Endian::Big) {
                Ok(version) if ABR_VERSIONS.contains(&version) => Ok(FormatKind::Abr),
                _ => Err(ParseError::UnrecognizedFormat),
            }
        }
        "gbr" if gbr_v1_plausible(head) => Ok(FormatKind::Gbr),
        "gih" => Ok(FormatKind::Gih),
        _ => Err(ParseError::UnrecognizedFormat),
    }
}

/// Parse in-memory file bytes into normalized brushes.
pub fn parse_bytes(
    filename: &str,
    data: &[u8],
    options: &ParseOptions,
) -> Result<ParseOutput, ParseError> {
    let kind = detect(filename, data)?;
    tracing::info!(filename, ?kind, "parsing brush file");

    let raw = match kind {
        FormatKind::Abr => AbrParser::parse(data, options)?,
        FormatKind::Gbr => GbrParser::parse(data, options)?,
        FormatKind::Gih => GbrParser::parse_hose(data, options)?,
        FormatKind::Brushset => BrushsetParser::parse(data, options)?,
        FormatKind::Sut => SutParser::parse(data, options)?,
    };

    let out = normalize::normalize(raw, kind, file_stem(filename), options);
    let (imported, skipped) = out.summary();
    tracing::info!(filename, imported, skipped, "parse finished");
    Ok(out)
}

/// Read and parse a brush file from disk.
pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<ParseOutput, ParseError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_bytes(&filename, &data, options)
}

fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn file_stem(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename)
}

/// A v1 GBR header has no magic, so only accept fields that look sane:
/// a name-sized header, version 1, in-range dimensions, 1 or 4 channels.
fn gbr_v1_plausible(head: &[u8]) -> bool {
    let mut reader = ByteReader::new(head);
    let fields: Option<[u32; 5]> = (|| {
        let mut out = [0u32; 5];
        for slot in &mut out {
            *slot = reader.read_u32(Endian::Big).ok()?;
        }
        Some(out)
    })();
    let Some([header_size, version, width, height, channels]) = fields else {
        return false;
    };
    let default_limit = ParseOptions::default().max_dimension;
    (20..=64).contains(&header_size)
        && version == 1
        && (1..=default_limit).contains(&width)
        && (1..=default_limit).contains(&height)
        && (channels == 1 || channels == 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_magic_with_extension_tiebreak() {
        let head = b"PK\x03\x04rest";
        assert_eq!(detect("pens.sut", head).unwrap(), FormatKind::Sut);
        assert_eq!(detect("inks.brushset", head).unwrap(), FormatKind::Brushset);
        // Unknown extension still lands on the common zip format.
        assert_eq!(detect("mystery.bin", head).unwrap(), FormatKind::Brushset);
    }

    #[test]
    fn sectioned_abr_by_magic() {
        let mut head = 6u16.to_be_bytes().to_vec();
        head.extend_from_slice(&1u16.to_be_bytes());
        head.extend_from_slice(b"8BIMsamp");
        assert_eq!(detect("anything", &head).unwrap(), FormatKind::Abr);
    }

    #[test]
    fn legacy_abr_by_extension_and_version() {
        let head = [0u8, 1, 0, 3];
        assert_eq!(detect("old.abr", &head).unwrap(), FormatKind::Abr);

        let bogus = [0x40u8, 0x41, 0, 0];
        assert!(matches!(
            detect("old.abr", &bogus),
            Err(ParseError::UnrecognizedFormat)
        ));

        // Too short to even hold a version word: still a detection miss,
        // not a truncation error.
        assert!(matches!(
            detect("tiny.abr", &[0x00]),
            Err(ParseError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn gbr_v2_by_magic_v1_by_plausibility() {
        let mut v2 = vec![0u8; 20];
        v2.extend_from_slice(b"GIMP");
        assert_eq!(detect("noext", &v2).unwrap(), FormatKind::Gbr);

        let mut v1 = Vec::new();
        v1.extend_from_slice(&24u32.to_be_bytes()); // header_size
        v1.extend_from_slice(&1u32.to_be_bytes()); // version
        v1.extend_from_slice(&16u32.to_be_bytes());
        v1.extend_from_slice(&16u32.to_be_bytes());
        v1.extend_from_slice(&1u32.to_be_bytes());
        assert_eq!(detect("old.gbr", &v1).unwrap(), FormatKind::Gbr);

        // Same bytes without the extension stay unrecognized.
        assert!(detect("old.dat", &v1).is_err());

        // Implausible fields fail even with the extension.
        let mut junk = v1.clone();
        junk[0..4].copy_from_slice(&9999u32.to_be_bytes());
        assert!(detect("old.gbr", &junk).is_err());
    }

    #[test]
    fn gih_by_extension() {
        assert_eq!(
            detect("leaves.gih", b"Scatter Leaves\n3 ncells:3\n").unwrap(),
            FormatKind::Gih
        );
    }

    #[test]
    fn garbage_is_unrecognized() {
        assert!(matches!(
            detect("readme.txt", b"hello world"),
            Err(ParseError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn dispatch_rejects_truncated_file_after_header() {
        // Valid GBR v2 header claiming more pixels than the file holds.
        let mut data = Vec::new();
        data.extend_from_slice(&30u32.to_be_bytes());
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&64u32.to_be_bytes());
        data.extend_from_slice(&64u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(b"GIMP");
        data.extend_from_slice(&25u32.to_be_bytes());
        data.extend_from_slice(b"X\0");
        data.extend_from_slice(&[0u8; 100]); // far short of 64*64

        let err = parse_bytes("cut.gbr", &data, &ParseOptions::default());
        assert!(matches!(err, Err(ParseError::TruncatedData { .. })));
    }

    #[test]
    fn dispatch_drops_parameter_only_brushes() {
        // Legacy ABR whose single entry is a computed (type 1) brush:
        // empty output with a diagnostic, not an error.
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes()); // version
        data.extend_from_slice(&1u16.to_be_bytes()); // count
        data.extend_from_slice(&1u16.to_be_bytes()); // computed type
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(&[0u8; 4]);

        let out = parse_bytes("computed.abr", &data, &ParseOptions::default()).unwrap();
        assert!(out.brushes.is_empty());
        assert_eq!(out.summary(), (0, 1));
    }

    #[test]
    fn dispatch_names_nameless_brushes_from_the_file() {
        // Legacy v1 ABR entries carry no name field.
        let mut body = Vec::new();
        body.extend_from_slice(&[0u8; 4]);
        body.extend_from_slice(&25u16.to_be_bytes());
        body.extend_from_slice(&[0u8; 9]);
        for v in [0u32, 0, 2, 2] {
            body.extend_from_slice(&v.to_be_bytes());
        }
        body.extend_from_slice(&8u16.to_be_bytes());
        body.push(0);
        body.extend_from_slice(&[7, 7, 7, 7]);
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&(body.len() as u32).to_be_bytes());
        data.extend_from_slice(&body);

        let out = parse_bytes("sketch-pens.abr", &data, &ParseOptions::default()).unwrap();
        assert_eq!(out.brushes[0].name, "sketch-pens");
        // Legacy spacing is a percentage; normalization makes it a ratio.
        assert_eq!(
            out.brushes[0]
                .parameters
                .get("spacing")
                .and_then(|v| v.as_number()),
            Some(0.25)
        );
    }

    #[test]
    fn dispatch_parses_and_normalizes() {
        // Minimal GBR v2: 2x2 gray brush named in the header.
        let name = "Dot\0";
        let mut data = Vec::new();
        data.extend_from_slice(&(28 + name.len() as u32).to_be_bytes());
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(b"GIMP");
        data.extend_from_slice(&25u32.to_be_bytes());
        data.extend_from_slice(name.as_bytes());
        data.extend_from_slice(&[9, 9, 9, 9]);

        let out = parse_bytes("dot.gbr", &data, &ParseOptions::default()).unwrap();
        assert_eq!(out.brushes.len(), 1);
        assert_eq!(out.brushes[0].name, "Dot");
        assert!(out.brushes[0].parameters.get("spacing").is_some());
    }
}
