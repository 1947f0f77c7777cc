//! Photoshop `.abr` brush file parser
//!
//! Two structural generations share the extension. Versions 1/2 are a flat
//! list of fixed-layout sample records. Versions 6/7/10 wrap everything in
//! `8BIM`-signed sections: sample images live in `samp`, brush metadata in a
//! `desc` action-descriptor tree, and the two are correlated by brush
//! position.
//!
//! References: Krita's kis_abr_brush_collection.cpp, GIMP gimpbrush-load.c,
//! and the Photoshop file-format notes on the archiveteam wiki.

mod descriptor;

use crate::chunk::{ChunkWalker, Framing, LengthWidth};
use crate::codec::{self, PixelEncoding};
use crate::error::ParseError;
use crate::reader::{ByteReader, Endian};
use crate::types::{
    BrushKind, ChannelLayout, Diagnostic, ParamValue, Parameters, ParseOptions, ParseOutput,
    ParsedBrush, TextureFrame,
};

use descriptor::{parse_descriptor, Descriptor, DescriptorValue};

/// Sample entries taller than this use segmented image data, which is not
/// supported.
const SEGMENT_ROW_LIMIT: u32 = 16384;

/// Fixed-width key (UUID + padding) at the start of a v6+ sample entry.
const SAMP_KEY_LEN: usize = 37;

/// Top-level `8BIM` + 4-char section name, big-endian u32 payload length.
const SECTION_FRAMING: Framing = Framing {
    tag_len: 8,
    length_width: LengthWidth::U32,
    endian: Endian::Big,
    length_includes_header: false,
    align: 2,
};

/// Untagged length-prefixed records inside `samp`, padded to 4 bytes.
const SAMP_ENTRY_FRAMING: Framing = Framing {
    tag_len: 0,
    length_width: LengthWidth::U32,
    endian: Endian::Big,
    length_includes_header: false,
    align: 4,
};

/// One decoded image from the `samp` section.
struct SampImage {
    uuid: String,
    frame: TextureFrame,
}

/// One brush entry from the `desc` section.
struct DescEntry {
    name: Option<String>,
    /// Whether the descriptor references sampled image data (computed
    /// brushes do not and carry no convertible texture).
    references_sample: bool,
    parameters: Parameters,
}

pub struct AbrParser;

impl AbrParser {
    pub fn parse(data: &[u8], options: &ParseOptions) -> Result<ParseOutput, ParseError> {
        let mut reader = ByteReader::new(data);
        let version = reader.read_u16(Endian::Big)?;
        tracing::debug!(version, "ABR header");

        match version {
            1 | 2 => Self::parse_legacy(&mut reader, version, options),
            6 | 7 | 10 => {
                let subversion = reader.read_u16(Endian::Big)?;
                Self::parse_sectioned(&data[4..], subversion, options)
            }
            _ => Err(ParseError::UnrecognizedFormat),
        }
    }

    /// v1/v2: a brush count, then (type, length, record) triples.
    fn parse_legacy(
        reader: &mut ByteReader<'_>,
        version: u16,
        options: &ParseOptions,
    ) -> Result<ParseOutput, ParseError> {
        let count = reader.read_u16(Endian::Big)?;
        let mut out = ParseOutput::default();

        for index in 0..count {
            let brush_type = reader.read_u16(Endian::Big)?;
            let size = reader.read_u32(Endian::Big)? as usize;
            let entry = reader.read_bytes(size)?;

            if brush_type != 2 {
                // Type 1 is a computed (parametric) brush; there is no
                // sampled image to convert.
                tracing::debug!(index, brush_type, "skipping non-sampled brush");
                out.diagnostics.push(Diagnostic::skip(
                    format!("brush {}", index),
                    format!("unsupported brush type {}", brush_type),
                ));
                continue;
            }

            match Self::parse_legacy_sampled(&mut ByteReader::new(entry), version, options) {
                Ok(brush) => out.brushes.push(brush),
                Err(e) if !e.is_fatal() => {
                    tracing::warn!(index, error = %e, "skipping brush entry");
                    out.diagnostics
                        .push(Diagnostic::new(format!("brush {}", index), &e));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(out)
    }

    fn parse_legacy_sampled(
        reader: &mut ByteReader<'_>,
        version: u16,
        options: &ParseOptions,
    ) -> Result<ParsedBrush, ParseError> {
        reader.skip(4)?; // misc flags
        let spacing = reader.read_u16(Endian::Big)?;

        let name = if version == 2 {
            reader.read_utf16_string(Endian::Big)?
        } else {
            String::new()
        };

        reader.skip(9)?; // antialiasing byte + 16-bit bounds

        let top = reader.read_i32(Endian::Big)?;
        let left = reader.read_i32(Endian::Big)?;
        let bottom = reader.read_i32(Endian::Big)?;
        let right = reader.read_i32(Endian::Big)?;
        let depth = reader.read_u16(Endian::Big)?;
        let compression = reader.read_u8()?;

        let (width, height) = bounds_to_size(top, left, bottom, right)?;
        options.check_dimensions(width, height)?;
        if height > SEGMENT_ROW_LIMIT {
            return Err(ParseError::DimensionOutOfRange {
                width,
                height,
                limit: SEGMENT_ROW_LIMIT,
            });
        }

        let payload = reader.read_bytes(reader.remaining())?;
        let frame = Self::decode_tip(payload, width, height, depth, compression)?;

        let mut parameters = Parameters::new();
        parameters.insert("Spcn".into(), ParamValue::Number(spacing as f64));

        Ok(ParsedBrush {
            name,
            kind: BrushKind::Stamp,
            parameters,
            textures: vec![frame],
        })
    }

    /// v6+: locate the `samp` and `desc` sections, decode sample images in
    /// file order, parse the descriptor brush list, and join the two by
    /// brush position.
    fn parse_sectioned(
        body: &[u8],
        subversion: u16,
        options: &ParseOptions,
    ) -> Result<ParseOutput, ParseError> {
        let mut samp_payload: Option<&[u8]> = None;
        let mut desc_payload: Option<&[u8]> = None;

        for chunk in ChunkWalker::new(body, SECTION_FRAMING) {
            let chunk = chunk?;
            if &chunk.tag[..4] != b"8BIM" {
                return Err(ParseError::CorruptFile(
                    "section without 8BIM signature".into(),
                ));
            }
            match &chunk.tag[4..8] {
                b"samp" => samp_payload = Some(chunk.payload),
                b"desc" => desc_payload = Some(chunk.payload),
                other => {
                    tracing::debug!(section = %String::from_utf8_lossy(other), "ignoring section")
                }
            }
        }

        let mut out = ParseOutput::default();
        // One slot per samp entry; a failed entry keeps its slot as None so
        // later descriptor/image pairs stay aligned.
        let mut images: Vec<Option<SampImage>> = Vec::new();

        if let Some(samp) = samp_payload {
            for (index, entry) in ChunkWalker::new(samp, SAMP_ENTRY_FRAMING).enumerate() {
                let entry = entry?;
                if subversion != 1 && subversion != 2 {
                    // Entry framing is stable across sub-versions but the
                    // interior layout is not; fail each entry, not the file.
                    out.diagnostics.push(Diagnostic::new(
                        format!("brush {}", index),
                        &ParseError::UnsupportedSubVersion {
                            format: "abr",
                            version: subversion as u32,
                        },
                    ));
                    images.push(None);
                    continue;
                }
                match Self::parse_samp_entry(&mut entry.reader(), subversion, options) {
                    Ok(img) => images.push(Some(img)),
                    Err(e) if !e.is_fatal() => {
                        tracing::warn!(index, error = %e, "skipping sample entry");
                        out.diagnostics
                            .push(Diagnostic::new(format!("brush {}", index), &e));
                        images.push(None);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let entries = match desc_payload {
            Some(payload) => match Self::parse_desc_entries(payload) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(error = %e, "descriptor section unusable, keeping image-only brushes");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        // Join pass: descriptor entries consume samp slots in order.
        let mut image_iter = images.into_iter();
        for (index, entry) in entries.into_iter().enumerate() {
            let name = entry.name.unwrap_or_default();
            if entry.references_sample {
                match image_iter.next() {
                    Some(Some(img)) => out.brushes.push(ParsedBrush {
                        name,
                        kind: BrushKind::Stamp,
                        parameters: entry.parameters,
                        textures: vec![img.frame],
                    }),
                    Some(None) => {
                        tracing::warn!(index, "image data for this brush was skipped");
                        out.diagnostics.push(Diagnostic::skip(
                            format!("brush {}", index),
                            "image data for this brush was skipped",
                        ));
                    }
                    None => {
                        tracing::warn!(index, "sampled brush has no matching image data");
                        out.diagnostics.push(Diagnostic::skip(
                            format!("brush {}", index),
                            "sampled brush has no matching image data",
                        ));
                    }
                }
            } else {
                // Computed brush: parameters without image data. Emitted
                // with no textures; the dispatcher discards it downstream.
                out.brushes.push(ParsedBrush {
                    name,
                    kind: BrushKind::Stamp,
                    parameters: entry.parameters,
                    textures: Vec::new(),
                });
            }
        }

        // Images the descriptor never claimed are kept, parameterless.
        for img in image_iter.flatten() {
            tracing::debug!(uuid = %img.uuid, "sample image without descriptor entry");
            out.brushes.push(ParsedBrush {
                name: String::new(),
                kind: BrushKind::Stamp,
                parameters: Parameters::new(),
                textures: vec![img.frame],
            });
        }

        Ok(out)
    }

    fn parse_samp_entry(
        reader: &mut ByteReader<'_>,
        subversion: u16,
        options: &ParseOptions,
    ) -> Result<SampImage, ParseError> {
        let key = reader.read_bytes(SAMP_KEY_LEN)?;
        let raw_key = String::from_utf8_lossy(key);
        let uuid = raw_key
            .trim_matches(char::from(0))
            .trim()
            .trim_start_matches('$')
            .to_string();

        // Unknown/unnecessary interior fields; length depends on sub-version.
        reader.skip(if subversion == 1 { 10 } else { 264 })?;

        let top = reader.read_i32(Endian::Big)?;
        let left = reader.read_i32(Endian::Big)?;
        let bottom = reader.read_i32(Endian::Big)?;
        let right = reader.read_i32(Endian::Big)?;
        let depth = reader.read_u16(Endian::Big)?;
        let compression = reader.read_u8()?;

        let (width, height) = bounds_to_size(top, left, bottom, right)?;
        options.check_dimensions(width, height)?;

        let payload = reader.read_bytes(reader.remaining())?;
        let frame = Self::decode_tip(payload, width, height, depth, compression)?;

        Ok(SampImage { uuid, frame })
    }

    /// Decode a sample tip: an 8- or 16-bit grayscale plane, optionally
    /// followed by a separate alpha plane. When the alpha plane is present
    /// the two merge into a GrayAlpha frame; when its decode fails only the
    /// alpha is dropped.
    fn decode_tip(
        payload: &[u8],
        width: u32,
        height: u32,
        depth: u16,
        compression: u8,
    ) -> Result<TextureFrame, ParseError> {
        match compression {
            0 => {
                let plane_len = plane_byte_len(width, height, depth)?;
                let gray = codec::decode(
                    payload,
                    PixelEncoding::Raw,
                    width,
                    height,
                    ChannelLayout::Gray,
                    depth,
                )?;
                if payload.len() >= plane_len * 2 {
                    match codec::decode(
                        &payload[plane_len..],
                        PixelEncoding::Raw,
                        width,
                        height,
                        ChannelLayout::Gray,
                        depth,
                    ) {
                        Ok(alpha) => {
                            return merge_gray_alpha(width, height, gray.pixels, alpha.pixels)
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "alpha plane decode failed, keeping gray tip")
                        }
                    }
                }
                Ok(gray)
            }
            1 => {
                let mut reader = ByteReader::new(payload);
                let gray = codec::decode_rle_plane(&mut reader, width, height, depth)?;
                // Another scanline table cannot fit in fewer bytes than the
                // table itself; anything shorter is alignment padding.
                if reader.remaining() > height as usize * 2 {
                    match codec::decode_rle_plane(&mut reader, width, height, depth) {
                        Ok(alpha) => return merge_gray_alpha(width, height, gray, alpha),
                        Err(e) => {
                            tracing::warn!(error = %e, "alpha plane decode failed, keeping gray tip")
                        }
                    }
                }
                TextureFrame::new(width, height, ChannelLayout::Gray, gray)
            }
            other => Err(ParseError::UnsupportedSubVersion {
                format: "abr",
                version: other as u32,
            }),
        }
    }

    fn parse_desc_entries(payload: &[u8]) -> Result<Vec<DescEntry>, ParseError> {
        let desc = parse_descriptor(&mut ByteReader::new(payload))?;
        let list = match desc.get("Brsh") {
            Some(DescriptorValue::List(list)) => list,
            _ => return Ok(Vec::new()),
        };
        Ok(list
            .iter()
            .filter_map(|v| v.as_descriptor())
            .map(Self::desc_entry)
            .collect())
    }

    fn desc_entry(d: &Descriptor) -> DescEntry {
        let name = d
            .get("Nm  ")
            .and_then(|v| v.as_string())
            .map(str::to_string);

        let mut parameters = Parameters::new();
        if let Some(brsh) = d.get("Brsh").and_then(|v| v.as_descriptor()) {
            for key in ["Dmtr", "Spcn", "Angl", "Rndn", "Hrdn"] {
                if let Some(v) = brsh.get(key).and_then(|v| v.as_number()) {
                    parameters.insert(key.to_string(), ParamValue::Number(v));
                }
            }
        }
        if let Some(sz) = d.get("szVr").and_then(|v| v.as_descriptor()) {
            if let Some(v) = sz.get("jitter").and_then(|v| v.as_number()) {
                parameters.insert("sizeJitter".into(), ParamValue::Number(v));
            }
        }
        if let Some(op) = d.get("opVr").and_then(|v| v.as_descriptor()) {
            if let Some(v) = op.get("jitter").and_then(|v| v.as_number()) {
                parameters.insert("opacityJitter".into(), ParamValue::Number(v));
            }
        }

        DescEntry {
            name,
            references_sample: references_sample(d),
            parameters,
        }
    }
}

/// Whether any node in the descriptor tree references sampled image data.
fn references_sample(d: &Descriptor) -> bool {
    if d.get("sampledData").and_then(|v| v.as_string()).is_some() {
        return true;
    }
    for value in d.values() {
        match value {
            DescriptorValue::Descriptor(sub) => {
                if references_sample(sub) {
                    return true;
                }
            }
            DescriptorValue::List(items) => {
                for item in items {
                    if let DescriptorValue::Descriptor(sub) = item {
                        if references_sample(sub) {
                            return true;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    false
}

fn bounds_to_size(top: i32, left: i32, bottom: i32, right: i32) -> Result<(u32, u32), ParseError> {
    let width = right as i64 - left as i64;
    let height = bottom as i64 - top as i64;
    if width <= 0 || height <= 0 {
        return Err(ParseError::ImageDecode(format!(
            "empty sample bounds ({}x{})",
            width, height
        )));
    }
    Ok((width as u32, height as u32))
}

fn plane_byte_len(width: u32, height: u32, depth: u16) -> Result<usize, ParseError> {
    let elem = match depth {
        8 => 1usize,
        16 => 2,
        other => {
            return Err(ParseError::ImageDecode(format!(
                "unsupported bit depth {}",
                other
            )))
        }
    };
    Ok(width as usize * height as usize * elem)
}

fn merge_gray_alpha(
    width: u32,
    height: u32,
    gray: Vec<u8>,
    alpha: Vec<u8>,
) -> Result<TextureFrame, ParseError> {
    let mut pixels = Vec::with_capacity(gray.len() * 2);
    for (g, a) in gray.iter().zip(alpha.iter()) {
        pixels.push(*g);
        pixels.push(*a);
    }
    TextureFrame::new(width, height, ChannelLayout::GrayAlpha, pixels)
}

#[cfg(test)]
mod tests {
    use super::descriptor::test_support as dt;
    use super::*;
    use crate::codec::encode_rle_plane;

    fn legacy_record(version: u16, name: &str, width: u32, height: u32) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&[0u8; 4]); // misc
        body.extend_from_slice(&25u16.to_be_bytes()); // spacing %
        if version == 2 {
            body.extend(dt::unicode_string(name));
        }
        body.extend_from_slice(&[0u8; 9]); // antialiasing + short bounds
        for v in [0u32, 0, height, width] {
            body.extend_from_slice(&v.to_be_bytes());
        }
        body.extend_from_slice(&8u16.to_be_bytes()); // depth
        body.push(0); // raw
        body.extend(vec![128u8; (width * height) as usize]);

        let mut record = 2u16.to_be_bytes().to_vec(); // sampled
        record.extend_from_slice(&(body.len() as u32).to_be_bytes());
        record.extend(body);
        record
    }

    fn legacy_file(version: u16, records: &[Vec<u8>]) -> Vec<u8> {
        let mut data = version.to_be_bytes().to_vec();
        data.extend_from_slice(&(records.len() as u16).to_be_bytes());
        for r in records {
            data.extend_from_slice(r);
        }
        data
    }

    fn samp_entry(uuid: &str, width: u32, height: u32, compression: u8, pixels: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        let mut key = [0u8; SAMP_KEY_LEN];
        key[..uuid.len()].copy_from_slice(uuid.as_bytes());
        body.extend_from_slice(&key);
        body.extend_from_slice(&[0u8; 10]); // subversion 1 interior
        for v in [0u32, 0, height, width] {
            body.extend_from_slice(&v.to_be_bytes());
        }
        body.extend_from_slice(&8u16.to_be_bytes());
        body.push(compression);
        body.extend_from_slice(pixels);

        let mut entry = (body.len() as u32).to_be_bytes().to_vec();
        entry.extend(body);
        while entry.len() % 4 != 0 {
            entry.push(0);
        }
        entry
    }

    fn section(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = b"8BIM".to_vec();
        out.extend_from_slice(name);
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 != 0 {
            out.push(0);
        }
        out
    }

    fn sectioned_file(subversion: u16, sections: &[Vec<u8>]) -> Vec<u8> {
        let mut data = 6u16.to_be_bytes().to_vec();
        data.extend_from_slice(&subversion.to_be_bytes());
        for s in sections {
            data.extend_from_slice(s);
        }
        data
    }

    fn sampled_desc(name: &str) -> Vec<u8> {
        dt::objc(
            "brsh",
            &[
                ("Nm  ", dt::text(name)),
                ("sampledData", dt::text("11111111-2222-3333-4444-555555555555")),
                (
                    "Brsh",
                    dt::objc(
                        "brsh",
                        &[
                            ("Spcn", dt::unit_float("#Prc", 25.0)),
                            ("Angl", dt::unit_float("#Ang", 30.0)),
                            ("Rndn", dt::unit_float("#Prc", 100.0)),
                        ],
                    ),
                ),
            ],
        )
    }

    fn computed_desc(name: &str) -> Vec<u8> {
        dt::objc(
            "brsh",
            &[
                ("Nm  ", dt::text(name)),
                (
                    "Brsh",
                    dt::objc("brsh", &[("Dmtr", dt::unit_float("#Pxl", 40.0))]),
                ),
            ],
        )
    }

    #[test]
    fn parses_v1_sampled_brush() {
        let data = legacy_file(1, &[legacy_record(1, "", 4, 4)]);
        let out = AbrParser::parse(&data, &ParseOptions::default()).unwrap();
        assert_eq!(out.brushes.len(), 1);
        let brush = &out.brushes[0];
        assert_eq!(brush.textures.len(), 1);
        assert_eq!(brush.textures[0].layout, ChannelLayout::Gray);
        assert_eq!(brush.textures[0].pixels, vec![128u8; 16]);
        assert_eq!(
            brush.parameters.get("Spcn").and_then(|p| p.as_number()),
            Some(25.0)
        );
    }

    #[test]
    fn parses_v2_brush_name() {
        let data = legacy_file(2, &[legacy_record(2, "Chalk", 4, 2)]);
        let out = AbrParser::parse(&data, &ParseOptions::default()).unwrap();
        assert_eq!(out.brushes[0].name, "Chalk");
    }

    #[test]
    fn computed_legacy_brush_is_skipped_with_diagnostic() {
        let mut record = 1u16.to_be_bytes().to_vec();
        record.extend_from_slice(&4u32.to_be_bytes());
        record.extend_from_slice(&[0u8; 4]);
        let data = legacy_file(1, &[record]);

        let out = AbrParser::parse(&data, &ParseOptions::default()).unwrap();
        assert!(out.brushes.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn truncated_body_is_an_error() {
        let data = legacy_file(1, &[legacy_record(1, "", 8, 8)]);
        let cut = &data[..data.len() - 20];
        assert!(matches!(
            AbrParser::parse(cut, &ParseOptions::default()),
            Err(ParseError::TruncatedData { .. })
        ));
    }

    #[test]
    fn oversized_declared_bounds_skip_without_allocation() {
        let mut body = Vec::new();
        body.extend_from_slice(&[0u8; 4]);
        body.extend_from_slice(&25u16.to_be_bytes());
        body.extend_from_slice(&[0u8; 9]);
        for v in [0u32, 0, 1_000_000_000, 1_000_000_000] {
            body.extend_from_slice(&v.to_be_bytes());
        }
        body.extend_from_slice(&8u16.to_be_bytes());
        body.push(0);
        let mut record = 2u16.to_be_bytes().to_vec();
        record.extend_from_slice(&(body.len() as u32).to_be_bytes());
        record.extend(body);
        let data = legacy_file(1, &[record]);

        let out = AbrParser::parse(&data, &ParseOptions::default()).unwrap();
        assert!(out.brushes.is_empty());
        assert!(out.diagnostics[0].reason.contains("exceeds limit"));
    }

    #[test]
    fn sectioned_file_joins_desc_and_samp_by_position() {
        let samp = samp_entry("$11111111-2222-3333-4444-555555555555", 4, 4, 0, &[200; 16]);
        let desc = dt::top_level(
            "Dscr",
            &[(
                "Brsh",
                dt::list(&[sampled_desc("Round Sketch"), computed_desc("Soft Dot")]),
            )],
        );
        let data = sectioned_file(1, &[section(b"samp", &samp), section(b"desc", &desc)]);

        let out = AbrParser::parse(&data, &ParseOptions::default()).unwrap();
        assert_eq!(out.brushes.len(), 2);

        let sampled = &out.brushes[0];
        assert_eq!(sampled.name, "Round Sketch");
        assert_eq!(sampled.textures.len(), 1);
        assert_eq!(
            sampled.parameters.get("Angl").and_then(|p| p.as_number()),
            Some(30.0)
        );

        // Computed brush survives the parser with no textures; the
        // dispatcher discards it.
        let computed = &out.brushes[1];
        assert_eq!(computed.name, "Soft Dot");
        assert!(computed.textures.is_empty());
        assert_eq!(
            computed.parameters.get("Dmtr").and_then(|p| p.as_number()),
            Some(40.0)
        );
    }

    #[test]
    fn failed_samp_entry_keeps_later_pairs_aligned() {
        // Entry 0 uses an unknown compression scheme and fails to decode;
        // entry 1 is fine. The second descriptor must still pair with the
        // second image, and the first descriptor is dropped with its entry.
        let mut samp = samp_entry("$brush-bad", 2, 2, 7, &[0; 4]);
        samp.extend(samp_entry("$brush-good", 2, 2, 0, &[9, 9, 9, 9]));
        let desc = dt::top_level(
            "Dscr",
            &[(
                "Brsh",
                dt::list(&[sampled_desc("First"), sampled_desc("Second")]),
            )],
        );
        let data = sectioned_file(1, &[section(b"samp", &samp), section(b"desc", &desc)]);

        let out = AbrParser::parse(&data, &ParseOptions::default()).unwrap();
        assert_eq!(out.brushes.len(), 1);
        assert_eq!(out.brushes[0].name, "Second");
        assert_eq!(out.brushes[0].textures[0].pixels, vec![9, 9, 9, 9]);
        // One diagnostic for the failed entry, one for the descriptor it
        // leaves without an image.
        assert_eq!(out.diagnostics.len(), 2);
    }

    #[test]
    fn sectioned_file_without_desc_keeps_parameterless_images() {
        let samp = samp_entry("$brush-a", 2, 2, 0, &[1, 2, 3, 4]);
        let data = sectioned_file(1, &[section(b"samp", &samp)]);

        let out = AbrParser::parse(&data, &ParseOptions::default()).unwrap();
        assert_eq!(out.brushes.len(), 1);
        assert!(out.brushes[0].parameters.is_empty());
        assert_eq!(out.brushes[0].textures[0].pixels, vec![1, 2, 3, 4]);
    }

    #[test]
    fn rle_tip_with_alpha_plane_becomes_gray_alpha() {
        let gray: Vec<u8> = vec![60; 16];
        let alpha: Vec<u8> = vec![255; 16];
        let mut pixels = encode_rle_plane(&gray, 4, 4);
        pixels.extend(encode_rle_plane(&alpha, 4, 4));
        let samp = samp_entry("$brush-b", 4, 4, 1, &pixels);
        let data = sectioned_file(1, &[section(b"samp", &samp)]);

        let out = AbrParser::parse(&data, &ParseOptions::default()).unwrap();
        let frame = &out.brushes[0].textures[0];
        assert_eq!(frame.layout, ChannelLayout::GrayAlpha);
        assert_eq!(frame.pixel(0, 0), Some(&[60, 255][..]));
    }

    #[test]
    fn unknown_subversion_fails_entries_not_file() {
        let samp = samp_entry("$brush-c", 2, 2, 0, &[0; 4]);
        let data = sectioned_file(9, &[section(b"samp", &samp)]);

        let out = AbrParser::parse(&data, &ParseOptions::default()).unwrap();
        assert!(out.brushes.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.diagnostics[0].reason.contains("sub-version"));
    }

    #[test]
    fn unknown_major_version_is_unrecognized() {
        let data = 42u16.to_be_bytes().to_vec();
        assert!(matches!(
            AbrParser::parse(&data, &ParseOptions::default()),
            Err(ParseError::UnrecognizedFormat)
        ));
    }
}
