//! Embedded raster payload decoding
//!
//! Turns the pixel payloads found inside brush containers into normalized
//! [`TextureFrame`]s: raw interleaved samples, PackBits-style RLE (a scanline
//! byte-count table followed by per-row compressed data, one plane per
//! channel), and standard compressed image blobs handled by the `image`
//! crate. Source bit depths are normalized to 8-bit; 16-bit samples keep
//! their big-endian MSB.
//!
//! PackBits reference: Apple Technical Note TN1023.

use crate::error::ParseError;
use crate::reader::{ByteReader, Endian};
use crate::types::{ChannelLayout, TextureFrame};

/// How a pixel payload is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelEncoding {
    /// Interleaved samples, no compression.
    Raw,
    /// Per-scanline PackBits RLE, planar (one scanline table + row data per
    /// channel plane; planes are interleaved after decode).
    PackBits,
    /// A standard image container (PNG and friends); declared dimensions and
    /// layout come from the container itself.
    Png,
}

/// Decode one pixel payload into a frame.
pub fn decode(
    payload: &[u8],
    encoding: PixelEncoding,
    width: u32,
    height: u32,
    layout: ChannelLayout,
    depth: u16,
) -> Result<TextureFrame, ParseError> {
    match encoding {
        PixelEncoding::Png => decode_standard_image(payload),
        PixelEncoding::Raw => {
            let pixels = decode_raw(payload, width, height, layout.channels(), depth)?;
            TextureFrame::new(width, height, layout, pixels)
        }
        PixelEncoding::PackBits => {
            let mut reader = ByteReader::new(payload);
            let mut planes = Vec::with_capacity(layout.channels() as usize);
            for _ in 0..layout.channels() {
                planes.push(decode_rle_plane(&mut reader, width, height, depth)?);
            }
            TextureFrame::new(width, height, layout, interleave(&planes))
        }
    }
}

/// Decode an embedded standard image blob (the generic image-codec
/// collaborator). The container's own dimensions and channel layout win.
pub fn decode_standard_image(bytes: &[u8]) -> Result<TextureFrame, ParseError> {
    use image::DynamicImage;

    let img = image::load_from_memory(bytes)
        .map_err(|e| ParseError::ImageDecode(format!("embedded image: {}", e)))?;
    let (width, height) = (img.width(), img.height());

    let (layout, pixels) = match img {
        DynamicImage::ImageLuma8(buf) => (ChannelLayout::Gray, buf.into_raw()),
        DynamicImage::ImageLumaA8(buf) => (ChannelLayout::GrayAlpha, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (ChannelLayout::Rgb, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (ChannelLayout::Rgba, buf.into_raw()),
        // Higher bit depths and exotic layouts normalize to 8-bit RGBA.
        other => (ChannelLayout::Rgba, other.to_rgba8().into_raw()),
    };

    TextureFrame::new(width, height, layout, pixels)
}

/// Read the declared dimensions of an embedded standard image blob from its
/// header, without decoding any pixel data. Callers check these against
/// their dimension limit before committing to a full decode.
pub fn standard_image_dimensions(bytes: &[u8]) -> Result<(u32, u32), ParseError> {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ParseError::ImageDecode(format!("embedded image: {}", e)))?
        .into_dimensions()
        .map_err(|e| ParseError::ImageDecode(format!("embedded image: {}", e)))
}

/// Decode raw interleaved samples, downsampling 16-bit data to 8-bit.
fn decode_raw(
    payload: &[u8],
    width: u32,
    height: u32,
    channels: u32,
    depth: u16,
) -> Result<Vec<u8>, ParseError> {
    let elem = element_size(depth)?;
    let samples = (width as u64)
        .checked_mul(height as u64)
        .and_then(|n| n.checked_mul(channels as u64))
        .ok_or_else(|| ParseError::ImageDecode("sample count overflow".into()))?;
    let byte_len = samples as usize * elem;

    let data = payload
        .get(..byte_len)
        .ok_or_else(|| ParseError::ImageDecode(format!(
            "raw payload is {} bytes, expected {}",
            payload.len(),
            byte_len
        )))?;

    if elem == 1 {
        Ok(data.to_vec())
    } else {
        // Big-endian samples: keep the most significant byte.
        Ok(data.chunks_exact(elem).map(|s| s[0]).collect())
    }
}

/// Decode one channel plane of scanline-RLE data: a table of per-row
/// compressed byte counts (u16 BE each), then the rows.
pub fn decode_rle_plane(
    reader: &mut ByteReader<'_>,
    width: u32,
    height: u32,
    depth: u16,
) -> Result<Vec<u8>, ParseError> {
    let elem = element_size(depth)?;
    let row_len = width as usize * elem;

    let mut counts = Vec::with_capacity(height as usize);
    for _ in 0..height {
        counts.push(reader.read_u16(Endian::Big)?);
    }

    let mut plane = Vec::with_capacity(row_len * height as usize);
    for &count in &counts {
        let row = reader.read_bytes(count as usize)?;
        plane.extend(packbits_decode(row, row_len)?);
    }

    if elem == 1 {
        Ok(plane)
    } else {
        Ok(plane.chunks_exact(elem).map(|s| s[0]).collect())
    }
}

/// Decode a PackBits stream into exactly `expected_len` bytes.
///
/// Control byte rules:
/// - N >= 0: next N+1 bytes are literal
/// - -127 <= N < 0: repeat next byte 1-N times
/// - N = -128: no-op padding
pub fn packbits_decode(input: &[u8], expected_len: usize) -> Result<Vec<u8>, ParseError> {
    let mut output = Vec::with_capacity(expected_len);
    let mut reader = ByteReader::new(input);

    while output.len() < expected_len && reader.remaining() > 0 {
        let n = reader.read_i8().map_err(rle_truncated)?;

        if n >= 0 {
            let count = n as usize + 1;
            output.extend_from_slice(reader.read_bytes(count).map_err(rle_truncated)?);
        } else if n > -128 {
            let count = (1 - n as i16) as usize;
            let byte = reader.read_u8().map_err(rle_truncated)?;
            output.extend(std::iter::repeat(byte).take(count));
        }
        // n == -128 is a no-op
    }

    if output.len() != expected_len {
        return Err(ParseError::ImageDecode(format!(
            "RLE output is {} bytes, expected {}",
            output.len(),
            expected_len
        )));
    }

    Ok(output)
}

/// Encode data with PackBits. Used by tests and benches to validate the
/// decoder against known-good round trips.
pub fn packbits_encode(input: &[u8]) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }

    let mut output = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let mut run_len = 1;
        while i + run_len < input.len() && input[i + run_len] == input[i] && run_len < 128 {
            run_len += 1;
        }

        if run_len >= 3 {
            output.push((1_i16 - run_len as i16) as u8);
            output.push(input[i]);
            i += run_len;
        } else {
            let start = i;
            while i < input.len() && i - start < 128 {
                if i + 2 < input.len()
                    && input[i] == input[i + 1]
                    && input[i] == input[i + 2]
                    && i > start
                {
                    break;
                }
                i += 1;
            }
            output.push((i - start - 1) as u8);
            output.extend_from_slice(&input[start..i]);
        }
    }

    output
}

/// Encode one plane in the scanline-RLE layout the decoder expects.
pub fn encode_rle_plane(plane: &[u8], width: u32, height: u32) -> Vec<u8> {
    let row_len = width as usize;
    let mut rows = Vec::with_capacity(height as usize);
    for row in plane.chunks(row_len) {
        rows.push(packbits_encode(row));
    }

    let mut out = Vec::new();
    for row in &rows {
        out.extend_from_slice(&(row.len() as u16).to_be_bytes());
    }
    for row in &rows {
        out.extend_from_slice(row);
    }
    out
}

fn element_size(depth: u16) -> Result<usize, ParseError> {
    match depth {
        8 => Ok(1),
        16 => Ok(2),
        other => Err(ParseError::ImageDecode(format!(
            "unsupported bit depth {}",
            other
        ))),
    }
}

fn rle_truncated(_: ParseError) -> ParseError {
    ParseError::ImageDecode("truncated RLE run".into())
}

fn interleave(planes: &[Vec<u8>]) -> Vec<u8> {
    if planes.len() == 1 {
        return planes[0].clone();
    }
    let len = planes[0].len();
    let mut out = Vec::with_capacity(len * planes.len());
    for i in 0..len {
        for plane in planes {
            out.push(plane[i]);
        }
    }
    out
}
