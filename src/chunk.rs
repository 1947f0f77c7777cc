//! Generic tagged-chunk (TLV) iteration
//!
//! The container formats share the same skeleton — a tag, a declared length,
//! a payload — but disagree on every framing detail: tag width, length
//! endianness, whether the length covers the header, and entry alignment.
//! [`ChunkWalker`] captures those details in a [`Framing`] rule and hands out
//! chunks whose payload is a bounded slice, so a consumer that under-reads a
//! chunk (unknown sub-fields) cannot desynchronize the walk.

use crate::error::ParseError;
use crate::reader::{ByteReader, Endian};

/// Width of the declared-length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthWidth {
    U32,
    U64,
}

/// Framing rule for one container format.
#[derive(Debug, Clone, Copy)]
pub struct Framing {
    /// Tag bytes preceding the length field (0 for untagged length-prefixed
    /// records, e.g. ABR sample entries).
    pub tag_len: usize,
    pub length_width: LengthWidth,
    pub endian: Endian,
    /// Whether the declared length counts the tag+length header itself.
    pub length_includes_header: bool,
    /// Entry alignment; the walker skips padding up to the next multiple.
    pub align: usize,
}

impl Framing {
    fn header_len(&self) -> usize {
        self.tag_len
            + match self.length_width {
                LengthWidth::U32 => 4,
                LengthWidth::U64 => 8,
            }
    }
}

/// One tag/length/payload triple. The payload borrows from the walked buffer
/// and is only valid for the current parse pass.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub tag: &'a [u8],
    pub payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// Tag as lossy ASCII, for matching and log messages.
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(self.tag).into_owned()
    }

    /// Reader bounded to exactly this chunk's payload.
    pub fn reader(&self) -> ByteReader<'a> {
        ByteReader::new(self.payload)
    }
}

/// Lazy, finite walk over consecutive chunks in a buffer.
pub struct ChunkWalker<'a> {
    reader: ByteReader<'a>,
    framing: Framing,
}

impl<'a> ChunkWalker<'a> {
    pub fn new(data: &'a [u8], framing: Framing) -> Self {
        Self {
            reader: ByteReader::new(data),
            framing,
        }
    }

    fn read_one(&mut self) -> Result<Chunk<'a>, ParseError> {
        let tag = self.reader.read_bytes(self.framing.tag_len)?;

        let declared = match self.framing.length_width {
            LengthWidth::U32 => self.reader.read_u32(self.framing.endian)? as u64,
            LengthWidth::U64 => self.reader.read_u64(self.framing.endian)?,
        };

        let payload_len = if self.framing.length_includes_header {
            declared
                .checked_sub(self.framing.header_len() as u64)
                .ok_or_else(|| {
                    ParseError::CorruptFile(format!(
                        "chunk length {} smaller than its {}-byte header",
                        declared,
                        self.framing.header_len()
                    ))
                })?
        } else {
            declared
        };

        if payload_len > self.reader.remaining() as u64 {
            return Err(ParseError::CorruptFile(format!(
                "chunk declares {} payload bytes but only {} remain",
                payload_len,
                self.reader.remaining()
            )));
        }
        let payload = self.reader.read_bytes(payload_len as usize)?;

        // Consume inter-entry padding; a truncated final pad is tolerated.
        if self.framing.align > 1 {
            let rem = (payload_len as usize) % self.framing.align;
            if rem != 0 {
                let pad = (self.framing.align - rem).min(self.reader.remaining());
                self.reader.skip(pad)?;
            }
        }

        Ok(Chunk { tag, payload })
    }
}

impl<'a> Iterator for ChunkWalker<'a> {
    type Item = Result<Chunk<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.remaining() == 0 {
            return None;
        }
        Some(self.read_one())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAGGED_BE: Framing = Framing {
        tag_len: 4,
        length_width: LengthWidth::U32,
        endian: Endian::Big,
        length_includes_header: false,
        align: 1,
    };

    fn tlv(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(tag);
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn walks_consecutive_chunks() {
        let mut data = tlv(b"AAAA", b"one");
        data.extend(tlv(b"BBBB", b"second"));

        let chunks: Vec<_> = ChunkWalker::new(&data, TAGGED_BE)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].tag, b"AAAA");
        assert_eq!(chunks[0].payload, b"one");
        assert_eq!(chunks[1].tag_str(), "BBBB");
        assert_eq!(chunks[1].payload, b"second");
    }

    #[test]
    fn oversized_length_is_corrupt() {
        let mut data = Vec::new();
        data.extend_from_slice(b"AAAA");
        data.extend_from_slice(&1000u32.to_be_bytes());
        data.extend_from_slice(b"short");

        let mut walker = ChunkWalker::new(&data, TAGGED_BE);
        match walker.next() {
            Some(Err(ParseError::CorruptFile(_))) => {}
            other => panic!("expected CorruptFile, got {:?}", other),
        }
    }

    #[test]
    fn under_reading_a_chunk_does_not_desync() {
        let mut data = tlv(b"AAAA", &[1, 2, 3, 4, 5, 6, 7, 8]);
        data.extend(tlv(b"BBBB", b"x"));

        let mut walker = ChunkWalker::new(&data, TAGGED_BE);
        let first = walker.next().unwrap().unwrap();
        // Consumer reads only 2 of 8 payload bytes...
        let mut r = first.reader();
        r.read_u16(Endian::Big).unwrap();
        // ...and the walker still lands on the next chunk.
        let second = walker.next().unwrap().unwrap();
        assert_eq!(second.tag, b"BBBB");
    }

    #[test]
    fn aligned_untagged_records() {
        // Two length-prefixed records padded to 4 bytes, ABR samp style.
        let framing = Framing {
            tag_len: 0,
            length_width: LengthWidth::U32,
            endian: Endian::Big,
            length_includes_header: false,
            align: 4,
        };
        let mut data = Vec::new();
        data.extend_from_slice(&5u32.to_be_bytes());
        data.extend_from_slice(&[9, 9, 9, 9, 9]);
        data.extend_from_slice(&[0, 0, 0]); // pad to 4
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&[7, 7]);

        let chunks: Vec<_> = ChunkWalker::new(&data, framing)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].payload.len(), 5);
        assert_eq!(chunks[1].payload, &[7, 7]);
    }

    #[test]
    fn inclusive_u64_little_endian_framing() {
        let framing = Framing {
            tag_len: 4,
            length_width: LengthWidth::U64,
            endian: Endian::Little,
            length_includes_header: true,
            align: 1,
        };
        let payload = b"hello";
        let mut data = Vec::new();
        data.extend_from_slice(b"blob");
        data.extend_from_slice(&((12 + payload.len()) as u64).to_le_bytes());
        data.extend_from_slice(payload);

        let chunk = ChunkWalker::new(&data, framing).next().unwrap().unwrap();
        assert_eq!(chunk.payload, payload);

        // A declared length smaller than the header is structural corruption.
        let mut bad = Vec::new();
        bad.extend_from_slice(b"blob");
        bad.extend_from_slice(&4u64.to_le_bytes());
        match ChunkWalker::new(&bad, framing).next() {
            Some(Err(ParseError::CorruptFile(_))) => {}
            other => panic!("expected CorruptFile, got {:?}", other),
        }
    }
}
