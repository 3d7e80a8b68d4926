//! PNG chunk stream primitives.
//!
//! A PNG file is an 8-byte signature followed by chunks laid out as
//! `length(4, BE) | tag(4) | payload(length) | crc(4)`, where the CRC covers
//! `tag + payload`. [`ChunkReader`] walks that layout over an immutable slice,
//! validating every length before slicing, and [`write_chunk`] is the one place
//! chunk framing and CRCs are produced.

use std::borrow::Cow;
use thiserror::Error;

/// The 8-byte PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// 4-byte ASCII chunk type identifier
pub type ChunkTag = [u8; 4];

pub const IHDR: ChunkTag = *b"IHDR";
pub const IDAT: ChunkTag = *b"IDAT";
pub const IEND: ChunkTag = *b"IEND";
pub const ACTL: ChunkTag = *b"acTL";
pub const FCTL: ChunkTag = *b"fcTL";
pub const FDAT: ChunkTag = *b"fdAT";

/// Length + tag + CRC
const CHUNK_OVERHEAD: usize = 12;

/// Structural failures while walking or emitting a chunk stream
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Missing PNG signature")]
    BadSignature,

    #[error("Chunk at offset {offset} is truncated: needs {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("{tag} payload is {len} bytes, expected at least {expected}")]
    ShortPayload {
        tag: String,
        len: usize,
        expected: usize,
    },

    #[error("First chunk is not IHDR")]
    MissingHeader,

    #[error("No acTL chunk found, not an animated PNG")]
    NotAnimated,

    #[error("Chunk payload of {len} bytes does not fit a 32-bit length field")]
    Oversized { len: usize },
}

/// One chunk borrowed from the source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub tag: ChunkTag,
    pub payload: &'a [u8],
    /// The complete chunk bytes, length field through CRC
    pub raw: &'a [u8],
    /// Byte offset of the length field in the source buffer
    pub offset: usize,
}

impl<'a> Chunk<'a> {
    /// Chunk tag as text, for logging
    pub fn tag_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.tag)
    }

    /// Fails unless the payload holds at least `expected` bytes
    pub fn require_len(&self, expected: usize) -> Result<&'a [u8], ChunkError> {
        if self.payload.len() < expected {
            return Err(ChunkError::ShortPayload {
                tag: self.tag_str().into_owned(),
                len: self.payload.len(),
                expected,
            });
        }
        Ok(self.payload)
    }
}

/// Bounds-checked iterator over the chunks following a PNG signature.
///
/// Yields `Err(ChunkError::Truncated)` once and then stops if a chunk claims more
/// bytes than remain. Iteration also stops after an `IEND` chunk. The reader is
/// `Clone`, so a stream can be walked again from any point.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> ChunkReader<'a> {
    /// Verify the signature and position the reader on the first chunk
    pub fn new(data: &'a [u8]) -> Result<Self, ChunkError> {
        if !data.starts_with(&PNG_SIGNATURE) {
            return Err(ChunkError::BadSignature);
        }
        Ok(Self {
            data,
            pos: PNG_SIGNATURE.len(),
            done: false,
        })
    }

    fn truncated(&mut self, needed: usize) -> Option<Result<Chunk<'a>, ChunkError>> {
        self.done = true;
        Some(Err(ChunkError::Truncated {
            offset: self.pos,
            needed,
            available: self.data.len() - self.pos,
        }))
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = Result<Chunk<'a>, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.data.len() {
            return None;
        }

        let data = self.data;
        let rest = &data[self.pos..];
        let Some(length) = read_u32(rest, 0) else {
            return self.truncated(8);
        };
        let Some(tag) = rest.get(4..8) else {
            return self.truncated(8);
        };

        let needed = match (length as usize).checked_add(CHUNK_OVERHEAD) {
            Some(needed) => needed,
            None => return self.truncated(usize::MAX),
        };
        let Some(raw) = rest.get(..needed) else {
            return self.truncated(needed);
        };

        let tag: ChunkTag = [tag[0], tag[1], tag[2], tag[3]];
        let chunk = Chunk {
            tag,
            payload: &raw[8..needed - 4],
            raw,
            offset: self.pos,
        };

        self.pos += needed;
        if tag == IEND {
            self.done = true;
        }
        Some(Ok(chunk))
    }
}

/// Read a big-endian `u32` at `offset`, if the bytes are there
pub fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let b = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Read a big-endian `u16` at `offset`, if the bytes are there
pub fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let b = bytes.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

/// Append one framed chunk (length, tag, payload, CRC over tag + payload) to `out`
pub fn write_chunk(out: &mut Vec<u8>, tag: ChunkTag, payload: &[u8]) -> Result<(), ChunkError> {
    let length = u32::try_from(payload.len()).map_err(|_| ChunkError::Oversized { len: payload.len() })?;

    let mut crc = crc32fast::Hasher::new();
    crc.update(&tag);
    crc.update(payload);

    out.reserve(payload.len() + CHUNK_OVERHEAD);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&tag);
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc.finalize().to_be_bytes());
    Ok(())
}

/// Encode a standalone chunk
pub fn encode_chunk(tag: ChunkTag, payload: &[u8]) -> Result<Vec<u8>, ChunkError> {
    let mut out = Vec::with_capacity(payload.len() + CHUNK_OVERHEAD);
    write_chunk(&mut out, tag, payload)?;
    Ok(out)
}
