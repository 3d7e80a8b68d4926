//! Animated PNG decoding.
//!
//! The file is split into frame records by [`parse_apng`]. Each record is turned
//! back into a standalone PNG by [`ApngStream::frame_stream`] and decoded with the
//! `image` crate, and the results are folded through the [`Compositor`].

use super::chunks::{self, write_chunk, ChunkError, ChunkReader, ACTL, FCTL, FDAT, IDAT, IEND, IHDR, PNG_SIGNATURE};
use super::compositor::{frame_duration_ms, BlendOp, Compositor, DisposeOp, FramePlacement, FrameRect};
use super::{AnimationInfo, DecodeResult, DecodedFrame, DecoderOptions, FrameView};
use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use std::time::Instant;

const IHDR_LEN: usize = 13;
const ACTL_LEN: usize = 8;
const FCTL_LEN: usize = 26;
/// fdAT payloads start with a sequence number
const FDAT_SEQ_LEN: usize = 4;

/// One frame as described by an fcTL chunk, plus its compressed image data
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameControl {
    pub sequence: u32,
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub delay_num: u16,
    pub delay_den: u16,
    pub dispose_op: DisposeOp,
    pub blend_op: BlendOp,
    /// Concatenated zlib stream from the IDAT/fdAT chunks following the fcTL
    pub data: Vec<u8>,
}

impl FrameControl {
    fn from_payload(payload: &[u8]) -> Option<Self> {
        Some(Self {
            sequence: chunks::read_u32(payload, 0)?,
            width: chunks::read_u32(payload, 4)?,
            height: chunks::read_u32(payload, 8)?,
            x_offset: chunks::read_u32(payload, 12)?,
            y_offset: chunks::read_u32(payload, 16)?,
            delay_num: chunks::read_u16(payload, 20)?,
            delay_den: chunks::read_u16(payload, 22)?,
            dispose_op: DisposeOp::from_u8(*payload.get(24)?),
            blend_op: BlendOp::from_u8(*payload.get(25)?),
            data: Vec::new(),
        })
    }

    pub fn placement(&self) -> FramePlacement {
        FramePlacement {
            rect: FrameRect {
                x: self.x_offset,
                y: self.y_offset,
                width: self.width,
                height: self.height,
            },
            dispose: self.dispose_op,
            blend: self.blend_op,
        }
    }

    pub fn duration_ms(&self, options: &DecoderOptions) -> u32 {
        frame_duration_ms(self.delay_num, self.delay_den, options)
    }
}

/// The structural pieces of an animated PNG
#[derive(Clone, Debug)]
pub struct ApngStream {
    /// IHDR payload of the source file
    pub header: [u8; IHDR_LEN],
    pub width: u32,
    pub height: u32,
    /// Frame count declared by acTL
    pub frame_count: u32,
    /// acTL `num_plays`, 0 meaning forever
    pub loop_count: u32,
    /// Every chunk not specific to animation or pixel data, verbatim and in order
    pub passthrough: Vec<u8>,
    /// Sealed frame records in file order
    pub frames: Vec<FrameControl>,
}

/// Split an APNG byte stream into header, passthrough chunks and frame records.
///
/// Fails on a bad signature, a missing or short IHDR, truncated chunks, short
/// acTL/fcTL payloads, or when no acTL chunk is present.
pub fn parse_apng(data: &[u8]) -> Result<ApngStream, ChunkError> {
    let mut reader = ChunkReader::new(data)?;

    let first = reader.next().ok_or(ChunkError::MissingHeader)??;
    if first.tag != IHDR {
        return Err(ChunkError::MissingHeader);
    }
    let ihdr = first.require_len(IHDR_LEN)?;
    let mut header = [0u8; IHDR_LEN];
    header.copy_from_slice(&ihdr[..IHDR_LEN]);

    let mut stream = ApngStream {
        header,
        width: chunks::read_u32(&header, 0).unwrap_or(0),
        height: chunks::read_u32(&header, 4).unwrap_or(0),
        frame_count: 0,
        loop_count: 0,
        passthrough: Vec::new(),
        frames: Vec::new(),
    };

    let mut is_apng = false;
    let mut current: Option<FrameControl> = None;

    for chunk in reader {
        let chunk = chunk?;
        log::debug!("Chunk: {}, Len: {}", chunk.tag_str(), chunk.payload.len());

        match chunk.tag {
            ACTL => {
                let payload = chunk.require_len(ACTL_LEN)?;
                is_apng = true;
                stream.frame_count = chunks::read_u32(payload, 0).unwrap_or(0);
                stream.loop_count = chunks::read_u32(payload, 4).unwrap_or(0);
                log::info!(
                    "Found acTL: {} frames, {} plays",
                    stream.frame_count,
                    stream.loop_count
                );
            }
            FCTL => {
                let payload = chunk.require_len(FCTL_LEN)?;
                let control = FrameControl::from_payload(payload).ok_or(ChunkError::ShortPayload {
                    tag: chunk.tag_str().into_owned(),
                    len: payload.len(),
                    expected: FCTL_LEN,
                })?;
                log::debug!(
                    "fcTL frame: {}x{}, pos({},{}), delay({}/{}), seq {}",
                    control.width,
                    control.height,
                    control.x_offset,
                    control.y_offset,
                    control.delay_num,
                    control.delay_den,
                    control.sequence
                );

                match current.take() {
                    Some(open) if !open.data.is_empty() => stream.frames.push(open),
                    // An fcTL without data is replaced by the next one
                    _ => {}
                }
                current = Some(control);
            }
            FDAT => {
                if !is_apng {
                    continue;
                }
                if let (Some(frame), Some(data)) = (current.as_mut(), chunk.payload.get(FDAT_SEQ_LEN..)) {
                    frame.data.extend_from_slice(data);
                }
            }
            IDAT => match current.as_mut() {
                Some(frame) => frame.data.extend_from_slice(chunk.payload),
                None => log::debug!("IDAT before first fcTL is not part of the animation"),
            },
            IEND => break,
            IHDR => log::debug!("Ignoring repeated IHDR at offset {}", chunk.offset),
            _ => stream.passthrough.extend_from_slice(chunk.raw),
        }
    }

    if let Some(open) = current {
        if !open.data.is_empty() {
            stream.frames.push(open);
        }
    }

    if !is_apng {
        return Err(ChunkError::NotAnimated);
    }

    if stream.frames.len() != stream.frame_count as usize {
        log::warn!(
            "acTL declares {} frames but {} frame records were found",
            stream.frame_count,
            stream.frames.len()
        );
    }

    Ok(stream)
}

impl ApngStream {
    /// Rebuild a standalone single-image PNG for one frame: signature, IHDR with
    /// the frame's size, passthrough chunks, one IDAT holding the frame data, IEND.
    pub fn frame_stream(&self, frame: &FrameControl) -> Result<Vec<u8>, ChunkError> {
        let mut header = self.header;
        header[0..4].copy_from_slice(&frame.width.to_be_bytes());
        header[4..8].copy_from_slice(&frame.height.to_be_bytes());

        let mut png = Vec::with_capacity(PNG_SIGNATURE.len() + self.passthrough.len() + frame.data.len() + 64);
        png.extend_from_slice(&PNG_SIGNATURE);
        write_chunk(&mut png, IHDR, &header)?;
        png.extend_from_slice(&self.passthrough);
        write_chunk(&mut png, IDAT, &frame.data)?;
        write_chunk(&mut png, IEND, &[])?;
        Ok(png)
    }

    fn info(&self) -> AnimationInfo {
        AnimationInfo {
            width: self.width,
            height: self.height,
            frame_count: self.frame_count,
            loop_count: self.loop_count,
        }
    }
}

/// Decode a reconstructed frame PNG to RGBA8, checking it has the frame's size
pub fn decode_frame_pixels(png: &[u8], frame: &FrameControl) -> Result<RgbaImage> {
    let image = image::load_from_memory_with_format(png, ImageFormat::Png)
        .context("PNG decode of reconstructed frame failed")?
        .into_rgba8();

    if image.dimensions() != (frame.width, frame.height) {
        anyhow::bail!(
            "Decoded frame is {}x{}, expected {}x{}",
            image.width(),
            image.height(),
            frame.width,
            frame.height
        );
    }
    Ok(image)
}

/// Decode and composite every frame of an APNG, handing each displayed canvas to
/// `on_frame` in display order. Frames that fail to decode are skipped.
pub fn decode_apng<F>(data: &[u8], options: &DecoderOptions, mut on_frame: F) -> Result<AnimationInfo>
where
    F: FnMut(FrameView<'_>),
{
    let start = Instant::now();
    let stream = parse_apng(data).context("Not a decodable APNG")?;

    log::info!(
        "APNG canvas {}x{}, {} frame records, {} passthrough bytes",
        stream.width,
        stream.height,
        stream.frames.len(),
        stream.passthrough.len()
    );

    let mut compositor = Compositor::new(stream.width, stream.height)
        .with_context(|| format!("Canvas {}x{} is too large", stream.width, stream.height))?;

    let mut kept = 0usize;
    for (index, frame) in stream.frames.iter().enumerate() {
        let pixels = match stream
            .frame_stream(frame)
            .map_err(anyhow::Error::from)
            .and_then(|png| decode_frame_pixels(&png, frame))
        {
            Ok(pixels) => pixels,
            Err(e) => {
                log::warn!("Skipping APNG frame {} (seq {}): {:#}", index, frame.sequence, e);
                continue;
            }
        };

        let duration_ms = frame.duration_ms(options);
        log::debug!("Compositing frame {} ({}ms)", index, duration_ms);

        compositor.compose(&frame.placement(), pixels.as_raw(), |canvas| {
            on_frame(FrameView {
                index,
                rgba_data: canvas.pixels(),
                width: canvas.width(),
                height: canvas.height(),
                duration_ms,
                end_ms: None,
            });
        });
        kept += 1;
    }

    log::info!(
        "Decoded {} of {} APNG frames in {:?}",
        kept,
        stream.frames.len(),
        start.elapsed()
    );
    Ok(stream.info())
}

/// Decode an APNG into owned frames
pub fn decode_apng_frames(data: &[u8], options: &DecoderOptions) -> Result<DecodeResult> {
    let mut frames = Vec::new();
    let info = decode_apng(data, options, |view| frames.push(DecodedFrame::from(view)))?;
    Ok(DecodeResult { frames, info })
}
