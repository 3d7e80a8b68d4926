//! Animated WebP adapter.
//!
//! Demuxing and per-frame compositing are done by `image-webp`; this module only
//! turns its canvas snapshots into RGBA frames with per-frame durations.

use super::rgb_conversion::to_rgba8;
use super::{AnimationInfo, DecodeResult, DecodedFrame, DecoderOptions, FrameView};
use anyhow::{Context, Result};
use image_webp::{LoopCount, WebPDecoder};
use std::io::Cursor;
use std::time::Instant;

/// True if `data` starts with a RIFF/WEBP container header
pub fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

/// Decode every frame of a WebP file in display order.
///
/// A non-animated WebP yields a single frame lasting
/// `options.static_frame_duration_ms`.
pub fn decode_webp<F>(data: &[u8], options: &DecoderOptions, mut on_frame: F) -> Result<AnimationInfo>
where
    F: FnMut(FrameView<'_>),
{
    let start = Instant::now();
    let mut decoder = WebPDecoder::new(Cursor::new(data)).context("Failed to open WebP container")?;

    let (width, height) = decoder.dimensions();
    let has_alpha = decoder.has_alpha();
    let loop_count = match decoder.loop_count() {
        LoopCount::Forever => 0,
        LoopCount::Times(n) => u32::from(n.get()),
    };
    let info = AnimationInfo {
        width,
        height,
        frame_count: decoder.num_frames().max(1),
        loop_count,
    };

    log::info!(
        "Decoding WebP: {}x{}, frames: {}, loops: {}, alpha: {}",
        width,
        height,
        info.frame_count,
        loop_count,
        has_alpha
    );

    let buf_size = decoder
        .output_buffer_size()
        .with_context(|| format!("WebP canvas {}x{} is too large", width, height))?;
    let mut buf = vec![0u8; buf_size];

    if !decoder.is_animated() {
        decoder.read_image(&mut buf).context("WebP image decode failed")?;
        let rgba = to_rgba8(&buf, has_alpha, width, height);
        on_frame(FrameView {
            index: 0,
            rgba_data: &rgba,
            width,
            height,
            duration_ms: options.static_frame_duration_ms,
            end_ms: None,
        });
        return Ok(info);
    }

    // End timestamp of the previous frame, in ms since the start of the loop
    let mut prev_timestamp: u64 = 0;
    for index in 0..decoder.num_frames() as usize {
        let duration_ms = match decoder.read_frame(&mut buf) {
            Ok(duration) => duration,
            Err(e) => {
                log::warn!("Stopping WebP decode at frame {}: {}", index, e);
                break;
            }
        };
        let timestamp = prev_timestamp + u64::from(duration_ms);
        log::debug!("WebP frame {} ends at {}ms ({}ms)", index, timestamp, duration_ms);

        let rgba = to_rgba8(&buf, has_alpha, width, height);
        on_frame(FrameView {
            index,
            rgba_data: &rgba,
            width,
            height,
            duration_ms,
            end_ms: Some(timestamp),
        });
        prev_timestamp = timestamp;
    }

    log::info!(
        "Decoded WebP animation ({}ms per loop) in {:?}",
        prev_timestamp,
        start.elapsed()
    );
    Ok(info)
}

/// Decode a WebP into owned frames
pub fn decode_webp_frames(data: &[u8], options: &DecoderOptions) -> Result<DecodeResult> {
    let mut frames = Vec::new();
    let info = decode_webp(data, options, |view| frames.push(DecodedFrame::from(view)))?;
    Ok(DecodeResult { frames, info })
}
