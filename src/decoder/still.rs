//! Single-image fallback for files that are not animations.

use super::{AnimationInfo, DecoderOptions, FrameView};
use anyhow::{Context, Result};

/// Decode any still image format the `image` crate understands into one frame
pub fn decode_still<F>(data: &[u8], options: &DecoderOptions, mut on_frame: F) -> Result<AnimationInfo>
where
    F: FnMut(FrameView<'_>),
{
    let image = image::load_from_memory(data)
        .context("Still image decode failed")?
        .into_rgba8();
    let (width, height) = image.dimensions();

    log::info!("Decoded still image {}x{}", width, height);

    on_frame(FrameView {
        index: 0,
        rgba_data: image.as_raw(),
        width,
        height,
        duration_ms: options.static_frame_duration_ms,
        end_ms: None,
    });

    Ok(AnimationInfo {
        width,
        height,
        frame_count: 1,
        loop_count: 0,
    })
}
