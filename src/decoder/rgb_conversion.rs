use std::borrow::Cow;

/// Convert packed RGB8 to interleaved RGBA8 with opaque alpha
///
/// Trailing bytes that do not form a whole pixel are dropped.
pub fn rgb8_to_rgba8(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    rgba
}

/// Return `data` as RGBA8, expanding from RGB8 when the source has no alpha channel
///
/// # Arguments
/// * `data` - Decoder output buffer
/// * `has_alpha` - Whether `data` already holds 4 bytes per pixel
/// * `width` / `height` - Image size, used to validate the buffer length
pub fn to_rgba8(data: &[u8], has_alpha: bool, width: u32, height: u32) -> Cow<'_, [u8]> {
    let pixels = width as usize * height as usize;
    let channels = if has_alpha { 4 } else { 3 };
    if data.len() != pixels * channels {
        log::warn!(
            "Buffer of {} bytes does not match {}x{} with {} channels",
            data.len(),
            width,
            height,
            channels
        );
    }

    if has_alpha {
        Cow::Borrowed(data)
    } else {
        Cow::Owned(rgb8_to_rgba8(data))
    }
}
