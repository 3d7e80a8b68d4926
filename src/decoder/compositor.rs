//! APNG frame compositing.
//!
//! The [`Compositor`] owns the persistent RGBA canvas for one decode pass. Each
//! frame is drawn with its blend op, handed to the caller as the displayed
//! image, and then disposed so the canvas is ready for the next frame.

use super::DecoderOptions;

/// How the canvas is reset after a frame has been displayed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisposeOp {
    /// Leave the canvas as drawn
    #[default]
    None,
    /// Clear the frame's rectangle to fully transparent black
    Background,
    /// Revert the canvas to its state before the frame was drawn
    Previous,
}

impl DisposeOp {
    /// Unknown values are treated as `None`
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => DisposeOp::Background,
            2 => DisposeOp::Previous,
            0 => DisposeOp::None,
            other => {
                log::debug!("Unknown dispose_op {}, treating as NONE", other);
                DisposeOp::None
            }
        }
    }
}

/// How a frame's pixels combine with the canvas
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendOp {
    /// Overwrite destination pixels, alpha included
    #[default]
    Source,
    /// Porter-Duff "over"
    Over,
}

impl BlendOp {
    /// Any non-zero value composites with `Over`
    pub fn from_u8(value: u8) -> Self {
        if value == 0 {
            BlendOp::Source
        } else {
            BlendOp::Over
        }
    }
}

/// Destination rectangle of a frame on the canvas
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Everything the compositor needs to know about one frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FramePlacement {
    pub rect: FrameRect,
    pub dispose: DisposeOp,
    pub blend: BlendOp,
}

/// Full-size RGBA8 pixel buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Fully transparent canvas, or `None` if the size overflows or cannot be allocated
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let len = (width as usize).checked_mul(height as usize)?.checked_mul(4)?;
        let mut pixels = Vec::new();
        if let Err(e) = pixels.try_reserve_exact(len) {
            log::warn!("Cannot allocate {}x{} canvas: {}", width, height, e);
            return None;
        }
        pixels.resize(len, 0);
        Some(Self { width, height, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved RGBA bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The pixel at `(x, y)`, if inside the canvas
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let idx = self.index(x as usize, y as usize)?;
        let p = self.pixels.get(idx..idx + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width as usize || y >= self.height as usize {
            return None;
        }
        Some((y * self.width as usize + x) * 4)
    }

    /// Draw `src` (tightly packed RGBA, `rect.width * rect.height` pixels) at the
    /// rectangle's offset. Pixels falling outside the canvas are skipped.
    pub fn blend(&mut self, rect: FrameRect, src: &[u8], op: BlendOp) {
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        let row_bytes = rect.width as usize * 4;
        let needed = row_bytes.checked_mul(rect.height as usize).unwrap_or(usize::MAX);
        if src.len() < needed {
            log::warn!(
                "Frame data too short for {}x{} rectangle ({} bytes), skipping blend",
                rect.width,
                rect.height,
                src.len()
            );
            return;
        }

        for (row, src_row) in src.chunks_exact(row_bytes).take(rect.height as usize).enumerate() {
            let y = rect.y as usize + row;
            for (col, src_px) in src_row.chunks_exact(4).enumerate() {
                let x = rect.x as usize + col;
                let Some(idx) = self.index(x, y) else {
                    continue;
                };
                let dst = &mut self.pixels[idx..idx + 4];
                let src_px = [src_px[0], src_px[1], src_px[2], src_px[3]];
                let out = match op {
                    BlendOp::Source => src_px,
                    BlendOp::Over => blend_over(src_px, [dst[0], dst[1], dst[2], dst[3]]),
                };
                dst.copy_from_slice(&out);
            }
        }
    }

    /// Reset the (clipped) rectangle to transparent black
    pub fn clear_rect(&mut self, rect: FrameRect) {
        let x_end = (rect.x as usize + rect.width as usize).min(self.width as usize);
        let y_end = (rect.y as usize + rect.height as usize).min(self.height as usize);
        for y in rect.y as usize..y_end {
            for x in rect.x as usize..x_end {
                if let Some(idx) = self.index(x, y) {
                    self.pixels[idx..idx + 4].fill(0);
                }
            }
        }
    }
}

/// Porter-Duff "over" of one straight-alpha pixel onto another
pub fn blend_over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let src_a = f32::from(src[3]) / 255.0;
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    if out_a <= 0.0 {
        return [dst[0], dst[1], dst[2], 0];
    }

    let channel = |s: u8, d: u8| -> u8 {
        let value = (f32::from(s) * src_a + f32::from(d) * dst_a * (1.0 - src_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };

    [
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}

/// Display duration of a frame from its `delay_num / delay_den` fraction of a second
pub fn frame_duration_ms(delay_num: u16, delay_den: u16, options: &DecoderOptions) -> u32 {
    let den = if delay_den == 0 {
        options.default_delay_den
    } else {
        delay_den
    };
    // `default_delay_den` may itself be configured as zero
    let den = f64::from(den.max(1));
    let ms = (f64::from(delay_num) / den * 1000.0).round() as u32;
    if ms == 0 {
        options.zero_delay_duration_ms
    } else {
        ms
    }
}

/// The dispose/blend state machine over one persistent canvas
#[derive(Debug)]
pub struct Compositor {
    canvas: Canvas,
}

impl Compositor {
    /// A compositor over a transparent canvas, or `None` if the canvas size overflows
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Canvas::new(width, height).map(|canvas| Self { canvas })
    }

    /// The canvas a following frame will be drawn onto
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Draw one frame, pass the displayed canvas to `present`, then dispose.
    pub fn compose<R>(
        &mut self,
        placement: &FramePlacement,
        pixels: &[u8],
        present: impl FnOnce(&Canvas) -> R,
    ) -> R {
        let before = match placement.dispose {
            DisposeOp::Previous => Some(self.canvas.clone()),
            _ => None,
        };

        self.canvas.blend(placement.rect, pixels, placement.blend);
        let shown = present(&self.canvas);

        match placement.dispose {
            DisposeOp::None => {}
            DisposeOp::Background => self.canvas.clear_rect(placement.rect),
            DisposeOp::Previous => {
                if let Some(before) = before {
                    self.canvas = before;
                }
            }
        }

        shown
    }
}
