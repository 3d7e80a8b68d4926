//! Host-facing animation decoders.
//!
//! An [`AnimationDecoder`] loads a file, uploads every composited frame as a
//! texture through the host's [`Graphics`] context, and answers "which texture
//! is visible at time t". The format is picked by the `F` parameter; see
//! [`ApngDecoder`], [`WebpDecoder`] and [`AnimatedImage`].

use crate::decoder::{apng, chunks::PNG_SIGNATURE, still, webp, AnimationInfo, DecoderOptions, FrameView};
use crate::graphics::{Graphics, TextureArena, TextureKey};
use crate::timeline::Timeline;
use anyhow::Result;
use std::marker::PhantomData;
use std::path::Path;
use std::time::Instant;

/// A container format the decoder can turn into frames
pub trait AnimationFormat {
    const NAME: &'static str;

    /// Decode `data`, calling `on_frame` for each displayed frame in order
    fn decode(data: &[u8], options: &DecoderOptions, on_frame: &mut dyn FnMut(FrameView<'_>)) -> Result<AnimationInfo>;
}

/// Animated PNG, falling back to a still image when the file has no animation
#[derive(Debug)]
pub struct Apng;

/// Animated or still WebP
#[derive(Debug)]
pub struct Webp;

/// Picks APNG or WebP from the file signature, with still-image fallback
#[derive(Debug)]
pub struct AutoDetect;

impl AnimationFormat for Apng {
    const NAME: &'static str = "APNG";

    fn decode(data: &[u8], options: &DecoderOptions, on_frame: &mut dyn FnMut(FrameView<'_>)) -> Result<AnimationInfo> {
        match apng::decode_apng(data, options, &mut *on_frame) {
            Ok(info) => Ok(info),
            Err(e) if options.static_fallback => {
                log::info!("Not an APNG ({:#}), loading as still image", e);
                still::decode_still(data, options, on_frame)
            }
            Err(e) => Err(e),
        }
    }
}

impl AnimationFormat for Webp {
    const NAME: &'static str = "WebP";

    fn decode(data: &[u8], options: &DecoderOptions, on_frame: &mut dyn FnMut(FrameView<'_>)) -> Result<AnimationInfo> {
        webp::decode_webp(data, options, on_frame)
    }
}

impl AnimationFormat for AutoDetect {
    const NAME: &'static str = "image";

    fn decode(data: &[u8], options: &DecoderOptions, on_frame: &mut dyn FnMut(FrameView<'_>)) -> Result<AnimationInfo> {
        if data.starts_with(&PNG_SIGNATURE) {
            Apng::decode(data, options, on_frame)
        } else if webp::is_webp(data) {
            Webp::decode(data, options, on_frame)
        } else if options.static_fallback {
            still::decode_still(data, options, on_frame)
        } else {
            anyhow::bail!("Unrecognized image signature")
        }
    }
}

/// Decoder for animated PNG files
pub type ApngDecoder<G> = AnimationDecoder<G, Apng>;
/// Decoder for animated WebP files
pub type WebpDecoder<G> = AnimationDecoder<G, Webp>;
/// Decoder that accepts either format
pub type AnimatedImage<G> = AnimationDecoder<G, AutoDetect>;

/// Decoded animation frames, owned as textures of the host's graphics context.
///
/// Not safe for concurrent use; a reload frees the previous frames first.
///
/// ## Example
///
/// ```rust,no_run
/// use animdecode::{ApngDecoder, SoftwareGraphics};
///
/// let mut decoder = ApngDecoder::new(SoftwareGraphics::new());
/// if decoder.load("avatar.png") {
///     let texture = decoder.texture_for_time(1500);
///     println!("{}x{}, animated: {}, {:?}", decoder.width(), decoder.height(), decoder.is_animated(), texture);
/// }
/// ```
pub struct AnimationDecoder<G: Graphics, F: AnimationFormat> {
    graphics: G,
    options: DecoderOptions,
    textures: TextureArena<G::Texture>,
    timeline: Timeline<TextureKey>,
    info: AnimationInfo,
    format: PhantomData<F>,
}

impl<G: Graphics, F: AnimationFormat> AnimationDecoder<G, F> {
    pub fn new(graphics: G) -> Self {
        Self::with_options(graphics, DecoderOptions::default())
    }

    pub fn with_options(graphics: G, options: DecoderOptions) -> Self {
        Self {
            graphics,
            options,
            textures: TextureArena::new(),
            timeline: Timeline::new(),
            info: AnimationInfo::default(),
            format: PhantomData,
        }
    }

    /// Read and decode a file. Returns false if nothing displayable was decoded.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> bool {
        log::info!("Opening {} file: {:?}", F::NAME, path.as_ref());
        match std::fs::read(path.as_ref()) {
            Ok(data) => self.load_bytes(&data),
            Err(e) => {
                log::warn!("Failed to read {:?}: {}", path.as_ref(), e);
                self.free();
                false
            }
        }
    }

    /// Decode an in-memory file, replacing anything loaded before
    pub fn load_bytes(&mut self, data: &[u8]) -> bool {
        self.free();
        let start = Instant::now();

        let Self {
            graphics,
            options,
            textures,
            timeline,
            ..
        } = self;

        let result = graphics.scoped(|allocator| {
            F::decode(data, options, &mut |frame: FrameView<'_>| {
                match allocator.create_texture(frame.width, frame.height, frame.rgba_data) {
                    Some(texture) => {
                        let key = textures.insert(texture);
                        match frame.end_ms {
                            Some(end_ms) => timeline.push_until(key, end_ms),
                            None => timeline.push(key, frame.duration_ms),
                        }
                    }
                    None => log::warn!("Failed to create texture for frame {}, dropping it", frame.index),
                }
            })
        });

        match result {
            Ok(info) if !self.timeline.is_empty() => {
                log::info!(
                    "Loaded {} frames ({}x{}, {}ms per loop) in {:?}",
                    self.timeline.len(),
                    info.width,
                    info.height,
                    self.timeline.total_duration_ms(),
                    start.elapsed()
                );
                self.timeline.set_loop_count(info.loop_count);
                self.info = info;
                true
            }
            Ok(_) => {
                log::warn!("{} decode produced no frames", F::NAME);
                self.free();
                false
            }
            Err(e) => {
                log::warn!("Failed to decode {}: {:#}", F::NAME, e);
                self.free();
                false
            }
        }
    }

    /// Destroy every texture and reset to the empty state
    pub fn free(&mut self) {
        if !self.textures.is_empty() {
            let textures = &mut self.textures;
            self.graphics.scoped(|allocator| textures.release_all(allocator));
        }
        self.timeline.clear();
        self.info = AnimationInfo::default();
    }

    /// Texture visible `time_ms` after playback started, looping forever
    pub fn texture_for_time(&self, time_ms: u64) -> Option<&G::Texture> {
        self.timeline
            .texture_for_time(time_ms)
            .and_then(|key| self.textures.get(*key))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.info.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// True iff more than one frame is stored
    #[inline]
    pub fn is_animated(&self) -> bool {
        self.timeline.is_animated()
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.timeline.len()
    }

    #[inline]
    pub fn total_duration_ms(&self) -> u64 {
        self.timeline.total_duration_ms()
    }

    /// Plays requested by the file, 0 meaning forever
    #[inline]
    pub fn loop_count(&self) -> u32 {
        self.timeline.loop_count()
    }

    pub fn info(&self) -> &AnimationInfo {
        &self.info
    }

    pub fn timeline(&self) -> &Timeline<TextureKey> {
        &self.timeline
    }
}

impl<G: Graphics, F: AnimationFormat> Drop for AnimationDecoder<G, F> {
    fn drop(&mut self) {
        self.free();
    }
}
