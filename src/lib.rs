//! Animated PNG and animated WebP decoding into fully composited frames with
//! per-frame durations, plus a looping time→frame lookup for renderers.
//!
//! ```rust,no_run
//! use animdecode::{AnimatedImage, SoftwareGraphics};
//!
//! let graphics = SoftwareGraphics::new();
//! let mut image = AnimatedImage::new(graphics.clone());
//! if image.load("idle.webp") {
//!     if let Some(texture) = image.texture_for_time(250) {
//!         let pixels = graphics.texture_pixels(*texture);
//!         println!("{:?}", pixels.map(|p| p.dimensions()));
//!     }
//! }
//! ```

mod animated;
pub mod decoder;
pub mod graphics;
pub mod timeline;

pub use animated::{AnimatedImage, AnimationDecoder, AnimationFormat, Apng, ApngDecoder, AutoDetect, Webp, WebpDecoder};
pub use decoder::{AnimationInfo, DecodeResult, DecodedFrame, DecoderOptions, FrameView};
pub use graphics::{Graphics, SoftwareGraphics, TextureAllocator, TextureArena, TextureId, TextureKey};
pub use timeline::{CompositedFrame, Timeline};
