pub mod apng;
pub mod chunks;
pub mod compositor;
pub mod rgb_conversion;
pub mod still;
pub mod webp;

/// One displayed frame, borrowed from the decoder while it is being uploaded
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    /// Position in the source animation (before any frames were dropped)
    pub index: usize,
    pub rgba_data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub duration_ms: u32,
    /// End timestamp reported by the container, in ms from the start of the loop.
    /// When present, playback keeps this timestamp even if earlier frames are dropped.
    pub end_ms: Option<u64>,
}

/// Owned copy of a displayed frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedFrame {
    pub rgba_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub duration_ms: u32,
}

impl From<FrameView<'_>> for DecodedFrame {
    fn from(view: FrameView<'_>) -> Self {
        Self {
            rgba_data: view.rgba_data.to_vec(),
            width: view.width,
            height: view.height,
            duration_ms: view.duration_ms,
        }
    }
}

/// Metadata about the decoded image
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnimationInfo {
    pub width: u32,
    pub height: u32,
    /// Frame count declared by the container
    pub frame_count: u32,
    /// Number of plays requested by the file, 0 meaning forever. Playback loops regardless.
    pub loop_count: u32,
}

/// Result of decoding a whole animation into memory
#[derive(Clone, Debug)]
pub struct DecodeResult {
    pub frames: Vec<DecodedFrame>,
    pub info: AnimationInfo,
}

impl DecodeResult {
    pub fn total_duration_ms(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.duration_ms)).sum()
    }
}

/// Decoder configuration.
///
/// Create with `DecoderOptions::default()` and adjust the fields that matter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Duration given to a frame whose delay rounds to 0 ms
    pub zero_delay_duration_ms: u32,
    /// Denominator used when an APNG frame declares `delay_den == 0`
    pub default_delay_den: u16,
    /// Duration of the single frame produced for a still image
    pub static_frame_duration_ms: u32,
    /// Decode non-animated input as a one-frame still image instead of failing
    pub static_fallback: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            zero_delay_duration_ms: 100,
            default_delay_den: 100,
            static_frame_duration_ms: 1000,
            static_fallback: true,
        }
    }
}
