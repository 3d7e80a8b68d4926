//! Time-indexed frame lookup shared by every decoder.

/// One stored frame with the handle the host renders
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositedFrame<T> {
    pub texture: T,
    pub duration_ms: u32,
    /// Time at which this frame stops being visible, measured from the start of a loop
    pub end_ms: u64,
}

/// Ordered, duration-annotated frames of one decode pass.
///
/// Playback always loops indefinitely; `loop_count` is kept for display only.
///
/// ## Example
///
/// ```rust
/// use animdecode::Timeline;
///
/// let mut timeline = Timeline::new();
/// timeline.push("a", 100);
/// timeline.push("b", 200);
///
/// assert_eq!(timeline.total_duration_ms(), 300);
/// assert_eq!(timeline.texture_for_time(50), Some(&"a"));
/// assert_eq!(timeline.texture_for_time(150), Some(&"b"));
/// assert_eq!(timeline.texture_for_time(320), Some(&"a"));
/// ```
#[derive(Clone, Debug)]
pub struct Timeline<T> {
    frames: Vec<CompositedFrame<T>>,
    total_duration_ms: u64,
    loop_count: u32,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            total_duration_ms: 0,
            loop_count: 0,
        }
    }
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame shown for `duration_ms` after the previous one
    pub fn push(&mut self, texture: T, duration_ms: u32) {
        self.total_duration_ms += u64::from(duration_ms);
        self.frames.push(CompositedFrame {
            texture,
            duration_ms,
            end_ms: self.total_duration_ms,
        });
    }

    /// Append a frame visible until `end_ms`. The frame also covers any gap left
    /// since the previous frame's end.
    pub fn push_until(&mut self, texture: T, end_ms: u64) {
        let end_ms = end_ms.max(self.total_duration_ms);
        let duration_ms = u32::try_from(end_ms - self.total_duration_ms).unwrap_or(u32::MAX);
        self.total_duration_ms = end_ms;
        self.frames.push(CompositedFrame {
            texture,
            duration_ms,
            end_ms,
        });
    }

    pub fn set_loop_count(&mut self, loop_count: u32) {
        self.loop_count = loop_count;
    }

    #[inline]
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    #[inline]
    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True iff more than one frame is stored
    #[inline]
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn frames(&self) -> &[CompositedFrame<T>] {
        &self.frames
    }

    /// The frame visible `time_ms` after playback started, looping forever
    pub fn frame_for_time(&self, time_ms: u64) -> Option<&CompositedFrame<T>> {
        match self.frames.as_slice() {
            [] => None,
            [only] => Some(only),
            frames => {
                if self.total_duration_ms == 0 {
                    return frames.last();
                }
                let t = time_ms % self.total_duration_ms;
                let idx = frames.partition_point(|f| f.end_ms <= t);
                frames.get(idx).or_else(|| frames.last())
            }
        }
    }

    /// The texture of [`Timeline::frame_for_time`]
    pub fn texture_for_time(&self, time_ms: u64) -> Option<&T> {
        self.frame_for_time(time_ms).map(|f| &f.texture)
    }

    /// Remove every frame and reset the totals, handing the frames back
    pub fn take_frames(&mut self) -> Vec<CompositedFrame<T>> {
        self.total_duration_ms = 0;
        self.loop_count = 0;
        std::mem::take(&mut self.frames)
    }

    pub fn clear(&mut self) {
        self.take_frames();
    }
}
