//! Video metadata types.
//!
//! [`VideoMetadata`] is read once when a [`VideoSource`](crate::VideoSource)
//! is opened and cached for the lifetime of the handle.

use std::time::Duration;

/// Frame rate assumed when the container does not report one.
pub const FALLBACK_FRAMES_PER_SECOND: f64 = 30.0;

/// Metadata for the video stream of a media file.
///
/// # Example
///
/// ```no_run
/// use framesnap::VideoSource;
///
/// let source = VideoSource::open("input.mp4")?;
/// let metadata = source.metadata();
/// println!("{}x{} @ {:.2} fps", metadata.width, metadata.height, metadata.frames_per_second);
/// # Ok::<(), framesnap::FramesnapError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Total number of frames. Taken from the stream header when the
    /// container declares it, estimated from duration and frame rate
    /// otherwise.
    pub frame_count: u64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (may be approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
    /// Duration of the video stream.
    pub duration: Duration,
}

impl VideoMetadata {
    /// Resolution formatted as `WIDTHxHEIGHT`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}
