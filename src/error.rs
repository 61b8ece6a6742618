//! Error types for the `framesnap` crate.
//!
//! [`FramesnapError`] is returned by every fallible operation. Setup errors
//! (configuration, missing or unreadable input, output directory creation)
//! abort an extraction before any worker starts. Per-frame errors (decode,
//! encode, write) never abort a run; the coordinator records them as
//! [`FrameFailure`](crate::FrameFailure) entries instead.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use rayon::ThreadPoolBuildError;
use thiserror::Error;

/// The unified error type for all `framesnap` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramesnapError {
    /// The worker count is zero or negative.
    #[error("Invalid configuration: thread count must be a positive integer (got {threads})")]
    InvalidThreadCount {
        /// The rejected value as the caller supplied it.
        threads: i64,
    },

    /// The JPEG quality is outside `1..=100`.
    #[error("Invalid configuration: JPEG quality must be between 1 and 100 (got {quality})")]
    InvalidQuality {
        /// The rejected quality value.
        quality: u8,
    },

    /// The input path does not point to an existing file.
    #[error("Video file not found: {path}")]
    FileNotFound {
        /// Path that was passed to [`VideoSource::open`](crate::VideoSource::open).
        path: PathBuf,
    },

    /// The input exists but could not be opened as a media container.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`VideoSource::open`](crate::VideoSource::open).
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The requested frame number exceeds the total frame count.
    #[error("Frame {frame_number} is out of range (video has {total_frames} frames)")]
    FrameOutOfRange {
        /// The frame number that was requested.
        frame_number: u64,
        /// The total number of frames in the video.
        total_frames: u64,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// The output directory could not be created.
    #[error("Failed to create output directory {path}: {source}")]
    OutputDirectory {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: IoError,
    },

    /// An I/O error occurred while writing a frame.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while encoding a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The worker pool could not be built.
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),
}

impl FramesnapError {
    /// Returns `true` for errors caused by invalid user configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            FramesnapError::InvalidThreadCount { .. } | FramesnapError::InvalidQuality { .. }
        )
    }
}

impl From<FfmpegError> for FramesnapError {
    fn from(error: FfmpegError) -> Self {
        FramesnapError::FfmpegError(error.to_string())
    }
}

impl From<ThreadPoolBuildError> for FramesnapError {
    fn from(error: ThreadPoolBuildError) -> Self {
        FramesnapError::ThreadPool(error.to_string())
    }
}
