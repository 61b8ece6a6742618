//! # framesnap
//!
//! Dump every frame of a video file to disk as numbered JPEG images, decoding
//! in parallel on a fixed-size worker pool.
//!
//! Decoding goes through FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate; encoding
//! uses the [`image`](https://crates.io/crates/image) crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framesnap::{ExtractOptions, Extractor};
//!
//! let extractor = Extractor::new(ExtractOptions::new().with_threads(4));
//! let result = extractor.extract("input.mp4", "frames")?;
//! assert_eq!(result.total(), result.frames_written + result.frames_failed);
//! # Ok::<(), framesnap::FramesnapError>(())
//! ```
//!
//! Frames land in `frames/frame_0000.jpg`, `frames/frame_0001.jpg`, … with
//! the index padded to at least four digits, or more when the video has more
//! frames than four digits can number.
//!
//! ## How it works
//!
//! 1. One [`VideoSource`] is opened to read [`VideoMetadata`], then closed.
//! 2. `[0, frame_count)` is split into one contiguous [`FrameTask`] per
//!    worker by [`partition`].
//! 3. Each worker opens its own [`VideoSource`] on the same file, seeks once
//!    to its range, decodes forward and writes frames with a [`FrameWriter`].
//! 4. Frames that fail to decode or save are recorded as [`FrameFailure`]s;
//!    they never stop the other frames or workers.
//! 5. A [`ProgressReporter`] polls an atomic counter and feeds a
//!    [`ProgressCallback`].
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
mod conversion;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod metadata;
pub mod progress;
pub mod source;
pub mod task;
pub mod writer;

pub use configuration::{DEFAULT_THREADS, ExtractOptions, thread_count_from_arg};
pub use error::FramesnapError;
pub use extractor::{Extraction, ExtractionResult, Extractor, FrameFailure};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use metadata::VideoMetadata;
pub use progress::{
    DEFAULT_REPORT_INTERVAL, NoOpProgress, ProgressCallback, ProgressCounter, ProgressInfo,
    ProgressReporter,
};
pub use source::{FfmpegOpener, FrameSource, SourceOpener, VideoSource};
pub use task::{FrameTask, partition};
pub use writer::{DEFAULT_JPEG_QUALITY, FrameWriter, frame_file_name, padding_width};
