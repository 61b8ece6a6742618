//! Video decoding.
//!
//! [`VideoSource`] owns one FFmpeg demuxer for a file and decodes frames from
//! its best video stream. The [`FrameSource`] trait is the seam the
//! [`Extractor`](crate::Extractor) decodes through, and [`SourceOpener`] is
//! how each worker obtains its own independent handle on the same path.
//!
//! FFmpeg decoder contexts are not safe to share between threads, so
//! handles are never shared: every worker opens its own.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    ops::Range,
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use ffmpeg_sys_next::AV_NOPTS_VALUE;
use image::{DynamicImage, RgbImage};

use crate::{
    conversion,
    error::FramesnapError,
    metadata::{FALLBACK_FRAMES_PER_SECOND, VideoMetadata},
    task::FrameTask,
};

/// Something frames can be decoded from.
pub trait FrameSource {
    /// Metadata of the video stream.
    fn metadata(&self) -> &VideoMetadata;

    /// Decode a single frame by its 0-based index.
    ///
    /// # Errors
    ///
    /// [`FramesnapError::FrameOutOfRange`] for an index past the end, or a
    /// decode error when the stream is corrupt at that position.
    fn decode_frame(&mut self, frame_number: u64) -> Result<DynamicImage, FramesnapError>;

    /// Decode every frame of `task` in increasing order.
    ///
    /// `handler` is called exactly once per index of the task, with either
    /// the decoded image or the error for that index. An `Err` return means
    /// the range could not be started at all and `handler` was never called.
    ///
    /// The default implementation decodes each index independently;
    /// implementations that can read forward cheaply should override it.
    fn for_each_frame<F>(&mut self, task: FrameTask, mut handler: F) -> Result<(), FramesnapError>
    where
        F: FnMut(u64, Result<DynamicImage, FramesnapError>),
    {
        for frame_number in task.range() {
            handler(frame_number, self.decode_frame(frame_number));
        }
        Ok(())
    }
}

/// Opens a fresh [`FrameSource`] for a path.
///
/// Shared by reference between all workers, so it must be [`Sync`]. Any
/// `Fn(&Path) -> Result<S, FramesnapError> + Sync` closure is an opener.
pub trait SourceOpener: Sync {
    /// The source type produced.
    type Source: FrameSource;

    /// Open a new, independent handle on `path`.
    fn open(&self, path: &Path) -> Result<Self::Source, FramesnapError>;
}

/// Opens [`VideoSource`] handles through FFmpeg.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

impl SourceOpener for FfmpegOpener {
    type Source = VideoSource;

    fn open(&self, path: &Path) -> Result<VideoSource, FramesnapError> {
        VideoSource::open(path)
    }
}

impl<S, F> SourceOpener for F
where
    S: FrameSource,
    F: Fn(&Path) -> Result<S, FramesnapError> + Sync,
{
    type Source = S;

    fn open(&self, path: &Path) -> Result<S, FramesnapError> {
        self(path)
    }
}

/// An open video file.
///
/// # Example
///
/// ```no_run
/// use framesnap::{FrameSource, VideoSource};
///
/// let mut source = VideoSource::open("input.mp4")?;
/// println!("{} frames", source.metadata().frame_count);
/// let frame = source.decode_frame(0)?;
/// frame.save("first_frame.jpg")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct VideoSource {
    input_context: Input,
    stream_index: usize,
    time_base: Rational,
    start_pts: i64,
    metadata: VideoMetadata,
    file_path: PathBuf,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("file_path", &self.file_path)
            .field("stream_index", &self.stream_index)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a video file and read the metadata of its best video stream.
    ///
    /// Initializes FFmpeg (idempotent) on first use.
    ///
    /// # Errors
    ///
    /// - [`FramesnapError::FileNotFound`] if `path` is not an existing file.
    /// - [`FramesnapError::FileOpen`] if FFmpeg cannot read the container or
    ///   the video codec.
    /// - [`FramesnapError::NoVideoStream`] if the file has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FramesnapError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        if !path.is_file() {
            return Err(FramesnapError::FileNotFound { path: file_path });
        }

        log::debug!("Opening video file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| FramesnapError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| FramesnapError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let open_error = |reason: String| FramesnapError::FileOpen {
            path: file_path.clone(),
            reason,
        };

        let (stream_index, time_base, start_pts, metadata) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or(FramesnapError::NoVideoStream)?;
            let stream_index = stream.index();
            let time_base = stream.time_base();
            let start_pts = match stream.start_time() {
                AV_NOPTS_VALUE => 0,
                start => start,
            };

            let decoder_context = CodecContext::from_parameters(stream.parameters())
                .map_err(|error| open_error(format!("Failed to read codec parameters: {error}")))?;
            let decoder = decoder_context
                .decoder()
                .video()
                .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

            let width = decoder.width();
            let height = decoder.height();
            if width == 0 || height == 0 {
                return Err(open_error(format!(
                    "video stream reports invalid dimensions {width}x{height}"
                )));
            }

            let frames_per_second = [stream.avg_frame_rate(), stream.rate()]
                .into_iter()
                .filter(|rate| rate.numerator() > 0 && rate.denominator() > 0)
                .map(|rate| rate.numerator() as f64 / rate.denominator() as f64)
                .next()
                .unwrap_or_else(|| {
                    log::warn!(
                        "No frame rate reported for {}, assuming {FALLBACK_FRAMES_PER_SECOND} fps",
                        file_path.display()
                    );
                    FALLBACK_FRAMES_PER_SECOND
                });

            let stream_duration = stream.duration();
            let duration = if stream_duration > 0 && stream_duration != AV_NOPTS_VALUE {
                Duration::from_secs_f64(conversion::pts_to_seconds(stream_duration, time_base))
            } else if input_context.duration() > 0 {
                Duration::from_micros(input_context.duration() as u64)
            } else {
                Duration::ZERO
            };

            let declared_frames = stream.frames();
            let frame_count = if declared_frames > 0 {
                declared_frames as u64
            } else {
                (duration.as_secs_f64() * frames_per_second).round() as u64
            };

            let codec = decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let metadata = VideoMetadata {
                frame_count,
                width,
                height,
                frames_per_second,
                codec,
                duration,
            };
            (stream_index, time_base, start_pts, metadata)
        };

        log::debug!(
            "Video stream {stream_index}: {} frames, {} @ {:.3} fps [{}]",
            metadata.frame_count,
            metadata.resolution(),
            metadata.frames_per_second,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            stream_index,
            time_base,
            start_pts,
            metadata,
            file_path,
        })
    }

    /// Path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Build a fresh decoder and RGB24 converter for the video stream.
    fn range_decoder(&self, start: u64, end: u64) -> Result<RangeDecoder, FramesnapError> {
        let stream = self
            .input_context
            .stream(self.stream_index)
            .ok_or(FramesnapError::NoVideoStream)?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let decoder = decoder_context.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        Ok(RangeDecoder {
            decoder,
            scaler,
            time_base: self.time_base,
            start_pts: self.start_pts,
            frames_per_second: self.metadata.frames_per_second,
            width,
            height,
            cursor: RangeCursor::new(start, end),
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
        })
    }
}

impl FrameSource for VideoSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn decode_frame(&mut self, frame_number: u64) -> Result<DynamicImage, FramesnapError> {
        let total_frames = self.metadata.frame_count;
        if frame_number >= total_frames {
            return Err(FramesnapError::FrameOutOfRange {
                frame_number,
                total_frames,
            });
        }

        let mut result = None;
        self.for_each_frame(FrameTask::new(frame_number, frame_number + 1), |_, image| {
            result = Some(image);
        })?;

        result.unwrap_or_else(|| {
            Err(FramesnapError::VideoDecodeError(format!(
                "Could not locate frame {frame_number} in the video stream"
            )))
        })
    }

    /// Seeks once to the keyframe at or before the task start, then decodes
    /// forward until the end of the task.
    fn for_each_frame<F>(&mut self, task: FrameTask, mut handler: F) -> Result<(), FramesnapError>
    where
        F: FnMut(u64, Result<DynamicImage, FramesnapError>),
    {
        let total_frames = self.metadata.frame_count;
        let decodable_end = task.end().min(total_frames);

        if task.start() < decodable_end {
            let mut range_decoder = self.range_decoder(task.start(), decodable_end)?;

            // Always seek: a reused handle may sit anywhere in the stream.
            let target = conversion::frame_number_to_seek_timestamp(
                task.start(),
                self.metadata.frames_per_second,
                self.start_pts,
                self.time_base,
            );
            self.input_context.seek(target, ..target)?;

            let stream_index = self.stream_index;
            let mut finished = false;
            for (stream, packet) in self.input_context.packets() {
                if stream.index() != stream_index {
                    continue;
                }
                if let Err(error) = range_decoder.decoder.send_packet(&packet) {
                    log::debug!("Skipping undecodable packet: {error}");
                    continue;
                }
                if range_decoder.drain(&mut handler) {
                    finished = true;
                    break;
                }
            }

            if !finished {
                match range_decoder.decoder.send_eof() {
                    Ok(()) => {
                        range_decoder.drain(&mut handler);
                    }
                    Err(error) => log::debug!("Decoder flush failed: {error}"),
                }
            }
            range_decoder.finish(&mut handler);
        }

        for frame_number in decodable_end.max(task.start())..task.end() {
            handler(
                frame_number,
                Err(FramesnapError::FrameOutOfRange {
                    frame_number,
                    total_frames,
                }),
            );
        }

        Ok(())
    }
}

/// Index bookkeeping for decoding one contiguous range forward.
///
/// `next` is the lowest index not yet accounted for; every index in
/// `next..end` is accounted for exactly once, either delivered or skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RangeCursor {
    next: u64,
    end: u64,
}

/// Where one decoded frame lands relative to a [`RangeCursor`].
#[derive(Debug, PartialEq, Eq)]
struct Placement {
    /// Indices the stream jumped over before this frame.
    skipped: Range<u64>,
    /// The frame's own index, when it falls inside the range.
    deliver: Option<u64>,
}

impl RangeCursor {
    fn new(start: u64, end: u64) -> Self {
        Self {
            next: start,
            end: end.max(start),
        }
    }

    /// Account for a decoded frame mapped to `frame_number`.
    ///
    /// Returns `None` for pre-roll from the keyframe before the range and for
    /// duplicates of an index already accounted for.
    fn place(&mut self, frame_number: u64) -> Option<Placement> {
        if frame_number < self.next {
            return None;
        }

        let skipped = self.next..frame_number.min(self.end);
        let deliver = (frame_number < self.end).then_some(frame_number);
        self.next = deliver.map_or(self.end, |index| index + 1);
        Some(Placement { skipped, deliver })
    }

    fn is_done(&self) -> bool {
        self.next >= self.end
    }

    /// Indices the stream never produced. Leaves the cursor done.
    fn take_remaining(&mut self) -> Range<u64> {
        let remaining = self.next..self.end;
        self.next = self.end;
        remaining
    }
}

/// Forward decoding state for one contiguous range.
struct RangeDecoder {
    decoder: VideoDecoder,
    scaler: ScalingContext,
    time_base: Rational,
    start_pts: i64,
    frames_per_second: f64,
    width: u32,
    height: u32,
    cursor: RangeCursor,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
}

impl RangeDecoder {
    /// Pull every frame the decoder has ready. Returns `true` once the range
    /// is complete.
    fn drain<F>(&mut self, handler: &mut F) -> bool
    where
        F: FnMut(u64, Result<DynamicImage, FramesnapError>),
    {
        while self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
            if self.deliver(handler) {
                return true;
            }
        }
        self.cursor.is_done()
    }

    fn deliver<F>(&mut self, handler: &mut F) -> bool
    where
        F: FnMut(u64, Result<DynamicImage, FramesnapError>),
    {
        let frame_number = match self.decoded_frame.timestamp().or(self.decoded_frame.pts()) {
            Some(pts) => conversion::pts_to_frame_number(
                pts,
                self.start_pts,
                self.time_base,
                self.frames_per_second,
            ),
            None => self.cursor.next,
        };

        let Some(placement) = self.cursor.place(frame_number) else {
            return false;
        };
        for missing in placement.skipped {
            handler(
                missing,
                Err(FramesnapError::VideoDecodeError(format!(
                    "Frame {missing} was skipped by the decoder"
                ))),
            );
        }
        if let Some(frame_number) = placement.deliver {
            handler(frame_number, self.convert());
        }

        self.cursor.is_done()
    }

    fn convert(&mut self) -> Result<DynamicImage, FramesnapError> {
        self.scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;
        let buffer = conversion::frame_to_rgb_buffer(&self.rgb_frame, self.width, self.height);
        let rgb_image = RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            FramesnapError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })?;
        Ok(DynamicImage::ImageRgb8(rgb_image))
    }

    /// Report every index the stream never produced.
    fn finish<F>(&mut self, handler: &mut F)
    where
        F: FnMut(u64, Result<DynamicImage, FramesnapError>),
    {
        for missing in self.cursor.take_remaining() {
            handler(
                missing,
                Err(FramesnapError::VideoDecodeError(format!(
                    "Stream ended before frame {missing}"
                ))),
            );
        }
    }
}
