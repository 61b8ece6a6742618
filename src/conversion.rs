//! Internal conversion helpers.
//!
//! Pixel-data copying and timestamp arithmetic shared by the FFmpeg-backed
//! [`VideoSource`](crate::VideoSource).

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy the first plane of a packed RGB24 frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3), which
/// [`image::RgbImage::from_raw`] does not accept.
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Convert a frame number to a container seek timestamp in AV_TIME_BASE
/// (microseconds), as expected by `Input::seek`.
///
/// Frame numbers count from the stream's first timestamp, so the stream start
/// (`start_pts` in `time_base`) is added back to get an absolute position.
pub(crate) fn frame_number_to_seek_timestamp(
    frame_number: u64,
    frames_per_second: f64,
    start_pts: i64,
    time_base: Rational,
) -> i64 {
    let seconds = pts_to_seconds(start_pts, time_base) + frame_number as f64 / frames_per_second;
    (seconds * 1_000_000.0).round() as i64
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Map a PTS to a 0-based frame number, relative to the stream's start time.
///
/// Rounds to the nearest frame so timestamps that land a hair before the
/// exact frame boundary do not collide with the previous frame.
pub(crate) fn pts_to_frame_number(
    pts: i64,
    start_pts: i64,
    time_base: Rational,
    frames_per_second: f64,
) -> u64 {
    let seconds = pts_to_seconds(pts.saturating_sub(start_pts), time_base);
    (seconds * frames_per_second).round().max(0.0) as u64
}
