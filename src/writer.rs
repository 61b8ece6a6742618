//! JPEG output.
//!
//! [`FrameWriter`] saves decoded frames as `frame_<index>.jpg` inside an
//! output directory. The index is zero-padded to [`padding_width`] digits so
//! that lexical and numeric order agree.

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{DynamicImage, ExtendedColorType, ImageEncoder, codecs::jpeg::JpegEncoder};

use crate::error::FramesnapError;

/// Minimum number of digits in an output file name.
pub const MIN_PADDING_WIDTH: usize = 4;

/// JPEG quality used when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Number of digits used to pad frame indices for a video of `frame_count`
/// frames: `max(4, digit_count(frame_count))`.
///
/// ```
/// assert_eq!(framesnap::padding_width(120), 4);
/// assert_eq!(framesnap::padding_width(15_000), 5);
/// ```
pub fn padding_width(frame_count: u64) -> usize {
    let digits = frame_count.checked_ilog10().map_or(1, |log| log as usize + 1);
    digits.max(MIN_PADDING_WIDTH)
}

/// File name for `frame_number`, padded to `width` digits.
pub fn frame_file_name(frame_number: u64, width: usize) -> String {
    format!("frame_{frame_number:0width$}.jpg")
}

/// Writes numbered JPEG frames into one directory.
#[derive(Debug, Clone)]
pub struct FrameWriter {
    output_directory: PathBuf,
    padding: usize,
    quality: u8,
}

impl FrameWriter {
    /// Create a writer for a video of `frame_count` frames.
    ///
    /// Nothing touches the filesystem until [`prepare`](FrameWriter::prepare)
    /// or [`save`](FrameWriter::save).
    ///
    /// # Errors
    ///
    /// [`FramesnapError::InvalidQuality`] if `quality` is outside `1..=100`.
    pub fn new<P: AsRef<Path>>(
        output_directory: P,
        frame_count: u64,
        quality: u8,
    ) -> Result<Self, FramesnapError> {
        if !(1..=100).contains(&quality) {
            return Err(FramesnapError::InvalidQuality { quality });
        }

        Ok(Self {
            output_directory: output_directory.as_ref().to_path_buf(),
            padding: padding_width(frame_count),
            quality,
        })
    }

    /// Create the output directory and any missing parents.
    ///
    /// Safe to call more than once.
    ///
    /// # Errors
    ///
    /// [`FramesnapError::OutputDirectory`] if the directory cannot be created.
    pub fn prepare(&self) -> Result<(), FramesnapError> {
        fs::create_dir_all(&self.output_directory).map_err(|source| {
            FramesnapError::OutputDirectory {
                path: self.output_directory.clone(),
                source,
            }
        })
    }

    /// Directory frames are written to.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Digits used to pad frame indices.
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// JPEG quality in `1..=100`.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Full path the given frame is saved to.
    pub fn path_for(&self, frame_number: u64) -> PathBuf {
        self.output_directory
            .join(frame_file_name(frame_number, self.padding))
    }

    /// Encode `image` as JPEG and write it to [`path_for`](FrameWriter::path_for).
    ///
    /// Images that are not 8-bit RGB or grayscale are converted to RGB first.
    /// The frame is encoded in memory before the file is created, so a frame
    /// that fails leaves no file behind.
    ///
    /// # Errors
    ///
    /// [`FramesnapError::ImageError`] if encoding fails,
    /// [`FramesnapError::IoError`] if the file cannot be written.
    pub fn save(&self, frame_number: u64, image: &DynamicImage) -> Result<PathBuf, FramesnapError> {
        let converted;
        let (pixels, color_type) = match image {
            DynamicImage::ImageRgb8(buffer) => (buffer.as_raw().as_slice(), ExtendedColorType::Rgb8),
            DynamicImage::ImageLuma8(buffer) => (buffer.as_raw().as_slice(), ExtendedColorType::L8),
            other => {
                converted = other.to_rgb8();
                (converted.as_raw().as_slice(), ExtendedColorType::Rgb8)
            }
        };

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.quality).write_image(
            pixels,
            image.width(),
            image.height(),
            color_type,
        )?;

        let path = self.path_for(frame_number);
        if let Err(error) = fs::write(&path, &encoded) {
            // A partial write must not look like an extracted frame.
            fs::remove_file(&path).ok();
            return Err(error.into());
        }

        log::trace!("Saved frame {frame_number} -> {}", path.display());
        Ok(path)
    }
}
