//! Coordinator tests against an in-memory frame source.
//!
//! The synthetic source renders each frame as a tiny solid image whose
//! colour encodes the frame index, so these tests need no FFmpeg fixture.

use std::{
    collections::BTreeSet,
    fs,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use image::{DynamicImage, Rgb, RgbImage};

use framesnap::{
    ExtractOptions, Extractor, FrameSource, FramesnapError, ProgressCallback, ProgressInfo,
    SourceOpener, VideoMetadata, frame_file_name, padding_width,
};

struct SyntheticSource {
    metadata: VideoMetadata,
    failing: Vec<u64>,
}

impl FrameSource for SyntheticSource {
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
        if self.failing.contains(&frame_number) {
            return Err(FramesnapError::VideoDecodeError(format!(
                "corrupt packet at frame {frame_number}"
            )));
        }

        let shade = (frame_number % 256) as u8;
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            4,
            4,
            Rgb([shade, shade.wrapping_mul(3), 255 - shade]),
        )))
    }
}

fn synthetic_metadata(frame_count: u64) -> VideoMetadata {
    VideoMetadata {
        frame_count,
        width: 4,
        height: 4,
        frames_per_second: 25.0,
        codec: "synthetic".to_string(),
        duration: Duration::from_secs_f64(frame_count as f64 / 25.0),
    }
}

fn synthetic_opener(
    frame_count: u64,
    failing: Vec<u64>,
) -> impl Fn(&Path) -> Result<SyntheticSource, FramesnapError> + Sync {
    move |_path: &Path| {
        Ok(SyntheticSource {
            metadata: synthetic_metadata(frame_count),
            failing: failing.clone(),
        })
    }
}

fn extract(
    frame_count: u64,
    threads: usize,
    failing: Vec<u64>,
    output: &Path,
) -> framesnap::ExtractionResult {
    Extractor::new(ExtractOptions::new().with_threads(threads))
        .prepare_with(synthetic_opener(frame_count, failing), "synthetic.mp4", output)
        .expect("Setup should succeed")
        .run()
        .expect("Run should succeed")
}

fn setup_error<O: SourceOpener>(
    options: ExtractOptions,
    opener: O,
    output: &Path,
) -> FramesnapError {
    match Extractor::new(options).prepare_with(opener, "synthetic.mp4", output) {
        Ok(_) => panic!("Expected setup to fail"),
        Err(error) => error,
    }
}

fn file_names(directory: &Path) -> BTreeSet<String> {
    fs::read_dir(directory)
        .expect("Failed to list output directory")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn expected_names(frame_count: u64, skip: &[u64]) -> BTreeSet<String> {
    let width = padding_width(frame_count);
    (0..frame_count)
        .filter(|index| !skip.contains(index))
        .map(|index| frame_file_name(index, width))
        .collect()
}

// ── Completeness ───────────────────────────────────────────────────

#[test]
fn every_index_written_exactly_once_with_eight_workers() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("frames");

    let result = extract(1000, 8, Vec::new(), &output);

    assert_eq!(result.frames_written, 1000);
    assert_eq!(result.frames_failed, 0);
    assert!(result.is_complete());
    assert_eq!(result.output_directory, output);
    assert_eq!(file_names(&output), expected_names(1000, &[]));
}

#[test]
fn written_plus_failed_equals_frame_count() {
    for frame_count in [0, 1, 7, 100] {
        for threads in [1, 3, 8, 16] {
            let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
            let failing = if frame_count > 5 { vec![2, 5] } else { Vec::new() };

            let result = extract(frame_count, threads, failing, temporary_directory.path());

            assert_eq!(
                result.total(),
                frame_count,
                "F={frame_count} T={threads}: {result:?}"
            );
            assert_eq!(result.frames_failed, result.failures.len() as u64);
        }
    }
}

#[test]
fn more_threads_than_frames() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let result = extract(3, 8, Vec::new(), temporary_directory.path());

    assert_eq!(result.frames_written, 3);
    assert_eq!(file_names(temporary_directory.path()), expected_names(3, &[]));
}

#[test]
fn empty_video_writes_nothing() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("frames");

    let result = extract(0, 4, Vec::new(), &output);

    assert_eq!(result.frames_written, 0);
    assert_eq!(result.frames_failed, 0);
    assert!(output.is_dir());
    assert!(file_names(&output).is_empty());
}

#[test]
fn prepared_extraction_exposes_plan() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let extraction = Extractor::new(ExtractOptions::new().with_threads(3))
        .prepare_with(synthetic_opener(10, Vec::new()), "synthetic.mp4", temporary_directory.path())
        .unwrap();

    assert_eq!(extraction.metadata().frame_count, 10);
    assert_eq!(extraction.tasks().len(), 3);
    assert_eq!(extraction.tasks()[2].end(), 10);
    assert_eq!(extraction.writer().padding(), 4);
}

// ── Failure isolation ──────────────────────────────────────────────

#[test]
fn single_decode_failure_is_isolated() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let result = extract(1000, 8, vec![500], temporary_directory.path());

    assert_eq!(result.frames_written, 999);
    assert_eq!(result.frames_failed, 1);
    assert_eq!(result.failures[0].frame_number, 500);
    assert!(result.failures[0].reason.contains("corrupt packet"));
    assert_eq!(
        file_names(temporary_directory.path()),
        expected_names(1000, &[500])
    );
}

#[test]
fn failures_across_workers_are_sorted() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let result = extract(100, 4, vec![99, 0, 50, 26], temporary_directory.path());

    let failed: Vec<u64> = result
        .failures
        .iter()
        .map(|failure| failure.frame_number)
        .collect();
    assert_eq!(failed, vec![0, 26, 50, 99]);
    assert_eq!(result.frames_written, 96);
}

#[test]
fn worker_open_failure_only_loses_its_range() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let opens = AtomicUsize::new(0);

    // Call 0 reads metadata; call 2 is whichever worker opens second.
    let opener = |_path: &Path| {
        if opens.fetch_add(1, Ordering::SeqCst) == 2 {
            return Err(FramesnapError::FileOpen {
                path: "synthetic.mp4".into(),
                reason: "simulated open failure".to_string(),
            });
        }
        Ok(SyntheticSource {
            metadata: synthetic_metadata(100),
            failing: Vec::new(),
        })
    };

    let result = Extractor::new(ExtractOptions::new().with_threads(4))
        .prepare_with(opener, "synthetic.mp4", temporary_directory.path())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(result.frames_written, 75);
    assert_eq!(result.frames_failed, 25);
    assert!(result.failures[0].reason.contains("simulated open failure"));
    assert_eq!(file_names(temporary_directory.path()).len(), 75);
}

// ── Setup errors ───────────────────────────────────────────────────

#[test]
fn invalid_thread_count_has_no_side_effects() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("frames");

    let error = setup_error(
        ExtractOptions::new().with_threads(0),
        synthetic_opener(10, Vec::new()),
        &output,
    );

    assert!(error.is_config_error());
    assert!(!output.exists());
}

#[test]
fn invalid_quality_has_no_side_effects() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("frames");

    let error = setup_error(
        ExtractOptions::new().with_quality(0),
        synthetic_opener(10, Vec::new()),
        &output,
    );

    assert!(matches!(error, FramesnapError::InvalidQuality { quality: 0 }));
    assert!(!output.exists());
}

#[test]
fn setup_open_failure_is_fatal() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("frames");

    let opener = |path: &Path| -> Result<SyntheticSource, FramesnapError> {
        Err(FramesnapError::FileNotFound {
            path: path.to_path_buf(),
        })
    };
    let error = setup_error(ExtractOptions::new(), opener, &output);

    assert!(matches!(error, FramesnapError::FileNotFound { .. }));
    assert!(!output.exists());
}

// ── Idempotence & progress ─────────────────────────────────────────

#[test]
fn repeated_runs_produce_identical_outputs() {
    let first = tempfile::tempdir().expect("Failed to create temp dir");
    let second = tempfile::tempdir().expect("Failed to create temp dir");

    extract(64, 4, Vec::new(), first.path());
    extract(64, 7, Vec::new(), second.path());

    let names = file_names(first.path());
    assert_eq!(names, file_names(second.path()));
    for name in names {
        let a = fs::read(first.path().join(&name)).unwrap();
        let b = fs::read(second.path().join(&name)).unwrap();
        assert_eq!(a, b, "{name} differs between runs");
    }
}

struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

#[test]
fn progress_reaches_frames_written() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let recorder = Arc::new(RecordingProgress {
        infos: Mutex::new(Vec::new()),
    });

    let result = Extractor::new(
        ExtractOptions::new()
            .with_threads(4)
            .with_progress(recorder.clone())
            .with_report_interval(Duration::from_millis(1)),
    )
    .prepare_with(synthetic_opener(200, vec![10]), "synthetic.mp4", temporary_directory.path())
    .unwrap()
    .run()
    .unwrap();

    let infos = recorder.infos.lock().unwrap();
    let last = infos.last().expect("Expected progress reports");
    assert_eq!(last.total, 200);
    assert_eq!(last.current, result.frames_written);
    assert_eq!(last.current, 199);
}
