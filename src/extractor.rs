//! Parallel frame extraction.
//!
//! [`Extractor`] validates its options, reads the video metadata through one
//! short-lived handle, creates the output directory, and splits the frame
//! range into one contiguous [`FrameTask`] per worker. [`Extraction::run`]
//! then runs the workers on a dedicated rayon pool. Each worker opens its own
//! [`FrameSource`] on the same path, decodes its range forward, saves every
//! frame, and returns a tally; a bad frame is recorded and skipped, never
//! fatal to the run.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use rayon::{ThreadPoolBuilder, prelude::*};

use crate::{
    configuration::ExtractOptions,
    error::FramesnapError,
    metadata::VideoMetadata,
    progress::{ProgressCounter, ProgressReporter},
    source::{FfmpegOpener, FrameSource, SourceOpener},
    task::{FrameTask, partition},
    writer::FrameWriter,
};

/// A frame that could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFailure {
    /// Index of the frame.
    pub frame_number: u64,
    /// Why decoding or saving failed.
    pub reason: String,
}

/// Outcome of an extraction run.
#[derive(Debug, Clone)]
#[must_use]
pub struct ExtractionResult {
    /// Frames saved to disk.
    pub frames_written: u64,
    /// Frames that could not be decoded or saved.
    pub frames_failed: u64,
    /// One entry per failed frame, in frame order.
    pub failures: Vec<FrameFailure>,
    /// Wall-clock duration of the parallel phase.
    pub elapsed: Duration,
    /// Directory the frames were written to.
    pub output_directory: PathBuf,
}

impl ExtractionResult {
    /// `frames_written + frames_failed`.
    pub fn total(&self) -> u64 {
        self.frames_written + self.frames_failed
    }

    /// Returns `true` if no frame failed.
    pub fn is_complete(&self) -> bool {
        self.frames_failed == 0
    }
}

/// Entry point for extracting every frame of a video.
///
/// # Example
///
/// ```no_run
/// use framesnap::{ExtractOptions, Extractor};
///
/// let extractor = Extractor::new(ExtractOptions::new().with_threads(8));
/// let result = extractor.extract("input.mp4", "frames")?;
/// println!("{} written, {} failed", result.frames_written, result.frames_failed);
/// # Ok::<(), framesnap::FramesnapError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    /// Create an extractor with the given options.
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// The options this extractor runs with.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Prepare and immediately run an extraction through FFmpeg.
    ///
    /// # Errors
    ///
    /// Any setup error from [`prepare`](Extractor::prepare) or
    /// [`Extraction::run`]. Per-frame failures are reported in the result.
    pub fn extract<P, Q>(
        &self,
        video_path: P,
        output_directory: Q,
    ) -> Result<ExtractionResult, FramesnapError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        self.prepare(video_path, output_directory)?.run()
    }

    /// Run every setup step against an FFmpeg-backed source.
    ///
    /// # Errors
    ///
    /// See [`prepare_with`](Extractor::prepare_with).
    pub fn prepare<P, Q>(
        &self,
        video_path: P,
        output_directory: Q,
    ) -> Result<Extraction<FfmpegOpener>, FramesnapError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        self.prepare_with(FfmpegOpener, video_path, output_directory)
    }

    /// Run every setup step, opening sources through `opener`.
    ///
    /// Validates the options, reads the metadata through one handle (closed
    /// again before returning), creates the output directory, and
    /// partitions the frame range. Nothing is written to disk if the options
    /// are invalid.
    ///
    /// # Errors
    ///
    /// - [`FramesnapError::InvalidThreadCount`] / [`FramesnapError::InvalidQuality`]
    ///   for bad options.
    /// - Any error from opening the source.
    /// - [`FramesnapError::OutputDirectory`] if the directory cannot be created.
    pub fn prepare_with<O, P, Q>(
        &self,
        opener: O,
        video_path: P,
        output_directory: Q,
    ) -> Result<Extraction<O>, FramesnapError>
    where
        O: SourceOpener,
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        self.options.validate()?;

        let video_path = video_path.as_ref().to_path_buf();
        let metadata = {
            let source = opener.open(&video_path)?;
            source.metadata().clone()
        };

        log::info!(
            "{}: {} frames, {} @ {:.3} fps [{}]",
            video_path.display(),
            metadata.frame_count,
            metadata.resolution(),
            metadata.frames_per_second,
            metadata.codec,
        );

        let writer = FrameWriter::new(
            output_directory,
            metadata.frame_count,
            self.options.quality,
        )?;
        writer.prepare()?;

        let tasks = partition(metadata.frame_count, self.options.threads);

        Ok(Extraction {
            opener,
            video_path,
            metadata,
            writer,
            tasks,
            options: self.options.clone(),
        })
    }
}

/// A prepared extraction, ready to [`run`](Extraction::run).
#[derive(Debug)]
pub struct Extraction<O> {
    opener: O,
    video_path: PathBuf,
    metadata: VideoMetadata,
    writer: FrameWriter,
    tasks: Vec<FrameTask>,
    options: ExtractOptions,
}

impl<O: SourceOpener> Extraction<O> {
    /// Metadata read during preparation.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// One task per worker, in worker order.
    pub fn tasks(&self) -> &[FrameTask] {
        &self.tasks
    }

    /// The writer frames are saved through.
    pub fn writer(&self) -> &FrameWriter {
        &self.writer
    }

    /// Run all workers to completion and aggregate their tallies.
    ///
    /// # Errors
    ///
    /// [`FramesnapError::ThreadPool`] if the worker pool cannot be started.
    /// Frame-level failures never produce an error.
    pub fn run(self) -> Result<ExtractionResult, FramesnapError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.tasks.len())
            .thread_name(|index| format!("framesnap-worker-{index}"))
            .build()?;

        let started = Instant::now();
        let reporter = ProgressReporter::start(
            self.metadata.frame_count,
            Arc::clone(&self.options.progress),
            self.options.report_interval,
        );
        let counter = reporter.counter();

        let tallies: Vec<WorkerTally> = pool.install(|| {
            self.tasks
                .par_iter()
                .with_max_len(1)
                .enumerate()
                .map(|(worker, task)| {
                    run_worker(
                        worker,
                        *task,
                        &self.opener,
                        &self.video_path,
                        &self.writer,
                        &counter,
                    )
                })
                .collect()
        });

        reporter.stop();
        let elapsed = started.elapsed();

        let mut frames_written = 0;
        let mut failures = Vec::new();
        for tally in tallies {
            frames_written += tally.written;
            failures.extend(tally.failures);
        }
        failures.sort_by_key(|failure| failure.frame_number);

        let result = ExtractionResult {
            frames_written,
            frames_failed: failures.len() as u64,
            failures,
            elapsed,
            output_directory: self.writer.output_directory().to_path_buf(),
        };

        if result.is_complete() {
            log::info!(
                "Extracted {} frames in {:.2}s",
                result.frames_written,
                elapsed.as_secs_f64()
            );
        } else {
            log::warn!(
                "Extracted {} frames in {:.2}s, {} failed",
                result.frames_written,
                elapsed.as_secs_f64(),
                result.frames_failed
            );
        }

        Ok(result)
    }
}

#[derive(Debug, Default)]
struct WorkerTally {
    written: u64,
    failures: Vec<FrameFailure>,
}

impl WorkerTally {
    fn record(&mut self, frame_number: u64, error: &FramesnapError) {
        self.failures.push(FrameFailure {
            frame_number,
            reason: error.to_string(),
        });
    }

    fn fail_range(&mut self, task: FrameTask, error: &FramesnapError) {
        for frame_number in task.range() {
            self.record(frame_number, error);
        }
    }
}

fn run_worker<O: SourceOpener>(
    worker: usize,
    task: FrameTask,
    opener: &O,
    video_path: &Path,
    writer: &FrameWriter,
    counter: &ProgressCounter,
) -> WorkerTally {
    let mut tally = WorkerTally::default();
    if task.is_empty() {
        log::debug!("Worker {worker} has no frames assigned");
        return tally;
    }

    log::debug!("Worker {worker} extracting frames {task}");

    let mut source = match opener.open(video_path) {
        Ok(source) => source,
        Err(error) => {
            log::warn!(
                "Worker {worker} could not open {}: {error}",
                video_path.display()
            );
            tally.fail_range(task, &error);
            return tally;
        }
    };

    let mut resume_at = task.start();
    let outcome = source.for_each_frame(task, |frame_number, decoded| {
        resume_at = resume_at.max(frame_number + 1);
        match decoded.and_then(|image| writer.save(frame_number, &image)) {
            Ok(_) => {
                tally.written += 1;
                counter.advance(1);
            }
            Err(error) => {
                log::warn!("Frame {frame_number} failed: {error}");
                tally.record(frame_number, &error);
            }
        }
    });

    if let Err(error) = outcome {
        log::warn!("Worker {worker} stopped at frame {resume_at}: {error}");
        tally.fail_range(FrameTask::new(resume_at, task.end()), &error);
    }

    log::debug!(
        "Worker {worker} done: {} written, {} failed",
        tally.written,
        tally.failures.len()
    );
    tally
}
