use std::{
    error::Error,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use clap::Parser;
use colored::Colorize;
use framesnap::{
    DEFAULT_JPEG_QUALITY, DEFAULT_THREADS, ExtractOptions, ExtractionResult, Extractor,
    FfmpegLogLevel, FrameFailure, ProgressCallback, ProgressInfo, VideoMetadata,
    thread_count_from_arg,
};
use indicatif::{ProgressBar, ProgressStyle, style::TemplateError};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framesnap sample.mp4 frames\n  framesnap sample.mp4 frames --threads 8 --quality 90\n  framesnap sample.mp4 frames --json > summary.json";

/// Failed frame indices listed in the summary before it is truncated.
const MAX_LISTED_FAILURES: usize = 10;

#[derive(Debug, Parser)]
#[command(
    name = "framesnap",
    version,
    about = "Extract every frame of a video file as numbered JPEG images",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Path to the video file.
    video_path: PathBuf,

    /// Directory where extracted frames will be saved (created if absent).
    output_directory: PathBuf,

    /// Number of worker threads.
    #[arg(long, default_value_t = DEFAULT_THREADS as i64, allow_negative_numbers = true)]
    threads: i64,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, default_value = "error", value_parser = FfmpegLogLevel::from_str)]
    log_level: FfmpegLogLevel,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Hide the metadata table and progress bar.
    #[arg(long)]
    quiet: bool,

    /// Print metadata and the summary as JSON.
    #[arg(long)]
    json: bool,
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, TemplateError> {
        let style = ProgressStyle::with_template(
            "{spinner:.green} Extracting frames {bar:40.cyan/blue} {pos}/{len} ({percent}%) [{elapsed_precise} < {eta_precise}]",
        )?
        .progress_chars("##-");
        let bar = ProgressBar::new(0);
        bar.set_style(style);
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish();
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_length(info.total);
        self.bar.set_position(info.current);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn print_metadata_table(metadata: &VideoMetadata) {
    let rows = [
        ("FPS", format!("{:.2}", metadata.frames_per_second)),
        ("Total Frames", metadata.frame_count.to_string()),
        (
            "Duration",
            format!("{:.2} sec", metadata.duration.as_secs_f64()),
        ),
        ("Resolution", metadata.resolution()),
        ("Codec", metadata.codec.clone()),
    ];

    println!("{}", "Video Information".bold());
    println!(
        "{} {}",
        format!("{:<20}", "Property").cyan().bold(),
        "Value".cyan().bold()
    );
    for (property, value) in rows {
        println!("{} {}", format!("{property:<20}").dimmed(), value.yellow().bold());
    }
    println!();
}

fn describe_failures(failures: &[FrameFailure]) -> String {
    let listed: Vec<String> = failures
        .iter()
        .take(MAX_LISTED_FAILURES)
        .map(|failure| failure.frame_number.to_string())
        .collect();
    let mut description = listed.join(", ");
    if failures.len() > MAX_LISTED_FAILURES {
        description.push_str(&format!(
            " (and {} more)",
            failures.len() - MAX_LISTED_FAILURES
        ));
    }
    description
}

fn print_summary(video_path: &Path, result: &ExtractionResult) {
    let elapsed = result.elapsed.as_secs_f64();
    if result.is_complete() {
        println!(
            "{} {}",
            "success:".green().bold(),
            format!(
                "Extracted {} frame(s) from '{}' into {} in {elapsed:.2}s",
                result.frames_written,
                video_path.display(),
                result.output_directory.display(),
            )
            .green()
        );
        return;
    }

    println!(
        "{} {}",
        "warning:".yellow().bold(),
        format!(
            "Extracted {} of {} frame(s) from '{}' into {} in {elapsed:.2}s; {} frame(s) failed",
            result.frames_written,
            result.total(),
            video_path.display(),
            result.output_directory.display(),
            result.frames_failed,
        )
        .yellow()
    );
    println!(
        "{} {}",
        "failed frames:".yellow(),
        describe_failures(&result.failures)
    );
}

fn summary_json(
    video_path: &Path,
    metadata: &VideoMetadata,
    result: &ExtractionResult,
) -> serde_json::Value {
    json!({
        "video": video_path.display().to_string(),
        "metadata": {
            "frame_count": metadata.frame_count,
            "width": metadata.width,
            "height": metadata.height,
            "fps": metadata.frames_per_second,
            "duration_seconds": metadata.duration.as_secs_f64(),
            "codec": metadata.codec,
        },
        "output_directory": result.output_directory.display().to_string(),
        "frames_written": result.frames_written,
        "frames_failed": result.frames_failed,
        "elapsed_seconds": result.elapsed.as_secs_f64(),
        "failures": result.failures.iter().map(|failure| json!({
            "frame_number": failure.frame_number,
            "reason": failure.reason,
        })).collect::<Vec<_>>(),
    })
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    framesnap::set_ffmpeg_log_level(cli.log_level);

    let threads = thread_count_from_arg(cli.threads)?;
    let interactive = !cli.quiet && !cli.json;

    let progress = if interactive {
        Some(Arc::new(TerminalProgress::new()?))
    } else {
        None
    };

    let mut options = ExtractOptions::new()
        .with_threads(threads)
        .with_quality(cli.quality);
    if let Some(progress) = &progress {
        options = options.with_progress(progress.clone());
    }

    let extraction = Extractor::new(options).prepare(&cli.video_path, &cli.output_directory)?;
    let metadata = extraction.metadata().clone();
    if interactive {
        print_metadata_table(&metadata);
    }

    let result = extraction.run()?;
    if let Some(progress) = &progress {
        progress.finish();
    }

    if cli.json {
        let payload = summary_json(&cli.video_path, &metadata, &result);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_summary(&cli.video_path, &result);
    }

    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // --help and --version also arrive here and go to stdout.
            let code = if error.use_stderr() { 1 } else { 0 };
            error.print().ok();
            std::process::exit(code);
        }
    };

    init_logging(cli.verbose);

    if let Err(error) = run(&cli) {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use framesnap::{FfmpegLogLevel, FrameFailure, thread_count_from_arg};

    use super::{Cli, describe_failures};

    #[test]
    fn parse_defaults() {
        let cli = Cli::try_parse_from(["framesnap", "sample.mp4", "frames"]).unwrap();
        assert_eq!(cli.video_path.to_str(), Some("sample.mp4"));
        assert_eq!(cli.output_directory.to_str(), Some("frames"));
        assert_eq!(cli.threads, 4);
        assert_eq!(cli.quality, 95);
        assert_eq!(cli.log_level, FfmpegLogLevel::Error);
        assert!(!cli.json);
    }

    #[test]
    fn parse_thread_count() {
        let cli =
            Cli::try_parse_from(["framesnap", "sample.mp4", "frames", "--threads", "8"]).unwrap();
        assert_eq!(thread_count_from_arg(cli.threads).unwrap(), 8);
    }

    #[test]
    fn non_positive_thread_counts_are_config_errors() {
        for value in ["0", "-1"] {
            let cli = Cli::try_parse_from(["framesnap", "sample.mp4", "frames", "--threads", value])
                .unwrap();
            let error = thread_count_from_arg(cli.threads).unwrap_err();
            assert!(error.is_config_error(), "--threads {value}: {error}");
        }
    }

    #[test]
    fn non_numeric_thread_count_is_rejected() {
        let result = Cli::try_parse_from(["framesnap", "sample.mp4", "frames", "--threads", "many"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_output_directory_is_rejected() {
        assert!(Cli::try_parse_from(["framesnap", "sample.mp4"]).is_err());
    }

    #[test]
    fn parse_log_level_aliases() {
        let cli = Cli::try_parse_from([
            "framesnap",
            "sample.mp4",
            "frames",
            "--log-level",
            "WARN",
        ])
        .unwrap();
        assert_eq!(cli.log_level, FfmpegLogLevel::Warning);

        assert!(
            Cli::try_parse_from(["framesnap", "a.mp4", "out", "--log-level", "loud"]).is_err()
        );
    }

    #[test]
    fn failure_list_is_truncated() {
        let failures: Vec<FrameFailure> = (0..13)
            .map(|frame_number| FrameFailure {
                frame_number,
                reason: "corrupt".to_string(),
            })
            .collect();

        assert_eq!(describe_failures(&failures[..2]), "0, 1");
        assert_eq!(
            describe_failures(&failures),
            "0, 1, 2, 3, 4, 5, 6, 7, 8, 9 (and 3 more)"
        );
    }
}
