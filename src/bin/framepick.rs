use std::{error::Error, path::PathBuf, process::ExitCode, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framepick::{
    DEFAULT_PATTERN, ExtractOptions, FfmpegLogLevel, FrameExtractor, FramePickError, ImageCodec,
    PixelFormat, ProgressCallback, ProgressInfo, StopReason, StreamProbe, ThreadCount, TimePoint,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framepick extract input.mp4 frames --from 100 --to 199\n  framepick extract input.mp4 frames --from 1:30 --to end --format shot-%05d.jpg --progress\n  framepick probe input.mp4 --json\n  framepick completions zsh > _framepick";

const TIME_HELP: &str =
    "frame index (120), seconds (4.5s), [HH:]MM:SS[.mmm] (01:02.250) or 'end'";

#[derive(Debug, Parser)]
#[command(
    name = "framepick",
    version,
    about = "Extract a range of video frames as still images",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract frames between two points into a directory.
    #[command(
        about = "Extract a frame range",
        after_help = "Examples:\n  framepick extract input.mp4 out --from 00:10 --to 00:20\n  framepick extract input.mp4 --from 5s --codec png --width 640"
    )]
    Extract {
        /// Input media file.
        input: PathBuf,
        /// Output directory, created if missing.
        #[arg(default_value = ".")]
        output: PathBuf,
        /// First frame to extract (inclusive).
        #[arg(long, default_value = "0", value_parser = parse_time_point, help = TIME_HELP)]
        from: TimePoint,
        /// Last frame to extract (inclusive).
        #[arg(long, default_value = "end", value_parser = parse_time_point, help = TIME_HELP)]
        to: TimePoint,
        /// Output filename pattern with one %d placeholder.
        #[arg(long)]
        format: Option<String>,
        /// Decoder threads ('auto' or a count).
        #[arg(long, default_value = "auto")]
        thread_count: ThreadCount,
        /// Image codec (jpeg, png, bmp, tiff).
        #[arg(long, default_value = "jpeg")]
        codec: ImageCodec,
        /// Converter target pixel format (yuvj420p, yuvj444p, rgb8, rgba8, bgr8, gray8).
        #[arg(long)]
        pixel_format: Option<PixelFormat>,
        /// Output width; the height follows the aspect ratio unless given.
        #[arg(long)]
        width: Option<u32>,
        /// Output height; the width follows the aspect ratio unless given.
        #[arg(long)]
        height: Option<u32>,
        /// Show a progress bar.
        #[arg(long)]
        progress: bool,
        /// Fail instead of replacing existing files.
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Print the selected video stream's metadata.
    #[command(about = "Print video stream metadata")]
    Probe {
        /// Input media file.
        input: PathBuf,
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Parse a start/end argument into a [`TimePoint`].
fn parse_time_point(value: &str) -> Result<TimePoint, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".to_string());
    }
    if trimmed.eq_ignore_ascii_case("end") {
        return Ok(TimePoint::End);
    }
    if let Some(seconds) = trimmed.strip_suffix('s') {
        return parse_seconds(seconds).map(TimePoint::Millisecond);
    }
    if trimmed.contains(':') {
        return parse_clock(trimmed).map(TimePoint::Millisecond);
    }
    trimmed
        .parse::<u64>()
        .map(TimePoint::Frame)
        .map_err(|_| format!("invalid time '{trimmed}' (expected {TIME_HELP})"))
}

/// `S[.mmm]` to milliseconds, with at most three fractional digits.
fn parse_seconds(value: &str) -> Result<u64, String> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if fraction.len() > 3 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid seconds '{value}' (at most 3 decimal places)"));
    }
    let seconds = whole
        .parse::<u64>()
        .map_err(|_| format!("invalid seconds '{value}'"))?;
    let millis = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<3}")
            .parse::<u64>()
            .map_err(|_| format!("invalid seconds '{value}'"))?
    };
    seconds
        .checked_mul(1000)
        .and_then(|ms| ms.checked_add(millis))
        .ok_or_else(|| format!("time '{value}' is too large"))
}

/// `[HH:]MM:SS[.mmm]` to milliseconds.
fn parse_clock(value: &str) -> Result<u64, String> {
    let parts: Vec<&str> = value.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => ("0", *minutes, *seconds),
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        _ => return Err(format!("invalid time format '{value}'")),
    };
    let hours = hours
        .parse::<u64>()
        .map_err(|_| format!("invalid hours in '{value}'"))?;
    let minutes = minutes
        .parse::<u64>()
        .map_err(|_| format!("invalid minutes in '{value}'"))?;
    if minutes >= 60 {
        return Err(format!("minutes out of range in '{value}'"));
    }
    let seconds = parse_seconds(seconds)?;
    if seconds >= 60_000 {
        return Err(format!("seconds out of range in '{value}'"));
    }
    hours
        .checked_mul(3_600_000)
        .and_then(|ms| ms.checked_add(minutes * 60_000 + seconds))
        .ok_or_else(|| format!("time '{value}' is too large"))
}

/// Process exit status for a failed run.
fn exit_code(error: &(dyn Error + 'static)) -> u8 {
    match error.downcast_ref::<FramePickError>() {
        Some(FramePickError::InputNotFound { .. }) => 3,
        Some(FramePickError::NoSuitableStream | FramePickError::UnsupportedCodec(_)) => 4,
        Some(
            FramePickError::InvalidRange { .. }
            | FramePickError::InvalidPattern(_)
            | FramePickError::FilenameTooLong { .. },
        ) => 2,
        Some(_) => 1,
        None => 2,
    }
}

struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn Error>> {
        let bar = ProgressBar::no_length();
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        if let Some(index) = info.frame_index {
            self.bar.set_message(format!("frame {index}"));
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(level) = &cli.log_level {
        let parsed = FfmpegLogLevel::from_name(level)
            .ok_or_else(|| format!("unsupported --log-level: {level}"))?;
        framepick::set_ffmpeg_log_level(parsed);
    }

    match cli.command {
        Commands::Extract {
            input,
            output,
            from,
            to,
            format,
            thread_count,
            codec,
            pixel_format,
            width,
            height,
            progress,
            no_overwrite,
        } => {
            let pattern = format.unwrap_or_else(|| match codec {
                ImageCodec::Jpeg => DEFAULT_PATTERN.to_string(),
                other => format!("frame-%d.{}", other.extension()),
            });

            let mut options = ExtractOptions::new()
                .with_threads(thread_count)
                .with_codec(codec)
                .with_resolution(width, height)
                .with_pattern(pattern)
                .with_overwrite(!no_overwrite);
            if let Some(pixel_format) = pixel_format {
                options = options.with_pixel_format(pixel_format);
            }

            let bar = if progress {
                let progress = Arc::new(BarProgress::new()?);
                options = options.with_progress(progress.clone());
                Some(progress)
            } else {
                None
            };

            let summary = FrameExtractor::open(&input)?
                .with_options(options)
                .extract(&output, from, to)?;

            if let Some(progress) = bar {
                progress.bar.finish_with_message("done");
            }

            if summary.frames_skipped > 0 {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!(
                        "{} frame(s) produced no image and were skipped",
                        summary.frames_skipped
                    )
                    .yellow()
                );
            }
            let ending = match summary.stop {
                StopReason::EndOfStream => "end of stream",
                StopReason::RangeExhausted => "end of range",
            };
            println!(
                "{} {}",
                "success:".green().bold(),
                format!(
                    "Extracted {} frame(s) starting at #{} to {} ({ending})",
                    summary.frames_written,
                    summary.first_frame_index,
                    output.display()
                )
                .green()
            );
        }
        Commands::Probe { input, json } => {
            let info = StreamProbe::probe(&input)?;
            if json {
                let payload = json!({
                    "stream_index": info.stream_index,
                    "width": info.width,
                    "height": info.height,
                    "pixel_format": format!("{:?}", info.pixel_format),
                    "frame_rate": [info.frame_rate.numerator(), info.frame_rate.denominator()],
                    "frames_per_second": info.frames_per_second(),
                    "time_base": [info.time_base.numerator(), info.time_base.denominator()],
                    "start_time": info.start_time,
                    "duration": info.duration,
                    "duration_seconds": info.duration_seconds(),
                    "frame_count": info.frame_count,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{} {}", "Input:".bold(), input.display());
                println!("Stream: #{}", info.stream_index);
                println!(
                    "Video: {}x{} {:?} @ {:.3} fps",
                    info.width,
                    info.height,
                    info.pixel_format,
                    info.frames_per_second()
                );
                println!("Time base: {}", info.time_base);
                if let Some(start) = info.start_time {
                    println!("Start: {start}");
                }
                match info.duration_seconds() {
                    Some(seconds) => println!("Duration: {seconds:.3}s"),
                    None => println!("Duration: unknown"),
                }
                if let Some(count) = info.frame_count {
                    println!("Frames: {count}");
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framepick", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            ExitCode::from(exit_code(error.as_ref()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{exit_code, parse_clock, parse_seconds, parse_time_point};
    use framepick::{FramePickError, TimePoint};

    #[test]
    fn parse_time_point_forms() {
        assert_eq!(parse_time_point("120").unwrap(), TimePoint::Frame(120));
        assert_eq!(parse_time_point("end").unwrap(), TimePoint::End);
        assert_eq!(parse_time_point("END").unwrap(), TimePoint::End);
        assert_eq!(parse_time_point("4.5s").unwrap(), TimePoint::Millisecond(4_500));
        assert_eq!(parse_time_point("01:02.250").unwrap(), TimePoint::Millisecond(62_250));
        assert_eq!(
            parse_time_point("1:00:00").unwrap(),
            TimePoint::Millisecond(3_600_000)
        );
        assert!(parse_time_point("").is_err());
        assert!(parse_time_point("-3").is_err());
        assert!(parse_time_point("abc").is_err());
    }

    #[test]
    fn parse_seconds_limits_precision() {
        assert_eq!(parse_seconds("2").unwrap(), 2_000);
        assert_eq!(parse_seconds("2.5").unwrap(), 2_500);
        assert_eq!(parse_seconds("2.05").unwrap(), 2_050);
        assert_eq!(parse_seconds("0.001").unwrap(), 1);
        assert!(parse_seconds("1.0001").is_err());
        assert!(parse_seconds("1.x").is_err());
    }

    #[test]
    fn parse_clock_validates_fields() {
        assert_eq!(parse_clock("00:01").unwrap(), 1_000);
        assert_eq!(parse_clock("02:03:04.5").unwrap(), 7_384_500);
        assert!(parse_clock("00:60").is_err());
        assert!(parse_clock("60:00").is_err());
        assert!(parse_clock("1:2:3:4").is_err());
    }

    #[test]
    fn exit_codes_by_error_kind() {
        let not_found = FramePickError::InputNotFound {
            path: "missing.mp4".into(),
        };
        assert_eq!(exit_code(&not_found), 3);
        assert_eq!(exit_code(&FramePickError::NoSuitableStream), 4);
        assert_eq!(
            exit_code(&FramePickError::InvalidRange {
                from: 10,
                to: 5,
                reason: "start is after end",
            }),
            2
        );
        assert_eq!(
            exit_code(&FramePickError::LibraryError {
                code: -5,
                description: "I/O error".to_string(),
            }),
            1
        );
        let usage: Box<dyn std::error::Error> = "unsupported --log-level: loud".into();
        assert_eq!(exit_code(usage.as_ref()), 2);
    }
}
