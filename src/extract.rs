//! Range extraction: seek, filter, emit.
//!
//! [`FrameExtractor`] ties the pieces together: it probes the input,
//! resolves the requested [`TimePoint`]s into a validated [`Range`], seeks a
//! [`FrameSource`] to the start of the range and writes every frame whose
//! timestamp falls inside it through an [`ImageEncoder`].
//!
//! The filtering loop itself lives in [`run_range`] and only talks to the
//! [`FrameSupply`] and [`FrameSink`] traits, so it can be driven by
//! synthetic frame sequences as well as by real decoders.
//!
//! # Example
//!
//! ```no_run
//! use framepick::{ExtractOptions, FrameExtractor, TimePoint};
//!
//! let extractor = FrameExtractor::open("input.mp4")?
//!     .with_options(ExtractOptions::new().with_pattern("shot-%04d.jpg"));
//! let summary = extractor.extract("frames", TimePoint::Millisecond(2_000), TimePoint::End)?;
//! println!("wrote {} frames", summary.frames_written);
//! # Ok::<(), framepick::FramePickError>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    config::ExtractOptions,
    encoder::{ImageEncoder, SaveOutcome},
    error::FramePickError,
    metadata::VideoInfo,
    pattern::FilenamePattern,
    probe::{StreamProbe, ensure_input_exists},
    progress::ProgressTracker,
    source::{DecodedFrame, FrameSource},
    time::{Range, TimePoint, Timestamp, timestamp_to_frame},
};

/// Anything that carries a presentation timestamp.
pub trait Timestamped {
    /// Presentation timestamp in stream ticks, if known.
    fn timestamp(&self) -> Option<Timestamp>;
}

/// A seekable, pull-based sequence of frames.
pub trait FrameSupply {
    /// The frame type produced.
    type Frame: Timestamped;

    /// Reposition at or before `timestamp`.
    fn seek(&mut self, timestamp: Timestamp) -> Result<(), FramePickError>;

    /// Next frame, or `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, FramePickError>;
}

/// Receives the frames selected by [`run_range`].
pub trait FrameSink<F> {
    /// Emit `frame` as output number `index`.
    fn emit(&mut self, frame: &F, index: u64) -> Result<SaveOutcome, FramePickError>;
}

/// Why the extraction loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source ran out of frames.
    EndOfStream,
    /// A frame past the end of the range was decoded.
    RangeExhausted,
}

/// What one extraction did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Output index of the first emitted frame.
    pub first_frame_index: u64,
    /// Frames encoded and written to disk.
    pub frames_written: u64,
    /// Frames inside the range for which the encoder produced no output.
    pub frames_skipped: u64,
    /// Decoded frames dropped for being before the range or lacking a
    /// timestamp.
    pub frames_discarded: u64,
    /// How the loop ended.
    pub stop: StopReason,
}

impl ExtractionSummary {
    /// Frames inside the range, whether written or skipped.
    pub fn frames_emitted(&self) -> u64 {
        self.frames_written + self.frames_skipped
    }

    /// Output index one past the last emitted frame.
    pub fn next_frame_index(&self) -> u64 {
        self.first_frame_index + self.frames_emitted()
    }
}

/// Seek `source` to the start of `range` and hand every frame inside it to
/// `sink`, numbering outputs from `timestamp_to_frame(range.from())`.
///
/// Frames before the range (the seek lands on a keyframe at or before the
/// start) and frames without a timestamp are discarded. The loop stops at
/// the first frame past `range.to()` or at end of stream, and never calls
/// `next_frame` again after either.
///
/// # Errors
///
/// Propagates the first error from `source` or `sink`.
pub fn run_range<S, K>(
    source: &mut S,
    sink: &mut K,
    range: &Range,
    info: &VideoInfo,
) -> Result<ExtractionSummary, FramePickError>
where
    S: FrameSupply,
    K: FrameSink<S::Frame>,
{
    drive(source, sink, range, info, |_, _| {})
}

fn drive<S, K, F>(
    source: &mut S,
    sink: &mut K,
    range: &Range,
    info: &VideoInfo,
    mut on_emit: F,
) -> Result<ExtractionSummary, FramePickError>
where
    S: FrameSupply,
    K: FrameSink<S::Frame>,
    F: FnMut(u64, Timestamp),
{
    source.seek(range.from())?;

    let first_frame_index = timestamp_to_frame(range.from(), info);
    let mut frame_index = first_frame_index;
    let mut frames_written = 0;
    let mut frames_skipped = 0;
    let mut frames_discarded = 0;

    let stop = loop {
        let Some(frame) = source.next_frame()? else {
            break StopReason::EndOfStream;
        };

        let Some(timestamp) = frame.timestamp() else {
            log::warn!("Discarding decoded frame without a timestamp");
            frames_discarded += 1;
            continue;
        };

        if timestamp > range.to() {
            log::debug!("Frame at {timestamp} is past {}, stopping", range.to());
            break StopReason::RangeExhausted;
        }
        if timestamp < range.from() {
            log::debug!("Discarding frame at {timestamp} before {}", range.from());
            frames_discarded += 1;
            continue;
        }

        match sink.emit(&frame, frame_index)? {
            SaveOutcome::Written(path) => {
                log::debug!("Frame {frame_index} at {timestamp} -> {}", path.display());
                frames_written += 1;
            }
            SaveOutcome::Skipped => {
                log::warn!("Frame {frame_index} at {timestamp} produced no image");
                frames_skipped += 1;
            }
        }
        on_emit(frame_index, timestamp);
        frame_index += 1;
    };

    Ok(ExtractionSummary {
        first_frame_index,
        frames_written,
        frames_skipped,
        frames_discarded,
        stop,
    })
}

impl Timestamped for DecodedFrame {
    fn timestamp(&self) -> Option<Timestamp> {
        DecodedFrame::timestamp(self)
    }
}

impl FrameSupply for FrameSource {
    type Frame = DecodedFrame;

    fn seek(&mut self, timestamp: Timestamp) -> Result<(), FramePickError> {
        FrameSource::seek(self, timestamp)
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, FramePickError> {
        FrameSource::next_frame(self)
    }
}

/// Names each emitted frame from the pattern and writes it into one
/// directory.
struct ImageSink<'a> {
    encoder: &'a mut ImageEncoder,
    pattern: &'a FilenamePattern,
    directory: &'a Path,
}

impl FrameSink<DecodedFrame> for ImageSink<'_> {
    fn emit(&mut self, frame: &DecodedFrame, index: u64) -> Result<SaveOutcome, FramePickError> {
        let filename = self.pattern.format(index)?;
        self.encoder.save(frame, self.directory, &filename)
    }
}

/// Extracts frame ranges from one input file.
///
/// Opening probes the input once; each [`extract`](FrameExtractor::extract)
/// call then builds its own decoder and encoder and releases them before
/// returning.
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    input: PathBuf,
    info: VideoInfo,
    options: ExtractOptions,
}

impl FrameExtractor {
    /// Probe `path` and prepare to extract from it with default options.
    ///
    /// # Errors
    ///
    /// Any [`StreamProbe::probe`] error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FramePickError> {
        let input = path.as_ref().to_path_buf();
        let info = StreamProbe::probe(&input)?;
        Ok(Self {
            input,
            info,
            options: ExtractOptions::default(),
        })
    }

    /// Replace the extraction options.
    #[must_use]
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Probed description of the selected video stream.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Options used by [`extract`](FrameExtractor::extract).
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Write every frame between `from` and `to` (inclusive) into
    /// `output_directory`, creating it if needed.
    ///
    /// The range and the filename pattern are validated before any decoder
    /// or encoder is created.
    ///
    /// # Errors
    ///
    /// - [`FramePickError::InvalidRange`] if the resolved range is invalid.
    /// - [`FramePickError::InvalidPattern`] / [`FramePickError::FilenameTooLong`]
    ///   for a bad filename pattern.
    /// - Any error from [`FrameSource`], [`ImageEncoder`] or the filesystem.
    pub fn extract<P: AsRef<Path>>(
        &self,
        output_directory: P,
        from: TimePoint,
        to: TimePoint,
    ) -> Result<ExtractionSummary, FramePickError> {
        let output_directory = output_directory.as_ref();
        let info = &self.info;

        let range = Range::resolve(from, to, info)?;
        let pattern = FilenamePattern::parse(&self.options.pattern)?;
        let first_frame_index = timestamp_to_frame(range.from(), info);
        pattern.format(first_frame_index)?;

        log::info!(
            "Extracting {} from {} to {} (timestamps {}..={}) into {}",
            self.input.display(),
            from,
            to,
            range.from(),
            range.to(),
            output_directory.display(),
        );

        ensure_input_exists(&self.input)?;
        fs::create_dir_all(output_directory)?;

        let mut source = FrameSource::open(&self.input, info, self.options.threads)?;
        let mut encoder = ImageEncoder::new(
            info.width,
            info.height,
            info.pixel_format,
            &self.options.image,
        )?
        .with_overwrite(self.options.overwrite);

        let total = if range.is_open_ended() {
            info.frame_count
                .map(|count| count.saturating_sub(first_frame_index))
        } else {
            Some(
                timestamp_to_frame(range.to(), info)
                    .saturating_sub(first_frame_index)
                    .saturating_add(1),
            )
        };
        let mut tracker =
            ProgressTracker::new(self.options.progress.clone(), total, self.options.batch_size);

        let mut sink = ImageSink {
            encoder: &mut encoder,
            pattern: &pattern,
            directory: output_directory,
        };
        let summary = drive(&mut source, &mut sink, &range, info, |index, timestamp| {
            tracker.advance(index, timestamp)
        })?;
        tracker.finish();

        log::info!(
            "Extraction finished ({:?}): {} written, {} skipped, {} discarded",
            summary.stop,
            summary.frames_written,
            summary.frames_skipped,
            summary.frames_discarded,
        );

        encoder.close();
        source.close();
        Ok(summary)
    }
}

/// Probe `input` and extract `from..=to` into `output_directory` with
/// `options`.
///
/// # Errors
///
/// See [`FrameExtractor::open`] and [`FrameExtractor::extract`].
pub fn extract<P, Q>(
    input: P,
    output_directory: Q,
    from: TimePoint,
    to: TimePoint,
    options: &ExtractOptions,
) -> Result<ExtractionSummary, FramePickError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    FrameExtractor::open(input)?
        .with_options(options.clone())
        .extract(output_directory, from, to)
}
