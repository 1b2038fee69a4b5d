//! # framepick
//!
//! Extract a contiguous range of video frames as still images, using
//! container seeking to reach the start of the range instead of decoding the
//! whole file.
//!
//! `framepick` probes a media file for its best video stream, converts the
//! requested start and end points (frame index, milliseconds, or "end of
//! stream") into container timestamps, seeks to the nearest keyframe at or
//! before the start, then decodes forward and writes every frame inside the
//! range as an image file. Decoding, scaling and encoding are done by FFmpeg
//! via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Extract a range
//!
//! ```no_run
//! use framepick::{ExtractOptions, TimePoint};
//!
//! let summary = framepick::extract(
//!     "input.mp4",
//!     "frames",
//!     TimePoint::Frame(100),
//!     TimePoint::Frame(199),
//!     &ExtractOptions::new(),
//! )?;
//! assert_eq!(summary.first_frame_index, 100);
//! # Ok::<(), framepick::FramePickError>(())
//! ```
//!
//! ### Inspect a file
//!
//! ```no_run
//! use framepick::StreamProbe;
//!
//! let info = StreamProbe::probe("input.mp4")?;
//! println!("{}x{} @ {:.3} fps", info.width, info.height, info.frames_per_second());
//! # Ok::<(), framepick::FramePickError>(())
//! ```
//!
//! ## Building blocks
//!
//! - [`time`]: pure frame / millisecond / timestamp conversions and
//!   validated [`Range`]s
//! - [`StreamProbe`]: one-shot stream metadata into a [`VideoInfo`]
//! - [`FrameSource`]: seekable, pull-based decoder over one stream
//! - [`ImageEncoder`]: pixel conversion plus still-image encoding to disk
//! - [`run_range`]: the filtering loop, generic over [`FrameSupply`] and
//!   [`FrameSink`]
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod config;
pub mod encoder;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod metadata;
pub mod pattern;
pub mod probe;
pub mod progress;
pub mod source;
pub mod time;

pub use config::{
    DEFAULT_PATTERN, ExtractOptions, ImageCodec, ImageOptions, PixelFormat, ThreadCount,
};
pub use encoder::{ImageEncoder, SaveOutcome};
pub use error::FramePickError;
pub use extract::{
    ExtractionSummary, FrameExtractor, FrameSink, FrameSupply, StopReason, Timestamped, extract,
    run_range,
};
pub use ffmpeg::{FfmpegLogLevel, LibraryGuard, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use metadata::VideoInfo;
pub use pattern::{FilenamePattern, MAX_FILENAME_LEN};
pub use probe::StreamProbe;
pub use progress::{ProgressCallback, ProgressInfo};
pub use source::{DecodedFrame, FrameSource, SourceState};
pub use time::{
    Range, STREAM_END, TimePoint, Timestamp, frame_to_timestamp, milliseconds_to_timestamp,
    timestamp_to_frame,
};
