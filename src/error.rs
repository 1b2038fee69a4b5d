//! Error types for the `framepick` crate.
//!
//! This module defines [`FramePickError`], the unified error type returned by
//! all fallible operations in the crate. Raw FFmpeg status codes are
//! translated into it in exactly one place (the [`From`] impl at the bottom
//! of this file); nothing above the probe / source / encoder layer ever sees
//! a bare integer code.
//!
//! End of stream is deliberately *not* an error: [`FrameSource::next_frame`]
//! reports it as `Ok(None)`.
//!
//! [`FrameSource::next_frame`]: crate::FrameSource::next_frame

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

use crate::time::Timestamp;

/// The unified error type for all `framepick` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramePickError {
    /// The input path does not exist or cannot be accessed. Checked before
    /// any library call is made.
    #[error("Input file not found: {path}")]
    InputNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The container could not be opened by the demuxer registry.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The container opened but its stream information could not be read.
    #[error("Failed to read stream information from {path}: {reason}")]
    StreamInfoUnavailable {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// No video stream could be selected from the container.
    #[error("No suitable video stream found in file")]
    NoSuitableStream,

    /// No decoder or encoder is registered for a required codec.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// A decoder or encoder context could not be allocated or opened.
    #[error("Failed to allocate codec context: {0}")]
    ContextAllocationFailed(String),

    /// The pixel-format / scale converter could not be built.
    #[error("Pixel format converter unavailable: {0}")]
    ConverterUnavailable(String),

    /// The stream reports a zero or missing time base or frame rate, so no
    /// timestamp arithmetic is possible.
    #[error("Invalid stream timing: {0}")]
    InvalidTiming(String),

    /// The resolved extraction range violates `0 <= from <= to <= end`.
    #[error("Invalid range: from {from} to {to} ({reason})")]
    InvalidRange {
        /// Resolved start timestamp.
        from: Timestamp,
        /// Resolved end timestamp.
        to: Timestamp,
        /// Which bound was violated.
        reason: &'static str,
    },

    /// The output filename pattern is malformed.
    #[error("Invalid filename pattern: {0}")]
    InvalidPattern(String),

    /// A formatted output filename exceeds the filename length bound.
    #[error("Formatted filename is {length} bytes long (limit is {limit})")]
    FilenameTooLong {
        /// Length of the formatted name.
        length: usize,
        /// Maximum accepted length.
        limit: usize,
    },

    /// Any other failure reported by FFmpeg.
    #[error("FFmpeg error {code}: {description}")]
    LibraryError {
        /// The raw FFmpeg status code.
        code: i32,
        /// FFmpeg's own description of the code.
        description: String,
    },

    /// An I/O error occurred while creating the output directory or writing
    /// an image.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for FramePickError {
    fn from(error: FfmpegError) -> Self {
        FramePickError::LibraryError {
            code: i32::from(error),
            description: error.to_string(),
        }
    }
}
