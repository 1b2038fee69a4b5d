//! FFmpeg process lifecycle and log level configuration.
//!
//! Two process-wide concerns live here:
//!
//! - [`LibraryGuard`], a reference-counted handle on FFmpeg's global
//!   initialisation. The probe, the frame source and the image encoder each
//!   hold one for their whole lifetime, so a probe finishing cannot tear
//!   down network state that a frame source opened afterwards still uses.
//! - A thin wrapper around FFmpeg's log-level API so callers can silence
//!   FFmpeg's own stderr output without importing `ffmpeg-next` directly.
//!
//! # Example
//!
//! ```no_run
//! use framepick::FfmpegLogLevel;
//!
//! // Silence all FFmpeg output except fatal errors.
//! framepick::set_ffmpeg_log_level(FfmpegLogLevel::Fatal);
//! ```
//!
//! # Note
//!
//! The log level controls **FFmpeg's own console output**, not the Rust-side
//! diagnostic messages emitted via the `log` crate. To see those, install a
//! `log` subscriber such as `env_logger`.

use std::sync::Mutex;

use ffmpeg_next::util::log::Level;

use crate::error::FramePickError;

/// Number of live [`LibraryGuard`]s in the process.
static LIBRARY_USERS: Mutex<usize> = Mutex::new(0);

/// Scoped handle on FFmpeg's process-wide initialisation.
///
/// The first guard acquired initialises FFmpeg and its network layer; the
/// last guard dropped de-initialises the network layer again. Acquiring
/// and releasing any number of guards in sequence leaves the process in the
/// same state as before the first acquisition.
#[derive(Debug)]
pub struct LibraryGuard {
    _private: (),
}

impl LibraryGuard {
    /// Acquire a guard, initialising FFmpeg if this is the first live one.
    ///
    /// # Errors
    ///
    /// Returns [`FramePickError::LibraryError`] if FFmpeg fails to
    /// initialise.
    pub fn acquire() -> Result<Self, FramePickError> {
        let mut users = LIBRARY_USERS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if *users == 0 {
            ffmpeg_next::init()?;
            ffmpeg_next::format::network::init();
            log::debug!("FFmpeg initialised");
        }
        *users += 1;

        Ok(Self { _private: () })
    }

    /// Number of guards currently alive in this process.
    pub fn active_count() -> usize {
        *LIBRARY_USERS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for LibraryGuard {
    fn drop(&mut self) {
        let mut users = LIBRARY_USERS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        *users = users.saturating_sub(1);
        if *users == 0 {
            ffmpeg_next::format::network::deinit();
            log::debug!("FFmpeg network layer released");
        }
    }
}

/// FFmpeg internal log verbosity level.
///
/// Maps directly to FFmpeg's `AV_LOG_*` constants. Setting a level causes
/// FFmpeg to suppress all messages below that severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only log conditions the process cannot recover from.
    Panic,
    /// Only log unrecoverable errors.
    Fatal,
    /// Log recoverable errors.
    Error,
    /// Log warnings (default FFmpeg level).
    Warning,
    /// Log informational messages.
    Info,
    /// Log verbose informational messages.
    Verbose,
    /// Log debugging messages.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }

    fn from_ffmpeg_level(level: Level) -> Self {
        match level {
            Level::Quiet => FfmpegLogLevel::Quiet,
            Level::Panic => FfmpegLogLevel::Panic,
            Level::Fatal => FfmpegLogLevel::Fatal,
            Level::Error => FfmpegLogLevel::Error,
            Level::Warning => FfmpegLogLevel::Warning,
            Level::Info => FfmpegLogLevel::Info,
            Level::Verbose => FfmpegLogLevel::Verbose,
            Level::Debug => FfmpegLogLevel::Debug,
            Level::Trace => FfmpegLogLevel::Trace,
        }
    }

    /// Parse a level name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "quiet" => Some(FfmpegLogLevel::Quiet),
            "panic" => Some(FfmpegLogLevel::Panic),
            "fatal" => Some(FfmpegLogLevel::Fatal),
            "error" => Some(FfmpegLogLevel::Error),
            "warning" | "warn" => Some(FfmpegLogLevel::Warning),
            "info" => Some(FfmpegLogLevel::Info),
            "verbose" => Some(FfmpegLogLevel::Verbose),
            "debug" => Some(FfmpegLogLevel::Debug),
            "trace" => Some(FfmpegLogLevel::Trace),
            _ => None,
        }
    }
}

/// Set the FFmpeg internal log verbosity level.
///
/// This controls what FFmpeg prints to stderr. It does **not** affect
/// Rust-side `log` crate output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Get the current FFmpeg internal log verbosity level.
///
/// Returns `None` if the current level does not map to a known variant.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level()
        .ok()
        .map(FfmpegLogLevel::from_ffmpeg_level)
}
