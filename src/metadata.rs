//! Probed video stream description.
//!
//! [`VideoInfo`] is produced once by [`StreamProbe`](crate::StreamProbe) and
//! then passed by value to every later stage. It never changes after the
//! probe returns.

use ffmpeg_next::{Rational, format::Pixel};

use crate::{error::FramePickError, time::Timestamp};

/// Immutable description of the selected video stream.
///
/// All timestamps and durations are expressed in ticks of
/// [`time_base`](VideoInfo::time_base).
///
/// # Example
///
/// ```no_run
/// use framepick::StreamProbe;
///
/// let info = StreamProbe::probe("input.mp4")?;
/// println!(
///     "stream #{}: {}x{} @ {:.3} fps",
///     info.stream_index,
///     info.width,
///     info.height,
///     info.frames_per_second(),
/// );
/// # Ok::<(), framepick::FramePickError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[must_use]
pub struct VideoInfo {
    /// Index of the selected stream inside the container.
    pub stream_index: usize,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Native pixel layout of the decoder output.
    pub pixel_format: Pixel,
    /// Frames per second as a rational.
    pub frame_rate: Rational,
    /// Seconds per timestamp tick.
    pub time_base: Rational,
    /// First presented timestamp, if the container reports one.
    pub start_time: Option<Timestamp>,
    /// Stream duration in ticks, if known.
    pub duration: Option<Timestamp>,
    /// Container-reported (or estimated) frame count. Advisory only.
    pub frame_count: Option<u64>,
}

impl VideoInfo {
    /// Check the invariants every timestamp computation relies on: a
    /// strictly positive time base and frame rate.
    ///
    /// # Errors
    ///
    /// Returns [`FramePickError::InvalidTiming`] naming the offending field.
    pub fn validate(&self) -> Result<(), FramePickError> {
        if self.time_base.numerator() <= 0 || self.time_base.denominator() <= 0 {
            return Err(FramePickError::InvalidTiming(format!(
                "time base {}/{} is not strictly positive",
                self.time_base.numerator(),
                self.time_base.denominator(),
            )));
        }
        if self.frame_rate.numerator() <= 0 || self.frame_rate.denominator() <= 0 {
            return Err(FramePickError::InvalidTiming(format!(
                "frame rate {}/{} is not strictly positive",
                self.frame_rate.numerator(),
                self.frame_rate.denominator(),
            )));
        }
        Ok(())
    }

    /// Start offset to apply in conversions. Unknown start is zero.
    pub fn start_offset(&self) -> Timestamp {
        self.start_time.unwrap_or(0)
    }

    /// Timestamp one past the last presented tick (`start + duration`), if
    /// the duration is known.
    pub fn end_timestamp(&self) -> Option<Timestamp> {
        self.duration
            .map(|duration| duration.saturating_add(self.start_offset()))
    }

    /// Frame rate as a floating-point approximation, for display.
    pub fn frames_per_second(&self) -> f64 {
        f64::from(self.frame_rate)
    }

    /// Duration in seconds, for display.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration
            .map(|duration| duration as f64 * f64::from(self.time_base))
    }
}
