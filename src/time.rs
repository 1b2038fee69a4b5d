//! Frame index, millisecond and timestamp conversions.
//!
//! Every function here is pure: it reads a [`VideoInfo`] and does integer
//! arithmetic. Conversions are carried out exactly in 128-bit integers and
//! floored in both directions, then saturated to the [`Timestamp`] range.
//! With that rule `timestamp_to_frame(frame_to_timestamp(i))` returns `i`
//! whenever one frame spans a whole number of ticks, and otherwise falls
//! short of `i` by at most one frame.
//!
//! Callers must have run [`VideoInfo::validate`] first; a zero frame rate or
//! time base yields a saturated result rather than a panic, but the value is
//! meaningless.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{error::FramePickError, metadata::VideoInfo};

/// A tick count in the selected stream's time base.
pub type Timestamp = i64;

/// Sentinel standing for "the end of the stream".
pub const STREAM_END: Timestamp = Timestamp::MAX;

/// A user-facing position in the stream, before resolution to a
/// [`Timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePoint {
    /// Zero-based frame index.
    Frame(u64),
    /// Offset from the start of the stream in milliseconds.
    Millisecond(u64),
    /// The end of the stream.
    End,
}

impl Display for TimePoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TimePoint::Frame(index) => write!(f, "frame {index}"),
            TimePoint::Millisecond(ms) => write!(f, "{ms} ms"),
            TimePoint::End => write!(f, "end"),
        }
    }
}

/// `floor(numerator / denominator)` for a positive denominator, saturated
/// to the timestamp range.
fn floor_div(numerator: i128, denominator: i128) -> i64 {
    if denominator <= 0 {
        return if numerator < 0 { i64::MIN } else { i64::MAX };
    }
    let quotient = numerator.div_euclid(denominator);
    quotient.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Ticks for an offset of `seconds_num / seconds_den` seconds, exact in
/// `i128`. `None` if the time base is not positive.
fn seconds_to_ticks(seconds_num: i128, seconds_den: i128, info: &VideoInfo) -> Option<i128> {
    // ticks = seconds / (tb.num / tb.den) = seconds * tb.den / tb.num
    let numerator = seconds_num * i128::from(info.time_base.denominator());
    let denominator = seconds_den * i128::from(info.time_base.numerator());
    (denominator > 0).then(|| numerator.div_euclid(denominator))
}

/// Convert an offset of `seconds_num / seconds_den` seconds to ticks and
/// add the start offset.
fn seconds_to_timestamp(seconds_num: i128, seconds_den: i128, info: &VideoInfo) -> Timestamp {
    let numerator = seconds_num * i128::from(info.time_base.denominator());
    let denominator = seconds_den * i128::from(info.time_base.numerator());
    floor_div(numerator, denominator).saturating_add(info.start_offset())
}

/// Like [`seconds_to_timestamp`], but `None` when the result does not fit
/// below [`STREAM_END`].
fn checked_seconds_to_timestamp(
    seconds_num: i128,
    seconds_den: i128,
    info: &VideoInfo,
) -> Option<Timestamp> {
    let ticks = seconds_to_ticks(seconds_num, seconds_den, info)?;
    i64::try_from(ticks)
        .ok()?
        .checked_add(info.start_offset())
        .filter(|timestamp| *timestamp != STREAM_END)
}

/// Timestamp at which frame `frame_index` is presented.
///
/// `seconds = frame_index / frame_rate`, converted to ticks and floored,
/// plus the start offset when the container reports one.
pub fn frame_to_timestamp(frame_index: u64, info: &VideoInfo) -> Timestamp {
    // seconds = index * fr.den / fr.num
    seconds_to_timestamp(
        i128::from(frame_index) * i128::from(info.frame_rate.denominator()),
        i128::from(info.frame_rate.numerator()),
        info,
    )
}

/// Timestamp `ms` milliseconds after the stream start.
pub fn milliseconds_to_timestamp(ms: u64, info: &VideoInfo) -> Timestamp {
    seconds_to_timestamp(i128::from(ms), 1000, info)
}

/// Index of the frame presented at `timestamp`.
///
/// `floor((ts - start) * tb.num * fr.num / (tb.den * fr.den))`. Timestamps
/// before the stream start map to frame 0.
pub fn timestamp_to_frame(timestamp: Timestamp, info: &VideoInfo) -> u64 {
    let relative = i128::from(timestamp) - i128::from(info.start_offset());
    let numerator = relative
        * i128::from(info.time_base.numerator())
        * i128::from(info.frame_rate.numerator());
    let denominator =
        i128::from(info.time_base.denominator()) * i128::from(info.frame_rate.denominator());
    floor_div(numerator, denominator).max(0) as u64
}

/// Resolve a [`TimePoint`] to a timestamp. [`TimePoint::End`] bypasses the
/// arithmetic and yields [`STREAM_END`].
///
/// Finite points saturate, so a large enough index also yields
/// [`STREAM_END`]; [`Range::resolve`] tells the two apart.
pub fn resolve(point: TimePoint, info: &VideoInfo) -> Timestamp {
    match point {
        TimePoint::Frame(index) => frame_to_timestamp(index, info),
        TimePoint::Millisecond(ms) => milliseconds_to_timestamp(ms, info),
        TimePoint::End => STREAM_END,
    }
}

/// Resolve a finite point without saturating. `None` if it is
/// [`TimePoint::End`] or lands outside the timestamp range.
fn checked_resolve(point: TimePoint, info: &VideoInfo) -> Option<Timestamp> {
    match point {
        TimePoint::Frame(index) => checked_seconds_to_timestamp(
            i128::from(index) * i128::from(info.frame_rate.denominator()),
            i128::from(info.frame_rate.numerator()),
            info,
        ),
        TimePoint::Millisecond(ms) => checked_seconds_to_timestamp(i128::from(ms), 1000, info),
        TimePoint::End => None,
    }
}

/// A validated, inclusive timestamp range.
///
/// Constructed only through [`Range::new`], which enforces
/// `0 <= from <= to <= end of stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    from: Timestamp,
    to: Timestamp,
}

impl Range {
    /// Validate a pair of resolved timestamps against `info`.
    ///
    /// `to == STREAM_END` is always within bounds. The upper bound for any
    /// other value is [`VideoInfo::end_timestamp`]; when the duration is
    /// unknown only the ordering checks apply.
    ///
    /// # Errors
    ///
    /// Returns [`FramePickError::InvalidRange`] if any bound is violated.
    pub fn new(from: Timestamp, to: Timestamp, info: &VideoInfo) -> Result<Self, FramePickError> {
        Self::validate(from, to, to == STREAM_END, info)
    }

    fn validate(
        from: Timestamp,
        to: Timestamp,
        open_ended: bool,
        info: &VideoInfo,
    ) -> Result<Self, FramePickError> {
        let invalid = |reason| FramePickError::InvalidRange { from, to, reason };

        if from < 0 {
            return Err(invalid("start is negative"));
        }
        if from > to {
            return Err(invalid("start is after end"));
        }
        if let Some(end) = info.end_timestamp() {
            if from > end {
                return Err(invalid("start exceeds stream duration"));
            }
            if !open_ended && to > end {
                return Err(invalid("end exceeds stream duration"));
            }
        }

        Ok(Self { from, to })
    }

    /// Resolve both points through the time model and validate the result.
    ///
    /// Only [`TimePoint::End`] makes the range open-ended. A finite point
    /// too large for the timestamp range is rejected, as is a start of
    /// [`TimePoint::End`].
    ///
    /// # Errors
    ///
    /// Returns [`FramePickError::InvalidRange`] if the resolved range is
    /// out of bounds.
    pub fn resolve(
        from: TimePoint,
        to: TimePoint,
        info: &VideoInfo,
    ) -> Result<Self, FramePickError> {
        let invalid = |reason| FramePickError::InvalidRange {
            from: resolve(from, info),
            to: resolve(to, info),
            reason,
        };

        let from_timestamp = match from {
            TimePoint::End => return Err(invalid("start cannot be the end of the stream")),
            point => checked_resolve(point, info)
                .ok_or_else(|| invalid("start exceeds the timestamp range"))?,
        };
        let to_timestamp = match to {
            TimePoint::End => STREAM_END,
            point => checked_resolve(point, info)
                .ok_or_else(|| invalid("end exceeds the timestamp range"))?,
        };

        Self::validate(from_timestamp, to_timestamp, to == TimePoint::End, info)
    }

    /// First timestamp to emit.
    pub fn from(&self) -> Timestamp {
        self.from
    }

    /// Last timestamp to emit (inclusive).
    pub fn to(&self) -> Timestamp {
        self.to
    }

    /// Whether the range runs to the end of the stream.
    pub fn is_open_ended(&self) -> bool {
        self.to == STREAM_END
    }

    /// Whether `timestamp` falls inside the range.
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.from && timestamp <= self.to
    }
}
