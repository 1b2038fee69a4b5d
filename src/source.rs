//! Streaming decode of the selected video stream.
//!
//! [`FrameSource`] owns a demuxer and an opened decoder bound to one stream.
//! It exposes a keyframe-aligned [`seek`](FrameSource::seek) and a pull-based
//! [`next_frame`](FrameSource::next_frame) that returns frames in the order
//! the decoder emits them.
//!
//! # Example
//!
//! ```no_run
//! use framepick::{FrameSource, StreamProbe, ThreadCount};
//!
//! let info = StreamProbe::probe("input.mp4")?;
//! let mut source = FrameSource::open("input.mp4", &info, ThreadCount::Auto)?;
//! source.seek(0)?;
//! while let Some(frame) = source.next_frame()? {
//!     println!("pts {:?}", frame.timestamp());
//! }
//! # Ok::<(), framepick::FramePickError>(())
//! ```

use std::path::Path;

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::{context::Context as CodecContext, threading},
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    util::error::EAGAIN,
};
use ffmpeg_sys_next::avformat_seek_file;

use crate::{
    config::ThreadCount,
    error::FramePickError,
    ffmpeg::LibraryGuard,
    metadata::VideoInfo,
    probe::{ensure_input_exists, open_container},
    time::Timestamp,
};

/// A decoded picture together with its presentation timestamp.
///
/// Owned by the caller for one loop iteration, then dropped.
pub struct DecodedFrame {
    frame: VideoFrame,
    timestamp: Option<Timestamp>,
}

impl DecodedFrame {
    pub(crate) fn new(frame: VideoFrame) -> Self {
        let timestamp = frame.timestamp().or_else(|| frame.pts());
        Self { frame, timestamp }
    }

    /// Presentation timestamp in stream ticks (best-effort, falling back to
    /// the raw PTS). `None` if the decoder attached neither.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    /// Width of the decoded picture.
    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    /// Height of the decoded picture.
    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Pixel layout of the decoded picture.
    pub fn format(&self) -> Pixel {
        self.frame.format()
    }

    /// The underlying FFmpeg frame (pixel planes and strides).
    pub fn video(&self) -> &VideoFrame {
        &self.frame
    }
}

/// Where a [`FrameSource`] is in its decode protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Opened, nothing read yet.
    Open,
    /// Reading packets and decoding.
    Reading,
    /// Demuxer exhausted; the decoder is flushing its buffered frames.
    Draining,
    /// Every frame has been returned.
    Exhausted,
}

/// What the decoder answered when asked for output.
enum Received<F> {
    Frame(F),
    /// Needs more input before it can produce anything.
    Again,
    /// Fully drained after end of input.
    Eof,
}

/// What the decoder answered when given a packet.
enum Sent {
    Accepted,
    /// Output must be read before this packet can be taken.
    Again,
}

/// The send/receive surface of a decoder as [`DecodePump`] drives it.
trait Decode {
    type Packet;
    type Frame;

    fn receive(&mut self) -> Result<Received<Self::Frame>, FramePickError>;
    fn send(&mut self, packet: &Self::Packet) -> Result<Sent, FramePickError>;
    fn finish(&mut self) -> Result<(), FramePickError>;
    fn reset(&mut self);
}

impl Decode for VideoDecoder {
    type Packet = Packet;
    type Frame = VideoFrame;

    fn receive(&mut self) -> Result<Received<VideoFrame>, FramePickError> {
        let mut frame = VideoFrame::empty();
        match self.receive_frame(&mut frame) {
            Ok(()) => Ok(Received::Frame(frame)),
            Err(FfmpegError::Eof) => Ok(Received::Eof),
            Err(FfmpegError::Other { errno: EAGAIN }) => Ok(Received::Again),
            Err(error) => Err(error.into()),
        }
    }

    fn send(&mut self, packet: &Packet) -> Result<Sent, FramePickError> {
        match self.send_packet(packet) {
            Ok(()) => Ok(Sent::Accepted),
            Err(FfmpegError::Other { errno: EAGAIN }) => Ok(Sent::Again),
            Err(error) => Err(error.into()),
        }
    }

    fn finish(&mut self) -> Result<(), FramePickError> {
        Ok(self.send_eof()?)
    }

    fn reset(&mut self) {
        self.flush();
    }
}

/// Drain-first decode loop: buffered output is always taken before more
/// input is fed, a refused packet is resubmitted before anything new is
/// read, and end of input switches to draining.
struct DecodePump<D: Decode> {
    decoder: D,
    /// A packet the decoder refused with "not ready".
    pending: Option<D::Packet>,
    state: SourceState,
}

impl<D: Decode> DecodePump<D> {
    fn new(decoder: D) -> Self {
        Self {
            decoder,
            pending: None,
            state: SourceState::Open,
        }
    }

    fn reset(&mut self) {
        self.decoder.reset();
        self.pending = None;
        self.state = SourceState::Reading;
    }

    /// Next frame, pulling packets from `read` (which yields `None` once the
    /// demuxer is exhausted) as needed.
    fn next<R>(&mut self, mut read: R) -> Result<Option<D::Frame>, FramePickError>
    where
        R: FnMut() -> Result<Option<D::Packet>, FramePickError>,
    {
        if self.state == SourceState::Exhausted {
            return Ok(None);
        }
        if self.state == SourceState::Open {
            self.state = SourceState::Reading;
        }

        loop {
            match self.decoder.receive()? {
                Received::Frame(frame) => return Ok(Some(frame)),
                Received::Eof => {
                    self.state = SourceState::Exhausted;
                    return Ok(None);
                }
                Received::Again => {}
            }

            if self.state == SourceState::Draining {
                // A draining decoder that wants more input has nothing left.
                self.state = SourceState::Exhausted;
                return Ok(None);
            }

            let packet = match self.pending.take() {
                Some(packet) => packet,
                None => match read()? {
                    Some(packet) => packet,
                    None => {
                        self.decoder.finish()?;
                        self.state = SourceState::Draining;
                        continue;
                    }
                },
            };
            if let Sent::Again = self.decoder.send(&packet)? {
                self.pending = Some(packet);
            }
        }
    }
}

/// Next packet belonging to `stream_index`, or `None` at end of container.
fn read_stream_packet(
    input: &mut Input,
    stream_index: usize,
) -> Result<Option<Packet>, FramePickError> {
    loop {
        let mut packet = Packet::empty();
        match packet.read(input) {
            Ok(()) if packet.stream() == stream_index => return Ok(Some(packet)),
            Ok(()) => continue,
            Err(FfmpegError::Eof) => {
                log::debug!("End of container reached, draining stream #{stream_index}");
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        }
    }
}

/// Stateful decode pipeline over one video stream.
///
/// Dropping the source releases the demuxer, the decoder and its library
/// guard.
pub struct FrameSource {
    input: Input,
    pump: DecodePump<VideoDecoder>,
    stream_index: usize,
    _library: LibraryGuard,
}

impl FrameSource {
    /// Open `path` for streaming and bind a decoder to `info.stream_index`.
    ///
    /// `threads` is passed to the decoder as its internal parallelism hint;
    /// it never affects frame order.
    ///
    /// # Errors
    ///
    /// - [`FramePickError::InputNotFound`] / [`FramePickError::FileOpen`] if
    ///   the container cannot be opened.
    /// - [`FramePickError::NoSuitableStream`] if `info.stream_index` is not a
    ///   video stream of this container.
    /// - [`FramePickError::UnsupportedCodec`] if no decoder is registered.
    /// - [`FramePickError::ContextAllocationFailed`] if the decoder cannot
    ///   be instantiated or opened.
    pub fn open<P: AsRef<Path>>(
        path: P,
        info: &VideoInfo,
        threads: ThreadCount,
    ) -> Result<Self, FramePickError> {
        let path = path.as_ref();
        ensure_input_exists(path)?;

        let library = LibraryGuard::acquire()?;
        let input = open_container(path)?;

        let stream = input
            .stream(info.stream_index)
            .ok_or(FramePickError::NoSuitableStream)?;
        let parameters = stream.parameters();
        if parameters.medium() != Type::Video {
            return Err(FramePickError::NoSuitableStream);
        }

        let codec_id = parameters.id();
        let codec = ffmpeg_next::decoder::find(codec_id).ok_or_else(|| {
            FramePickError::UnsupportedCodec(format!("no decoder registered for {codec_id:?}"))
        })?;
        let codec_name = codec.name().to_string();

        let mut context = CodecContext::from_parameters(parameters).map_err(|error| {
            FramePickError::ContextAllocationFailed(format!("decoder context: {error}"))
        })?;
        context.set_threading(threading::Config {
            kind: threading::Type::Frame,
            count: threads.count(),
            ..threading::Config::default()
        });

        let decoder = context
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(|error| {
                FramePickError::ContextAllocationFailed(format!("cannot open decoder: {error}"))
            })?;

        log::debug!(
            "Opened decoder {} for stream #{} (threads={})",
            codec_name,
            info.stream_index,
            threads,
        );

        Ok(Self {
            input,
            pump: DecodePump::new(decoder),
            stream_index: info.stream_index,
            _library: library,
        })
    }

    /// Current protocol state.
    pub fn state(&self) -> SourceState {
        self.pump.state
    }

    /// Index of the stream this source decodes.
    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// Seek the selected stream to the latest keyframe at or before
    /// `timestamp`, then flush all decoder buffering.
    ///
    /// The landing position is usually *before* `timestamp`; callers must
    /// discard early frames themselves.
    ///
    /// # Errors
    ///
    /// Returns [`FramePickError::LibraryError`] carrying FFmpeg's seek
    /// status.
    pub fn seek(&mut self, timestamp: Timestamp) -> Result<(), FramePickError> {
        log::debug!(
            "Seeking stream #{} to {timestamp} (backward)",
            self.stream_index
        );

        let status = unsafe {
            avformat_seek_file(
                self.input.as_mut_ptr(),
                self.stream_index as i32,
                i64::MIN,
                timestamp,
                timestamp,
                0,
            )
        };
        if status < 0 {
            return Err(FfmpegError::from(status).into());
        }

        self.pump.reset();
        Ok(())
    }

    /// Return the next decoded frame, or `Ok(None)` once the stream is
    /// exhausted and the decoder has been drained.
    ///
    /// Frames already buffered inside the decoder are always returned before
    /// another packet is read. After `Ok(None)` every further call returns
    /// `Ok(None)` until the next [`seek`](FrameSource::seek).
    ///
    /// # Errors
    ///
    /// Demux and decode failures propagate as
    /// [`FramePickError::LibraryError`].
    pub fn next_frame(&mut self) -> Result<Option<DecodedFrame>, FramePickError> {
        let input = &mut self.input;
        let stream_index = self.stream_index;
        let was_exhausted = self.pump.state == SourceState::Exhausted;
        let frame = self
            .pump
            .next(|| read_stream_packet(input, stream_index))?;
        if frame.is_none() && !was_exhausted {
            log::debug!("Decoder for stream #{stream_index} drained");
        }
        Ok(frame.map(DecodedFrame::new))
    }

    /// Release the demuxer and decoder now rather than at end of scope.
    pub fn close(self) {
        log::debug!("Closing frame source for stream #{}", self.stream_index);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};

    use super::*;

    /// Decoder double: packet `n` decodes to frame `n`, the last `delay`
    /// frames are held back until end of input, and packets listed in
    /// `refuse_once` are rejected with "not ready" on their first attempt.
    #[derive(Default)]
    struct ScriptedDecoder {
        delay: usize,
        refuse_once: HashSet<u32>,
        buffered: VecDeque<u32>,
        finished: bool,
        sends: Vec<u32>,
        resets: usize,
    }

    impl Decode for ScriptedDecoder {
        type Packet = u32;
        type Frame = u32;

        fn receive(&mut self) -> Result<Received<u32>, FramePickError> {
            if self.buffered.len() > self.delay || (self.finished && !self.buffered.is_empty()) {
                return Ok(Received::Frame(self.buffered.pop_front().expect("buffered frame")));
            }
            if self.finished {
                Ok(Received::Eof)
            } else {
                Ok(Received::Again)
            }
        }

        fn send(&mut self, packet: &u32) -> Result<Sent, FramePickError> {
            assert!(!self.finished, "packet sent after end of input");
            self.sends.push(*packet);
            if self.refuse_once.remove(packet) {
                return Ok(Sent::Again);
            }
            self.buffered.push_back(*packet);
            Ok(Sent::Accepted)
        }

        fn finish(&mut self) -> Result<(), FramePickError> {
            self.finished = true;
            Ok(())
        }

        fn reset(&mut self) {
            self.buffered.clear();
            self.finished = false;
            self.resets += 1;
        }
    }

    fn drain(pump: &mut DecodePump<ScriptedDecoder>, packets: &mut VecDeque<u32>) -> Vec<u32> {
        let mut frames = Vec::new();
        while let Some(frame) = pump.next(|| Ok(packets.pop_front())).expect("decode failed") {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn buffered_frames_are_drained_at_end_of_input() {
        let mut pump = DecodePump::new(ScriptedDecoder {
            delay: 3,
            ..ScriptedDecoder::default()
        });
        let mut packets: VecDeque<u32> = (0..10).collect();

        assert_eq!(drain(&mut pump, &mut packets), (0..10).collect::<Vec<_>>());
        assert_eq!(pump.state, SourceState::Exhausted);
    }

    #[test]
    fn refused_packet_is_resubmitted_before_reading_more() {
        let mut pump = DecodePump::new(ScriptedDecoder {
            delay: 1,
            refuse_once: HashSet::from([2, 5]),
            ..ScriptedDecoder::default()
        });
        let mut packets: VecDeque<u32> = (0..7).collect();

        assert_eq!(drain(&mut pump, &mut packets), (0..7).collect::<Vec<_>>());
        assert_eq!(pump.decoder.sends, vec![0, 1, 2, 2, 3, 4, 5, 5, 6]);
    }

    #[test]
    fn refused_final_packet_is_sent_before_end_of_input() {
        let mut pump = DecodePump::new(ScriptedDecoder {
            delay: 2,
            refuse_once: HashSet::from([4]),
            ..ScriptedDecoder::default()
        });
        let mut packets: VecDeque<u32> = (0..5).collect();

        assert_eq!(drain(&mut pump, &mut packets), vec![0, 1, 2, 3, 4]);
        assert_eq!(pump.decoder.sends.last(), Some(&4));
    }

    #[test]
    fn end_of_stream_is_sticky_until_reset() {
        let mut pump = DecodePump::new(ScriptedDecoder::default());
        let mut packets: VecDeque<u32> = (0..2).collect();

        assert_eq!(drain(&mut pump, &mut packets), vec![0, 1]);
        for _ in 0..3 {
            let frame = pump.next(|| panic!("read after exhaustion")).expect("decode failed");
            assert_eq!(frame, None);
        }

        pump.reset();
        assert_eq!(pump.state, SourceState::Reading);
        assert_eq!(pump.decoder.resets, 1);

        let mut packets: VecDeque<u32> = VecDeque::from([7, 8]);
        assert_eq!(drain(&mut pump, &mut packets), vec![7, 8]);
    }

    #[test]
    fn reset_discards_a_pending_packet() {
        let mut pump = DecodePump::new(ScriptedDecoder::default());
        let mut packets: VecDeque<u32> = (0..3).collect();
        assert_eq!(pump.next(|| Ok(packets.pop_front())).expect("decode failed"), Some(0));

        pump.pending = Some(1);
        pump.reset();
        assert!(pump.pending.is_none());

        let mut packets: VecDeque<u32> = VecDeque::from([9]);
        assert_eq!(drain(&mut pump, &mut packets), vec![9]);
        assert_eq!(pump.decoder.sends, vec![0, 9]);
    }
}
