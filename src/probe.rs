//! Video stream probing.
//!
//! [`StreamProbe`] opens a container, lets FFmpeg rank its streams, and
//! reads just enough codec parameters to describe the best video stream as
//! a [`VideoInfo`]. No decoder is opened and every handle is closed before
//! the call returns.

use std::{
    ffi::CString,
    fs,
    path::{Path, PathBuf},
    ptr,
};

use ffmpeg_next::{
    Rational, Rescale, codec::context::Context as CodecContext, format::Pixel,
    format::context::Input, media::Type,
};
use ffmpeg_sys_next::{
    AV_NOPTS_VALUE, avformat_close_input, avformat_find_stream_info, avformat_open_input,
};

use crate::{
    error::FramePickError, ffmpeg::LibraryGuard, metadata::VideoInfo, time::timestamp_to_frame,
};

/// Stateless entry point for probing a media file.
///
/// # Example
///
/// ```no_run
/// use framepick::StreamProbe;
///
/// let info = StreamProbe::probe("input.mp4")?;
/// println!("{} frames (approx.)", info.frame_count.unwrap_or(0));
/// # Ok::<(), framepick::FramePickError>(())
/// ```
pub struct StreamProbe;

impl StreamProbe {
    /// Probe `path` and describe its best video stream.
    ///
    /// # Errors
    ///
    /// - [`FramePickError::InputNotFound`] if the path cannot be accessed.
    /// - [`FramePickError::FileOpen`] if no demuxer accepts the file.
    /// - [`FramePickError::StreamInfoUnavailable`] if stream discovery fails.
    /// - [`FramePickError::NoSuitableStream`] if there is no video stream.
    /// - [`FramePickError::UnsupportedCodec`] if no decoder is registered
    ///   for the stream's codec.
    /// - [`FramePickError::InvalidTiming`] if the stream has no usable time
    ///   base or frame rate.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<VideoInfo, FramePickError> {
        let path = path.as_ref();
        ensure_input_exists(path)?;

        let _library = LibraryGuard::acquire()?;
        let input = open_container(path)?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or(FramePickError::NoSuitableStream)?;
        let stream_index = stream.index();

        let parameters = stream.parameters();
        let codec_id = parameters.id();
        if ffmpeg_next::decoder::find(codec_id).is_none() {
            return Err(FramePickError::UnsupportedCodec(format!(
                "no decoder registered for {codec_id:?}"
            )));
        }

        // Parameter-only context: copies AVCodecParameters without opening
        // a decoder.
        let context = CodecContext::from_parameters(parameters).map_err(|error| {
            FramePickError::ContextAllocationFailed(format!(
                "cannot read codec parameters of stream {stream_index}: {error}"
            ))
        })?;
        let (width, height, pixel_format) = unsafe {
            let raw = &*context.as_ptr();
            (
                raw.width.max(0) as u32,
                raw.height.max(0) as u32,
                Pixel::from(raw.pix_fmt),
            )
        };

        let time_base = stream.time_base();
        let frame_rate = select_frame_rate(stream.avg_frame_rate(), stream.rate());

        let start_time = match stream.start_time() {
            AV_NOPTS_VALUE => None,
            start => Some(start),
        };

        let duration = if stream.duration() > 0 {
            Some(stream.duration())
        } else if input.duration() > 0 && time_base.numerator() > 0 {
            Some(input.duration().rescale(ffmpeg_next::rescale::TIME_BASE, time_base))
        } else {
            None
        };

        let mut info = VideoInfo {
            stream_index,
            width,
            height,
            pixel_format,
            frame_rate,
            time_base,
            start_time,
            duration,
            frame_count: None,
        };
        info.validate()?;

        info.frame_count = if stream.frames() > 0 {
            Some(stream.frames() as u64)
        } else {
            info.end_timestamp()
                .map(|end| timestamp_to_frame(end, &info))
        };

        log::info!(
            "Probed {}: stream #{}, {}x{} {:?}, {}/{} fps, time base {}/{}, ~{} frames",
            path.display(),
            info.stream_index,
            info.width,
            info.height,
            info.pixel_format,
            info.frame_rate.numerator(),
            info.frame_rate.denominator(),
            info.time_base.numerator(),
            info.time_base.denominator(),
            info.frame_count.unwrap_or(0),
        );

        Ok(info)
    }
}

/// Prefer the average frame rate; fall back to the stream's base rate when
/// the container does not report one.
fn select_frame_rate(average: Rational, base: Rational) -> Rational {
    if average.numerator() > 0 && average.denominator() > 0 {
        average
    } else {
        base
    }
}

/// Fail with [`FramePickError::InputNotFound`] before touching FFmpeg.
pub(crate) fn ensure_input_exists(path: &Path) -> Result<(), FramePickError> {
    fs::metadata(path)
        .map(|_| ())
        .map_err(|_| FramePickError::InputNotFound {
            path: path.to_path_buf(),
        })
}

/// Open a container and run stream-info discovery as two separate steps so
/// each failure surfaces as its own error kind.
pub(crate) fn open_container(path: &Path) -> Result<Input, FramePickError> {
    let open_error = |reason: String| FramePickError::FileOpen {
        path: PathBuf::from(path),
        reason,
    };

    let url = path
        .to_str()
        .ok_or_else(|| open_error("path is not valid UTF-8".to_string()))?;
    let url = CString::new(url)
        .map_err(|_| open_error("path contains an interior NUL byte".to_string()))?;

    unsafe {
        let mut context = ptr::null_mut();
        let status =
            avformat_open_input(&mut context, url.as_ptr(), ptr::null_mut(), ptr::null_mut());
        if status < 0 {
            return Err(open_error(ffmpeg_next::Error::from(status).to_string()));
        }

        let status = avformat_find_stream_info(context, ptr::null_mut());
        if status < 0 {
            avformat_close_input(&mut context);
            return Err(FramePickError::StreamInfoUnavailable {
                path: PathBuf::from(path),
                reason: ffmpeg_next::Error::from(status).to_string(),
            });
        }

        log::debug!("Opened container {}", path.display());
        Ok(Input::wrap(context))
    }
}
