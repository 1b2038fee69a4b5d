//! Still-image encoding of decoded frames.
//!
//! [`ImageEncoder`] owns a pixel-format converter and an opened still-image
//! encoder. Each [`save`](ImageEncoder::save) converts one frame, encodes it
//! and writes the single resulting packet to disk verbatim.
//!
//! # Example
//!
//! ```no_run
//! use framepick::{FrameSource, ImageEncoder, ImageOptions, StreamProbe, ThreadCount};
//!
//! let info = StreamProbe::probe("input.mp4")?;
//! let mut source = FrameSource::open("input.mp4", &info, ThreadCount::Auto)?;
//! let mut encoder = ImageEncoder::new(
//!     info.width,
//!     info.height,
//!     info.pixel_format,
//!     &ImageOptions::default(),
//! )?;
//!
//! if let Some(frame) = source.next_frame()? {
//!     encoder.save(&frame, "out".as_ref(), "first.jpg")?;
//! }
//! # Ok::<(), framepick::FramePickError>(())
//! ```

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    encoder::video::Encoder as VideoEncoder,
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::error::EAGAIN,
};

use crate::{
    config::{ImageCodec, ImageOptions},
    error::FramePickError,
    ffmpeg::LibraryGuard,
    source::DecodedFrame,
};

/// What happened to one frame handed to [`ImageEncoder::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The encoded image was written to this path.
    Written(PathBuf),
    /// The encoder produced no packet for this frame; nothing was written.
    Skipped,
}

/// Source geometry the converter is currently built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceShape {
    format: Pixel,
    width: u32,
    height: u32,
}

/// Converter plus still-image encoder, built once per extraction.
pub struct ImageEncoder {
    encoder: VideoEncoder,
    scaler: ScalingContext,
    source: SourceShape,
    codec: ImageCodec,
    output_format: Pixel,
    width: u32,
    height: u32,
    overwrite: bool,
    sequence: i64,
    _library: LibraryGuard,
}

impl ImageEncoder {
    /// Build an encoder for frames of `source_width`×`source_height` in
    /// `source_format`, producing images as configured by `options`.
    ///
    /// # Errors
    ///
    /// - [`FramePickError::UnsupportedCodec`] if FFmpeg has no encoder for
    ///   the configured codec.
    /// - [`FramePickError::ContextAllocationFailed`] if the encoder context
    ///   cannot be created or opened.
    /// - [`FramePickError::ConverterUnavailable`] if no converter exists for
    ///   the source/target pixel format pair.
    pub fn new(
        source_width: u32,
        source_height: u32,
        source_format: Pixel,
        options: &ImageOptions,
    ) -> Result<Self, FramePickError> {
        let library = LibraryGuard::acquire()?;

        let (width, height) = options.resolve_dimensions(source_width, source_height);
        let output_format = options.effective_pixel_format().to_ffmpeg_pixel();

        let encoder = open_encoder(options.codec, width, height, output_format)?;

        let scaler = build_scaler(
            source_format,
            source_width,
            source_height,
            output_format,
            width,
            height,
        )?;

        log::debug!(
            "Image encoder ready: {:?} {width}x{height} {output_format:?} \
             (from {source_width}x{source_height} {source_format:?})",
            options.codec,
        );

        Ok(Self {
            encoder,
            scaler,
            source: SourceShape {
                format: source_format,
                width: source_width,
                height: source_height,
            },
            codec: options.codec,
            output_format,
            width,
            height,
            overwrite: true,
            sequence: 0,
            _library: library,
        })
    }

    /// Refuse to replace existing files when `false`.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Output dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Codec this encoder produces.
    pub fn codec(&self) -> ImageCodec {
        self.codec
    }

    /// Convert, encode and write `frame` as `directory/filename`.
    ///
    /// Returns [`SaveOutcome::Skipped`] if the encoder produced no packet.
    ///
    /// # Errors
    ///
    /// - [`FramePickError::ConverterUnavailable`] if the frame's format
    ///   changed and no converter can be built for it.
    /// - [`FramePickError::LibraryError`] if conversion or encoding fails.
    /// - [`FramePickError::IoError`] if the file cannot be written (including
    ///   an existing file when overwriting is disabled).
    pub fn save(
        &mut self,
        frame: &DecodedFrame,
        directory: &Path,
        filename: &str,
    ) -> Result<SaveOutcome, FramePickError> {
        let shape = SourceShape {
            format: frame.format(),
            width: frame.width(),
            height: frame.height(),
        };
        if shape != self.source {
            log::debug!(
                "Decoded frame changed to {}x{} {:?}, rebuilding converter",
                shape.width,
                shape.height,
                shape.format,
            );
            self.scaler = build_scaler(
                shape.format,
                shape.width,
                shape.height,
                self.output_format,
                self.width,
                self.height,
            )?;
            self.source = shape;
        }

        let mut converted = VideoFrame::new(self.output_format, self.width, self.height);
        self.scaler.run(frame.video(), &mut converted)?;
        converted.set_pts(Some(self.sequence));
        self.sequence += 1;

        self.encoder.send_frame(&converted)?;

        let mut packet = Packet::empty();
        match self.encoder.receive_packet(&mut packet) {
            Ok(()) => {}
            Err(FfmpegError::Other { errno: EAGAIN }) => {
                log::warn!("Encoder produced no packet for {filename}; skipping");
                // The frame is still queued inside; start over so it cannot
                // surface under the next filename.
                self.reopen()?;
                return Ok(SaveOutcome::Skipped);
            }
            Err(error) => return Err(error.into()),
        }

        let path = directory.join(filename);
        let bytes = packet.data().unwrap_or_default();
        if self.overwrite {
            fs::write(&path, bytes)?;
        } else {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)?
                .write_all(bytes)?;
        }

        log::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(SaveOutcome::Written(path))
    }

    /// Replace the encoder with a freshly opened one, dropping anything
    /// queued inside it.
    fn reopen(&mut self) -> Result<(), FramePickError> {
        self.encoder = open_encoder(self.codec, self.width, self.height, self.output_format)?;
        Ok(())
    }

    /// Release the encoder and converter now rather than at end of scope.
    pub fn close(self) {
        log::debug!("Closing {:?} image encoder", self.codec);
    }
}

fn open_encoder(
    image_codec: ImageCodec,
    width: u32,
    height: u32,
    output_format: Pixel,
) -> Result<VideoEncoder, FramePickError> {
    let codec_id = image_codec.codec_id();
    let codec = ffmpeg_next::encoder::find(codec_id).ok_or_else(|| {
        FramePickError::UnsupportedCodec(format!("no encoder registered for {codec_id:?}"))
    })?;

    let mut encoder = CodecContext::new_with_codec(codec)
        .encoder()
        .video()
        .map_err(|error| {
            FramePickError::ContextAllocationFailed(format!("encoder context: {error}"))
        })?;
    encoder.set_width(width);
    encoder.set_height(height);
    encoder.set_format(output_format);
    encoder.set_time_base(Rational::new(1, 25));

    encoder.open_as(codec).map_err(|error| {
        FramePickError::ContextAllocationFailed(format!(
            "cannot open {} encoder: {error}",
            codec.name()
        ))
    })
}

fn build_scaler(
    source_format: Pixel,
    source_width: u32,
    source_height: u32,
    output_format: Pixel,
    width: u32,
    height: u32,
) -> Result<ScalingContext, FramePickError> {
    ScalingContext::get(
        source_format,
        source_width,
        source_height,
        output_format,
        width,
        height,
        ScalingFlags::BILINEAR,
    )
    .map_err(|error| {
        FramePickError::ConverterUnavailable(format!(
            "{source_format:?} {source_width}x{source_height} -> {output_format:?} {width}x{height}: {error}"
        ))
    })
}
