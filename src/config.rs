//! Extraction configuration.
//!
//! [`ExtractOptions`] is a builder that carries the decoder thread hint, the
//! still-image output settings, the filename pattern and an optional
//! progress callback through [`FrameExtractor`](crate::FrameExtractor)
//! without widening every function signature.
//!
//! # Example
//!
//! ```no_run
//! use framepick::{ExtractOptions, ImageCodec, ThreadCount};
//!
//! let options = ExtractOptions::new()
//!     .with_threads(ThreadCount::Count(4))
//!     .with_codec(ImageCodec::Png)
//!     .with_resolution(Some(640), None)
//!     .with_pattern("shot-%05d.png");
//! ```

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    str::FromStr,
    sync::Arc,
};

use ffmpeg_next::{codec::Id, format::Pixel};

use crate::progress::{NoOpProgress, ProgressCallback};

/// Filename pattern used when none is configured.
pub const DEFAULT_PATTERN: &str = "frame-%d.jpg";

/// Decoder parallelism hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadCount {
    /// Let FFmpeg pick (passed as 0).
    #[default]
    Auto,
    /// Use exactly this many decoder threads.
    Count(usize),
}

impl ThreadCount {
    /// Value handed to the decoder context.
    pub fn count(self) -> usize {
        match self {
            ThreadCount::Auto => 0,
            ThreadCount::Count(count) => count,
        }
    }
}

impl Display for ThreadCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ThreadCount::Auto => write!(f, "auto"),
            ThreadCount::Count(count) => write!(f, "{count}"),
        }
    }
}

impl FromStr for ThreadCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ThreadCount::Auto);
        }
        match s.parse::<usize>() {
            Ok(0) => Ok(ThreadCount::Auto),
            Ok(count) => Ok(ThreadCount::Count(count)),
            Err(error) => Err(format!("invalid thread count '{s}': {error}")),
        }
    }
}

/// Still-image codec used to encode each extracted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageCodec {
    /// Baseline JPEG via FFmpeg's MJPEG encoder. This is the default.
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
    /// Uncompressed BMP.
    Bmp,
    /// TIFF.
    Tiff,
}

impl ImageCodec {
    pub(crate) fn codec_id(self) -> Id {
        match self {
            ImageCodec::Jpeg => Id::MJPEG,
            ImageCodec::Png => Id::PNG,
            ImageCodec::Bmp => Id::BMP,
            ImageCodec::Tiff => Id::TIFF,
        }
    }

    /// Pixel format the encoder accepts when none is configured.
    pub fn default_pixel_format(self) -> PixelFormat {
        match self {
            ImageCodec::Jpeg => PixelFormat::Yuvj420p,
            ImageCodec::Png | ImageCodec::Tiff => PixelFormat::Rgb8,
            ImageCodec::Bmp => PixelFormat::Bgr8,
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageCodec::Jpeg => "jpg",
            ImageCodec::Png => "png",
            ImageCodec::Bmp => "bmp",
            ImageCodec::Tiff => "tiff",
        }
    }
}

impl FromStr for ImageCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "mjpeg" => Ok(ImageCodec::Jpeg),
            "png" => Ok(ImageCodec::Png),
            "bmp" => Ok(ImageCodec::Bmp),
            "tif" | "tiff" => Ok(ImageCodec::Tiff),
            _ => Err(format!("unsupported image codec '{s}' (jpeg, png, bmp, tiff)")),
        }
    }
}

/// Pixel layout the converter produces for the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Full-range YUV 4:2:0 (JPEG).
    Yuvj420p,
    /// Full-range YUV 4:4:4 (JPEG).
    Yuvj444p,
    /// 8-bit RGB (24 bpp).
    Rgb8,
    /// 8-bit RGBA (32 bpp).
    Rgba8,
    /// 8-bit BGR (24 bpp).
    Bgr8,
    /// 8-bit grayscale.
    Gray8,
}

impl PixelFormat {
    /// Map to the corresponding FFmpeg pixel format constant.
    pub(crate) fn to_ffmpeg_pixel(self) -> Pixel {
        match self {
            PixelFormat::Yuvj420p => Pixel::YUVJ420P,
            PixelFormat::Yuvj444p => Pixel::YUVJ444P,
            PixelFormat::Rgb8 => Pixel::RGB24,
            PixelFormat::Rgba8 => Pixel::RGBA,
            PixelFormat::Bgr8 => Pixel::BGR24,
            PixelFormat::Gray8 => Pixel::GRAY8,
        }
    }
}

impl FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yuvj420p" => Ok(PixelFormat::Yuvj420p),
            "yuvj444p" => Ok(PixelFormat::Yuvj444p),
            "rgb8" | "rgb24" => Ok(PixelFormat::Rgb8),
            "rgba8" | "rgba" => Ok(PixelFormat::Rgba8),
            "bgr8" | "bgr24" => Ok(PixelFormat::Bgr8),
            "gray8" | "gray" => Ok(PixelFormat::Gray8),
            _ => Err(format!("unsupported pixel format '{s}'")),
        }
    }
}

/// Still-image output settings.
///
/// When no dimensions are set the source resolution is used. Setting one
/// dimension together with
/// [`maintain_aspect_ratio`](ImageOptions::maintain_aspect_ratio) computes
/// the other one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOptions {
    /// Encoder to use.
    pub codec: ImageCodec,
    /// Converter target format. `None` uses the codec's default.
    pub pixel_format: Option<PixelFormat>,
    /// Target width. `None` keeps the source width.
    pub width: Option<u32>,
    /// Target height. `None` keeps the source height.
    pub height: Option<u32>,
    /// Preserve the source aspect ratio when only one dimension is given.
    pub maintain_aspect_ratio: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            codec: ImageCodec::Jpeg,
            pixel_format: None,
            width: None,
            height: None,
            maintain_aspect_ratio: true,
        }
    }
}

impl ImageOptions {
    /// The pixel format actually handed to the encoder.
    pub fn effective_pixel_format(&self) -> PixelFormat {
        self.pixel_format
            .unwrap_or_else(|| self.codec.default_pixel_format())
    }

    /// Resolve the final output dimensions given the source size.
    ///
    /// Returns `(width, height)`.
    pub fn resolve_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) if self.maintain_aspect_ratio && source_width > 0 => {
                let ratio = f64::from(w) / f64::from(source_width);
                let h = (f64::from(source_height) * ratio).round() as u32;
                (w, h.max(1))
            }
            (Some(w), None) => (w, source_height),
            (None, Some(h)) if self.maintain_aspect_ratio && source_height > 0 => {
                let ratio = f64::from(h) / f64::from(source_height);
                let w = (f64::from(source_width) * ratio).round() as u32;
                (w.max(1), h)
            }
            (None, Some(h)) => (source_width, h),
            (None, None) => (source_width, source_height),
        }
    }
}

/// Configuration for [`FrameExtractor`](crate::FrameExtractor).
///
/// All fields have defaults; a default-constructed value extracts JPEGs at
/// source resolution named `frame-%d.jpg`.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) threads: ThreadCount,
    pub(crate) image: ImageOptions,
    pub(crate) pattern: String,
    pub(crate) overwrite: bool,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) batch_size: u64,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("threads", &self.threads)
            .field("image", &self.image)
            .field("pattern", &self.pattern)
            .field("overwrite", &self.overwrite)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            threads: ThreadCount::Auto,
            image: ImageOptions::default(),
            pattern: DEFAULT_PATTERN.to_string(),
            overwrite: true,
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    /// Set the decoder thread hint.
    #[must_use]
    pub fn with_threads(mut self, threads: ThreadCount) -> Self {
        self.threads = threads;
        self
    }

    /// Set the still-image codec.
    #[must_use]
    pub fn with_codec(mut self, codec: ImageCodec) -> Self {
        self.image.codec = codec;
        self
    }

    /// Override the converter's target pixel format.
    #[must_use]
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.image.pixel_format = Some(format);
        self
    }

    /// Set a custom output resolution. `None` keeps the source value for
    /// that dimension.
    #[must_use]
    pub fn with_resolution(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.image.width = width;
        self.image.height = height;
        self
    }

    /// Control whether aspect ratio is preserved when only one output
    /// dimension is specified. Defaults to `true`.
    #[must_use]
    pub fn with_maintain_aspect_ratio(mut self, maintain: bool) -> Self {
        self.image.maintain_aspect_ratio = maintain;
        self
    }

    /// Replace all image settings at once.
    #[must_use]
    pub fn with_image_options(mut self, image: ImageOptions) -> Self {
        self.image = image;
        self
    }

    /// Set the output filename pattern (one `%d` placeholder).
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Refuse to replace existing output files when `false`.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often the progress callback fires (every N emitted frames).
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Image output settings.
    pub fn image(&self) -> &ImageOptions {
        &self.image
    }

    /// Decoder thread hint.
    pub fn threads(&self) -> ThreadCount {
        self.threads
    }

    /// Filename pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}
