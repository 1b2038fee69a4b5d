//! ImageEncoder integration tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::{fs, io::ErrorKind, path::Path};

use framepick::{
    DecodedFrame, FramePickError, FrameSource, ImageCodec, ImageEncoder, ImageOptions,
    PixelFormat, SaveOutcome, StreamProbe, ThreadCount, VideoInfo,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn first_frame() -> Option<(VideoInfo, DecodedFrame)> {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return None;
    }
    let info = StreamProbe::probe(path).expect("Failed to probe fixture");
    let mut source = FrameSource::open(path, &info, ThreadCount::Auto).expect("Failed to open");
    let frame = source
        .next_frame()
        .expect("Decode failed")
        .expect("Fixture has frames");
    Some((info, frame))
}

fn encoder_for(info: &VideoInfo, options: &ImageOptions) -> ImageEncoder {
    ImageEncoder::new(info.width, info.height, info.pixel_format, options)
        .expect("Failed to build encoder")
}

fn written_path(outcome: SaveOutcome) -> std::path::PathBuf {
    match outcome {
        SaveOutcome::Written(path) => path,
        SaveOutcome::Skipped => panic!("Encoder produced no image"),
    }
}

#[test]
fn writes_jpeg() {
    let Some((info, frame)) = first_frame() else {
        return;
    };
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut encoder = encoder_for(&info, &ImageOptions::default());
    assert_eq!(encoder.dimensions(), (640, 480));

    let path = written_path(
        encoder
            .save(&frame, directory.path(), "first.jpg")
            .expect("Save failed"),
    );

    assert_eq!(path, directory.path().join("first.jpg"));
    let bytes = fs::read(&path).expect("Output missing");
    assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG start-of-image marker");
}

#[test]
fn writes_scaled_png() {
    let Some((info, frame)) = first_frame() else {
        return;
    };
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let options = ImageOptions {
        codec: ImageCodec::Png,
        width: Some(320),
        ..ImageOptions::default()
    };
    let mut encoder = encoder_for(&info, &options);
    assert_eq!(encoder.dimensions(), (320, 240));

    let path = written_path(
        encoder
            .save(&frame, directory.path(), "small.png")
            .expect("Save failed"),
    );

    let bytes = fs::read(path).expect("Output missing");
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    // IHDR width and height, big-endian.
    assert_eq!(u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]), 320);
    assert_eq!(u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]), 240);
}

#[test]
fn writes_grayscale_png() {
    let Some((info, frame)) = first_frame() else {
        return;
    };
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let options = ImageOptions {
        codec: ImageCodec::Png,
        pixel_format: Some(PixelFormat::Gray8),
        ..ImageOptions::default()
    };
    let mut encoder = encoder_for(&info, &options);

    let path = written_path(
        encoder
            .save(&frame, directory.path(), "gray.png")
            .expect("Save failed"),
    );

    let bytes = fs::read(path).expect("Output missing");
    // IHDR colour type 0 is grayscale.
    assert_eq!(bytes[25], 0);
}

#[test]
fn overwrite_disabled_refuses_existing_file() {
    let Some((info, frame)) = first_frame() else {
        return;
    };
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(directory.path().join("taken.jpg"), b"keep me").expect("Failed to seed file");

    let mut encoder = encoder_for(&info, &ImageOptions::default()).with_overwrite(false);
    let result = encoder.save(&frame, directory.path(), "taken.jpg");

    match result {
        Err(FramePickError::IoError(error)) => assert_eq!(error.kind(), ErrorKind::AlreadyExists),
        other => panic!("Expected AlreadyExists, got {other:?}"),
    }
    assert_eq!(
        fs::read(directory.path().join("taken.jpg")).expect("Seed file missing"),
        b"keep me"
    );
}

#[test]
fn overwrite_enabled_replaces_existing_file() {
    let Some((info, frame)) = first_frame() else {
        return;
    };
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(directory.path().join("taken.jpg"), b"old").expect("Failed to seed file");

    let mut encoder = encoder_for(&info, &ImageOptions::default());
    encoder
        .save(&frame, directory.path(), "taken.jpg")
        .expect("Save failed");

    let bytes = fs::read(directory.path().join("taken.jpg")).expect("Output missing");
    assert_ne!(bytes, b"old");
}

#[test]
fn converter_follows_frame_geometry() {
    let Some((info, frame)) = first_frame() else {
        return;
    };
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    // Built for a smaller source than the frames actually delivered.
    let mut encoder = ImageEncoder::new(
        info.width / 2,
        info.height / 2,
        info.pixel_format,
        &ImageOptions::default(),
    )
    .expect("Failed to build encoder");

    let outcome = encoder
        .save(&frame, directory.path(), "rebuilt.jpg")
        .expect("Save failed");
    assert!(matches!(outcome, SaveOutcome::Written(_)));
    encoder.close();
}
