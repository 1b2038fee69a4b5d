//! End-to-end extraction tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::{fs, io::ErrorKind, path::Path};

use framepick::{
    ExtractOptions, FrameExtractor, FramePickError, ImageCodec, StopReason, TimePoint,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn file_names(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(directory)
        .expect("Output directory missing")
        .map(|entry| entry.expect("Bad entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn extracts_frame_range() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let extractor = FrameExtractor::open(path).expect("Failed to open fixture");
    let summary = extractor
        .extract(output.path(), TimePoint::Frame(10), TimePoint::Frame(19))
        .expect("Extraction failed");

    assert_eq!(summary.first_frame_index, 10);
    assert_eq!(summary.frames_written, 10);
    assert_eq!(summary.frames_skipped, 0);
    assert_eq!(summary.stop, StopReason::RangeExhausted);

    let expected: Vec<String> = {
        let mut names: Vec<String> = (10..=19).map(|i| format!("frame-{i}.jpg")).collect();
        names.sort();
        names
    };
    assert_eq!(file_names(output.path()), expected);
}

#[test]
fn extracts_millisecond_range_mid_gop() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let options = ExtractOptions::new().with_pattern("shot-%04d.jpg");
    let summary = framepick::extract(
        path,
        output.path(),
        TimePoint::Millisecond(1_500),
        TimePoint::Millisecond(2_000),
        &options,
    )
    .expect("Extraction failed");

    // 1.5 s at 30 fps is frame 45, halfway between keyframes 30 and 60.
    assert_eq!(summary.first_frame_index, 45);
    assert!(summary.frames_discarded > 0, "Seek should land before frame 45");
    assert!((15..=16).contains(&summary.frames_written));
    assert!(output.path().join("shot-0045.jpg").exists());
    assert!(!output.path().join("shot-0044.jpg").exists());
}

#[test]
fn open_ended_range_runs_to_end_of_stream() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let extractor = FrameExtractor::open(path).expect("Failed to open fixture");
    let last = extractor.info().frame_count.expect("Frame count") - 1;
    let summary = extractor
        .extract(output.path(), TimePoint::Frame(140), TimePoint::End)
        .expect("Extraction failed");

    assert_eq!(summary.stop, StopReason::EndOfStream);
    assert_eq!(summary.next_frame_index(), last + 1);
    assert!(output.path().join(format!("frame-{last}.jpg")).exists());
}

#[test]
fn creates_nested_output_directory() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let nested = output.path().join("a").join("b");
    let options = ExtractOptions::new()
        .with_codec(ImageCodec::Png)
        .with_pattern("f%02d.png")
        .with_resolution(Some(160), None);
    let summary = framepick::extract(
        path,
        &nested,
        TimePoint::Frame(0),
        TimePoint::Frame(2),
        &options,
    )
    .expect("Extraction failed");

    assert_eq!(summary.frames_written, 3);
    assert_eq!(file_names(&nested), vec!["f00.png", "f01.png", "f02.png"]);
}

#[test]
fn no_overwrite_fails_on_second_run() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let extractor = FrameExtractor::open(path).expect("Failed to open fixture");
    extractor
        .extract(output.path(), TimePoint::Frame(0), TimePoint::Frame(1))
        .expect("First run failed");

    let strict = extractor
        .clone()
        .with_options(ExtractOptions::new().with_overwrite(false));
    match strict.extract(output.path(), TimePoint::Frame(0), TimePoint::Frame(1)) {
        Err(FramePickError::IoError(error)) => assert_eq!(error.kind(), ErrorKind::AlreadyExists),
        other => panic!("Expected AlreadyExists, got {other:?}"),
    }
}

#[test]
fn single_frame_range() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let summary = framepick::extract(
        path,
        output.path(),
        TimePoint::Frame(75),
        TimePoint::Frame(75),
        &ExtractOptions::new(),
    )
    .expect("Extraction failed");

    assert_eq!(summary.frames_written, 1);
    assert_eq!(file_names(output.path()), vec!["frame-75.jpg"]);
}
