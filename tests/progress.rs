//! Progress callback integration tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use framepick::{ExtractOptions, ProgressCallback, ProgressInfo, TimePoint};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

#[derive(Default)]
struct RecordingProgress {
    reports: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(info.clone());
    }
}

fn run(options: ExtractOptions, from: TimePoint, to: TimePoint) -> Option<Vec<ProgressInfo>> {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return None;
    }

    let recorder = Arc::new(RecordingProgress::default());
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    framepick::extract(
        path,
        output.path(),
        from,
        to,
        &options.with_progress(recorder.clone()),
    )
    .expect("Extraction failed");

    let reports = recorder.reports.lock().expect("Poisoned").clone();
    Some(reports)
}

#[test]
fn reports_every_frame_and_once_at_the_end() {
    let Some(reports) = run(ExtractOptions::new(), TimePoint::Frame(0), TimePoint::Frame(9)) else {
        return;
    };

    assert_eq!(reports.len(), 11);
    for (position, report) in reports.iter().take(10).enumerate() {
        assert_eq!(report.current, position as u64 + 1);
        assert_eq!(report.frame_index, Some(position as u64));
        assert!(report.timestamp.is_some());
        assert_eq!(report.total, Some(10));
    }

    let last = reports.last().expect("Final report");
    assert_eq!(last.current, 10);
    assert_eq!(last.percentage, Some(100.0));
    assert_eq!(last.frame_index, None);
}

#[test]
fn batch_size_limits_reports() {
    let Some(reports) = run(
        ExtractOptions::new().with_batch_size(4),
        TimePoint::Frame(20),
        TimePoint::Frame(29),
    ) else {
        return;
    };

    // After frames 4 and 8, then the final report.
    let currents: Vec<u64> = reports.iter().map(|report| report.current).collect();
    assert_eq!(currents, vec![4, 8, 10]);
    assert_eq!(reports[0].frame_index, Some(23));
}

#[test]
fn open_ended_total_comes_from_frame_count() {
    let Some(reports) = run(
        ExtractOptions::new().with_batch_size(1_000),
        TimePoint::Frame(145),
        TimePoint::End,
    ) else {
        return;
    };

    let last = reports.last().expect("Final report");
    assert_eq!(last.total, Some(5));
    assert_eq!(last.current, 5);
}
