//! Process-wide FFmpeg lifecycle tests.
//!
//! Kept in a single test so no other test in this binary holds a guard
//! while the counts are checked.

use std::path::Path;

use framepick::{
    FrameSource, ImageEncoder, ImageOptions, LibraryGuard, StreamProbe, ThreadCount,
};

#[test]
fn construction_and_release_leave_no_residual_state() {
    assert_eq!(LibraryGuard::active_count(), 0);

    {
        let first = LibraryGuard::acquire().expect("First guard");
        let second = LibraryGuard::acquire().expect("Second guard");
        assert_eq!(LibraryGuard::active_count(), 2);
        drop(first);
        assert_eq!(LibraryGuard::active_count(), 1);
        drop(second);
    }
    assert_eq!(LibraryGuard::active_count(), 0);

    let path = "tests/fixtures/sample_video.mp4";
    if !Path::new(path).exists() {
        return;
    }

    // Twice to release everything, then a third time that must still work.
    for round in 0..3 {
        let info = StreamProbe::probe(path).expect("Probe failed");
        assert_eq!(LibraryGuard::active_count(), 0, "probe leaked a guard in round {round}");

        let mut source =
            FrameSource::open(path, &info, ThreadCount::Auto).expect("Source open failed");
        let encoder = ImageEncoder::new(
            info.width,
            info.height,
            info.pixel_format,
            &ImageOptions::default(),
        )
        .expect("Encoder failed");
        assert_eq!(LibraryGuard::active_count(), 2);

        assert!(source.next_frame().expect("Decode failed").is_some());
        encoder.close();
        source.close();
        assert_eq!(LibraryGuard::active_count(), 0);
    }
}
