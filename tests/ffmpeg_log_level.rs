//! FFmpeg console log level tests.
//!
//! The level is process-wide, so everything lives in one test.

use framepick::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};

#[test]
fn log_level_round_trips_through_ffmpeg() {
    for level in [
        FfmpegLogLevel::Quiet,
        FfmpegLogLevel::Error,
        FfmpegLogLevel::Warning,
        FfmpegLogLevel::Info,
        FfmpegLogLevel::Debug,
        FfmpegLogLevel::Trace,
    ] {
        set_ffmpeg_log_level(level);
        assert_eq!(get_ffmpeg_log_level(), Some(level));
    }

    let parsed = FfmpegLogLevel::from_name("warn").expect("Known level name");
    set_ffmpeg_log_level(parsed);
    assert_eq!(get_ffmpeg_log_level(), Some(FfmpegLogLevel::Warning));
    assert_eq!(FfmpegLogLevel::from_name("loud"), None);
}
