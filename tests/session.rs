//! End-to-end session tests against synthetic capture sources.
//!
//! Wall-clock durations are kept short; the assertions leave generous room
//! for scheduling jitter since pacing is best-effort by design.

use recap::capture::fake::{SyntheticAudioSource, SyntheticFrameSource};
use recap::{CaptureRegion, Recorder, RecorderError, SessionConfig};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn record_for(recorder: &mut Recorder, millis: u64) -> recap::SessionSummary {
    thread::sleep(Duration::from_millis(millis));
    recorder.stop().unwrap()
}

#[test]
fn test_video_only_session_produces_playable_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("video-only.mp4");
    let mut config = SessionConfig::new(&path);
    config.frame_rate = 30;

    let mut recorder = Recorder::new();
    recorder
        .start_with_sources(config, Box::new(SyntheticFrameSource::new(64, 48)), None)
        .unwrap();
    assert!(recorder.is_running());

    let summary = record_for(&mut recorder, 700);
    assert!(!recorder.is_running());

    assert_eq!(summary.output_path, path);
    assert_eq!((summary.width, summary.height), (64, 48));
    assert!(summary.frames_encoded > 0);
    assert_eq!(summary.audio_blocks_encoded, 0);
    assert_eq!(summary.audio_packets_muxed, 0);
    // ~21 frames nominal at 30fps over 700ms; allow heavy jitter both ways.
    assert!(
        (3..=45).contains(&summary.frames_encoded),
        "encoded {} frames",
        summary.frames_encoded
    );

    assert!(path.exists());
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}

#[test]
fn test_odd_region_is_clamped_and_audio_recorded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clamped.mp4");
    let mut config = SessionConfig::new(&path);
    config.frame_rate = 25;
    config.audio_enabled = true;
    config.region = Some(CaptureRegion::new(0, 0, 641, 480));

    let mut recorder = Recorder::new();
    recorder
        .start_with_sources(
            config,
            // The source really delivers 641x480; every frame goes through
            // the resize-to-even path.
            Box::new(SyntheticFrameSource::new(641, 480)),
            Some(Box::new(SyntheticAudioSource::new())),
        )
        .unwrap();

    let summary = record_for(&mut recorder, 600);

    assert_eq!((summary.width, summary.height), (640, 480));
    assert!(summary.frames_encoded > 0);
    // ~26 blocks nominal (23ms each) over 600ms.
    assert!(
        summary.audio_blocks_encoded >= 5,
        "encoded {} audio blocks",
        summary.audio_blocks_encoded
    );
    // The container must have accepted the audio, not just the encoder.
    assert!(
        summary.audio_packets_muxed > 0,
        "no audio packet reached the container"
    );
    assert!(path.exists());
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}

#[test]
fn test_audio_device_failure_fails_start_and_leaves_no_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("no-device.mp4");
    let mut config = SessionConfig::new(&path);
    config.audio_enabled = true;

    let mut recorder = Recorder::new();
    let result = recorder.start_with_sources(
        config,
        Box::new(SyntheticFrameSource::new(64, 48)),
        // Audio requested but the device could not be opened.
        None,
    );

    assert!(matches!(result, Err(RecorderError::DeviceUnavailable(_))));
    assert!(!recorder.is_running());
    assert!(!path.exists(), "failed start left an output file behind");
}

#[test]
fn test_transient_grab_failure_does_not_abort_session() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("transient.mp4");
    let config = SessionConfig::new(&path);

    let mut recorder = Recorder::new();
    recorder
        .start_with_sources(
            config,
            Box::new(SyntheticFrameSource::new(64, 48).failing_on(2)),
            None,
        )
        .unwrap();

    let summary = record_for(&mut recorder, 500);

    assert!(summary.frames_encoded > 0);
    assert!(summary.frames_dropped >= 1);
    assert!(path.exists());
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}

#[test]
fn test_audio_overflow_is_skipped_not_fatal() {
    let dir = tempdir().unwrap();
    let mut config = SessionConfig::new(dir.path().join("overflow.mp4"));
    config.audio_enabled = true;

    let mut recorder = Recorder::new();
    recorder
        .start_with_sources(
            config,
            Box::new(SyntheticFrameSource::new(64, 48)),
            Some(Box::new(SyntheticAudioSource::new().overflowing_on(1))),
        )
        .unwrap();

    let summary = record_for(&mut recorder, 400);

    assert!(summary.audio_blocks_encoded > 0);
    assert!(summary.audio_blocks_skipped >= 1);
    assert!(summary.audio_packets_muxed > 0);
}

#[test]
fn test_stop_is_idempotent_on_resources() {
    let dir = tempdir().unwrap();
    let config = SessionConfig::new(dir.path().join("idempotent.mp4"));

    let mut recorder = Recorder::new();
    recorder
        .start_with_sources(config, Box::new(SyntheticFrameSource::new(64, 48)), None)
        .unwrap();

    record_for(&mut recorder, 200);
    assert!(matches!(
        recorder.stop(),
        Err(RecorderError::InvalidState(_))
    ));
}

#[test]
fn test_start_while_running_is_rejected() {
    let dir = tempdir().unwrap();
    let config = SessionConfig::new(dir.path().join("first.mp4"));

    let mut recorder = Recorder::new();
    recorder
        .start_with_sources(
            config,
            Box::new(SyntheticFrameSource::new(64, 48)),
            None,
        )
        .unwrap();

    let second = SessionConfig::new(dir.path().join("second.mp4"));
    let result = recorder.start_with_sources(
        second,
        Box::new(SyntheticFrameSource::new(64, 48)),
        None,
    );
    assert!(matches!(result, Err(RecorderError::InvalidState(_))));

    recorder.stop().unwrap();
}

#[test]
fn test_no_writes_after_stop_returns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sealed.mp4");
    let config = SessionConfig::new(&path);

    let mut recorder = Recorder::new();
    recorder
        .start_with_sources(config, Box::new(SyntheticFrameSource::new(64, 48)), None)
        .unwrap();

    record_for(&mut recorder, 300);

    let len_after_stop = std::fs::metadata(&path).unwrap().len();
    thread::sleep(Duration::from_millis(300));
    assert_eq!(std::fs::metadata(&path).unwrap().len(), len_after_stop);
}

#[test]
fn test_summary_duration_tracks_wall_clock() {
    let dir = tempdir().unwrap();
    let config = SessionConfig::new(dir.path().join("duration.mp4"));

    let mut recorder = Recorder::new();
    recorder
        .start_with_sources(config, Box::new(SyntheticFrameSource::new(64, 48)), None)
        .unwrap();

    let summary = record_for(&mut recorder, 500);
    assert!(
        summary.duration_secs >= 0.4 && summary.duration_secs < 5.0,
        "duration was {}",
        summary.duration_secs
    );
}
