use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use perception_overlay::config::OverlayOptions;
use perception_overlay::error::OverlayError;
use perception_overlay::fixture::{FixtureAttributes, FixtureMesh, FixturePose, FixtureVideo};
use perception_overlay::image::{Image, Resolution};
use perception_overlay::model::Frame;
use perception_overlay::orchestrator::Orchestrator;
use perception_overlay::scheduler::{FrameScheduler, Host, IntervalClock, SyncState, VideoSource};
use perception_overlay::telemetry::BufferSink;
use perception_overlay::toggle::{Toggle, ToggleSet, Toggles};

type FixtureOrchestrator = Orchestrator<FixtureMesh, FixturePose, FixtureAttributes>;

fn orchestrator() -> FixtureOrchestrator {
    Orchestrator::new(
        FixtureMesh::new(),
        FixturePose::new(),
        FixtureAttributes::new(),
    )
}

fn scheduler() -> FrameScheduler {
    let options = OverlayOptions::default()
        .sync_interval(Duration::from_millis(10))
        .thread_name("overlay-test");
    FrameScheduler::new(&options)
}

fn host(toggles: &Toggles, telemetry: &BufferSink) -> Host {
    Host::new(toggles.clone())
        .clock(IntervalClock::from_hz(200))
        .telemetry(telemetry.clone())
}

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

fn parse(line: &str) -> serde_json::Value {
    serde_json::from_str(line).unwrap()
}

#[test]
fn runs_and_draws() {
    let toggles = Toggles::default();
    let telemetry = BufferSink::new();
    let fps = Arc::new(Mutex::new(Vec::new()));
    let fps2 = fps.clone();
    let host = host(&toggles, &telemetry)
        .fps_display(move |text: &str| fps2.lock().unwrap().push(text.to_string()));

    let mut handle = scheduler()
        .spawn(
            orchestrator(),
            FixtureVideo::new(Resolution::VGA),
            Image::new(0, 0),
            host,
        )
        .unwrap();

    wait_until("5 frames", || telemetry.len() >= 5);
    assert_eq!(handle.state(), SyncState::Running);
    handle.cancel();
    let surface = handle.join().unwrap();

    assert_eq!(surface.resolution(), Resolution::VGA);
    assert!(!surface.is_blank());

    let records = telemetry.take();
    let first = parse(&records[0]);
    assert_eq!(first["frame"], 0);
    assert_eq!(first["mesh"].as_array().unwrap().len(), 1);
    assert_eq!(first["pose"][0]["keypoints"].as_array().unwrap().len(), 17);
    let neutral = first["attributes"][0]["expressions"]["neutral"].as_f64().unwrap();
    assert!((neutral - 0.4).abs() < 1e-6);

    let fps = fps.lock().unwrap();
    assert!(fps.len() >= 5);
    assert_eq!(fps[0], "FPS: 1");
    assert!(fps.iter().all(|text| text.starts_with("FPS: ")));
}

#[test]
fn toggles_apply_to_next_frame() {
    let toggles = Toggles::new(ToggleSet::NONE.with(Toggle::DataLog, true));
    let telemetry = BufferSink::new();
    let handle = scheduler()
        .spawn(
            orchestrator(),
            FixtureVideo::new(Resolution::VGA),
            Image::new(0, 0),
            host(&toggles, &telemetry),
        )
        .unwrap();

    wait_until("a frame", || !telemetry.is_empty());
    for line in telemetry.take() {
        let record = parse(&line);
        assert!(record["mesh"].is_null());
        assert!(record["pose"].is_null());
        assert!(record["attributes"].is_null());
    }

    toggles.set(Toggle::Pose, true);
    wait_until("pose output", || {
        telemetry
            .take()
            .iter()
            .any(|line| parse(line)["pose"].is_array())
    });

    toggles.set(Toggle::DataLog, false);
    // One frame may already be in flight when the toggle flips.
    thread::sleep(Duration::from_millis(50));
    telemetry.take();
    thread::sleep(Duration::from_millis(50));
    assert!(telemetry.is_empty());

    drop(handle);
}

#[test]
fn bootstrap_failure_is_fatal() {
    let telemetry = BufferSink::new();
    let orchestrator = Orchestrator::new(
        FixtureMesh::new(),
        FixturePose::new(),
        FixtureAttributes::with_weights(["tiny_face_detector", "face_expression"]),
    );
    let handle = scheduler()
        .spawn(
            orchestrator,
            FixtureVideo::new(Resolution::VGA),
            Image::new(0, 0),
            host(&Toggles::default(), &telemetry),
        )
        .unwrap();

    wait_until("loop exit", || handle.is_finished());
    assert_eq!(handle.state(), SyncState::Idle);
    let err = handle.join().unwrap_err();
    let overlay_err = err.downcast_ref::<OverlayError>().unwrap();
    assert!(!overlay_err.is_recoverable());
    match overlay_err {
        OverlayError::ModelBootstrap { model, .. } => assert_eq!(model, "fixture attributes"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(format!("{err:#}").contains("age_gender"));
    assert!(telemetry.is_empty());
}

#[test]
fn waits_for_video_size() {
    let telemetry = BufferSink::new();
    let mut handle = scheduler()
        .spawn(
            orchestrator(),
            FixtureVideo::new(Resolution::VGA).loading_for(u32::MAX),
            Image::new(0, 0),
            host(&Toggles::default(), &telemetry),
        )
        .unwrap();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(handle.state(), SyncState::Idle);

    // Cancellation interrupts the startup wait.
    handle.cancel();
    let surface = handle.join().unwrap();
    assert!(surface.resolution().is_empty());
    assert!(telemetry.is_empty());
}

#[test]
fn no_frames_before_running() {
    let sync_interval = Duration::from_millis(300);
    let options = OverlayOptions::default()
        .sync_interval(sync_interval)
        .thread_name("overlay-gating");
    let telemetry = BufferSink::new();
    let start = Instant::now();
    let handle = FrameScheduler::new(&options)
        .spawn(
            orchestrator(),
            FixtureVideo::new(Resolution::VGA),
            Image::new(0, 0),
            host(&Toggles::default(), &telemetry),
        )
        .unwrap();

    let mut seen_armed = false;
    loop {
        // Telemetry is read before the state, so a frame can't sneak in between the two reads.
        let frames = telemetry.len();
        match handle.state() {
            SyncState::Idle => {}
            SyncState::Armed => {
                seen_armed = true;
                assert_eq!(frames, 0, "frame processed before the loop was running");
            }
            SyncState::Running => break,
        }
        assert!(start.elapsed() < Duration::from_secs(10), "loop never started");
        thread::sleep(Duration::from_millis(5));
    }
    let running_after = start.elapsed();

    assert!(seen_armed);
    assert!(
        running_after >= sync_interval,
        "second confirmation after {running_after:?}"
    );
    wait_until("a frame", || !telemetry.is_empty());
    drop(handle);
}

/// Plays a few frames, then fails like a video element whose source went away.
struct FailingVideo {
    inner: FixtureVideo,
    frames_left: u32,
}

impl VideoSource for FailingVideo {
    fn display_resolution(&self) -> Resolution {
        self.inner.display_resolution()
    }

    fn current_frame(&mut self) -> anyhow::Result<Frame> {
        if self.frames_left == 0 {
            anyhow::bail!("video source disconnected");
        }
        self.frames_left -= 1;
        self.inner.current_frame()
    }
}

#[test]
fn video_failure_ends_loop() {
    let telemetry = BufferSink::new();
    let video = FailingVideo {
        inner: FixtureVideo::new(Resolution::new(320, 240)),
        frames_left: 3,
    };
    let handle = scheduler()
        .spawn(
            orchestrator(),
            video,
            Image::new(0, 0),
            host(&Toggles::default(), &telemetry),
        )
        .unwrap();

    let err = handle.join().unwrap_err();
    assert_eq!(err.to_string(), "video source disconnected");
    assert_eq!(telemetry.len(), 3);
}
