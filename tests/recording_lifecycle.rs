//! End-to-end recording lifecycle: build from config, start and stop a
//! recording through the control loop, and verify live playback survives.

use avgraph::config::AppConfig;
use avgraph::control::{BranchController, ControlCommand, ControlEvent, ControlLoop, RecordState};
use avgraph::graph::{Activity, ChainBuilder, KindRegistry, NodeFactory};
use std::sync::Arc;
use tempfile::TempDir;

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn make_config(dir: &TempDir) -> AppConfig {
    let text = format!(
        r#"
[main]
pipeline_video = "videotestsrc,video_tee,queue,videoconvert"
pipeline_audio = "audiotestsrc,audioconvert,autoaudiosink"
record_path = "{}"
encoder = "x264enc"

[queue_record]
max-size-buffers = 0
max-size-time = 0
"#,
        dir.path().display()
    );
    AppConfig::from_toml_str(&text).unwrap()
}

#[test]
fn test_full_recording_round_trip() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let config = make_config(&dir);
    let factory = NodeFactory::new(Arc::new(KindRegistry::with_builtins()));

    let built = ChainBuilder::new(&factory, &config.sections)
        .build(&config.video_chain, config.audio_chain.as_deref())
        .unwrap();
    let controller =
        BranchController::new(config.recording, built.video_branch, built.audio_branch);
    let (mut control, commands, events) =
        ControlLoop::new(built.graph, built.bus, controller, factory, config.sections);
    control.graph_mut().set_activity(Activity::Active);

    let live_nodes = control.graph().node_count();

    // Start.
    commands.send(ControlCommand::StartRecording).unwrap();
    control.pump();
    let path = match events.try_recv().unwrap() {
        ControlEvent::RecordingStarted(path) => path,
        other => panic!("unexpected event {other:?}"),
    };
    assert_eq!(control.controller().state(), RecordState::Active);
    assert!(path.starts_with(dir.path()));
    let name = path.file_name().unwrap().to_str().unwrap();
    // Timestamped container file name, e.g. 20260828-153000.mp4.
    assert_eq!(name.len(), "YYYYMMDD-HHMMSS.mp4".len());
    assert!(name.ends_with(".mp4"));
    assert_eq!(&name[8..9], "-");

    // Both branch points are tapped into the bin.
    let bin = control.graph().subgraph_ids()[0];
    assert_eq!(control.graph().subgraph_inputs_linked(bin), 2);
    assert_eq!(
        control.graph().subgraph_activity(bin).unwrap(),
        Activity::Active
    );

    // Stop: the drain and deferred teardown complete across pumps.
    commands.send(ControlCommand::StopRecording).unwrap();
    control.pump();
    control.pump();
    match events.try_recv().unwrap() {
        ControlEvent::RecordingStopped(stopped) => assert_eq!(stopped, path),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(control.controller().state(), RecordState::Idle);
    assert!(control.graph().subgraph_ids().is_empty());

    // Live playback is untouched throughout.
    assert_eq!(control.graph().node_count(), live_nodes);
    assert_eq!(control.graph().activity(), Activity::Active);

    // A second recording starts cleanly after teardown.
    commands.send(ControlCommand::StartRecording).unwrap();
    control.pump();
    assert!(matches!(
        events.try_recv().unwrap(),
        ControlEvent::RecordingStarted(_)
    ));
}

#[test]
fn test_recording_requires_the_audio_branch_too() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let text = format!(
        r#"
[main]
pipeline_video = "videotestsrc,video_tee,videoconvert"
record_path = "{}"
"#,
        dir.path().display()
    );
    let config = AppConfig::from_toml_str(&text).unwrap();
    let factory = NodeFactory::new(Arc::new(KindRegistry::with_builtins()));

    // A video-only graph has no audio branch point to tap.
    let built = ChainBuilder::new(&factory, &config.sections)
        .build(&config.video_chain, None)
        .unwrap();
    assert!(built.has_video_branch());
    assert!(built.audio_branch.is_none());

    let controller = BranchController::new(config.recording, built.video_branch, None);
    let (mut control, commands, events) =
        ControlLoop::new(built.graph, built.bus, controller, factory, config.sections);
    control.graph_mut().set_activity(Activity::Active);

    commands.send(ControlCommand::StartRecording).unwrap();
    control.pump();
    assert!(matches!(
        events.try_recv().unwrap(),
        ControlEvent::RecordingFailed(_)
    ));
    assert_eq!(control.controller().state(), RecordState::Idle);
    assert!(control.graph().subgraph_ids().is_empty());
}

#[test]
fn test_recording_without_branch_point_fails_cleanly() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let text = format!(
        r#"
[main]
pipeline_video = "videotestsrc,videoconvert"
record_path = "{}"
"#,
        dir.path().display()
    );
    let config = AppConfig::from_toml_str(&text).unwrap();
    let factory = NodeFactory::new(Arc::new(KindRegistry::with_builtins()));

    let built = ChainBuilder::new(&factory, &config.sections)
        .build(&config.video_chain, None)
        .unwrap();
    assert!(!built.has_video_branch());

    let controller = BranchController::new(config.recording, built.video_branch, None);
    let (mut control, commands, events) =
        ControlLoop::new(built.graph, built.bus, controller, factory, config.sections);

    commands.send(ControlCommand::StartRecording).unwrap();
    control.pump();
    assert!(matches!(
        events.try_recv().unwrap(),
        ControlEvent::RecordingFailed(_)
    ));
    assert_eq!(control.controller().state(), RecordState::Idle);
}
