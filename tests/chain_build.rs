//! Integration tests for config loading and chain assembly.

use avgraph::config::AppConfig;
use avgraph::error::GraphError;
use avgraph::graph::{ChainBuilder, KindRegistry, NodeFactory};
use std::sync::Arc;

const CONFIG: &str = r#"
[main]
pipeline_video = "videotestsrc,capsfilter,vaapipostproc,video_tee,queue,videoconvert"
pipeline_audio = "audiotestsrc,audioconvert,audioresample,autoaudiosink"

[videotestsrc]
pattern = "smpte"

[capsfilter]
caps = "video/x-raw,width=1280,height=720,framerate=30/1"

[queue]
max-size-buffers = 8
silent = true

[x264enc]
speed-preset = "ultrafast"
tune = "zerolatency"
"#;

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn factory() -> NodeFactory {
    init_logging();
    NodeFactory::new(Arc::new(KindRegistry::with_builtins()))
}

#[test]
fn test_config_to_running_graph() {
    let config = AppConfig::from_toml_str(CONFIG).unwrap();
    let factory = factory();
    let builder = ChainBuilder::new(&factory, &config.sections);

    let built = builder
        .build(&config.video_chain, config.audio_chain.as_deref())
        .unwrap();

    assert!(built.has_video_branch());
    assert!(built.audio_branch.is_some());

    let graph = &built.graph;
    // Video lineage plus display pairing plus audio lineage with its tee.
    assert!(graph.find("video-tee").is_some());
    assert!(graph.find("audio-tee").is_some());
    assert!(graph.find("gl-sink-bin").is_some());
    assert_eq!(built.display.node_name(), "gtk-gl-sink");

    // Section values landed, typed, on the right nodes.
    let caps_id = graph.find("capsfilter-1").unwrap();
    let caps = graph
        .node(caps_id)
        .unwrap()
        .property("caps")
        .unwrap()
        .as_caps()
        .unwrap()
        .to_string();
    assert!(caps.contains("width=1280"));

    let q = graph.find("queue-4").unwrap();
    let node = graph.node(q).unwrap();
    assert_eq!(node.property("max-size-buffers").unwrap().as_u32(), Some(8));
    assert_eq!(node.property("silent").unwrap().as_bool(), Some(true));
}

#[test]
fn test_bad_section_values_do_not_abort_the_build() {
    let config = AppConfig::from_toml_str(
        r#"
[main]
pipeline_video = "videotestsrc,queue,videoconvert"

[queue]
max-size-buffers = "many"
nonexistent = 5
"#,
    )
    .unwrap();
    let factory = factory();
    let built = ChainBuilder::new(&factory, &config.sections)
        .build(&config.video_chain, None)
        .unwrap();

    // Defaults survive both the unparseable value and the unknown key.
    let q = built.graph.find("queue-1").unwrap();
    assert_eq!(
        built
            .graph
            .node(q)
            .unwrap()
            .property("max-size-buffers")
            .unwrap()
            .as_u32(),
        Some(200)
    );
}

#[test]
fn test_unknown_chain_token_aborts_transactionally() {
    let factory = factory();
    let props = avgraph::config::SectionMap::default();
    let err = ChainBuilder::new(&factory, &props)
        .build("videotestsrc,notakind,videoconvert", None)
        .err()
        .unwrap();
    assert!(matches!(err, GraphError::UnknownKind(k) if k == "notakind"));
}
