//! Kind registry — runtime type information for node kinds.
//!
//! A [`KindSpec`] is the reflected description of one node kind: its
//! class (which decides its port layout) and its property table. The
//! registry is built once at startup; [`crate::graph::NodeFactory`]
//! instantiates nodes from it.

use crate::graph::property::{EnumVariant, FlagVariant, PropertySpec};
use std::collections::HashMap;
use std::sync::Arc;

/// Structural class of a node kind. Decides which ports a node exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// Produces data; one static output, no input.
    Source,
    /// One static input, one static output.
    Filter,
    /// One static input, unbounded request outputs (`src_%u`).
    BranchPoint,
    /// Unbounded request inputs (`sink_%u`), one static output.
    Muxer,
    /// One static input, no output.
    Sink,
    /// Terminal node that renders into an embeddable display surface.
    Display,
}

impl NodeClass {
    pub fn has_input(self) -> bool {
        !matches!(self, NodeClass::Source)
    }

    pub fn has_output(self) -> bool {
        !matches!(self, NodeClass::Sink | NodeClass::Display)
    }

    pub fn has_request_outputs(self) -> bool {
        matches!(self, NodeClass::BranchPoint)
    }

    pub fn has_request_inputs(self) -> bool {
        matches!(self, NodeClass::Muxer)
    }
}

/// Reflected description of one node kind.
#[derive(Debug, Clone)]
pub struct KindSpec {
    pub name: String,
    pub class: NodeClass,
    pub props: Vec<PropertySpec>,
}

impl KindSpec {
    pub fn new(name: impl Into<String>, class: NodeClass) -> Self {
        Self {
            name: name.into(),
            class,
            props: Vec::new(),
        }
    }

    pub fn source(name: impl Into<String>) -> Self {
        Self::new(name, NodeClass::Source)
    }

    pub fn filter(name: impl Into<String>) -> Self {
        Self::new(name, NodeClass::Filter)
    }

    pub fn sink(name: impl Into<String>) -> Self {
        Self::new(name, NodeClass::Sink)
    }

    pub fn with_prop(mut self, prop: PropertySpec) -> Self {
        self.props.push(prop);
        self
    }

    /// Index and spec of a named property, if declared.
    pub fn find_prop(&self, name: &str) -> Option<(usize, &PropertySpec)> {
        self.props
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }
}

/// Registry of node kinds, keyed by kind name.
pub struct KindRegistry {
    kinds: HashMap<String, Arc<KindSpec>>,
}

impl KindRegistry {
    /// An empty registry. Kinds must be registered before use.
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for spec in builtin_kinds() {
            registry.register(spec);
        }
        registry
    }

    /// Register a kind, replacing any previous spec with the same name.
    pub fn register(&mut self, spec: KindSpec) {
        self.kinds.insert(spec.name.clone(), Arc::new(spec));
    }

    pub fn get(&self, name: &str) -> Option<Arc<KindSpec>> {
        self.kinds.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn leaky_variants() -> Vec<EnumVariant> {
    vec![
        EnumVariant::new("GstQueueLeaky::no", "no", 0),
        EnumVariant::new("GstQueueLeaky::upstream", "upstream", 1),
        EnumVariant::new("GstQueueLeaky::downstream", "downstream", 2),
    ]
}

fn speed_preset_variants() -> Vec<EnumVariant> {
    vec![
        EnumVariant::new("GstX264EncPreset::None", "none", 0),
        EnumVariant::new("GstX264EncPreset::ultrafast", "ultrafast", 1),
        EnumVariant::new("GstX264EncPreset::superfast", "superfast", 2),
        EnumVariant::new("GstX264EncPreset::veryfast", "veryfast", 3),
        EnumVariant::new("GstX264EncPreset::faster", "faster", 4),
        EnumVariant::new("GstX264EncPreset::fast", "fast", 5),
        EnumVariant::new("GstX264EncPreset::medium", "medium", 6),
        EnumVariant::new("GstX264EncPreset::slow", "slow", 7),
        EnumVariant::new("GstX264EncPreset::slower", "slower", 8),
        EnumVariant::new("GstX264EncPreset::veryslow", "veryslow", 9),
        EnumVariant::new("GstX264EncPreset::placebo", "placebo", 10),
    ]
}

fn tune_variants() -> Vec<FlagVariant> {
    vec![
        FlagVariant::new("GstX264EncTune::stillimage", "stillimage", 1),
        FlagVariant::new("GstX264EncTune::fastdecode", "fastdecode", 2),
        FlagVariant::new("GstX264EncTune::zerolatency", "zerolatency", 4),
    ]
}

fn io_mode_variants() -> Vec<EnumVariant> {
    vec![
        EnumVariant::new("GstV4l2IOMode::auto", "auto", 0),
        EnumVariant::new("GstV4l2IOMode::rw", "rw", 1),
        EnumVariant::new("GstV4l2IOMode::mmap", "mmap", 2),
        EnumVariant::new("GstV4l2IOMode::userptr", "userptr", 3),
        EnumVariant::new("GstV4l2IOMode::dmabuf", "dmabuf", 4),
        EnumVariant::new("GstV4l2IOMode::dmabuf-import", "dmabuf-import", 5),
    ]
}

fn deinterlace_variants() -> Vec<EnumVariant> {
    vec![
        EnumVariant::new("GstVaapiDeinterlaceMode::auto", "auto", 0),
        EnumVariant::new("GstVaapiDeinterlaceMode::interlaced", "interlaced", 1),
        EnumVariant::new("GstVaapiDeinterlaceMode::disabled", "disabled", 2),
    ]
}

fn rate_control_variants() -> Vec<EnumVariant> {
    vec![
        EnumVariant::new("GstVaapiRateControl::cqp", "cqp", 1),
        EnumVariant::new("GstVaapiRateControl::cbr", "cbr", 2),
        EnumVariant::new("GstVaapiRateControl::vbr", "vbr", 4),
    ]
}

fn pattern_variants() -> Vec<EnumVariant> {
    vec![
        EnumVariant::new("GstVideoTestSrcPattern::smpte", "smpte", 0),
        EnumVariant::new("GstVideoTestSrcPattern::snow", "snow", 1),
        EnumVariant::new("GstVideoTestSrcPattern::black", "black", 2),
        EnumVariant::new("GstVideoTestSrcPattern::white", "white", 3),
    ]
}

fn wave_variants() -> Vec<EnumVariant> {
    vec![
        EnumVariant::new("GstAudioTestSrcWave::sine", "sine", 0),
        EnumVariant::new("GstAudioTestSrcWave::square", "square", 1),
        EnumVariant::new("GstAudioTestSrcWave::saw", "saw", 2),
        EnumVariant::new("GstAudioTestSrcWave::triangle", "triangle", 3),
        EnumVariant::new("GstAudioTestSrcWave::silence", "silence", 4),
    ]
}

/// The built-in kind table: the kinds the chain builder and branch
/// controller reference, plus test-friendly sources and sinks.
fn builtin_kinds() -> Vec<KindSpec> {
    vec![
        // Sources
        KindSpec::source("v4l2src")
            .with_prop(PropertySpec::str("device", "/dev/video0"))
            .with_prop(PropertySpec::enumeration("io-mode", io_mode_variants(), 0))
            .with_prop(PropertySpec::bool("do-timestamp", false)),
        KindSpec::source("pulsesrc")
            .with_prop(PropertySpec::str("device", ""))
            .with_prop(PropertySpec::bool("mute", false))
            .with_prop(PropertySpec::f64("volume", 1.0)),
        KindSpec::source("videotestsrc")
            .with_prop(PropertySpec::enumeration("pattern", pattern_variants(), 0))
            .with_prop(PropertySpec::bool("is-live", false)),
        KindSpec::source("audiotestsrc")
            .with_prop(PropertySpec::enumeration("wave", wave_variants(), 0))
            .with_prop(PropertySpec::f64("freq", 440.0))
            .with_prop(PropertySpec::bool("is-live", false)),
        // Filters
        KindSpec::filter("capsfilter").with_prop(PropertySpec::caps("caps")),
        KindSpec::filter("queue")
            .with_prop(PropertySpec::u32("max-size-buffers", 200))
            .with_prop(PropertySpec::u32("max-size-bytes", 10_485_760))
            .with_prop(PropertySpec::u64("max-size-time", 1_000_000_000))
            .with_prop(PropertySpec::enumeration("leaky", leaky_variants(), 0))
            .with_prop(PropertySpec::bool("silent", false)),
        KindSpec::filter("vaapipostproc")
            .with_prop(PropertySpec::u32("width", 0))
            .with_prop(PropertySpec::u32("height", 0))
            .with_prop(PropertySpec::enumeration(
                "deinterlace-mode",
                deinterlace_variants(),
                0,
            )),
        KindSpec::filter("videoconvert").with_prop(PropertySpec::u32("n-threads", 0)),
        KindSpec::filter("audioconvert"),
        KindSpec::filter("audioresample").with_prop(PropertySpec::u32("quality", 4)),
        // Encoders and parsers
        KindSpec::filter("x264enc")
            .with_prop(PropertySpec::u32("bitrate", 2048))
            .with_prop(PropertySpec::enumeration(
                "speed-preset",
                speed_preset_variants(),
                6,
            ))
            .with_prop(PropertySpec::flags("tune", tune_variants(), 0))
            .with_prop(PropertySpec::u32("key-int-max", 0))
            .with_prop(PropertySpec::u32("bframes", 0)),
        KindSpec::filter("vaapih264enc")
            .with_prop(PropertySpec::u32("bitrate", 0))
            .with_prop(PropertySpec::enumeration(
                "rate-control",
                rate_control_variants(),
                1,
            ))
            .with_prop(PropertySpec::u32("keyframe-period", 30)),
        KindSpec::filter("h264parse").with_prop(PropertySpec::i32("config-interval", 0)),
        KindSpec::filter("fdkaacenc")
            .with_prop(PropertySpec::u32("bitrate", 0))
            .with_prop(PropertySpec::i32("bitrate-mode", 0)),
        // Branch points and muxers
        KindSpec::new("tee", NodeClass::BranchPoint)
            .with_prop(PropertySpec::bool("allow-not-linked", false))
            .with_prop(PropertySpec::bool("silent", true)),
        KindSpec::new("mp4mux", NodeClass::Muxer)
            .with_prop(PropertySpec::bool("faststart", false))
            .with_prop(PropertySpec::u32("fragment-duration", 0))
            .with_prop(PropertySpec::u32("movie-timescale", 0)),
        // Sinks
        KindSpec::sink("glsinkbin")
            .with_prop(PropertySpec::object("sink"))
            .with_prop(PropertySpec::bool("sync", true))
            .with_prop(PropertySpec::i64("max-lateness", -1)),
        KindSpec::new("gtkglsink", NodeClass::Display)
            .with_prop(PropertySpec::bool("force-aspect-ratio", true))
            .with_prop(PropertySpec::bool("sync", true)),
        KindSpec::sink("pulsesink")
            .with_prop(PropertySpec::str("device", ""))
            .with_prop(PropertySpec::f64("volume", 1.0))
            .with_prop(PropertySpec::bool("mute", false))
            .with_prop(PropertySpec::bool("sync", true)),
        KindSpec::sink("autoaudiosink").with_prop(PropertySpec::bool("sync", true)),
        KindSpec::sink("filesink")
            .with_prop(PropertySpec::str("location", ""))
            .with_prop(PropertySpec::bool("sync", false))
            .with_prop(PropertySpec::bool("async", true)),
        KindSpec::sink("fakesink")
            .with_prop(PropertySpec::bool("sync", false))
            .with_prop(PropertySpec::bool("silent", true)),
    ]
}
