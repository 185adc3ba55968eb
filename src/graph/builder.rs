//! Chain builder — turns config chain strings into a running-order graph.
//!
//! A chain string is a comma separated list of kind tokens, e.g.
//! `v4l2src,capsfilter,vaapipostproc,video_tee,queue,videoconvert`. Each
//! token names a node kind; a matching config section supplies its
//! properties. The `video_tee` marker token places the video branch point
//! for later recording taps. The build is transactional: any failure drops
//! the partially built graph and returns the error.

use crate::config::PropertyLookup;
use crate::error::{GraphError, Result};
use crate::graph::coerce;
use crate::graph::container::{Graph, GraphMessage};
use crate::graph::factory::NodeFactory;
use crate::graph::id::NodeId;
use crate::graph::node::DisplayHandle;
use crate::graph::property::PropertyValue;
use crossbeam_channel::Receiver;

/// Marker token placing the video branch point in a video chain.
pub const VIDEO_BRANCH_TOKEN: &str = "video_tee";

/// Kinds that may appear several times in one chain with a numeric
/// suffix (`capsfilter1`, `vaapipostproc2`). Each numbered token keeps
/// its own config section.
const NUMBERED_KINDS: &[&str] = &["capsfilter", "vaapipostproc"];

/// Resolve a chain token to `(kind, section name)`.
///
/// Any `queue`-prefixed token is a queue sharing the common `queue`
/// section. Numbered kinds strip their suffix for the kind but keep the
/// full token as the section name. Everything else maps one to one.
fn resolve_token(token: &str) -> (&str, &str) {
    if token.starts_with("queue") {
        return ("queue", "queue");
    }
    for base in NUMBERED_KINDS {
        if token.starts_with(base) && token.len() > base.len() {
            return (base, token);
        }
    }
    (token, token)
}

/// A fully assembled live graph together with the handles the application
/// needs: the bus, the branch points and the display surface.
pub struct BuiltGraph {
    pub graph: Graph,
    pub bus: Receiver<GraphMessage>,
    pub video_branch: Option<NodeId>,
    pub audio_branch: Option<NodeId>,
    pub display: DisplayHandle,
}

impl BuiltGraph {
    pub fn has_video_branch(&self) -> bool {
        self.video_branch.is_some()
    }
}

/// Builds the live graph from configured chain strings.
pub struct ChainBuilder<'a> {
    factory: &'a NodeFactory,
    props: &'a dyn PropertyLookup,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(factory: &'a NodeFactory, props: &'a dyn PropertyLookup) -> Self {
        Self { factory, props }
    }

    /// Assemble the live graph. The video chain is mandatory; the audio
    /// chain is built when configured and must name at least one token.
    pub fn build(&self, video_chain: &str, audio_chain: Option<&str>) -> Result<BuiltGraph> {
        let (mut graph, bus) = Graph::with_bus("live-pipeline");

        let video_branch = self.build_video(&mut graph, video_chain)?;
        let display = self.attach_display(&mut graph)?;
        let audio_branch = match audio_chain {
            Some(chain) => Some(self.build_audio(&mut graph, chain)?),
            None => None,
        };

        tracing::info!(
            "built live graph: {} nodes, video branch {}, audio {}",
            graph.node_count(),
            if video_branch.is_some() { "yes" } else { "no" },
            if audio_branch.is_some() { "yes" } else { "no" },
        );
        Ok(BuiltGraph {
            graph,
            bus,
            video_branch,
            audio_branch,
            display,
        })
    }

    /// Build the video chain up to (not including) the display sink.
    /// Returns the branch point id when the marker token was present.
    fn build_video(&self, graph: &mut Graph, chain: &str) -> Result<Option<NodeId>> {
        let tokens: Vec<&str> = chain
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(GraphError::EmptyChain("video"));
        }

        let mut branch = None;
        let mut prev: Option<NodeId> = None;
        for (i, token) in tokens.iter().enumerate() {
            let id = if *token == VIDEO_BRANCH_TOKEN {
                let id = self.factory.create_in(graph, "tee", "video-tee")?;
                branch = Some(id);
                id
            } else {
                let (kind, section) = resolve_token(token);
                let id = self
                    .factory
                    .create_in(graph, kind, format!("{kind}-{i}"))?;
                self.apply_section(graph, id, section)?;
                id
            };
            if let Some(prev) = prev {
                graph.link(prev, id)?;
            }
            prev = Some(id);
        }

        // Display sink pairing: an embeddable GL surface wrapped in a
        // sink bin, wired through the bin's object-valued 'sink' property.
        let last = prev.ok_or(GraphError::EmptyChain("video"))?;
        let surface = self.factory.create_in(graph, "gtkglsink", "gtk-gl-sink")?;
        self.apply_section(graph, surface, "gtkglsink")?;
        let sink_bin = self.factory.create_in(graph, "glsinkbin", "gl-sink-bin")?;
        self.apply_section(graph, sink_bin, "glsinkbin")?;
        graph
            .node_mut(sink_bin)?
            .set_property("sink", PropertyValue::Object(surface))?;
        graph.link(last, sink_bin)?;

        Ok(branch)
    }

    fn attach_display(&self, graph: &mut Graph) -> Result<DisplayHandle> {
        let surface = graph
            .find("gtk-gl-sink")
            .ok_or(GraphError::NoDisplaySurface(String::from("gtk-gl-sink")))?;
        graph
            .node(surface)?
            .display_handle()
            .ok_or_else(|| GraphError::NoDisplaySurface(String::from("gtk-gl-sink")))
    }

    /// Build the audio chain. The last token is the playback sink; the
    /// audio branch point is inserted just before it.
    fn build_audio(&self, graph: &mut Graph, chain: &str) -> Result<NodeId> {
        let tokens: Vec<&str> = chain
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        let Some((&sink_token, lineage)) = tokens.split_last() else {
            return Err(GraphError::EmptyChain("audio"));
        };

        let mut prev: Option<NodeId> = None;
        for (i, token) in lineage.iter().enumerate() {
            let (kind, section) = resolve_token(token);
            let id = self
                .factory
                .create_in(graph, kind, format!("{kind}-a{i}"))?;
            self.apply_section(graph, id, section)?;
            if let Some(prev) = prev {
                graph.link(prev, id)?;
            }
            prev = Some(id);
        }

        let tee = self.factory.create_in(graph, "tee", "audio-tee")?;
        if let Some(prev) = prev {
            graph.link(prev, tee)?;
        }

        let (sink_kind, sink_section) = resolve_token(sink_token);
        let sink = self.factory.create_in(graph, sink_kind, "audio-sink")?;
        self.apply_section(graph, sink, sink_section)?;
        graph.link(tee, sink)?;

        Ok(tee)
    }

    fn apply_section(&self, graph: &mut Graph, id: NodeId, section: &str) -> Result<()> {
        if let Some(props) = self.props.section(section) {
            coerce::apply_section(graph.node_mut(id)?, props);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectionMap;
    use crate::graph::registry::KindRegistry;
    use std::sync::Arc;

    fn factory() -> NodeFactory {
        NodeFactory::new(Arc::new(KindRegistry::with_builtins()))
    }

    #[test]
    fn test_resolve_token() {
        assert_eq!(resolve_token("v4l2src"), ("v4l2src", "v4l2src"));
        assert_eq!(resolve_token("capsfilter"), ("capsfilter", "capsfilter"));
        assert_eq!(resolve_token("capsfilter1"), ("capsfilter", "capsfilter1"));
        assert_eq!(
            resolve_token("vaapipostproc2"),
            ("vaapipostproc", "vaapipostproc2")
        );
        assert_eq!(resolve_token("queue"), ("queue", "queue"));
        assert_eq!(resolve_token("queue1"), ("queue", "queue"));
    }

    #[test]
    fn test_video_chain_with_branch_and_display() {
        let factory = factory();
        let props = SectionMap::default();
        let builder = ChainBuilder::new(&factory, &props);

        let built = builder
            .build("videotestsrc,capsfilter,video_tee,queue,videoconvert", None)
            .unwrap();
        assert!(built.has_video_branch());
        assert!(built.audio_branch.is_none());
        assert!(built.graph.find("video-tee").is_some());
        // Source, capsfilter, tee, queue, convert, surface, sink bin.
        assert_eq!(built.graph.node_count(), 7);
        assert_eq!(built.display.node_name(), "gtk-gl-sink");

        // The sink bin holds its surface through the object property.
        let bin = built.graph.find("gl-sink-bin").unwrap();
        let surface = built.graph.find("gtk-gl-sink").unwrap();
        assert_eq!(
            built.graph.node(bin).unwrap().property("sink").unwrap().as_object(),
            Some(surface)
        );
    }

    #[test]
    fn test_chain_without_marker_has_no_branch() {
        let factory = factory();
        let props = SectionMap::default();
        let builder = ChainBuilder::new(&factory, &props);
        let built = builder.build("videotestsrc,videoconvert", None).unwrap();
        assert!(!built.has_video_branch());
    }

    #[test]
    fn test_empty_video_chain_rejected() {
        let factory = factory();
        let props = SectionMap::default();
        let builder = ChainBuilder::new(&factory, &props);
        assert!(matches!(
            builder.build("  , ,", None),
            Err(GraphError::EmptyChain("video"))
        ));
    }

    #[test]
    fn test_empty_audio_chain_rejected() {
        let factory = factory();
        let props = SectionMap::default();
        let builder = ChainBuilder::new(&factory, &props);
        assert!(matches!(
            builder.build("videotestsrc", Some("")),
            Err(GraphError::EmptyChain("audio"))
        ));
    }

    #[test]
    fn test_audio_chain_inserts_branch_before_sink() {
        let factory = factory();
        let props = SectionMap::default();
        let builder = ChainBuilder::new(&factory, &props);

        let built = builder
            .build(
                "videotestsrc,videoconvert",
                Some("audiotestsrc,audioconvert,audioresample,autoaudiosink"),
            )
            .unwrap();
        let tee = built.audio_branch.unwrap();
        let graph = &built.graph;
        assert_eq!(graph.node(tee).unwrap().name(), "audio-tee");

        let sink = graph.find("audio-sink").unwrap();
        assert_eq!(graph.node(sink).unwrap().kind(), "autoaudiosink");
        assert!(graph
            .links()
            .iter()
            .any(|l| l.from == tee && l.to == sink));
    }

    #[test]
    fn test_single_token_audio_chain_still_gets_branch_point() {
        let factory = factory();
        let props = SectionMap::default();
        let builder = ChainBuilder::new(&factory, &props);

        let built = builder
            .build("videotestsrc,videoconvert", Some("autoaudiosink"))
            .unwrap();
        let tee = built.audio_branch.unwrap();
        let sink = built.graph.find("audio-sink").unwrap();
        assert!(built
            .graph
            .links()
            .iter()
            .any(|l| l.from == tee && l.to == sink));
    }

    #[test]
    fn test_numbered_sections_apply_independently() {
        let factory = factory();
        let mut props = SectionMap::default();
        props.set("capsfilter", "caps", "video/x-raw,width=640");
        props.set("capsfilter1", "caps", "video/x-raw,width=1920");

        let builder = ChainBuilder::new(&factory, &props);
        let built = builder
            .build("videotestsrc,capsfilter,videoconvert,capsfilter1", None)
            .unwrap();

        let first = built.graph.find("capsfilter-1").unwrap();
        let second = built.graph.find("capsfilter-3").unwrap();
        let width = |id| {
            built
                .graph
                .node(id)
                .unwrap()
                .property("caps")
                .unwrap()
                .as_caps()
                .unwrap()
                .to_string()
        };
        assert!(width(first).contains("width=640"));
        assert!(width(second).contains("width=1920"));
    }

    #[test]
    fn test_queue_tokens_share_one_section() {
        let factory = factory();
        let mut props = SectionMap::default();
        props.set("queue", "max-size-buffers", "32");

        let builder = ChainBuilder::new(&factory, &props);
        let built = builder
            .build("videotestsrc,queue,videoconvert,queue1", None)
            .unwrap();

        for name in ["queue-1", "queue-3"] {
            let id = built.graph.find(name).unwrap();
            assert_eq!(
                built
                    .graph
                    .node(id)
                    .unwrap()
                    .property("max-size-buffers")
                    .unwrap()
                    .as_u32(),
                Some(32)
            );
        }
    }

    #[test]
    fn test_unknown_kind_fails_whole_build() {
        let factory = factory();
        let props = SectionMap::default();
        let builder = ChainBuilder::new(&factory, &props);
        assert!(matches!(
            builder.build("videotestsrc,frobnicator,videoconvert", None),
            Err(GraphError::UnknownKind(_))
        ));
    }
}
