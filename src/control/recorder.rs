//! Recording branch control.
//!
//! A recording is a sub-graph tapped off the live graph's branch points.
//! Starting builds the encode/mux/write bin, pre-rolls it, then taps the
//! branch points. Stopping sends end-of-stream into the bin and releases
//! the taps so live playback continues unaffected while the bin drains.
//! Actual removal happens later, deferred through the cleanup scheduler,
//! once the bin reports end-of-stream on all of its inputs.

use crate::config::{PropertyLookup, RecordingConfig};
use crate::error::{GraphError, Result};
use crate::graph::coerce;
use crate::graph::container::{Activity, Graph, GraphMessage};
use crate::graph::factory::NodeFactory;
use crate::graph::id::{NodeId, SubGraphId};
use crate::graph::property::PropertyValue;
use crate::control::scheduler::{CleanupScheduler, CleanupTask};
use std::path::PathBuf;

const AUDIO_ENCODER_KIND: &str = "fdkaacenc";
const MUXER_KIND: &str = "mp4mux";
const CONTAINER_EXTENSION: &str = "mp4";
/// Config section shared by the recording tap queues.
const RECORD_QUEUE_SECTION: &str = "queue_record";

/// Lifecycle of the recording branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordState {
    /// No recording bin exists. Starting is permitted.
    #[default]
    Idle,
    /// The bin is being built and tapped in.
    Starting,
    /// Data is flowing into the container file.
    Active,
    /// Taps are released and end-of-stream is propagating through the
    /// bin. Starting is rejected until teardown completes.
    Draining,
}

impl RecordState {
    pub fn display_name(&self) -> &'static str {
        match self {
            RecordState::Idle => "Idle",
            RecordState::Starting => "Starting",
            RecordState::Active => "Active",
            RecordState::Draining => "Draining",
        }
    }
}

/// Everything owned by one recording attempt.
pub(crate) struct RecordingSession {
    path: PathBuf,
    bin: SubGraphId,
    video_port: Option<String>,
    audio_port: Option<String>,
}

/// Drives the recording branch through its lifecycle against the live
/// graph's branch points.
pub struct BranchController {
    state: RecordState,
    session: Option<RecordingSession>,
    config: RecordingConfig,
    video_branch: Option<NodeId>,
    audio_branch: Option<NodeId>,
}

impl BranchController {
    pub fn new(
        config: RecordingConfig,
        video_branch: Option<NodeId>,
        audio_branch: Option<NodeId>,
    ) -> Self {
        Self {
            state: RecordState::Idle,
            session: None,
            config,
            video_branch,
            audio_branch,
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Path of the in-flight recording, if any.
    pub fn output_path(&self) -> Option<&PathBuf> {
        self.session.as_ref().map(|s| &s.path)
    }

    /// Start a recording. Rejected while a previous one is active or
    /// still draining, and unless both branch points exist.
    pub fn start(
        &mut self,
        graph: &mut Graph,
        factory: &NodeFactory,
        props: &dyn PropertyLookup,
        scheduler: &CleanupScheduler,
    ) -> Result<PathBuf> {
        if self.state != RecordState::Idle {
            return Err(GraphError::RecorderBusy(self.state.display_name()));
        }
        let video_branch = self.video_branch.ok_or(GraphError::BranchPointMissing("video"))?;
        let audio_branch = self.audio_branch.ok_or(GraphError::BranchPointMissing("audio"))?;

        self.state = RecordState::Starting;
        let (bin, exposed, path) = match self.build_record_bin(factory, props) {
            Ok(built) => built,
            Err(err) => {
                self.state = RecordState::Idle;
                return Err(err);
            }
        };

        let bin_id = match graph.add_subgraph(bin, exposed) {
            Ok(id) => id,
            Err(err) => {
                self.state = RecordState::Idle;
                return Err(err);
            }
        };
        self.session = Some(RecordingSession {
            path: path.clone(),
            bin: bin_id,
            video_port: None,
            audio_port: None,
        });

        // The bin is now in the graph; any further failure drains it out
        // through the normal deferred teardown path.
        if let Err(err) = self.activate(graph, bin_id, video_branch, audio_branch) {
            tracing::warn!("recording start failed while tapping in: {}", err);
            self.state = RecordState::Draining;
            scheduler.schedule(CleanupTask::TeardownRecording);
            return Err(err);
        }

        self.state = RecordState::Active;
        tracing::info!("recording to {}", path.display());
        Ok(path)
    }

    /// Pre-roll the inserted bin, tap both branch points, then raise the
    /// bin to the live graph's activity.
    fn activate(
        &mut self,
        graph: &mut Graph,
        bin: SubGraphId,
        video_branch: NodeId,
        audio_branch: NodeId,
    ) -> Result<()> {
        // Pre-roll before tapping so the first frames are not dropped.
        graph.set_subgraph_activity(bin, Activity::Paused)?;
        self.attach_ports(graph, bin, video_branch, audio_branch)?;
        graph.set_subgraph_activity(bin, graph.activity())
    }

    /// Stop the active recording: end-of-stream into the bin first, then
    /// release the taps. Returns whether a drain was initiated.
    pub fn stop(&mut self, graph: &mut Graph) -> bool {
        if self.state != RecordState::Active {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let _ = graph.send_eos(session.bin, "video");
        let _ = graph.send_eos(session.bin, "audio");

        if let (Some(tee), Some(port)) = (self.video_branch, session.video_port.take()) {
            let _ = graph.release_output_port(tee, &port);
        }
        if let (Some(tee), Some(port)) = (self.audio_branch, session.audio_port.take()) {
            let _ = graph.release_output_port(tee, &port);
        }

        self.state = RecordState::Draining;
        tracing::info!("recording stopping, draining bin");
        true
    }

    /// React to a bus message. The bin's end-of-stream completion while
    /// draining schedules the deferred teardown.
    pub fn on_message(&self, msg: &GraphMessage, scheduler: &CleanupScheduler) {
        let GraphMessage::SubGraphEos { subgraph } = msg else {
            return;
        };
        if self.state != RecordState::Draining {
            return;
        }
        if self.session.as_ref().map(|s| s.bin) == Some(*subgraph) {
            scheduler.schedule(CleanupTask::TeardownRecording);
        }
    }

    /// Remove the drained recording bin from the live graph. Idempotent;
    /// returns the finished file's path on the call that tore down.
    pub fn run_teardown(&mut self, graph: &mut Graph) -> Option<PathBuf> {
        let mut session = self.session.take()?;

        // A failed start may leave taps behind; release them before the
        // bin goes away.
        if let (Some(tee), Some(port)) = (self.video_branch, session.video_port.take()) {
            let _ = graph.release_output_port(tee, &port);
        }
        if let (Some(tee), Some(port)) = (self.audio_branch, session.audio_port.take()) {
            let _ = graph.release_output_port(tee, &port);
        }

        if graph.contains_subgraph(session.bin) {
            if graph.set_subgraph_activity(session.bin, Activity::Inactive).is_ok() {
                let _ = graph.remove_subgraph(session.bin);
            }
        }

        self.state = RecordState::Idle;
        tracing::info!("recording finished: {}", session.path.display());
        Some(session.path)
    }

    /// Build the self-contained recording bin and its exposed inputs.
    fn build_record_bin(
        &self,
        factory: &NodeFactory,
        props: &dyn PropertyLookup,
    ) -> Result<(Graph, Vec<(String, NodeId)>, PathBuf)> {
        let mut bin = Graph::new("record-bin");
        let mut exposed = Vec::new();

        let vq = factory.create_in(&mut bin, "queue", "record-video-queue")?;
        Self::apply(&mut bin, vq, props, RECORD_QUEUE_SECTION)?;
        exposed.push((String::from("video"), vq));

        let enc = factory.create_in(&mut bin, &self.config.encoder, "record-encoder")?;
        Self::apply(&mut bin, enc, props, &self.config.encoder)?;
        let parse = factory.create_in(&mut bin, "h264parse", "record-parse")?;
        let mux = factory.create_in(&mut bin, MUXER_KIND, "record-mux")?;
        bin.link(vq, enc)?;
        bin.link(enc, parse)?;
        bin.link(parse, mux)?;

        let aq = factory.create_in(&mut bin, "queue", "record-audio-queue")?;
        Self::apply(&mut bin, aq, props, RECORD_QUEUE_SECTION)?;
        let aenc = factory.create_in(&mut bin, AUDIO_ENCODER_KIND, "record-audio-encoder")?;
        Self::apply(&mut bin, aenc, props, AUDIO_ENCODER_KIND)?;
        // Constant-quality AAC regardless of config.
        bin.node_mut(aenc)?.set_property("bitrate-mode", PropertyValue::I32(5))?;
        bin.link(aq, aenc)?;
        bin.link(aenc, mux)?;
        exposed.push((String::from("audio"), aq));

        std::fs::create_dir_all(&self.config.directory)?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = self
            .config
            .directory
            .join(format!("{stamp}.{CONTAINER_EXTENSION}"));

        let sink = factory.create_in(&mut bin, "filesink", "record-sink")?;
        bin.node_mut(sink)?
            .set_property("location", PropertyValue::Str(path.display().to_string()))?;
        bin.link(mux, sink)?;

        Ok((bin, exposed, path))
    }

    /// Tap the branch points into the bin. Ports are remembered on the
    /// session before linking so a failed link still gets released.
    fn attach_ports(
        &mut self,
        graph: &mut Graph,
        bin: SubGraphId,
        video_branch: NodeId,
        audio_branch: NodeId,
    ) -> Result<()> {
        let port = graph.request_output_port(video_branch)?;
        if let Some(session) = self.session.as_mut() {
            session.video_port = Some(port.clone());
        }
        graph.link_to_subgraph(video_branch, &port, bin, "video")?;

        let port = graph.request_output_port(audio_branch)?;
        if let Some(session) = self.session.as_mut() {
            session.audio_port = Some(port.clone());
        }
        graph.link_to_subgraph(audio_branch, &port, bin, "audio")?;
        Ok(())
    }

    fn apply(bin: &mut Graph, id: NodeId, props: &dyn PropertyLookup, section: &str) -> Result<()> {
        if let Some(section) = props.section(section) {
            coerce::apply_section(bin.node_mut(id)?, section);
        }
        Ok(())
    }
}
