//! Graph container — nodes, links, sub-graphs, activity, message bus.
//!
//! The same type serves as the top-level live graph and as a sub-graph
//! (recording bin). The top-level graph carries the message bus on which
//! asynchronous conditions are posted: sub-graph end-of-stream and runtime
//! stream errors. Only the control thread mutates a graph; data-flow
//! workers observe topology read-only and report back through the bus.

use crate::error::{GraphError, Result};
use crate::graph::id::{NodeId, SubGraphId};
use crate::graph::node::Node;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Composed activity state of a graph and its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    /// Resources released, no data flowing.
    #[default]
    Inactive,
    /// Pre-rolled and ready, data held.
    Paused,
    /// Data flowing.
    Active,
}

impl Activity {
    pub fn display_name(&self) -> &'static str {
        match self {
            Activity::Inactive => "Inactive",
            Activity::Paused => "Paused",
            Activity::Active => "Active",
        }
    }
}

/// Asynchronous notifications posted on the live graph's message bus.
#[derive(Debug, Clone)]
pub enum GraphMessage {
    /// A sub-graph observed end-of-stream on all of its exposed inputs
    /// and forwarded its internal completion upward.
    SubGraphEos { subgraph: SubGraphId },
    /// Runtime stream error. Fatal to the live graph; surfaced to the
    /// owning application, never handled inside the core.
    Error { source: String, message: String },
}

/// A link from one node's output port to another node's input port.
#[derive(Debug, Clone)]
pub struct Link {
    pub from: NodeId,
    pub from_port: String,
    pub to: NodeId,
    pub to_port: String,
}

/// A link from a node's output port into a sub-graph's exposed input.
#[derive(Debug, Clone)]
struct BinLink {
    from: NodeId,
    from_port: String,
    subgraph: SubGraphId,
    port: String,
}

struct NodeSlot {
    node: Node,
    removed: bool,
}

struct ExposedPort {
    name: String,
    eos: bool,
}

struct SubGraphSlot {
    graph: Graph,
    exposed: Vec<ExposedPort>,
    eos_posted: bool,
    removed: bool,
}

/// Ordered container of nodes and sub-graphs with a composed activity state.
pub struct Graph {
    name: String,
    nodes: Vec<NodeSlot>,
    links: Vec<Link>,
    subgraphs: Vec<SubGraphSlot>,
    bin_links: Vec<BinLink>,
    activity: Activity,
    bus_tx: Option<Sender<GraphMessage>>,
}

impl Graph {
    /// A bare container, used for sub-graphs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            links: Vec::new(),
            subgraphs: Vec::new(),
            bin_links: Vec::new(),
            activity: Activity::Inactive,
            bus_tx: None,
        }
    }

    /// A top-level graph with a message bus attached.
    pub fn with_bus(name: impl Into<String>) -> (Self, Receiver<GraphMessage>) {
        let (tx, rx) = unbounded();
        let mut graph = Self::new(name);
        graph.bus_tx = Some(tx);
        (graph, rx)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Nodes ──

    /// Add a node. Its name must be unique within this graph.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId> {
        if self.find(node.name()).is_some() {
            return Err(GraphError::DuplicateName(node.name().to_string()));
        }
        let id = NodeId(self.nodes.len() as u32);
        tracing::debug!("{}: added node {} ({})", self.name, node.name(), node.kind());
        self.nodes.push(NodeSlot {
            node,
            removed: false,
        });
        Ok(id)
    }

    /// Remove a node along with every link touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let slot = self
            .nodes
            .get_mut(id.index())
            .filter(|s| !s.removed)
            .ok_or(GraphError::NodeNotFound(id))?;
        slot.removed = true;
        let name = slot.node.name().to_string();
        self.links.retain(|l| l.from != id && l.to != id);
        self.bin_links.retain(|l| l.from != id);
        tracing::info!("{}: removed node {}", self.name, name);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .filter(|s| !s.removed)
            .map(|s| &s.node)
            .ok_or(GraphError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .filter(|s| !s.removed)
            .map(|s| &mut s.node)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Look a node up by its unique name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .find(|(_, s)| !s.removed && s.node.name() == name)
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|s| !s.removed).count()
    }

    /// Ids of live nodes, in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.removed)
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    // ── Links ──

    /// Link `from` to `to` using their static ports. Linking out of a
    /// branch point or into a muxer allocates a request port implicitly.
    pub fn link(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        let from_class = self.node(from)?.class();
        let to_class = self.node(to)?.class();

        if !from_class.has_output() {
            return Err(GraphError::NoOutput(self.node(from)?.name().to_string()));
        }
        if !to_class.has_input() {
            return Err(GraphError::NoInput(self.node(to)?.name().to_string()));
        }

        let from_port = if from_class.has_request_outputs() {
            self.node_mut(from)?.allocate_request_port()?
        } else {
            self.ensure_output_free(from, "src")?;
            String::from("src")
        };
        let to_port = if to_class.has_request_inputs() {
            self.node_mut(to)?.allocate_request_port()?
        } else {
            self.ensure_input_free(to, "sink")?;
            String::from("sink")
        };

        tracing::debug!(
            "{}: linked {}:{} -> {}:{}",
            self.name,
            self.node(from)?.name(),
            from_port,
            self.node(to)?.name(),
            to_port,
        );
        self.links.push(Link {
            from,
            from_port,
            to,
            to_port,
        });
        Ok(())
    }

    fn ensure_output_free(&self, node: NodeId, port: &str) -> Result<()> {
        let used = self
            .links
            .iter()
            .any(|l| l.from == node && l.from_port == port)
            || self
                .bin_links
                .iter()
                .any(|l| l.from == node && l.from_port == port);
        if used {
            return Err(GraphError::AlreadyLinked {
                owner: self.node(node)?.name().to_string(),
                port: port.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_input_free(&self, node: NodeId, port: &str) -> Result<()> {
        if self.links.iter().any(|l| l.to == node && l.to_port == port) {
            return Err(GraphError::AlreadyLinked {
                owner: self.node(node)?.name().to_string(),
                port: port.to_string(),
            });
        }
        Ok(())
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    // ── Dynamic ports ──

    /// Request a new dynamic output port from a branch point.
    pub fn request_output_port(&mut self, node: NodeId) -> Result<String> {
        if !self.node(node)?.class().has_request_outputs() {
            return Err(GraphError::NotABranchPoint(
                self.node(node)?.name().to_string(),
            ));
        }
        let port = self.node_mut(node)?.allocate_request_port()?;
        tracing::debug!(
            "{}: requested port {}:{}",
            self.name,
            self.node(node)?.name(),
            port
        );
        Ok(port)
    }

    /// Release a dynamic output port, severing any link it feeds. The
    /// downstream consumer need not have stopped; release only stops new
    /// data being routed there.
    pub fn release_output_port(&mut self, node: NodeId, port: &str) -> Result<()> {
        self.node_mut(node)?.release_request_port(port)?;
        self.links
            .retain(|l| !(l.from == node && l.from_port == port));
        self.bin_links
            .retain(|l| !(l.from == node && l.from_port == port));
        tracing::debug!(
            "{}: released port {}:{}",
            self.name,
            self.node(node)?.name(),
            port
        );
        Ok(())
    }

    // ── Sub-graphs ──

    /// Add a self-contained sub-graph, exposing the given `(port name,
    /// inner node)` pairs as its outer input ports. Each exposed node
    /// must live inside the sub-graph.
    pub fn add_subgraph(
        &mut self,
        graph: Graph,
        exposed: Vec<(String, NodeId)>,
    ) -> Result<SubGraphId> {
        for (_, node) in &exposed {
            graph.node(*node)?;
        }
        let id = SubGraphId(self.subgraphs.len() as u32);
        tracing::info!("{}: added sub-graph {}", self.name, graph.name());
        self.subgraphs.push(SubGraphSlot {
            graph,
            exposed: exposed
                .into_iter()
                .map(|(name, _)| ExposedPort { name, eos: false })
                .collect(),
            eos_posted: false,
            removed: false,
        });
        Ok(id)
    }

    pub fn subgraph(&self, id: SubGraphId) -> Result<&Graph> {
        self.subgraph_slot(id).map(|s| &s.graph)
    }

    pub fn subgraph_mut(&mut self, id: SubGraphId) -> Result<&mut Graph> {
        self.subgraph_slot_mut(id).map(|s| &mut s.graph)
    }

    pub fn contains_subgraph(&self, id: SubGraphId) -> bool {
        self.subgraph_slot(id).is_ok()
    }

    /// Ids of live sub-graphs.
    pub fn subgraph_ids(&self) -> Vec<SubGraphId> {
        self.subgraphs
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.removed)
            .map(|(i, _)| SubGraphId(i as u32))
            .collect()
    }

    fn subgraph_slot(&self, id: SubGraphId) -> Result<&SubGraphSlot> {
        self.subgraphs
            .get(id.index())
            .filter(|s| !s.removed)
            .ok_or(GraphError::SubGraphNotFound(id))
    }

    fn subgraph_slot_mut(&mut self, id: SubGraphId) -> Result<&mut SubGraphSlot> {
        self.subgraphs
            .get_mut(id.index())
            .filter(|s| !s.removed)
            .ok_or(GraphError::SubGraphNotFound(id))
    }

    /// Set a sub-graph's activity independently of its parent.
    pub fn set_subgraph_activity(&mut self, id: SubGraphId, activity: Activity) -> Result<()> {
        let slot = self.subgraph_slot_mut(id)?;
        slot.graph.set_activity(activity);
        Ok(())
    }

    pub fn subgraph_activity(&self, id: SubGraphId) -> Result<Activity> {
        Ok(self.subgraph_slot(id)?.graph.activity())
    }

    /// Remove a sub-graph. It must be fully deactivated first.
    pub fn remove_subgraph(&mut self, id: SubGraphId) -> Result<()> {
        let slot = self.subgraph_slot_mut(id)?;
        if slot.graph.activity() != Activity::Inactive {
            return Err(GraphError::SubGraphStillActive(id));
        }
        slot.removed = true;
        let name = slot.graph.name().to_string();
        self.bin_links.retain(|l| l.subgraph != id);
        tracing::info!("{}: removed sub-graph {}", self.name, name);
        Ok(())
    }

    /// Link a node's output port (typically a freshly requested dynamic
    /// port) into a sub-graph's exposed input port.
    pub fn link_to_subgraph(
        &mut self,
        from: NodeId,
        from_port: &str,
        subgraph: SubGraphId,
        port: &str,
    ) -> Result<()> {
        let from_node = self.node(from)?;
        let owns_port =
            from_port == "src" || from_node.request_ports().iter().any(|p| p == from_port);
        if !owns_port {
            return Err(GraphError::PortNotFound {
                owner: from_node.name().to_string(),
                port: from_port.to_string(),
            });
        }

        let slot = self.subgraph_slot(subgraph)?;
        let bin_name = slot.graph.name().to_string();
        if !slot.exposed.iter().any(|p| p.name == port) {
            return Err(GraphError::PortNotFound {
                owner: bin_name,
                port: port.to_string(),
            });
        }
        if self
            .bin_links
            .iter()
            .any(|l| l.subgraph == subgraph && l.port == port)
        {
            return Err(GraphError::AlreadyLinked {
                owner: bin_name,
                port: port.to_string(),
            });
        }

        tracing::debug!(
            "{}: linked {}:{} -> {}:{}",
            self.name,
            self.node(from)?.name(),
            from_port,
            bin_name,
            port
        );
        self.bin_links.push(BinLink {
            from,
            from_port: from_port.to_string(),
            subgraph,
            port: port.to_string(),
        });
        Ok(())
    }

    /// Number of exposed sub-graph inputs currently fed by a link.
    pub fn subgraph_inputs_linked(&self, id: SubGraphId) -> usize {
        self.bin_links.iter().filter(|l| l.subgraph == id).count()
    }

    // ── End-of-stream and errors ──

    /// Deliver an end-of-stream signal to one exposed input port of a
    /// sub-graph. Once every exposed input has seen EOS, the sub-graph's
    /// completion is forwarded upward as [`GraphMessage::SubGraphEos`].
    pub fn send_eos(&mut self, subgraph: SubGraphId, port: &str) -> Result<()> {
        let slot = self.subgraph_slot_mut(subgraph)?;
        let bin_name = slot.graph.name().to_string();
        let exposed = slot
            .exposed
            .iter_mut()
            .find(|p| p.name == port)
            .ok_or(GraphError::PortNotFound {
                owner: bin_name,
                port: port.to_string(),
            })?;
        exposed.eos = true;

        if slot.exposed.iter().all(|p| p.eos) && !slot.eos_posted {
            slot.eos_posted = true;
            tracing::debug!("{}: sub-graph {} reached end-of-stream", self.name, subgraph);
            self.post(GraphMessage::SubGraphEos { subgraph });
        }
        Ok(())
    }

    /// Post a runtime stream error on the bus.
    pub fn post_error(&self, source: impl Into<String>, message: impl Into<String>) {
        let source = source.into();
        let message = message.into();
        tracing::error!("{}: error from {}: {}", self.name, source, message);
        self.post(GraphMessage::Error { source, message });
    }

    fn post(&self, msg: GraphMessage) {
        if let Some(tx) = &self.bus_tx {
            let _ = tx.send(msg);
        }
    }

    // ── Activity ──

    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Set the graph's activity, composing it over child sub-graphs.
    pub fn set_activity(&mut self, activity: Activity) {
        if self.activity == activity {
            return;
        }
        tracing::info!(
            "{}: activity {} -> {}",
            self.name,
            self.activity.display_name(),
            activity.display_name()
        );
        self.activity = activity;
        for slot in self.subgraphs.iter_mut().filter(|s| !s.removed) {
            slot.graph.set_activity(activity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::factory::NodeFactory;
    use crate::graph::registry::KindRegistry;
    use std::sync::Arc;

    fn factory() -> NodeFactory {
        NodeFactory::new(Arc::new(KindRegistry::with_builtins()))
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let factory = factory();
        let mut graph = Graph::new("g");
        factory.create_in(&mut graph, "queue", "q0").unwrap();
        let err = factory.create_in(&mut graph, "queue", "q0").unwrap_err();
        assert!(matches!(err, GraphError::DuplicateName(_)));
    }

    #[test]
    fn test_static_link_validation() {
        let factory = factory();
        let mut graph = Graph::new("g");
        let src = factory.create_in(&mut graph, "videotestsrc", "src").unwrap();
        let q = factory.create_in(&mut graph, "queue", "q").unwrap();
        let sink = factory.create_in(&mut graph, "fakesink", "sink").unwrap();

        graph.link(src, q).unwrap();
        graph.link(q, sink).unwrap();

        // A static output feeds at most one consumer.
        let q2 = factory.create_in(&mut graph, "queue", "q2").unwrap();
        assert!(matches!(
            graph.link(q, q2),
            Err(GraphError::AlreadyLinked { .. })
        ));
        // A sink has no output; a source has no input.
        assert!(matches!(graph.link(sink, q2), Err(GraphError::NoOutput(_))));
        assert!(matches!(graph.link(q2, src), Err(GraphError::NoInput(_))));
    }

    #[test]
    fn test_remove_node_drops_its_links() {
        let factory = factory();
        let mut graph = Graph::new("g");
        let src = factory.create_in(&mut graph, "videotestsrc", "src").unwrap();
        let q = factory.create_in(&mut graph, "queue", "q").unwrap();
        let sink = factory.create_in(&mut graph, "fakesink", "sink").unwrap();
        graph.link(src, q).unwrap();
        graph.link(q, sink).unwrap();

        graph.remove_node(q).unwrap();
        assert!(graph.node(q).is_err());
        assert!(graph.links().is_empty());
        assert!(!graph.node_ids().contains(&q));
        assert_eq!(graph.node_count(), 2);
        assert!(graph.find("q").is_none());
    }

    #[test]
    fn test_branch_point_fans_out() {
        let factory = factory();
        let mut graph = Graph::new("g");
        let tee = factory.create_in(&mut graph, "tee", "tee").unwrap();
        let a = factory.create_in(&mut graph, "fakesink", "a").unwrap();
        let b = factory.create_in(&mut graph, "fakesink", "b").unwrap();

        graph.link(tee, a).unwrap();
        graph.link(tee, b).unwrap();
        assert_eq!(graph.node(tee).unwrap().request_ports().len(), 2);
    }

    #[test]
    fn test_release_port_severs_link() {
        let factory = factory();
        let mut graph = Graph::new("g");
        let tee = factory.create_in(&mut graph, "tee", "tee").unwrap();
        let sink = factory.create_in(&mut graph, "fakesink", "s").unwrap();

        graph.link(tee, sink).unwrap();
        let port = graph.node(tee).unwrap().request_ports()[0].clone();
        assert_eq!(graph.links().len(), 1);

        graph.release_output_port(tee, &port).unwrap();
        assert!(graph.links().is_empty());
        assert!(graph.node(tee).unwrap().request_ports().is_empty());
    }

    #[test]
    fn test_subgraph_eos_posted_once_all_inputs_drained() {
        let factory = factory();
        let (mut graph, bus) = Graph::with_bus("live");

        let mut bin = Graph::new("bin");
        let vq = factory.create_in(&mut bin, "queue", "vq").unwrap();
        let aq = factory.create_in(&mut bin, "queue", "aq").unwrap();
        let id = graph
            .add_subgraph(bin, vec![("video".into(), vq), ("audio".into(), aq)])
            .unwrap();

        graph.send_eos(id, "video").unwrap();
        assert!(bus.try_recv().is_err());
        graph.send_eos(id, "audio").unwrap();
        assert!(matches!(
            bus.try_recv().unwrap(),
            GraphMessage::SubGraphEos { subgraph } if subgraph == id
        ));
        // Repeat deliveries never post a second completion.
        graph.send_eos(id, "audio").unwrap();
        assert!(bus.try_recv().is_err());
    }

    #[test]
    fn test_subgraph_exposed_node_must_be_inside_the_bin() {
        let factory = factory();
        let (mut graph, _bus) = Graph::with_bus("live");
        let bin = Graph::new("bin");
        // An id from the outer graph does not resolve inside the bin.
        let outer = factory.create_in(&mut graph, "queue", "q").unwrap();
        assert!(matches!(
            graph.add_subgraph(bin, vec![("in".into(), outer)]),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_subgraph_removal_requires_inactive() {
        let factory = factory();
        let (mut graph, _bus) = Graph::with_bus("live");
        let mut bin = Graph::new("bin");
        let q = factory.create_in(&mut bin, "queue", "q").unwrap();
        let id = graph.add_subgraph(bin, vec![("in".into(), q)]).unwrap();

        graph.set_subgraph_activity(id, Activity::Active).unwrap();
        assert!(matches!(
            graph.remove_subgraph(id),
            Err(GraphError::SubGraphStillActive(_))
        ));

        graph.set_subgraph_activity(id, Activity::Inactive).unwrap();
        graph.remove_subgraph(id).unwrap();
        assert!(!graph.contains_subgraph(id));
    }

    #[test]
    fn test_activity_composes_over_subgraphs() {
        let factory = factory();
        let (mut graph, _bus) = Graph::with_bus("live");
        let mut bin = Graph::new("bin");
        let q = factory.create_in(&mut bin, "queue", "q").unwrap();
        let id = graph.add_subgraph(bin, vec![("in".into(), q)]).unwrap();

        graph.set_activity(Activity::Active);
        assert_eq!(graph.subgraph_activity(id).unwrap(), Activity::Active);
    }
}
