//! Node factory — instantiates nodes from registered kind specs.

use crate::error::{GraphError, Result};
use crate::graph::container::Graph;
use crate::graph::id::NodeId;
use crate::graph::node::Node;
use crate::graph::registry::KindRegistry;
use std::sync::Arc;

/// Creates nodes by kind name out of a shared [`KindRegistry`].
pub struct NodeFactory {
    registry: Arc<KindRegistry>,
}

impl NodeFactory {
    pub fn new(registry: Arc<KindRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Instantiate a node of the given kind with defaulted properties.
    pub fn create(&self, kind: &str, name: impl Into<String>) -> Result<Node> {
        let spec = self
            .registry
            .get(kind)
            .ok_or_else(|| GraphError::UnknownKind(kind.to_string()))?;
        let node = Node::from_spec(spec, name);
        tracing::debug!("created node {} ({})", node.name(), kind);
        Ok(node)
    }

    /// Instantiate a node and add it to `graph` in one step.
    pub fn create_in(&self, graph: &mut Graph, kind: &str, name: impl Into<String>) -> Result<NodeId> {
        let node = self.create(kind, name)?;
        graph.add_node(node)
    }
}
