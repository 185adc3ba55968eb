//! Error handling for the avgraph crate.
//!
//! Construction and dynamic-attach errors are synchronous `Result` values;
//! runtime stream errors travel over the graph's message bus instead
//! (see [`crate::graph::GraphMessage`]).

use crate::graph::id::{NodeId, SubGraphId};
use thiserror::Error;

/// Main error type for graph construction and mutation.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Requested node kind is not in the registry
    #[error("no node kind {0:?} is registered")]
    UnknownKind(String),

    /// A node with the same name already exists in the graph
    #[error("a node named {0:?} already exists in the graph")]
    DuplicateName(String),

    /// Node id does not resolve to a live node
    #[error("node {0} is not in the graph")]
    NodeNotFound(NodeId),

    /// Sub-graph id does not resolve to a live sub-graph
    #[error("sub-graph {0} is not in the graph")]
    SubGraphNotFound(SubGraphId),

    /// Named port does not exist on the node or sub-graph
    #[error("{owner}: no port named {port:?}")]
    PortNotFound { owner: String, port: String },

    /// Link source cannot produce data
    #[error("{0} has no output ports")]
    NoOutput(String),

    /// Link target cannot consume data
    #[error("{0} has no input ports")]
    NoInput(String),

    /// A static port may feed at most one consumer
    #[error("{owner}: port {port:?} is already linked")]
    AlreadyLinked { owner: String, port: String },

    /// Dynamic output ports were requested from a node that has none
    #[error("{0} does not provide request ports")]
    NotABranchPoint(String),

    /// Property name not declared by the node's kind
    #[error("{node} has no property {name:?}")]
    NoSuchProperty { node: String, name: String },

    /// Property assignment with a value of the wrong type
    #[error("{node}.{name}: value of type {given} does not match the declared property type")]
    PropertyTypeMismatch {
        node: String,
        name: String,
        given: &'static str,
    },

    /// Node does not expose an embeddable display surface
    #[error("{0} does not provide a display surface")]
    NoDisplaySurface(String),

    /// A chain specification contained no usable tokens
    #[error("empty {0} chain specification")]
    EmptyChain(&'static str),

    /// `start()` called while a recording session exists
    #[error("recorder is not idle (state: {0})")]
    RecorderBusy(&'static str),

    /// Recording requires both branch points
    #[error("branch point for the {0} lineage is missing")]
    BranchPointMissing(&'static str),

    /// Sub-graphs must be deactivated before removal
    #[error("sub-graph {0} must be inactive before removal")]
    SubGraphStillActive(SubGraphId),

    /// Errors related to configuration loading
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors (recording directory creation, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias used throughout the crate.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;
