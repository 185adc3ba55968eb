//! Live media graph core.
//!
//! A graph is a set of named nodes connected by ports. Node kinds come
//! from a [`registry::KindRegistry`] of reflected property specs, nodes
//! are instantiated through the [`factory::NodeFactory`], config strings
//! are coerced onto typed properties by [`coerce`], and full chains are
//! assembled from config by the [`builder::ChainBuilder`]. Recording
//! taps attach as sub-graphs managed in [`crate::control`].

pub mod builder;
pub mod caps;
pub mod coerce;
pub mod container;
pub mod factory;
pub mod id;
pub mod node;
pub mod property;
pub mod registry;

pub use builder::{BuiltGraph, ChainBuilder};
pub use caps::{Caps, CapsValue};
pub use container::{Activity, Graph, GraphMessage, Link};
pub use factory::NodeFactory;
pub use id::{NodeId, SubGraphId};
pub use node::{DisplayHandle, Node};
pub use property::{PropertyKind, PropertySpec, PropertyValue};
pub use registry::{KindRegistry, KindSpec, NodeClass};
