//! Node — one stage of a processing graph.
//!
//! A node is an opaque processing unit identified by (kind, unique name).
//! Its property bag is laid out by the kind's [`KindSpec`]; values start
//! at their declared defaults. Branch-point and muxer nodes additionally
//! track their live request ports.

use crate::error::{GraphError, Result};
use crate::graph::registry::{KindSpec, NodeClass};
use crate::graph::property::{PropertySpec, PropertyValue};
use std::fmt;
use std::sync::Arc;

/// Opaque handle to an embeddable display surface, produced once by a
/// display-class node and handed off to the UI collaborator.
#[derive(Clone)]
pub struct DisplayHandle(Arc<DisplaySurface>);

struct DisplaySurface {
    node: String,
}

impl DisplayHandle {
    fn new(node: &str) -> Self {
        Self(Arc::new(DisplaySurface {
            node: node.to_string(),
        }))
    }

    /// Name of the node that renders into this surface.
    pub fn node_name(&self) -> &str {
        &self.0.node
    }
}

impl fmt::Debug for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayHandle({})", self.0.node)
    }
}

/// One processing node: kind spec, unique name, property bag, request ports.
pub struct Node {
    spec: Arc<KindSpec>,
    name: String,
    values: Vec<PropertyValue>,
    request_ports: Vec<String>,
    next_port_seq: u32,
    display: Option<DisplayHandle>,
}

impl Node {
    pub(crate) fn from_spec(spec: Arc<KindSpec>, name: impl Into<String>) -> Self {
        let name = name.into();
        let values = spec.props.iter().map(|p| p.default.clone()).collect();
        let display = if spec.class == NodeClass::Display {
            Some(DisplayHandle::new(&name))
        } else {
            None
        };
        Self {
            spec,
            name,
            values,
            request_ports: Vec::new(),
            next_port_seq: 0,
            display,
        }
    }

    pub fn kind(&self) -> &str {
        &self.spec.name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> NodeClass {
        self.spec.class
    }

    pub fn spec(&self) -> &KindSpec {
        &self.spec
    }

    /// Declared spec for a named property, with its bag index.
    pub fn prop_spec(&self, name: &str) -> Option<(usize, &PropertySpec)> {
        self.spec.find_prop(name)
    }

    /// Current value of a named property.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.spec.find_prop(name).map(|(i, _)| &self.values[i])
    }

    /// Assign a property. The value's type must match the declared kind.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<()> {
        let (index, spec) = self.spec.find_prop(name).ok_or_else(|| {
            GraphError::NoSuchProperty {
                node: self.name.clone(),
                name: name.to_string(),
            }
        })?;
        if !value.matches(&spec.kind) {
            return Err(GraphError::PropertyTypeMismatch {
                node: self.name.clone(),
                name: name.to_string(),
                given: value.kind_name(),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    /// Live request ports on this node, in allocation order.
    pub fn request_ports(&self) -> &[String] {
        &self.request_ports
    }

    /// Allocate a new request port. Names are `src_%u` for branch points
    /// and `sink_%u` for muxers; the sequence never repeats a name.
    pub(crate) fn allocate_request_port(&mut self) -> Result<String> {
        let prefix = if self.spec.class.has_request_outputs() {
            "src"
        } else if self.spec.class.has_request_inputs() {
            "sink"
        } else {
            return Err(GraphError::NotABranchPoint(self.name.clone()));
        };
        let port = format!("{prefix}_{}", self.next_port_seq);
        self.next_port_seq += 1;
        self.request_ports.push(port.clone());
        Ok(port)
    }

    pub(crate) fn release_request_port(&mut self, port: &str) -> Result<()> {
        let index = self
            .request_ports
            .iter()
            .position(|p| p == port)
            .ok_or_else(|| GraphError::PortNotFound {
                owner: self.name.clone(),
                port: port.to_string(),
            })?;
        self.request_ports.remove(index);
        Ok(())
    }

    /// The display surface, for display-class nodes.
    pub fn display_handle(&self) -> Option<DisplayHandle> {
        self.display.clone()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.spec.name)
            .field("name", &self.name)
            .field("class", &self.spec.class)
            .field("request_ports", &self.request_ports)
            .finish()
    }
}
