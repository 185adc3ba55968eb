//! Typed property model for nodes.
//!
//! Every node kind declares its properties once, at registry construction
//! time, as a table of [`PropertySpec`]s. Value kinds form a closed tagged
//! enum, so coercion dispatches over [`PropertyKind`] variants instead of
//! comparing runtime type-name strings.

use crate::graph::caps::Caps;
use crate::graph::id::NodeId;

/// One symbolic value of an enumerated property.
#[derive(Debug, Clone)]
pub struct EnumVariant {
    /// Full symbolic name, e.g. `GST_QUEUE_LEAKY_UPSTREAM`-style long form.
    pub name: &'static str,
    /// Short name used in configuration files, e.g. `upstream`.
    pub nick: &'static str,
    pub value: i32,
}

impl EnumVariant {
    pub const fn new(name: &'static str, nick: &'static str, value: i32) -> Self {
        Self { name, nick, value }
    }
}

/// One symbolic bit pattern of a flags property.
#[derive(Debug, Clone)]
pub struct FlagVariant {
    pub name: &'static str,
    pub nick: &'static str,
    pub bits: u32,
}

impl FlagVariant {
    pub const fn new(name: &'static str, nick: &'static str, bits: u32) -> Self {
        Self { name, nick, bits }
    }
}

/// The declared value kind of a property.
#[derive(Debug, Clone)]
pub enum PropertyKind {
    Str,
    I32,
    U32,
    I64,
    U64,
    F64,
    Bool,
    /// Closed set of symbolic values.
    Enum(Vec<EnumVariant>),
    /// OR-able set of symbolic bit patterns.
    Flags(Vec<FlagVariant>),
    /// String-encoded format description.
    Caps,
    /// Reference to another node; not coercible from strings.
    Object,
}

impl PropertyKind {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyKind::Str => "string",
            PropertyKind::I32 => "i32",
            PropertyKind::U32 => "u32",
            PropertyKind::I64 => "i64",
            PropertyKind::U64 => "u64",
            PropertyKind::F64 => "f64",
            PropertyKind::Bool => "bool",
            PropertyKind::Enum(_) => "enum",
            PropertyKind::Flags(_) => "flags",
            PropertyKind::Caps => "caps",
            PropertyKind::Object => "object",
        }
    }
}

/// A concrete property value held in a node's property bag.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    /// Numeric value of an enumerated property.
    Enum(i32),
    /// OR-ed bit pattern of a flags property.
    Flags(u32),
    Caps(Caps),
    Object(NodeId),
}

impl PropertyValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::Str(_) => "string",
            PropertyValue::I32(_) => "i32",
            PropertyValue::U32(_) => "u32",
            PropertyValue::I64(_) => "i64",
            PropertyValue::U64(_) => "u64",
            PropertyValue::F64(_) => "f64",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Enum(_) => "enum",
            PropertyValue::Flags(_) => "flags",
            PropertyValue::Caps(_) => "caps",
            PropertyValue::Object(_) => "object",
        }
    }

    /// Whether this value is assignable to a property of the given kind.
    pub fn matches(&self, kind: &PropertyKind) -> bool {
        matches!(
            (self, kind),
            (PropertyValue::Str(_), PropertyKind::Str)
                | (PropertyValue::I32(_), PropertyKind::I32)
                | (PropertyValue::U32(_), PropertyKind::U32)
                | (PropertyValue::I64(_), PropertyKind::I64)
                | (PropertyValue::U64(_), PropertyKind::U64)
                | (PropertyValue::F64(_), PropertyKind::F64)
                | (PropertyValue::Bool(_), PropertyKind::Bool)
                | (PropertyValue::Enum(_), PropertyKind::Enum(_))
                | (PropertyValue::Flags(_), PropertyKind::Flags(_))
                | (PropertyValue::Caps(_), PropertyKind::Caps)
                | (PropertyValue::Object(_), PropertyKind::Object)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            PropertyValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<i32> {
        match self {
            PropertyValue::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<u32> {
        match self {
            PropertyValue::Flags(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_caps(&self) -> Option<&Caps> {
        match self {
            PropertyValue::Caps(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<NodeId> {
        match self {
            PropertyValue::Object(v) => Some(*v),
            _ => None,
        }
    }
}

/// Declaration of one property on a node kind: name, kind, default.
#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub name: &'static str,
    pub kind: PropertyKind,
    pub default: PropertyValue,
}

impl PropertySpec {
    pub fn str(name: &'static str, default: &str) -> Self {
        Self {
            name,
            kind: PropertyKind::Str,
            default: PropertyValue::Str(default.to_string()),
        }
    }

    pub fn i32(name: &'static str, default: i32) -> Self {
        Self {
            name,
            kind: PropertyKind::I32,
            default: PropertyValue::I32(default),
        }
    }

    pub fn u32(name: &'static str, default: u32) -> Self {
        Self {
            name,
            kind: PropertyKind::U32,
            default: PropertyValue::U32(default),
        }
    }

    pub fn i64(name: &'static str, default: i64) -> Self {
        Self {
            name,
            kind: PropertyKind::I64,
            default: PropertyValue::I64(default),
        }
    }

    pub fn u64(name: &'static str, default: u64) -> Self {
        Self {
            name,
            kind: PropertyKind::U64,
            default: PropertyValue::U64(default),
        }
    }

    pub fn f64(name: &'static str, default: f64) -> Self {
        Self {
            name,
            kind: PropertyKind::F64,
            default: PropertyValue::F64(default),
        }
    }

    pub fn bool(name: &'static str, default: bool) -> Self {
        Self {
            name,
            kind: PropertyKind::Bool,
            default: PropertyValue::Bool(default),
        }
    }

    pub fn enumeration(name: &'static str, variants: Vec<EnumVariant>, default: i32) -> Self {
        Self {
            name,
            kind: PropertyKind::Enum(variants),
            default: PropertyValue::Enum(default),
        }
    }

    pub fn flags(name: &'static str, variants: Vec<FlagVariant>, default: u32) -> Self {
        Self {
            name,
            kind: PropertyKind::Flags(variants),
            default: PropertyValue::Flags(default),
        }
    }

    pub fn caps(name: &'static str) -> Self {
        Self {
            name,
            kind: PropertyKind::Caps,
            default: PropertyValue::Caps(Caps::any()),
        }
    }

    pub fn object(name: &'static str) -> Self {
        Self {
            name,
            kind: PropertyKind::Object,
            default: PropertyValue::Object(NodeId::INVALID),
        }
    }
}
