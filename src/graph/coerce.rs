//! Property coercion — turns raw config strings into typed property values.
//!
//! Configuration sections carry every value as a string. Each assignment is
//! coerced against the target node's reflected property kind. Coercion is
//! forgiving at the section level: an unknown property or an unparseable
//! value skips that one assignment (logged) and leaves the default in
//! place, so a typo in a config file never takes the whole graph down.

use crate::graph::caps::{Caps, CapsParseError};
use crate::graph::node::Node;
use crate::graph::property::{EnumVariant, FlagVariant, PropertyKind, PropertyValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoerceError {
    #[error("unknown enum token '{0}'")]
    UnknownEnumToken(String),
    #[error("unknown flag token '{0}'")]
    UnknownFlagToken(String),
    #[error("cannot parse '{0}' as {1}")]
    Parse(String, &'static str),
    #[error("invalid caps: {0}")]
    Caps(#[from] CapsParseError),
    #[error("{0} properties cannot be set from config")]
    NotCoercible(&'static str),
}

/// Apply every `key = value` assignment from a config section to `node`.
pub fn apply_section(node: &mut Node, section: &[(String, String)]) {
    for (key, raw) in section {
        apply(node, key, raw);
    }
}

/// Apply one string-valued assignment to a node property.
///
/// Assignments naming a property the node does not have, and values that
/// fail to coerce, are skipped with the default left intact.
pub fn apply(node: &mut Node, key: &str, raw: &str) {
    let Some((_, spec)) = node.prop_spec(key) else {
        tracing::debug!("{}: no property '{}', skipping", node.name(), key);
        return;
    };
    match coerce(&spec.kind, raw) {
        Ok(value) => {
            tracing::debug!("{}: {} = {}", node.name(), key, raw);
            let _ = node.set_property(key, value);
        }
        Err(err) => {
            tracing::warn!(
                "{}: cannot set {} from '{}': {}, keeping default",
                node.name(),
                key,
                raw,
                err
            );
        }
    }
}

fn coerce(kind: &PropertyKind, raw: &str) -> Result<PropertyValue, CoerceError> {
    match kind {
        PropertyKind::Str => Ok(PropertyValue::Str(raw.to_string())),
        PropertyKind::I32 => parse_num(raw, "i32").map(PropertyValue::I32),
        PropertyKind::U32 => parse_num(raw, "u32").map(PropertyValue::U32),
        PropertyKind::I64 => parse_num(raw, "i64").map(PropertyValue::I64),
        PropertyKind::U64 => parse_num(raw, "u64").map(PropertyValue::U64),
        PropertyKind::F64 => parse_num(raw, "f64").map(PropertyValue::F64),
        PropertyKind::Bool => coerce_bool(raw).map(PropertyValue::Bool),
        PropertyKind::Enum(variants) => coerce_enum(variants, raw).map(PropertyValue::Enum),
        PropertyKind::Flags(variants) => coerce_flags(variants, raw).map(PropertyValue::Flags),
        PropertyKind::Caps => Ok(PropertyValue::Caps(raw.parse::<Caps>()?)),
        PropertyKind::Object => Err(CoerceError::NotCoercible("object")),
    }
}

fn parse_num<T: std::str::FromStr>(raw: &str, kind: &'static str) -> Result<T, CoerceError> {
    raw.trim()
        .parse()
        .map_err(|_| CoerceError::Parse(raw.to_string(), kind))
}

fn coerce_bool(raw: &str) -> Result<bool, CoerceError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "t" => Ok(true),
        "0" | "false" | "no" | "n" | "f" => Ok(false),
        _ => Err(CoerceError::Parse(raw.to_string(), "bool")),
    }
}

/// Enum tokens resolve by nick, then by full name, then as a raw numeric
/// value for variants without a listed token.
fn coerce_enum(variants: &[EnumVariant], raw: &str) -> Result<i32, CoerceError> {
    let token = raw.trim();
    if let Some(v) = variants.iter().find(|v| v.nick == token) {
        return Ok(v.value);
    }
    if let Some(v) = variants.iter().find(|v| v.name == token) {
        return Ok(v.value);
    }
    token
        .parse()
        .map_err(|_| CoerceError::UnknownEnumToken(token.to_string()))
}

/// Flag values are a `|` (or `,`) separated token list, ORed together.
/// A single unknown token rejects the whole assignment.
fn coerce_flags(variants: &[FlagVariant], raw: &str) -> Result<u32, CoerceError> {
    let mut bits = 0u32;
    for token in raw.split(['|', ',']).map(str::trim).filter(|t| !t.is_empty()) {
        let variant = variants
            .iter()
            .find(|v| v.nick == token || v.name == token)
            .ok_or_else(|| CoerceError::UnknownFlagToken(token.to_string()))?;
        bits |= variant.bits;
    }
    Ok(bits)
}
