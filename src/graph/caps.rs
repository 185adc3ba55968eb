//! String-encoded format descriptions ("caps").
//!
//! A caps value describes the media format flowing between two nodes:
//! a media type followed by optional key=value fields, e.g.
//! `video/x-raw, width=1280, height=720, framerate=60/1, format=NV12`.
//! Nodes treat the description as opaque; only `capsfilter` interprets it.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a caps string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapsParseError {
    #[error("caps string is empty")]
    Empty,

    #[error("invalid media type {0:?}")]
    InvalidMediaType(String),

    #[error("field {0:?} is missing a value")]
    MissingValue(String),

    #[error("field entry {0:?} has an empty key")]
    EmptyKey(String),
}

/// A single typed field value inside a caps description.
#[derive(Debug, Clone, PartialEq)]
pub enum CapsValue {
    Int(i64),
    /// Numerator/denominator pair, e.g. `60/1` for a frame rate.
    Fraction(i32, i32),
    Bool(bool),
    Str(String),
}

impl fmt::Display for CapsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapsValue::Int(v) => write!(f, "{v}"),
            CapsValue::Fraction(n, d) => write!(f, "{n}/{d}"),
            CapsValue::Bool(v) => write!(f, "{v}"),
            CapsValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// A parsed format description: media type plus ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Caps {
    media_type: String,
    fields: Vec<(String, CapsValue)>,
}

impl Caps {
    /// The unconstrained caps, matching any format.
    pub fn any() -> Self {
        Self {
            media_type: String::from("ANY"),
            fields: Vec::new(),
        }
    }

    pub fn is_any(&self) -> bool {
        self.media_type == "ANY" && self.fields.is_empty()
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn fields(&self) -> &[(String, CapsValue)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&CapsValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

impl FromStr for Caps {
    type Err = CapsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(str::trim);

        let media_type = parts.next().filter(|p| !p.is_empty()).ok_or(CapsParseError::Empty)?;
        if media_type.contains('=') || (media_type != "ANY" && !media_type.contains('/')) {
            return Err(CapsParseError::InvalidMediaType(media_type.to_string()));
        }

        let mut fields = Vec::new();
        for part in parts {
            if part.is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| CapsParseError::MissingValue(part.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CapsParseError::EmptyKey(part.to_string()));
            }
            fields.push((key.to_string(), parse_value(value.trim())));
        }

        Ok(Self {
            media_type: media_type.to_string(),
            fields,
        })
    }
}

fn parse_value(raw: &str) -> CapsValue {
    if let Ok(b) = raw.parse::<bool>() {
        return CapsValue::Bool(b);
    }
    if let Some((num, den)) = raw.split_once('/') {
        if let (Ok(n), Ok(d)) = (num.parse::<i32>(), den.parse::<i32>()) {
            return CapsValue::Fraction(n, d);
        }
    }
    if let Ok(i) = raw.parse::<i64>() {
        return CapsValue::Int(i);
    }
    CapsValue::Str(raw.trim_matches('"').to_string())
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.media_type)?;
        for (key, value) in &self.fields {
            write!(f, ", {key}={value}")?;
        }
        Ok(())
    }
}
