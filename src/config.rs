//! Configuration loading.
//!
//! The config file is TOML. The `[main]` table names the video and audio
//! chains and the recording settings; every other table is a property
//! section applied verbatim to the node(s) the chain builder creates for
//! the matching token. Section values stay as strings until coercion, so
//! the config layer needs no knowledge of node property types.

use crate::error::{GraphError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Read access to named, ordered property sections.
pub trait PropertyLookup {
    fn section(&self, name: &str) -> Option<&[(String, String)]>;
}

/// Named property sections in file order, values kept as raw strings.
#[derive(Debug, Clone, Default)]
pub struct SectionMap {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl SectionMap {
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        if let Some((_, props)) = self.sections.iter_mut().find(|(n, _)| n == section) {
            props.push((key.to_string(), value.to_string()));
            return;
        }
        self.sections.push((
            section.to_string(),
            vec![(key.to_string(), value.to_string())],
        ));
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl PropertyLookup for SectionMap {
    fn section(&self, name: &str) -> Option<&[(String, String)]> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, props)| props.as_slice())
    }
}

/// Recording settings from `[main]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingConfig {
    /// Directory recordings are written into.
    #[serde(default = "default_record_dir")]
    pub directory: PathBuf,
    /// Video encoder kind used in the recording tap.
    #[serde(default = "default_encoder")]
    pub encoder: String,
}

fn default_record_dir() -> PathBuf {
    std::env::temp_dir().join("recordings")
}

fn default_encoder() -> String {
    String::from("x264enc")
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            directory: default_record_dir(),
            encoder: default_encoder(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MainSection {
    pipeline_video: String,
    #[serde(default)]
    pipeline_audio: Option<String>,
    #[serde(default = "default_record_dir")]
    record_path: PathBuf,
    #[serde(default = "default_encoder")]
    encoder: String,
}

/// The parsed application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub video_chain: String,
    pub audio_chain: Option<String>,
    pub recording: RecordingConfig,
    pub sections: SectionMap,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| GraphError::Config(e.to_string()))?;

        let main: MainSection = table
            .get("main")
            .ok_or_else(|| GraphError::Config(String::from("missing [main] section")))?
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| GraphError::Config(e.to_string()))?;

        let mut sections = SectionMap::default();
        for (name, value) in &table {
            if name == "main" {
                continue;
            }
            let toml::Value::Table(props) = value else {
                return Err(GraphError::Config(format!(
                    "section [{name}] is not a table"
                )));
            };
            for (key, value) in props {
                sections.set(name, key, &stringify(value));
            }
        }

        tracing::debug!(
            "config: video '{}', audio {}, {} property sections",
            main.pipeline_video,
            main.pipeline_audio.as_deref().unwrap_or("(none)"),
            table.len().saturating_sub(1),
        );
        Ok(Self {
            video_chain: main.pipeline_video,
            audio_chain: main.pipeline_audio,
            recording: RecordingConfig {
                directory: main.record_path,
                encoder: main.encoder,
            },
            sections,
        })
    }
}

/// Section values become the raw strings the coercer expects; only
/// strings need unquoting.
fn stringify(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
