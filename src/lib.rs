//! avgraph — live audio/video processing graphs with tap-in recording.
//!
//! The crate assembles a live capture/display graph from a TOML config
//! and lets a recording branch be tapped in and out of it at runtime
//! without interrupting playback.
//!
//! # Architecture
//!
//! - [`graph`] is the core: node kinds with reflected properties
//!   ([`graph::registry`]), instantiation ([`graph::factory`]), string
//!   to typed-value coercion ([`graph::coerce`]), the graph container
//!   with links, sub-graphs and the message bus ([`graph::container`]),
//!   and chain-string assembly ([`graph::builder`]).
//! - [`config`] loads the TOML file: the `[main]` chains plus raw
//!   per-kind property sections.
//! - [`control`] drives the runtime: the recording branch lifecycle
//!   ([`control::recorder`]), deferred cleanup ([`control::scheduler`])
//!   and the command/message pump ([`control::ControlLoop`]).
//!
//! ```no_run
//! use avgraph::config::AppConfig;
//! use avgraph::control::{BranchController, ControlLoop};
//! use avgraph::graph::{ChainBuilder, KindRegistry, NodeFactory};
//! use std::sync::Arc;
//!
//! # fn main() -> avgraph::Result<()> {
//! let config = AppConfig::load("capture.toml")?;
//! let factory = NodeFactory::new(Arc::new(KindRegistry::with_builtins()));
//! let built = ChainBuilder::new(&factory, &config.sections)
//!     .build(&config.video_chain, config.audio_chain.as_deref())?;
//!
//! let controller =
//!     BranchController::new(config.recording, built.video_branch, built.audio_branch);
//! let (mut control, commands, events) =
//!     ControlLoop::new(built.graph, built.bus, controller, factory, config.sections);
//! control.run();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod graph;

pub use error::{GraphError, Result};
