//! Contract between the perch daemon and its analysis engine collaborator.
//!
//! The daemon never inspects analysis documents; it constructs one engine
//! per project and forwards opaque JSON requests to it. This crate owns that
//! boundary: the [`AnalysisEngine`] trait and its construction contract
//! ([`EngineSettings`], [`EngineFactory`]), the file-read callback the
//! engine uses to pull sources on demand ([`FileLoader`]), the library
//! definition documents handed over at construction, and the explicit
//! registry of supported engine plugins.
//!
//! A [`StubEngine`] ships alongside the contract so the daemon is runnable
//! and testable end to end before a full engine is linked in.

mod definitions;
mod engine;
mod registry;
mod stub;

pub use definitions::LibraryDefinition;
pub use engine::{AnalysisEngine, EngineError, EngineFactory, EngineSettings, FileLoader};
pub use registry::{PluginRegistry, PluginSpec, RegistryError, builtin_registry};
pub use stub::{StubEngine, StubEngineFactory};
