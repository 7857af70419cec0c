// src/config/mod.rs

//! Engine configuration.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk or a string (`loader.rs`).
//! - Validate pool sizing and paths (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{from_toml_str, load_and_validate, load_from_path};
pub use model::{EngineConfig, GraphSection, LoggingSection, RawEngineConfig, WorkerPoolConfig};
