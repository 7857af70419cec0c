// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::logging::LogLevel;

/// Engine configuration as read from a TOML file.
///
/// ```toml
/// [pool]
/// core_threads = 8
/// max_threads = 1024
/// keep_alive_ms = 60000
/// thread_name = "stepgraph-worker"
///
/// [graph]
/// output = "chain.dot"
///
/// [logging]
/// level = "debug"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub pool: WorkerPoolConfig,

    #[serde(default)]
    pub graph: GraphSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Validated engine configuration.
///
/// Constructed through `TryFrom<RawEngineConfig>` (see `config::validate`)
/// or [`EngineConfig::default`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub pool: WorkerPoolConfig,
    pub graph: GraphSection,
    pub logging: LoggingSection,
}

impl EngineConfig {
    pub(crate) fn new_unchecked(
        pool: WorkerPoolConfig,
        graph: GraphSection,
        logging: LoggingSection,
    ) -> Self {
        Self {
            pool,
            graph,
            logging,
        }
    }
}

/// `[pool]` section: sizing of the worker pool that runs step bodies.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerPoolConfig {
    /// Async worker threads of the pool's runtime. These only host the
    /// runtime itself; step bodies never run on them, so this does not
    /// bound or reserve step concurrency.
    #[serde(default = "default_core_threads")]
    pub core_threads: usize,

    /// Upper bound on threads running step bodies at the same time. These
    /// threads are spawned on demand, none exist before the first step.
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,

    /// Idle time after which an extra thread is retired.
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,

    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_core_threads() -> usize {
    8
}

fn default_max_threads() -> usize {
    1024
}

fn default_keep_alive_ms() -> u64 {
    60_000
}

fn default_thread_name() -> String {
    "stepgraph-worker".to_string()
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            core_threads: default_core_threads(),
            max_threads: default_max_threads(),
            keep_alive_ms: default_keep_alive_ms(),
            thread_name: default_thread_name(),
        }
    }
}

/// `[graph]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GraphSection {
    /// If set, every compiled graph is written here in Graphviz DOT format.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingSection {
    /// If `None`, `STEPGRAPH_LOG` or the default level is used.
    #[serde(default)]
    pub level: Option<LogLevel>,
}
