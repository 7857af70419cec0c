// src/config/validate.rs

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::{Result, StepGraphError};

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = StepGraphError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(EngineConfig::new_unchecked(raw.pool, raw.graph, raw.logging))
    }
}

fn validate_raw_config(cfg: &RawEngineConfig) -> Result<()> {
    validate_pool(cfg)?;
    validate_graph(cfg)?;
    Ok(())
}

fn validate_pool(cfg: &RawEngineConfig) -> Result<()> {
    let pool = &cfg.pool;

    if pool.core_threads == 0 {
        return Err(StepGraphError::ConfigError(
            "[pool].core_threads must be >= 1 (got 0)".to_string(),
        ));
    }

    if pool.max_threads < pool.core_threads {
        return Err(StepGraphError::ConfigError(format!(
            "[pool].max_threads ({}) must be >= [pool].core_threads ({})",
            pool.max_threads, pool.core_threads
        )));
    }

    if pool.thread_name.trim().is_empty() {
        return Err(StepGraphError::ConfigError(
            "[pool].thread_name must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_graph(cfg: &RawEngineConfig) -> Result<()> {
    if let Some(path) = &cfg.graph.output {
        if path.as_os_str().is_empty() {
            return Err(StepGraphError::ConfigError(
                "[graph].output must not be an empty path".to_string(),
            ));
        }
    }
    Ok(())
}
