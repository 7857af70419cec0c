// src/step/provider.rs

//! Pluggable source of step declarations.
//!
//! How providers are found is up to the caller; the chain builder only sees
//! the explicit list handed to [`ChainBuilder::add_provider`].
//!
//! [`ChainBuilder::add_provider`]: crate::graph::ChainBuilder::add_provider

use crate::graph::ChainBuilder;

/// Installs steps (and possibly initial/final items) into a chain builder.
pub trait StepProvider {
    fn install(&self, chain: &mut ChainBuilder) -> anyhow::Result<()>;
}

impl<F> StepProvider for F
where
    F: Fn(&mut ChainBuilder) -> anyhow::Result<()>,
{
    fn install(&self, chain: &mut ChainBuilder) -> anyhow::Result<()> {
        self(chain)
    }
}
