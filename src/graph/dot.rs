// src/graph/dot.rs

//! Graphviz rendering of a compiled graph, for debugging chain layouts.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::errors::Result;
use crate::graph::CompiledGraph;

impl CompiledGraph {
    /// Render the step graph in DOT format.
    ///
    /// Start steps share the first rank and end steps the last one; each
    /// edge points from a producer to the step it unblocks.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        out.push_str("digraph {\n");
        out.push_str("    node [shape=rectangle];\n");
        out.push_str("    rankdir=LR;\n\n");

        out.push_str("    { rank = same; ");
        for step in self.start_steps() {
            let _ = write!(out, "{}; ", quote(step.name()));
        }
        out.push_str("};\n");

        out.push_str("    { rank = same; ");
        for step in self.steps().iter().filter(|s| s.is_end_step() && !s.is_start_step()) {
            let _ = write!(out, "{}; ", quote(step.name()));
        }
        out.push_str("};\n\n");

        for step in self.steps() {
            for &dependent in step.dependents() {
                let _ = writeln!(
                    out,
                    "    {} -> {}",
                    quote(step.name()),
                    quote(self.steps[dependent].name())
                );
            }
        }

        out.push_str("}\n");
        out
    }

    /// Write [`CompiledGraph::to_dot`] output to `path`.
    pub fn write_dot(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_dot())?;
        info!(path = %path.display(), "wrote chain graph");
        Ok(())
    }
}

fn quote(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
