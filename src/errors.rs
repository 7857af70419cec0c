// src/errors.rs

//! Crate-wide error type and helpers.

use std::fmt;

use thiserror::Error;

use crate::engine::Diagnostic;
use crate::item::ItemId;
use crate::step::StepName;

#[derive(Error, Debug)]
pub enum StepGraphError {
    /// The declarations do not form a valid chain. Every problem found is
    /// listed, not just the first one.
    #[error("Chain build failed with {} problem(s):\n{}", .0.len(), ProblemList(.0))]
    Build(Vec<BuildProblem>),

    /// The caller supplied or requested an item that the chain never declared.
    #[error("Undeclared item: {0}")]
    UndeclaredItem(ItemId),

    #[error("No value was produced for final item {0}")]
    NoValue(ItemId),

    #[error("Initial item {0} supplied more than once")]
    DuplicateInitial(ItemId),

    #[error("Step '{step}' did not declare that it consumes {item}")]
    UndeclaredConsume { step: StepName, item: ItemId },

    #[error("Step '{step}' did not declare that it produces {item}")]
    UndeclaredProduce { step: StepName, item: ItemId },

    #[error("Step '{step}' produced {item}, which already has a value")]
    AlreadyProduced { step: StepName, item: ItemId },

    #[error("Step '{step}' consumed {item}, but no value was produced")]
    MissingValue { step: StepName, item: ItemId },

    /// One or more steps failed; raised once the whole run has settled.
    #[error(transparent)]
    Run(#[from] RunFailure),

    /// Internal scheduling defect: some steps never executed.
    #[error("Scheduling error: {executed} of {expected} step(s) executed")]
    Scheduling { expected: usize, executed: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StepGraphError>;

/// One reason a set of declarations could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildProblem {
    /// Two steps declared a step name already in use.
    DuplicateStep { name: StepName },
    /// A simple item has more than one producer of the same strength.
    ConflictingProducers {
        item: ItemId,
        first: StepName,
        second: StepName,
        weak: bool,
    },
    /// A step produces an item that the caller supplies up front.
    ProducesInitial { item: ItemId, step: StepName },
    /// A required item has neither a producer nor an initial value.
    MissingProducer {
        item: ItemId,
        consumers: Vec<StepName>,
    },
    /// Steps that depend on each other, directly or transitively.
    Cycle { steps: Vec<StepName> },
    /// A step provider failed while installing its steps.
    Provider { message: String },
}

impl fmt::Display for BuildProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildProblem::DuplicateStep { name } => {
                write!(f, "step name '{name}' is declared more than once")
            }
            BuildProblem::ConflictingProducers {
                item,
                first,
                second,
                weak,
            } => write!(
                f,
                "multiple {}producers of item {item} ('{first}' and '{second}')",
                if *weak { "weak " } else { "" }
            ),
            BuildProblem::ProducesInitial { item, step } => write!(
                f,
                "item {item} cannot be produced by step '{step}' (it is an initial item)"
            ),
            BuildProblem::MissingProducer { item, consumers } => write!(
                f,
                "no producers for required item {item} (consumed by {})",
                quoted(consumers)
            ),
            BuildProblem::Cycle { steps } => {
                write!(f, "cycle detected between steps {}", quoted(steps))
            }
            BuildProblem::Provider { message } => write!(f, "step provider failed: {message}"),
        }
    }
}

fn quoted(names: &[StepName]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

struct ProblemList<'a>(&'a [BuildProblem]);

impl fmt::Display for ProblemList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, problem) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {problem}")?;
        }
        Ok(())
    }
}

/// Aggregate failure of a run.
///
/// The first error diagnostic carrying an underlying failure is the primary
/// cause; every other error diagnostic is kept as suppressed. The complete
/// diagnostics list (including warnings and notes) stays available.
#[derive(Debug, Clone)]
pub struct RunFailure {
    primary: Diagnostic,
    suppressed: Vec<Diagnostic>,
    diagnostics: Vec<Diagnostic>,
}

impl RunFailure {
    /// Build a failure from the diagnostics of a finished run.
    ///
    /// Returns `None` if no error diagnostic was recorded.
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Option<Self> {
        let errors: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.is_error()).collect();
        let primary_idx = errors
            .iter()
            .position(|d| d.cause().is_some())
            .or(if errors.is_empty() { None } else { Some(0) })?;

        let primary = errors[primary_idx].clone();
        let suppressed = errors
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != primary_idx)
            .map(|(_, d)| (*d).clone())
            .collect();

        Some(Self {
            primary,
            suppressed,
            diagnostics,
        })
    }

    pub fn primary(&self) -> &Diagnostic {
        &self.primary
    }

    pub fn suppressed(&self) -> &[Diagnostic] {
        &self.suppressed
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of error diagnostics in the run.
    pub fn error_count(&self) -> usize {
        1 + self.suppressed.len()
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Run failed with {} error(s): {}", self.error_count(), self.primary)?;
        for diag in &self.suppressed {
            write!(f, "\n  also: {diag}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let cause = self.primary.cause()?;
        let err: &(dyn std::error::Error + 'static) = &***cause;
        Some(err)
    }
}
