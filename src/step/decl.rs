// src/step/decl.rs

//! Produce/consume declarations attached to a step.
//!
//! A step may declare the same item more than once (for instance once as
//! ordering-only and once as a real dependency). Declarations are merged
//! with [`Produce::combine`] / [`Consume::combine`]:
//! - the merged constraint is `Real` if any declaration was `Real`;
//! - a flag survives only if *every* merged declaration carried it.

/// Strength of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// A value flows between producer and consumer.
    Real,
    /// Only the relative execution order matters.
    OrderOnly,
}

impl Constraint {
    pub fn combine(self, other: Constraint) -> Constraint {
        if self == Constraint::Real || other == Constraint::Real {
            Constraint::Real
        } else {
            Constraint::OrderOnly
        }
    }
}

/// Flags on a produce declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProduceFlags {
    weak: bool,
}

impl ProduceFlags {
    pub const NONE: ProduceFlags = ProduceFlags { weak: false };
    /// The producer is a default that a non-weak producer overrides.
    pub const WEAK: ProduceFlags = ProduceFlags { weak: true };

    pub fn is_weak(self) -> bool {
        self.weak
    }

    fn intersect(self, other: ProduceFlags) -> ProduceFlags {
        ProduceFlags {
            weak: self.weak && other.weak,
        }
    }
}

/// Flags on a consume declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConsumeFlags {
    optional: bool,
}

impl ConsumeFlags {
    pub const NONE: ConsumeFlags = ConsumeFlags { optional: false };
    /// Having no producer at all is acceptable.
    pub const OPTIONAL: ConsumeFlags = ConsumeFlags { optional: true };

    pub fn is_optional(self) -> bool {
        self.optional
    }

    fn intersect(self, other: ConsumeFlags) -> ConsumeFlags {
        ConsumeFlags {
            optional: self.optional && other.optional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Produce {
    pub constraint: Constraint,
    pub flags: ProduceFlags,
}

impl Produce {
    pub fn new(constraint: Constraint, flags: ProduceFlags) -> Self {
        Self { constraint, flags }
    }

    pub fn combine(self, other: Produce) -> Produce {
        Produce {
            constraint: self.constraint.combine(other.constraint),
            flags: self.flags.intersect(other.flags),
        }
    }

    pub fn is_real(&self) -> bool {
        self.constraint == Constraint::Real
    }

    pub fn is_weak(&self) -> bool {
        self.flags.is_weak()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consume {
    pub constraint: Constraint,
    pub flags: ConsumeFlags,
}

impl Consume {
    pub fn new(constraint: Constraint, flags: ConsumeFlags) -> Self {
        Self { constraint, flags }
    }

    pub fn combine(self, other: Consume) -> Consume {
        Consume {
            constraint: self.constraint.combine(other.constraint),
            flags: self.flags.intersect(other.flags),
        }
    }

    pub fn is_real(&self) -> bool {
        self.constraint == Constraint::Real
    }

    pub fn is_optional(&self) -> bool {
        self.flags.is_optional()
    }
}
