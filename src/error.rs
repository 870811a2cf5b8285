use std::fmt;
use thiserror::Error;

/// Kind of catalog entity named in a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Day,
    Slot,
    Class,
    Subject,
    Room,
    Teacher,
    Enrollment,
    Binding,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Day => "day",
            EntityKind::Slot => "slot",
            EntityKind::Class => "class",
            EntityKind::Subject => "subject",
            EntityKind::Room => "room",
            EntityKind::Teacher => "teacher",
            EntityKind::Enrollment => "enrollment",
            EntityKind::Binding => "teacher binding",
        };
        f.write_str(name)
    }
}

/// Errors raised while building a model or applying its hooks.
///
/// These abort model construction and are always surfaced before any solve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Unknown {kind} '{name}' referenced by {context}")]
    UnknownEntity {
        kind: EntityKind,
        name: String,
        context: String,
    },

    #[error("Duplicate {kind} '{name}'")]
    DuplicateEntity { kind: EntityKind, name: String },

    #[error(
        "Conflicting fixed slot for class '{class}' at {day}/{slot}: '{existing}' conflicts with '{incoming}'"
    )]
    ConflictingFixedSlot {
        class: String,
        day: String,
        slot: String,
        existing: String,
        incoming: String,
    },

    #[error("Subject '{subject}' of class '{class}' can never be scheduled: {reason}")]
    EmptyDomain {
        class: String,
        subject: String,
        reason: String,
    },

    #[error("Invalid model options: {0}")]
    InvalidOptions(String),
}

/// Errors raised by the solver engine itself. Infeasibility and timeouts are
/// outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("Invalid solve options: {0}")]
    InvalidOptions(String),

    #[error("Solver backend failed: {0}")]
    Backend(String),
}

/// Either failure, for callers that build and solve in one step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimetableError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Solve(#[from] SolveError),
}
