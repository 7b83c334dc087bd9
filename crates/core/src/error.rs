//! Shared error taxonomy
//!
//! Every fallible operation across the engine returns [`GraphResult<T>`].
//! Variants are chosen so a caller can dispatch on `match` without string
//! matching: retryable conditions (`Conflict`, `Transient`) are distinguished
//! from terminal ones, and validation failures carry enough structure
//! ([`ErrorDetails`]) to build a REST problem response without re-deriving
//! context.

use crate::contract::BranchNameError;
use std::fmt;
use uuid::Uuid;

/// Result alias used throughout the engine.
pub type GraphResult<T> = Result<T, GraphError>;

/// The error taxonomy shared by every crate in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// No entity matched the requested id within the given branch/time view.
    #[error("not found: {kind} {id} on branch {branch}")]
    NotFound {
        /// Kind of entity that was looked up (`node`, `attribute`, `relationship`, `branch`).
        kind: &'static str,
        /// Id or name of the missing entity.
        id: String,
        /// Branch the lookup was scoped to.
        branch: String,
    },

    /// A branch create request named a branch that already exists.
    #[error("branch already exists: {name}")]
    BranchExists {
        /// The conflicting branch name.
        name: String,
    },

    /// A branch name failed the naming grammar.
    #[error("invalid branch name: {0}")]
    InvalidBranchName(#[from] BranchNameError),

    /// Two branches' schemas are incompatible for the attempted merge.
    #[error("schema mismatch on {kind} '{name}': {reason}")]
    SchemaMismatch {
        /// `attribute` or `relationship`.
        kind: &'static str,
        /// Name of the mismatched schema element.
        name: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A write failed a structural or type invariant.
    #[error("validation failed: {0}")]
    Validation(ErrorDetails),

    /// A merge could not be completed without manual conflict resolution.
    #[error("merge conflict: {} unresolved conflict(s)", conflicts.len())]
    MergeConflict {
        /// Conflicting field paths and their competing values.
        conflicts: Vec<MergeConflictEntry>,
    },

    /// A merge was rejected because the branches' schemas diverge incompatibly.
    #[error("schema conflict: {0}")]
    SchemaConflict(String),

    /// An optimistic-concurrency check lost a race with a concurrent writer.
    #[error("conflict: concurrent write to {entity} on branch {branch}")]
    Conflict {
        /// The entity whose precondition was violated.
        entity: String,
        /// Branch the write targeted.
        branch: String,
    },

    /// A retryable condition: lock contention, a busy queue, a timed-out dependency.
    #[error("transient failure: {0}")]
    Transient(String),

    /// A non-retryable internal failure.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl GraphError {
    /// Construct a [`GraphError::NotFound`] for a node lookup.
    pub fn node_not_found(id: Uuid, branch: impl Into<String>) -> Self {
        GraphError::NotFound {
            kind: "node",
            id: id.to_string(),
            branch: branch.into(),
        }
    }

    /// Construct a [`GraphError::NotFound`] for a branch lookup.
    pub fn branch_not_found(name: impl Into<String>) -> Self {
        GraphError::NotFound {
            kind: "branch",
            id: name.into(),
            branch: String::from("-"),
        }
    }

    /// Whether retrying the same operation, unmodified, might succeed.
    ///
    /// `Conflict` is retried at most once by callers that hold the relevant
    /// lock; `Transient` follows the bounded backoff policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GraphError::Conflict { .. } | GraphError::Transient(_))
    }
}

/// Structured detail for a [`GraphError::Validation`] failure.
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    /// Dotted path to the offending field, e.g. `attributes.hostname.value`.
    pub field: String,
    /// Why the field failed validation.
    pub reason: ConstraintReason,
}

impl ErrorDetails {
    /// Build a new detail record.
    pub fn new(field: impl Into<String>, reason: ConstraintReason) -> Self {
        ErrorDetails {
            field: field.into(),
            reason,
        }
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Why a field failed a structural or schema constraint.
#[derive(Debug, Clone)]
pub enum ConstraintReason {
    /// A value was required but absent.
    Required,
    /// A value's type didn't match the schema's declared kind.
    TypeMismatch {
        /// The kind the schema declares.
        expected: &'static str,
        /// The kind actually supplied.
        actual: &'static str,
    },
    /// A cardinality constraint (`one`/`many`) was violated.
    CardinalityViolation {
        /// The declared cardinality.
        expected: &'static str,
    },
    /// A peer kind referenced in a relationship doesn't match the schema.
    PeerKindMismatch {
        /// The kind the schema declares for the peer.
        expected: String,
        /// The kind actually referenced.
        actual: String,
    },
    /// A value didn't match any of the attribute's declared `choices`.
    NotInChoices {
        /// The value that was rejected, rendered for display.
        value: String,
    },
    /// A free-form constraint violation not covered above.
    Other(String),
}

impl fmt::Display for ConstraintReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintReason::Required => write!(f, "value is required"),
            ConstraintReason::TypeMismatch { expected, actual } => {
                write!(f, "expected type {expected}, got {actual}")
            }
            ConstraintReason::CardinalityViolation { expected } => {
                write!(f, "cardinality {expected} violated")
            }
            ConstraintReason::PeerKindMismatch { expected, actual } => {
                write!(f, "expected peer kind {expected}, got {actual}")
            }
            ConstraintReason::NotInChoices { value } => {
                write!(f, "{value} is not one of the attribute's allowed choices")
            }
            ConstraintReason::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// One unresolved conflict surfaced by a merge attempt.
#[derive(Debug, Clone)]
pub struct MergeConflictEntry {
    /// Dotted path identifying the conflicting field.
    pub path: String,
    /// The value on the source branch.
    pub source_value: String,
    /// The value on the target branch.
    pub target_value: String,
}

impl fmt::Display for MergeConflictEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: source={} target={}",
            self.path, self.source_value, self.target_value
        )
    }
}
