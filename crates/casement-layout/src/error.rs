//! Error taxonomy for sash tree operations.
//!
//! Expected failures (bad IDs, positions, or geometry supplied by the caller)
//! are returned as [`SashError`] values and leave the tree untouched.
//! [`InvariantViolation`] describes a structurally malformed tree; it is a
//! defect in the mutation engine, never a consequence of caller input.

use crate::sash::{SashId, SashPosition};

/// Failure returned by tree queries, the layout solver, and mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SashError {
    #[error("{id} not found")]
    NotFound { id: SashId },
    #[error("{id} is a split, expected a leaf")]
    NotLeaf { id: SashId },
    #[error("invalid position {position:?}: {reason}")]
    InvalidPosition {
        position: SashPosition,
        reason: &'static str,
    },
    #[error("invalid geometry {width}x{height}: {reason}")]
    InvalidGeometry {
        width: u32,
        height: u32,
        reason: &'static str,
    },
    #[error("{id} is already in use")]
    DuplicateId { id: SashId },
    #[error("sash id 0 is invalid")]
    ZeroId,
    #[error("sash id overflow after {current}")]
    IdOverflow { current: SashId },
    #[error("invalid layout configuration: {reason}")]
    InvalidConfig { reason: String },
    #[error("structural invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// Coarse classification of [`SashError`] for callers that only branch on
/// the failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SashErrorKind {
    NotFound,
    InvalidPosition,
    InvalidGeometry,
    StructuralInvariantViolation,
}

impl SashError {
    /// Failure family.
    #[must_use]
    pub const fn kind(&self) -> SashErrorKind {
        match self {
            Self::NotFound { .. } => SashErrorKind::NotFound,
            Self::NotLeaf { .. }
            | Self::InvalidPosition { .. }
            | Self::DuplicateId { .. }
            | Self::ZeroId
            | Self::InvalidConfig { .. } => SashErrorKind::InvalidPosition,
            Self::InvalidGeometry { .. } => SashErrorKind::InvalidGeometry,
            Self::IdOverflow { .. } | Self::Invariant(_) => {
                SashErrorKind::StructuralInvariantViolation
            }
        }
    }

    /// True for defects that no caller input can explain.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.kind(), SashErrorKind::StructuralInvariantViolation)
    }
}

/// A broken structural invariant detected by [`crate::SashTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("root {root} not found")]
    MissingRoot { root: SashId },
    #[error("root {root} must not have parent {parent}")]
    RootHasParent { root: SashId, parent: SashId },
    #[error("split {parent} references missing child {child}")]
    MissingChild { parent: SashId, child: SashId },
    #[error("split {node_id} references child {child} twice")]
    DuplicateChild { node_id: SashId, child: SashId },
    #[error("split {node_id} cannot reference itself")]
    SelfReferentialSplit { node_id: SashId },
    #[error("{child} has multiple parents: {first_parent} and {second_parent}")]
    MultipleParents {
        child: SashId,
        first_parent: SashId,
        second_parent: SashId,
    },
    #[error("{node_id} parent mismatch: expected {expected:?}, got {actual:?}")]
    ParentMismatch {
        node_id: SashId,
        expected: Option<SashId>,
        actual: Option<SashId>,
    },
    #[error("{node_id} has position {actual:?}, expected {expected:?}")]
    PositionMismatch {
        node_id: SashId,
        expected: SashPosition,
        actual: SashPosition,
    },
    #[error("cycle detected at {node_id}")]
    CycleDetected { node_id: SashId },
    #[error("{node_id} is unreachable from root")]
    UnreachableNode { node_id: SashId },
    #[error("next id {next_id} must be greater than max existing id {max_existing}")]
    StaleAllocator {
        next_id: SashId,
        max_existing: SashId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> SashId {
        SashId::new(raw).expect("test ID must be non-zero")
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            SashError::NotFound { id: id(3) }.kind(),
            SashErrorKind::NotFound
        );
        assert_eq!(
            SashError::NotLeaf { id: id(3) }.kind(),
            SashErrorKind::InvalidPosition
        );
        assert_eq!(
            SashError::InvalidGeometry {
                width: 0,
                height: 10,
                reason: "zero width",
            }
            .kind(),
            SashErrorKind::InvalidGeometry
        );
        let fatal = SashError::from(InvariantViolation::MissingRoot { root: id(1) });
        assert!(fatal.is_fatal());
        assert!(!SashError::ZeroId.is_fatal());
    }

    #[test]
    fn messages_name_the_sash() {
        assert_eq!(
            SashError::NotFound { id: id(7) }.to_string(),
            "sash-7 not found"
        );
        assert_eq!(
            SashError::from(InvariantViolation::MissingChild {
                parent: id(1),
                child: id(9),
            })
            .to_string(),
            "structural invariant violated: split sash-1 references missing child sash-9"
        );
    }
}
