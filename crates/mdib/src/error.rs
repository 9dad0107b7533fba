//! Error types for MDIB preprocessing.

use thiserror::Error;

use crate::model::{DescriptorKind, Handle, StateKind};

/// Failure kinds of the write pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// An insert targets a handle that already exists.
    DuplicateHandle,
    /// Too many children of one kind under a parent.
    Cardinality,
    /// Missing or forbidden parent, or states that do not fit the descriptor.
    TypeConsistency,
    /// An update for a handle without a known version.
    MissingVersionState,
}

impl ViolationKind {
    /// Returns the stable code string (e.g. "duplicate-handle").
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::DuplicateHandle => "duplicate-handle",
            ViolationKind::Cardinality => "cardinality",
            ViolationKind::TypeConsistency => "type-consistency",
            ViolationKind::MissingVersionState => "missing-version-state",
        }
    }
}

/// The reason a single change was rejected by a preprocessing segment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    // === Duplicate handle ===
    #[error("[duplicate-handle] handle {handle} already exists")]
    HandleExists { handle: Handle },

    #[error("[duplicate-handle] handle {handle} is inserted more than once in one batch")]
    HandleInsertedTwice { handle: Handle },

    // === Cardinality ===
    #[error("[cardinality] {parent} already has a child of kind {kind}, only one is allowed")]
    ChildExists { parent: Handle, kind: DescriptorKind },

    #[error("[cardinality] batch inserts more than one {kind} under {parent}, only one is allowed")]
    ChildInsertedTwice { parent: Handle, kind: DescriptorKind },

    // === Type consistency ===
    #[error("[type-consistency] {kind} is a root kind and must not have a parent (found {parent})")]
    RootWithParent { kind: DescriptorKind, parent: Handle },

    #[error("[type-consistency] {kind} requires a parent")]
    MissingParent { kind: DescriptorKind },

    #[error("[type-consistency] parent {parent} not found")]
    ParentNotFound { parent: Handle },

    #[error("[type-consistency] {kind} is not allowed under {parent_kind}")]
    ForbiddenParent {
        kind: DescriptorKind,
        parent_kind: DescriptorKind,
    },

    #[error("[type-consistency] state kind {found} does not match descriptor kind {descriptor_kind}")]
    StateKindMismatch {
        descriptor_kind: DescriptorKind,
        found: StateKind,
    },

    #[error("[type-consistency] state refers to descriptor {found}, expected {expected}")]
    StateDescriptorMismatch { expected: Handle, found: Handle },

    #[error("[type-consistency] single-state descriptor carries {count} states, expected exactly 1")]
    SingleStateCount { count: usize },

    #[error("[type-consistency] state of a {kind} must {requirement} a context handle")]
    ContextHandleMismatch {
        kind: DescriptorKind,
        requirement: &'static str,
    },

    #[error("[type-consistency] context state {handle} appears more than once")]
    ContextStateRepeated { handle: Handle },

    #[error("[type-consistency] update of {handle} changes its kind from {known} to {found}")]
    KindChanged {
        handle: Handle,
        known: DescriptorKind,
        found: DescriptorKind,
    },

    // === Missing version state ===
    #[error("[missing-version-state] no version known for {handle}")]
    MissingVersion { handle: Handle },
}

impl Violation {
    /// Returns the failure kind of this violation.
    pub fn kind(&self) -> ViolationKind {
        match self {
            Violation::HandleExists { .. } | Violation::HandleInsertedTwice { .. } => {
                ViolationKind::DuplicateHandle
            }
            Violation::ChildExists { .. } | Violation::ChildInsertedTwice { .. } => {
                ViolationKind::Cardinality
            }
            Violation::MissingVersion { .. } => ViolationKind::MissingVersionState,
            _ => ViolationKind::TypeConsistency,
        }
    }
}

/// A rejected batch.
///
/// Carries the offending handle, its position in the batch and the name of
/// the segment that rejected it. No part of a rejected batch is committed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{segment} rejected {handle} at batch position {position}: {cause}")]
pub struct PreprocessingError {
    /// Handle of the rejected change.
    pub handle: Handle,
    /// Position of the rejected change in the (possibly grown) batch.
    pub position: usize,
    /// Name of the segment that rejected the change.
    pub segment: &'static str,
    /// Why the change was rejected.
    #[source]
    pub cause: Violation,
}

impl PreprocessingError {
    /// Returns the failure kind.
    pub fn kind(&self) -> ViolationKind {
        self.cause.kind()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_violation_kinds() {
        let dup = Violation::HandleExists { handle: "a".into() };
        assert_eq!(dup.kind(), ViolationKind::DuplicateHandle);
        assert_eq!(dup.kind().code(), "duplicate-handle");

        let card = Violation::ChildExists {
            parent: "mds0".into(),
            kind: DescriptorKind::Sco,
        };
        assert_eq!(card.kind(), ViolationKind::Cardinality);

        let missing = Violation::MissingParent { kind: DescriptorKind::Vmd };
        assert_eq!(missing.kind(), ViolationKind::TypeConsistency);

        let changed = Violation::KindChanged {
            handle: "ch0".into(),
            known: DescriptorKind::Channel,
            found: DescriptorKind::Vmd,
        };
        assert_eq!(changed.kind(), ViolationKind::TypeConsistency);
        assert_eq!(
            changed.to_string(),
            "[type-consistency] update of ch0 changes its kind from ChannelDescriptor to VmdDescriptor"
        );

        let version = Violation::MissingVersion { handle: "x".into() };
        assert_eq!(version.kind().code(), "missing-version-state");
    }

    #[test]
    fn test_wrapped_error_message_and_source() {
        let err = PreprocessingError {
            handle: "ch1".into(),
            position: 3,
            segment: "CardinalityChecker",
            cause: Violation::ChildExists {
                parent: "vmd0".into(),
                kind: DescriptorKind::AlertSystem,
            },
        };
        assert_eq!(
            err.to_string(),
            "CardinalityChecker rejected ch1 at batch position 3: [cardinality] vmd0 already has a \
             child of kind AlertSystemDescriptor, only one is allowed"
        );
        assert_eq!(err.kind(), ViolationKind::Cardinality);
        assert!(err.source().is_some());
    }
}
