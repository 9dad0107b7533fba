//! Change sets produced by a commit.

use rustc_hash::FxHashMap;

use crate::model::{Handle, MdibEntity, MdibVersion, State};

/// What a committed description batch changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDescriptionResult {
    /// MDIB version of the commit.
    pub mdib_version: MdibVersion,
    /// Inserted entities, as stored after the whole batch was applied.
    pub inserted_entities: Vec<MdibEntity>,
    /// Updated entities, as stored after the whole batch was applied.
    pub updated_entities: Vec<MdibEntity>,
    /// Handles of deleted entities.
    pub deleted_handles: Vec<Handle>,
}

impl WriteDescriptionResult {
    /// Returns true if the commit changed nothing.
    pub fn is_empty(&self) -> bool {
        self.inserted_entities.is_empty()
            && self.updated_entities.is_empty()
            && self.deleted_handles.is_empty()
    }
}

/// What a committed state batch changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteStateResult {
    /// MDIB version of the commit.
    pub mdib_version: MdibVersion,
    /// Changed states grouped by the handle of their top-level (root) entity.
    pub states: FxHashMap<Handle, Vec<State>>,
}

impl WriteStateResult {
    /// Returns the total number of changed states.
    pub fn len(&self) -> usize {
        self.states.values().map(Vec::len).sum()
    }

    /// Returns true if no state was changed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all changed states regardless of owner.
    pub fn iter_states(&self) -> impl Iterator<Item = &State> {
        self.states.values().flatten()
    }
}
