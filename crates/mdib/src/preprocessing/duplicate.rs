//! Duplicate handle detection.

use rustc_hash::FxHashSet;

use crate::access::MdibAccess;
use crate::error::Violation;
use crate::model::{ChangeKind, DescriptionModifications, Handle};
use crate::preprocessing::PreprocessingSegment;
use crate::storage::MdibStorage;

/// Rejects inserts of handles that already exist.
///
/// Descriptor handles are checked against the store and against earlier
/// inserts of the same batch. Context state handles are checked the same way
/// against the context state index.
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    inserted: FxHashSet<Handle>,
    inserted_context_states: FxHashSet<Handle>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreprocessingSegment for DuplicateDetector {
    fn name(&self) -> &'static str {
        "DuplicateDetector"
    }

    fn before_batch(&mut self, _storage: &MdibStorage) {
        self.inserted.clear();
        self.inserted_context_states.clear();
    }

    fn process_description(
        &mut self,
        batch: &mut DescriptionModifications,
        index: usize,
        storage: &MdibStorage,
    ) -> Result<(), Violation> {
        let Some(item) = batch.get(index) else {
            return Ok(());
        };
        if item.kind != ChangeKind::Insert {
            return Ok(());
        }

        let handle = item.handle();
        if storage.entity(handle.as_str()).is_some() {
            return Err(Violation::HandleExists {
                handle: handle.clone(),
            });
        }
        if !self.inserted.insert(handle.clone()) {
            return Err(Violation::HandleInsertedTwice {
                handle: handle.clone(),
            });
        }

        for state in item.states.iter().filter(|s| s.is_context()) {
            let state_handle = state.handle();
            if storage.context_state(state_handle.as_str()).is_some() {
                return Err(Violation::HandleExists {
                    handle: state_handle.clone(),
                });
            }
            if !self.inserted_context_states.insert(state_handle.clone()) {
                return Err(Violation::HandleInsertedTwice {
                    handle: state_handle.clone(),
                });
            }
        }
        Ok(())
    }
}
