//! Parent kind and descriptor/state pairing checks.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::access::MdibAccess;
use crate::error::Violation;
use crate::model::{ChangeKind, DescriptionItem, DescriptionModifications, DescriptorKind};
use crate::preprocessing::PreprocessingSegment;
use crate::storage::MdibStorage;
use crate::taxonomy::Taxonomy;

/// Checks that inserts are placed under an allowed parent kind, that updates
/// keep the descriptor kind and that inserted or updated states fit their
/// descriptor.
///
/// The root kind must not have a parent, every other kind must. A parent is
/// resolved from the store first and then from earlier inserts of the same
/// batch, so a whole subtree can be inserted at once.
pub struct TypeConsistencyChecker {
    taxonomy: Arc<dyn Taxonomy>,
}

impl TypeConsistencyChecker {
    pub fn new(taxonomy: Arc<dyn Taxonomy>) -> Self {
        Self { taxonomy }
    }

    fn check_parent(
        &self,
        batch: &DescriptionModifications,
        index: usize,
        item: &DescriptionItem,
        storage: &MdibStorage,
    ) -> Result<(), Violation> {
        let kind = item.descriptor.kind;
        let is_root = kind == self.taxonomy.root_kind();
        let parent = match (&item.parent, is_root) {
            (None, true) => return Ok(()),
            (Some(parent), true) => {
                return Err(Violation::RootWithParent {
                    kind,
                    parent: parent.clone(),
                });
            }
            (None, false) => return Err(Violation::MissingParent { kind }),
            (Some(parent), false) => parent,
        };

        let parent_kind = self
            .resolve_kind(batch, index, parent.as_str(), storage)
            .ok_or_else(|| Violation::ParentNotFound {
                parent: parent.clone(),
            })?;
        if !self.taxonomy.allowed_parent_kinds(kind).contains(&parent_kind) {
            return Err(Violation::ForbiddenParent { kind, parent_kind });
        }
        Ok(())
    }

    /// Kind of `handle` in the store or, failing that, of its insert earlier
    /// in the batch.
    fn resolve_kind(
        &self,
        batch: &DescriptionModifications,
        index: usize,
        handle: &str,
        storage: &MdibStorage,
    ) -> Option<DescriptorKind> {
        if let Some(entity) = storage.entity(handle) {
            return Some(entity.descriptor.kind);
        }
        batch.items()[..index]
            .iter()
            .find(|earlier| earlier.kind == ChangeKind::Insert && earlier.descriptor.handle == *handle)
            .map(|earlier| earlier.descriptor.kind)
    }

    fn check_kind_unchanged(
        &self,
        batch: &DescriptionModifications,
        index: usize,
        item: &DescriptionItem,
        storage: &MdibStorage,
    ) -> Result<(), Violation> {
        // Unknown handles are left to the version handler
        let Some(known) = self.resolve_kind(batch, index, item.handle().as_str(), storage) else {
            return Ok(());
        };
        if known != item.descriptor.kind {
            return Err(Violation::KindChanged {
                handle: item.handle().clone(),
                known,
                found: item.descriptor.kind,
            });
        }
        Ok(())
    }

    fn check_states(&self, item: &DescriptionItem) -> Result<(), Violation> {
        let descriptor_kind = item.descriptor.kind;
        let expected = self.taxonomy.state_kind_for(descriptor_kind);
        let multi_state = self.taxonomy.is_multi_state_kind(descriptor_kind);

        for state in &item.states {
            if state.kind != expected {
                return Err(Violation::StateKindMismatch {
                    descriptor_kind,
                    found: state.kind,
                });
            }
            if state.descriptor_handle != item.descriptor.handle {
                return Err(Violation::StateDescriptorMismatch {
                    expected: item.descriptor.handle.clone(),
                    found: state.descriptor_handle.clone(),
                });
            }
            if state.is_context() != multi_state {
                return Err(Violation::ContextHandleMismatch {
                    kind: descriptor_kind,
                    requirement: if multi_state { "carry" } else { "not carry" },
                });
            }
        }

        if multi_state {
            let mut seen = FxHashSet::default();
            for state in &item.states {
                if !seen.insert(state.handle()) {
                    return Err(Violation::ContextStateRepeated {
                        handle: state.handle().clone(),
                    });
                }
            }
        } else if item.states.len() != 1 {
            return Err(Violation::SingleStateCount {
                count: item.states.len(),
            });
        }
        Ok(())
    }
}

impl PreprocessingSegment for TypeConsistencyChecker {
    fn name(&self) -> &'static str {
        "TypeConsistencyChecker"
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
        match item.kind {
            ChangeKind::Insert => {
                self.check_parent(batch, index, item, storage)?;
                self.check_states(item)
            }
            ChangeKind::Update => {
                self.check_kind_unchanged(batch, index, item, storage)?;
                self.check_states(item)
            }
            ChangeKind::Delete => Ok(()),
        }
    }
}
