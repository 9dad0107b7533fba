//! Child cardinality checks.

use std::sync::Arc;

use crate::access::MdibAccess;
use crate::error::Violation;
use crate::model::{ChangeKind, DescriptionModifications};
use crate::preprocessing::PreprocessingSegment;
use crate::storage::MdibStorage;
use crate::taxonomy::Taxonomy;

/// Rejects a second child of a single-child kind under the same parent.
///
/// Both children already in the store and other inserts of the same batch
/// count. Root inserts are never limited.
pub struct CardinalityChecker {
    taxonomy: Arc<dyn Taxonomy>,
}

impl CardinalityChecker {
    pub fn new(taxonomy: Arc<dyn Taxonomy>) -> Self {
        Self { taxonomy }
    }
}

impl PreprocessingSegment for CardinalityChecker {
    fn name(&self) -> &'static str {
        "CardinalityChecker"
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
        let Some(parent) = &item.parent else {
            return Ok(());
        };
        let kind = item.descriptor.kind;
        if self.taxonomy.is_many_children_allowed(kind) {
            return Ok(());
        }

        let inserted_twice = batch.items().iter().enumerate().any(|(i, other)| {
            i != index
                && other.kind == ChangeKind::Insert
                && other.parent.as_ref() == Some(parent)
                && other.descriptor.kind == kind
        });
        if inserted_twice {
            return Err(Violation::ChildInsertedTwice {
                parent: parent.clone(),
                kind,
            });
        }

        if !storage.children_by_kind(parent.as_str(), kind).is_empty() {
            return Err(Violation::ChildExists {
                parent: parent.clone(),
                kind,
            });
        }
        Ok(())
    }
}
