//! Parent version propagation.

use crate::error::Violation;
use crate::model::{ChangeKind, DescriptionModifications};
use crate::preprocessing::PreprocessingSegment;
use crate::preprocessing::version::VersionHandler;
use crate::storage::MdibStorage;

/// Appends an update of the parent for every insert and delete.
///
/// The appended update is picked up later in the same pass, so the version
/// handler bumps the parent's descriptor version once per batch. Must run
/// before the version handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentVersionPropagator;

impl ParentVersionPropagator {
    pub fn new() -> Self {
        Self
    }
}

impl PreprocessingSegment for ParentVersionPropagator {
    fn name(&self) -> &'static str {
        "ParentVersionPropagator"
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
        if matches!(item.kind, ChangeKind::Insert | ChangeKind::Delete) {
            VersionHandler::increment_parent(batch, index, storage);
        }
        Ok(())
    }
}
