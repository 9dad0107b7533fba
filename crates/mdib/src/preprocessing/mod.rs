//! The write-path preprocessing pipeline.
//!
//! Every batch runs through an ordered list of segments before it reaches the
//! store. Segments validate or rewrite one change at a time and may keep
//! per-batch state between the `before_batch` and `after_batch` hooks.
//!
//! Description segments:
//! - [`DuplicateDetector`]: inserts of existing handles
//! - [`TypeConsistencyChecker`]: parent kinds and descriptor/state pairing
//! - [`CardinalityChecker`]: single-child kinds
//! - [`ParentVersionPropagator`]: parent updates for structural changes (optional)
//! - [`VersionHandler`]: descriptor and state versions (also runs on state batches)

pub mod cardinality;
pub mod chain;
pub mod duplicate;
pub mod parent;
pub mod type_consistency;
pub mod version;

use crate::error::Violation;
use crate::model::{DescriptionModifications, StateModifications};
use crate::storage::MdibStorage;

pub use cardinality::CardinalityChecker;
pub use chain::PreprocessingChain;
pub use duplicate::DuplicateDetector;
pub use parent::ParentVersionPropagator;
pub use type_consistency::TypeConsistencyChecker;
pub use version::{VersionHandler, VersionPair};

/// One step of the preprocessing pipeline.
///
/// A segment takes part in description batches, state batches, or both, as
/// reported by [`processes_descriptions`](Self::processes_descriptions) and
/// [`processes_states`](Self::processes_states). The chain only calls the
/// matching `process_*` method.
pub trait PreprocessingSegment: Send {
    /// Name used in error reports and logs.
    fn name(&self) -> &'static str;

    /// Whether this segment runs on description batches.
    fn processes_descriptions(&self) -> bool {
        true
    }

    /// Whether this segment runs on state batches.
    fn processes_states(&self) -> bool {
        false
    }

    /// Called once before the first change of a batch.
    fn before_batch(&mut self, _storage: &MdibStorage) {}

    /// Called once after the last change of a batch passed all segments.
    fn after_batch(&mut self, _storage: &MdibStorage) {}

    /// Processes the description change at `index`.
    ///
    /// Segments may rewrite that change and append new changes to the batch.
    fn process_description(
        &mut self,
        _batch: &mut DescriptionModifications,
        _index: usize,
        _storage: &MdibStorage,
    ) -> Result<(), Violation> {
        Ok(())
    }

    /// Processes the state change at `index`.
    fn process_state(
        &mut self,
        _batch: &mut StateModifications,
        _index: usize,
        _storage: &MdibStorage,
    ) -> Result<(), Violation> {
        Ok(())
    }
}
