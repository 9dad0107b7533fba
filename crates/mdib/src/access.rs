//! Read and write access to an MDIB.
//!
//! [`MdibAccess`] is the read API shared by the store and by read
//! transactions. [`LocalMdibAccess`] owns the store behind a single lock and
//! is the only place batches are preprocessed and committed.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::config::MdibConfig;
use crate::error::PreprocessingError;
use crate::model::{
    Descriptor, DescriptionModifications, DescriptorKind, MdibEntity, MdibVersion, State,
    StateKind, StateModifications,
};
use crate::preprocessing::{PreprocessingChain, PreprocessingSegment};
use crate::storage::{MdibStorage, WriteDescriptionResult, WriteStateResult};
use crate::taxonomy::{StandardTaxonomy, Taxonomy};

/// Read-only queries on an MDIB.
pub trait MdibAccess {
    /// Version of the last committed write.
    fn mdib_version(&self) -> MdibVersion;

    /// Description version counter.
    fn md_description_version(&self) -> u64;

    /// State version counter.
    fn md_state_version(&self) -> u64;

    /// Looks up an entity by descriptor handle.
    fn entity(&self, handle: &str) -> Option<&MdibEntity>;

    /// All entities whose descriptor has the given kind.
    fn find_entities_by_kind(&self, kind: DescriptorKind) -> Vec<&MdibEntity>;

    /// Children of `handle` with the given kind.
    fn children_by_kind(&self, handle: &str, kind: DescriptorKind) -> Vec<&MdibEntity>;

    /// Root entities in insertion order.
    fn root_entities(&self) -> Vec<&MdibEntity>;

    /// Looks up a single state by descriptor handle or a context state by
    /// its own handle.
    fn state(&self, handle: &str) -> Option<&State>;

    /// All context states.
    fn context_states(&self) -> Vec<&State>;

    /// All context states of the given kind.
    fn context_states_by_kind(&self, kind: StateKind) -> Vec<&State>;

    /// States of a multi-state descriptor. Empty for single-state
    /// descriptors and unknown handles.
    fn multi_states(&self, handle: &str) -> Vec<&State>;

    /// Looks up a descriptor by handle.
    fn descriptor(&self, handle: &str) -> Option<&Descriptor> {
        self.entity(handle).map(|entity| &entity.descriptor)
    }

    /// Looks up a descriptor by handle, if it has the given kind.
    fn descriptor_of_kind(&self, handle: &str, kind: DescriptorKind) -> Option<&Descriptor> {
        self.descriptor(handle)
            .filter(|descriptor| descriptor.kind == kind)
    }

    /// Context states of the context descriptor `handle`.
    fn context_states_of(&self, handle: &str) -> Vec<&State> {
        self.multi_states(handle)
    }
}

struct Inner {
    storage: MdibStorage,
    chain: PreprocessingChain,
}

/// An MDIB owned by the local process.
///
/// Writes lock the MDIB, run the batch through the preprocessing chain,
/// assign the next MDIB version and commit. A rejected batch leaves the MDIB
/// untouched.
///
/// # Example
///
/// ```rust
/// use mdib::access::{LocalMdibAccess, MdibAccess};
/// use mdib::model::{Descriptor, DescriptionModifications, DescriptorKind, State, StateKind};
///
/// let mdib = LocalMdibAccess::new();
/// let result = mdib
///     .write_description(DescriptionModifications::new().insert(
///         Descriptor::new("mds0", DescriptorKind::Mds),
///         [State::new(StateKind::Mds, "mds0")],
///         None,
///     ))
///     .unwrap();
/// assert_eq!(result.inserted_entities.len(), 1);
///
/// let txn = mdib.start_transaction();
/// assert_eq!(txn.root_entities().len(), 1);
/// assert_eq!(txn.descriptor("mds0").unwrap().version, 0);
/// ```
pub struct LocalMdibAccess {
    inner: Mutex<Inner>,
}

impl LocalMdibAccess {
    /// Creates an empty MDIB with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MdibConfig::default())
    }

    /// Creates an empty MDIB using the standard taxonomy.
    pub fn with_config(config: MdibConfig) -> Self {
        Self::with_taxonomy(Arc::new(StandardTaxonomy::new()), config)
    }

    /// Creates an empty MDIB with the default chain for `taxonomy`.
    pub fn with_taxonomy(taxonomy: Arc<dyn Taxonomy>, config: MdibConfig) -> Self {
        let chain = PreprocessingChain::standard(taxonomy.clone(), &config);
        Self::from_parts(MdibStorage::new(taxonomy, &config), chain)
    }

    /// Creates an empty MDIB with a custom segment list.
    pub fn with_segments(
        taxonomy: Arc<dyn Taxonomy>,
        config: MdibConfig,
        segments: Vec<Box<dyn PreprocessingSegment>>,
    ) -> Self {
        Self::from_parts(
            MdibStorage::new(taxonomy, &config),
            PreprocessingChain::new(segments),
        )
    }

    fn from_parts(storage: MdibStorage, chain: PreprocessingChain) -> Self {
        Self {
            inner: Mutex::new(Inner { storage, chain }),
        }
    }

    /// Preprocesses and commits a description batch.
    ///
    /// Increments the MDIB version and both the description and state
    /// version counters.
    pub fn write_description(
        &self,
        mut batch: DescriptionModifications,
    ) -> Result<WriteDescriptionResult, PreprocessingError> {
        let mut inner = self.inner.lock();
        let Inner { storage, chain } = &mut *inner;
        chain.process_descriptions(&mut batch, storage)?;

        let mdib_version = storage.mdib_version().increment();
        let description_version = storage.md_description_version() + 1;
        let state_version = storage.md_state_version() + 1;
        let result = storage.apply_description_changes(
            mdib_version,
            Some(description_version),
            Some(state_version),
            batch,
        );
        debug!(
            mdib_version = %result.mdib_version,
            inserted = result.inserted_entities.len(),
            updated = result.updated_entities.len(),
            deleted = result.deleted_handles.len(),
            "description committed"
        );
        Ok(result)
    }

    /// Preprocesses and commits a state batch.
    ///
    /// Increments the MDIB version and the state version counter.
    pub fn write_states(
        &self,
        mut batch: StateModifications,
    ) -> Result<WriteStateResult, PreprocessingError> {
        let mut inner = self.inner.lock();
        let Inner { storage, chain } = &mut *inner;
        chain.process_states(&mut batch, storage)?;

        let mdib_version = storage.mdib_version().increment();
        let state_version = storage.md_state_version() + 1;
        let result = storage.apply_state_changes(mdib_version, Some(state_version), batch);
        debug!(
            mdib_version = %result.mdib_version,
            states = result.len(),
            "states committed"
        );
        Ok(result)
    }

    /// Locks the MDIB for reading.
    ///
    /// Writers block until the transaction is dropped.
    pub fn start_transaction(&self) -> ReadTransaction<'_> {
        ReadTransaction {
            guard: self.inner.lock(),
        }
    }
}

impl Default for LocalMdibAccess {
    fn default() -> Self {
        Self::new()
    }
}

/// A consistent read view of a [`LocalMdibAccess`].
pub struct ReadTransaction<'a> {
    guard: MutexGuard<'a, Inner>,
}

impl ReadTransaction<'_> {
    fn storage(&self) -> &MdibStorage {
        &self.guard.storage
    }
}

impl MdibAccess for ReadTransaction<'_> {
    fn mdib_version(&self) -> MdibVersion {
        self.storage().mdib_version()
    }

    fn md_description_version(&self) -> u64 {
        self.storage().md_description_version()
    }

    fn md_state_version(&self) -> u64 {
        self.storage().md_state_version()
    }

    fn entity(&self, handle: &str) -> Option<&MdibEntity> {
        self.storage().entity(handle)
    }

    fn find_entities_by_kind(&self, kind: DescriptorKind) -> Vec<&MdibEntity> {
        self.storage().find_entities_by_kind(kind)
    }

    fn children_by_kind(&self, handle: &str, kind: DescriptorKind) -> Vec<&MdibEntity> {
        self.storage().children_by_kind(handle, kind)
    }

    fn root_entities(&self) -> Vec<&MdibEntity> {
        self.storage().root_entities()
    }

    fn state(&self, handle: &str) -> Option<&State> {
        self.storage().state(handle)
    }

    fn context_states(&self) -> Vec<&State> {
        self.storage().context_states()
    }

    fn context_states_by_kind(&self, kind: StateKind) -> Vec<&State> {
        self.storage().context_states_by_kind(kind)
    }

    fn multi_states(&self, handle: &str) -> Vec<&State> {
        self.storage().multi_states(handle)
    }
}
