//! Descriptor and state version assignment.
//!
//! Versions are tracked per handle as a [`VersionPair`]. Descriptor versions
//! grow by one per structural change of a handle, state versions by one per
//! value change of a state handle, independently of each other. Context
//! states are tracked under their own handles.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::access::MdibAccess;
use crate::error::Violation;
use crate::model::{
    ChangeKind, DescriptionItem, DescriptionModifications, EntityStates, Handle,
    StateModifications, UNVERSIONED, Version,
};
use crate::preprocessing::PreprocessingSegment;
use crate::storage::MdibStorage;
use crate::taxonomy::Taxonomy;

/// Last assigned descriptor and state version of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPair {
    pub descriptor_version: Version,
    pub state_version: Version,
}

impl Default for VersionPair {
    fn default() -> Self {
        Self {
            descriptor_version: UNVERSIONED,
            state_version: UNVERSIONED,
        }
    }
}

/// Assigns descriptor and state versions.
///
/// A descriptor is bumped at most once per batch. Handles missing from the
/// cache but present in the store are seeded from the stored versions.
///
/// Versions assigned while a batch is processed are kept in a per-batch
/// overlay and only become part of the cache in `after_batch`, so a rejected
/// batch leaves no trace.
pub struct VersionHandler {
    taxonomy: Arc<dyn Taxonomy>,
    versions: FxHashMap<Handle, VersionPair>,
    pending: FxHashMap<Handle, VersionPair>,
    updated_in_batch: FxHashSet<Handle>,
}

impl VersionHandler {
    pub fn new(taxonomy: Arc<dyn Taxonomy>) -> Self {
        Self {
            taxonomy,
            versions: FxHashMap::default(),
            pending: FxHashMap::default(),
            updated_in_batch: FxHashSet::default(),
        }
    }

    /// Returns the version pair of `handle` as of the last accepted batch.
    pub fn version_pair(&self, handle: &str) -> Option<VersionPair> {
        self.versions.get(handle).copied()
    }

    /// Appends an update of the parent of the change at `index`.
    ///
    /// The parent is taken from the change itself or, for changes of stored
    /// entities, from the store. Nothing is appended if the parent is unknown
    /// or already part of the batch. Returns the parent handle if an update
    /// was appended.
    pub fn increment_parent(
        batch: &mut DescriptionModifications,
        index: usize,
        storage: &MdibStorage,
    ) -> Option<Handle> {
        let item = batch.get(index)?;
        let parent = match &item.parent {
            Some(parent) => parent.clone(),
            None => storage.entity(item.handle().as_str())?.parent.clone()?,
        };
        if batch.contains_handle(parent.as_str()) {
            return None;
        }

        let entity = storage.entity(parent.as_str())?;
        batch.push(DescriptionItem {
            kind: ChangeKind::Update,
            descriptor: entity.descriptor.clone(),
            states: entity.states.as_slice().to_vec(),
            parent: None,
        });
        trace!(parent = %parent, "appended parent update");
        Some(parent)
    }

    /// Drops every cached version of `handle`.
    fn forget(&mut self, handle: &Handle) {
        self.pending.remove(handle);
        self.versions.remove(handle);
    }

    fn known_pair(&self, handle: &Handle, storage: &MdibStorage) -> Option<VersionPair> {
        if let Some(pair) = self.pending.get(handle).or_else(|| self.versions.get(handle)) {
            return Some(*pair);
        }
        if let Some(entity) = storage.entity(handle.as_str()) {
            return Some(VersionPair {
                descriptor_version: entity.descriptor.version,
                state_version: entity
                    .states
                    .single()
                    .map_or(UNVERSIONED, |state| state.state_version),
            });
        }
        storage
            .context_state(handle.as_str())
            .map(|state| VersionPair {
                descriptor_version: state.descriptor_version,
                state_version: state.state_version,
            })
    }

    /// Bumps the descriptor version of `handle` once per batch.
    fn bump_descriptor(
        &mut self,
        handle: &Handle,
        storage: &MdibStorage,
        require_known: bool,
    ) -> Result<Version, Violation> {
        let pair = match self.known_pair(handle, storage) {
            Some(pair) => pair,
            None if require_known => {
                return Err(Violation::MissingVersion {
                    handle: handle.clone(),
                });
            }
            None => VersionPair::default(),
        };
        if self.updated_in_batch.contains(handle) {
            return Ok(pair.descriptor_version);
        }

        let descriptor_version = pair.descriptor_version + 1;
        self.pending.insert(
            handle.clone(),
            VersionPair {
                descriptor_version,
                ..pair
            },
        );
        self.updated_in_batch.insert(handle.clone());
        Ok(descriptor_version)
    }

    /// Bumps the state version of `handle` and records the descriptor version
    /// it is stamped with.
    fn bump_state(
        &mut self,
        handle: &Handle,
        descriptor_version: Version,
        storage: &MdibStorage,
    ) -> Version {
        let pair = self.known_pair(handle, storage).unwrap_or_default();
        let state_version = pair.state_version + 1;
        self.pending.insert(
            handle.clone(),
            VersionPair {
                descriptor_version,
                state_version,
            },
        );
        state_version
    }

    fn version_insert(
        &mut self,
        item: &mut DescriptionItem,
        storage: &MdibStorage,
    ) -> Result<(), Violation> {
        let descriptor_version = self.bump_descriptor(&item.descriptor.handle, storage, false)?;
        item.descriptor.version = descriptor_version;
        for state in &mut item.states {
            let handle = state.handle().clone();
            state.state_version = self.bump_state(&handle, descriptor_version, storage);
            state.descriptor_version = descriptor_version;
        }
        Ok(())
    }

    fn version_update(
        &mut self,
        item: &mut DescriptionItem,
        storage: &MdibStorage,
    ) -> Result<(), Violation> {
        let descriptor_version = self.bump_descriptor(&item.descriptor.handle, storage, true)?;
        item.descriptor.version = descriptor_version;
        for state in &mut item.states {
            let handle = state.handle().clone();
            state.state_version = self.bump_state(&handle, descriptor_version, storage);
            state.descriptor_version = descriptor_version;
        }

        if !self.taxonomy.is_multi_state_kind(item.descriptor.kind) {
            return Ok(());
        }
        // A descriptor change touches every stored context state, including
        // the ones not resubmitted with the update.
        let Some(EntityStates::Multi(stored)) = storage
            .entity(item.descriptor.handle.as_str())
            .map(|entity| &entity.states)
        else {
            return Ok(());
        };
        for stored_state in stored {
            if item.states.iter().any(|s| s.handle() == stored_state.handle()) {
                continue;
            }
            let mut state = stored_state.clone();
            state.state_version = self.bump_state(state.handle(), descriptor_version, storage);
            state.descriptor_version = descriptor_version;
            item.states.push(state);
        }
        Ok(())
    }
}

impl PreprocessingSegment for VersionHandler {
    fn name(&self) -> &'static str {
        "VersionHandler"
    }

    fn processes_states(&self) -> bool {
        true
    }

    fn before_batch(&mut self, _storage: &MdibStorage) {
        self.pending.clear();
        self.updated_in_batch.clear();
    }

    fn after_batch(&mut self, _storage: &MdibStorage) {
        self.versions.extend(self.pending.drain());
    }

    fn process_description(
        &mut self,
        batch: &mut DescriptionModifications,
        index: usize,
        storage: &MdibStorage,
    ) -> Result<(), Violation> {
        let Some(item) = batch.get_mut(index) else {
            return Ok(());
        };
        match item.kind {
            ChangeKind::Insert => self.version_insert(item, storage),
            ChangeKind::Update => self.version_update(item, storage),
            ChangeKind::Delete => Ok(()),
        }
    }

    fn process_state(
        &mut self,
        batch: &mut StateModifications,
        index: usize,
        storage: &MdibStorage,
    ) -> Result<(), Violation> {
        let Some(state) = batch.get_mut(index) else {
            return Ok(());
        };
        if storage.entity(state.descriptor_handle.as_str()).is_none() {
            // Versions of a deleted owner must not leak into the placeholder
            // created at commit time.
            self.forget(&state.descriptor_handle);
            self.forget(state.handle());
            trace!(handle = %state.descriptor_handle, "owner not in store, state left unversioned");
            return Ok(());
        }
        if state.is_context() {
            let foreign = storage
                .context_state(state.handle().as_str())
                .is_some_and(|stored| stored.descriptor_handle != state.descriptor_handle);
            if foreign {
                trace!(handle = %state.handle(), "context handle belongs to another descriptor, state left unversioned");
                return Ok(());
            }
        }
        let Some(owner) = self.known_pair(&state.descriptor_handle, storage) else {
            trace!(handle = %state.descriptor_handle, "no version known for owner, state left unversioned");
            return Ok(());
        };

        let handle = state.handle().clone();
        state.state_version = self.bump_state(&handle, owner.descriptor_version, storage);
        state.descriptor_version = owner.descriptor_version;
        Ok(())
    }
}
