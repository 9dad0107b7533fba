//! The authoritative entity store.
//!
//! The store maps handles to entities and keeps a separate index of context
//! states by their own handles. Its two commit operations perform no
//! validation: a batch must have passed the preprocessing chain before it is
//! applied, and nothing is rolled back if a commit is interrupted.

pub mod result;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::access::MdibAccess;
use crate::config::MdibConfig;
use crate::model::{
    ChangeKind, Descriptor, DescriptionItem, DescriptionModifications, DescriptorKind,
    EntityStates, Handle, MdibEntity, MdibVersion, State, StateKind, StateModifications,
};
use crate::taxonomy::Taxonomy;

pub use result::{WriteDescriptionResult, WriteStateResult};

/// In-memory MDIB entity store.
pub struct MdibStorage {
    taxonomy: Arc<dyn Taxonomy>,
    entities: FxHashMap<Handle, MdibEntity>,
    root_entities: Vec<Handle>,
    context_states: FxHashMap<Handle, State>,
    mdib_version: MdibVersion,
    md_description_version: u64,
    md_state_version: u64,
    create_orphan_stubs: bool,
}

impl MdibStorage {
    /// Creates an empty store.
    pub fn new(taxonomy: Arc<dyn Taxonomy>, config: &MdibConfig) -> Self {
        Self {
            taxonomy,
            entities: FxHashMap::default(),
            root_entities: Vec::new(),
            context_states: FxHashMap::default(),
            mdib_version: config.initial_mdib_version(),
            md_description_version: 0,
            md_state_version: 0,
            create_orphan_stubs: config.create_orphan_stubs,
        }
    }

    /// Returns the taxonomy the store was created with.
    pub fn taxonomy(&self) -> &dyn Taxonomy {
        self.taxonomy.as_ref()
    }

    /// Returns the number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the store holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Looks up a context state by its own handle.
    pub fn context_state(&self, handle: &str) -> Option<&State> {
        self.context_states.get(handle)
    }

    /// Commits a preprocessed description batch.
    ///
    /// Inserts link the new entity under its parent (or register it as a
    /// root), updates replace descriptor and states in place, deletes unlink
    /// the entity and purge its context states. Changes naming handles that
    /// cannot be applied are logged and skipped.
    pub fn apply_description_changes(
        &mut self,
        mdib_version: MdibVersion,
        description_version: Option<u64>,
        state_version: Option<u64>,
        batch: DescriptionModifications,
    ) -> WriteDescriptionResult {
        let mut inserted = Vec::new();
        let mut updated = Vec::new();
        let mut deleted = Vec::new();

        for item in batch.into_items() {
            let handle = item.descriptor.handle.clone();
            match item.kind {
                ChangeKind::Insert => {
                    if self.insert_entity(item, &mdib_version) {
                        inserted.push(handle);
                    }
                }
                ChangeKind::Update => {
                    if self.update_entity(item, &mdib_version) && !updated.contains(&handle) {
                        updated.push(handle);
                    }
                }
                ChangeKind::Delete => {
                    if self.delete_entity(&handle) {
                        deleted.push(handle);
                    }
                }
            }
        }

        self.mdib_version = mdib_version.clone();
        if let Some(version) = description_version {
            self.md_description_version = version;
        }
        if let Some(version) = state_version {
            self.md_state_version = version;
        }

        WriteDescriptionResult {
            mdib_version,
            inserted_entities: self.collect_entities(&inserted),
            updated_entities: self.collect_entities(&updated),
            deleted_handles: deleted,
        }
    }

    /// Commits a preprocessed state batch.
    ///
    /// States of unknown descriptors get a placeholder descriptor inserted
    /// first (unless orphan stubs are disabled, in which case they are
    /// dropped). Changed states are reported grouped by their root entity.
    pub fn apply_state_changes(
        &mut self,
        mdib_version: MdibVersion,
        state_version: Option<u64>,
        mut batch: StateModifications,
    ) -> WriteStateResult {
        if self.create_orphan_stubs {
            self.insert_orphan_stubs(&mdib_version, &mut batch);
        }

        let mut changed: FxHashMap<Handle, Vec<State>> = FxHashMap::default();
        for state in batch.into_states() {
            let descriptor_handle = state.descriptor_handle.clone();
            if self.owned_elsewhere(&state) {
                warn!(
                    handle = %state.handle(),
                    descriptor = %descriptor_handle,
                    "context state handle belongs to another descriptor, skipped"
                );
                continue;
            }
            let Some(entity) = self.entities.get_mut(&descriptor_handle) else {
                warn!(handle = %descriptor_handle, "state for unknown descriptor dropped");
                continue;
            };

            match &mut entity.states {
                EntityStates::Single(current) if !state.is_context() => *current = state.clone(),
                EntityStates::Multi(current) if state.is_context() => {
                    self.context_states
                        .insert(state.handle().clone(), state.clone());
                    upsert_state(current, state.clone());
                }
                _ => {
                    warn!(
                        handle = %state.handle(),
                        descriptor = %descriptor_handle,
                        "state multiplicity does not match its descriptor, skipped"
                    );
                    continue;
                }
            }
            entity.last_changed = mdib_version.clone();

            let owner = self.top_level_handle(&descriptor_handle);
            changed.entry(owner).or_default().push(state);
        }

        self.mdib_version = mdib_version.clone();
        if let Some(version) = state_version {
            self.md_state_version = version;
        }

        WriteStateResult {
            mdib_version,
            states: changed,
        }
    }

    fn insert_entity(&mut self, item: DescriptionItem, version: &MdibVersion) -> bool {
        let DescriptionItem {
            descriptor,
            states,
            parent,
            ..
        } = item;
        let handle = descriptor.handle.clone();

        let states = if self.taxonomy.is_multi_state_kind(descriptor.kind) {
            for state in &states {
                self.context_states
                    .insert(state.handle().clone(), state.clone());
            }
            EntityStates::Multi(states)
        } else {
            match states.into_iter().next() {
                Some(state) => EntityStates::Single(state),
                None => {
                    warn!(handle = %handle, "insert of single-state descriptor without a state, skipped");
                    return false;
                }
            }
        };

        match &parent {
            Some(parent_handle) => match self.entities.get_mut(parent_handle) {
                Some(parent_entity) => parent_entity.children.push(handle.clone()),
                None => {
                    warn!(handle = %handle, parent = %parent_handle, "parent not found, entity left unlinked")
                }
            },
            None => self.root_entities.push(handle.clone()),
        }

        self.entities.insert(
            handle,
            MdibEntity {
                descriptor,
                states,
                parent,
                children: Vec::new(),
                last_changed: version.clone(),
            },
        );
        true
    }

    fn update_entity(&mut self, item: DescriptionItem, version: &MdibVersion) -> bool {
        let DescriptionItem {
            descriptor, states, ..
        } = item;
        let Some(entity) = self.entities.get_mut(&descriptor.handle) else {
            warn!(handle = %descriptor.handle, "update of unknown handle, skipped");
            return false;
        };

        entity.descriptor = descriptor;
        entity.last_changed = version.clone();
        match &mut entity.states {
            EntityStates::Single(current) => {
                if let Some(state) = states.into_iter().next() {
                    *current = state;
                }
            }
            EntityStates::Multi(current) => {
                for state in states {
                    let foreign = self
                        .context_states
                        .get(state.handle())
                        .is_some_and(|stored| stored.descriptor_handle != state.descriptor_handle);
                    if foreign {
                        warn!(handle = %state.handle(), "context state handle belongs to another descriptor, skipped");
                        continue;
                    }
                    self.context_states
                        .insert(state.handle().clone(), state.clone());
                    upsert_state(current, state);
                }
            }
        }
        true
    }

    /// Returns true if `state` is a context state whose handle is already
    /// stored under a different descriptor.
    fn owned_elsewhere(&self, state: &State) -> bool {
        state.is_context()
            && self
                .context_states
                .get(state.handle())
                .is_some_and(|stored| stored.descriptor_handle != state.descriptor_handle)
    }

    fn delete_entity(&mut self, handle: &Handle) -> bool {
        let Some(entity) = self.entities.remove(handle) else {
            warn!(handle = %handle, "delete of unknown handle, skipped");
            return false;
        };

        match &entity.parent {
            Some(parent) => {
                if let Some(parent_entity) = self.entities.get_mut(parent) {
                    parent_entity.children.retain(|child| child != handle);
                }
            }
            None => self.root_entities.retain(|root| root != handle),
        }
        self.context_states
            .retain(|_, state| state.descriptor_handle != *handle);

        if !entity.children.is_empty() {
            debug!(
                handle = %handle,
                children = entity.children.len(),
                "deleted entity still has children, they stay in the store"
            );
        }
        true
    }

    /// Inserts placeholder descriptors for states whose descriptor is unknown.
    fn insert_orphan_stubs(&mut self, version: &MdibVersion, batch: &mut StateModifications) {
        let mut stubs = DescriptionModifications::new();
        for index in 0..batch.len() {
            let Some(state) = batch.get_mut(index) else {
                continue;
            };
            let handle = state.descriptor_handle.clone();
            if self.entities.contains_key(&handle) {
                continue;
            }

            let kind = self.taxonomy.descriptor_kind_for(state.kind);
            let placeholder = Descriptor::placeholder(handle.clone(), kind);
            // The implicit insert versions the placeholder like any first insert.
            let descriptor = Descriptor {
                version: placeholder.version + 1,
                ..placeholder
            };
            state.descriptor_version = descriptor.version;
            if stubs.contains_handle(handle.as_str()) {
                continue;
            }

            debug!(handle = %handle, kind = %kind, "creating placeholder descriptor for orphan state");
            let states = if self.taxonomy.is_multi_state_kind(kind) {
                Vec::new()
            } else {
                vec![state.clone()]
            };
            stubs.push(DescriptionItem {
                kind: ChangeKind::Insert,
                descriptor,
                states,
                parent: None,
            });
        }

        if !stubs.is_empty() {
            self.apply_description_changes(version.clone(), None, None, stubs);
        }
    }

    /// Returns the handle of the root entity above `handle`.
    fn top_level_handle(&self, handle: &Handle) -> Handle {
        let mut current = handle;
        // Bounded walk; a well-formed tree is never deeper than its size.
        for _ in 0..=self.entities.len() {
            match self.entities.get(current).and_then(|e| e.parent.as_ref()) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current.clone()
    }

    fn collect_entities(&self, handles: &[Handle]) -> Vec<MdibEntity> {
        handles
            .iter()
            .filter_map(|handle| self.entities.get(handle).cloned())
            .collect()
    }
}

/// Replaces the state with the same handle, or appends it.
fn upsert_state(states: &mut Vec<State>, state: State) {
    match states.iter_mut().find(|s| s.handle() == state.handle()) {
        Some(existing) => *existing = state,
        None => states.push(state),
    }
}

impl MdibAccess for MdibStorage {
    fn mdib_version(&self) -> MdibVersion {
        self.mdib_version.clone()
    }

    fn md_description_version(&self) -> u64 {
        self.md_description_version
    }

    fn md_state_version(&self) -> u64 {
        self.md_state_version
    }

    fn entity(&self, handle: &str) -> Option<&MdibEntity> {
        self.entities.get(handle)
    }

    fn find_entities_by_kind(&self, kind: DescriptorKind) -> Vec<&MdibEntity> {
        self.entities
            .values()
            .filter(|entity| entity.descriptor.kind == kind)
            .collect()
    }

    fn children_by_kind(&self, handle: &str, kind: DescriptorKind) -> Vec<&MdibEntity> {
        let Some(entity) = self.entities.get(handle) else {
            return Vec::new();
        };
        entity
            .children
            .iter()
            .filter_map(|child| self.entities.get(child))
            .filter(|child| child.descriptor.kind == kind)
            .collect()
    }

    fn root_entities(&self) -> Vec<&MdibEntity> {
        self.root_entities
            .iter()
            .filter_map(|handle| self.entities.get(handle))
            .collect()
    }

    fn state(&self, handle: &str) -> Option<&State> {
        self.entities
            .get(handle)
            .and_then(|entity| entity.states.single())
            .or_else(|| self.context_states.get(handle))
    }

    fn context_states(&self) -> Vec<&State> {
        self.context_states.values().collect()
    }

    fn context_states_by_kind(&self, kind: StateKind) -> Vec<&State> {
        self.context_states
            .values()
            .filter(|state| state.kind == kind)
            .collect()
    }

    fn multi_states(&self, handle: &str) -> Vec<&State> {
        match self.entities.get(handle).map(|entity| &entity.states) {
            Some(EntityStates::Multi(states)) => states.iter().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UNVERSIONED;
    use crate::taxonomy::StandardTaxonomy;

    fn storage() -> MdibStorage {
        MdibStorage::new(
            Arc::new(StandardTaxonomy::new()),
            &MdibConfig::new().with_sequence_id("urn:uuid:storage-test"),
        )
    }

    fn single(handle: &str, kind: DescriptorKind) -> (Descriptor, State) {
        (Descriptor::new(handle, kind), State::new(kind.state_kind(), handle))
    }

    fn device_batch() -> DescriptionModifications {
        let (mds, mds_state) = single("mds0", DescriptorKind::Mds);
        let (vmd, vmd_state) = single("vmd0", DescriptorKind::Vmd);
        let (ch, ch_state) = single("ch0", DescriptorKind::Channel);
        let (sc, sc_state) = single("sc0", DescriptorKind::SystemContext);
        DescriptionModifications::new()
            .insert(mds, [mds_state], None)
            .insert(vmd, [vmd_state], Some("mds0".into()))
            .insert(ch, [ch_state], Some("vmd0".into()))
            .insert(sc, [sc_state], Some("mds0".into()))
            .insert(
                Descriptor::new("pat0", DescriptorKind::PatientContext),
                [State::context(StateKind::PatientContext, "pat.s0", "pat0")],
                Some("sc0".into()),
            )
    }

    fn next(storage: &MdibStorage) -> MdibVersion {
        storage.mdib_version().increment()
    }

    #[test]
    fn test_insert_links_tree() {
        let mut storage = storage();
        let version = next(&storage);
        let result = storage.apply_description_changes(version.clone(), Some(1), Some(1), device_batch());

        assert_eq!(result.mdib_version, version);
        assert_eq!(result.inserted_entities.len(), 5);
        assert_eq!(storage.mdib_version(), version);
        assert_eq!(storage.md_description_version(), 1);

        let roots: Vec<_> = storage.root_entities().iter().map(|e| e.handle().clone()).collect();
        assert_eq!(roots, vec![Handle::from("mds0")]);

        let mds = storage.entity("mds0").unwrap();
        assert_eq!(mds.children, vec![Handle::from("vmd0"), Handle::from("sc0")]);
        assert_eq!(storage.entity("ch0").unwrap().parent, Some(Handle::from("vmd0")));

        // The inserted MDS is reported with its final child list
        let reported = result
            .inserted_entities
            .iter()
            .find(|e| e.handle() == "mds0")
            .unwrap();
        assert_eq!(reported.children.len(), 2);
    }

    #[test]
    fn test_context_state_index() {
        let mut storage = storage();
        storage.apply_description_changes(next(&storage), None, None, device_batch());

        assert_eq!(storage.context_states().len(), 1);
        assert!(storage.context_state("pat.s0").is_some());
        assert_eq!(storage.multi_states("pat0").len(), 1);
        assert_eq!(storage.context_states_of("pat0").len(), 1);
        assert_eq!(storage.context_states_by_kind(StateKind::PatientContext).len(), 1);
        assert!(storage.context_states_by_kind(StateKind::LocationContext).is_empty());
        assert_eq!(storage.state("pat.s0").map(|s| s.kind), Some(StateKind::PatientContext));
        assert!(storage.multi_states("ch0").is_empty());
    }

    #[test]
    fn test_queries_by_kind() {
        let mut storage = storage();
        storage.apply_description_changes(next(&storage), None, None, device_batch());

        assert_eq!(storage.find_entities_by_kind(DescriptorKind::Channel).len(), 1);
        assert!(storage.find_entities_by_kind(DescriptorKind::Battery).is_empty());
        assert_eq!(storage.children_by_kind("mds0", DescriptorKind::Vmd).len(), 1);
        assert!(storage.children_by_kind("mds0", DescriptorKind::Channel).is_empty());
        assert!(storage.children_by_kind("missing", DescriptorKind::Vmd).is_empty());
        assert!(storage.descriptor_of_kind("vmd0", DescriptorKind::Vmd).is_some());
        assert!(storage.descriptor_of_kind("vmd0", DescriptorKind::Channel).is_none());
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut storage = storage();
        storage.apply_description_changes(next(&storage), None, None, device_batch());

        let mut descriptor = Descriptor::new("ch0", DescriptorKind::Channel).with_attribute("Label", "ECG");
        descriptor.version = 1;
        let state = State::new(StateKind::Channel, "ch0").with_attribute("ActivationState", "On");
        let batch = DescriptionModifications::new().update(descriptor, [state]);
        let result = storage.apply_description_changes(next(&storage), None, None, batch);

        assert_eq!(result.updated_entities.len(), 1);
        let entity = storage.entity("ch0").unwrap();
        assert_eq!(entity.descriptor.version, 1);
        assert_eq!(entity.states.len(), 1);
        assert_eq!(
            entity.states.single().and_then(|s| s.attributes.get("ActivationState")).map(String::as_str),
            Some("On")
        );
        // Tree position is untouched
        assert_eq!(entity.parent, Some(Handle::from("vmd0")));
    }

    #[test]
    fn test_delete_unlinks_and_purges() {
        let mut storage = storage();
        storage.apply_description_changes(next(&storage), None, None, device_batch());

        let batch = DescriptionModifications::new()
            .delete(Descriptor::new("pat0", DescriptorKind::PatientContext))
            .delete(Descriptor::new("vmd0", DescriptorKind::Vmd));
        let result = storage.apply_description_changes(next(&storage), None, None, batch);

        assert_eq!(result.deleted_handles, vec![Handle::from("pat0"), Handle::from("vmd0")]);
        assert!(storage.entity("pat0").is_none());
        assert!(storage.context_state("pat.s0").is_none());
        assert_eq!(storage.entity("sc0").unwrap().children, Vec::<Handle>::new());
        assert_eq!(storage.entity("mds0").unwrap().children, vec![Handle::from("sc0")]);
        // Children of a deleted entity are not removed
        assert!(storage.entity("ch0").is_some());
    }

    #[test]
    fn test_unknown_handles_are_skipped() {
        let mut storage = storage();
        let batch = DescriptionModifications::new()
            .update(
                Descriptor::new("ghost", DescriptorKind::Vmd),
                [State::new(StateKind::Vmd, "ghost")],
            )
            .delete(Descriptor::new("ghost", DescriptorKind::Vmd));
        let result = storage.apply_description_changes(next(&storage), None, None, batch);
        assert!(result.is_empty());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_state_changes_grouped_by_root() {
        let mut storage = storage();
        storage.apply_description_changes(next(&storage), None, None, device_batch());

        let batch = StateModifications::new()
            .add(State::new(StateKind::Channel, "ch0").with_attribute("ActivationState", "Off"))
            .add(State::context(StateKind::PatientContext, "pat.s1", "pat0"));
        let version = next(&storage);
        let result = storage.apply_state_changes(version.clone(), Some(7), batch);

        assert_eq!(result.len(), 2);
        assert_eq!(result.states.get("mds0").map(Vec::len), Some(2));
        assert_eq!(storage.md_state_version(), 7);
        assert_eq!(storage.entity("ch0").unwrap().last_changed, version);

        // New context state is appended, the existing one is kept
        let handles: Vec<_> = storage.multi_states("pat0").iter().map(|s| s.handle().clone()).collect();
        assert_eq!(handles, vec![Handle::from("pat.s0"), Handle::from("pat.s1")]);
        assert_eq!(storage.context_states().len(), 2);
    }

    #[test]
    fn test_context_handle_of_other_descriptor_is_skipped() {
        let mut storage = storage();
        let batch = device_batch().insert(
            Descriptor::new("ens0", DescriptorKind::EnsembleContext),
            Vec::<State>::new(),
            Some("sc0".into()),
        );
        storage.apply_description_changes(next(&storage), None, None, batch);

        let batch = StateModifications::new()
            .add(State::context(StateKind::EnsembleContext, "pat.s0", "ens0"));
        let result = storage.apply_state_changes(next(&storage), None, batch);

        assert!(result.is_empty());
        assert_eq!(storage.context_state("pat.s0").map(|s| s.descriptor_handle.clone()), Some(Handle::from("pat0")));
        assert_eq!(storage.multi_states("pat0").len(), 1);
        assert!(storage.multi_states("ens0").is_empty());

        // Same through a description update of the ensemble context
        let mut descriptor = Descriptor::new("ens0", DescriptorKind::EnsembleContext);
        descriptor.version = 1;
        let batch = DescriptionModifications::new()
            .update(descriptor, [State::context(StateKind::EnsembleContext, "pat.s0", "ens0")]);
        storage.apply_description_changes(next(&storage), None, None, batch);
        assert!(storage.multi_states("ens0").is_empty());
        assert_eq!(storage.context_states_of("pat0").len(), 1);
    }

    #[test]
    fn test_orphan_state_creates_placeholder() {
        let mut storage = storage();
        assert_eq!(Descriptor::placeholder("orphan", DescriptorKind::NumericMetric).version, UNVERSIONED);

        let batch = StateModifications::new()
            .add(State::new(StateKind::NumericMetric, "orphan").with_attribute("Value", "42"));
        let result = storage.apply_state_changes(next(&storage), None, batch);

        let entity = storage.entity("orphan").unwrap();
        assert_eq!(entity.descriptor.kind, DescriptorKind::NumericMetric);
        assert_eq!(entity.descriptor.version, 0);
        assert!(entity.is_root());
        let state = storage.state("orphan").unwrap();
        assert_eq!(state.attributes.get("Value").map(String::as_str), Some("42"));
        assert_eq!(state.descriptor_version, 0);
        assert_eq!(result.states.get("orphan").map(Vec::len), Some(1));
    }

    #[test]
    fn test_orphan_context_state_creates_multi_state_placeholder() {
        let mut storage = storage();
        let batch = StateModifications::new()
            .add(State::context(StateKind::LocationContext, "loc.s0", "loc0"))
            .add(State::context(StateKind::LocationContext, "loc.s1", "loc0"));
        storage.apply_state_changes(next(&storage), None, batch);

        assert_eq!(storage.len(), 1);
        assert_eq!(storage.multi_states("loc0").len(), 2);
        assert!(storage.context_state("loc.s1").is_some());
    }

    #[test]
    fn test_orphan_state_dropped_without_stubs() {
        let mut storage = MdibStorage::new(
            Arc::new(StandardTaxonomy::new()),
            &MdibConfig::new().with_orphan_stubs(false),
        );
        let batch = StateModifications::new().add(State::new(StateKind::NumericMetric, "orphan"));
        let result = storage.apply_state_changes(next(&storage), None, batch);
        assert!(result.is_empty());
        assert!(storage.is_empty());
    }
}
