//! Modification batches.
//!
//! A batch is an ordered list of description changes or state changes that
//! is preprocessed and committed as one unit.
//!
//! # Example
//!
//! ```rust
//! use mdib::model::{Descriptor, DescriptionModifications, DescriptorKind, State, StateKind};
//!
//! let batch = DescriptionModifications::new()
//!     .insert(Descriptor::new("mds0", DescriptorKind::Mds), [State::new(StateKind::Mds, "mds0")], None)
//!     .insert(
//!         Descriptor::new("vmd0", DescriptorKind::Vmd),
//!         [State::new(StateKind::Vmd, "vmd0")],
//!         Some("mds0".into()),
//!     );
//! assert_eq!(batch.len(), 2);
//! ```

use std::fmt;

use crate::model::{Descriptor, Handle, State};

/// Kind of a description change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        })
    }
}

/// One description change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionItem {
    /// What the change does.
    pub kind: ChangeKind,
    /// The inserted, updated or deleted descriptor.
    pub descriptor: Descriptor,
    /// The descriptor's state(s).
    pub states: Vec<State>,
    /// Parent handle; only meaningful for inserts.
    pub parent: Option<Handle>,
}

impl DescriptionItem {
    /// Returns the handle of the changed descriptor.
    pub fn handle(&self) -> &Handle {
        &self.descriptor.handle
    }

    /// Returns true if this is an insert.
    pub fn is_insert(&self) -> bool {
        self.kind == ChangeKind::Insert
    }
}

/// An ordered batch of description changes.
///
/// Preprocessing segments may append follow-up changes while the batch is
/// being processed, so the length is only final once preprocessing is done.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptionModifications {
    items: Vec<DescriptionItem>,
}

impl DescriptionModifications {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an insert change.
    pub fn insert(
        mut self,
        descriptor: Descriptor,
        states: impl IntoIterator<Item = State>,
        parent: Option<Handle>,
    ) -> Self {
        self.push(DescriptionItem {
            kind: ChangeKind::Insert,
            descriptor,
            states: states.into_iter().collect(),
            parent,
        });
        self
    }

    /// Adds an update change.
    pub fn update(mut self, descriptor: Descriptor, states: impl IntoIterator<Item = State>) -> Self {
        self.push(DescriptionItem {
            kind: ChangeKind::Update,
            descriptor,
            states: states.into_iter().collect(),
            parent: None,
        });
        self
    }

    /// Adds a delete change.
    pub fn delete(mut self, descriptor: Descriptor) -> Self {
        self.push(DescriptionItem {
            kind: ChangeKind::Delete,
            descriptor,
            states: Vec::new(),
            parent: None,
        });
        self
    }

    /// Appends a change.
    pub fn push(&mut self, item: DescriptionItem) {
        self.items.push(item);
    }

    /// Returns the number of changes.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch has no changes.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the change at `index`.
    pub fn get(&self, index: usize) -> Option<&DescriptionItem> {
        self.items.get(index)
    }

    /// Returns the change at `index` mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut DescriptionItem> {
        self.items.get_mut(index)
    }

    /// Returns all changes.
    pub fn items(&self) -> &[DescriptionItem] {
        &self.items
    }

    /// Returns true if any change targets `handle`.
    pub fn contains_handle(&self, handle: &str) -> bool {
        self.items.iter().any(|item| item.descriptor.handle == *handle)
    }

    /// Consumes the batch, returning its changes.
    pub fn into_items(self) -> Vec<DescriptionItem> {
        self.items
    }
}

impl FromIterator<DescriptionItem> for DescriptionModifications {
    fn from_iter<I: IntoIterator<Item = DescriptionItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// An ordered batch of state changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateModifications {
    states: Vec<State>,
}

impl StateModifications {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state change.
    pub fn add(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }

    /// Appends a state change.
    pub fn push(&mut self, state: State) {
        self.states.push(state);
    }

    /// Returns the number of state changes.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if the batch has no changes.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns the state at `index`.
    pub fn get(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    /// Returns the state at `index` mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut State> {
        self.states.get_mut(index)
    }

    /// Returns all states.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Consumes the batch, returning its states.
    pub fn into_states(self) -> Vec<State> {
        self.states
    }
}

impl FromIterator<State> for StateModifications {
    fn from_iter<I: IntoIterator<Item = State>>(iter: I) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}
