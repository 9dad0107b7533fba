//! Materialized MDIB entities.

use crate::model::{Descriptor, Handle, MdibVersion, State};

/// The state(s) of an entity.
///
/// Single-state descriptors hold exactly one state by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityStates {
    /// The one state of a single-state descriptor.
    Single(State),
    /// Zero or more context states, in insertion order.
    Multi(Vec<State>),
}

impl EntityStates {
    /// Returns all states as a slice.
    pub fn as_slice(&self) -> &[State] {
        match self {
            EntityStates::Single(state) => std::slice::from_ref(state),
            EntityStates::Multi(states) => states,
        }
    }

    /// Returns the number of states.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns true if there are no states (only possible for multi-state).
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Returns the single state, if this is a single-state entity.
    pub fn single(&self) -> Option<&State> {
        match self {
            EntityStates::Single(state) => Some(state),
            EntityStates::Multi(_) => None,
        }
    }
}

/// A tree node: descriptor, state(s) and tree position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdibEntity {
    /// The entity's descriptor.
    pub descriptor: Descriptor,
    /// The entity's state(s).
    pub states: EntityStates,
    /// Parent handle; `None` for roots.
    pub parent: Option<Handle>,
    /// Child handles in insertion order.
    pub children: Vec<Handle>,
    /// MDIB version of the last write that touched this entity.
    pub last_changed: MdibVersion,
}

impl MdibEntity {
    /// Returns the entity's handle.
    pub fn handle(&self) -> &Handle {
        &self.descriptor.handle
    }

    /// Returns true if the entity has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StateKind;

    #[test]
    fn test_entity_states() {
        let single = EntityStates::Single(State::new(StateKind::Vmd, "vmd0"));
        assert_eq!(single.len(), 1);
        assert!(single.single().is_some());

        let multi = EntityStates::Multi(vec![]);
        assert!(multi.is_empty());
        assert!(multi.single().is_none());
    }
}
