//! Descriptor and state values.
//!
//! Kind-specific content (units, codes, sample rates, measured values, ...)
//! is carried as opaque attributes; the MDIB core only looks at handles,
//! kinds and versions.

use std::collections::BTreeMap;

use crate::model::{DescriptorKind, Handle, StateKind};

/// Descriptor or state version number.
///
/// Versions start at 0 on first insert. `-1` marks a value that has never
/// been versioned (placeholders and the default version pair).
pub type Version = i64;

/// Version of something that was never versioned.
pub const UNVERSIONED: Version = -1;

/// Opaque kind-specific attributes.
pub type Attributes = BTreeMap<String, String>;

/// A structural node of the MDIB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// The descriptor's unique handle.
    pub handle: Handle,
    /// Structural type.
    pub kind: DescriptorKind,
    /// Descriptor version, assigned by the version handler.
    pub version: Version,
    /// Kind-specific attributes.
    pub attributes: Attributes,
}

impl Descriptor {
    /// Creates a descriptor with version 0 and no attributes.
    pub fn new(handle: impl Into<Handle>, kind: DescriptorKind) -> Self {
        Self {
            handle: handle.into(),
            kind,
            version: 0,
            attributes: Attributes::new(),
        }
    }

    /// Creates an unversioned placeholder descriptor.
    pub fn placeholder(handle: impl Into<Handle>, kind: DescriptorKind) -> Self {
        Self {
            version: UNVERSIONED,
            ..Self::new(handle, kind)
        }
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A runtime value attached to a descriptor.
///
/// Single states share the handle of their descriptor. Context states carry
/// their own handle in `context_handle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// Runtime type.
    pub kind: StateKind,
    /// Handle of the owning descriptor.
    pub descriptor_handle: Handle,
    /// Own handle of a context state; `None` for single states.
    pub context_handle: Option<Handle>,
    /// State version, assigned by the version handler.
    pub state_version: Version,
    /// Version of the descriptor this state was last stamped with.
    pub descriptor_version: Version,
    /// Kind-specific attributes.
    pub attributes: Attributes,
}

impl State {
    /// Creates a single state for the given descriptor handle.
    pub fn new(kind: StateKind, descriptor_handle: impl Into<Handle>) -> Self {
        Self {
            kind,
            descriptor_handle: descriptor_handle.into(),
            context_handle: None,
            state_version: 0,
            descriptor_version: 0,
            attributes: Attributes::new(),
        }
    }

    /// Creates a context state with its own handle.
    pub fn context(
        kind: StateKind,
        handle: impl Into<Handle>,
        descriptor_handle: impl Into<Handle>,
    ) -> Self {
        Self {
            context_handle: Some(handle.into()),
            ..Self::new(kind, descriptor_handle)
        }
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns the handle identifying this state.
    ///
    /// This is the context handle for context states and the descriptor
    /// handle otherwise.
    pub fn handle(&self) -> &Handle {
        self.context_handle.as_ref().unwrap_or(&self.descriptor_handle)
    }

    /// Returns true if this is a context state.
    pub fn is_context(&self) -> bool {
        self.context_handle.is_some()
    }
}
