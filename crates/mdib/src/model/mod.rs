//! Data model types for the MDIB.
//!
//! This module contains the core types:
//! - Handles and kinds
//! - Descriptors and states
//! - Entities (materialized tree nodes)
//! - Modification batches
//! - MDIB version stamps

pub mod descriptor;
pub mod entity;
pub mod handle;
pub mod kind;
pub mod modification;
pub mod version;

pub use descriptor::{Attributes, Descriptor, State, UNVERSIONED, Version};
pub use entity::{EntityStates, MdibEntity};
pub use handle::Handle;
pub use kind::{DescriptorKind, StateKind};
pub use modification::{ChangeKind, DescriptionItem, DescriptionModifications, StateModifications};
pub use version::MdibVersion;
