//! MDIB: the in-memory medical device information base of an SDC provider.
//!
//! This crate keeps a device's descriptor tree and its runtime states,
//! validates every change batch against the BICEPS containment rules and
//! assigns descriptor, state and MDIB versions.
//!
//! # Overview
//!
//! An MDIB is a tree of descriptors identified by handles:
//! - **Descriptors** describe structure (MDS, VMD, channel, metric, ...)
//! - **States** carry runtime values; most descriptors own exactly one state,
//!   context descriptors own any number of context states
//! - **Versions** grow monotonically per descriptor, per state and per write
//!
//! Writes go through a preprocessing chain that rejects duplicate handles,
//! misplaced descriptors and cardinality violations before anything reaches
//! the store. A rejected batch changes nothing.
//!
//! # Quick Start
//!
//! ```rust
//! use mdib::{LocalMdibAccess, MdibAccess, ViolationKind};
//! use mdib::model::{Descriptor, DescriptionModifications, DescriptorKind, State, StateKind, StateModifications};
//!
//! let mdib = LocalMdibAccess::new();
//!
//! // Insert a device with one channel and one metric
//! let batch = DescriptionModifications::new()
//!     .insert(Descriptor::new("mds0", DescriptorKind::Mds), [State::new(StateKind::Mds, "mds0")], None)
//!     .insert(Descriptor::new("vmd0", DescriptorKind::Vmd), [State::new(StateKind::Vmd, "vmd0")], Some("mds0".into()))
//!     .insert(Descriptor::new("ch0", DescriptorKind::Channel), [State::new(StateKind::Channel, "ch0")], Some("vmd0".into()))
//!     .insert(
//!         Descriptor::new("hr", DescriptorKind::NumericMetric),
//!         [State::new(StateKind::NumericMetric, "hr")],
//!         Some("ch0".into()),
//!     );
//! mdib.write_description(batch).unwrap();
//!
//! // Update a metric value
//! let states = StateModifications::new()
//!     .add(State::new(StateKind::NumericMetric, "hr").with_attribute("value", "72"));
//! let result = mdib.write_states(states).unwrap();
//! assert_eq!(result.iter_states().next().unwrap().state_version, 1);
//!
//! // A second MDS handle collision is rejected
//! let duplicate = DescriptionModifications::new()
//!     .insert(Descriptor::new("hr", DescriptorKind::Mds), [State::new(StateKind::Mds, "hr")], None);
//! let err = mdib.write_description(duplicate).unwrap_err();
//! assert_eq!(err.kind(), ViolationKind::DuplicateHandle);
//!
//! let txn = mdib.start_transaction();
//! assert_eq!(txn.state("hr").unwrap().attributes["value"], "72");
//! ```
//!
//! # Modules
//!
//! - [`model`]: Handles, kinds, descriptors, states, entities and change batches
//! - [`access`]: Read API and the locked MDIB host
//! - [`preprocessing`]: Validation and versioning segments
//! - [`storage`]: The entity store and commit results
//! - [`taxonomy`]: BICEPS containment rules
//! - [`config`]: MDIB options
//! - [`error`]: Error types

pub mod access;
pub mod config;
pub mod error;
pub mod model;
pub mod preprocessing;
pub mod storage;
pub mod taxonomy;

// Re-export commonly used types at crate root
pub use access::{LocalMdibAccess, MdibAccess, ReadTransaction};
pub use config::MdibConfig;
pub use error::{PreprocessingError, Violation, ViolationKind};
pub use model::{
    ChangeKind, Descriptor, DescriptionModifications, DescriptorKind, EntityStates, Handle,
    MdibEntity, MdibVersion, State, StateKind, StateModifications,
};
pub use preprocessing::{PreprocessingChain, PreprocessingSegment};
pub use storage::{MdibStorage, WriteDescriptionResult, WriteStateResult};
pub use taxonomy::{StandardTaxonomy, Taxonomy};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
