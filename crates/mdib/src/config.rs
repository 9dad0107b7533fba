//! MDIB configuration.

use crate::model::MdibVersion;

/// Options for an MDIB instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdibConfig {
    /// Bump the parent's descriptor version when a child is inserted or
    /// deleted.
    ///
    /// When enabled, the preprocessing chain appends a parent update for
    /// every structural change below it (once per parent and batch).
    pub propagate_to_parent: bool,

    /// Create placeholder descriptors for states of unknown descriptors.
    ///
    /// When disabled, such states are logged and dropped at commit time.
    pub create_orphan_stubs: bool,

    /// Sequence id of the MDIB version. A random `urn:uuid:` is generated
    /// when unset.
    pub sequence_id: Option<String>,

    /// Instance id of the MDIB version.
    pub instance_id: u64,
}

impl Default for MdibConfig {
    fn default() -> Self {
        Self {
            propagate_to_parent: false,
            create_orphan_stubs: true,
            sequence_id: None,
            instance_id: 0,
        }
    }
}

impl MdibConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables parent version propagation.
    pub fn with_parent_propagation(mut self, enabled: bool) -> Self {
        self.propagate_to_parent = enabled;
        self
    }

    /// Enables or disables placeholder creation for orphan states.
    pub fn with_orphan_stubs(mut self, enabled: bool) -> Self {
        self.create_orphan_stubs = enabled;
        self
    }

    /// Sets a fixed sequence id.
    pub fn with_sequence_id(mut self, sequence_id: impl Into<String>) -> Self {
        self.sequence_id = Some(sequence_id.into());
        self
    }

    /// Sets the instance id.
    pub fn with_instance_id(mut self, instance_id: u64) -> Self {
        self.instance_id = instance_id;
        self
    }

    /// Returns version 0 of the configured (or a fresh) sequence.
    pub fn initial_mdib_version(&self) -> MdibVersion {
        let version = match &self.sequence_id {
            Some(sequence_id) => MdibVersion::new(sequence_id.clone()),
            None => MdibVersion::create(),
        };
        version.with_instance_id(self.instance_id)
    }
}
