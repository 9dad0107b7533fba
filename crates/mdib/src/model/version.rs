//! MDIB version stamps.

use std::fmt;

/// Version of the MDIB as a whole.
///
/// The sequence id identifies one continuous run of version numbers. The
/// version is incremented by one on every committed write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MdibVersion {
    /// Sequence identifier (a URI).
    pub sequence_id: String,
    /// Instance identifier within the sequence.
    pub instance_id: u64,
    /// Monotonic version counter.
    pub version: u64,
}

impl MdibVersion {
    /// Creates version 0 of the given sequence.
    pub fn new(sequence_id: impl Into<String>) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            instance_id: 0,
            version: 0,
        }
    }

    /// Creates version 0 of a new random `urn:uuid:` sequence.
    pub fn create() -> Self {
        Self::new(format!("urn:uuid:{}", uuid::Uuid::new_v4()))
    }

    /// Sets the instance identifier.
    pub fn with_instance_id(mut self, instance_id: u64) -> Self {
        self.instance_id = instance_id;
        self
    }

    /// Returns the next version of the same sequence.
    pub fn increment(&self) -> Self {
        Self {
            sequence_id: self.sequence_id.clone(),
            instance_id: self.instance_id,
            version: self.version + 1,
        }
    }
}

impl fmt::Display for MdibVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.sequence_id, self.instance_id, self.version)
    }
}
