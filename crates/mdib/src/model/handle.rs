//! Handle identifiers for descriptors and context states.
//!
//! Handles are opaque strings that are unique across a whole MDIB. Descriptors
//! and context states share the same namespace on the wire but are indexed
//! separately by the store.

use std::borrow::Borrow;
use std::fmt;

/// A globally unique handle of a descriptor or context state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(String);

impl Handle {
    /// Creates a new handle.
    ///
    /// Note: This does not validate the handle. BICEPS restricts handles to
    /// non-empty strings without whitespace; the store treats them as opaque.
    pub fn new(s: impl Into<String>) -> Self {
        Handle(s.into())
    }

    /// Returns the handle as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the handle, returning the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Handle {
    fn from(s: String) -> Self {
        Handle(s)
    }
}

impl From<&str> for Handle {
    fn from(s: &str) -> Self {
        Handle(s.to_string())
    }
}

impl From<&Handle> for Handle {
    fn from(h: &Handle) -> Self {
        h.clone()
    }
}

impl Borrow<str> for Handle {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Handle {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Handle {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_display_is_raw_string() {
        let handle = Handle::new("mds0");
        assert_eq!(handle.to_string(), "mds0");
        assert_eq!(handle.as_str(), "mds0");
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = FxHashMap::default();
        map.insert(Handle::from("vmd0"), 1);
        // Borrow<str> allows lookups without allocating a Handle
        assert_eq!(map.get("vmd0"), Some(&1));
        assert_eq!(map.get("vmd1"), None);
    }

    #[test]
    fn test_compare_with_str() {
        let handle = Handle::from(String::from("ch0"));
        assert!(handle == "ch0");
        assert_ne!(handle, Handle::from("ch1"));
    }
}
