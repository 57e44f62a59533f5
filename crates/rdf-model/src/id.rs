//! Compact identifiers assigned by the per-namespace dictionary

use serde::{Deserialize, Serialize};
use std::fmt;

/// 64-bit node identifier, unique within a namespace.
///
/// Assigned monotonically starting at 1 on first insertion of a term.
/// The value 0 is reserved as a sentinel and never refers to a term.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Reserved sentinel value; never assigned to a term
    pub const SENTINEL: NodeId = NodeId(0);

    /// Smallest id the allocator hands out
    pub const MIN: NodeId = NodeId(1);

    /// Largest representable id (used as an exclusive scan bound)
    pub const MAX: NodeId = NodeId(u64::MAX);

    /// Create from a raw value
    pub fn new(raw: u64) -> Self {
        NodeId(raw)
    }

    /// Get the raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Check that this is not the sentinel
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a stored quad, unique within a namespace.
///
/// Allocated at insertion time and referenced by the provenance ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripleId(pub u64);

impl TripleId {
    /// Create from a raw value
    pub fn new(raw: u64) -> Self {
        TripleId(raw)
    }

    /// Get the raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TripleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TripleId({})", self.0)
    }
}

impl fmt::Display for TripleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_invalid() {
        assert!(!NodeId::SENTINEL.is_valid());
        assert!(NodeId::new(1).is_valid());
    }

    #[test]
    fn test_ordering() {
        assert!(NodeId::new(1) < NodeId::new(2));
        assert!(NodeId::MIN > NodeId::SENTINEL);
    }
}
