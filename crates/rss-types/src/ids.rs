//! Scoping identifiers used by the registry, the congestion controller, and
//! the storage layer.

use std::fmt;

/// Identifies a shuffle: an application's run of a single shuffle stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShuffleId {
    /// The submitting application's identifier.
    pub app_id: String,
    /// The shuffle stage's identifier within that application.
    pub shuffle_id: u32,
}

impl ShuffleId {
    /// Creates a new shuffle identifier.
    #[must_use]
    pub fn new(app_id: impl Into<String>, shuffle_id: u32) -> Self {
        Self {
            app_id: app_id.into(),
            shuffle_id,
        }
    }
}

impl fmt::Display for ShuffleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_id, self.shuffle_id)
    }
}

/// Identifies the partition within a shuffle that a location or a batch
/// belongs to.
pub type PartitionId = u32;

/// Scoping key for per-user quotas and congestion accounting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserIdentifier {
    /// The tenant the user belongs to.
    pub tenant: String,
    /// The user's name within that tenant.
    pub name: String,
}

impl UserIdentifier {
    /// Creates a new user identifier.
    #[must_use]
    pub fn new(tenant: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for UserIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant, self.name)
    }
}
