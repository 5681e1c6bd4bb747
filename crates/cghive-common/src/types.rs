//! Domain primitive types used across the cghive workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a container's resource-control subtree.
///
/// The identifier is supplied by the configuration layer and never
/// interpreted here beyond being a path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CtId(String);

impl CtId {
    /// Creates a container identifier from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CtId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Target state of the freezer controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FreezerState {
    /// Processes run normally.
    Thawed,
    /// Processes are stopped in the kernel.
    Frozen,
}

impl FreezerState {
    /// The literal the kernel expects in `freezer.state`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Thawed => "THAWED",
            Self::Frozen => "FROZEN",
        }
    }
}

impl fmt::Display for FreezerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
