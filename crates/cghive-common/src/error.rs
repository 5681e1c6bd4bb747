//! Unified error types for the cghive workspace.
//!
//! Low-level controller I/O distinguishes three outcomes: success, "not
//! present" (a controller or control file that simply does not exist on this
//! kernel), and hard failure. The distinction is carried through the error
//! enum itself rather than collapsed to a boolean, so callers can skip
//! unsupported features without masking real faults.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CgError {
    /// A cgroup subsystem has no mount point on this host.
    #[error("cgroup subsystem {subsys} is not mounted")]
    NotMounted {
        /// Canonical subsystem name that failed to resolve.
        subsys: String,
    },

    /// A control file does not exist (feature not supported by the kernel).
    #[error("control file {path} does not exist")]
    NotPresent {
        /// Path to the missing control file.
        path: PathBuf,
    },

    /// A subsystem name is not in the static registry.
    #[error("unknown cgroup subsystem {name}")]
    UnknownSubsystem {
        /// The unrecognized subsystem name.
        name: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A write completed without error but moved fewer bytes than requested.
    #[error("output truncated while writing to {path}: wrote {written} of {expected} bytes")]
    Truncated {
        /// Path of the control file being written.
        path: PathBuf,
        /// Bytes actually written.
        written: usize,
        /// Bytes that should have been written.
        expected: usize,
    },

    /// A control file held content that does not parse as the expected type.
    #[error("cannot parse {value:?} read from {path} as an unsigned integer")]
    Parse {
        /// Path the value was read from.
        path: PathBuf,
        /// The offending content.
        value: String,
    },

    /// A directory removal stayed busy past the retry budget.
    #[error("cannot remove {path}: still busy after {waited_ms} ms")]
    Busy {
        /// Directory that could not be removed.
        path: PathBuf,
        /// Total time spent retrying, in milliseconds.
        waited_ms: u64,
    },

    /// A requested CPU or NUMA mask falls outside the active range.
    #[error("unable to set {name} value {requested}, supported range: {active}")]
    MaskRange {
        /// Control file name (`cpuset.cpus` or `cpuset.mems`).
        name: String,
        /// The mask that was requested.
        requested: String,
        /// The currently active mask on the controller root.
        active: String,
    },

    /// An IP address is already assigned to another container.
    #[error("unable to add ip {ip}: address already in use")]
    AddressInUse {
        /// The conflicting address.
        ip: String,
    },

    /// A claimed init pid does not belong to the expected container.
    #[error("init pid {pid} is invalid: {reason}")]
    InvalidInitPid {
        /// The pid that failed validation.
        pid: i32,
        /// Why validation failed.
        reason: String,
    },
}

impl CgError {
    /// Whether this error means "the feature is unavailable" rather than
    /// "the operation failed": an unmounted controller or an absent control
    /// file. Multi-controller operations skip these instead of aborting.
    #[must_use]
    pub const fn is_not_present(&self) -> bool {
        matches!(self, Self::NotMounted { .. } | Self::NotPresent { .. })
    }

    /// Whether this error is the transient-busy kind that escalated to
    /// fatal only after its retry budget ran out.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CgError>;
