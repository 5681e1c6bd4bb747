//! Configuration model for the cgroup hierarchy layer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Settings consumed by the subsystem registry.
///
/// The proc paths default to the live system files; tests point them at
/// fixture files instead. The slice override corresponds to the
/// `VE_CGROUP_SLICE` global parameter of the configuration layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CgroupConfig {
    /// Slice directory for non-private controllers, when overridden.
    /// `None` falls back to [`constants::DEFAULT_SLICE`].
    pub slice: Option<String>,
    /// Mount table scanned for cgroup mount points.
    pub mount_table: PathBuf,
    /// File listing the controllers compiled into the kernel.
    pub controller_list: PathBuf,
}

impl Default for CgroupConfig {
    fn default() -> Self {
        Self {
            slice: None,
            mount_table: PathBuf::from(constants::PROC_MOUNTS),
            controller_list: PathBuf::from(constants::PROC_CGROUPS),
        }
    }
}
