//! CPU and NUMA node placement masks.
//!
//! A requested mask is validated against the mask currently active on the
//! controller root. Narrowing a request silently is not allowed: if the
//! intersection differs from the request, the operation fails and reports
//! the active range so the caller can correct the configuration.

use cghive_common::constants::CG_CPUSET;
use cghive_common::error::{CgError, Result};
use cghive_common::mask::CpuMask;
use cghive_common::types::CtId;

use crate::params;
use crate::registry::Registry;

/// Restricts the container to the given CPUs.
///
/// # Errors
///
/// Returns [`CgError::MaskRange`] when the request reaches outside the
/// active CPU set, plus read/write failures.
pub fn set_cpumask(reg: &Registry, ctid: &CtId, mask: &CpuMask) -> Result<()> {
    set_mask(reg, ctid, "cpuset.cpus", mask)
}

/// Restricts the container to the given NUMA nodes.
///
/// # Errors
///
/// Returns [`CgError::MaskRange`] when the request reaches outside the
/// active node set, plus read/write failures.
pub fn set_nodemask(reg: &Registry, ctid: &CtId, mask: &CpuMask) -> Result<()> {
    set_mask(reg, ctid, "cpuset.mems", mask)
}

fn set_mask(reg: &Registry, ctid: &CtId, name: &str, mask: &CpuMask) -> Result<()> {
    // The active mask lives at the controller root, not in the container's
    // own cgroup.
    let active_raw = params::get_param(reg, None, CG_CPUSET, name)?;
    let active: CpuMask = active_raw.parse().map_err(|_| CgError::Parse {
        path: name.into(),
        value: active_raw.clone(),
    })?;

    if !mask.is_subset(&active) {
        return Err(CgError::MaskRange {
            name: name.into(),
            requested: mask.to_string(),
            active: active_raw,
        });
    }

    params::set_param(reg, Some(ctid), CG_CPUSET, name, &mask.to_string())
}
