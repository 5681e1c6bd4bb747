//! Container cgroup lifecycle across the full controller set.
//!
//! Creation is all-or-nothing: a failure on any controller rolls back every
//! directory already created, in reverse registry order. Destruction is
//! best-effort total: every mounted controller is attempted and failures
//! are aggregated rather than short-circuiting.

use std::fs;

use cghive_common::error::{CgError, Result};
use cghive_common::types::CtId;

use crate::registry::Registry;
use crate::{params, rmtree};

/// Creates the container's cgroup directory in every mounted controller.
///
/// Controllers that are simply unmounted are skipped. On the first hard
/// failure, directories created so far are destroyed in reverse order
/// before the error is returned.
///
/// # Errors
///
/// Returns the error of the failing controller after rollback completes.
pub fn create(reg: &Registry, ctid: &CtId) -> Result<()> {
    let mut created: Vec<&'static str> = Vec::new();
    for desc in reg.controllers() {
        match create_one(reg, ctid, desc.subsys) {
            Ok(()) => created.push(desc.subsys),
            Err(e) if e.is_not_present() => {}
            Err(e) => {
                tracing::warn!(ctid = %ctid, subsys = desc.subsys, error = %e,
                    "cgroup creation failed, rolling back");
                for subsys in created.iter().rev() {
                    if let Err(rollback) = destroy_one(reg, ctid, subsys) {
                        tracing::warn!(ctid = %ctid, subsys, error = %rollback,
                            "rollback of cgroup failed");
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Removes the container's cgroup subtree from every mounted controller.
///
/// Every controller is attempted even if an earlier one fails; the first
/// failure is reported once all attempts are done.
///
/// # Errors
///
/// Returns the first per-controller failure, if any.
pub fn destroy(reg: &Registry, ctid: &CtId) -> Result<()> {
    let mut failed: Option<CgError> = None;
    for desc in reg.controllers() {
        let result = match reg.cgroup_dir(ctid, desc.subsys) {
            Ok(dir) => destroy_dir(ctid, desc.subsys, &dir),
            Err(e) if e.is_not_present() => continue,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(ctid = %ctid, subsys = desc.subsys, error = %e,
                "cgroup removal failed");
            let _ = failed.get_or_insert(e);
        }
    }
    failed.map_or(Ok(()), Err)
}

/// Moves a task into the container's cgroup of every controller, skipping
/// absent controllers and an optional named exception.
///
/// # Errors
///
/// Returns the first hard write failure.
pub fn attach_task(reg: &Registry, ctid: &CtId, pid: i32, except: Option<&str>) -> Result<()> {
    for desc in reg.controllers() {
        if except == Some(desc.subsys) {
            continue;
        }
        match params::set_param(reg, Some(ctid), desc.subsys, "tasks", &pid.to_string()) {
            Ok(()) => {}
            Err(e) if e.is_not_present() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn create_one(reg: &Registry, ctid: &CtId, subsys: &str) -> Result<()> {
    let dir = reg.cgroup_dir(ctid, subsys)?;
    tracing::debug!(ctid = %ctid, subsys, path = %dir.display(), "create cgroup");
    fs::create_dir_all(&dir).map_err(|e| CgError::Io {
        path: dir,
        source: e,
    })
}

fn destroy_one(reg: &Registry, ctid: &CtId, subsys: &str) -> Result<()> {
    let dir = match reg.cgroup_dir(ctid, subsys) {
        Ok(dir) => dir,
        Err(e) if e.is_not_present() => return Ok(()),
        Err(e) => return Err(e),
    };
    destroy_dir(ctid, subsys, &dir)
}

fn destroy_dir(ctid: &CtId, subsys: &str, dir: &std::path::Path) -> Result<()> {
    tracing::debug!(ctid = %ctid, subsys, path = %dir.display(), "destroy cgroup");
    rmtree::remove_tree(dir)
}
