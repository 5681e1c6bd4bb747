//! Virtual-environment controller helpers.
//!
//! The `ve` controller carries per-container kernel state beyond resource
//! limits: the pseudosuper gate used during container start, the numeric
//! veid, the run state, and the task list.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use cghive_common::constants::CG_VE;
use cghive_common::error::{CgError, Result};
use cghive_common::types::CtId;

use crate::params;
use crate::registry::Registry;

/// Raises the pseudosuper gate for the container.
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn enable_pseudosuper(reg: &Registry, ctid: &CtId) -> Result<()> {
    params::set_u64(reg, Some(ctid), CG_VE, "ve.pseudosuper", 1)
}

/// Opens `ve.pseudosuper` for writing so the gate can be dropped later,
/// typically from a process that has already entered the container.
///
/// # Errors
///
/// Returns an I/O error if the control file cannot be opened.
pub fn open_pseudosuper(reg: &Registry, ctid: &CtId) -> Result<File> {
    let path = reg.cgroup_path(Some(ctid), CG_VE, "ve.pseudosuper")?;
    OpenOptions::new()
        .write(true)
        .open(&path)
        .map_err(|e| CgError::Io { path, source: e })
}

/// Drops the pseudosuper gate through a handle from [`open_pseudosuper`].
///
/// # Errors
///
/// Returns an I/O error on write failure, or a truncation error on a
/// short write.
pub fn disable_pseudosuper(gate: &mut File) -> Result<()> {
    let err_path = || Path::new("ve.pseudosuper").to_path_buf();
    let written = gate.write(b"0").map_err(|e| CgError::Io {
        path: err_path(),
        source: e,
    })?;
    if written != 1 {
        return Err(CgError::Truncated {
            path: err_path(),
            written,
            expected: 1,
        });
    }
    Ok(())
}

/// Assigns the numeric veid. A kernel without `ve.veid` is fine: the write
/// is silently skipped.
///
/// # Errors
///
/// Propagates path-resolution and write failures.
pub fn set_veid(reg: &Registry, ctid: &CtId, veid: u32) -> Result<()> {
    let path = reg.cgroup_path(Some(ctid), CG_VE, "ve.veid")?;
    if !path.exists() {
        return Ok(());
    }
    params::set_u64(reg, Some(ctid), CG_VE, "ve.veid", u64::from(veid))
}

/// Reads the legacy numeric veid assigned by the kernel.
///
/// # Errors
///
/// Propagates read and parse failures.
pub fn legacy_veid(reg: &Registry, ctid: &CtId) -> Result<u64> {
    params::get_u64(reg, Some(ctid), CG_VE, "ve.legacy_veid")
}

/// Whether the container is running according to `ve.state`. An absent
/// state file means the kernel never started the environment.
///
/// # Errors
///
/// Propagates path-resolution and read failures.
pub fn is_running(reg: &Registry, ctid: &CtId) -> Result<bool> {
    let path = reg.cgroup_path(Some(ctid), CG_VE, "ve.state")?;
    if !path.exists() {
        return Ok(false);
    }
    let state = params::read_param(&path)?;
    Ok(state != "STOPPED" && state != "STOPPING")
}

/// Lists the tasks currently in the container's ve cgroup. Lines that are
/// not numeric (a task that died mid-read) are skipped.
///
/// # Errors
///
/// Propagates path-resolution and read failures.
pub fn get_pids(reg: &Registry, ctid: &CtId) -> Result<Vec<i32>> {
    let path = reg.cgroup_path(Some(ctid), CG_VE, "tasks")?;
    let content = std::fs::read_to_string(&path).map_err(|e| CgError::Io {
        path,
        source: e,
    })?;
    Ok(content
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect())
}

/// Validates that a claimed init pid actually belongs to the container by
/// matching the `envID:` field of `/proc/<pid>/status`.
///
/// # Errors
///
/// Returns [`CgError::InvalidInitPid`] when the task is gone or belongs to
/// a different environment, and [`CgError::Io`] if the status file cannot
/// be read for another reason.
pub fn check_init_pid(ctid: &CtId, pid: i32) -> Result<()> {
    check_init_pid_at(Path::new("/proc"), ctid, pid)
}

/// [`check_init_pid`] against an alternate proc root.
pub fn check_init_pid_at(proc_root: &Path, ctid: &CtId, pid: i32) -> Result<()> {
    let path = proc_root.join(pid.to_string()).join("status");
    let status = match std::fs::read_to_string(&path) {
        Ok(status) => status,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CgError::InvalidInitPid {
                pid,
                reason: "no such task".into(),
            });
        }
        Err(e) => return Err(CgError::Io { path, source: e }),
    };

    for line in status.lines() {
        if let Some(env_id) = line.strip_prefix("envID:") {
            if env_id.trim() == ctid.as_str() {
                return Ok(());
            }
            break;
        }
    }
    Err(CgError::InvalidInitPid {
        pid,
        reason: "task belongs to another environment".into(),
    })
}
