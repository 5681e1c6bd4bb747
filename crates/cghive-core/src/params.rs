//! Raw and typed I/O on controller control files.
//!
//! Control files are virtual: writes must land in one syscall, reads are
//! bounded, and a file that does not exist usually means the kernel lacks
//! the feature rather than that anything is broken. The write path keeps
//! those cases distinguishable.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use cghive_common::constants::PARAM_READ_MAX;
use cghive_common::error::{CgError, Result};
use cghive_common::types::CtId;

use crate::registry::Registry;

/// Reads a control file, stripping exactly one trailing newline.
///
/// # Errors
///
/// Returns [`CgError::Io`] if the file cannot be opened or read.
pub fn read_param(path: &Path) -> Result<String> {
    let io_err = |e| CgError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let file = File::open(path).map_err(io_err)?;
    let mut out = String::new();
    let _ = file
        .take(PARAM_READ_MAX as u64)
        .read_to_string(&mut out)
        .map_err(io_err)?;
    if out.ends_with('\n') {
        let _ = out.pop();
    }
    Ok(out)
}

/// Writes the full payload to an existing control file in one operation.
///
/// # Errors
///
/// Returns [`CgError::NotPresent`] when the file does not exist (the
/// controller does not support this parameter), [`CgError::Truncated`] on a
/// short write, and [`CgError::Io`] on any other failure.
pub fn write_param(path: &Path, data: &str) -> Result<()> {
    let mut file = OpenOptions::new().write(true).open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CgError::NotPresent {
                path: path.to_path_buf(),
            }
        } else {
            CgError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    tracing::debug!(path = %path.display(), data, "write cgroup param");
    let written = file.write(data.as_bytes()).map_err(|e| CgError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if written != data.len() {
        return Err(CgError::Truncated {
            path: path.to_path_buf(),
            written,
            expected: data.len(),
        });
    }
    Ok(())
}

/// Reads a named parameter of a container's cgroup (or of the controller
/// root when `ctid` is `None`).
///
/// # Errors
///
/// Propagates path-resolution and read errors.
pub fn get_param(reg: &Registry, ctid: Option<&CtId>, subsys: &str, name: &str) -> Result<String> {
    let path = reg.cgroup_path(ctid, subsys, name)?;
    read_param(&path)
}

/// Writes a named parameter of a container's cgroup.
///
/// # Errors
///
/// Propagates path-resolution and write errors; see [`write_param`] for the
/// not-present classification.
pub fn set_param(reg: &Registry, ctid: Option<&CtId>, subsys: &str, name: &str, data: &str) -> Result<()> {
    let path = reg.cgroup_path(ctid, subsys, name)?;
    write_param(&path, data)
}

/// Reads a parameter and parses it as `u64`.
///
/// # Errors
///
/// Returns [`CgError::Parse`] for malformed or out-of-range content, in
/// addition to the read errors of [`get_param`].
pub fn get_u64(reg: &Registry, ctid: Option<&CtId>, subsys: &str, name: &str) -> Result<u64> {
    let path = reg.cgroup_path(ctid, subsys, name)?;
    let value = read_param(&path)?;
    value
        .trim()
        .parse()
        .map_err(|_| CgError::Parse { path, value })
}

/// Reads a parameter and parses it as `u32`.
///
/// # Errors
///
/// Same classification as [`get_u64`].
pub fn get_u32(reg: &Registry, ctid: Option<&CtId>, subsys: &str, name: &str) -> Result<u32> {
    let path = reg.cgroup_path(ctid, subsys, name)?;
    let value = read_param(&path)?;
    value
        .trim()
        .parse()
        .map_err(|_| CgError::Parse { path, value })
}

/// Formats and writes a `u64` parameter.
///
/// # Errors
///
/// Same classification as [`set_param`].
pub fn set_u64(reg: &Registry, ctid: Option<&CtId>, subsys: &str, name: &str, value: u64) -> Result<()> {
    set_param(reg, ctid, subsys, name, &value.to_string())
}

/// Formats and writes a `u32` parameter.
///
/// # Errors
///
/// Same classification as [`set_param`].
pub fn set_u32(reg: &Registry, ctid: Option<&CtId>, subsys: &str, name: &str, value: u32) -> Result<()> {
    set_param(reg, ctid, subsys, name, &value.to_string())
}
