//! Projection of the host cgroup hierarchy into a container root.
//!
//! Builds the container-visible `/sys/fs/cgroup`: a private sysfs and
//! tmpfs are pre-mounted under the container root, then each live,
//! non-private controller's per-container subtree is bind-mounted onto the
//! controller's host mount-point path inside the root. The host side is
//! remounted as a slave first so mount events stop propagating into the
//! container. Comma-joined mount points (`cpu,cpuacct`) get per-name
//! symlinks so each controller is addressable on its own.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use nix::mount::{MsFlags, mount, umount};

use cghive_common::error::{CgError, Result};
use cghive_common::types::CtId;

use crate::registry::{Registry, is_systemd};

/// Constructs the `/sys` and `/sys/fs/cgroup` views under `root`.
///
/// On failure every bind mount made so far is unmounted in the order it
/// was recorded, followed by the tmpfs and sysfs pre-mounts, before the
/// error is returned.
///
/// # Errors
///
/// Returns the first mount, resolution, or I/O failure.
pub fn project(reg: &Registry, ctid: &CtId, root: &Path) -> Result<()> {
    let mut bound: Vec<PathBuf> = Vec::new();
    let result = project_controllers(reg, ctid, root, &mut bound);
    if let Err(ref e) = result {
        tracing::warn!(ctid = %ctid, root = %root.display(), error = %e,
            "cgroup projection failed, unwinding mounts");
        unwind(root, &bound);
    }
    result
}

fn project_controllers(
    reg: &Registry,
    ctid: &CtId,
    root: &Path,
    bound: &mut Vec<PathBuf>,
) -> Result<()> {
    let sys = root.join("sys");
    ensure_dir(&sys)?;
    mount(
        None::<&str>,
        &sys,
        Some("sysfs"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| mount_err(&sys, e))?;

    let cgroup_root = root.join("sys/fs/cgroup");
    ensure_dir(&cgroup_root)?;
    mount(
        None::<&str>,
        &cgroup_root,
        Some("tmpfs"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| mount_err(&cgroup_root, e))?;

    let live = live_controllers(reg.controller_list_path())?;

    for desc in reg.controllers().filter(|d| !d.private) {
        let mnt = match reg.resolve(desc.subsys) {
            Ok(mnt) => mnt,
            Err(e) if e.is_not_present() => continue,
            Err(e) => return Err(e),
        };
        // The named systemd hierarchy never appears in the kernel's
        // controller list; every real controller must.
        if !is_systemd(desc.subsys) && !live.contains(desc.subsys) {
            continue;
        }
        // Co-mounted controllers share one mount point; project it once.
        if bound.contains(&mnt) {
            continue;
        }

        mount(None::<&str>, &mnt, None::<&str>, MsFlags::MS_SLAVE, None::<&str>)
            .map_err(|e| mount_err(&mnt, e))?;
        bound.push(mnt.clone());

        let src = reg.cgroup_dir(ctid, desc.subsys)?;
        let dst = in_root(root, &mnt);
        let mut flags = MsFlags::MS_BIND;
        if !is_systemd(desc.subsys) {
            flags |= MsFlags::MS_PRIVATE;
        }
        bind_mount(&src, &dst, flags)?;

        for (link, target) in alias_links(root, &mnt) {
            let _ = fs::remove_file(&link);
            tracing::debug!(link = %link.display(), target, "controller alias symlink");
            if let Err(e) = std::os::unix::fs::symlink(&target, &link) {
                if e.kind() != std::io::ErrorKind::AlreadyExists {
                    return Err(CgError::Io {
                        path: link,
                        source: e,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Best-effort teardown of a partially built projection: recorded bind
/// mounts first, then the tmpfs and sysfs pre-mounts.
fn unwind(root: &Path, bound: &[PathBuf]) {
    for mnt in bound {
        let _ = umount(&in_root(root, mnt));
    }
    let _ = umount(&root.join("sys/fs/cgroup"));
    let _ = umount(&root.join("sys"));
}

/// Bind-mounts `src` onto `dst`, creating both directories if needed.
fn bind_mount(src: &Path, dst: &Path, flags: MsFlags) -> Result<()> {
    ensure_dir(dst)?;
    ensure_dir(src)?;
    tracing::debug!(src = %src.display(), dst = %dst.display(), "bind mount");
    mount(Some(src), dst, None::<&str>, flags, None::<&str>).map_err(|e| mount_err(dst, e))
}

/// Re-roots an absolute host path under the container root.
fn in_root(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix("/") {
        Ok(rel) => root.join(rel),
        Err(_) => root.join(path),
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| CgError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn mount_err(path: &Path, errno: nix::errno::Errno) -> CgError {
    CgError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::from_raw_os_error(errno as i32),
    }
}

/// Controllers the running kernel was compiled with, from `/proc/cgroups`.
fn live_controllers(path: &Path) -> Result<HashSet<String>> {
    let content = fs::read_to_string(path).map_err(|e| CgError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(content
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_owned)
        .collect())
}

/// Symlinks needed to make each name of a comma-joined mount point
/// (`cpu,cpuacct`) addressable on its own inside the container: one
/// `(link path, relative target)` pair per name. A mount point without a
/// comma needs none.
fn alias_links(root: &Path, mnt: &Path) -> Vec<(PathBuf, String)> {
    let Some(joined) = mnt.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    if !joined.contains(',') {
        return Vec::new();
    }
    let parent = in_root(root, mnt.parent().unwrap_or_else(|| Path::new("/")));
    joined
        .split(',')
        .map(|name| (parent.join(name), joined.to_owned()))
        .collect()
}
