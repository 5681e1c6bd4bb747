//! Descriptor-relative recursive removal of cgroup directory trees.
//!
//! Cgroup pseudo-directories can be renamed or repopulated by the kernel
//! while we tear them down, so the walk never re-derives a path from a
//! string once it has started: the root is opened once, and every descent,
//! stat, and unlink after that is relative to an open descriptor. Entries
//! that vanish mid-walk are tolerated, and `EBUSY` removals are retried
//! with bounded exponential backoff.

use std::ffi::{OsStr, OsString};
use std::os::fd::OwnedFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::dir::Dir;
use nix::errno::Errno;
use nix::fcntl::{AtFlags, OFlag, open, openat};
use nix::sys::stat::{Mode, fstat, fstatat};
use nix::unistd::{UnlinkatFlags, unlinkat};

use cghive_common::error::{CgError, Result};

/// First backoff interval after a busy removal.
const RETRY_INITIAL: Duration = Duration::from_millis(10);
/// Per-attempt backoff cap.
const RETRY_CAP: Duration = Duration::from_millis(500);
/// Total time spent retrying before the removal fails permanently.
const RETRY_BUDGET: Duration = Duration::from_secs(30);

fn io_err(path: &Path, errno: Errno) -> CgError {
    CgError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::from_raw_os_error(errno as i32),
    }
}

/// Removes the directory tree rooted at `path`, including nested
/// directories created by the kernel or other agents. An absent root is
/// success.
///
/// # Errors
///
/// Returns [`CgError::Busy`] if a directory stays busy past the retry
/// budget, and [`CgError::Io`] for other syscall failures.
pub fn remove_tree(path: &Path) -> Result<()> {
    remove_tree_with(path, std::thread::sleep)
}

/// [`remove_tree`] with an injectable sleeper, used by the retry tests.
pub(crate) fn remove_tree_with(path: &Path, mut sleep: impl FnMut(Duration)) -> Result<()> {
    let root = match open(path, OFlag::O_RDONLY | OFlag::O_DIRECTORY, Mode::empty()) {
        Ok(fd) => fd,
        Err(Errno::ENOENT) => return Ok(()),
        Err(e) => return Err(io_err(path, e)),
    };
    let root_st = fstat(&root).map_err(|e| io_err(path, e))?;

    let mut cur = root;
    let mut parent: Option<OwnedFd> = None;
    // Name of the directory most recently descended into, relative to the
    // descriptor now held in `parent`.
    let mut pending: Option<OsString> = None;

    loop {
        if let Some((child, name)) = first_subdir(&cur)? {
            parent = Some(std::mem::replace(&mut cur, child));
            pending = Some(name);
            continue;
        }

        // No subdirectories left below `cur`. The walk is done once we are
        // back at the root inode (compared by device+inode, not by path).
        let st = fstat(&cur).map_err(|e| io_err(path, e))?;
        if st.st_dev == root_st.st_dev && st.st_ino == root_st.st_ino {
            break;
        }

        let Some(p) = parent.take() else {
            break;
        };
        let grandparent = openat(&p, "..", OFlag::O_RDONLY | OFlag::O_DIRECTORY, Mode::empty())
            .map_err(|e| io_err(path, e))?;
        cur = p;
        parent = Some(grandparent);

        if let Some(name) = pending.take() {
            rmdir_retry(&cur, &name, &mut sleep)?;
        }
    }

    // The root itself is removed by path; by now it is empty, and a
    // concurrent removal is fine.
    let _ = std::fs::remove_dir(path);
    Ok(())
}

/// Finds the first subdirectory of the directory behind `cur` and opens it
/// relative to `cur`. Entries that disappear between stat and open are
/// skipped, same as entries that are not directories.
fn first_subdir(cur: &OwnedFd) -> Result<Option<(OwnedFd, OsString)>> {
    let name_err = |name: &OsStr, e| io_err(Path::new(name), e);

    let mut dir = Dir::openat(cur, ".", OFlag::O_RDONLY | OFlag::O_DIRECTORY, Mode::empty())
        .map_err(|e| io_err(Path::new("."), e))?;
    for entry in dir.iter() {
        let entry = entry.map_err(|e| io_err(Path::new("."), e))?;
        let bytes = entry.file_name().to_bytes();
        if bytes == b"." || bytes == b".." {
            continue;
        }
        let name = OsStr::from_bytes(bytes);

        let st = match fstatat(cur, name, AtFlags::AT_SYMLINK_NOFOLLOW) {
            Ok(st) => st,
            Err(Errno::ENOENT) => continue,
            Err(e) => {
                tracing::warn!(name = %name.to_string_lossy(), errno = %e, "stat failed during tree walk");
                continue;
            }
        };
        if (st.st_mode & libc::S_IFMT) != libc::S_IFDIR {
            continue;
        }

        match openat(cur, name, OFlag::O_RDONLY | OFlag::O_DIRECTORY, Mode::empty()) {
            Ok(fd) => return Ok(Some((fd, name.to_owned()))),
            Err(Errno::ENOENT) => {}
            Err(e) => return Err(name_err(name, e)),
        }
    }
    Ok(None)
}

/// Unlinks the directory `name` relative to `parent`, retrying `EBUSY`
/// with exponential backoff under the total budget.
fn rmdir_retry(parent: &OwnedFd, name: &OsStr, sleep: &mut impl FnMut(Duration)) -> Result<()> {
    match retry_busy(
        || unlinkat(parent, name, UnlinkatFlags::RemoveDir),
        sleep,
    ) {
        Ok(()) => Ok(()),
        Err((Errno::EBUSY, waited)) => Err(CgError::Busy {
            path: PathBuf::from(name),
            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        }),
        Err((e, _)) => Err(io_err(Path::new(name), e)),
    }
}

/// Runs `op`, retrying while it fails with `EBUSY`: sleep 10 ms, double
/// each round up to 500 ms per attempt, give up once the sleeps total 30
/// seconds. Any other errno fails immediately. The error carries the total
/// time waited.
fn retry_busy(
    mut op: impl FnMut() -> nix::Result<()>,
    sleep: &mut impl FnMut(Duration),
) -> std::result::Result<(), (Errno, Duration)> {
    let mut waited = Duration::ZERO;
    let mut wait = RETRY_INITIAL;
    loop {
        match op() {
            Ok(()) => return Ok(()),
            Err(Errno::EBUSY) if waited < RETRY_BUDGET => {}
            Err(e) => return Err((e, waited)),
        }
        sleep(wait);
        waited += wait;
        wait = std::cmp::min(wait * 2, RETRY_CAP);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn removes_three_levels_and_the_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("1001");
        std::fs::create_dir_all(root.join("a/b/c")).expect("mkdir");
        std::fs::create_dir_all(root.join("x")).expect("mkdir");

        remove_tree(&root).expect("remove");
        assert!(!root.exists());
    }

    #[test]
    fn missing_root_is_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        remove_tree(&dir.path().join("gone")).expect("no-op");
    }

    #[test]
    fn empty_root_is_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("empty");
        std::fs::create_dir(&root).expect("mkdir");
        remove_tree(&root).expect("remove");
        assert!(!root.exists());
    }

    #[test]
    fn busy_twice_then_success_waits_the_backoff_schedule() {
        let sleeps = RefCell::new(Vec::new());
        let mut calls = 0;
        let result = retry_busy(
            || {
                calls += 1;
                if calls <= 2 {
                    Err(Errno::EBUSY)
                } else {
                    Ok(())
                }
            },
            &mut |d| sleeps.borrow_mut().push(d),
        );
        assert!(result.is_ok());
        assert_eq!(calls, 3);
        assert_eq!(
            *sleeps.borrow(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }

    #[test]
    fn permanently_busy_fails_after_the_thirty_second_budget() {
        let mut total = Duration::ZERO;
        let mut max_sleep = Duration::ZERO;
        let result = retry_busy(
            || Err(Errno::EBUSY),
            &mut |d| {
                total += d;
                max_sleep = max_sleep.max(d);
            },
        );
        let (errno, waited) = result.expect_err("must give up");
        assert_eq!(errno, Errno::EBUSY);
        assert!(waited >= Duration::from_secs(30));
        assert_eq!(max_sleep, Duration::from_millis(500));
        assert_eq!(waited, total);
    }

    #[test]
    fn non_busy_errno_fails_immediately() {
        let mut slept = false;
        let result = retry_busy(|| Err(Errno::ENOTEMPTY), &mut |_| slept = true);
        assert_eq!(result.expect_err("must fail").0, Errno::ENOTEMPTY);
        assert!(!slept);
    }
}
