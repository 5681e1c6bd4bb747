//! Controller registry, mount-point resolution, and path construction.
//!
//! The kernel exposes each legacy controller through its own mount point,
//! discovered by scanning the mount table. Resolution is lazy: the first
//! request for a subsystem scans the table, and a successful result is
//! cached for the lifetime of the process. The cache is deliberately never
//! invalidated; if a controller is unmounted later, the stale path stays
//! (matching long-standing behavior that callers rely on).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use cghive_common::config::CgroupConfig;
use cghive_common::constants::{
    self, CGROUP_MOUNT_MAP_ENV, DEFAULT_SLICE, SYSTEMD_MOUNT_OPT, SYSTEMD_SCOPE_SUFFIX,
};
use cghive_common::error::{CgError, Result};
use cghive_common::types::CtId;

/// Static description of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Canonical subsystem name, as it appears in mount options.
    pub subsys: &'static str,
    /// Whether the controller keeps a per-container hierarchy instead of
    /// nesting containers under the shared slice.
    pub private: bool,
}

const fn ctl(subsys: &'static str) -> Descriptor {
    Descriptor {
        subsys,
        private: false,
    }
}

const fn ctl_private(subsys: &'static str) -> Descriptor {
    Descriptor {
        subsys,
        private: true,
    }
}

/// The fixed controller set, in the order lifecycle operations iterate it.
pub static CONTROLLERS: [Descriptor; 13] = [
    ctl(constants::CG_CPU),
    ctl(constants::CG_CPUSET),
    ctl(constants::CG_NET_CLS),
    ctl(constants::CG_MEMORY),
    ctl(constants::CG_DEVICES),
    ctl(constants::CG_BLKIO),
    ctl(constants::CG_FREEZER),
    ctl_private(constants::CG_UB),
    ctl_private(constants::CG_VE),
    ctl(constants::CG_PERF_EVENT),
    ctl(constants::CG_HUGETLB),
    ctl(constants::CG_PIDS),
    ctl(constants::CG_SYSTEMD),
];

/// Whether a subsystem name designates the systemd named hierarchy.
#[must_use]
pub fn is_systemd(subsys: &str) -> bool {
    subsys == constants::CG_SYSTEMD
}

/// Mount resolution cache and path builder for the controller set.
///
/// One `Registry` is constructed at process start and shared by reference
/// with every caller; its internal mutex serializes mount-table scans so a
/// subsystem is resolved at most once even under concurrent use.
#[derive(Debug)]
pub struct Registry {
    config: CgroupConfig,
    resolved: Mutex<HashMap<&'static str, PathBuf>>,
    slice: OnceLock<String>,
    scans: AtomicUsize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(CgroupConfig::default())
    }
}

impl Registry {
    /// Creates a registry from the given configuration.
    #[must_use]
    pub fn new(config: CgroupConfig) -> Self {
        Self {
            config,
            resolved: Mutex::new(HashMap::new()),
            slice: OnceLock::new(),
            scans: AtomicUsize::new(0),
        }
    }

    /// The static controller descriptors, in registry order.
    pub fn controllers(&self) -> impl Iterator<Item = &'static Descriptor> {
        CONTROLLERS.iter()
    }

    /// Looks up the descriptor for a subsystem name.
    ///
    /// # Errors
    ///
    /// Returns [`CgError::UnknownSubsystem`] for names outside the static
    /// registry.
    pub fn descriptor(&self, subsys: &str) -> Result<&'static Descriptor> {
        CONTROLLERS
            .iter()
            .find(|d| d.subsys == subsys)
            .ok_or_else(|| CgError::UnknownSubsystem {
                name: subsys.into(),
            })
    }

    /// The controller-list file (`/proc/cgroups` unless overridden).
    #[must_use]
    pub fn controller_list_path(&self) -> &Path {
        &self.config.controller_list
    }

    /// The slice directory under which non-private controllers nest
    /// containers. Resolved once, on first use.
    pub fn slice_name(&self) -> &str {
        self.slice.get_or_init(|| {
            self.config
                .slice
                .clone()
                .unwrap_or_else(|| DEFAULT_SLICE.to_owned())
        })
    }

    /// Resolves the mount point of a subsystem, scanning the mount table on
    /// first use and serving the cached path afterwards.
    ///
    /// # Errors
    ///
    /// [`CgError::UnknownSubsystem`] for unregistered names,
    /// [`CgError::NotMounted`] when no matching mount-table line exists
    /// (not cached, callers usually skip the controller), and
    /// [`CgError::Io`] when the mount table cannot be read.
    pub fn resolve(&self, subsys: &str) -> Result<PathBuf> {
        let desc = self.descriptor(subsys)?;

        let mut cache = self
            .resolved
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(path) = cache.get(desc.subsys) {
            return Ok(path.clone());
        }

        let path = self
            .scan_mount_table(desc.subsys)?
            .ok_or_else(|| CgError::NotMounted {
                subsys: desc.subsys.into(),
            })?;
        tracing::debug!(subsys = desc.subsys, mount = %path.display(), "cgroup mount point resolved");
        let _ = cache.insert(desc.subsys, path.clone());
        Ok(path)
    }

    /// How many mount-table scans have happened so far.
    ///
    /// Exposed so cache effectiveness can be asserted.
    #[must_use]
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    /// One pass over the mount table looking for a `cgroup`-type entry
    /// whose option list carries the subsystem as an exact token.
    fn scan_mount_table(&self, subsys: &str) -> Result<Option<PathBuf>> {
        let _ = self.scans.fetch_add(1, Ordering::Relaxed);
        let table = fs::read_to_string(&self.config.mount_table).map_err(|e| CgError::Io {
            path: self.config.mount_table.clone(),
            source: e,
        })?;

        let wanted = if is_systemd(subsys) {
            SYSTEMD_MOUNT_OPT
        } else {
            subsys
        };
        for line in table.lines() {
            // cgroup /sys/fs/cgroup/devices cgroup rw,nosuid,nodev,noexec,relatime,devices 0 0
            let mut fields = line.split_whitespace();
            let _src = fields.next();
            let (Some(target), Some(fstype), Some(opts)) =
                (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            if fstype != "cgroup" {
                continue;
            }
            if opts.split(',').any(|tok| tok == wanted) {
                return Ok(Some(PathBuf::from(target)));
            }
        }
        Ok(None)
    }

    /// The directory owned by `ctid` under one controller.
    ///
    /// Naming policy: the systemd hierarchy uses `<mount>/<ctid>.scope`,
    /// private controllers use `<mount>/<ctid>`, everything else nests
    /// under the slice as `<mount>/<slice>/<ctid>`.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors from [`Registry::resolve`].
    pub fn cgroup_dir(&self, ctid: &CtId, subsys: &str) -> Result<PathBuf> {
        let mount = self.resolve(subsys)?;
        let desc = self.descriptor(subsys)?;
        Ok(if is_systemd(desc.subsys) {
            mount.join(format!("{ctid}{SYSTEMD_SCOPE_SUFFIX}"))
        } else if desc.private {
            mount.join(ctid.as_str())
        } else {
            mount.join(self.slice_name()).join(ctid.as_str())
        })
    }

    /// Absolute path of a control file, either inside a container's cgroup
    /// or (with `ctid == None`) at the controller's own root.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors from [`Registry::resolve`].
    pub fn cgroup_path(&self, ctid: Option<&CtId>, subsys: &str, leaf: &str) -> Result<PathBuf> {
        match ctid {
            None => Ok(self.resolve(subsys)?.join(leaf)),
            Some(id) => Ok(self.cgroup_dir(id, subsys)?.join(leaf)),
        }
    }

    /// Builds the `VE_CGROUP_MOUNT_MAP=<subsys>:<path> ...` export consumed
    /// by the process-launch step: per-container cgroup paths when a ctid
    /// is given, global mount points otherwise. Private controllers and
    /// unmounted controllers are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O failure interrupts mount resolution.
    pub fn mount_map(&self, ctid: Option<&CtId>) -> Result<String> {
        let mut out = format!("{CGROUP_MOUNT_MAP_ENV}=");
        for desc in self.controllers().filter(|d| !d.private) {
            let mount = match self.resolve(desc.subsys) {
                Ok(mount) => mount,
                Err(e) if e.is_not_present() => continue,
                Err(e) => return Err(e),
            };
            let path = match ctid {
                Some(id) => self.cgroup_dir(id, desc.subsys)?,
                None => mount,
            };
            out.push_str(&format!(" {}:{}", desc.subsys, path.display()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_mount_table(lines: &[&str]) -> (tempfile::TempDir, CgroupConfig) {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = dir.path().join("mounts");
        let mut f = fs::File::create(&table).expect("create mounts");
        for line in lines {
            writeln!(f, "{line}").expect("write line");
        }
        let config = CgroupConfig {
            mount_table: table,
            ..CgroupConfig::default()
        };
        (dir, config)
    }

    fn test_registry() -> (tempfile::TempDir, Registry) {
        let (dir, config) = write_mount_table(&[
            "sysfs /sys sysfs rw,nosuid,nodev,noexec 0 0",
            "cgroup /sys/fs/cgroup/cpu,cpuacct cgroup rw,nosuid,cpu,cpuacct 0 0",
            "cgroup /sys/fs/cgroup/cpuset cgroup rw,nosuid,cpuset 0 0",
            "cgroup /sys/fs/cgroup/memory cgroup rw,nosuid,memory 0 0",
            "cgroup /sys/fs/cgroup/ve cgroup rw,nosuid,ve 0 0",
            "cgroup /sys/fs/cgroup/systemd cgroup rw,nosuid,name=systemd 0 0",
        ]);
        let reg = Registry::new(config);
        (dir, reg)
    }

    #[test]
    fn resolves_exact_comma_delimited_token() {
        let (_dir, reg) = test_registry();
        let cpu = reg.resolve("cpu").expect("cpu mounted");
        assert_eq!(cpu, PathBuf::from("/sys/fs/cgroup/cpu,cpuacct"));
        // "cpu" must not match the "cpuset" option token.
        let cpuset = reg.resolve("cpuset").expect("cpuset mounted");
        assert_eq!(cpuset, PathBuf::from("/sys/fs/cgroup/cpuset"));
    }

    #[test]
    fn systemd_resolves_via_named_mount_option() {
        let (_dir, reg) = test_registry();
        let systemd = reg.resolve("systemd").expect("systemd mounted");
        assert_eq!(systemd, PathBuf::from("/sys/fs/cgroup/systemd"));
    }

    #[test]
    fn second_resolve_hits_cache_without_rescanning() {
        let (_dir, reg) = test_registry();
        let first = reg.resolve("memory").expect("memory mounted");
        assert_eq!(reg.scan_count(), 1);
        let second = reg.resolve("memory").expect("memory mounted");
        assert_eq!(first, second);
        assert_eq!(reg.scan_count(), 1);
    }

    #[test]
    fn unmounted_controller_is_distinct_and_not_cached() {
        let (_dir, reg) = test_registry();
        let err = reg.resolve("blkio").expect_err("blkio not mounted");
        assert!(matches!(err, CgError::NotMounted { .. }));
        assert!(err.is_not_present());
        let before = reg.scan_count();
        let _ = reg.resolve("blkio").expect_err("still not mounted");
        assert_eq!(reg.scan_count(), before + 1);
    }

    #[test]
    fn unknown_subsystem_is_a_caller_error() {
        let (_dir, reg) = test_registry();
        assert!(matches!(
            reg.resolve("cpuacct"),
            Err(CgError::UnknownSubsystem { .. })
        ));
    }

    #[test]
    fn unreadable_mount_table_is_an_io_error() {
        let config = CgroupConfig {
            mount_table: PathBuf::from("/nonexistent/mounts"),
            ..CgroupConfig::default()
        };
        let reg = Registry::new(config);
        assert!(matches!(reg.resolve("cpu"), Err(CgError::Io { .. })));
    }

    #[test]
    fn path_policies_per_controller_kind() {
        let (_dir, reg) = test_registry();
        let id = CtId::new("1001");
        assert_eq!(
            reg.cgroup_dir(&id, "cpu").expect("cpu"),
            PathBuf::from("/sys/fs/cgroup/cpu,cpuacct/machine.slice/1001")
        );
        assert_eq!(
            reg.cgroup_dir(&id, "ve").expect("ve"),
            PathBuf::from("/sys/fs/cgroup/ve/1001")
        );
        assert_eq!(
            reg.cgroup_dir(&id, "systemd").expect("systemd"),
            PathBuf::from("/sys/fs/cgroup/systemd/1001.scope")
        );
    }

    #[test]
    fn none_ctid_addresses_the_controller_root() {
        let (_dir, reg) = test_registry();
        assert_eq!(
            reg.cgroup_path(None, "cpuset", "cpuset.cpus").expect("path"),
            PathBuf::from("/sys/fs/cgroup/cpuset/cpuset.cpus")
        );
    }

    #[test]
    fn slice_override_changes_non_private_paths() {
        let (_dir, mut config) = write_mount_table(&[
            "cgroup /sys/fs/cgroup/memory cgroup rw,memory 0 0",
        ]);
        config.slice = Some("ct.slice".into());
        let reg = Registry::new(config);
        let id = CtId::new("7");
        assert_eq!(
            reg.cgroup_dir(&id, "memory").expect("memory"),
            PathBuf::from("/sys/fs/cgroup/memory/ct.slice/7")
        );
    }

    #[test]
    fn mount_map_lists_non_private_mounted_controllers() {
        let (_dir, reg) = test_registry();
        let global = reg.mount_map(None).expect("map");
        assert!(global.starts_with("VE_CGROUP_MOUNT_MAP="));
        assert!(global.contains(" cpu:/sys/fs/cgroup/cpu,cpuacct"));
        assert!(!global.contains(" ve:"));
        assert!(!global.contains("blkio"));

        let id = CtId::new("1001");
        let scoped = reg.mount_map(Some(&id)).expect("map");
        assert!(scoped.contains(" memory:/sys/fs/cgroup/memory/machine.slice/1001"));
        assert!(scoped.contains(" systemd:/sys/fs/cgroup/systemd/1001.scope"));
    }
}
