//! System-wide constants and default paths.

/// CPU scheduling controller.
pub const CG_CPU: &str = "cpu";
/// CPU and NUMA node placement controller.
pub const CG_CPUSET: &str = "cpuset";
/// Network packet classifier controller.
pub const CG_NET_CLS: &str = "net_cls";
/// Memory accounting and limiting controller.
pub const CG_MEMORY: &str = "memory";
/// Device access controller.
pub const CG_DEVICES: &str = "devices";
/// Block I/O controller.
pub const CG_BLKIO: &str = "blkio";
/// Freezer controller.
pub const CG_FREEZER: &str = "freezer";
/// User beancounter controller (per-container, private hierarchy).
pub const CG_UB: &str = "beancounter";
/// Virtual environment controller (per-container, private hierarchy).
pub const CG_VE: &str = "ve";
/// Performance event controller.
pub const CG_PERF_EVENT: &str = "perf_event";
/// Huge page controller.
pub const CG_HUGETLB: &str = "hugetlb";
/// Process number controller.
pub const CG_PIDS: &str = "pids";
/// Systemd's named hierarchy.
pub const CG_SYSTEMD: &str = "systemd";

/// Mount option that identifies the systemd named hierarchy.
pub const SYSTEMD_MOUNT_OPT: &str = "name=systemd";

/// Suffix appended to the ctid for the systemd scope directory.
pub const SYSTEMD_SCOPE_SUFFIX: &str = ".scope";

/// Slice used for non-private controllers when no override is configured.
pub const DEFAULT_SLICE: &str = "machine.slice";

/// Default mount table consulted for cgroup mount points.
pub const PROC_MOUNTS: &str = "/proc/mounts";

/// Default list of controllers compiled into the running kernel.
pub const PROC_CGROUPS: &str = "/proc/cgroups";

/// Environment variable emitted by the mount-map export.
pub const CGROUP_MOUNT_MAP_ENV: &str = "VE_CGROUP_MOUNT_MAP";

/// Upper bound on a single control-file read.
pub const PARAM_READ_MAX: usize = 4096;
